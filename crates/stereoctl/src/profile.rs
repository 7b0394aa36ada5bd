use std::path::Path;

use anyhow::{anyhow, Result};

use crate::cli::{ProfileAction, ProfileCommand};
use crate::paths::{self, AppPaths};
use crate::run::ActiveProfile;

pub fn run(command: &ProfileCommand, paths: &AppPaths, explicit: Option<&Path>) -> Result<()> {
    match &command.action {
        ProfileAction::Check(args) => {
            let explicit = args.path.as_deref().or(explicit);
            let path = paths.active_profile(explicit).ok_or_else(|| {
                anyhow!(
                    "no profile to check; none given and {} does not exist",
                    paths.default_profile().display()
                )
            })?;
            let active = ActiveProfile {
                profile: paths::load_profile(&path)?,
                source: Some(path),
            };
            for line in describe(&active)? {
                println!("{line}");
            }
            Ok(())
        }
        ProfileAction::Where => {
            let default = paths.default_profile();
            let state = if default.is_file() {
                "present"
            } else {
                "missing"
            };
            println!("{} ({state})", default.display());
            Ok(())
        }
    }
}

/// Human-readable summary of a validated profile.
fn describe(active: &ActiveProfile) -> Result<Vec<String>> {
    let mode = active.mode()?;
    let profile = &active.profile;
    let source = active
        .source
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    let crosstalk = &profile.crosstalk;
    Ok(vec![
        format!("{source}: ok"),
        format!("mode: {mode} (id {}, {})", mode.id(), mode.family()),
        format!("swap eyes: {}", profile.swap_eyes),
        format!("parallax adjust: {}", profile.parallax_adjust),
        format!(
            "crosstalk: r={} g={} b={} ghostbust={}",
            crosstalk.r, crosstalk.g, crosstalk.b, crosstalk.ghostbust
        ),
        format!(
            "screen origin: {},{}",
            profile.screen.origin_x, profile.screen.origin_y
        ),
        format!("program cache capacity: {}", profile.program_cache_capacity),
        format!(
            "camera: focal length {} eye separation {} fovy {} near {} far {}",
            profile.camera.focal_length,
            profile.camera.eye_separation(),
            profile.camera.fovy,
            profile.camera.near,
            profile.camera.far
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereoconfig::Profile;

    #[test]
    fn description_resolves_numeric_modes() {
        let active = ActiveProfile {
            profile: Profile::from_toml_str("version = 1\nmode = 9\n").unwrap(),
            source: None,
        };
        let lines = describe(&active).unwrap();
        assert_eq!(lines[0], "built-in defaults: ok");
        assert_eq!(lines[1], "mode: checkerboard (id 9, interleave)");
    }

    #[test]
    fn description_rejects_unknown_modes() {
        let active = ActiveProfile {
            profile: Profile::from_toml_str("version = 1\nmode = \"diagonal\"\n").unwrap(),
            source: None,
        };
        assert!(describe(&active).is_err());
    }
}
