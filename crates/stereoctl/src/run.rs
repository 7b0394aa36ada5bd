use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stereo::{Crosstalk, Mode, SessionSettings};
use stereoconfig::Profile;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::paths::{self, AppPaths};
use crate::{compose, inspect, matrices, profile};

/// Profile in effect for this invocation and where it came from.
#[derive(Debug, Clone)]
pub struct ActiveProfile {
    pub profile: Profile,
    pub source: Option<PathBuf>,
}

impl ActiveProfile {
    /// Mode named by the profile.
    pub fn mode(&self) -> Result<Mode> {
        self.profile.mode.parse::<Mode>().with_context(|| match &self.source {
            Some(path) => format!("profile {} names an unknown mode", path.display()),
            None => "default profile names an unknown mode".to_string(),
        })
    }

    /// An explicit command-line mode wins over the profile's.
    pub fn mode_or(&self, explicit: Option<Mode>) -> Result<Mode> {
        match explicit {
            Some(mode) => Ok(mode),
            None => self.mode(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        session_settings(&self.profile)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved stereoctl paths");

    let explicit = cli.profile.as_deref();
    let active = || load_active_profile(&paths, explicit);
    match &cli.command {
        Command::Profile(command) => profile::run(command, &paths, explicit),
        Command::Modes(args) => inspect::list_modes(args),
        Command::Shader(args) => inspect::print_shader(args, &active()?),
        Command::Plan(args) => inspect::print_plan(args, &active()?),
        Command::Frustum(args) => matrices::print_frustum(args, &active()?.profile),
        Command::LookAt(args) => matrices::print_look_at(args, &active()?.profile),
        Command::Compose(args) => compose::run(args, &active()?),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_active_profile(paths: &AppPaths, explicit: Option<&Path>) -> Result<ActiveProfile> {
    match paths.active_profile(explicit) {
        Some(path) => {
            let profile = paths::load_profile(&path)?;
            tracing::debug!(profile = %path.display(), mode = %profile.mode, "loaded profile");
            Ok(ActiveProfile {
                profile,
                source: Some(path),
            })
        }
        None => Ok(ActiveProfile {
            profile: Profile::default(),
            source: None,
        }),
    }
}

pub fn session_settings(profile: &Profile) -> SessionSettings {
    let crosstalk = &profile.crosstalk;
    SessionSettings {
        screen_origin: (profile.screen.origin_x, profile.screen.origin_y),
        crosstalk: Crosstalk::new(crosstalk.r, crosstalk.g, crosstalk.b),
        ghostbust: crosstalk.ghostbust,
        parallax_adjust: profile.parallax_adjust,
        program_cache_capacity: profile.program_cache_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_the_profile() {
        let profile = Profile::from_toml_str(
            r#"
version = 1
mode = "even-odd-rows"
parallax_adjust = 0.25
program_cache_capacity = 3

[crosstalk]
r = 0.1
g = 0.2
b = 0.3
ghostbust = 0.5

[screen]
origin_x = 7
origin_y = -2
"#,
        )
        .unwrap();
        let settings = session_settings(&profile);
        assert_eq!(settings.screen_origin, (7, -2));
        assert_eq!(settings.crosstalk, Crosstalk::new(0.1, 0.2, 0.3));
        assert_eq!(settings.ghostbust, 0.5);
        assert_eq!(settings.parallax_adjust, 0.25);
        assert_eq!(settings.program_cache_capacity, 3);
    }

    #[test]
    fn explicit_mode_overrides_profile() {
        let active = ActiveProfile {
            profile: Profile::default(),
            source: None,
        };
        assert_eq!(active.mode().unwrap(), Mode::RedCyanDubois);
        assert_eq!(
            active.mode_or(Some(Mode::TopBottom)).unwrap(),
            Mode::TopBottom
        );
    }

    #[test]
    fn unknown_profile_mode_is_reported() {
        let active = ActiveProfile {
            profile: Profile {
                mode: "sideways".into(),
                ..Profile::default()
            },
            source: Some(PathBuf::from("/tmp/display.toml")),
        };
        let err = active.mode().unwrap_err();
        assert!(format!("{err:#}").contains("display.toml"));
    }
}
