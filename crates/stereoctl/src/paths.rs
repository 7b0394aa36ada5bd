use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use stereoconfig::Profile;

pub const ENV_CONFIG_DIR: &str = "STEREOCTL_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Stereo";
const APPLICATION: &str = "stereoctl";
const PROFILE_FILE: &str = "profile.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn default_profile(&self) -> PathBuf {
        self.config_dir.join(PROFILE_FILE)
    }

    /// Profile to load: the explicit path if given, otherwise the default
    /// profile when it exists.
    pub fn active_profile(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = self.default_profile();
                default.is_file().then_some(default)
            }
        }
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

pub fn load_profile(path: &Path) -> Result<Profile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile at {}", path.display()))?;
    Profile::from_toml_str(&contents)
        .with_context(|| format!("invalid profile at {}", path.display()))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
