use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
}

/// Display profile describing how a host wants its stereo output composited.
///
/// The mode is kept in its raw textual form; the `stereo` crate owns the mode
/// table and resolves the name when the profile is applied to a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub version: u32,
    #[serde(default = "default_mode", deserialize_with = "deserialize_mode")]
    pub mode: String,
    #[serde(default)]
    pub swap_eyes: bool,
    #[serde(default)]
    pub parallax_adjust: f32,
    #[serde(default = "default_cache_capacity")]
    pub program_cache_capacity: usize,
    #[serde(default)]
    pub crosstalk: Crosstalk,
    #[serde(default)]
    pub screen: Screen,
    #[serde(default)]
    pub camera: Camera,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Crosstalk {
    #[serde(default)]
    pub r: f32,
    #[serde(default)]
    pub g: f32,
    #[serde(default)]
    pub b: f32,
    #[serde(default)]
    pub ghostbust: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Screen {
    #[serde(default)]
    pub origin_x: i32,
    #[serde(default)]
    pub origin_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Camera {
    #[serde(default = "default_focal_length")]
    pub focal_length: f64,
    /// Defaults to `focal_length / 30` when omitted.
    #[serde(default)]
    pub eye_separation: Option<f64>,
    #[serde(default = "default_fovy")]
    pub fovy: f64,
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            focal_length: default_focal_length(),
            eye_separation: None,
            fovy: default_fovy(),
            near: default_near(),
            far: default_far(),
        }
    }
}

impl Camera {
    pub fn eye_separation(&self) -> f64 {
        self.eye_separation.unwrap_or(self.focal_length / 30.0)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: 1,
            mode: default_mode(),
            swap_eyes: false,
            parallax_adjust: 0.0,
            program_cache_capacity: default_cache_capacity(),
            crosstalk: Crosstalk::default(),
            screen: Screen::default(),
            camera: Camera::default(),
        }
    }
}

fn default_mode() -> String {
    "red-cyan-dubois".to_string()
}

fn default_cache_capacity() -> usize {
    1
}

fn default_focal_length() -> f64 {
    2.0
}

fn default_fovy() -> f64 {
    50.0
}

fn default_near() -> f64 {
    0.1
}

fn default_far() -> f64 {
    10.0
}

/// Accepts either a mode name (`"left-right"`) or its numeric id (`4`).
fn deserialize_mode<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a stereo mode name or numeric mode id")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let normalized = v.trim().to_ascii_lowercase();
            if normalized.is_empty() {
                return Err(E::custom("mode must not be empty"));
            }
            Ok(normalized)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("mode id must be non-negative"));
            }
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl Profile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: Profile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn ghostbust_enabled(&self) -> bool {
        self.crosstalk.ghostbust > 0.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported profile version {}; expected 1",
                self.version
            )));
        }

        let channels = [
            ("crosstalk.r", self.crosstalk.r),
            ("crosstalk.g", self.crosstalk.g),
            ("crosstalk.b", self.crosstalk.b),
            ("crosstalk.ghostbust", self.crosstalk.ghostbust),
        ];
        for (name, value) in channels {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if !self.parallax_adjust.is_finite() {
            return Err(ConfigError::Invalid(
                "parallax_adjust must be a finite number".into(),
            ));
        }

        if self.program_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "program_cache_capacity must be at least 1".into(),
            ));
        }

        let camera = &self.camera;
        if camera.focal_length <= 0.0 {
            return Err(ConfigError::Invalid(
                "camera.focal_length must be greater than zero".into(),
            ));
        }
        if let Some(separation) = camera.eye_separation {
            if separation < 0.0 {
                return Err(ConfigError::Invalid(
                    "camera.eye_separation must be non-negative".into(),
                ));
            }
        }
        if !(camera.fovy > 0.0 && camera.fovy < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fovy must be within (0, 180) degrees, got {}",
                camera.fovy
            )));
        }
        if camera.near <= 0.0 || camera.far <= camera.near {
            return Err(ConfigError::Invalid(format!(
                "camera planes must satisfy 0 < near < far (near = {}, far = {})",
                camera.near, camera.far
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
mode = "Left-Right"
swap_eyes = true
parallax_adjust = 0.01
program_cache_capacity = 4

[crosstalk]
r = 0.06
g = 0.04
b = 0.05
ghostbust = 0.5

[screen]
origin_x = 300
origin_y = 201

[camera]
focal_length = 3.0
fovy = 60
"#;

    #[test]
    fn parses_sample_profile() {
        let profile = Profile::from_toml_str(SAMPLE).expect("parse profile");
        assert_eq!(profile.mode, "left-right");
        assert!(profile.swap_eyes);
        assert_eq!(profile.program_cache_capacity, 4);
        assert_eq!(profile.screen, Screen { origin_x: 300, origin_y: 201 });
        assert!(profile.ghostbust_enabled());
        assert_eq!(profile.camera.eye_separation(), 0.1);
        assert_eq!(profile.camera.near, 0.1);
    }

    #[test]
    fn empty_profile_uses_defaults() {
        let profile = Profile::from_toml_str("version = 1").unwrap();
        assert_eq!(profile.mode, "red-cyan-dubois");
        assert_eq!(profile.program_cache_capacity, 1);
        assert!(!profile.ghostbust_enabled());
        assert_eq!(profile.camera, Camera::default());
    }

    #[test]
    fn accepts_numeric_mode() {
        let profile = Profile::from_toml_str("version = 1\nmode = 9").unwrap();
        assert_eq!(profile.mode, "9");
    }

    #[test]
    fn rejects_out_of_range_crosstalk() {
        let err = Profile::from_toml_str(
            r#"
version = 1

[crosstalk]
g = 1.5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("crosstalk.g")));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = Profile::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let err = Profile::from_toml_str(
            r#"
version = 1

[camera]
near = 5.0
far = 1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_cache_capacity() {
        let err = Profile::from_toml_str("version = 1\nprogram_cache_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
