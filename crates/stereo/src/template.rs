use std::borrow::Cow;

use wgpu::naga;

use crate::error::StereoError;
use crate::mode::Mode;

pub const MODE_PLACEHOLDER: &str = "$mode";
pub const GHOSTBUST_PLACEHOLDER: &str = "$ghostbust";

const PLACEHOLDERS: [&str; 2] = [MODE_PLACEHOLDER, GHOSTBUST_PLACEHOLDER];

/// Built-in master template for the composition fragment program.
pub const BUILTIN_TEMPLATE: &str = include_str!("../shaders/composite.frag");

pub fn ghostbust_token(enabled: bool) -> &'static str {
    if enabled {
        "ghostbust_enabled"
    } else {
        "ghostbust_disabled"
    }
}

/// Master fragment program source with the two substitution points.
///
/// Custom templates must bind the same interface as the built-in one: the
/// `CompositeParams` block at set 0 and the left, right, and mask texture and
/// sampler pairs at set 1 bindings 0 to 5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTemplate {
    source: Cow<'static, str>,
}

impl Default for ProgramTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProgramTemplate {
    pub fn builtin() -> Self {
        Self {
            source: Cow::Borrowed(BUILTIN_TEMPLATE),
        }
    }

    /// Accepts a caller-supplied template containing both placeholders and no
    /// other `$name` tokens.
    pub fn custom(source: impl Into<String>) -> Result<Self, StereoError> {
        let source = source.into();
        if let Some(unknown) = placeholder_names(&source).find(|name| !is_placeholder(name)) {
            return Err(StereoError::Template(format!(
                "unknown placeholder `${unknown}`"
            )));
        }
        for placeholder in PLACEHOLDERS {
            if !placeholder_names(&source).any(|name| name == &placeholder[1..]) {
                return Err(StereoError::Template(format!(
                    "missing placeholder `{placeholder}`"
                )));
            }
        }
        Ok(Self {
            source: Cow::Owned(source),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, Cow::Borrowed(_))
    }

    /// Fragment program source for one (mode, ghostbust) variant.
    pub fn instantiate(&self, mode: Mode, ghostbust: bool) -> String {
        self.source
            .replace(GHOSTBUST_PLACEHOLDER, ghostbust_token(ghostbust))
            .replace(MODE_PLACEHOLDER, mode.shader_token())
    }
}

fn is_placeholder(name: &str) -> bool {
    PLACEHOLDERS.iter().any(|known| &known[1..] == name)
}

/// Names of every `$identifier` token in `source`, without the `$`. A `$`
/// not followed by an identifier character is ignored.
fn placeholder_names(source: &str) -> impl Iterator<Item = &str> {
    source.match_indices('$').filter_map(move |(index, _)| {
        let tail = &source[index + 1..];
        let len = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        (len > 0).then(|| &tail[..len])
    })
}

/// Parses and validates a fragment program without a GPU.
///
/// Uses the same GLSL frontend wgpu compiles with, so a variant that passes
/// here fails on a device only through pipeline interface mismatches.
pub fn validate_fragment(source: &str) -> Result<(), StereoError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga::ShaderStage::Fragment);
    let module = frontend
        .parse(&options, source)
        .map_err(|err| StereoError::ShaderCompile {
            log: err.to_string(),
        })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| StereoError::ShaderCompile {
        log: err.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_carries_both_placeholders() {
        let template = ProgramTemplate::builtin();
        assert!(template.is_builtin());
        assert!(ProgramTemplate::custom(template.source().to_string()).is_ok());
    }

    #[test]
    fn instantiation_replaces_every_placeholder() {
        let source = ProgramTemplate::builtin().instantiate(Mode::RedCyanDubois, true);
        assert!(source.contains("#define mode_red_cyan_dubois"));
        assert!(source.contains("#define ghostbust_enabled"));
        assert!(!source.contains('$'));

        let source = ProgramTemplate::builtin().instantiate(Mode::LeftRight, false);
        assert!(source.contains("#define mode_onechannel"));
        assert!(source.contains("#define ghostbust_disabled"));
    }

    #[test]
    fn custom_template_requires_both_placeholders() {
        let err = ProgramTemplate::custom("#define $mode\nvoid main() {}").unwrap_err();
        assert_eq!(
            err,
            StereoError::Template("missing placeholder `$ghostbust`".into())
        );
    }

    #[test]
    fn custom_template_rejects_unknown_placeholders() {
        let err = ProgramTemplate::custom("$mode $ghostbust $gamma").unwrap_err();
        assert_eq!(err, StereoError::Template("unknown placeholder `$gamma`".into()));
        assert!(ProgramTemplate::custom("$mode $ghostbust cost: 5$").is_ok());
    }

    #[test]
    fn placeholders_must_match_whole_identifiers() {
        let err = ProgramTemplate::custom("#define $modex\n#define $ghostbust\n").unwrap_err();
        assert_eq!(err, StereoError::Template("unknown placeholder `$modex`".into()));

        let err = ProgramTemplate::custom("#define $mode\n#define $ghostbust_on\n").unwrap_err();
        assert_eq!(
            err,
            StereoError::Template("unknown placeholder `$ghostbust_on`".into())
        );
    }

    #[test]
    fn every_builtin_variant_validates() {
        let template = ProgramTemplate::builtin();
        for mode in Mode::ALL {
            for ghostbust in [false, true] {
                let source = template.instantiate(mode, ghostbust);
                if let Err(err) = validate_fragment(&source) {
                    panic!("{mode} (ghostbust {ghostbust}) failed: {err}");
                }
            }
        }
    }

    #[test]
    fn broken_source_reports_compile_log() {
        let err = validate_fragment("#version 450\nvoid main() { undefined_call(); }").unwrap_err();
        assert!(matches!(err, StereoError::ShaderCompile { ref log } if !log.is_empty()));
    }
}
