//! Stereoscopic display modes and the per-mode behaviour table.
//!
//! Every mode maps to one [`ModeEntry`] row, which the compositor and the
//! shader cache read instead of comparing modes inline.

use std::fmt;
use std::str::FromStr;

use crate::types::Eye;

/// The 24 supported output layouts. Discriminants are stable mode ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Mode {
    /// Hardware quad-buffered stereo (separate back-left / back-right targets).
    QuadBuffer = 0,
    /// Left and right view on alternating display frames.
    Alternating = 1,
    MonoLeft = 2,
    MonoRight = 3,
    /// Left view in the left half, right view in the right half.
    LeftRight = 4,
    /// Left view in the top half, right view in the bottom half.
    TopBottom = 5,
    /// Top/bottom separated by a blank band of 1/49 of the height.
    HdmiFramePack = 6,
    EvenOddRows = 7,
    EvenOddColumns = 8,
    Checkerboard = 9,
    RedCyanMonochrome = 10,
    RedCyanHalfColor = 11,
    RedCyanFullColor = 12,
    RedCyanDubois = 13,
    GreenMagentaMonochrome = 14,
    GreenMagentaHalfColor = 15,
    GreenMagentaFullColor = 16,
    GreenMagentaDubois = 17,
    AmberBlueMonochrome = 18,
    AmberBlueHalfColor = 19,
    AmberBlueFullColor = 20,
    AmberBlueDubois = 21,
    RedGreenMonochrome = 22,
    RedBlueMonochrome = 23,
}

/// Coarse grouping of modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    QuadBuffer,
    Temporal,
    Mono,
    Split,
    Interleave,
    Anaglyph,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::QuadBuffer => "quad-buffer",
            Family::Temporal => "temporal",
            Family::Mono => "mono",
            Family::Split => "split",
            Family::Interleave => "interleave",
            Family::Anaglyph => "anaglyph",
        };
        f.write_str(name)
    }
}

/// Which eyes a mode consumes in a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredEyes {
    Both,
    Only(Eye),
    /// Left on even frame counters, right on odd ones.
    Alternating,
}

/// How the compositor lays the views out in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    QuadBuffer,
    /// One draw; the fragment program combines both eyes.
    Combined,
    /// One draw of the single required eye.
    SingleEye,
    SideBySide,
    TopBottom,
    HdmiFramePack,
}

/// 2x2 selection mask used by the pixel-interleave modes.
///
/// A texel value of 1 selects the left view, 0 the right view. Bytes are in
/// row-major order starting at the bottom-left texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskPattern {
    Rows,
    Columns,
    Checkerboard,
}

impl MaskPattern {
    pub fn texels(self) -> [u8; 4] {
        match self {
            MaskPattern::Rows => [0xff, 0xff, 0x00, 0x00],
            MaskPattern::Columns => [0xff, 0x00, 0xff, 0x00],
            MaskPattern::Checkerboard => [0xff, 0x00, 0x00, 0xff],
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            MaskPattern::Rows => 0,
            MaskPattern::Columns => 1,
            MaskPattern::Checkerboard => 2,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ModeEntry {
    pub name: &'static str,
    pub token: &'static str,
    pub family: Family,
    pub required: RequiredEyes,
    pub layout: Layout,
    pub mask: Option<MaskPattern>,
    /// Whether the crosstalk vector is handed to the program when ghostbusting.
    pub crosstalk: bool,
    /// Swap eyes when `(screen_y + viewport_y)` is even.
    pub row_parity: bool,
    /// Swap eyes when `(screen_x + viewport_x)` is odd.
    pub column_parity: bool,
}

const ONE_CHANNEL: &str = "mode_onechannel";

const fn plain(
    name: &'static str,
    family: Family,
    required: RequiredEyes,
    layout: Layout,
) -> ModeEntry {
    ModeEntry {
        name,
        token: ONE_CHANNEL,
        family,
        required,
        layout,
        mask: None,
        crosstalk: false,
        row_parity: false,
        column_parity: false,
    }
}

const fn interleave(
    name: &'static str,
    token: &'static str,
    mask: MaskPattern,
    row_parity: bool,
    column_parity: bool,
) -> ModeEntry {
    ModeEntry {
        name,
        token,
        family: Family::Interleave,
        required: RequiredEyes::Both,
        layout: Layout::Combined,
        mask: Some(mask),
        crosstalk: false,
        row_parity,
        column_parity,
    }
}

const fn anaglyph(name: &'static str, token: &'static str, crosstalk: bool) -> ModeEntry {
    ModeEntry {
        name,
        token,
        family: Family::Anaglyph,
        required: RequiredEyes::Both,
        layout: Layout::Combined,
        mask: None,
        crosstalk,
        row_parity: false,
        column_parity: false,
    }
}

static MODE_TABLE: [ModeEntry; 24] = [
    plain(
        "quad-buffer",
        Family::QuadBuffer,
        RequiredEyes::Both,
        Layout::QuadBuffer,
    ),
    plain(
        "alternating",
        Family::Temporal,
        RequiredEyes::Alternating,
        Layout::SingleEye,
    ),
    plain(
        "mono-left",
        Family::Mono,
        RequiredEyes::Only(Eye::Left),
        Layout::SingleEye,
    ),
    plain(
        "mono-right",
        Family::Mono,
        RequiredEyes::Only(Eye::Right),
        Layout::SingleEye,
    ),
    plain(
        "left-right",
        Family::Split,
        RequiredEyes::Both,
        Layout::SideBySide,
    ),
    plain(
        "top-bottom",
        Family::Split,
        RequiredEyes::Both,
        Layout::TopBottom,
    ),
    plain(
        "hdmi-frame-pack",
        Family::Split,
        RequiredEyes::Both,
        Layout::HdmiFramePack,
    ),
    interleave(
        "even-odd-rows",
        "mode_even_odd_rows",
        MaskPattern::Rows,
        true,
        false,
    ),
    interleave(
        "even-odd-columns",
        "mode_even_odd_columns",
        MaskPattern::Columns,
        false,
        true,
    ),
    interleave(
        "checkerboard",
        "mode_checkerboard",
        MaskPattern::Checkerboard,
        true,
        true,
    ),
    anaglyph("red-cyan-monochrome", "mode_red_cyan_monochrome", true),
    anaglyph("red-cyan-half-color", "mode_red_cyan_half_color", true),
    anaglyph("red-cyan-full-color", "mode_red_cyan_full_color", true),
    anaglyph("red-cyan-dubois", "mode_red_cyan_dubois", true),
    anaglyph(
        "green-magenta-monochrome",
        "mode_green_magenta_monochrome",
        true,
    ),
    anaglyph(
        "green-magenta-half-color",
        "mode_green_magenta_half_color",
        true,
    ),
    anaglyph(
        "green-magenta-full-color",
        "mode_green_magenta_full_color",
        true,
    ),
    anaglyph("green-magenta-dubois", "mode_green_magenta_dubois", true),
    anaglyph("amber-blue-monochrome", "mode_amber_blue_monochrome", true),
    anaglyph("amber-blue-half-color", "mode_amber_blue_half_color", true),
    anaglyph("amber-blue-full-color", "mode_amber_blue_full_color", true),
    anaglyph("amber-blue-dubois", "mode_amber_blue_dubois", true),
    anaglyph("red-green-monochrome", "mode_red_green_monochrome", false),
    anaglyph("red-blue-monochrome", "mode_red_blue_monochrome", false),
];

impl Mode {
    pub const ALL: [Mode; 24] = [
        Mode::QuadBuffer,
        Mode::Alternating,
        Mode::MonoLeft,
        Mode::MonoRight,
        Mode::LeftRight,
        Mode::TopBottom,
        Mode::HdmiFramePack,
        Mode::EvenOddRows,
        Mode::EvenOddColumns,
        Mode::Checkerboard,
        Mode::RedCyanMonochrome,
        Mode::RedCyanHalfColor,
        Mode::RedCyanFullColor,
        Mode::RedCyanDubois,
        Mode::GreenMagentaMonochrome,
        Mode::GreenMagentaHalfColor,
        Mode::GreenMagentaFullColor,
        Mode::GreenMagentaDubois,
        Mode::AmberBlueMonochrome,
        Mode::AmberBlueHalfColor,
        Mode::AmberBlueFullColor,
        Mode::AmberBlueDubois,
        Mode::RedGreenMonochrome,
        Mode::RedBlueMonochrome,
    ];

    pub(crate) fn entry(self) -> &'static ModeEntry {
        &MODE_TABLE[self.id() as usize]
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Stable kebab-case name, e.g. `red-cyan-dubois`.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Token substituted for `$mode` in the fragment program template.
    pub fn shader_token(self) -> &'static str {
        self.entry().token
    }

    pub fn family(self) -> Family {
        self.entry().family
    }

    pub fn required_eyes(self) -> RequiredEyes {
        self.entry().required
    }

    pub fn mask(self) -> Option<MaskPattern> {
        self.entry().mask
    }

    /// Next mode in id order, wrapping around. Quad-buffer is skipped when the
    /// host has no separate right back buffer.
    pub fn next(self, has_quad_buffer: bool) -> Mode {
        let next = Mode::ALL[(self.id() as usize + 1) % Mode::ALL.len()];
        if next == Mode::QuadBuffer && !has_quad_buffer {
            Mode::Alternating
        } else {
            next
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stereo mode '{0}'")]
pub struct UnknownMode(pub String);

impl TryFrom<u32> for Mode {
    type Error = UnknownMode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Mode::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| UnknownMode(value.to_string()))
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Accepts kebab-case or snake_case names, case-insensitively, or a numeric id.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(id) = normalized.parse::<u32>() {
            return Mode::try_from(id);
        }
        let normalized = normalized.strip_prefix("mode-").unwrap_or(&normalized);
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| UnknownMode(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_line_up_with_discriminants() {
        for (index, mode) in Mode::ALL.iter().enumerate() {
            assert_eq!(mode.id() as usize, index);
            assert_eq!(Mode::try_from(index as u32), Ok(*mode));
        }
        assert!(Mode::try_from(24).is_err());
    }

    #[test]
    fn shader_tokens_match_names() {
        for mode in Mode::ALL {
            let token = mode.shader_token();
            match mode.family() {
                Family::Anaglyph | Family::Interleave => {
                    assert_eq!(token, format!("mode_{}", mode.name().replace('-', "_")));
                }
                _ => assert_eq!(token, "mode_onechannel"),
            }
        }
    }

    #[test]
    fn parses_names_and_ids() {
        assert_eq!("red-cyan-dubois".parse::<Mode>(), Ok(Mode::RedCyanDubois));
        assert_eq!("EVEN_ODD_ROWS".parse::<Mode>(), Ok(Mode::EvenOddRows));
        assert_eq!("mode_checkerboard".parse::<Mode>(), Ok(Mode::Checkerboard));
        assert_eq!("4".parse::<Mode>(), Ok(Mode::LeftRight));
        assert!("sideways".parse::<Mode>().is_err());
    }

    #[test]
    fn family_counts() {
        let anaglyphs = Mode::ALL
            .iter()
            .filter(|mode| mode.family() == Family::Anaglyph)
            .count();
        assert_eq!(anaglyphs, 14);
        let masks = Mode::ALL.iter().filter(|mode| mode.mask().is_some()).count();
        assert_eq!(masks, 3);
    }

    #[test]
    fn next_wraps_and_skips_quad_buffer() {
        assert_eq!(Mode::RedBlueMonochrome.next(true), Mode::QuadBuffer);
        assert_eq!(Mode::RedBlueMonochrome.next(false), Mode::Alternating);
        assert_eq!(Mode::LeftRight.next(false), Mode::TopBottom);
    }

    #[test]
    fn crosstalk_excludes_pure_two_channel_anaglyphs() {
        assert!(Mode::RedCyanDubois.entry().crosstalk);
        assert!(!Mode::RedGreenMonochrome.entry().crosstalk);
        assert!(!Mode::RedBlueMonochrome.entry().crosstalk);
        assert!(!Mode::Checkerboard.entry().crosstalk);
        assert!(!Mode::LeftRight.entry().crosstalk);
    }

    #[test]
    fn mask_texels() {
        assert_eq!(MaskPattern::Rows.texels(), [0xff, 0xff, 0, 0]);
        assert_eq!(MaskPattern::Columns.texels(), [0xff, 0, 0xff, 0]);
        assert_eq!(MaskPattern::Checkerboard.texels(), [0xff, 0, 0, 0xff]);
    }
}
