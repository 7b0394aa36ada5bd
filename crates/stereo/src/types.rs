use std::fmt;

/// One of the two monocular views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// Slot index used by the per-eye arrays (left = 0, right = 1).
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    pub fn other(self) -> Eye {
        match self {
            Eye::Left => Eye::Right,
            Eye::Right => Eye::Left,
        }
    }

    /// Value written to the program's `channel` uniform when this eye is drawn alone.
    pub(crate) fn channel(self) -> f32 {
        match self {
            Eye::Left => 0.0,
            Eye::Right => 1.0,
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eye::Left => f.write_str("left"),
            Eye::Right => f.write_str("right"),
        }
    }
}

/// Pixel rectangle in framebuffer coordinates.
///
/// The origin is the bottom-left corner and rows count upwards, matching the
/// convention the interleave parity rules and sync-marker rows are defined in.
/// Backends with a top-left origin convert when they encode the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-surface viewport anchored at the origin.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn at_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Per-channel crosstalk of the display device, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Crosstalk {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Crosstalk {
    pub const NONE: Crosstalk = Crosstalk {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn scaled(self, factor: f32) -> [f32; 3] {
        [self.r * factor, self.g * factor, self.b * factor]
    }
}

/// Tunables a session starts with; every field also has a setter on the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Screen position of the viewport's bottom-left corner.
    pub screen_origin: (i32, i32),
    pub crosstalk: Crosstalk,
    /// Ghostbusting level in `[0, 1]`; zero disables it.
    pub ghostbust: f32,
    pub parallax_adjust: f32,
    /// Number of compiled composition programs kept resident. One reproduces
    /// the classic single-slot behaviour.
    pub program_cache_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            screen_origin: (0, 0),
            crosstalk: Crosstalk::NONE,
            ghostbust: 0.0,
            parallax_adjust: 0.0,
            program_cache_capacity: 1,
        }
    }
}

/// Version of this crate as `(major, minor, patch, "major.minor.patch")`.
pub fn version() -> (u32, u32, u32, &'static str) {
    let parse = |value: &str| value.parse().unwrap_or(0);
    (
        parse(env!("CARGO_PKG_VERSION_MAJOR")),
        parse(env!("CARGO_PKG_VERSION_MINOR")),
        parse(env!("CARGO_PKG_VERSION_PATCH")),
        env!("CARGO_PKG_VERSION"),
    )
}
