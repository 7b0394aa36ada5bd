/// Whether frame `counter` is even: alternating output shows the left eye
/// and split sync markers use their first colour.
pub(crate) fn is_even(counter: u64) -> bool {
    counter % 2 == 0
}

/// Position of frame `counter` within the four-frame cycle of the alternating
/// sync marker.
pub(crate) fn quarter(counter: u64) -> u64 {
    counter % 4
}

/// Source of a hardware vertical-sync counter.
///
/// Hosts that can read the display's retrace counter (for example through a
/// platform video-sync extension) implement this so alternating output stays
/// locked to physical display frames. Returning `None` means the counter is
/// unavailable for this frame.
pub trait VsyncCounter {
    fn query(&mut self) -> Option<u64>;
}

impl<F> VsyncCounter for F
where
    F: FnMut() -> Option<u64>,
{
    fn query(&mut self) -> Option<u64> {
        self()
    }
}

/// Frame counter driving alternating-eye selection and sync-marker colours.
#[derive(Default)]
pub struct FrameParity {
    value: u64,
    vsync: Option<Box<dyn VsyncCounter>>,
}

impl FrameParity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vsync_counter(counter: Box<dyn VsyncCounter>) -> Self {
        Self {
            value: 0,
            vsync: Some(counter),
        }
    }

    pub fn set_vsync_counter(&mut self, counter: Option<Box<dyn VsyncCounter>>) {
        self.vsync = counter;
    }

    /// Advances once per frame: adopts the hardware counter when it answers,
    /// otherwise increments by one.
    pub fn advance(&mut self) -> u64 {
        let hardware = self.vsync.as_mut().and_then(|counter| counter.query());
        self.value = match hardware {
            Some(value) => value,
            None => self.value.wrapping_add(1),
        };
        self.value
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    #[cfg(test)]
    pub(crate) fn force(&mut self, value: u64) {
        self.value = value;
    }
}

impl std::fmt::Debug for FrameParity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameParity")
            .field("value", &self.value)
            .field("hardware", &self.vsync.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_without_hardware() {
        let mut parity = FrameParity::new();
        assert_eq!(parity.advance(), 1);
        assert_eq!(parity.advance(), 2);
        assert!(is_even(parity.value()));
    }

    #[test]
    fn adopts_hardware_counter() {
        let mut ticks = vec![Some(40), Some(41), None, Some(100)].into_iter();
        let mut parity =
            FrameParity::with_vsync_counter(Box::new(move || ticks.next().flatten()));
        assert_eq!(parity.advance(), 40);
        assert_eq!(parity.advance(), 41);
        // query failure falls back to a plain increment
        assert_eq!(parity.advance(), 42);
        assert_eq!(parity.advance(), 100);
        assert_eq!(quarter(parity.value()), 0);
    }
}
