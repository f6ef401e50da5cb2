use core::fmt;
use core::num::NonZeroU32;

/// Position of a well in the model's well list, stable for a whole run.
///
/// Stored as index + 1 so `Option<WellId>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellId(NonZeroU32);

impl WellId {
    /// `u32::MAX` saturates; no model holds that many wells.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Index into per-well slices such as completion tables.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WellId({})", self.index())
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "well#{}", self.index())
    }
}
