//! Retired-instruction counts.

/// A count of retired instructions.
///
/// Instruction-stepped cores have no master clock; progress is measured in
/// instructions retired since reset. Exception deliveries are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Count one more retired instruction.
    pub fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

impl core::fmt::Display for Ticks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} instructions", self.0)
    }
}
