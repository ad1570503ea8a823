//! Bad-block table entry and summary types

use core::fmt;

/// State of one erase block in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BlockState {
    /// Usable
    #[default]
    Good,
    /// Marked bad at the factory (marker byte not 0xFF at scan time)
    FactoryBad,
    /// Retired after an erase or program failure
    RuntimeBad,
}

impl BlockState {
    /// Either kind of bad
    pub const fn is_bad(&self) -> bool {
        !matches!(self, Self::Good)
    }
}

/// Counts over the whole table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct BbtSummary {
    /// Blocks in the array
    pub total: u16,
    /// Blocks not marked bad (reserved blocks included)
    pub good: u16,
    /// Blocks found bad by the factory scan
    pub factory_bad: u16,
    /// Blocks retired at runtime
    pub runtime_bad: u16,
    /// Factory reserved blocks, never scanned
    pub reserved: u16,
}

impl BbtSummary {
    /// Factory plus runtime bad blocks
    pub const fn bad(&self) -> u16 {
        self.factory_bad + self.runtime_bad
    }
}

impl fmt::Display for BbtSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {}, good {}, bad {} (factory {}, runtime {}), reserved {}",
            self.total,
            self.good,
            self.bad(),
            self.factory_bad,
            self.runtime_bad,
            self.reserved
        )
    }
}
