//! SPI I/O modes

use crate::error::{Error, Result};
use crate::programmer::SpiFeatures;

/// I/O mode for SPI transactions
///
/// W25N command and address phases are always single line; only the data
/// phase of the quad load and quad read commands widens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// Standard SPI: 1-1-1
    #[default]
    Single,
    /// Quad data phase: 1-1-4
    QuadOut,
}

impl IoMode {
    /// Returns the number of data lines used for the data phase
    pub const fn data_lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::QuadOut => 4,
        }
    }

    /// Returns true if this mode requires quad I/O capability
    pub const fn requires_quad(&self) -> bool {
        matches!(self, Self::QuadOut)
    }
}

/// Check if a programmer supports the requested I/O mode
///
/// Returns `Ok(())` if the mode is supported. Unsupported modes are reported
/// as a transfer failure since nothing was put on the bus.
pub fn check_io_mode_supported(mode: IoMode, features: SpiFeatures) -> Result<()> {
    match mode {
        IoMode::Single => Ok(()),
        IoMode::QuadOut if features.contains(SpiFeatures::QUAD) => Ok(()),
        IoMode::QuadOut => {
            log::debug!("quad data phase requested but programmer lacks QUAD");
            Err(Error::SpiTransferFailed)
        }
    }
}
