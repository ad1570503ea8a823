//! Programmer trait definitions

use crate::error::Result;
use crate::spi::SpiCommand;
use bitflags::bitflags;

bitflags! {
    /// SPI master feature flags
    ///
    /// These flags indicate what capabilities a programmer supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiFeatures: u32 {
        /// Can clock the data phase on four lines (1-1-4)
        const QUAD = 1 << 0;
    }
}

impl Default for SpiFeatures {
    fn default() -> Self {
        SpiFeatures::empty()
    }
}

/// SPI Master trait
///
/// This trait represents a transport that can execute one chip-select framed
/// SPI transaction at a time. It is the only seam between the protocol layer
/// and the hardware: every W25N command is expressed as a [`SpiCommand`].
///
/// ## Example
///
/// ```ignore
/// impl SpiMaster for MyBridge {
///     fn features(&self) -> SpiFeatures {
///         SpiFeatures::empty()
///     }
///
///     fn max_read_len(&self) -> usize { 4096 }
///     fn max_write_len(&self) -> usize { 4096 }
///
///     fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///         default_execute(cmd, self.features(), |tx, rx| self.transfer(tx, rx))
///     }
/// }
/// ```
pub trait SpiMaster {
    /// Get the features supported by this programmer
    fn features(&self) -> SpiFeatures;

    /// Get the maximum number of bytes that can be read in a single transaction
    fn max_read_len(&self) -> usize;

    /// Get the maximum number of bytes that can be written in a single transaction
    fn max_write_len(&self) -> usize;

    /// Execute a single SPI command
    ///
    /// The command contains all the information needed for the transaction:
    /// - `opcode`: The SPI command opcode
    /// - `address`: Optional address (with width)
    /// - `io_mode`: Width of the data phase
    /// - `dummy_cycles`: Number of dummy clock cycles after address
    /// - `write_data`: Data to write after the header
    /// - `read_buf`: Buffer to read data into
    ///
    /// Chip select must stay asserted for the whole command and be released
    /// afterwards; W25N commands are latched on the rising edge of /CS.
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;
}

#[cfg(feature = "alloc")]
impl SpiMaster for alloc::boxed::Box<dyn SpiMaster + Send> {
    fn features(&self) -> SpiFeatures {
        (**self).features()
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn features(&self) -> SpiFeatures {
        (**self).features()
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }

    fn max_write_len(&self) -> usize {
        (**self).max_write_len()
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }
}

/// Helper function for implementing `SpiMaster::execute()`.
///
/// Most transports follow the same pattern:
/// 1. Check I/O mode is supported
/// 2. Build a write buffer from the command header + write data
/// 3. Call an internal transfer method
///
/// This function handles steps 1 and 2, delegating step 3 to the provided
/// closure. The closure receives the bytes to shift out and the read buffer
/// to fill directly.
///
/// # Example
///
/// ```ignore
/// fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> CoreResult<()> {
///     default_execute(cmd, self.features(), |write_data, read_buf| {
///         self.spi_transfer(write_data, read_buf)
///             .map_err(|_| CoreError::SpiTransferFailed)
///     })
/// }
/// ```
#[cfg(feature = "alloc")]
pub fn default_execute<F>(
    cmd: &mut SpiCommand<'_>,
    features: SpiFeatures,
    transfer_fn: F,
) -> Result<()>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<()>,
{
    use crate::spi::check_io_mode_supported;

    check_io_mode_supported(cmd.io_mode, features)?;

    let header_len = cmd.header_len();
    let mut write_data = alloc::vec![0u8; header_len + cmd.write_data.len()];
    cmd.encode_header(&mut write_data);
    write_data[header_len..].copy_from_slice(cmd.write_data);

    transfer_fn(&write_data, cmd.read_buf)
}
