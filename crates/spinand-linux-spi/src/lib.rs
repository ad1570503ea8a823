//! spinand-linux-spi - Linux spidev transport
//!
//! Drives a W25N part wired to an SPI controller exposed by the kernel as
//! `/dev/spidevX.Y`.
//!
//! # Example
//!
//! ```no_run
//! use spinand_core::flash::NandDevice;
//! use spinand_core::programmer::StdClock;
//! use spinand_linux_spi::{LinuxSpi, LinuxSpiConfig};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0")
//!     .with_speed(20_000_000)
//!     .with_quad(true);
//! let spi = LinuxSpi::open(&config)?;
//!
//! let mut nand = NandDevice::new(spi, StdClock::new());
//! nand.probe()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the spinand CLI
//!
//! ```bash
//! spinand probe -p linux_spi:dev=/dev/spidev0.0
//! spinand read -p linux_spi:dev=/dev/spidev0.0,spispeed=20000,quad=yes --block 8 --page 0 -o page.bin
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - Quad mode needs IO2/IO3 routed and a controller that honours
//!   `SPI_TX_QUAD`/`SPI_RX_QUAD`

pub mod device;
pub mod error;

pub use device::{mode, parse_options, LinuxSpi, LinuxSpiConfig};
pub use error::{LinuxSpiError, Result};

/// Open a Linux SPI device and return a boxed SpiMaster
///
/// Options: `dev=/dev/spidev0.0` (required), `spispeed=<kHz>`, `mode=0|3`
/// and `quad=yes|no`.
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<
    Box<dyn spinand_core::programmer::SpiMaster + Send>,
    Box<dyn std::error::Error>,
> {
    let config = parse_options(options)?;
    let spi = LinuxSpi::open(&config)?;
    Ok(Box::new(spi))
}
