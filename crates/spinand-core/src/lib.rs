//! spinand-core - Protocol layer for W25N02KV SPI NAND flash
//!
//! This crate drives a single-die SPI NAND device over an abstract SPI
//! transport. It is designed to be `no_std` compatible so the same code runs
//! on a microcontroller and behind the host-side CLI.
//!
//! # Layers
//!
//! - [`spi`] / [`protocol`] - command framings and one function per opcode
//! - [`status`] - decoding of the three status registers
//! - [`wp`] - write-enable latch handling and configuration setters
//! - [`flash`] - erase/program/read orchestration on a [`flash::NandDevice`]
//! - [`bbt`] - the bad-block table and its gatekeeper helpers
//! - [`otp`] - one-time-programmable page access
//! - [`pattern`] - test data patterns
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), the
//!   `Instant` based clock and TOML configuration loading
//! - `alloc` - Enable heap allocation in transport helpers
//!
//! # Example
//!
//! ```ignore
//! use spinand_core::bbt::BbtManager;
//! use spinand_core::flash::NandDevice;
//! use spinand_core::programmer::{SpiMaster, StdClock};
//!
//! fn first_usable<M: SpiMaster>(master: M) -> spinand_core::Result<Option<u16>> {
//!     let mut nand = NandDevice::new(master, StdClock::new());
//!     nand.probe()?;
//!     let mut bbt = BbtManager::new();
//!     bbt.scan_factory_blocks(&mut nand)?;
//!     Ok(bbt.first_valid_block())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bbt;
pub mod config;
pub mod error;
pub mod flash;
pub mod otp;
pub mod pattern;
pub mod programmer;
pub mod protocol;
pub mod spi;
pub mod status;
pub mod wp;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
