//! Write-enable latch and configuration registers
//!
//! # Overview
//!
//! Every mutating command on the W25N (erase, program execute, status
//! register write) is preceded here by a write enable whose effect is read
//! back from SR3.WEL. A latch that does not set aborts the operation.
//!
//! Configuration setters all run the same sequence:
//!
//! 1. read the register
//! 2. merge the target bits into the current value
//! 3. write enable
//! 4. write the register
//! 5. read back and compare the target bits
//!
//! Success is decided by step 5, never by the write itself.
//!
//! # Irreversible bits
//!
//! SR2.OTP-L and SR2.SR1-L are one-time: [`lock_otp`] and [`lock_sr1`] only
//! ever set them, and [`update_register`] refuses any value that would clear
//! a lock bit that is already set.
//!
//! # Example
//!
//! ```ignore
//! use spinand_core::wp::{self, BlockProtect};
//!
//! wp::unlock_all(&mut spi)?;
//! wp::set_block_protect(&mut spi, BlockProtect::new(0x05, false)?)?;
//! println!("mode: {}", wp::read_protect_config(&mut spi)?.mode);
//! ```

mod ops;
mod types;

pub use ops::*;
pub use types::*;
