//! Status register decoding
//!
//! The W25N exposes three 8-bit registers through the RDSR/WRSR opcodes,
//! selected by an address byte:
//!
//! | Register | Addr | Bits (7..0) |
//! |----------|------|-------------|
//! | SR1 | 0xA0 | SRP0 BP3 BP2 BP1 BP0 TB WP-E SRP1 |
//! | SR2 | 0xB0 | OTP-L OTP-E SR1-L ECC-E BUF ODS1 ODS0 H-DIS |
//! | SR3 | 0xC0 | - ECC1 ECC0 P-FAIL E-FAIL WEL BUSY |
//!
//! Everything here except [`read_register`] and friends is a pure projection
//! over the raw bytes.

use core::fmt;

use bitflags::bitflags;

use crate::error::Result;
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::spi::opcodes;

/// One of the three status/configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusRegister {
    /// SR1, block protection
    Protection,
    /// SR2, device configuration
    Configuration,
    /// SR3, operation status (read-only apart from latches)
    Status,
}

impl StatusRegister {
    /// Register address sent after RDSR/WRSR
    pub const fn addr(&self) -> u8 {
        match self {
            Self::Protection => opcodes::SR1_ADDR,
            Self::Configuration => opcodes::SR2_ADDR,
            Self::Status => opcodes::SR3_ADDR,
        }
    }
}

impl fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protection => write!(f, "SR1"),
            Self::Configuration => write!(f, "SR2"),
            Self::Status => write!(f, "SR3"),
        }
    }
}

bitflags! {
    /// SR1 - protection register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sr1: u8 {
        /// Status register protect 0
        const SRP0 = 1 << 7;
        /// Block protect bit 3
        const BP3 = 1 << 6;
        /// Block protect bit 2
        const BP2 = 1 << 5;
        /// Block protect bit 1
        const BP1 = 1 << 4;
        /// Block protect bit 0
        const BP0 = 1 << 3;
        /// Top/bottom protect direction
        const TB = 1 << 2;
        /// /WP pin enable
        const WP_E = 1 << 1;
        /// Status register protect 1
        const SRP1 = 1 << 0;

        /// All four block protect bits
        const BP_MASK = Self::BP3.bits() | Self::BP2.bits() | Self::BP1.bits() | Self::BP0.bits();
    }
}

impl Sr1 {
    /// BP[3:0] as a number
    pub const fn block_protect_bits(&self) -> u8 {
        (self.bits() & Self::BP_MASK.bits()) >> 3
    }

    /// Protection counts from the bottom of the array when set
    pub const fn is_top_bottom(&self) -> bool {
        self.contains(Self::TB)
    }

    /// /WP pin is honoured
    pub const fn is_write_protect_enabled(&self) -> bool {
        self.contains(Self::WP_E)
    }

    /// No block protect bits are set
    pub const fn is_unlocked(&self) -> bool {
        self.block_protect_bits() == 0
    }

    /// Encode a BP value and direction into SR1 bits
    pub const fn from_block_protect(bp: u8, top_bottom: bool) -> Self {
        let mut bits = (bp << 3) & Self::BP_MASK.bits();
        if top_bottom {
            bits |= Self::TB.bits();
        }
        Self::from_bits_retain(bits)
    }
}

bitflags! {
    /// SR2 - configuration register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sr2: u8 {
        /// OTP area lock (one-time)
        const OTP_L = 1 << 7;
        /// OTP access mode
        const OTP_E = 1 << 6;
        /// SR1 lock (one-time)
        const SR1_L = 1 << 5;
        /// On-chip ECC enable
        const ECC_E = 1 << 4;
        /// Buffer read mode (clear for continuous read)
        const BUF = 1 << 3;
        /// Output drive strength bit 1
        const ODS1 = 1 << 2;
        /// Output drive strength bit 0
        const ODS0 = 1 << 1;
        /// /HOLD function disable
        const H_DIS = 1 << 0;

        /// Output drive strength field
        const ODS_MASK = Self::ODS1.bits() | Self::ODS0.bits();
        /// Bits that can never be cleared once set
        const LOCKS = Self::OTP_L.bits() | Self::SR1_L.bits();
    }
}

impl Sr2 {
    /// ODS[1:0] as a number, 0 (strongest) to 3
    pub const fn output_drive_strength(&self) -> u8 {
        (self.bits() & Self::ODS_MASK.bits()) >> 1
    }

    /// OTP area has been permanently locked
    pub const fn is_otp_locked(&self) -> bool {
        self.contains(Self::OTP_L)
    }

    /// Device is in OTP access mode
    pub const fn is_otp_enabled(&self) -> bool {
        self.contains(Self::OTP_E)
    }

    /// SR1 has been permanently locked
    pub const fn is_sr1_locked(&self) -> bool {
        self.contains(Self::SR1_L)
    }

    /// On-chip ECC is active
    pub const fn is_ecc_enabled(&self) -> bool {
        self.contains(Self::ECC_E)
    }

    /// Buffer read mode is active
    pub const fn is_buffer_mode(&self) -> bool {
        self.contains(Self::BUF)
    }

    /// /HOLD pin is ignored
    pub const fn is_hold_disabled(&self) -> bool {
        self.contains(Self::H_DIS)
    }
}

bitflags! {
    /// SR3 - operation status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sr3: u8 {
        /// ECC status bit 1
        const ECC1 = 1 << 5;
        /// ECC status bit 0
        const ECC0 = 1 << 4;
        /// Last program failed or addressed a protected page
        const P_FAIL = 1 << 3;
        /// Last erase failed or addressed a protected block
        const E_FAIL = 1 << 2;
        /// Write enable latch
        const WEL = 1 << 1;
        /// Operation in progress
        const BUSY = 1 << 0;
    }
}

/// Mask applied when extracting the ECC field
///
/// Bit 6 is reserved on this part; it is included so a stray value lands in
/// the fallback of [`EccStatus::from_field`] instead of aliasing a real code.
pub const SR3_ECC_FIELD_MASK: u8 = 0x70;

impl Sr3 {
    /// OIP/BUSY bit
    pub const fn is_busy(&self) -> bool {
        self.contains(Self::BUSY)
    }

    /// Write enable latch is set
    pub const fn is_write_enable_latched(&self) -> bool {
        self.contains(Self::WEL)
    }

    /// P-FAIL bit
    pub const fn program_failed(&self) -> bool {
        self.contains(Self::P_FAIL)
    }

    /// E-FAIL bit
    pub const fn erase_failed(&self) -> bool {
        self.contains(Self::E_FAIL)
    }

    /// Raw ECC field, bits 6:4
    pub const fn ecc_field(&self) -> u8 {
        (self.bits() & SR3_ECC_FIELD_MASK) >> 4
    }

    /// ECC result of the last page read
    pub fn ecc_class(&self) -> EccStatus {
        EccStatus::from_field(self.ecc_field())
    }
}

/// ECC result of a page read
///
/// The device encoding is not ordered by severity: `0b10` is worse than
/// `0b11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum EccStatus {
    /// No bit errors
    Ok,
    /// 1-4 bit errors corrected
    CorrectedOk,
    /// More than 4 bit errors, data not corrected
    Uncorrectable,
    /// Corrected, but the error count reached the threshold
    CorrectedAtThreshold,
}

impl EccStatus {
    /// Decode the ECC field of SR3 (already shifted down)
    pub fn from_field(field: u8) -> Self {
        match field {
            0b00 => Self::Ok,
            0b01 => Self::CorrectedOk,
            0b10 => Self::Uncorrectable,
            0b11 => Self::CorrectedAtThreshold,
            other => {
                log::warn!("Reserved ECC status 0b{:03b}, treating as OK", other);
                Self::Ok
            }
        }
    }

    /// Data returned with this status can be consumed
    pub const fn is_trusted(&self) -> bool {
        !matches!(self, Self::Uncorrectable)
    }

    /// Some correction took place
    pub const fn was_corrected(&self) -> bool {
        matches!(self, Self::CorrectedOk | Self::CorrectedAtThreshold)
    }
}

impl fmt::Display for EccStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::CorrectedOk => "corrected",
            Self::Uncorrectable => "uncorrectable",
            Self::CorrectedAtThreshold => "corrected (threshold reached)",
        };
        f.write_str(s)
    }
}

/// All three registers read back to back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Protection register
    pub sr1: Sr1,
    /// Configuration register
    pub sr2: Sr2,
    /// Status register
    pub sr3: Sr3,
}

/// Read a register by id
pub fn read_register<M: SpiMaster + ?Sized>(master: &mut M, reg: StatusRegister) -> Result<u8> {
    protocol::read_status(master, reg.addr())
}

/// Read and decode SR1
pub fn read_sr1<M: SpiMaster + ?Sized>(master: &mut M) -> Result<Sr1> {
    read_register(master, StatusRegister::Protection).map(Sr1::from_bits_retain)
}

/// Read and decode SR2
pub fn read_sr2<M: SpiMaster + ?Sized>(master: &mut M) -> Result<Sr2> {
    read_register(master, StatusRegister::Configuration).map(Sr2::from_bits_retain)
}

/// Read and decode SR3
pub fn read_sr3<M: SpiMaster + ?Sized>(master: &mut M) -> Result<Sr3> {
    read_register(master, StatusRegister::Status).map(Sr3::from_bits_retain)
}

/// Read all three registers
pub fn read_all<M: SpiMaster + ?Sized>(master: &mut M) -> Result<StatusSnapshot> {
    Ok(StatusSnapshot {
        sr1: read_sr1(master)?,
        sr2: read_sr2(master)?,
        sr3: read_sr3(master)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMaster;

    #[test]
    fn test_ecc_mapping_is_not_monotonic() {
        assert_eq!(Sr3::from_bits_retain(0x00).ecc_class(), EccStatus::Ok);
        assert_eq!(Sr3::from_bits_retain(0x10).ecc_class(), EccStatus::CorrectedOk);
        assert_eq!(Sr3::from_bits_retain(0x20).ecc_class(), EccStatus::Uncorrectable);
        assert_eq!(
            Sr3::from_bits_retain(0x30).ecc_class(),
            EccStatus::CorrectedAtThreshold
        );
        assert!(EccStatus::CorrectedAtThreshold.is_trusted());
        assert!(!EccStatus::Uncorrectable.is_trusted());
    }

    #[test]
    fn test_reserved_ecc_pattern_falls_back_to_ok() {
        for raw in [0x40u8, 0x50, 0x60, 0x70] {
            assert_eq!(Sr3::from_bits_retain(raw).ecc_class(), EccStatus::Ok);
        }
    }

    #[test]
    fn test_sr3_projections() {
        let sr3 = Sr3::from_bits_retain(0x0F);
        assert!(sr3.is_busy());
        assert!(sr3.is_write_enable_latched());
        assert!(sr3.erase_failed());
        assert!(sr3.program_failed());
        assert!(!Sr3::empty().is_busy());
    }

    #[test]
    fn test_block_protect_bits() {
        let sr1 = Sr1::from_bits_retain(0x7C);
        assert_eq!(sr1.block_protect_bits(), 0x0F);
        assert!(sr1.is_top_bottom());
        assert!(!sr1.is_write_protect_enabled());
        assert_eq!(Sr1::from_block_protect(0x05, false).bits(), 0x28);
        assert!(Sr1::from_bits_retain(0x83).is_unlocked());
    }

    #[test]
    fn test_drive_strength() {
        assert_eq!(Sr2::from_bits_retain(0x06).output_drive_strength(), 3);
        assert_eq!(Sr2::from_bits_retain(0x18).output_drive_strength(), 0);
        assert!(Sr2::from_bits_retain(0x18).is_ecc_enabled());
    }

    #[test]
    fn test_read_register_uses_address_byte() {
        let mut master = MockMaster::new();
        master.sr[2] = 0x02;
        let sr3 = read_sr3(&mut master).unwrap();
        assert!(sr3.is_write_enable_latched());
        assert_eq!(master.sent(0), &[0x05, 0xC0]);
    }
}
