//! Write protection types

use core::fmt;
use core::ops::Range;

use crate::error::{InvalidArgument, Result};
use crate::flash::BLOCK_COUNT;
use crate::status::{Sr1, Sr2};

/// Write-enable latch state as observed in SR3.WEL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelState {
    /// Mutating commands are ignored by the device
    Disabled,
    /// Next erase/program/status write will be accepted
    Enabled,
}

/// Status register protection mode selected by SRP1/SRP0
///
/// | SRP1 | SRP0 | WP-E | Mode |
/// |------|------|------|------|
/// | 0 | 0 | x | software protection |
/// | 0 | 1 | 1 | hardware protection while /WP is low |
/// | 1 | 0 | x | power supply lock-down |
/// | 1 | 1 | x | one time program |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtectMode {
    /// SR1 writable after a write enable
    #[default]
    Software,
    /// SR1 locked while /WP is driven low
    Hardware,
    /// SR1 locked until the next power cycle
    PowerCycle,
    /// SR1 locked forever
    Permanent,
}

impl ProtectMode {
    /// Decode the mode from SR1
    pub fn from_sr1(sr1: Sr1) -> Self {
        match (sr1.contains(Sr1::SRP1), sr1.contains(Sr1::SRP0)) {
            (false, false) => Self::Software,
            (false, true) if sr1.contains(Sr1::WP_E) => Self::Hardware,
            (false, true) => Self::Software,
            (true, false) => Self::PowerCycle,
            (true, true) => Self::Permanent,
        }
    }
}

impl fmt::Display for ProtectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Software => "software",
            Self::Hardware => "hardware",
            Self::PowerCycle => "power_cycle",
            Self::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

/// Block protect setting: BP[3:0] plus the TB direction bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockProtect {
    bp: u8,
    top_bottom: bool,
}

impl BlockProtect {
    /// Highest BP value the register can hold
    pub const MAX: u8 = 0x0F;

    /// Create a setting, rejecting BP values above 15
    pub fn new(bp: u8, top_bottom: bool) -> Result<Self> {
        if bp > Self::MAX {
            return Err(InvalidArgument::BlockProtect(bp).into());
        }
        Ok(Self { bp, top_bottom })
    }

    /// Nothing protected
    pub const fn none() -> Self {
        Self {
            bp: 0,
            top_bottom: false,
        }
    }

    /// Decode from SR1
    pub const fn from_sr1(sr1: Sr1) -> Self {
        Self {
            bp: sr1.block_protect_bits(),
            top_bottom: sr1.is_top_bottom(),
        }
    }

    /// BP[3:0]
    pub const fn bp(&self) -> u8 {
        self.bp
    }

    /// TB bit
    pub const fn top_bottom(&self) -> bool {
        self.top_bottom
    }

    /// SR1 bits for this setting
    pub const fn to_sr1(&self) -> Sr1 {
        Sr1::from_block_protect(self.bp, self.top_bottom)
    }

    /// True when no blocks are protected
    pub const fn is_none(&self) -> bool {
        self.bp == 0
    }

    /// Blocks covered by this setting
    ///
    /// BP=n covers 2^(n+1) blocks, saturating at the whole array, taken
    /// from the top of the array unless TB is set.
    pub fn protected_blocks(&self) -> Range<u16> {
        if self.is_none() {
            return 0..0;
        }
        let count = (1u32 << (self.bp as u32 + 1)).min(BLOCK_COUNT as u32) as u16;
        if self.top_bottom {
            0..count
        } else {
            BLOCK_COUNT - count..BLOCK_COUNT
        }
    }
}

impl fmt::Display for BlockProtect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        write!(
            f,
            "BP=0x{:X} ({})",
            self.bp,
            if self.top_bottom { "bottom" } else { "top" }
        )
    }
}

/// Everything SR1 says about protection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectConfig {
    /// Block protect range
    pub block_protect: BlockProtect,
    /// SRP1/SRP0 mode
    pub mode: ProtectMode,
    /// /WP pin enable
    pub wp_enabled: bool,
}

impl ProtectConfig {
    /// Decode from SR1
    pub fn from_sr1(sr1: Sr1) -> Self {
        Self {
            block_protect: BlockProtect::from_sr1(sr1),
            mode: ProtectMode::from_sr1(sr1),
            wp_enabled: sr1.is_write_protect_enabled(),
        }
    }
}

/// Everything SR2 says about the device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// OTP area permanently locked
    pub otp_locked: bool,
    /// OTP access mode active
    pub otp_enabled: bool,
    /// SR1 permanently locked
    pub sr1_locked: bool,
    /// On-chip ECC active
    pub ecc_enabled: bool,
    /// Buffer read mode active
    pub buffer_mode: bool,
    /// Output drive strength, 0-3
    pub drive_strength: u8,
    /// /HOLD ignored
    pub hold_disabled: bool,
}

impl DeviceConfig {
    /// Decode from SR2
    pub fn from_sr2(sr2: Sr2) -> Self {
        Self {
            otp_locked: sr2.is_otp_locked(),
            otp_enabled: sr2.is_otp_enabled(),
            sr1_locked: sr2.is_sr1_locked(),
            ecc_enabled: sr2.is_ecc_enabled(),
            buffer_mode: sr2.is_buffer_mode(),
            drive_strength: sr2.output_drive_strength(),
            hold_disabled: sr2.is_hold_disabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_blocks() {
        assert!(BlockProtect::none().protected_blocks().is_empty());
        assert_eq!(BlockProtect::new(1, false).unwrap().protected_blocks(), 2044..2048);
        assert_eq!(BlockProtect::new(3, true).unwrap().protected_blocks(), 0..16);
        assert_eq!(BlockProtect::new(0x0F, true).unwrap().protected_blocks(), 0..2048);
    }

    #[test]
    fn test_mode_from_sr1() {
        assert_eq!(ProtectMode::from_sr1(Sr1::empty()), ProtectMode::Software);
        assert_eq!(
            ProtectMode::from_sr1(Sr1::SRP0 | Sr1::WP_E),
            ProtectMode::Hardware
        );
        assert_eq!(ProtectMode::from_sr1(Sr1::SRP0), ProtectMode::Software);
        assert_eq!(ProtectMode::from_sr1(Sr1::SRP1), ProtectMode::PowerCycle);
        assert_eq!(
            ProtectMode::from_sr1(Sr1::SRP1 | Sr1::SRP0),
            ProtectMode::Permanent
        );
    }

    #[test]
    fn test_block_protect_range_check() {
        assert!(BlockProtect::new(0x0F, true).is_ok());
        assert!(BlockProtect::new(0x10, false).is_err());
        let bp = BlockProtect::new(0x0A, true).unwrap();
        assert_eq!(bp.to_sr1().bits(), 0x54);
        assert_eq!(BlockProtect::from_sr1(bp.to_sr1()), bp);
    }
}
