//! Write-enable latch handling and verified register updates

use super::types::{BlockProtect, DeviceConfig, ProtectConfig, ProtectMode, WelState};
use crate::error::{Error, InvalidArgument, Result};
use crate::programmer::SpiMaster;
use crate::protocol;
use crate::status::{self, Sr1, Sr2, StatusRegister};

/// Read the write-enable latch
pub fn wel_state<M: SpiMaster + ?Sized>(master: &mut M) -> Result<WelState> {
    let sr3 = status::read_sr3(master)?;
    Ok(if sr3.is_write_enable_latched() {
        WelState::Enabled
    } else {
        WelState::Disabled
    })
}

/// Set the write-enable latch and confirm it took
///
/// Must be called immediately before every mutating command. A latch that
/// reads back clear means the device would ignore the command, so the
/// caller must not issue it.
pub fn enable_write<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    protocol::write_enable(master)?;
    match wel_state(master)? {
        WelState::Enabled => Ok(()),
        WelState::Disabled => {
            log::debug!("WREN issued but WEL reads 0");
            Err(Error::WriteEnableFailed)
        }
    }
}

/// Clear the write-enable latch and confirm it cleared
pub fn disable_write<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    protocol::write_disable(master)?;
    match wel_state(master)? {
        WelState::Disabled => Ok(()),
        WelState::Enabled => {
            log::debug!("WRDI issued but WEL still reads 1");
            Err(Error::WriteDisableFailed)
        }
    }
}

/// Read-merge-write-verify a configuration register
///
/// Bits outside `mask` keep their current value. Success means the masked
/// bits read back equal to `value & mask`. Returns the value read back.
pub fn update_register<M: SpiMaster + ?Sized>(
    master: &mut M,
    register: StatusRegister,
    mask: u8,
    value: u8,
) -> Result<u8> {
    if register == StatusRegister::Status {
        // SR3 only carries device-owned status bits
        return Err(InvalidArgument::LockBitClear(register).into());
    }

    let current = status::read_register(master, register)?;
    let new_value = (current & !mask) | (value & mask);

    if register == StatusRegister::Configuration {
        let locks = Sr2::LOCKS.bits();
        if current & locks & !new_value != 0 {
            return Err(InvalidArgument::LockBitClear(register).into());
        }
    }

    log::debug!(
        "{}: 0x{:02X} -> 0x{:02X} (mask 0x{:02X})",
        register,
        current,
        new_value,
        mask
    );

    enable_write(master)?;
    protocol::write_status(master, register.addr(), new_value)?;

    let readback = status::read_register(master, register)?;
    if readback & mask != value & mask {
        log::debug!(
            "{} verify failed: wrote 0x{:02X}, read 0x{:02X}",
            register,
            new_value,
            readback
        );
        return Err(Error::VerificationMismatch {
            register,
            mask,
            expected: value & mask,
            actual: readback & mask,
        });
    }

    Ok(readback)
}

fn update_flag<M: SpiMaster + ?Sized>(
    master: &mut M,
    register: StatusRegister,
    bit: u8,
    enable: bool,
) -> Result<()> {
    update_register(master, register, bit, if enable { bit } else { 0 }).map(|_| ())
}

// ============================================================================
// SR1 - protection
// ============================================================================

/// Program BP[3:0] and TB
pub fn set_block_protect<M: SpiMaster + ?Sized>(master: &mut M, bp: BlockProtect) -> Result<()> {
    let mask = Sr1::BP_MASK.bits() | Sr1::TB.bits();
    update_register(master, StatusRegister::Protection, mask, bp.to_sr1().bits())?;
    log::debug!("Block protect set to {}", bp);
    Ok(())
}

/// Clear BP[3:0] and TB so the whole array accepts erase/program
pub fn unlock_all<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    set_block_protect(master, BlockProtect::none())
}

/// Set or clear WP-E
pub fn set_write_protect_enable<M: SpiMaster + ?Sized>(master: &mut M, enable: bool) -> Result<()> {
    update_flag(master, StatusRegister::Protection, Sr1::WP_E.bits(), enable)
}

/// Set SRP0 and SRP1
///
/// `srp1 = srp0 = true` selects one-time-program protection, after which SR1
/// can never be written again.
pub fn set_status_register_protect<M: SpiMaster + ?Sized>(
    master: &mut M,
    srp0: bool,
    srp1: bool,
) -> Result<()> {
    if srp0 && srp1 {
        log::warn!("Setting SRP1/SRP0 to one-time-program mode - this is permanent");
    }
    let mask = Sr1::SRP0.bits() | Sr1::SRP1.bits();
    let mut value = 0;
    if srp0 {
        value |= Sr1::SRP0.bits();
    }
    if srp1 {
        value |= Sr1::SRP1.bits();
    }
    update_register(master, StatusRegister::Protection, mask, value).map(|_| ())
}

/// Read the protection configuration from SR1
pub fn read_protect_config<M: SpiMaster + ?Sized>(master: &mut M) -> Result<ProtectConfig> {
    Ok(ProtectConfig::from_sr1(status::read_sr1(master)?))
}

/// Current BP/TB setting
pub fn block_protect<M: SpiMaster + ?Sized>(master: &mut M) -> Result<BlockProtect> {
    Ok(BlockProtect::from_sr1(status::read_sr1(master)?))
}

/// Current SRP mode
pub fn protect_mode<M: SpiMaster + ?Sized>(master: &mut M) -> Result<ProtectMode> {
    Ok(ProtectMode::from_sr1(status::read_sr1(master)?))
}

// ============================================================================
// SR2 - configuration
// ============================================================================

/// Permanently lock the OTP area (sets OTP-L)
///
/// There is no way back: the OTP pages become read-only for the life of the
/// device.
pub fn lock_otp<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    log::warn!("Locking OTP area - this is permanent and cannot be undone");
    update_flag(master, StatusRegister::Configuration, Sr2::OTP_L.bits(), true)?;
    log::info!("OTP area locked");
    Ok(())
}

/// Enter or leave OTP access mode (OTP-E)
pub fn set_otp_enable<M: SpiMaster + ?Sized>(master: &mut M, enable: bool) -> Result<()> {
    update_flag(master, StatusRegister::Configuration, Sr2::OTP_E.bits(), enable)
}

/// Permanently lock SR1 (sets SR1-L)
///
/// Block protection, WP-E and SRP bits are frozen at their current values
/// for the life of the device.
pub fn lock_sr1<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    log::warn!("Locking SR1 - this is permanent and cannot be undone");
    update_flag(master, StatusRegister::Configuration, Sr2::SR1_L.bits(), true)?;
    log::info!("SR1 locked");
    Ok(())
}

/// Enable or disable on-chip ECC (ECC-E)
pub fn set_ecc_enable<M: SpiMaster + ?Sized>(master: &mut M, enable: bool) -> Result<()> {
    update_flag(master, StatusRegister::Configuration, Sr2::ECC_E.bits(), enable)
}

/// Select buffer read mode (BUF=1) or continuous read mode (BUF=0)
pub fn set_buffer_mode<M: SpiMaster + ?Sized>(master: &mut M, enable: bool) -> Result<()> {
    update_flag(master, StatusRegister::Configuration, Sr2::BUF.bits(), enable)
}

/// Set BUF and ECC-E in one register write
pub fn set_read_mode<M: SpiMaster + ?Sized>(master: &mut M, buffer: bool, ecc: bool) -> Result<()> {
    let mask = Sr2::BUF.bits() | Sr2::ECC_E.bits();
    let mut value = 0;
    if buffer {
        value |= Sr2::BUF.bits();
    }
    if ecc {
        value |= Sr2::ECC_E.bits();
    }
    update_register(master, StatusRegister::Configuration, mask, value).map(|_| ())
}

/// Set ODS[1:0], 0 (strongest) to 3
pub fn set_output_drive_strength<M: SpiMaster + ?Sized>(master: &mut M, level: u8) -> Result<()> {
    if level > 3 {
        return Err(InvalidArgument::DriveStrength(level).into());
    }
    update_register(
        master,
        StatusRegister::Configuration,
        Sr2::ODS_MASK.bits(),
        level << 1,
    )
    .map(|_| ())
}

/// Enable or disable the /HOLD function (H-DIS)
pub fn set_hold_disable<M: SpiMaster + ?Sized>(master: &mut M, disable: bool) -> Result<()> {
    update_flag(master, StatusRegister::Configuration, Sr2::H_DIS.bits(), disable)
}

/// Read the device configuration from SR2
pub fn read_device_config<M: SpiMaster + ?Sized>(master: &mut M) -> Result<DeviceConfig> {
    Ok(DeviceConfig::from_sr2(status::read_sr2(master)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMaster;

    #[test]
    fn test_enable_write_confirms_latch() {
        let mut master = MockMaster::new();
        enable_write(&mut master).unwrap();
        assert_eq!(master.opcodes(), [0x06, 0x05]);
        assert_eq!(wel_state(&mut master).unwrap(), WelState::Enabled);
        disable_write(&mut master).unwrap();
        assert_eq!(wel_state(&mut master).unwrap(), WelState::Disabled);
    }

    #[test]
    fn test_enable_write_fails_when_latch_stays_clear() {
        let mut master = MockMaster::new();
        master.wel_stuck = true;
        assert_eq!(enable_write(&mut master), Err(Error::WriteEnableFailed));
    }

    #[test]
    fn test_setter_sequence_and_preserved_bits() {
        let mut master = MockMaster::new();
        master.sr[0] = 0x83; // SRP0 | WP-E | SRP1
        set_block_protect(&mut master, BlockProtect::new(0x0F, true).unwrap()).unwrap();
        assert_eq!(master.sr[0], 0xFF);
        // read, WREN, WEL check, write, read back
        assert_eq!(master.opcodes(), [0x05, 0x06, 0x05, 0x01, 0x05]);
        assert_eq!(master.sent(3), &[0x01, 0xA0, 0xFF]);

        unlock_all(&mut master).unwrap();
        assert_eq!(master.sr[0], 0x83);
    }

    #[test]
    fn test_setter_reports_verification_mismatch() {
        let mut master = MockMaster::new();
        master.frozen[1] = true;
        let err = set_ecc_enable(&mut master, false).unwrap_err();
        assert_eq!(
            err,
            Error::VerificationMismatch {
                register: StatusRegister::Configuration,
                mask: 0x10,
                expected: 0x00,
                actual: 0x10,
            }
        );
    }

    #[test]
    fn test_setter_aborts_before_write_when_enable_fails() {
        let mut master = MockMaster::new();
        master.wel_stuck = true;
        assert_eq!(
            set_buffer_mode(&mut master, false),
            Err(Error::WriteEnableFailed)
        );
        assert!(!master.opcodes().contains(&0x01));
        assert_eq!(master.sr[1], 0x18);
    }

    #[test]
    fn test_drive_strength_range() {
        let mut master = MockMaster::new();
        assert!(matches!(
            set_output_drive_strength(&mut master, 4),
            Err(Error::InvalidArgument(InvalidArgument::DriveStrength(4)))
        ));
        assert!(master.log.is_empty());
        set_output_drive_strength(&mut master, 2).unwrap();
        assert_eq!(read_device_config(&mut master).unwrap().drive_strength, 2);
    }

    #[test]
    fn test_lock_bits_are_never_cleared() {
        let mut master = MockMaster::new();
        lock_otp(&mut master).unwrap();
        lock_sr1(&mut master).unwrap();
        let cfg = read_device_config(&mut master).unwrap();
        assert!(cfg.otp_locked && cfg.sr1_locked);

        // other setters preserve the locks
        set_read_mode(&mut master, false, true).unwrap();
        assert_eq!(master.sr[1] & 0xA0, 0xA0);

        let err = update_register(&mut master, StatusRegister::Configuration, 0x80, 0x00);
        assert_eq!(
            err,
            Err(Error::InvalidArgument(InvalidArgument::LockBitClear(
                StatusRegister::Configuration
            )))
        );
        assert_eq!(master.sr[1] & 0x80, 0x80);
    }

    #[test]
    fn test_status_register_protect() {
        let mut master = MockMaster::new();
        set_write_protect_enable(&mut master, true).unwrap();
        set_status_register_protect(&mut master, true, false).unwrap();
        assert_eq!(protect_mode(&mut master).unwrap(), ProtectMode::Hardware);
    }
}
