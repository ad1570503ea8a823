//! Block protection and configuration register commands

use crate::programmers::Nand;
use spinand_core::flash::BLOCK_COUNT;
use spinand_core::wp::{self, BlockProtect, ProtectConfig};
use std::error::Error;

/// Settings changed by `protect config`; `None` leaves a field alone
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigChanges {
    pub ecc: Option<bool>,
    pub buffer: Option<bool>,
    pub drive: Option<u8>,
    pub hold_disable: Option<bool>,
    pub wp_enable: Option<bool>,
}

impl ConfigChanges {
    fn is_empty(&self) -> bool {
        self.ecc.is_none()
            && self.buffer.is_none()
            && self.drive.is_none()
            && self.hold_disable.is_none()
            && self.wp_enable.is_none()
    }
}

/// Describe which blocks a BP/TB setting covers
fn format_range(bp: BlockProtect) -> String {
    let range = bp.protected_blocks();
    let count = range.len();
    if count == 0 {
        "none".to_string()
    } else if count == BLOCK_COUNT as usize {
        "all blocks".to_string()
    } else {
        let side = if bp.top_bottom() { "bottom" } else { "top" };
        format!("blocks {}..{} ({} {})", range.start, range.end, side, count)
    }
}

/// Show SR1 protection and SR2 configuration
pub fn cmd_status(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    let protect: ProtectConfig = wp::read_protect_config(nand.master_mut())?;
    let config = wp::read_device_config(nand.master_mut())?;

    println!("Protection");
    println!("  Block protect:  {}", protect.block_protect);
    println!("  Range:          {}", format_range(protect.block_protect));
    println!("  Mode:           {}", protect.mode);
    println!("  /WP enabled:    {}", protect.wp_enabled);
    println!("  SR1 locked:     {}", config.sr1_locked);
    println!("Configuration");
    println!("  ECC:            {}", on_off(config.ecc_enabled));
    println!("  Read mode:      {}", if config.buffer_mode { "buffer" } else { "continuous" });
    println!("  Drive strength: {}", config.drive_strength);
    println!("  /HOLD:          {}", if config.hold_disabled { "disabled" } else { "enabled" });
    println!("  OTP locked:     {}", config.otp_locked);
    Ok(())
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}

/// Clear every block protect bit
pub fn cmd_unlock(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    wp::unlock_all(nand.master_mut())?;
    println!("Block protection cleared");
    Ok(())
}

/// Set BP[3:0] and TB
pub fn cmd_range(nand: &mut Nand, bp: u8, bottom: bool) -> Result<(), Box<dyn Error>> {
    let setting = BlockProtect::new(bp, bottom)?;
    wp::set_block_protect(nand.master_mut(), setting)?;
    println!("Block protect set to {} ({})", setting, format_range(setting));
    Ok(())
}

/// Apply configuration register changes, each verified by read-back
pub fn cmd_config(nand: &mut Nand, changes: ConfigChanges) -> Result<(), Box<dyn Error>> {
    if changes.is_empty() {
        return Err(
            "Nothing to change. Use --ecc, --buffer, --drive, --hold-disable or --wp-enable".into(),
        );
    }

    let m = nand.master_mut();
    match (changes.buffer, changes.ecc) {
        (Some(buffer), Some(ecc)) => wp::set_read_mode(m, buffer, ecc)?,
        (Some(buffer), None) => wp::set_buffer_mode(m, buffer)?,
        (None, Some(ecc)) => wp::set_ecc_enable(m, ecc)?,
        (None, None) => {}
    }
    if let Some(level) = changes.drive {
        wp::set_output_drive_strength(m, level)?;
    }
    if let Some(disable) = changes.hold_disable {
        wp::set_hold_disable(m, disable)?;
    }
    if let Some(enable) = changes.wp_enable {
        wp::set_write_protect_enable(m, enable)?;
    }

    println!("Configuration updated");
    cmd_status(nand)
}

/// Set SR1-L
pub fn cmd_lock_sr1(nand: &mut Nand, yes: bool) -> Result<(), Box<dyn Error>> {
    if !yes {
        return Err("Locking SR1 is permanent. Re-run with --yes to proceed".into());
    }
    wp::lock_sr1(nand.master_mut())?;
    println!("SR1 permanently locked");
    Ok(())
}
