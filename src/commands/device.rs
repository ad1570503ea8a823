//! Probe, status and reset commands

use crate::programmers::Nand;
use spinand_core::wp::{DeviceConfig, ProtectConfig};
use std::error::Error;

/// Check the JEDEC ID and print the device geometry
pub fn run_probe(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    let id = nand.read_jedec_id()?;
    nand.probe()?;

    println!("Found SPI NAND flash:");
    println!("  Vendor:   Winbond");
    println!("  Name:     W25N02KV");
    println!("  JEDEC ID: {:02X} {:02X}{:02X}", id[0], id[1], id[2]);
    println!(
        "  Geometry: {} blocks x {} pages x ({} + {}) bytes",
        spinand_core::flash::BLOCK_COUNT,
        spinand_core::flash::PAGES_PER_BLOCK,
        spinand_core::flash::PAGE_SIZE,
        spinand_core::flash::SPARE_SIZE
    );
    Ok(())
}

/// Dump and decode the three status registers
pub fn run_status(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    let status = nand.status()?;
    let protect = ProtectConfig::from_sr1(status.sr1);
    let config = DeviceConfig::from_sr2(status.sr2);

    println!("SR1 (protection)    0x{:02X}", status.sr1.bits());
    println!("  block protect:    {}", protect.block_protect);
    println!("  protect mode:     {}", protect.mode);
    println!("  /WP enabled:      {}", protect.wp_enabled);
    println!("SR2 (configuration) 0x{:02X}", status.sr2.bits());
    println!("  ECC enabled:      {}", config.ecc_enabled);
    println!("  buffer mode:      {}", config.buffer_mode);
    println!("  drive strength:   {}", config.drive_strength);
    println!("  /HOLD disabled:   {}", config.hold_disabled);
    println!("  OTP enabled:      {}", config.otp_enabled);
    println!("  OTP locked:       {}", config.otp_locked);
    println!("  SR1 locked:       {}", config.sr1_locked);
    println!("SR3 (status)        0x{:02X}", status.sr3.bits());
    println!("  busy:             {}", status.sr3.is_busy());
    println!("  WEL:              {}", status.sr3.is_write_enable_latched());
    println!("  last ECC:         {}", status.sr3.ecc_class());
    Ok(())
}

/// Reset the device and wait for it to come back
pub fn run_reset(nand: &mut Nand, software: bool) -> Result<(), Box<dyn Error>> {
    if software {
        nand.software_reset()?;
        println!("Software reset complete");
    } else {
        nand.reset()?;
        println!("Device reset complete");
    }
    Ok(())
}
