//! OTP page commands

use crate::commands::hex_dump;
use crate::programmers::Nand;
use spinand_core::otp::{OTP_PARAMETER_PAGE, OTP_UNIQUE_ID_PAGE};
use std::error::Error;
use std::path::Path;

/// Read `length` bytes from an OTP page
pub fn cmd_read(
    nand: &mut Nand,
    page: u8,
    length: u32,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let mut buf = vec![0u8; length as usize];
    nand.read_otp_page(page, 0, &mut buf)?;

    match output {
        Some(path) => {
            std::fs::write(path, &buf)?;
            println!("Wrote {} bytes to {:?}", buf.len(), path);
        }
        None => {
            let label = match page {
                OTP_UNIQUE_ID_PAGE => " (unique ID)",
                OTP_PARAMETER_PAGE => " (parameter page)",
                _ => "",
            };
            println!("OTP page {}{}:", page, label);
            hex_dump(0, &buf);
        }
    }
    Ok(())
}

/// Program a user OTP page from a file
pub fn cmd_program(
    nand: &mut Nand,
    page: u8,
    column: u16,
    input: &Path,
) -> Result<(), Box<dyn Error>> {
    let data = std::fs::read(input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;
    nand.program_otp_page(page, column, &data)?;
    println!("Programmed {} bytes into OTP page {}", data.len(), page);
    Ok(())
}

/// Set OTP-L
pub fn cmd_lock(nand: &mut Nand, yes: bool) -> Result<(), Box<dyn Error>> {
    if !yes {
        return Err("Locking the OTP area is permanent. Re-run with --yes to proceed".into());
    }
    if nand.is_otp_locked()? {
        println!("OTP area already locked");
        return Ok(());
    }
    nand.lock_otp()?;
    println!("OTP area permanently locked");
    Ok(())
}
