//! Verify command implementation

use crate::cli::PageArgs;
use crate::commands::program::split_pages;
use crate::programmers::Nand;
use spinand_core::error::Error as NandError;
use spinand_core::status::EccStatus;
use std::error::Error;

/// Compare the pages at `at` against `expected`
pub fn run_verify(nand: &mut Nand, at: &PageArgs, expected: &[u8]) -> Result<(), Box<dyn Error>> {
    let chunks = split_pages(at, expected)?;
    let mut corrected = 0u32;

    for chunk in &chunks {
        match nand.verify_page(chunk.addr, chunk.column, chunk.data) {
            Ok(EccStatus::Ok) => {}
            Ok(ecc) => {
                log::info!("Page {}: ECC {}", chunk.addr.row(), ecc);
                corrected += 1;
            }
            Err(NandError::DataMismatch {
                offset,
                expected,
                actual,
            }) => {
                println!(
                    "MISMATCH in page {} at column {}: expected 0x{:02X}, read 0x{:02X}",
                    chunk.addr.row(),
                    chunk.column as usize + offset,
                    expected,
                    actual
                );
                return Err("Verification failed".into());
            }
            Err(e) => return Err(format!("Reading page {}: {}", chunk.addr.row(), e).into()),
        }
    }

    println!(
        "Verified {} bytes in {} page(s) ({} with corrected bits)",
        expected.len(),
        chunks.len(),
        corrected
    );
    Ok(())
}
