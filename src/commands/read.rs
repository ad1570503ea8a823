//! Read command implementation

use crate::cli::PageArgs;
use crate::commands::hex_dump;
use crate::programmers::Nand;
use spinand_core::flash::{check_column, PageAddress};
use spinand_core::status::EccStatus;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Read `length` bytes from `pages` consecutive pages starting at `at`
pub fn run_read(
    nand: &mut Nand,
    at: &PageArgs,
    length: u32,
    pages: u8,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let length = length as usize;
    if length == 0 || pages == 0 {
        return Err("Nothing to read: --length and --pages must be non-zero".into());
    }
    check_column(at.column, length)?;
    // validates the last page before anything is read
    PageAddress::new(at.block, at.page.saturating_add(pages - 1))?;

    let mut data = vec![0u8; length * pages as usize];
    for (i, buf) in data.chunks_mut(length).enumerate() {
        let addr = PageAddress::new(at.block, at.page + i as u8)?;
        let ecc = nand.read_page(addr, at.column, buf)?;
        if ecc != EccStatus::Ok {
            log::info!("Page {}: ECC {}", addr.row(), ecc);
        }
    }

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => {
            for (i, page) in data.chunks(length).enumerate() {
                println!("Block {} page {}:", at.block, at.page as usize + i);
                hex_dump(at.column as usize, page);
            }
        }
    }

    Ok(())
}
