//! Erase command implementation

use crate::commands::bbt::scan_with_progress;
use crate::programmers::Nand;
use indicatif::{ProgressBar, ProgressStyle};
use spinand_core::error::{Error as NandError, InvalidArgument};
use spinand_core::flash::{check_block, BLOCK_COUNT};
use std::error::Error;

/// Erase `count` blocks starting at `first`
///
/// With `skip_bad` the blocks go through the bad-block table: bad and
/// reserved blocks are skipped and a block that fails to erase is retired
/// while the run continues.
pub fn run_erase(
    nand: &mut Nand,
    first: u16,
    count: u16,
    skip_bad: bool,
) -> Result<(), Box<dyn Error>> {
    check_block(first)?;
    let end = first
        .checked_add(count)
        .filter(|&end| end <= BLOCK_COUNT && count > 0)
        .ok_or_else(|| format!("Block range {}+{} is outside the array", first, count))?;

    let mut bbt = if skip_bad {
        Some(scan_with_progress(nand)?)
    } else {
        None
    };

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta}) Erasing")?
            .progress_chars("#>-"),
    );

    let mut erased = 0u32;
    let mut skipped = 0u32;
    let mut failed = Vec::new();

    for block in first..end {
        match bbt.as_mut() {
            Some(bbt) => match bbt.erase(nand, block) {
                Ok(()) => erased += 1,
                Err(NandError::BadBlock { .. })
                | Err(NandError::InvalidArgument(InvalidArgument::ReservedBlock(_))) => {
                    log::debug!("Skipping block {}", block);
                    skipped += 1;
                }
                Err(NandError::OperationFailed(_)) => {
                    log::warn!("Block {} failed to erase and was retired", block);
                    failed.push(block);
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e.into());
                }
            },
            None => {
                if let Err(e) = nand.erase_block(block) {
                    pb.abandon();
                    return Err(format!("Erasing block {}: {}", block, e).into());
                }
                erased += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    println!("Erased {} blocks, skipped {}", erased, skipped);

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} blocks failed to erase: {:?}", failed.len(), failed).into())
    }
}
