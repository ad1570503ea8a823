//! Bad-block table commands

use crate::programmers::Nand;
use indicatif::{ProgressBar, ProgressStyle};
use spinand_core::bbt::{BbtManager, BlockState};
use spinand_core::flash::BLOCK_COUNT;
use std::error::Error;

/// Rebuild the table from the factory markers with a progress bar
pub fn scan_with_progress(nand: &mut Nand) -> Result<BbtManager, Box<dyn Error>> {
    let pb = ProgressBar::new(BLOCK_COUNT as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let mut bbt = BbtManager::new();
    let mut bad = 0u32;
    let summary = bbt.scan_factory_blocks_with(nand, |block, state| {
        if state.is_bad() {
            bad += 1;
            pb.set_message(format!("{} bad", bad));
        }
        pb.set_position(block as u64 + 1);
    })?;

    pb.finish_with_message(format!("{} bad", summary.bad()));
    Ok(bbt)
}

/// Scan and print the summary
pub fn cmd_scan(nand: &mut Nand, as_toml: bool) -> Result<(), Box<dyn Error>> {
    let bbt = scan_with_progress(nand)?;
    let summary = bbt.summary();
    if as_toml {
        print!("{}", toml::to_string(&summary)?);
    } else {
        println!("Bad block table: {}", summary);
    }
    Ok(())
}

/// Scan and list every bad block
pub fn cmd_list(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    let bbt = scan_with_progress(nand)?;
    let bad = bbt.list_bad();
    if bad.is_empty() {
        println!("No bad blocks");
        return Ok(());
    }

    println!("{:>6}  {}", "Block", "State");
    for block in bad {
        let state = match bbt.state(block) {
            Some(BlockState::FactoryBad) => "factory",
            Some(BlockState::RuntimeBad) => "runtime",
            _ => "?",
        };
        println!("{:>6}  {}", block, state);
    }
    println!("{} bad blocks", bbt.summary().bad());
    Ok(())
}

/// Scan and print the first usable block
pub fn cmd_first(nand: &mut Nand) -> Result<(), Box<dyn Error>> {
    let bbt = scan_with_progress(nand)?;
    match bbt.first_valid_block() {
        Some(block) => {
            println!("First usable block: {}", block);
            Ok(())
        }
        None => Err("No usable block outside the reserved areas".into()),
    }
}

/// Scan, then retire `block`
pub fn cmd_mark(nand: &mut Nand, block: u16) -> Result<(), Box<dyn Error>> {
    spinand_core::flash::check_block(block)?;
    let mut bbt = scan_with_progress(nand)?;
    if bbt.mark_runtime_bad(nand, block) {
        println!("Block {} marked bad", block);
    } else {
        println!("Block {} is already bad", block);
    }
    Ok(())
}
