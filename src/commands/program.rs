//! Program command implementation

use crate::cli::PageArgs;
use crate::commands::bbt::scan_with_progress;
use crate::programmers::Nand;
use indicatif::{ProgressBar, ProgressStyle};
use spinand_core::flash::{PageAddress, CACHE_SIZE, PAGES_PER_BLOCK, PAGE_SIZE};
use std::error::Error;

/// One page worth of a program or verify run
pub struct PageChunk<'a> {
    pub addr: PageAddress,
    pub column: u16,
    pub data: &'a [u8],
}

/// Lay `data` out over pages starting at `at`
///
/// A non-zero column addresses a single page (main or spare area) and the
/// data must fit in the rest of the cache register. From column 0 the data
/// fills the main area of consecutive pages of the same block.
pub fn split_pages<'a>(
    at: &PageArgs,
    data: &'a [u8],
) -> Result<Vec<PageChunk<'a>>, Box<dyn Error>> {
    let first = PageAddress::new(at.block, at.page)?;

    if at.column != 0 {
        let room = CACHE_SIZE.saturating_sub(at.column as usize);
        if data.len() > room {
            return Err(format!(
                "{} bytes do not fit after column {} ({} bytes left)",
                data.len(),
                at.column,
                room
            )
            .into());
        }
        return Ok(vec![PageChunk {
            addr: first,
            column: at.column,
            data,
        }]);
    }

    let pages_left = (PAGES_PER_BLOCK - at.page as u32) as usize;
    let pages = data.len().div_ceil(PAGE_SIZE);
    if pages > pages_left {
        return Err(format!(
            "{} bytes need {} pages but block {} has {} left from page {}",
            data.len(),
            pages,
            at.block,
            pages_left,
            at.page
        )
        .into());
    }

    data.chunks(PAGE_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            Ok(PageChunk {
                addr: PageAddress::new(at.block, at.page + i as u8)?,
                column: 0,
                data: chunk,
            })
        })
        .collect()
}

/// Program `data` at `at`, optionally through the bad-block table
pub fn run_program(
    nand: &mut Nand,
    at: &PageArgs,
    data: &[u8],
    verify: bool,
    skip_bad: bool,
) -> Result<(), Box<dyn Error>> {
    let chunks = split_pages(at, data)?;

    let mut bbt = if skip_bad {
        Some(scan_with_progress(nand)?)
    } else {
        None
    };

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) Programming")?
            .progress_chars("#>-"),
    );

    for chunk in &chunks {
        let result = match bbt.as_mut() {
            Some(bbt) => bbt.program(nand, chunk.addr, chunk.column, chunk.data),
            None => nand.program_page(chunk.addr, chunk.column, chunk.data),
        };
        if let Err(e) = result {
            pb.abandon();
            return Err(format!("Programming page {}: {}", chunk.addr.row(), e).into());
        }

        if verify {
            if let Err(e) = nand.verify_page(chunk.addr, chunk.column, chunk.data) {
                pb.abandon();
                return Err(format!("Verifying page {}: {}", chunk.addr.row(), e).into());
            }
        }
        pb.inc(chunk.data.len() as u64);
    }

    pb.finish_and_clear();
    println!(
        "Programmed {} bytes into {} page(s) of block {}{}",
        data.len(),
        chunks.len(),
        at.block,
        if verify { ", verified" } else { "" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(block: u16, page: u8, column: u16) -> PageArgs {
        PageArgs {
            block,
            page,
            column,
        }
    }

    #[test]
    fn test_split_spans_pages() {
        let data = vec![0u8; PAGE_SIZE * 2 + 10];
        let chunks = split_pages(&at(9, 3, 0), &data).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].addr.row(), 9 * 64 + 5);
        assert_eq!(chunks[2].data.len(), 10);
    }

    #[test]
    fn test_split_rejects_overflow() {
        let data = vec![0u8; PAGE_SIZE * 2];
        assert!(split_pages(&at(9, 63, 0), &data).is_err());
        assert!(split_pages(&at(9, 0, 2100), &[0u8; 100]).is_err());
        assert_eq!(split_pages(&at(9, 0, 2048), &[0u8; 128]).unwrap().len(), 1);
    }
}
