//! W25N02KV array geometry and address checks

use core::fmt;

use crate::error::{InvalidArgument, Result};

/// Number of erase blocks
pub const BLOCK_COUNT: u16 = 2048;
/// Pages per erase block
pub const PAGES_PER_BLOCK: u32 = 64;
/// Main area bytes per page
pub const PAGE_SIZE: usize = 2048;
/// Spare area bytes per page
pub const SPARE_SIZE: usize = 128;
/// Size of the cache register (main + spare)
pub const CACHE_SIZE: usize = PAGE_SIZE + SPARE_SIZE;
/// Column of the first spare byte
pub const SPARE_COLUMN: u16 = PAGE_SIZE as u16;
/// Total number of pages
pub const PAGE_COUNT: u32 = BLOCK_COUNT as u32 * PAGES_PER_BLOCK;

/// Blocks below this index hold factory parameter data
pub const RESERVED_LOW_END: u16 = 8;
/// Blocks from this index up hold factory data
pub const RESERVED_HIGH_START: u16 = 2043;

/// True for blocks in the factory reserved ranges [0, 8) and [2043, 2048)
pub const fn is_reserved_block(block: u16) -> bool {
    block < RESERVED_LOW_END || (block >= RESERVED_HIGH_START && block < BLOCK_COUNT)
}

/// Reject block indices beyond the array
pub fn check_block(block: u16) -> Result<()> {
    if block >= BLOCK_COUNT {
        return Err(InvalidArgument::Block(block as u32).into());
    }
    Ok(())
}

/// Reject column windows that do not fit the cache register
pub fn check_column(column: u16, len: usize) -> Result<()> {
    if column as usize + len > CACHE_SIZE {
        return Err(InvalidArgument::Column { column, len }.into());
    }
    Ok(())
}

/// Linear page index of the first page of `block`
pub const fn block_row(block: u16) -> u32 {
    block as u32 * PAGES_PER_BLOCK
}

/// A page in the array: block and page-within-block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageAddress {
    block: u16,
    page: u8,
}

impl PageAddress {
    /// Validate and build an address
    pub fn new(block: u16, page: u8) -> Result<Self> {
        check_block(block)?;
        if page as u32 >= PAGES_PER_BLOCK {
            return Err(InvalidArgument::Page(page as u32).into());
        }
        Ok(Self { block, page })
    }

    /// First page of a block
    pub fn first_of(block: u16) -> Result<Self> {
        Self::new(block, 0)
    }

    /// Split a linear page index
    pub fn from_row(row: u32) -> Result<Self> {
        if row >= PAGE_COUNT {
            return Err(InvalidArgument::Page(row).into());
        }
        Ok(Self {
            block: (row / PAGES_PER_BLOCK) as u16,
            page: (row % PAGES_PER_BLOCK) as u8,
        })
    }

    /// Linear page index: block * 64 + page
    pub const fn row(&self) -> u32 {
        block_row(self.block) + self.page as u32
    }

    /// Block index
    pub const fn block(&self) -> u16 {
        self.block
    }

    /// Page within the block
    pub const fn page(&self) -> u8 {
        self.page
    }
}

impl fmt::Display for PageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} page {}", self.block, self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_mapping() {
        let addr = PageAddress::new(50, 3).unwrap();
        assert_eq!(addr.row(), 3203);
        assert_eq!(PageAddress::from_row(3203).unwrap(), addr);
        assert_eq!(PageAddress::new(2047, 63).unwrap().row(), PAGE_COUNT - 1);
    }

    #[test]
    fn test_out_of_range() {
        assert!(PageAddress::new(2048, 0).is_err());
        assert!(PageAddress::new(0, 64).is_err());
        assert!(PageAddress::from_row(PAGE_COUNT).is_err());
        assert!(check_column(2048, 128).is_ok());
        assert!(check_column(2048, 129).is_err());
        assert!(check_column(0, CACHE_SIZE).is_ok());
    }

    #[test]
    fn test_reserved_ranges() {
        assert!(is_reserved_block(0));
        assert!(is_reserved_block(7));
        assert!(!is_reserved_block(8));
        assert!(!is_reserved_block(2042));
        assert!(is_reserved_block(2043));
        assert!(is_reserved_block(2047));
        assert!(!is_reserved_block(2048));
    }
}
