//! Bad-block table
//!
//! An owned, in-memory record of which erase blocks must not be used. The
//! table is filled by [`BbtManager::scan_factory_blocks`] at start-up and
//! grows at runtime through [`BbtManager::mark_runtime_bad`]. It is never
//! persisted as a table: durability comes from the marker byte written to
//! the spare area of page 0 of a retired block, which the next scan reads.
//!
//! The orchestrators on [`NandDevice`] do not look at the table. Code that
//! wants bad blocks refused and failing blocks retired goes through the
//! gatekeeper helpers [`BbtManager::erase`], [`BbtManager::program`] and
//! [`BbtManager::program_random`].
//!
//! Reserved blocks ([0, 8) and [2043, 2048)) hold factory data. They are
//! recorded as good without being read and are never marked bad.

mod types;

pub use types::{BbtSummary, BlockState};

use crate::error::{Error, InvalidArgument, Result};
use crate::flash::{
    check_block, is_reserved_block, NandDevice, PageAddress, ProgramSegment, BLOCK_COUNT,
    RESERVED_HIGH_START, RESERVED_LOW_END, SPARE_COLUMN,
};
use crate::programmer::{Clock, SpiMaster};

/// Value of an intact marker byte
pub const GOOD_MARKER: u8 = 0xFF;
/// Value written to retire a block
pub const BAD_MARKER: u8 = 0x00;

/// Bad-block table for one device
#[derive(Clone)]
pub struct BbtManager {
    table: [BlockState; BLOCK_COUNT as usize],
}

impl Default for BbtManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BbtManager {
    /// A table with every block good
    pub const fn new() -> Self {
        Self {
            table: [BlockState::Good; BLOCK_COUNT as usize],
        }
    }

    /// Scan page 0 of every non-reserved block for factory bad markers
    pub fn scan_factory_blocks<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
    ) -> Result<BbtSummary> {
        self.scan_factory_blocks_with(nand, |_, _| {})
    }

    /// Scan, reporting each block's outcome to `progress`
    ///
    /// A block is factory bad when byte 0 of the main area or byte 0 of
    /// the spare area of its page 0 is not 0xFF. A read that times out or
    /// is uncorrectable leaves the block good; any other error aborts the
    /// scan with the table partially rebuilt.
    pub fn scan_factory_blocks_with<M, C, F>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        mut progress: F,
    ) -> Result<BbtSummary>
    where
        M: SpiMaster,
        C: Clock,
        F: FnMut(u16, BlockState),
    {
        log::debug!("Scanning {} blocks for factory bad markers", BLOCK_COUNT);

        for block in 0..BLOCK_COUNT {
            let state = if is_reserved_block(block) {
                BlockState::Good
            } else {
                match read_markers(nand, block)? {
                    Some((main, spare)) if main != GOOD_MARKER || spare != GOOD_MARKER => {
                        log::debug!(
                            "Block {} factory bad (main 0x{:02X}, spare 0x{:02X})",
                            block,
                            main,
                            spare
                        );
                        BlockState::FactoryBad
                    }
                    _ => BlockState::Good,
                }
            };
            self.table[block as usize] = state;
            progress(block, state);
        }

        let summary = self.summary();
        log::info!("Bad block scan: {}", summary);
        Ok(summary)
    }

    /// State of a block, `None` when out of range
    pub fn state(&self, block: u16) -> Option<BlockState> {
        self.table.get(block as usize).copied()
    }

    /// True for bad blocks and for indices beyond the array
    pub fn is_bad(&self, block: u16) -> bool {
        self.state(block).map_or(true, |s| s.is_bad())
    }

    /// Retire a block after an erase or program failure
    ///
    /// The table entry is updated first, then a 0x00 marker is programmed
    /// into spare byte 0 of page 0 so the next scan finds it. Writing the
    /// marker is best effort: a failure is logged and the in-memory entry
    /// stays bad. Returns whether the block was newly retired; reserved,
    /// out-of-range and already bad blocks are left alone.
    pub fn mark_runtime_bad<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        block: u16,
    ) -> bool {
        if block >= BLOCK_COUNT || is_reserved_block(block) || self.is_bad(block) {
            return false;
        }

        self.table[block as usize] = BlockState::RuntimeBad;
        log::warn!("Retiring block {} as bad", block);

        let marker = [BAD_MARKER];
        let written = PageAddress::first_of(block).and_then(|addr| {
            nand.program_random(addr, &[ProgramSegment::new(SPARE_COLUMN, &marker)])
        });
        match written {
            Ok(()) => log::debug!("Bad block marker written to block {}", block),
            Err(e) => log::warn!(
                "Could not write bad block marker to block {}: {} (marked in memory only)",
                block,
                e
            ),
        }
        true
    }

    /// Lowest good block outside the reserved ranges
    pub fn first_valid_block(&self) -> Option<u16> {
        (RESERVED_LOW_END..RESERVED_HIGH_START).find(|&b| !self.is_bad(b))
    }

    /// Counts of good, bad and reserved blocks
    pub fn summary(&self) -> BbtSummary {
        let mut summary = BbtSummary {
            total: BLOCK_COUNT,
            ..Default::default()
        };
        for (block, state) in self.table.iter().enumerate() {
            match state {
                BlockState::Good => summary.good += 1,
                BlockState::FactoryBad => summary.factory_bad += 1,
                BlockState::RuntimeBad => summary.runtime_bad += 1,
            }
            if is_reserved_block(block as u16) {
                summary.reserved += 1;
            }
        }
        summary
    }

    /// Bad block indices in ascending order
    pub fn bad_blocks(&self) -> impl Iterator<Item = u16> + '_ {
        self.table
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_bad())
            .map(|(b, _)| b as u16)
    }

    /// Copy bad block indices into `out`
    ///
    /// Returns the total number of bad blocks, which may exceed `out.len()`;
    /// only the first `out.len()` are written.
    pub fn bad_blocks_into(&self, out: &mut [u16]) -> usize {
        let mut count = 0;
        for block in self.bad_blocks() {
            if let Some(slot) = out.get_mut(count) {
                *slot = block;
            }
            count += 1;
        }
        count
    }

    /// Snapshot of the bad block list
    pub fn list_bad(&self) -> heapless::Vec<u16, { BLOCK_COUNT as usize }> {
        let mut list = heapless::Vec::new();
        for block in self.bad_blocks() {
            // capacity covers every block
            let _ = list.push(block);
        }
        list
    }

    /// Erase a block unless it is bad or reserved, retiring it on failure
    pub fn erase<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        block: u16,
    ) -> Result<()> {
        self.admit(block)?;
        let result = nand.erase_block(block);
        self.retire_on_failure(nand, result)
    }

    /// Sequential-load program through the table
    pub fn program<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        addr: PageAddress,
        column: u16,
        data: &[u8],
    ) -> Result<()> {
        self.admit(addr.block())?;
        let result = nand.program_page(addr, column, data);
        self.retire_on_failure(nand, result)
    }

    /// Random-load program through the table
    pub fn program_random<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        addr: PageAddress,
        segments: &[ProgramSegment<'_>],
    ) -> Result<()> {
        self.admit(addr.block())?;
        let result = nand.program_random(addr, segments);
        self.retire_on_failure(nand, result)
    }

    fn admit(&self, block: u16) -> Result<()> {
        check_block(block)?;
        if is_reserved_block(block) {
            return Err(InvalidArgument::ReservedBlock(block).into());
        }
        if self.is_bad(block) {
            return Err(Error::BadBlock { block });
        }
        Ok(())
    }

    fn retire_on_failure<M: SpiMaster, C: Clock>(
        &mut self,
        nand: &mut NandDevice<M, C>,
        result: Result<()>,
    ) -> Result<()> {
        if let Err(Error::OperationFailed(failure)) = result {
            self.mark_runtime_bad(nand, failure.block());
        }
        result
    }
}

/// Read main byte 0 and spare byte 0 of page 0
///
/// `Ok(None)` when the page could not be read reliably.
fn read_markers<M: SpiMaster, C: Clock>(
    nand: &mut NandDevice<M, C>,
    block: u16,
) -> Result<Option<(u8, u8)>> {
    let addr = PageAddress::first_of(block)?;
    let mut main = [GOOD_MARKER];
    let mut spare = [GOOD_MARKER];

    let read = nand
        .read_page(addr, 0, &mut main)
        .and_then(|_| nand.read_page(addr, SPARE_COLUMN, &mut spare));

    match read {
        Ok(_) => Ok(Some((main[0], spare[0]))),
        Err(e @ (Error::Timeout { .. } | Error::UncorrectableData { .. })) => {
            log::warn!("Block {}: marker read failed ({}), leaving it valid", block, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NandConfig;
    use crate::error::OpFailure;
    use crate::testing::{MockMaster, StepClock};

    fn device(master: MockMaster) -> NandDevice<MockMaster, StepClock> {
        NandDevice::new(master, StepClock::new(1))
    }

    fn table_with_bad(blocks: core::ops::Range<u16>) -> BbtManager {
        let mut bbt = BbtManager::new();
        for b in blocks {
            bbt.table[b as usize] = BlockState::FactoryBad;
        }
        bbt
    }

    #[test]
    fn test_first_valid_block() {
        assert_eq!(BbtManager::new().first_valid_block(), Some(8));
        assert_eq!(table_with_bad(8..21).first_valid_block(), Some(21));
        assert_eq!(table_with_bad(8..RESERVED_HIGH_START).first_valid_block(), None);
    }

    #[test]
    fn test_out_of_range_is_bad() {
        let bbt = BbtManager::new();
        assert!(bbt.is_bad(BLOCK_COUNT));
        assert!(bbt.is_bad(u16::MAX));
        assert!(!bbt.is_bad(0));
        assert_eq!(bbt.state(BLOCK_COUNT), None);
    }

    #[test]
    fn test_summary_and_lists() {
        let mut bbt = table_with_bad(100..103);
        bbt.table[500] = BlockState::RuntimeBad;

        let summary = bbt.summary();
        assert_eq!(summary.factory_bad, 3);
        assert_eq!(summary.runtime_bad, 1);
        assert_eq!(summary.good, BLOCK_COUNT - 4);
        assert_eq!(summary.reserved, 13);
        assert_eq!(summary.bad(), 4);

        let mut out = [0u16; 2];
        assert_eq!(bbt.bad_blocks_into(&mut out), 4);
        assert_eq!(out, [100, 101]);
        assert_eq!(bbt.list_bad().as_slice(), &[100, 101, 102, 500]);
    }

    #[test]
    fn test_scan_marks_factory_bad_and_skips_reserved() {
        let mut master = MockMaster::new();
        // block 8 main byte, then block 8 spare byte
        master.data.push_back(std::vec![0x00]);
        master.data.push_back(std::vec![0xFF]);
        // block 9 main ok, spare marked
        master.data.push_back(std::vec![0xFF]);
        master.data.push_back(std::vec![0x3C]);
        let mut nand = device(master);

        let mut bbt = BbtManager::new();
        let mut seen = 0u32;
        let summary = bbt
            .scan_factory_blocks_with(&mut nand, |_, _| seen += 1)
            .unwrap();

        assert_eq!(seen, BLOCK_COUNT as u32);
        assert_eq!(bbt.state(8), Some(BlockState::FactoryBad));
        assert_eq!(bbt.state(9), Some(BlockState::FactoryBad));
        assert_eq!(summary.factory_bad, 2);
        assert_eq!(bbt.first_valid_block(), Some(10));

        for frame in &nand.master().log {
            if frame[0] == 0x13 {
                let row = u32::from_be_bytes([0, frame[1], frame[2], frame[3]]);
                assert!(!is_reserved_block((row / 64) as u16));
            }
        }
    }

    #[test]
    fn test_scan_timeout_leaves_block_valid() {
        let mut master = MockMaster::new();
        master.busy_after = u32::MAX;
        let mut nand = device(master);
        nand.set_config(NandConfig::new().with_read_timeout(1));

        let mut bbt = BbtManager::new();
        let summary = bbt.scan_factory_blocks(&mut nand).unwrap();
        assert_eq!(summary.bad(), 0);
    }

    #[test]
    fn test_mark_runtime_bad_writes_marker_once() {
        let mut nand = device(MockMaster::new());
        let mut bbt = BbtManager::new();

        assert!(bbt.mark_runtime_bad(&mut nand, 30));
        assert_eq!(bbt.state(30), Some(BlockState::RuntimeBad));
        let frames = nand.master().log.len();
        assert!(nand
            .master()
            .log
            .iter()
            .any(|f| f == &[0x84, 0x08, 0x00, 0x00]));
        assert!(nand.master().log.iter().any(|f| f == &[0x10, 0x00, 0x07, 0x80]));

        assert!(!bbt.mark_runtime_bad(&mut nand, 30));
        assert_eq!(nand.master().log.len(), frames);
    }

    #[test]
    fn test_mark_runtime_bad_ignores_reserved() {
        let mut nand = device(MockMaster::new());
        let mut bbt = BbtManager::new();
        assert!(!bbt.mark_runtime_bad(&mut nand, 3));
        assert!(!bbt.mark_runtime_bad(&mut nand, 2045));
        assert!(!bbt.mark_runtime_bad(&mut nand, BLOCK_COUNT));
        assert!(nand.master().log.is_empty());
        assert!(!bbt.is_bad(3));
    }

    #[test]
    fn test_marker_failure_keeps_block_bad() {
        let mut master = MockMaster::new();
        master.raise.push((0x10, 0x08));
        let mut nand = device(master);
        let mut bbt = BbtManager::new();
        assert!(bbt.mark_runtime_bad(&mut nand, 40));
        assert!(bbt.is_bad(40));
    }

    #[test]
    fn test_gatekeeper_refuses_bad_and_reserved() {
        let mut nand = device(MockMaster::new());
        let mut bbt = table_with_bad(20..21);
        assert_eq!(bbt.erase(&mut nand, 20), Err(Error::BadBlock { block: 20 }));
        assert_eq!(
            bbt.erase(&mut nand, 2),
            Err(Error::InvalidArgument(InvalidArgument::ReservedBlock(2)))
        );
        let addr = PageAddress::new(20, 5).unwrap();
        assert_eq!(
            bbt.program(&mut nand, addr, 0, &[1]),
            Err(Error::BadBlock { block: 20 })
        );
        assert!(nand.master().log.is_empty());
    }

    #[test]
    fn test_gatekeeper_retires_on_erase_failure() {
        let mut master = MockMaster::new();
        master.raise.push((0xD8, 0x04));
        let mut nand = device(master);
        let mut bbt = BbtManager::new();

        assert_eq!(
            bbt.erase(&mut nand, 77),
            Err(Error::OperationFailed(OpFailure::Erase { block: 77 }))
        );
        assert_eq!(bbt.state(77), Some(BlockState::RuntimeBad));
        assert_eq!(bbt.erase(&mut nand, 77), Err(Error::BadBlock { block: 77 }));
    }

    #[test]
    fn test_gatekeeper_retires_on_program_failure() {
        let mut master = MockMaster::new();
        master.raise.push((0x10, 0x08));
        let mut nand = device(master);
        let mut bbt = BbtManager::new();

        let addr = PageAddress::new(60, 9).unwrap();
        let segs = [ProgramSegment::new(0, &[0xAB])];
        assert!(bbt.program_random(&mut nand, addr, &segs).is_err());
        assert!(bbt.is_bad(60));
    }
}
