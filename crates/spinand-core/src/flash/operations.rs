//! Erase, program, read and verify orchestrators

use super::device::NandDevice;
use super::geometry::{block_row, check_block, check_column, PageAddress};
use super::state::{OpState, OpTrace};
use crate::error::{Error, OpFailure, Operation, Result};
use crate::programmer::{Clock, SpiMaster};
use crate::protocol::{self, LoadMode};
use crate::status::{self, EccStatus};
use crate::wp;

/// Size of the stack buffer used when comparing page contents
const VERIFY_CHUNK: usize = 256;

/// One random-load segment of a program operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSegment<'a> {
    /// Cache column the segment starts at (2048 and up is the spare area)
    pub column: u16,
    /// Bytes to place
    pub data: &'a [u8],
}

impl<'a> ProgramSegment<'a> {
    /// Segment of `data` at `column`
    pub const fn new(column: u16, data: &'a [u8]) -> Self {
        Self { column, data }
    }
}

impl<M: SpiMaster, C: Clock> NandDevice<M, C> {
    /// Erase one 128 KiB block
    ///
    /// Clears block protection first when configured to (a failure there is
    /// only logged), then WREN, `D8h`, busy-poll and an E-FAIL check. A block
    /// that reports E-FAIL should be retired by the caller.
    pub fn erase_block(&mut self, block: u16) -> Result<()> {
        check_block(block)?;
        let row = block_row(block);

        self.run(Operation::Erase, row, |dev, trace| {
            if dev.config.unlock_before_erase {
                if let Err(e) = wp::unlock_all(&mut dev.master) {
                    log::warn!("Could not clear block protection before erase: {}", e);
                }
            }

            trace.advance(OpState::WriteEnabling);
            wp::enable_write(&mut dev.master)?;

            trace.advance(OpState::CommandIssued);
            protocol::block_erase(&mut dev.master, row)?;

            let timeout = dev.config.erase_timeout_ms;
            dev.poll(trace, Operation::Erase, row, timeout)?;

            trace.advance(OpState::Verifying);
            let sr3 = status::read_sr3(&mut dev.master)?;
            if sr3.erase_failed() {
                return Err(Error::OperationFailed(OpFailure::Erase { block }));
            }
            if sr3.is_write_enable_latched() {
                log::warn!("WEL still set after erasing block {}", block);
            }

            log::debug!("Erased block {}", block);
            Ok(())
        })
    }

    /// Program `data` at `column` of a page with a sequential load
    ///
    /// The cache is reset to 0xFF first, so every byte outside
    /// `column..column + data.len()` is left erased in the page.
    pub fn program_page(&mut self, addr: PageAddress, column: u16, data: &[u8]) -> Result<()> {
        check_column(column, data.len())?;
        let io_mode = self.config.load_io_mode();

        self.program_cache(addr, |master| {
            protocol::load_program_data(master, LoadMode::Sequential, io_mode, column, data)
        })
    }

    /// Program several segments of a page with random loads
    ///
    /// Cache bytes not covered by a segment keep whatever the cache held
    /// before, which after power-up or an erase-read is 0xFF. This is the
    /// form used to touch only spare bytes, such as a bad-block marker.
    pub fn program_random(
        &mut self,
        addr: PageAddress,
        segments: &[ProgramSegment<'_>],
    ) -> Result<()> {
        for seg in segments {
            check_column(seg.column, seg.data.len())?;
        }
        let io_mode = self.config.load_io_mode();

        self.program_cache(addr, |master| {
            for seg in segments {
                protocol::load_program_data(
                    master,
                    LoadMode::Random,
                    io_mode,
                    seg.column,
                    seg.data,
                )?;
            }
            Ok(())
        })
    }

    fn program_cache(
        &mut self,
        addr: PageAddress,
        load: impl FnOnce(&mut M) -> Result<()>,
    ) -> Result<()> {
        let row = addr.row();

        self.run(Operation::Program, row, |dev, trace| {
            trace.advance(OpState::WriteEnabling);
            wp::enable_write(&mut dev.master)?;

            trace.advance(OpState::CommandIssued);
            load(&mut dev.master)?;
            protocol::program_execute(&mut dev.master, row)?;

            let timeout = dev.config.program_timeout_ms;
            dev.poll(trace, Operation::Program, row, timeout)?;

            trace.advance(OpState::Verifying);
            let sr3 = status::read_sr3(&mut dev.master)?;
            if sr3.program_failed() {
                return Err(Error::OperationFailed(OpFailure::Program { page: row }));
            }
            if sr3.is_write_enable_latched() {
                log::warn!("WEL still set after programming {}", addr);
            }

            log::debug!("Programmed {}", addr);
            Ok(())
        })
    }

    /// Read `buf.len()` bytes from `column` of a page
    ///
    /// Returns the ECC class of the read. Corrected data, including data
    /// corrected at the threshold, is a success; an uncorrectable page is
    /// reported as [`Error::UncorrectableData`] and `buf` must not be used.
    pub fn read_page(
        &mut self,
        addr: PageAddress,
        column: u16,
        buf: &mut [u8],
    ) -> Result<EccStatus> {
        check_column(column, buf.len())?;
        let row = addr.row();

        self.run(Operation::Read, row, |dev, trace| {
            dev.load_page_to_cache(trace, row)?;
            let command = dev.config.read_command;
            protocol::read_data(&mut dev.master, command, column, buf)?;

            trace.advance(OpState::Verifying);
            dev.check_ecc(addr, column)
        })
    }

    /// Compare a page against `expected`, starting at `column`
    ///
    /// Reports the first differing byte as [`Error::DataMismatch`], with
    /// `offset` relative to `column`.
    pub fn verify_page(
        &mut self,
        addr: PageAddress,
        column: u16,
        expected: &[u8],
    ) -> Result<EccStatus> {
        check_column(column, expected.len())?;
        let row = addr.row();

        self.run(Operation::Read, row, |dev, trace| {
            dev.load_page_to_cache(trace, row)?;

            trace.advance(OpState::Verifying);
            let ecc = dev.check_ecc(addr, column)?;

            let command = dev.config.read_command;
            let mut scratch = [0u8; VERIFY_CHUNK];
            for (i, want) in expected.chunks(VERIFY_CHUNK).enumerate() {
                let base = i * VERIFY_CHUNK;
                let got = &mut scratch[..want.len()];
                protocol::read_data(&mut dev.master, command, column + base as u16, got)?;

                if let Some(pos) = want.iter().zip(got.iter()).position(|(w, g)| w != g) {
                    return Err(Error::DataMismatch {
                        offset: base + pos,
                        expected: want[pos],
                        actual: got[pos],
                    });
                }
            }

            log::debug!("Verified {} bytes of {}", expected.len(), addr);
            Ok(ecc)
        })
    }

    /// `13h` then busy-poll
    fn load_page_to_cache(&mut self, trace: &mut OpTrace, row: u32) -> Result<()> {
        trace.advance(OpState::CommandIssued);
        protocol::page_data_read(&mut self.master, row)?;
        let timeout = self.config.read_timeout_ms;
        self.poll(trace, Operation::Read, row, timeout)
    }

    fn check_ecc(&mut self, addr: PageAddress, column: u16) -> Result<EccStatus> {
        let sr3 = status::read_sr3(&mut self.master)?;
        match sr3.ecc_class() {
            EccStatus::Uncorrectable => Err(Error::UncorrectableData {
                page: addr.row(),
                column,
            }),
            EccStatus::CorrectedAtThreshold => {
                log::warn!("ECC correction at threshold reading {}", addr);
                Ok(EccStatus::CorrectedAtThreshold)
            }
            ecc => Ok(ecc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NandConfig;
    use crate::flash::OpRecord;
    use crate::testing::{MockMaster, StepClock};

    fn device(master: MockMaster) -> NandDevice<MockMaster, StepClock> {
        NandDevice::new(master, StepClock::new(1))
    }

    #[test]
    fn test_erase_sequence() {
        let mut nand = device(MockMaster::new());
        nand.set_config(NandConfig::new().with_unlock_before_erase(false));
        nand.master_mut().busy_after = 3;
        nand.erase_block(50).unwrap();

        let m = nand.master();
        assert_eq!(m.opcodes(), [0x06, 0x05, 0xD8, 0x05, 0x05, 0x05, 0x05, 0x05]);
        assert_eq!(m.sent(2), &[0xD8, 0x00, 0x0C, 0x80]);
        assert_eq!(
            nand.last_op(),
            Some(OpRecord {
                op: Operation::Erase,
                page: 3200,
                state: OpState::Done,
                failed_in: None,
            })
        );
    }

    #[test]
    fn test_erase_unlocks_first() {
        let mut master = MockMaster::new();
        master.sr[0] = 0x7C;
        let mut nand = device(master);
        nand.erase_block(9).unwrap();
        assert_eq!(nand.master().sr[0] & 0x7C, 0);
        assert_eq!(nand.master().opcodes()[..5], [0x05, 0x06, 0x05, 0x01, 0x05]);
    }

    #[test]
    fn test_erase_unlock_failure_is_not_fatal() {
        let mut master = MockMaster::new();
        master.sr[0] = 0x7C;
        master.frozen[0] = true;
        let mut nand = device(master);
        nand.erase_block(9).unwrap();
        assert!(nand.master().opcodes().contains(&0xD8));
    }

    #[test]
    fn test_erase_failure_reported() {
        let mut master = MockMaster::new();
        master.raise.push((0xD8, 0x04));
        let mut nand = device(master);
        assert_eq!(
            nand.erase_block(12),
            Err(Error::OperationFailed(OpFailure::Erase { block: 12 }))
        );
        let record = nand.last_op().unwrap();
        assert_eq!(record.state, OpState::Failed);
        assert_eq!(record.failed_in, Some(OpState::Verifying));
    }

    #[test]
    fn test_erase_timeout() {
        let mut master = MockMaster::new();
        master.busy_after = u32::MAX;
        let mut nand = device(master);
        nand.set_config(NandConfig::new().with_erase_timeout(5));
        assert_eq!(
            nand.erase_block(50),
            Err(Error::Timeout {
                op: Operation::Erase,
                page: 3200,
            })
        );
        assert_eq!(nand.last_op().unwrap().failed_in, Some(OpState::Polling));
    }

    #[test]
    fn test_erase_not_issued_without_wel() {
        let mut master = MockMaster::new();
        master.wel_stuck = true;
        let mut nand = device(master);
        nand.set_config(NandConfig::new().with_unlock_before_erase(false));
        assert_eq!(nand.erase_block(50), Err(Error::WriteEnableFailed));
        assert!(!nand.master().opcodes().contains(&0xD8));
        assert_eq!(nand.last_op().unwrap().failed_in, Some(OpState::WriteEnabling));
    }

    #[test]
    fn test_erase_rejects_block_out_of_range() {
        let mut nand = device(MockMaster::new());
        assert!(matches!(nand.erase_block(2048), Err(Error::InvalidArgument(_))));
        assert!(nand.master().log.is_empty());
    }

    #[test]
    fn test_program_sequence() {
        let mut nand = device(MockMaster::new());
        let addr = PageAddress::new(50, 1).unwrap();
        nand.program_page(addr, 4, &[0xAA, 0x55]).unwrap();

        let m = nand.master();
        assert_eq!(m.opcodes(), [0x06, 0x05, 0x02, 0x10, 0x05, 0x05]);
        assert_eq!(m.sent(2), &[0x02, 0x00, 0x04, 0xAA, 0x55]);
        assert_eq!(m.sent(3), &[0x10, 0x00, 0x0C, 0x81]);
    }

    #[test]
    fn test_program_quad_load() {
        let mut nand = device(MockMaster::new());
        nand.set_config(NandConfig::new().with_quad_load(true));
        nand.program_page(PageAddress::new(8, 0).unwrap(), 0, &[1, 2, 3]).unwrap();
        assert_eq!(nand.master().opcodes()[2], 0x32);
    }

    #[test]
    fn test_program_random_segments() {
        let mut nand = device(MockMaster::new());
        let segs = [ProgramSegment::new(0, &[0x12]), ProgramSegment::new(2048, &[0x00])];
        nand.program_random(PageAddress::new(30, 0).unwrap(), &segs).unwrap();

        let m = nand.master();
        assert_eq!(m.opcodes(), [0x06, 0x05, 0x84, 0x84, 0x10, 0x05, 0x05]);
        assert_eq!(m.sent(3), &[0x84, 0x08, 0x00, 0x00]);
    }

    #[test]
    fn test_program_failure_reported() {
        let mut master = MockMaster::new();
        master.raise.push((0x10, 0x08));
        let mut nand = device(master);
        let err = nand
            .program_page(PageAddress::new(50, 2).unwrap(), 0, &[0])
            .unwrap_err();
        assert_eq!(err, Error::OperationFailed(OpFailure::Program { page: 3202 }));
        assert_eq!(err.operation_failure().unwrap().block(), 50);
    }

    #[test]
    fn test_program_rejects_oversized_window() {
        let mut nand = device(MockMaster::new());
        let data = [0u8; 129];
        assert!(nand
            .program_page(PageAddress::new(50, 0).unwrap(), 2048, &data)
            .is_err());
        assert!(nand.master().log.is_empty());
    }

    #[test]
    fn test_read_sequence_and_ecc() {
        let mut master = MockMaster::new();
        master.data.push_back(std::vec![0xAA, 0xBB]);
        master.sr[2] = 0x10;
        let mut nand = device(master);

        let mut buf = [0u8; 2];
        let ecc = nand.read_page(PageAddress::new(0, 5).unwrap(), 2048, &mut buf).unwrap();
        assert_eq!(ecc, EccStatus::CorrectedOk);
        assert_eq!(buf, [0xAA, 0xBB]);

        let m = nand.master();
        assert_eq!(m.opcodes(), [0x13, 0x05, 0x03, 0x05]);
        assert_eq!(m.sent(0), &[0x13, 0x00, 0x00, 0x05]);
        assert_eq!(m.sent(2), &[0x03, 0x08, 0x00, 0x00]);
    }

    #[test]
    fn test_read_uncorrectable() {
        let mut master = MockMaster::new();
        master.sr[2] = 0x20;
        let mut nand = device(master);
        let mut buf = [0u8; 4];
        assert_eq!(
            nand.read_page(PageAddress::new(10, 0).unwrap(), 16, &mut buf),
            Err(Error::UncorrectableData {
                page: 640,
                column: 16,
            })
        );
    }

    #[test]
    fn test_read_at_threshold_is_success() {
        let mut master = MockMaster::new();
        master.sr[2] = 0x30;
        let mut nand = device(master);
        let mut buf = [0u8; 1];
        assert_eq!(
            nand.read_page(PageAddress::new(10, 0).unwrap(), 0, &mut buf),
            Ok(EccStatus::CorrectedAtThreshold)
        );
    }

    #[test]
    fn test_read_fast_command() {
        let mut nand = device(MockMaster::new());
        nand.set_config(NandConfig::new().with_read_command(protocol::ReadCommand::Fast));
        let mut buf = [0u8; 1];
        nand.read_page(PageAddress::new(10, 0).unwrap(), 0, &mut buf).unwrap();
        assert_eq!(nand.master().opcodes()[2], 0x0B);
    }

    #[test]
    fn test_read_timeout() {
        let mut master = MockMaster::new();
        master.busy_after = u32::MAX;
        let mut nand = device(master);
        let mut buf = [0u8; 1];
        assert_eq!(
            nand.read_page(PageAddress::new(1, 1).unwrap(), 0, &mut buf),
            Err(Error::Timeout {
                op: Operation::Read,
                page: 65,
            })
        );
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut master = MockMaster::new();
        let mut page = std::vec![0x5Au8; 300];
        page[270] = 0x00;
        master.data.push_back(page[..256].to_vec());
        master.data.push_back(page[256..].to_vec());
        let mut nand = device(master);

        let expected = [0x5Au8; 300];
        assert_eq!(
            nand.verify_page(PageAddress::new(50, 0).unwrap(), 0, &expected),
            Err(Error::DataMismatch {
                offset: 270,
                expected: 0x5A,
                actual: 0x00,
            })
        );
        assert_eq!(nand.master().sent(4), &[0x03, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_verify_match() {
        let mut master = MockMaster::new();
        master.data.push_back(std::vec![1, 2, 3]);
        let mut nand = device(master);
        assert_eq!(
            nand.verify_page(PageAddress::new(50, 0).unwrap(), 0, &[1, 2, 3]),
            Ok(EccStatus::Ok)
        );
    }
}
