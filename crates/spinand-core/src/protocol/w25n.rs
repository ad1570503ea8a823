//! W25N SPI NAND command layer
//!
//! One function per device command, generic over the transport. Framings:
//!
//! - array commands (`D8`, `10`, `13`): opcode + 3-byte page address
//! - cache loads (`02`, `84`, `32`, `34`): opcode + 2-byte column + data
//! - cache reads (`03`, `0B`, `6B`): opcode + 2-byte column + dummy + data
//! - register access (`05`, `01`): opcode + register address (+ value)

use crate::error::Result;
use crate::programmer::{Clock, SpiMaster};
use crate::spi::{opcodes, IoMode, SpiCommand};
use crate::status::Sr3;

/// How a program load treats the rest of the cache register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum LoadMode {
    /// `02h`/`32h`: cache is reset to 0xFF before the data is placed
    #[default]
    Sequential,
    /// `84h`/`34h`: only the addressed bytes change
    Random,
}

impl LoadMode {
    /// Opcode for this load, single or quad data phase
    pub const fn opcode(&self, io_mode: IoMode) -> u8 {
        match (self, io_mode) {
            (Self::Sequential, IoMode::Single) => opcodes::PROGRAM_LOAD,
            (Self::Sequential, IoMode::QuadOut) => opcodes::PROGRAM_LOAD_QUAD,
            (Self::Random, IoMode::Single) => opcodes::PROGRAM_LOAD_RANDOM,
            (Self::Random, IoMode::QuadOut) => opcodes::PROGRAM_LOAD_RANDOM_QUAD,
        }
    }
}

/// Which cache read command to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum ReadCommand {
    /// `03h` Read Data
    #[default]
    Read,
    /// `0Bh` Fast Read
    Fast,
    /// `6Bh` Fast Read Quad Output
    FastQuad,
}

impl ReadCommand {
    /// Opcode and data phase width
    pub const fn opcode(&self) -> (u8, IoMode) {
        match self {
            Self::Read => (opcodes::READ, IoMode::Single),
            Self::Fast => (opcodes::FAST_READ, IoMode::Single),
            Self::FastQuad => (opcodes::FAST_READ_QUAD, IoMode::QuadOut),
        }
    }
}

/// Read the JEDEC ID
///
/// Returns the three bytes following the dummy byte, `EF AA 22` on a
/// W25N02KV.
pub fn read_jedec_id<M: SpiMaster + ?Sized>(master: &mut M) -> Result<[u8; 3]> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_id(opcodes::RDID, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf)
}

/// Read a status register by address (0xA0, 0xB0 or 0xC0)
pub fn read_status<M: SpiMaster + ?Sized>(master: &mut M, reg: u8) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, reg, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Write a status register by address
///
/// Raw write: no write-enable and no read-back. See [`crate::wp`] for the
/// verified configuration path.
pub fn write_status<M: SpiMaster + ?Sized>(master: &mut M, reg: u8, value: u8) -> Result<()> {
    let data = [value];
    let mut cmd = SpiCommand::write_reg(opcodes::WRSR, reg, &data);
    master.execute(&mut cmd)
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Send the Write Disable command
pub fn write_disable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WRDI);
    master.execute(&mut cmd)
}

/// Issue a 128 KiB block erase at the given page address
pub fn block_erase<M: SpiMaster + ?Sized>(master: &mut M, page: u32) -> Result<()> {
    let mut cmd = SpiCommand::page(opcodes::BLOCK_ERASE, page);
    master.execute(&mut cmd)
}

/// Load data into the cache register at `column`
///
/// Data longer than the transport's write limit is split. Only the first
/// chunk uses `mode`; later chunks are random loads so a sequential load
/// does not wipe what was just sent.
pub fn load_program_data<M: SpiMaster + ?Sized>(
    master: &mut M,
    mode: LoadMode,
    io_mode: IoMode,
    column: u16,
    data: &[u8],
) -> Result<()> {
    let max_len = master.max_write_len().max(1);
    let mut col = column;
    let mut first = true;

    // A sequential load of nothing still resets the cache
    if data.is_empty() {
        let mut cmd =
            SpiCommand::column_write(mode.opcode(io_mode), column, &[]).with_io_mode(io_mode);
        return master.execute(&mut cmd);
    }

    for chunk in data.chunks(max_len) {
        let opcode = if first {
            mode.opcode(io_mode)
        } else {
            LoadMode::Random.opcode(io_mode)
        };
        let mut cmd = SpiCommand::column_write(opcode, col, chunk).with_io_mode(io_mode);
        master.execute(&mut cmd)?;
        col = col.wrapping_add(chunk.len() as u16);
        first = false;
    }

    Ok(())
}

/// Commit the cache register to the page at `page`
pub fn program_execute<M: SpiMaster + ?Sized>(master: &mut M, page: u32) -> Result<()> {
    let mut cmd = SpiCommand::page(opcodes::PROGRAM_EXECUTE, page);
    master.execute(&mut cmd)
}

/// Transfer the page at `page` from the array into the cache register
pub fn page_data_read<M: SpiMaster + ?Sized>(master: &mut M, page: u32) -> Result<()> {
    let mut cmd = SpiCommand::page(opcodes::PAGE_DATA_READ, page);
    master.execute(&mut cmd)
}

/// Read bytes out of the cache register starting at `column`
///
/// Reads longer than the transport's limit are split, advancing the column.
pub fn read_data<M: SpiMaster + ?Sized>(
    master: &mut M,
    command: ReadCommand,
    column: u16,
    buf: &mut [u8],
) -> Result<()> {
    let (opcode, io_mode) = command.opcode();
    let max_len = master.max_read_len().max(1);
    let mut col = column;

    for chunk in buf.chunks_mut(max_len) {
        let len = chunk.len();
        let mut cmd = SpiCommand::column_read(opcode, col, chunk).with_io_mode(io_mode);
        master.execute(&mut cmd)?;
        col = col.wrapping_add(len as u16);
    }

    Ok(())
}

/// Device Reset (`FFh`)
pub fn device_reset<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::RESET);
    master.execute(&mut cmd)
}

/// Software reset sequence (`66h` then `99h`)
pub fn software_reset<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::RSTEN);
    master.execute(&mut cmd)?;
    let mut cmd = SpiCommand::simple(opcodes::RST);
    master.execute(&mut cmd)
}

/// Check whether an operation is in progress
pub fn is_busy<M: SpiMaster + ?Sized>(master: &mut M) -> Result<bool> {
    let sr3 = read_status(master, opcodes::SR3_ADDR)?;
    Ok(Sr3::from_bits_retain(sr3).is_busy())
}

/// Spin on SR3.BUSY until it clears or `timeout_ms` elapses
///
/// Busy is sampled before the deadline is checked, so a ready device returns
/// `true` even with a zero timeout. Returns `Ok(false)` when the device was
/// still busy at the last sample taken at or after the deadline. Transport
/// errors are returned as `Err`.
pub fn wait_ready<M: SpiMaster + ?Sized, C: Clock + ?Sized>(
    master: &mut M,
    clock: &mut C,
    timeout_ms: u32,
) -> Result<bool> {
    let start = clock.now_ms();
    let mut polls: u32 = 0;

    loop {
        polls = polls.saturating_add(1);
        if !is_busy(master)? {
            log::trace!("ready after {} polls", polls);
            return Ok(true);
        }
        if clock.now_ms().wrapping_sub(start) >= timeout_ms {
            log::debug!("still busy after {} ms ({} polls)", timeout_ms, polls);
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockMaster, StepClock};

    #[test]
    fn test_wait_ready_zero_timeout() {
        let mut master = MockMaster::new();
        let mut clock = StepClock::new(1);
        assert!(wait_ready(&mut master, &mut clock, 0).unwrap());

        master.busy_polls = 1;
        assert!(!wait_ready(&mut master, &mut clock, 0).unwrap());
    }

    #[test]
    fn test_wait_ready_clears_at_first_ready_sample() {
        let mut master = MockMaster::new();
        let mut clock = StepClock::new(1);
        master.busy_polls = 5;
        assert!(wait_ready(&mut master, &mut clock, 100).unwrap());
        // five busy samples plus the ready one
        assert_eq!(master.log.len(), 6);
    }

    #[test]
    fn test_wait_ready_times_out_while_busy() {
        let mut master = MockMaster::new();
        let mut clock = StepClock::new(1);
        master.busy_polls = u32::MAX;
        assert!(!wait_ready(&mut master, &mut clock, 1).unwrap());
        assert!(!wait_ready(&mut master, &mut clock, 1000).unwrap());
        assert!(master.log.len() >= 1000);
    }

    #[test]
    fn test_wait_ready_survives_clock_wrap() {
        let mut master = MockMaster::new();
        let mut clock = StepClock::new(1);
        clock.now = u32::MAX - 2;
        master.busy_polls = 3;
        assert!(wait_ready(&mut master, &mut clock, 10).unwrap());
    }

    #[test]
    fn test_read_data_splits_and_advances_column() {
        let mut master = MockMaster::new();
        master.max_len = 4;
        let mut buf = [0u8; 10];
        read_data(&mut master, ReadCommand::Read, 100, &mut buf).unwrap();
        assert_eq!(master.sent(0), &[0x03, 0x00, 100, 0x00]);
        assert_eq!(master.sent(1), &[0x03, 0x00, 104, 0x00]);
        assert_eq!(master.sent(2), &[0x03, 0x00, 108, 0x00]);
    }

    #[test]
    fn test_sequential_load_continues_with_random_load() {
        let mut master = MockMaster::new();
        master.max_len = 4;
        let data = [0x11u8; 6];
        load_program_data(&mut master, LoadMode::Sequential, IoMode::Single, 0, &data).unwrap();
        assert_eq!(master.opcodes(), [0x02, 0x84]);
        assert_eq!(&master.sent(1)[..3], &[0x84, 0x00, 0x04]);
    }

    #[test]
    fn test_quad_load_opcodes() {
        assert_eq!(LoadMode::Sequential.opcode(IoMode::QuadOut), 0x32);
        assert_eq!(LoadMode::Random.opcode(IoMode::QuadOut), 0x34);
    }

    #[test]
    fn test_software_reset_sequence() {
        let mut master = MockMaster::new();
        software_reset(&mut master).unwrap();
        assert_eq!(master.opcodes(), [0x66, 0x99]);
    }
}
