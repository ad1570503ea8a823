//! spinand-dummy - In-memory W25N02KV emulator for testing
//!
//! This crate provides a [`SpiMaster`] that behaves like a W25N02KV at the
//! command level: status registers, the write-enable latch, a cache register,
//! a sparse page array, the OTP area and busy windows timed on a shared
//! [`SimClock`]. Faults (erase/program failures, ECC results, a busy flag
//! that never clears, a latch that never sets, registers that ignore writes)
//! can be injected to exercise error paths without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod clock;

#[cfg(feature = "alloc")]
pub use clock::SimClock;

#[cfg(feature = "alloc")]
use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use spinand_core::error::{Error, Result};
use spinand_core::flash::{BLOCK_COUNT, CACHE_SIZE, PAGES_PER_BLOCK, PAGE_COUNT, SPARE_COLUMN};
use spinand_core::programmer::{SpiFeatures, SpiMaster};
use spinand_core::spi::{check_io_mode_supported, opcodes, SpiCommand};
use spinand_core::status::{Sr1, Sr2, Sr3, SR3_ECC_FIELD_MASK};
use spinand_core::wp::BlockProtect;

/// Number of OTP pages
pub const OTP_PAGE_COUNT: u8 = 12;

/// Configuration for the emulated device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Busy window of a block erase
    pub erase_time_ms: u32,
    /// Busy window of a program execute
    pub program_time_ms: u32,
    /// Busy window of a page data read
    pub read_time_ms: u32,
    /// Busy window after a reset
    pub reset_time_ms: u32,
    /// SR1 at power-up
    pub power_on_sr1: u8,
    /// SR2 at power-up
    pub power_on_sr2: u8,
    /// Largest data phase accepted in one command
    pub max_transfer: usize,
    /// Accept x4 data phases
    pub quad: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: opcodes::MFR_WINBOND,
            device_id: opcodes::DEVICE_W25N02KV,
            erase_time_ms: 3,
            program_time_ms: 1,
            read_time_ms: 1,
            reset_time_ms: 1,
            power_on_sr1: 0x00,
            // ECC-E and BUF
            power_on_sr2: 0x18,
            max_transfer: 4096,
            quad: true,
        }
    }
}

/// Injected misbehaviour
#[derive(Debug, Clone, Default)]
#[cfg(feature = "alloc")]
pub struct Faults {
    /// Blocks whose erase reports E-FAIL
    pub erase_fail: BTreeSet<u16>,
    /// Pages (linear index) whose program execute reports P-FAIL
    pub program_fail: BTreeSet<u32>,
    /// ECC field reported after reading a page (linear index)
    pub ecc: BTreeMap<u32, u8>,
    /// BUSY never clears once an array operation starts
    pub stuck_busy: bool,
    /// WREN has no effect
    pub wel_stuck: bool,
    /// SR1/SR2/SR3 silently ignore WRSR
    pub ignore_status_writes: [bool; 3],
}

/// Emulated W25N02KV
#[cfg(feature = "alloc")]
pub struct DummyNand {
    config: DummyConfig,
    clock: SimClock,
    /// Programmed pages; absent pages are erased
    pages: BTreeMap<u32, Vec<u8>>,
    otp: BTreeMap<u8, Vec<u8>>,
    cache: Vec<u8>,
    sr1: u8,
    sr2: u8,
    sr3: u8,
    busy_until: Option<u32>,
    /// An operation started under `stuck_busy` never completes
    hung: bool,
    reset_armed: bool,
    faults: Faults,
    erase_log: Vec<u16>,
    program_log: Vec<u32>,
    read_log: Vec<u32>,
}

#[cfg(feature = "alloc")]
impl DummyNand {
    /// Create an erased device timed on `clock`
    pub fn new(config: DummyConfig, clock: SimClock) -> Self {
        let sr1 = config.power_on_sr1;
        let sr2 = config.power_on_sr2;
        Self {
            config,
            clock,
            pages: BTreeMap::new(),
            otp: BTreeMap::new(),
            cache: vec![0xFF; CACHE_SIZE],
            sr1,
            sr2,
            sr3: 0,
            busy_until: None,
            hung: false,
            reset_armed: false,
            faults: Faults::default(),
            erase_log: Vec::new(),
            program_log: Vec::new(),
            read_log: Vec::new(),
        }
    }

    /// Create an erased device with the default configuration
    pub fn new_default(clock: SimClock) -> Self {
        Self::new(DummyConfig::default(), clock)
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// The clock busy windows are timed on
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Injected faults
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Make erases of `block` report E-FAIL
    pub fn fail_erase(&mut self, block: u16) {
        self.faults.erase_fail.insert(block);
    }

    /// Make programs of page `row` report P-FAIL
    pub fn fail_program(&mut self, row: u32) {
        self.faults.program_fail.insert(row);
    }

    /// Report `field` in SR3's ECC bits after reading page `row`
    pub fn inject_ecc(&mut self, row: u32, field: u8) {
        self.faults.ecc.insert(row, field);
    }

    /// Write a factory bad-block marker (0x00 in spare byte 0 of page 0)
    pub fn mark_factory_bad(&mut self, block: u16) {
        let row = block as u32 * PAGES_PER_BLOCK;
        self.corrupt(row, SPARE_COLUMN as usize, 0x00);
    }

    /// Overwrite one stored byte, bypassing program semantics
    pub fn corrupt(&mut self, row: u32, offset: usize, value: u8) {
        if offset < CACHE_SIZE {
            self.page_mut(row)[offset] = value;
        }
    }

    /// Contents of a page (main + spare)
    pub fn page(&self, row: u32) -> Vec<u8> {
        self.pages
            .get(&row)
            .cloned()
            .unwrap_or_else(|| vec![0xFF; CACHE_SIZE])
    }

    /// Contents of an OTP page
    pub fn otp_page(&self, page: u8) -> Vec<u8> {
        self.otp
            .get(&page)
            .cloned()
            .unwrap_or_else(|| vec![0xFF; CACHE_SIZE])
    }

    /// SR1, SR2, SR3 as currently held
    pub fn status_registers(&self) -> [u8; 3] {
        [self.sr1, self.sr2, self.sr3 | self.busy_bit()]
    }

    /// Blocks erased so far, in order
    pub fn erase_log(&self) -> &[u16] {
        &self.erase_log
    }

    /// Pages passed to program execute so far, in order
    pub fn program_log(&self) -> &[u32] {
        &self.program_log
    }

    /// Pages passed to page data read so far, in order
    pub fn read_log(&self) -> &[u32] {
        &self.read_log
    }

    /// Forget the command logs
    pub fn clear_logs(&mut self) {
        self.erase_log.clear();
        self.program_log.clear();
        self.read_log.clear();
    }

    /// Power cycle: volatile state returns to power-on values
    ///
    /// The array, the OTP area and the one-time lock bits survive.
    pub fn power_cycle(&mut self) {
        let locks = self.sr2 & Sr2::LOCKS.bits();
        if locks & Sr2::SR1_L.bits() == 0 {
            self.sr1 = self.config.power_on_sr1;
        }
        self.sr2 = self.config.power_on_sr2 | locks;
        self.sr3 = 0;
        self.cache.fill(0xFF);
        self.busy_until = None;
        self.hung = false;
        self.reset_armed = false;
        log::debug!("Emulated power cycle");
    }

    fn page_mut(&mut self, row: u32) -> &mut Vec<u8> {
        self.pages
            .entry(row)
            .or_insert_with(|| vec![0xFF; CACHE_SIZE])
    }

    fn is_busy(&self) -> bool {
        if self.hung {
            return true;
        }
        match self.busy_until {
            Some(until) => (until.wrapping_sub(self.clock.now()) as i32) > 0,
            None => false,
        }
    }

    fn busy_bit(&self) -> u8 {
        if self.is_busy() {
            Sr3::BUSY.bits()
        } else {
            0
        }
    }

    fn start_busy(&mut self, ms: u32) {
        self.busy_until = Some(self.clock.now().wrapping_add(ms));
        self.hung = self.faults.stuck_busy;
    }

    fn wel(&self) -> bool {
        self.sr3 & Sr3::WEL.bits() != 0
    }

    fn otp_mode(&self) -> bool {
        self.sr2 & Sr2::OTP_E.bits() != 0
    }

    fn is_protected(&self, block: u16) -> bool {
        BlockProtect::from_sr1(Sr1::from_bits_retain(self.sr1))
            .protected_blocks()
            .contains(&block)
    }

    fn read_status(&self, reg: u8) -> u8 {
        match reg {
            opcodes::SR1_ADDR => self.sr1,
            opcodes::SR2_ADDR => self.sr2,
            opcodes::SR3_ADDR => self.sr3 | self.busy_bit(),
            other => {
                log::debug!("Read of unknown status register 0x{:02X}", other);
                0
            }
        }
    }

    fn write_status(&mut self, reg: u8, value: u8) {
        match reg {
            opcodes::SR1_ADDR => {
                if self.faults.ignore_status_writes[0] {
                    return;
                }
                if self.sr2 & Sr2::SR1_L.bits() != 0 {
                    log::debug!("SR1 is locked, ignoring write of 0x{:02X}", value);
                    return;
                }
                self.sr1 = value;
            }
            opcodes::SR2_ADDR => {
                if self.faults.ignore_status_writes[1] {
                    return;
                }
                // lock bits only ever go from 0 to 1
                self.sr2 = value | (self.sr2 & Sr2::LOCKS.bits());
            }
            _ => {}
        }
    }

    fn block_erase(&mut self, row: u32) {
        if !self.wel() {
            log::debug!("Block erase without WEL ignored");
            return;
        }
        let block = (row / PAGES_PER_BLOCK) as u16;
        self.erase_log.push(block);
        self.sr3 &= !(Sr3::E_FAIL | Sr3::P_FAIL | Sr3::WEL).bits();

        if self.otp_mode()
            || block >= BLOCK_COUNT
            || self.is_protected(block)
            || self.faults.erase_fail.contains(&block)
        {
            self.sr3 |= Sr3::E_FAIL.bits();
        } else {
            let first = block as u32 * PAGES_PER_BLOCK;
            let range = first..first + PAGES_PER_BLOCK;
            self.pages.retain(|row, _| !range.contains(row));
        }
        self.start_busy(self.config.erase_time_ms);
    }

    fn load(&mut self, column: u16, data: &[u8], reset: bool) {
        if !self.wel() {
            log::debug!("Program data load without WEL ignored");
            return;
        }
        if reset {
            self.cache.fill(0xFF);
        }
        let start = column as usize;
        for (i, &byte) in data.iter().enumerate() {
            if let Some(slot) = self.cache.get_mut(start + i) {
                *slot = byte;
            }
        }
    }

    fn program_execute(&mut self, row: u32) {
        if !self.wel() {
            log::debug!("Program execute without WEL ignored");
            return;
        }
        self.program_log.push(row);
        self.sr3 &= !(Sr3::E_FAIL | Sr3::P_FAIL | Sr3::WEL).bits();

        let failed = if self.otp_mode() {
            let locked = self.sr2 & Sr2::OTP_L.bits() != 0;
            if locked || !(2..OTP_PAGE_COUNT as u32).contains(&row) {
                true
            } else {
                let cache = self.cache.clone();
                let page = self
                    .otp
                    .entry(row as u8)
                    .or_insert_with(|| vec![0xFF; CACHE_SIZE]);
                program_bits(page, &cache);
                false
            }
        } else if row >= PAGE_COUNT
            || self.is_protected((row / PAGES_PER_BLOCK) as u16)
            || self.faults.program_fail.contains(&row)
        {
            true
        } else {
            let cache = self.cache.clone();
            program_bits(self.page_mut(row), &cache);
            false
        };

        if failed {
            self.sr3 |= Sr3::P_FAIL.bits();
        }
        self.start_busy(self.config.program_time_ms);
    }

    fn page_data_read(&mut self, row: u32) {
        self.read_log.push(row);
        let source = if self.otp_mode() {
            self.otp.get(&(row as u8)).filter(|_| row < OTP_PAGE_COUNT as u32)
        } else {
            self.pages.get(&row)
        };
        match source {
            Some(page) => self.cache.copy_from_slice(page),
            None => self.cache.fill(0xFF),
        }

        let ecc = if self.sr2 & Sr2::ECC_E.bits() != 0 {
            self.faults.ecc.get(&row).copied().unwrap_or(0)
        } else {
            0
        };
        self.sr3 = (self.sr3 & !SR3_ECC_FIELD_MASK) | ((ecc << 4) & SR3_ECC_FIELD_MASK);
        self.start_busy(self.config.read_time_ms);
    }

    fn read_cache(&self, column: u16, buf: &mut [u8]) {
        let start = column as usize;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.cache.get(start + i).copied().unwrap_or(0xFF);
        }
    }

    fn reset(&mut self) {
        self.sr2 &= !Sr2::OTP_E.bits();
        self.sr3 = 0;
        self.cache.fill(0xFF);
        self.busy_until = Some(self.clock.now().wrapping_add(self.config.reset_time_ms));
        self.hung = false;
        log::debug!("Emulated device reset");
    }
}

/// NAND programming only clears bits
#[cfg(feature = "alloc")]
fn program_bits(page: &mut [u8], cache: &[u8]) {
    for (dst, &src) in page.iter_mut().zip(cache) {
        *dst &= src;
    }
}

#[cfg(feature = "alloc")]
impl SpiMaster for DummyNand {
    fn features(&self) -> SpiFeatures {
        if self.config.quad {
            SpiFeatures::QUAD
        } else {
            SpiFeatures::empty()
        }
    }

    fn max_read_len(&self) -> usize {
        self.config.max_transfer
    }

    fn max_write_len(&self) -> usize {
        self.config.max_transfer
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        check_io_mode_supported(cmd.io_mode, self.features())?;
        if cmd.read_buf.len() > self.config.max_transfer
            || cmd.write_data.len() > self.config.max_transfer
        {
            return Err(Error::TransferTooLarge);
        }

        let reset_armed = core::mem::take(&mut self.reset_armed);
        let addr = cmd.address.unwrap_or(0);

        match cmd.opcode {
            // Accepted while busy
            opcodes::RDSR => {
                if let Some(b) = cmd.read_buf.first_mut() {
                    *b = self.read_status(addr as u8);
                }
                return Ok(());
            }
            opcodes::RESET => {
                self.reset();
                return Ok(());
            }
            opcodes::RSTEN => {
                self.reset_armed = true;
                return Ok(());
            }
            opcodes::RST => {
                if reset_armed {
                    self.reset();
                } else {
                    log::debug!("Reset without enable ignored");
                }
                return Ok(());
            }
            _ => {}
        }

        if self.is_busy() {
            log::debug!("Opcode 0x{:02X} ignored while busy", cmd.opcode);
            return Ok(());
        }

        match cmd.opcode {
            // JEDEC ID
            opcodes::RDID => {
                let id = [
                    self.config.manufacturer_id,
                    (self.config.device_id >> 8) as u8,
                    self.config.device_id as u8,
                ];
                for (dst, src) in cmd.read_buf.iter_mut().zip(id.iter()) {
                    *dst = *src;
                }
            }

            // Write enable/disable
            opcodes::WREN => {
                if !self.faults.wel_stuck {
                    self.sr3 |= Sr3::WEL.bits();
                }
            }
            opcodes::WRDI => self.sr3 &= !Sr3::WEL.bits(),

            // Status register write
            opcodes::WRSR => {
                if let Some(&value) = cmd.write_data.first() {
                    self.write_status(addr as u8, value);
                }
            }

            // Erase
            opcodes::BLOCK_ERASE => self.block_erase(addr),

            // Program
            opcodes::PROGRAM_LOAD | opcodes::PROGRAM_LOAD_QUAD => {
                self.load(addr as u16, cmd.write_data, true)
            }
            opcodes::PROGRAM_LOAD_RANDOM | opcodes::PROGRAM_LOAD_RANDOM_QUAD => {
                self.load(addr as u16, cmd.write_data, false)
            }
            opcodes::PROGRAM_EXECUTE => self.program_execute(addr),

            // Read
            opcodes::PAGE_DATA_READ => self.page_data_read(addr),
            opcodes::READ | opcodes::FAST_READ | opcodes::FAST_READ_QUAD => {
                self.read_cache(addr as u16, cmd.read_buf)
            }

            // Unknown opcode
            _ => return Err(Error::OpcodeNotSupported),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinand_core::programmer::Clock;
    use spinand_core::protocol::{self, LoadMode, ReadCommand};
    use spinand_core::spi::IoMode;

    fn nand() -> (DummyNand, SimClock) {
        let clock = SimClock::new();
        (DummyNand::new_default(clock.clone()), clock)
    }

    #[test]
    fn test_read_jedec_id() {
        let (mut flash, _) = nand();
        assert_eq!(protocol::read_jedec_id(&mut flash).unwrap(), [0xEF, 0xAA, 0x22]);
    }

    #[test]
    fn test_program_and_read_back() {
        let (mut flash, mut clock) = nand();

        protocol::write_enable(&mut flash).unwrap();
        protocol::load_program_data(
            &mut flash,
            LoadMode::Sequential,
            IoMode::Single,
            10,
            &[0x12, 0x34],
        )
        .unwrap();
        protocol::program_execute(&mut flash, 700).unwrap();
        assert!(protocol::is_busy(&mut flash).unwrap());
        assert!(protocol::wait_ready(&mut flash, &mut clock, 10).unwrap());

        protocol::page_data_read(&mut flash, 700).unwrap();
        assert!(protocol::wait_ready(&mut flash, &mut clock, 10).unwrap());
        let mut buf = [0u8; 4];
        protocol::read_data(&mut flash, ReadCommand::Read, 9, &mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0x12, 0x34, 0xFF]);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let (mut flash, _) = nand();
        flash.corrupt(5, 0, 0x0F);
        flash.sr3 |= Sr3::WEL.bits();
        flash.load(0, &[0xF0], true);
        flash.program_execute(5);
        assert_eq!(flash.page(5)[0], 0x00);
    }

    #[test]
    fn test_erase_without_wel_is_ignored() {
        let (mut flash, _) = nand();
        flash.corrupt(64, 0, 0x00);
        protocol::block_erase(&mut flash, 64).unwrap();
        assert_eq!(flash.page(64)[0], 0x00);
        assert!(flash.erase_log().is_empty());
    }

    #[test]
    fn test_protected_block_reports_erase_fail() {
        let (mut flash, _) = nand();
        // BP=1111, TB=0: everything protected
        flash.sr1 = 0x78;
        protocol::write_enable(&mut flash).unwrap();
        protocol::block_erase(&mut flash, 64 * 100).unwrap();
        assert_ne!(flash.status_registers()[2] & Sr3::E_FAIL.bits(), 0);
    }

    #[test]
    fn test_busy_window_and_stuck_busy() {
        let (mut flash, clock) = nand();
        protocol::write_enable(&mut flash).unwrap();
        protocol::block_erase(&mut flash, 0).unwrap();
        assert!(protocol::is_busy(&mut flash).unwrap());
        clock.advance(3);
        assert!(!protocol::is_busy(&mut flash).unwrap());

        flash.faults_mut().stuck_busy = true;
        protocol::page_data_read(&mut flash, 0).unwrap();
        clock.advance(1000);
        assert!(protocol::is_busy(&mut flash).unwrap());
        let mut c = clock.clone();
        assert!(c.now_ms() >= 1003);
    }

    #[test]
    fn test_lock_bits_are_sticky() {
        let (mut flash, _) = nand();
        protocol::write_status(&mut flash, opcodes::SR2_ADDR, 0x98).unwrap();
        protocol::write_status(&mut flash, opcodes::SR2_ADDR, 0x18).unwrap();
        assert_eq!(flash.status_registers()[1] & 0x80, 0x80);
        flash.power_cycle();
        assert_eq!(flash.status_registers()[1] & 0x80, 0x80);
    }

    #[test]
    fn test_reset_requires_enable() {
        let (mut flash, _) = nand();
        flash.sr2 |= Sr2::OTP_E.bits();
        let mut cmd = SpiCommand::simple(opcodes::RST);
        flash.execute(&mut cmd).unwrap();
        assert!(flash.otp_mode());
        protocol::software_reset(&mut flash).unwrap();
        assert!(!flash.otp_mode());
    }

    #[test]
    fn test_unknown_opcode() {
        let (mut flash, _) = nand();
        let mut cmd = SpiCommand::simple(0xC7);
        assert_eq!(flash.execute(&mut cmd), Err(Error::OpcodeNotSupported));
    }
}
