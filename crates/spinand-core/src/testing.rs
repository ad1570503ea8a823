//! Register-level stand-in for the device used by unit tests
//!
//! Models the three status registers, the write-enable latch and a busy
//! countdown. Data reads are served from a queue. Full array behaviour lives
//! in the `spinand-dummy` emulator.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::error::Result;
use crate::programmer::{Clock, SpiFeatures, SpiMaster};
use crate::spi::{opcodes, SpiCommand};

pub(crate) struct MockMaster {
    /// SR1, SR2, SR3
    pub sr: [u8; 3],
    /// Every frame sent: header followed by write data
    pub log: Vec<Vec<u8>>,
    /// Responses for non-status reads, consumed in order
    pub data: VecDeque<Vec<u8>>,
    /// Registers that silently ignore WRSR
    pub frozen: [bool; 3],
    /// WREN has no effect
    pub wel_stuck: bool,
    /// Remaining SR3 reads that report BUSY
    pub busy_polls: u32,
    /// BUSY reads armed after each erase/program execute/page read
    pub busy_after: u32,
    /// SR3 bits raised when the given opcode executes
    pub raise: Vec<(u8, u8)>,
    pub max_len: usize,
}

impl MockMaster {
    pub fn new() -> Self {
        Self {
            sr: [0x00, 0x18, 0x00],
            log: Vec::new(),
            data: VecDeque::new(),
            frozen: [false; 3],
            wel_stuck: false,
            busy_polls: 0,
            busy_after: 0,
            raise: Vec::new(),
            max_len: 4096,
        }
    }

    pub fn sent(&self, i: usize) -> &[u8] {
        &self.log[i]
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.log.iter().map(|f| f[0]).collect()
    }

    fn reg_index(addr: Option<u32>) -> usize {
        match addr.map(|a| a as u8) {
            Some(opcodes::SR1_ADDR) => 0,
            Some(opcodes::SR2_ADDR) => 1,
            _ => 2,
        }
    }
}

impl SpiMaster for MockMaster {
    fn features(&self) -> SpiFeatures {
        SpiFeatures::QUAD
    }

    fn max_read_len(&self) -> usize {
        self.max_len
    }

    fn max_write_len(&self) -> usize {
        self.max_len
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let mut frame = std::vec![0u8; cmd.header_len()];
        cmd.encode_header(&mut frame);
        frame.extend_from_slice(cmd.write_data);
        self.log.push(frame);

        match cmd.opcode {
            opcodes::RDSR => {
                let idx = Self::reg_index(cmd.address);
                let mut value = self.sr[idx];
                if idx == 2 && self.busy_polls > 0 {
                    self.busy_polls -= 1;
                    value |= 0x01;
                }
                cmd.read_buf[0] = value;
            }
            opcodes::WRSR => {
                let idx = Self::reg_index(cmd.address);
                if idx != 2 && !self.frozen[idx] {
                    self.sr[idx] = cmd.write_data[0];
                }
            }
            opcodes::WREN => {
                if !self.wel_stuck {
                    self.sr[2] |= 0x02;
                }
            }
            opcodes::WRDI => self.sr[2] &= !0x02,
            opcodes::BLOCK_ERASE | opcodes::PROGRAM_EXECUTE | opcodes::PAGE_DATA_READ => {
                if cmd.opcode != opcodes::PAGE_DATA_READ {
                    self.sr[2] &= !0x0E;
                }
                self.busy_polls = self.busy_after;
            }
            _ => {
                if cmd.has_read() {
                    let response = self.data.pop_front().unwrap_or_default();
                    for (i, b) in cmd.read_buf.iter_mut().enumerate() {
                        *b = response.get(i).copied().unwrap_or(0xFF);
                    }
                }
            }
        }

        for (op, bits) in &self.raise {
            if *op == cmd.opcode {
                self.sr[2] |= *bits;
            }
        }
        Ok(())
    }
}

/// Clock that advances a fixed step on every read
pub(crate) struct StepClock {
    pub now: u32,
    pub step: u32,
}

impl StepClock {
    pub fn new(step: u32) -> Self {
        Self { now: 0, step }
    }
}

impl Clock for StepClock {
    fn now_ms(&mut self) -> u32 {
        let t = self.now;
        self.now = self.now.wrapping_add(self.step);
        t
    }
}
