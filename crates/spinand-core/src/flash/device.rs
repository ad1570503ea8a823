//! NAND device handle

use super::state::{OpRecord, OpState, OpTrace};
use crate::config::NandConfig;
use crate::error::{Error, Operation, Result};
use crate::programmer::{Clock, SpiMaster};
use crate::protocol;
use crate::spi::opcodes;
use crate::status::{self, StatusSnapshot};

/// A W25N02KV behind a transport, with its tick source and configuration
///
/// All operations take `&mut self`: the device is a single exclusively
/// owned resource and command sequences are never split. Sharing it between
/// threads means wrapping it (and any [`BbtManager`](crate::bbt::BbtManager)
/// that drives it) in one lock.
pub struct NandDevice<M, C> {
    pub(crate) master: M,
    pub(crate) clock: C,
    pub(crate) config: NandConfig,
    last_op: Option<OpRecord>,
}

impl<M: SpiMaster, C: Clock> NandDevice<M, C> {
    /// Wrap a transport with the default configuration
    pub fn new(master: M, clock: C) -> Self {
        Self::with_config(master, clock, NandConfig::default())
    }

    /// Wrap a transport with an explicit configuration
    pub fn with_config(master: M, clock: C, config: NandConfig) -> Self {
        Self {
            master,
            clock,
            config,
            last_op: None,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &NandConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: NandConfig) {
        self.config = config;
    }

    /// The transport, for register-level access through [`crate::wp`]
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// The transport
    pub fn master(&self) -> &M {
        &self.master
    }

    /// The tick source
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Give back the transport and clock
    pub fn into_parts(self) -> (M, C) {
        (self.master, self.clock)
    }

    /// How the most recent erase/program/read ended
    pub fn last_op(&self) -> Option<OpRecord> {
        self.last_op
    }

    /// Read the three JEDEC ID bytes
    pub fn read_jedec_id(&mut self) -> Result<[u8; 3]> {
        protocol::read_jedec_id(&mut self.master)
    }

    /// Check that a W25N02KV answers
    pub fn probe(&mut self) -> Result<()> {
        let id = self.read_jedec_id()?;
        let device = ((id[1] as u16) << 8) | id[2] as u16;
        if id[0] != opcodes::MFR_WINBOND || device != opcodes::DEVICE_W25N02KV {
            log::debug!(
                "Unexpected JEDEC ID {:02X} {:02X} {:02X}",
                id[0],
                id[1],
                id[2]
            );
            return Err(Error::UnexpectedId { id });
        }
        log::info!(
            "Found Winbond W25N02KV (JEDEC ID {:02X} {:04X})",
            id[0],
            device
        );
        Ok(())
    }

    /// Read all three status registers
    pub fn status(&mut self) -> Result<StatusSnapshot> {
        status::read_all(&mut self.master)
    }

    /// Spin until BUSY clears or `timeout_ms` elapses
    ///
    /// `Ok(false)` means the device was still busy at the deadline.
    pub fn wait_ready(&mut self, timeout_ms: u32) -> Result<bool> {
        protocol::wait_ready(&mut self.master, &mut self.clock, timeout_ms)
    }

    /// Device reset (`FFh`), then wait for ready
    ///
    /// Aborts any operation in progress; status and configuration registers
    /// return to their power-on values apart from one-time bits.
    pub fn reset(&mut self) -> Result<()> {
        protocol::device_reset(&mut self.master)?;
        self.wait_after_reset()
    }

    /// Software reset sequence (`66h`, `99h`), then wait for ready
    pub fn software_reset(&mut self) -> Result<()> {
        protocol::software_reset(&mut self.master)?;
        self.wait_after_reset()
    }

    fn wait_after_reset(&mut self) -> Result<()> {
        let timeout = self.config.reset_timeout_ms;
        if !self.wait_ready(timeout)? {
            return Err(Error::Timeout {
                op: Operation::Reset,
                page: 0,
            });
        }
        log::debug!("Device reset complete");
        Ok(())
    }

    /// Run an operation body, recording its final state
    pub(crate) fn run<T>(
        &mut self,
        op: Operation,
        page: u32,
        body: impl FnOnce(&mut Self, &mut OpTrace) -> Result<T>,
    ) -> Result<T> {
        let mut trace = OpTrace::start(op, page);
        let result = body(self, &mut trace);
        match &result {
            Ok(_) => trace.advance(OpState::Done),
            Err(e) => {
                trace.advance(OpState::Failed);
                log::debug!("{} of page 0x{:05X} failed: {}", op, page, e);
            }
        }
        self.last_op = Some(trace.record());
        result
    }

    /// Busy-poll inside an operation, mapping a timeout to `Error::Timeout`
    pub(crate) fn poll(
        &mut self,
        trace: &mut OpTrace,
        op: Operation,
        page: u32,
        timeout_ms: u32,
    ) -> Result<()> {
        trace.advance(OpState::Polling);
        if self.wait_ready(timeout_ms)? {
            Ok(())
        } else {
            Err(Error::Timeout { op, page })
        }
    }
}
