//! Per-operation state tracking

use crate::error::Operation;

/// Where an erase/program/read currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    /// Not started
    Idle,
    /// Setting and confirming the write-enable latch
    WriteEnabling,
    /// Array command (and any cache transfer) on the wire
    CommandIssued,
    /// Spinning on BUSY
    Polling,
    /// Checking fail bits or ECC
    Verifying,
    /// Completed successfully
    Done,
    /// Stopped on an error
    Failed,
}

/// Final state of the most recent operation on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    /// Which operation
    pub op: Operation,
    /// Linear page index it addressed
    pub page: u32,
    /// State it ended in
    pub state: OpState,
    /// State it was in when it failed, if it did
    pub failed_in: Option<OpState>,
}

pub(crate) struct OpTrace {
    op: Operation,
    page: u32,
    state: OpState,
    failed_in: Option<OpState>,
}

impl OpTrace {
    pub(crate) fn start(op: Operation, page: u32) -> Self {
        Self {
            op,
            page,
            state: OpState::Idle,
            failed_in: None,
        }
    }

    pub(crate) fn advance(&mut self, next: OpState) {
        log::trace!(
            "{} 0x{:05X}: {:?} -> {:?}",
            self.op,
            self.page,
            self.state,
            next
        );
        if next == OpState::Failed {
            self.failed_in = Some(self.state);
        }
        self.state = next;
    }

    pub(crate) fn record(&self) -> OpRecord {
        OpRecord {
            op: self.op,
            page: self.page,
            state: self.state,
            failed_in: self.failed_in,
        }
    }
}
