//! High-level NAND operations
//!
//! This module provides the erase/program/read orchestrators. Each one is a
//! short state machine (write enable, command, busy-poll, status check) run
//! on a [`NandDevice`], which owns the transport and the tick source so a
//! multi-command sequence can never be interleaved with another one.
//!
//! The orchestrators do not consult the bad-block table; see [`crate::bbt`].

mod device;
mod geometry;
mod operations;
mod state;

pub use device::NandDevice;
pub use geometry::*;
pub use operations::ProgramSegment;
pub use state::{OpRecord, OpState};
