//! Protocol implementations
//!
//! This module contains the raw W25N command sequences. Nothing here checks
//! status bits or sequences commands into operations; that is the job of the
//! `wp` and `flash` modules.

mod w25n;

pub use w25n::*;
