//! Programmer traits and abstractions
//!
//! This module defines the traits a transport must implement to talk to the
//! NAND device, and the millisecond tick source the busy-poll runs on.

mod clock;
mod traits;

pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use traits::*;
