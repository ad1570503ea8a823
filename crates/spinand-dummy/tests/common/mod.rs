#![allow(dead_code)]

use spinand_core::config::NandConfig;
use spinand_core::flash::NandDevice;
use spinand_dummy::{DummyConfig, DummyNand, SimClock};

pub type TestNand = NandDevice<DummyNand, SimClock>;

/// Emulated device and driver sharing one simulated clock
pub fn device() -> TestNand {
    device_with(DummyConfig::default(), NandConfig::default())
}

pub fn device_with(dummy: DummyConfig, config: NandConfig) -> TestNand {
    let clock = SimClock::new();
    NandDevice::with_config(DummyNand::new(dummy, clock.clone()), clock, config)
}
