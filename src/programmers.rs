//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion, and opens the selected one as a [`Nand`].

use spinand_core::config::NandConfig;
use spinand_core::flash::NandDevice;
use spinand_core::programmer::{Clock, SpiMaster};

/// Device handle the commands operate on, whatever the transport
pub type Nand = NandDevice<Box<dyn SpiMaster + Send>, Box<dyn Clock + Send>>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory W25N02KV emulator (bad=<b>[+<b>...],quad=<yes|no>)",
    });

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0|3>,quad=<yes|no>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Resolve a name or alias to the canonical programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Open the programmer named in `programmer` and wrap it in a device handle
///
/// The programmer string can be just the name (e.g., "dummy") or include
/// parameters (e.g., "linux_spi:dev=/dev/spidev0.0,spispeed=20000").
pub fn open_nand(programmer: &str, config: NandConfig) -> Result<Nand, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    let (master, clock): (Box<dyn SpiMaster + Send>, Box<dyn Clock + Send>) = match canonical_name
    {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options)?,

        #[cfg(feature = "linux-spi")]
        "linux_spi" => {
            log::info!("Opening Linux SPI programmer...");
            let master = spinand_linux_spi::open_linux_spi(&options).map_err(|e| {
                format!(
                    "Failed to open Linux SPI device: {}\n\
                     Make sure the device exists and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG spi $USER",
                    e
                )
            })?;
            (master, Box::new(spinand_core::programmer::StdClock::new()))
        }

        _ => return Err(unknown_programmer_error(name)),
    };

    Ok(NandDevice::with_config(master, clock, config))
}

#[cfg(feature = "dummy")]
fn open_dummy(
    options: &[(&str, &str)],
) -> Result<(Box<dyn SpiMaster + Send>, Box<dyn Clock + Send>), Box<dyn std::error::Error>> {
    use spinand_dummy::{DummyConfig, DummyNand, SimClock};

    let mut config = DummyConfig::default();
    let mut bad = Vec::new();

    for (key, value) in options {
        match *key {
            "bad" => {
                for b in value.split('+').filter(|s| !s.is_empty()) {
                    let block: u16 = b
                        .parse()
                        .map_err(|_| format!("Invalid dummy bad block: {}", b))?;
                    bad.push(block);
                }
            }
            "quad" => {
                config.quad = match *value {
                    "yes" | "on" | "1" => true,
                    "no" | "off" | "0" => false,
                    _ => return Err(format!("Invalid dummy quad value: {}", value).into()),
                };
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    let clock = SimClock::new();
    let mut nand = DummyNand::new(config, clock.clone());
    for block in bad {
        nand.mark_factory_bad(block);
    }
    log::info!("Using in-memory W25N02KV emulator");

    Ok((Box::new(nand), Box::new(clock)))
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'spinand list-programmers' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        assert_eq!(parse_programmer_string("dummy"), ("dummy", vec![]));
        assert_eq!(
            parse_programmer_string("linux_spi:dev=/dev/spidev0.0,spispeed=4000"),
            (
                "linux_spi",
                vec![("dev", "/dev/spidev0.0"), ("spispeed", "4000")]
            )
        );
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_options() {
        assert_eq!(find_programmer("emulator"), Some("dummy"));
        let mut nand = open_nand("dummy:bad=9+300", NandConfig::default()).unwrap();
        nand.probe().unwrap();

        let mut bbt = spinand_core::bbt::BbtManager::new();
        bbt.scan_factory_blocks(&mut nand).unwrap();
        assert_eq!(bbt.list_bad().as_slice(), &[9, 300]);
        assert!(open_nand("dummy:bad=x", NandConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_programmer() {
        assert!(open_nand("ch341a", NandConfig::default()).is_err());
    }
}
