//! CLI command implementations
//!
//! Every command receives an opened [`Nand`](crate::programmers::Nand) and
//! reports through stdout; diagnostics go through `log`.

pub mod bbt;
pub mod device;
pub mod erase;
mod list;
pub mod otp;
pub mod program;
pub mod protect;
pub mod read;
pub mod verify;

pub use list::{list_patterns, list_programmers};

use crate::cli::DataSource;
use spinand_core::pattern::Pattern;
use std::error::Error;

/// Resolve `--pattern`/`--input` into the bytes to program or compare
pub fn load_data(source: &DataSource, length: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    if let Some(name) = &source.pattern {
        let pattern = Pattern::from_name(name).ok_or_else(|| {
            format!(
                "Unknown pattern '{}'. Use 'spinand list-patterns' to see the presets",
                name
            )
        })?;
        let mut data = vec![0u8; length as usize];
        pattern.fill(&mut data);
        log::debug!("Generated {} bytes of pattern {}", data.len(), pattern);
        return Ok(data);
    }

    match &source.input {
        Some(path) => {
            let data = std::fs::read(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            if data.is_empty() {
                return Err(format!("{} is empty", path.display()).into());
            }
            Ok(data)
        }
        None => Err("Either --pattern or --input is required".into()),
    }
}

/// Print `data` as a 16-byte-per-line hex dump starting at `base`
pub fn hex_dump(base: usize, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("{:04X}: {:<47}  {}", base + i * 16, hex.join(" "), ascii);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_pattern() {
        let source = DataSource {
            pattern: Some("SEQ-AA55FF00".into()),
            input: None,
        };
        let data = load_data(&source, 6).unwrap();
        assert_eq!(data, [0xAA, 0x55, 0xFF, 0x00, 0xAA, 0x55]);
    }

    #[test]
    fn test_unknown_pattern() {
        let source = DataSource {
            pattern: Some("zebra".into()),
            input: None,
        };
        assert!(load_data(&source, 16).is_err());
    }
}
