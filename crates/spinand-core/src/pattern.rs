//! Test data patterns for program/verify runs

use core::fmt;

/// Seed of the PRBS generator
pub const LFSR_SEED: u16 = 0xACE1;
/// Feedback taps of the PRBS generator (x^16 + x^14 + x^13 + x^11)
pub const LFSR_TAPS: u16 = 0xB400;

/// A byte pattern that can fill a buffer of any length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Every byte the same
    Fill(u8),
    /// Two bytes alternating, starting with the first
    Alternating(u8, u8),
    /// Four bytes repeated
    Sequence([u8; 4]),
    /// 16-bit Galois LFSR seeded with [`LFSR_SEED`], low byte of each state
    Lfsr,
}

impl Pattern {
    /// Named presets, in the order they are usually run
    pub const PRESETS: [(&'static str, Pattern); 7] = [
        ("aa", Pattern::Fill(0xAA)),
        ("55", Pattern::Fill(0x55)),
        ("ff", Pattern::Fill(0xFF)),
        ("00", Pattern::Fill(0x00)),
        ("alt-aa55", Pattern::Alternating(0xAA, 0x55)),
        ("seq-aa55ff00", Pattern::Sequence([0xAA, 0x55, 0xFF, 0x00])),
        ("prbs", Pattern::Lfsr),
    ];

    /// Look up a preset by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRESETS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| *p)
    }

    /// Fill `buf` from the start of the pattern
    pub fn fill(&self, buf: &mut [u8]) {
        match *self {
            Self::Fill(b) => buf.fill(b),
            Self::Alternating(a, b) => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = if i % 2 == 0 { a } else { b };
                }
            }
            Self::Sequence(seq) => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = seq[i % seq.len()];
                }
            }
            Self::Lfsr => {
                let mut lfsr = Lfsr::new();
                for byte in buf.iter_mut() {
                    *byte = lfsr.next_byte();
                }
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fill(b) => write!(f, "fill 0x{:02X}", b),
            Self::Alternating(a, b) => write!(f, "alternating 0x{:02X}/0x{:02X}", a, b),
            Self::Sequence(s) => write!(
                f,
                "sequence {:02X} {:02X} {:02X} {:02X}",
                s[0], s[1], s[2], s[3]
            ),
            Self::Lfsr => f.write_str("PRBS (LFSR 0xB400)"),
        }
    }
}

/// The PRBS generator behind [`Pattern::Lfsr`]
#[derive(Debug, Clone)]
pub struct Lfsr {
    state: u16,
}

impl Lfsr {
    /// Generator at [`LFSR_SEED`]
    pub const fn new() -> Self {
        Self { state: LFSR_SEED }
    }

    /// Step once and return the low byte of the new state
    pub fn next_byte(&mut self) -> u8 {
        let feedback = (self.state & 1).wrapping_neg() & LFSR_TAPS;
        self.state = (self.state >> 1) ^ feedback;
        self.state as u8
    }
}

impl Default for Lfsr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfsr_sequence() {
        let mut buf = [0u8; 6];
        Pattern::Lfsr.fill(&mut buf);
        assert_eq!(buf, [0x70, 0x38, 0x9C, 0x4E, 0x27, 0x13]);
    }

    #[test]
    fn test_sequence_and_alternating() {
        let mut buf = [0u8; 6];
        Pattern::from_name("SEQ-AA55FF00").unwrap().fill(&mut buf);
        assert_eq!(buf, [0xAA, 0x55, 0xFF, 0x00, 0xAA, 0x55]);

        Pattern::from_name("alt-aa55").unwrap().fill(&mut buf);
        assert_eq!(buf, [0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55]);
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(Pattern::from_name("checkerboard"), None);
        assert_eq!(Pattern::from_name("ff"), Some(Pattern::Fill(0xFF)));
    }
}
