//! Error types for spinand-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::status::StatusRegister;

/// Which device operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Block erase
    Erase,
    /// Page program
    Program,
    /// Page read
    Read,
    /// Device or software reset
    Reset,
    /// OTP page read
    OtpRead,
    /// OTP page program
    OtpProgram,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Erase => "erase",
            Self::Program => "program",
            Self::Read => "read",
            Self::Reset => "reset",
            Self::OtpRead => "OTP read",
            Self::OtpProgram => "OTP program",
        };
        f.write_str(name)
    }
}

/// Device-reported failure of a mutating command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFailure {
    /// SR3.E-FAIL was set after a block erase
    Erase {
        /// Block that failed to erase
        block: u16,
    },
    /// SR3.P-FAIL was set after a program execute
    Program {
        /// Linear page index that failed to program
        page: u32,
    },
}

impl OpFailure {
    /// Block the failure happened in
    pub fn block(&self) -> u16 {
        match self {
            Self::Erase { block } => *block,
            Self::Program { page } => (*page / crate::flash::PAGES_PER_BLOCK as u32) as u16,
        }
    }
}

/// Argument rejected before anything was sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidArgument {
    /// Block index beyond the array
    Block(u32),
    /// Page index within a block beyond 63
    Page(u32),
    /// Column/length window does not fit the cache register
    Column {
        /// Starting column
        column: u16,
        /// Requested length in bytes
        len: usize,
    },
    /// Output drive strength above 3
    DriveStrength(u8),
    /// Block protect value above 15
    BlockProtect(u8),
    /// OTP page outside the accessible/programmable range
    OtpPage(u8),
    /// Block belongs to the factory reserved ranges
    ReservedBlock(u16),
    /// Computed register value would clear a one-time lock bit
    LockBitClear(StatusRegister),
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(b) => write!(f, "block {} out of range", b),
            Self::Page(p) => write!(f, "page {} out of range", p),
            Self::Column { column, len } => write!(
                f,
                "column window {}+{} exceeds the cache register",
                column, len
            ),
            Self::DriveStrength(v) => write!(f, "output drive strength {} (must be 0-3)", v),
            Self::BlockProtect(v) => write!(f, "block protect value {} (must be 0-15)", v),
            Self::OtpPage(p) => write!(f, "OTP page 0x{:02X} not accessible", p),
            Self::ReservedBlock(b) => write!(f, "block {} is factory reserved", b),
            Self::LockBitClear(reg) => {
                write!(f, "refusing to clear a lock bit in {}", reg)
            }
        }
    }
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// SPI transfer failed
    SpiTransferFailed,
    /// Transaction exceeds what the transport can frame in one go
    TransferTooLarge,
    /// Opcode not supported by this transport
    OpcodeNotSupported,

    // Device errors
    /// Busy did not clear within the allotted time
    Timeout {
        /// Operation that was being polled
        op: Operation,
        /// Linear page index the operation addressed
        page: u32,
    },
    /// Device reported erase or program failure
    OperationFailed(OpFailure),
    /// ECC reported more errors than it could correct
    UncorrectableData {
        /// Linear page index
        page: u32,
        /// Column the read started at
        column: u16,
    },
    /// Read-back of a configuration register does not match the written bits
    VerificationMismatch {
        /// Register that was written
        register: StatusRegister,
        /// Bits that were supposed to change
        mask: u8,
        /// Intended value of the masked bits
        expected: u8,
        /// Observed value of the masked bits
        actual: u8,
    },
    /// Write-enable latch did not set after WREN
    WriteEnableFailed,
    /// Write-enable latch did not clear after WRDI
    WriteDisableFailed,
    /// Device returned an identification other than W25N02KV
    UnexpectedId {
        /// The three bytes read after opcode 0x9F
        id: [u8; 3],
    },
    /// OTP area is locked
    OtpLocked,

    // Data errors
    /// Page contents differ from the expected buffer
    DataMismatch {
        /// Offset of the first differing byte, relative to the start column
        offset: usize,
        /// Byte that was expected
        expected: u8,
        /// Byte that was read
        actual: u8,
    },

    // Table errors
    /// Block is marked bad in the bad-block table
    BadBlock {
        /// The refused block
        block: u16,
    },

    /// Argument rejected before issuing any command
    InvalidArgument(InvalidArgument),
}

impl Error {
    /// Returns the device-reported failure, if this is one
    pub fn operation_failure(&self) -> Option<OpFailure> {
        match self {
            Self::OperationFailed(failure) => Some(*failure),
            _ => None,
        }
    }
}

impl From<InvalidArgument> for Error {
    fn from(e: InvalidArgument) -> Self {
        Self::InvalidArgument(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::TransferTooLarge => write!(f, "transfer too large for the transport"),
            Self::OpcodeNotSupported => write!(f, "opcode not supported"),
            Self::Timeout { op, page } => {
                write!(f, "{} timed out waiting for ready (page 0x{:05X})", op, page)
            }
            Self::OperationFailed(OpFailure::Erase { block }) => {
                write!(f, "erase failed on block {}", block)
            }
            Self::OperationFailed(OpFailure::Program { page }) => {
                write!(f, "program failed on page 0x{:05X}", page)
            }
            Self::UncorrectableData { page, column } => write!(
                f,
                "uncorrectable ECC error reading page 0x{:05X} column {}",
                page, column
            ),
            Self::VerificationMismatch {
                register,
                mask,
                expected,
                actual,
            } => write!(
                f,
                "{} verify failed: mask 0x{:02X} expected 0x{:02X}, read 0x{:02X}",
                register, mask, expected, actual
            ),
            Self::WriteEnableFailed => write!(f, "write enable latch did not set"),
            Self::WriteDisableFailed => write!(f, "write enable latch did not clear"),
            Self::UnexpectedId { id } => write!(
                f,
                "unexpected JEDEC ID {:02X} {:02X} {:02X}",
                id[0], id[1], id[2]
            ),
            Self::OtpLocked => write!(f, "OTP area is locked"),
            Self::DataMismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "data mismatch at offset {}: expected 0x{:02X}, read 0x{:02X}",
                offset, expected, actual
            ),
            Self::BadBlock { block } => write!(f, "block {} is marked bad", block),
            Self::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
