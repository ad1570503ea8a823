//! W25N SPI NAND opcodes and register addresses
//!
//! Framings follow the W25N02KV datasheet. Array commands take a 3-byte
//! page address, cache commands a 2-byte column address.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - sets WEL, required before erase/program/status writes
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register, followed by the register address
pub const RDSR: u8 = 0x05;
/// Write Status Register, followed by the register address and value
pub const WRSR: u8 = 0x01;

/// Protection register (SR1)
pub const SR1_ADDR: u8 = 0xA0;
/// Configuration register (SR2)
pub const SR2_ADDR: u8 = 0xB0;
/// Status register (SR3)
pub const SR3_ADDR: u8 = 0xC0;

// ============================================================================
// Identification and reset
// ============================================================================

/// Read JEDEC ID, one dummy byte then manufacturer + 2-byte device ID
pub const RDID: u8 = 0x9F;
/// Device Reset
pub const RESET: u8 = 0xFF;
/// Enable Reset (first half of the software reset sequence)
pub const RSTEN: u8 = 0x66;
/// Reset Device (second half of the software reset sequence)
pub const RST: u8 = 0x99;

// ============================================================================
// Erase
// ============================================================================

/// 128 KiB Block Erase, 3-byte page address
pub const BLOCK_ERASE: u8 = 0xD8;

// ============================================================================
// Program
// ============================================================================

/// Load Program Data - resets the cache to 0xFF, then loads at column
pub const PROGRAM_LOAD: u8 = 0x02;
/// Random Load Program Data - loads at column, keeps the rest of the cache
pub const PROGRAM_LOAD_RANDOM: u8 = 0x84;
/// Quad Load Program Data (1-1-4)
pub const PROGRAM_LOAD_QUAD: u8 = 0x32;
/// Quad Random Load Program Data (1-1-4)
pub const PROGRAM_LOAD_RANDOM_QUAD: u8 = 0x34;
/// Program Execute - commits the cache to the page at the 3-byte address
pub const PROGRAM_EXECUTE: u8 = 0x10;

// ============================================================================
// Read
// ============================================================================

/// Page Data Read - array to cache transfer, 3-byte page address
pub const PAGE_DATA_READ: u8 = 0x13;
/// Read Data - 2-byte column, one dummy byte
pub const READ: u8 = 0x03;
/// Fast Read - 2-byte column, one dummy byte
pub const FAST_READ: u8 = 0x0B;
/// Fast Read Quad Output (1-1-4) - 2-byte column, one dummy byte
pub const FAST_READ_QUAD: u8 = 0x6B;

// ============================================================================
// Identification values
// ============================================================================

/// Winbond manufacturer ID
pub const MFR_WINBOND: u8 = 0xEF;
/// W25N02KV device ID
pub const DEVICE_W25N02KV: u16 = 0xAA22;
