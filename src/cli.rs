//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let v = parse_hex_u32(s)?;
    u16::try_from(v).map_err(|_| format!("Value out of range: {}", s))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let v = parse_hex_u32(s)?;
    u8::try_from(v).map_err(|_| format!("Value out of range: {}", s))
}

const PROGRAMMER_HELP: &str =
    "Programmer to use, with options after a colon (e.g. dummy, linux_spi:dev=/dev/spidev0.0)";

#[derive(Parser)]
#[command(name = "spinand")]
#[command(author, version, about = "W25N02KV SPI NAND tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Driver configuration file (TOML: timeouts, quad_load, read_command)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Page location shared by the page commands
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Block index (0-2047)
    #[arg(short, long, value_parser = parse_hex_u16)]
    pub block: u16,

    /// Page within the block (0-63)
    #[arg(long, default_value = "0", value_parser = parse_hex_u8)]
    pub page: u8,

    /// Starting column in the 2176-byte cache register (spare area at 2048)
    #[arg(long, default_value = "0", value_parser = parse_hex_u16)]
    pub column: u16,
}

/// Where program/verify data comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct DataSource {
    /// Named data pattern (see list-patterns)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Input file
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the JEDEC ID and report the device
    Probe {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Decode the three status registers
    Status {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Issue a device reset (FFh), or a software reset (66h 99h)
    Reset {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Use the software reset sequence
        #[arg(long)]
        software: bool,
    },

    /// Erase one or more blocks
    Erase {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// First block to erase
        #[arg(short, long, value_parser = parse_hex_u16)]
        block: u16,

        /// Number of consecutive blocks
        #[arg(long, default_value = "1", value_parser = parse_hex_u16)]
        count: u16,

        /// Scan the factory markers first; skip bad blocks and retire failing ones
        #[arg(long)]
        skip_bad: bool,
    },

    /// Program data into consecutive pages of one block
    Program {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        #[command(flatten)]
        at: PageArgs,

        #[command(flatten)]
        source: DataSource,

        /// Bytes to generate when using --pattern
        #[arg(long, default_value = "2048", value_parser = parse_hex_u32)]
        length: u32,

        /// Read back and compare after programming
        #[arg(long)]
        verify: bool,

        /// Scan the factory markers first; refuse bad blocks and retire failing ones
        #[arg(long)]
        skip_bad: bool,
    },

    /// Read bytes from one or more pages
    Read {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        #[command(flatten)]
        at: PageArgs,

        /// Bytes to read from each page
        #[arg(long, default_value = "2048", value_parser = parse_hex_u32)]
        length: u32,

        /// Number of consecutive pages
        #[arg(long, default_value = "1", value_parser = parse_hex_u8)]
        pages: u8,

        /// Output file (hex dump to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare page contents against a pattern or file
    Verify {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        #[command(flatten)]
        at: PageArgs,

        #[command(flatten)]
        source: DataSource,

        /// Bytes to generate when using --pattern
        #[arg(long, default_value = "2048", value_parser = parse_hex_u32)]
        length: u32,
    },

    /// Block protection and configuration register operations
    #[command(subcommand)]
    Protect(ProtectCommands),

    /// One-time-programmable page operations
    #[command(subcommand)]
    Otp(OtpCommands),

    /// Bad-block table operations
    #[command(subcommand)]
    Bbt(BbtCommands),

    /// List supported programmers
    ListProgrammers,

    /// List the named data patterns
    ListPatterns,
}

/// Protection and configuration subcommands
#[derive(Subcommand)]
pub enum ProtectCommands {
    /// Show protection and configuration state
    Status {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Clear all block protect bits
    Unlock {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Set the block protect range
    Range {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// BP[3:0] value (0-15)
        #[arg(long, value_parser = parse_hex_u8)]
        bp: u8,

        /// Protect from the bottom of the array (TB=1)
        #[arg(long)]
        bottom: bool,
    },

    /// Change configuration register settings
    Config {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// On-chip ECC
        #[arg(long)]
        ecc: Option<bool>,

        /// Buffer read mode
        #[arg(long)]
        buffer: Option<bool>,

        /// Output drive strength (0-3)
        #[arg(long, value_parser = parse_hex_u8)]
        drive: Option<u8>,

        /// Ignore the /HOLD pin
        #[arg(long)]
        hold_disable: Option<bool>,

        /// Let /WP gate status register writes
        #[arg(long)]
        wp_enable: Option<bool>,
    },

    /// Permanently lock SR1 (irreversible)
    LockSr1 {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Required acknowledgement that the lock cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

/// OTP subcommands
#[derive(Subcommand)]
pub enum OtpCommands {
    /// Read an OTP page (0-11)
    Read {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// OTP page
        #[arg(long, value_parser = parse_hex_u8)]
        page: u8,

        /// Bytes to read
        #[arg(long, default_value = "256", value_parser = parse_hex_u32)]
        length: u32,

        /// Output file (hex dump to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Program a user OTP page (2-11)
    Program {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// OTP page
        #[arg(long, value_parser = parse_hex_u8)]
        page: u8,

        /// Starting column
        #[arg(long, default_value = "0", value_parser = parse_hex_u16)]
        column: u16,

        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Permanently lock the OTP area (irreversible)
    Lock {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Required acknowledgement that the lock cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

/// Bad-block table subcommands
///
/// The table lives in memory, so every subcommand starts from a fresh
/// factory scan.
#[derive(Subcommand)]
pub enum BbtCommands {
    /// Scan factory markers and print a summary
    Scan {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Print the summary as TOML
        #[arg(long)]
        toml: bool,
    },

    /// List bad blocks
    List {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Print the first usable block
    First {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,
    },

    /// Retire a block by writing its bad-block marker
    Mark {
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Block to retire
        #[arg(short, long, value_parser = parse_hex_u16)]
        block: u16,
    },
}
