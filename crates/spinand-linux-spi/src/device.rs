//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the `SpiMaster`
//! trait using Linux's spidev interface.

use crate::error::{LinuxSpiError, Result};

use spinand_core::error::{Error as CoreError, Result as CoreResult};
use spinand_core::programmer::{SpiFeatures, SpiMaster};
use spinand_core::spi::{check_io_mode_supported, IoMode, SpiCommand};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default SPI clock speed in Hz (2 MHz)
const DEFAULT_SPEED_HZ: u32 = 2_000_000;

/// Longest W25N header: opcode, two column bytes and one dummy byte
const MAX_HEADER_LEN: usize = 4;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;

    /// Controller may drive four lines on transmit
    pub const SPI_TX_QUAD: u32 = 0x200;
    /// Controller may sample four lines on receive
    pub const SPI_RX_QUAD: u32 = 0x800;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    const SPI_IOC_MAGIC: u8 = b'k';

    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;
    const SPI_IOC_TYPE_MODE32: u8 = 5;

    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );
    ioctl_write_ptr!(spi_ioc_wr_mode32, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE32, u32);

    /// Size of struct spi_ioc_transfer
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,
    rx_buf: u64,
    len: u32,
    speed_hz: u32,
    delay_usecs: u16,
    bits_per_word: u8,
    cs_change: u8,
    tx_nbits: u8,
    rx_nbits: u8,
    word_delay_usecs: u8,
    _pad: u8,
}

impl SpiIocTransfer {
    fn tx(buf: &[u8], speed_hz: u32, nbits: u8) -> Self {
        Self {
            tx_buf: buf.as_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: 8,
            tx_nbits: nbits,
            ..Default::default()
        }
    }

    fn rx(buf: &mut [u8], speed_hz: u32, nbits: u8) -> Self {
        Self {
            rx_buf: buf.as_mut_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: 8,
            rx_nbits: nbits,
            ..Default::default()
        }
    }
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 2 MHz)
    pub speed_hz: u32,
    /// SPI mode, 0 or 3 for W25N parts (default: 0)
    pub mode: u8,
    /// Request a four-line data phase from the controller
    pub quad: bool,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            quad: false,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Enable the quad data phase
    pub fn with_quad(mut self, quad: bool) -> Self {
        self.quad = quad;
        self
    }

    fn mode_word(&self) -> u32 {
        let mut word = self.mode as u32;
        if self.quad {
            word |= mode::SPI_TX_QUAD | mode::SPI_RX_QUAD;
        }
        word
    }
}

/// Linux SPI programmer using spidev interface
///
/// Each [`SpiCommand`] becomes one `SPI_IOC_MESSAGE` with chip select held
/// across its segments: the single-line header first, then the data phase
/// on one or four lines.
pub struct LinuxSpi {
    file: File,
    max_kernel_buf_size: usize,
    speed_hz: u32,
    quad: bool,
}

impl LinuxSpi {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = config.mode_word();
        unsafe {
            ioctl::spi_ioc_wr_mode32(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, quad={})",
            config.device,
            config.mode,
            speed / 1000,
            config.quad
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            max_kernel_buf_size,
            speed_hz: speed,
            quad: config.quad,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    fn message(&mut self, transfers: &[SpiIocTransfer]) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let ioctl_num = ioctl::spi_ioc_message(transfers.len() as u8);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, transfers.as_ptr()) };
        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }
        Ok(())
    }
}

/// Split a command into ioctl segments
///
/// `header` must already hold the encoded opcode, address and dummy bytes and
/// outlive the returned transfers.
fn frame(header: &[u8], cmd: &mut SpiCommand<'_>, speed_hz: u32) -> Vec<SpiIocTransfer> {
    let nbits = cmd.io_mode.data_lines();
    let mut transfers = vec![SpiIocTransfer::tx(header, speed_hz, 1)];
    if !cmd.write_data.is_empty() {
        transfers.push(SpiIocTransfer::tx(cmd.write_data, speed_hz, nbits));
    }
    if !cmd.read_buf.is_empty() {
        transfers.push(SpiIocTransfer::rx(cmd.read_buf, speed_hz, nbits));
    }
    transfers
}

impl SpiMaster for LinuxSpi {
    fn features(&self) -> SpiFeatures {
        if self.quad {
            SpiFeatures::QUAD
        } else {
            SpiFeatures::empty()
        }
    }

    fn max_read_len(&self) -> usize {
        self.max_kernel_buf_size.saturating_sub(MAX_HEADER_LEN)
    }

    fn max_write_len(&self) -> usize {
        self.max_kernel_buf_size.saturating_sub(MAX_HEADER_LEN)
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> CoreResult<()> {
        check_io_mode_supported(cmd.io_mode, self.features())?;
        if cmd.total_bytes() > self.max_kernel_buf_size {
            return Err(CoreError::TransferTooLarge);
        }

        let mut header = vec![0u8; cmd.header_len()];
        cmd.encode_header(&mut header);

        let transfers = frame(&header, cmd, self.speed_hz);
        self.message(&transfers).map_err(|e| {
            log::error!("linux_spi: opcode {:#04x}: {}", cmd.opcode, e);
            CoreError::SpiTransferFailed
        })
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "yes" | "on" | "true" => Ok(true),
        "0" | "no" | "off" | "false" => Ok(false),
        _ => Err(LinuxSpiError::InvalidParameter(format!(
            "{}={} (expected yes or no)",
            key, value
        ))),
    }
}

/// Parse programmer options from a list of key-value pairs
///
/// Recognised keys are `dev`, `spispeed` (kHz), `mode` (0 or 3) and `quad`.
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxSpiConfig> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                let speed_khz: u32 = value.parse().map_err(|_| {
                    LinuxSpiError::InvalidParameter(format!("spispeed={}", value))
                })?;
                config.speed_hz = speed_khz * 1000;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| LinuxSpiError::InvalidParameter(format!("mode={}", value)))?;
                // W25N parts latch on the rising edge in modes 0 and 3 only
                if mode != mode::MODE_0 && mode != mode::MODE_3 {
                    return Err(LinuxSpiError::InvalidParameter(format!(
                        "SPI mode {} (must be 0 or 3)",
                        mode
                    )));
                }
                config.mode = mode;
            }
            "quad" => {
                config.quad = parse_bool(key, value)?;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err(LinuxSpiError::NoDevice);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinand_core::spi::opcodes;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("dev", "/dev/spidev1.0"),
            ("spispeed", "20000"),
            ("mode", "3"),
            ("quad", "yes"),
        ])
        .unwrap();
        assert_eq!(config.device, "/dev/spidev1.0");
        assert_eq!(config.speed_hz, 20_000_000);
        assert_eq!(config.mode, 3);
        assert!(config.quad);
        assert_eq!(config.mode_word(), 3 | 0x200 | 0x800);
    }

    #[test]
    fn test_parse_options_rejects_bad_values() {
        assert!(matches!(
            parse_options(&[]),
            Err(LinuxSpiError::NoDevice)
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("mode", "1")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("quad", "maybe")]),
            Err(LinuxSpiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_message_ioctl_number() {
        // _IOW('k', 0, char[64]) for two transfers
        assert_eq!(ioctl::spi_ioc_message(2), 0x4040_6B00);
        assert_eq!(core::mem::size_of::<SpiIocTransfer>(), 32);
    }

    #[test]
    fn test_quad_read_framing() {
        let mut buf = [0u8; 16];
        let mut cmd = SpiCommand::column_read(opcodes::FAST_READ_QUAD, 0x0100, &mut buf)
            .with_io_mode(IoMode::QuadOut)
            .with_dummy_cycles(8);
        let mut header = vec![0u8; cmd.header_len()];
        cmd.encode_header(&mut header);
        assert_eq!(header, [opcodes::FAST_READ_QUAD, 0x01, 0x00, 0x00]);

        let transfers = frame(&header, &mut cmd, 1_000_000);
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].len, 4);
        assert_eq!(transfers[0].tx_nbits, 1);
        assert_eq!(transfers[1].len, 16);
        assert_eq!(transfers[1].rx_nbits, 4);
        assert_eq!(transfers[1].tx_buf, 0);
    }

    #[test]
    fn test_simple_command_is_one_segment() {
        let mut cmd = SpiCommand::simple(opcodes::WREN);
        let header = [opcodes::WREN];
        let transfers = frame(&header, &mut cmd, 1_000_000);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].len, 1);
    }
}
