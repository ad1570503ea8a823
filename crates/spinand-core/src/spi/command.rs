//! SPI command structure

use super::{AddressWidth, IoMode};

/// A single SPI transaction
///
/// Designed to avoid allocation - uses slices for data.
/// The lifetime parameter `'a` ties the command to the buffers it references.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// I/O mode
    pub io_mode: IoMode,

    /// Number of dummy cycles after address
    pub dummy_cycles: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN, RESET)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a status register read: opcode, register address, data
    pub fn read_reg(opcode: u8, reg: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(reg as u32),
            address_width: AddressWidth::OneByte,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a status register write: opcode, register address, value
    pub fn write_reg(opcode: u8, reg: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(reg as u32),
            address_width: AddressWidth::OneByte,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an identification read: opcode, one dummy byte, data
    pub fn read_id(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            io_mode: IoMode::Single,
            dummy_cycles: 8,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create an array command with a 3-byte page address and no data
    /// (block erase, program execute, page data read)
    pub fn page(opcode: u8, page: u32) -> Self {
        Self {
            opcode,
            address: Some(page),
            address_width: AddressWidth::ThreeByte,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a cache load: opcode, 2-byte column, data
    pub fn column_write(opcode: u8, column: u16, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(column as u32),
            address_width: AddressWidth::TwoByte,
            io_mode: IoMode::Single,
            dummy_cycles: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create a cache read: opcode, 2-byte column, one dummy byte, data
    pub fn column_read(opcode: u8, column: u16, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(column as u32),
            address_width: AddressWidth::TwoByte,
            io_mode: IoMode::Single,
            dummy_cycles: 8,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Set the I/O mode for this command
    pub fn with_io_mode(mut self, mode: IoMode) -> Self {
        self.io_mode = mode;
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Returns true if this command has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Number of bytes before the data phase: opcode, address and dummy bytes
    ///
    /// Dummy cycles are clocked on a single line, so eight cycles are one byte.
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + (self.dummy_cycles as usize).div_ceil(8)
    }

    /// Encode opcode, address and dummy bytes into the start of `buf`
    ///
    /// `buf` must be at least [`header_len`](Self::header_len) bytes long.
    /// Dummy bytes are sent as 0x00.
    pub fn encode_header(&self, buf: &mut [u8]) {
        buf[0] = self.opcode;
        let addr_len = self.address_width.bytes() as usize;
        self.address_width
            .encode(self.address.unwrap_or(0), &mut buf[1..1 + addr_len]);
        for b in &mut buf[1 + addr_len..self.header_len()] {
            *b = 0;
        }
    }

    /// Calculate the total number of bytes to transfer (for timing/buffer allocation)
    pub fn total_bytes(&self) -> usize {
        self.header_len() + self.write_data.len() + self.read_buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    #[test]
    fn test_erase_framing() {
        let cmd = SpiCommand::page(opcodes::BLOCK_ERASE, 50 * 64);
        let mut buf = [0xAAu8; 4];
        assert_eq!(cmd.header_len(), 4);
        cmd.encode_header(&mut buf);
        assert_eq!(buf, [0xD8, 0x00, 0x0C, 0x80]);
        assert!(!cmd.has_read() && !cmd.has_write());
    }

    #[test]
    fn test_read_data_framing_has_dummy_byte() {
        let mut data = [0u8; 16];
        let cmd = SpiCommand::column_read(opcodes::READ, 2048, &mut data);
        let mut buf = [0xAAu8; 4];
        assert_eq!(cmd.header_len(), 4);
        cmd.encode_header(&mut buf);
        assert_eq!(buf, [0x03, 0x08, 0x00, 0x00]);
        assert_eq!(cmd.total_bytes(), 20);
    }

    #[test]
    fn test_status_framing() {
        let mut sr = [0u8; 1];
        let cmd = SpiCommand::read_reg(opcodes::RDSR, opcodes::SR3_ADDR, &mut sr);
        let mut buf = [0u8; 2];
        cmd.encode_header(&mut buf);
        assert_eq!(buf, [0x05, 0xC0]);
    }

    #[test]
    fn test_jedec_framing() {
        let mut id = [0u8; 3];
        let cmd = SpiCommand::read_id(opcodes::RDID, &mut id);
        assert_eq!(cmd.header_len(), 2);
    }
}
