//! Address width types

/// Address width for SPI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// Single byte - status register address
    OneByte,
    /// 2-byte column address into the cache register
    TwoByte,
    /// 3-byte page (row) address into the array
    ThreeByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::OneByte => 1,
            Self::TwoByte => 2,
            Self::ThreeByte => 3,
        }
    }

    /// Encode an address into bytes, most significant first
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        match self {
            Self::None => {}
            Self::OneByte => {
                buf[0] = address as u8;
            }
            Self::TwoByte => {
                buf[0] = (address >> 8) as u8;
                buf[1] = address as u8;
            }
            Self::ThreeByte => {
                buf[0] = (address >> 16) as u8;
                buf[1] = (address >> 8) as u8;
                buf[2] = address as u8;
            }
        }
    }

    /// Decode an address from bytes, the inverse of [`encode`](Self::encode)
    pub fn decode(&self, buf: &[u8]) -> u32 {
        buf.iter()
            .take(self.bytes() as usize)
            .fold(0u32, |acc, b| (acc << 8) | *b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_address_is_big_endian() {
        let mut buf = [0u8; 3];
        AddressWidth::ThreeByte.encode(50 * 64 + 3, &mut buf);
        assert_eq!(buf, [0x00, 0x0C, 0x83]);
        assert_eq!(AddressWidth::ThreeByte.decode(&buf), 50 * 64 + 3);
    }

    #[test]
    fn test_column_address() {
        let mut buf = [0u8; 2];
        AddressWidth::TwoByte.encode(2048, &mut buf);
        assert_eq!(buf, [0x08, 0x00]);
    }
}
