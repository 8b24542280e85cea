//! Endian aware conversion between mesh integer newtypes and their wire bytes.
//! Network, transport and nonce fields are Big Endian. Access layer parameters are Little Endian.
use core::convert::TryInto;

pub trait ToFromBytesEndian: Sized {
    type AsBytesType: AsRef<[u8]>;

    #[must_use]
    fn byte_size() -> usize {
        core::mem::size_of::<Self::AsBytesType>()
    }

    #[must_use]
    fn to_bytes_le(&self) -> Self::AsBytesType;

    #[must_use]
    fn to_bytes_be(&self) -> Self::AsBytesType;

    #[must_use]
    fn from_bytes_le(bytes: &[u8]) -> Option<Self>;

    #[must_use]
    fn from_bytes_be(bytes: &[u8]) -> Option<Self>;
}
/// Implement ToFromBytesEndian for the primitive integers (see beneath)
macro_rules! implement_to_from_bytes {
    ( $( $t:ty ), *) => {
        $(
            impl ToFromBytesEndian for $t {
                type AsBytesType = [u8; core::mem::size_of::<Self>()];

                #[must_use]
                fn byte_size() -> usize {
                    core::mem::size_of::<Self>()
                }

                #[must_use]
                fn to_bytes_le(&self) -> Self::AsBytesType {
                    self.to_le_bytes()
                }

                #[must_use]
                fn to_bytes_be(&self) -> Self::AsBytesType {
                    self.to_be_bytes()
                }

                #[must_use]
                fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
                    Some(Self::from_le_bytes(bytes.try_into().ok()?))
                }

                #[must_use]
                fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
                    Some(Self::from_be_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    }
}
implement_to_from_bytes!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Parses a hex string (no `0x` prefix, even length) into bytes.
/// Returns `None` on odd length or non-hex characters.
#[must_use]
pub fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = char::from(pair[0]).to_digit(16)?;
            let low = char::from(pair[1]).to_digit(16)?;
            Some(((high << 4) | low) as u8)
        })
        .collect()
}

/// Lower case hex representation of `bytes`.
#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_endian() {
        assert_eq!(0x1234_u16.to_bytes_be(), [0x12, 0x34]);
        assert_eq!(0x1234_u16.to_bytes_le(), [0x34, 0x12]);
        assert_eq!(u32::from_bytes_be(&[0, 0, 1, 0]), Some(256));
        assert_eq!(u32::from_bytes_be(&[0, 1, 0]), None);
    }
    #[test]
    fn test_hex() {
        assert_eq!(hex_to_bytes("00ff10"), Some(vec![0x00, 0xFF, 0x10]));
        assert_eq!(hex_to_bytes("0"), None);
        assert_eq!(hex_to_bytes("zz"), None);
        assert_eq!(bytes_to_hex(&[0xAB, 0x01]), "ab01");
    }
}
