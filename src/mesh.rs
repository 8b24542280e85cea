//! Small Mesh primitives shared by every layer (TTL, NID, IV Index, Sequence Numbers, Key Indexes).
use crate::bytes::ToFromBytesEndian;
use core::convert::TryFrom;
use core::fmt::{Display, Formatter};

/// Least significant bit of the IV Index, sent in the first octet of every network PDU.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct IVI(pub bool);
/// Network control flag. Set for Transport Control PDUs.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct CTL(pub bool);

/// 7 bit fields that share their octet with a 1 bit flag on the wire (`CTL|TTL`, `IVI|NID`).
macro_rules! seven_bit_field {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
        #[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
        pub struct $name(u8);
        impl $name {
            pub const MAX: u8 = 0x7F;
            /// # Panics
            /// Panics if `v > 127`.
            #[must_use]
            pub fn new(v: u8) -> Self {
                match Self::try_from(v) {
                    Ok(field) => field,
                    Err(_) => panic!("{} {} is bigger than {}", stringify!($name), v, Self::MAX),
                }
            }
            /// Drops the flag bit.
            #[must_use]
            pub const fn from_masked_u8(v: u8) -> Self {
                $name(v & Self::MAX)
            }
            #[must_use]
            pub const fn value(self) -> u8 {
                self.0
            }
            /// Octet with `flag` in the top bit.
            #[must_use]
            pub const fn with_flag(self, flag: bool) -> u8 {
                self.0 | ((flag as u8) << 7)
            }
            /// Splits an octet into the field and the flag in its top bit.
            #[must_use]
            pub const fn new_with_flag(v: u8) -> (Self, bool) {
                (Self::from_masked_u8(v), v & 0x80 != 0)
            }
        }
        impl TryFrom<u8> for $name {
            type Error = ();
            fn try_from(v: u8) -> Result<Self, ()> {
                if v <= Self::MAX {
                    Ok($name(v))
                } else {
                    Err(())
                }
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}
seven_bit_field!(
    /// Time To Live. `0` is never relayed, `1` is invalid on receive, `2..=127` may be relayed.
    TTL
);
seven_bit_field!(
    /// Network key identifier from `k2`. Not to be confused with the 64 bit network ID from `k3`.
    NID
);

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, Ord, PartialOrd, PartialEq, Debug, Default, Hash)]
pub struct IVIndex(pub u32);
impl IVIndex {
    #[must_use]
    pub fn ivi(self) -> IVI {
        IVI(self.0 & 1 == 1)
    }
    /// IV Index a received PDU was sent with. The current one if the IVI bit matches, else the
    /// previous one (the sender hasn't moved to the new IV Index yet).
    #[must_use]
    pub fn matching_ivi(self, ivi: IVI) -> Option<IVIndex> {
        if self.ivi() == ivi {
            Some(self)
        } else {
            self.0.checked_sub(1).map(IVIndex)
        }
    }
}
impl Display for IVIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "IVIndex({})", self.0)
    }
}

pub const SEQUENCE_NUMBER_MAX: u32 = (1 << 24) - 1;

/// 24 bit per-source sequence number. Together with the IV Index it makes every PDU's nonce
/// unique and drives replay protection.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, Ord, PartialOrd, PartialEq, Debug, Default, Hash)]
pub struct SequenceNumber(u32);
impl SequenceNumber {
    #[must_use]
    pub fn new(seq: u32) -> Option<SequenceNumber> {
        if seq > SEQUENCE_NUMBER_MAX {
            None
        } else {
            Some(SequenceNumber(seq))
        }
    }
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
    /// The following sequence number or `None` when the 24 bit space is exhausted (the IV Index
    /// has to be updated before sending again).
    #[must_use]
    pub fn next(self) -> Option<SequenceNumber> {
        SequenceNumber::new(self.0 + 1)
    }
}
impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "SequenceNumber({})", self.0)
    }
}

/// `ToFromBytesEndian` through the wrapped integer.
macro_rules! newtype_bytes {
    ($name:ident, $inner:ty, $len:expr) => {
        impl ToFromBytesEndian for $name {
            type AsBytesType = [u8; $len];

            fn to_bytes_le(&self) -> [u8; $len] {
                self.0.to_bytes_le()
            }

            fn to_bytes_be(&self) -> [u8; $len] {
                self.0.to_bytes_be()
            }

            fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
                <$inner>::from_bytes_le(bytes).map($name)
            }

            fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
                <$inner>::from_bytes_be(bytes).map($name)
            }
        }
    };
}
newtype_bytes!(IVIndex, u32, 4);
newtype_bytes!(CompanyID, u16, 2);

impl ToFromBytesEndian for SequenceNumber {
    type AsBytesType = [u8; 3];

    fn to_bytes_le(&self) -> [u8; 3] {
        let [b0, b1, b2, _] = self.0.to_le_bytes();
        [b0, b1, b2]
    }

    fn to_bytes_be(&self) -> [u8; 3] {
        let [_, b1, b2, b3] = self.0.to_be_bytes();
        [b1, b2, b3]
    }

    fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [b0, b1, b2] => Some(SequenceNumber(u32::from_le_bytes([b0, b1, b2, 0]))),
            _ => None,
        }
    }

    fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [b0, b1, b2] => Some(SequenceNumber(u32::from_be_bytes([0, b0, b1, b2]))),
            _ => None,
        }
    }
}

/// Bluetooth SIG assigned company identifier. Prefixes vendor opcodes and vendor model IDs.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct CompanyID(pub u16);

/// SIG (16-bit) or Vendor (company id + 16-bit) model identifier. Little Endian on the wire.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ModelID {
    SIG(u16),
    Vendor(CompanyID, u16),
}
impl ModelID {
    #[must_use]
    pub fn byte_len(self) -> usize {
        match self {
            ModelID::SIG(_) => 2,
            ModelID::Vendor(_, _) => 4,
        }
    }
}

const KEY_INDEX_MASK: u16 = 0x0FFF;

/// 12-bit global index of a `NetKey`.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct NetKeyIndex(pub u16);
/// 12-bit global index of an `AppKey`.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct AppKeyIndex(pub u16);
impl Display for NetKeyIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "NetKeyIndex({})", self.0)
    }
}
impl Display for AppKeyIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "AppKeyIndex({})", self.0)
    }
}
/// Two 12-bit key indexes packed into 3 octets (Little Endian) like the Config messages use.
#[must_use]
pub fn pack_key_indexes(first: u16, second: u16) -> [u8; 3] {
    let packed = u32::from(first & KEY_INDEX_MASK) | (u32::from(second & KEY_INDEX_MASK) << 12);
    let [b0, b1, b2, _] = packed.to_le_bytes();
    [b0, b1, b2]
}
/// Reverse of [`pack_key_indexes`].
#[must_use]
pub fn unpack_key_indexes(bytes: [u8; 3]) -> (u16, u16) {
    let packed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    let mask = u32::from(KEY_INDEX_MASK);
    ((packed & mask) as u16, ((packed >> 12) & mask) as u16)
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn test_ttl_out_of_range() {
        let _ = TTL::new(128);
    }
    #[test]
    fn test_ttl_flag() {
        assert_eq!(TTL::new(5).with_flag(true), 0x85);
        assert_eq!(TTL::new_with_flag(0x85), (TTL::new(5), true));
        assert!(TTL::try_from(200).is_err());
        assert_eq!(NID::from_masked_u8(0xE8), NID::new(0x68));
    }
    #[test]
    fn test_sequence_number_bytes() {
        let seq = SequenceNumber::new(0x01_02_03).unwrap();
        assert_eq!(seq.to_bytes_be(), [0x01, 0x02, 0x03]);
        assert_eq!(seq.to_bytes_le(), [0x03, 0x02, 0x01]);
        assert_eq!(SequenceNumber::from_bytes_be(&[0x01, 0x02, 0x03]), Some(seq));
        assert_eq!(SequenceNumber::from_bytes_be(&[0x01, 0x02]), None);
        assert_eq!(SequenceNumber::new(SEQUENCE_NUMBER_MAX).unwrap().next(), None);
        assert_eq!(SequenceNumber::new(SEQUENCE_NUMBER_MAX + 1), None);
    }
    #[test]
    fn test_matching_ivi() {
        let iv = IVIndex(0x1234_5679);
        assert_eq!(iv.matching_ivi(IVI(true)), Some(iv));
        assert_eq!(iv.matching_ivi(IVI(false)), Some(IVIndex(0x1234_5678)));
        assert_eq!(IVIndex(0).matching_ivi(IVI(true)), None);
    }
    #[test]
    fn test_key_index_packing() {
        let packed = pack_key_indexes(0x123, 0x456);
        assert_eq!(packed, [0x23, 0x61, 0x45]);
        assert_eq!(unpack_key_indexes(packed), (0x123, 0x456));
    }
}
