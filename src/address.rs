//! Mesh addresses. Every address on the wire is 16 bits; the top bits pick the kind.
//!
//! | Bits (16)             | Kind          |
//! | --------------------- | ------------- |
//! | 0b0000 0000 0000 0000 | Unassigned    |
//! | 0b0xxx xxxx xxxx xxxx | Unicast       |
//! | 0b10xx xxxx xxxx xxxx | Virtual       |
//! | 0b11xx xxxx xxxx xxxx | Group         |
//!
//! Virtual addresses only carry the 14 bit hash of their Label UUID. The Label UUID itself never
//! reaches the stack.
//!
//! Network and transport headers are big endian. Foundation model parameters are little endian.
use crate::bytes::ToFromBytesEndian;
use core::convert::TryFrom;
use core::fmt::{Display, Formatter};

const KIND_MASK: u16 = 0xC000;
const VIRTUAL_KIND: u16 = 0x8000;
const GROUP_KIND: u16 = 0xC000;

/// `u16` didn't fall in the range of the requested address kind.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct AddressError(());

macro_rules! address_kind {
    ($(#[$meta:meta])* $name:ident, $is_kind:expr) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
        #[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
        pub struct $name(u16);
        impl $name {
            #[must_use]
            pub const fn value(self) -> u16 {
                self.0
            }
        }
        impl TryFrom<u16> for $name {
            type Error = AddressError;
            fn try_from(v: u16) -> Result<Self, AddressError> {
                let is_kind: fn(u16) -> bool = $is_kind;
                if is_kind(v) {
                    Ok($name(v))
                } else {
                    Err(AddressError(()))
                }
            }
        }
        impl From<$name> for u16 {
            fn from(address: $name) -> u16 {
                address.0
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                write!(f, "0x{:04X}", self.0)
            }
        }
    };
}
address_kind!(
    /// Address of one element. A node's elements take consecutive unicast addresses starting at
    /// its primary element.
    UnicastAddress,
    |v| v != 0 && v & 0x8000 == 0
);
address_kind!(
    /// Group address. `0xFF00..=0xFFFB` are RFU, `0xFFFC..=0xFFFF` are the fixed groups
    /// (all proxies, all friends, all relays, all nodes).
    GroupAddress,
    |v| v & KIND_MASK == GROUP_KIND
);
address_kind!(
    /// 14 bit hash of a virtual Label UUID.
    VirtualAddressHash,
    |v| v & KIND_MASK == VIRTUAL_KIND
);

impl UnicastAddress {
    /// # Panics
    /// Panics if `v` is `0` or has the top bit set.
    #[must_use]
    pub fn new(v: u16) -> UnicastAddress {
        match UnicastAddress::try_from(v) {
            Ok(address) => address,
            Err(_) => panic!("non unicast address '{}'", v),
        }
    }
}
impl GroupAddress {
    pub const ALL_NODES: GroupAddress = GroupAddress(0xFFFF);
}

/// Any destination a network PDU can carry.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Address {
    Unassigned,
    Unicast(UnicastAddress),
    Group(GroupAddress),
    VirtualHash(VirtualAddressHash),
}
impl Address {
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        *self != Address::Unassigned
    }
    #[must_use]
    pub fn is_unicast(&self) -> bool {
        self.unicast().is_some()
    }
    #[must_use]
    pub fn unicast(&self) -> Option<UnicastAddress> {
        match self {
            Address::Unicast(unicast) => Some(*unicast),
            _ => None,
        }
    }
    #[must_use]
    pub fn value(&self) -> u16 {
        match self {
            Address::Unassigned => 0,
            Address::Unicast(a) => a.0,
            Address::Group(a) => a.0,
            Address::VirtualHash(a) => a.0,
        }
    }
}
impl Default for Address {
    fn default() -> Self {
        Address::Unassigned
    }
}
impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:04X}", self.value())
    }
}
impl From<u16> for Address {
    fn from(v: u16) -> Address {
        match v & KIND_MASK {
            _ if v == 0 => Address::Unassigned,
            GROUP_KIND => Address::Group(GroupAddress(v)),
            VIRTUAL_KIND => Address::VirtualHash(VirtualAddressHash(v)),
            _ => Address::Unicast(UnicastAddress(v)),
        }
    }
}
impl From<UnicastAddress> for Address {
    fn from(address: UnicastAddress) -> Self {
        Address::Unicast(address)
    }
}
impl From<GroupAddress> for Address {
    fn from(address: GroupAddress) -> Self {
        Address::Group(address)
    }
}
impl ToFromBytesEndian for Address {
    type AsBytesType = [u8; 2];

    fn to_bytes_le(&self) -> [u8; 2] {
        self.value().to_le_bytes()
    }

    fn to_bytes_be(&self) -> [u8; 2] {
        self.value().to_be_bytes()
    }

    fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
        u16::from_bytes_le(bytes).map(Address::from)
    }

    fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
        u16::from_bytes_be(bytes).map(Address::from)
    }
}
impl ToFromBytesEndian for UnicastAddress {
    type AsBytesType = [u8; 2];

    fn to_bytes_le(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    fn to_bytes_be(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
        UnicastAddress::try_from(u16::from_bytes_le(bytes)?).ok()
    }

    fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
        UnicastAddress::try_from(u16::from_bytes_be(bytes)?).ok()
    }
}
