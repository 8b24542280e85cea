//! Proxy Configuration messages. Sent in `ProxyConfiguration` PDUs straight over the network
//! layer (no transport layers). The opcode is a single octet and fields are Big Endian.
use crate::access::{Opcode, SigOpcode};
use crate::address::Address;
use crate::bytes::ToFromBytesEndian;
use crate::models::{unpack_status, MessagePackError, PackableMessage, StatusParser, StatusTable};
use core::convert::TryFrom;

pub const SET_FILTER_TYPE: Opcode = Opcode::SIG(SigOpcode::SingleOctet(0x00));
pub const ADD_ADDRESSES: Opcode = Opcode::SIG(SigOpcode::SingleOctet(0x01));
pub const REMOVE_ADDRESSES: Opcode = Opcode::SIG(SigOpcode::SingleOctet(0x02));
pub const FILTER_STATUS: Opcode = Opcode::SIG(SigOpcode::SingleOctet(0x03));

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum FilterType {
    WhiteList = 0x00,
    BlackList = 0x01,
}
impl TryFrom<u8> for FilterType {
    type Error = MessagePackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(FilterType::WhiteList),
            0x01 => Ok(FilterType::BlackList),
            _ => Err(MessagePackError::BadBytes),
        }
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct SetFilterType(pub FilterType);
impl PackableMessage for SetFilterType {
    fn opcode() -> Opcode {
        SET_FILTER_TYPE
    }

    fn message_size(&self) -> usize {
        1
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.is_empty() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.0 as u8;
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 1 {
            return Err(MessagePackError::BadLength);
        }
        Ok(SetFilterType(FilterType::try_from(buffer[0])?))
    }
}
/// Add or remove addresses from the proxy filter.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct FilterAddresses {
    pub remove: bool,
    pub addresses: Vec<Address>,
}
impl FilterAddresses {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        if self.remove {
            REMOVE_ADDRESSES
        } else {
            ADD_ADDRESSES
        }
    }
}
impl PackableMessage for FilterAddresses {
    fn opcode() -> Opcode {
        ADD_ADDRESSES
    }

    fn message_size(&self) -> usize {
        self.addresses.len() * 2
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        for (chunk, address) in buffer.chunks_exact_mut(2).zip(&self.addresses) {
            chunk.copy_from_slice(&address.to_bytes_be());
        }
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() % 2 != 0 {
            return Err(MessagePackError::BadLength);
        }
        Ok(FilterAddresses {
            remove: false,
            addresses: buffer
                .chunks_exact(2)
                .map(|c| Address::from(u16::from_be_bytes([c[0], c[1]])))
                .collect(),
        })
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct FilterStatus {
    pub filter_type: FilterType,
    pub list_size: u16,
}
impl PackableMessage for FilterStatus {
    fn opcode() -> Opcode {
        FILTER_STATUS
    }

    fn message_size(&self) -> usize {
        3
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < 3 {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.filter_type as u8;
        buffer[1..3].copy_from_slice(&self.list_size.to_be_bytes());
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 3 {
            return Err(MessagePackError::BadLength);
        }
        Ok(FilterStatus {
            filter_type: FilterType::try_from(buffer[0])?,
            list_size: u16::from_bytes_be(&buffer[1..3]).ok_or(MessagePackError::BadBytes)?,
        })
    }
}
pub const STATUS_TABLE: StatusTable = &[(FILTER_STATUS, unpack_status::<FilterStatus> as StatusParser)];
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_status_big_endian() {
        assert_eq!(
            FilterStatus::unpack_from(&[0x01, 0x00, 0x03]),
            Ok(FilterStatus {
                filter_type: FilterType::BlackList,
                list_size: 3
            })
        );
        assert!(FilterStatus::unpack_from(&[0x02, 0x00, 0x03]).is_err());
    }
    #[test]
    fn test_filter_addresses() {
        let msg = FilterAddresses {
            remove: true,
            addresses: vec![Address::from(0x0001), Address::from(0xC000)],
        };
        assert_eq!(msg.opcode(), REMOVE_ADDRESSES);
        assert_eq!(msg.to_parameters().unwrap(), vec![0x00, 0x01, 0xC0, 0x00]);
    }
}
