//! Configuration messages. All multi-octet fields are Little Endian.
use crate::access::Opcode;
use crate::address::UnicastAddress;
use crate::bytes::ToFromBytesEndian;
use crate::mesh::{pack_key_indexes, unpack_key_indexes, AppKeyIndex, CompanyID, ModelID, NetKeyIndex, TTL};
use crate::models::config::ConfigOpcode;
use crate::models::{MessagePackError, PackableMessage};
use core::convert::TryFrom;
use core::fmt::{Display, Formatter};

/// Status Code returned by a Configuration Server. `0x00` is Success.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct ConfigStatusCode(pub u8);
impl ConfigStatusCode {
    pub const SUCCESS: ConfigStatusCode = ConfigStatusCode(0x00);
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}
impl Display for ConfigStatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let name = match self.0 {
            0x00 => "Success",
            0x01 => "Invalid Address",
            0x02 => "Invalid Model",
            0x03 => "Invalid AppKey Index",
            0x04 => "Invalid NetKey Index",
            0x05 => "Insufficient Resources",
            0x06 => "Key Index Already Stored",
            0x07 => "Invalid Publish Parameters",
            0x08 => "Not a Subscribe Model",
            0x09 => "Storage Failure",
            0x0A => "Feature Not Supported",
            0x0B => "Cannot Update",
            0x0C => "Cannot Remove",
            0x0D => "Cannot Bind",
            0x0E => "Temporarily Unable to Change State",
            0x0F => "Cannot Set",
            0x10 => "Unspecified Error",
            0x11 => "Invalid Binding",
            _ => "RFU",
        };
        write!(f, "{} (0x{:02X})", name, self.0)
    }
}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct AppKeyStatus {
    pub status: ConfigStatusCode,
    pub net_key_index: NetKeyIndex,
    pub app_key_index: AppKeyIndex,
}
impl PackableMessage for AppKeyStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::AppKeyStatus.into()
    }

    fn message_size(&self) -> usize {
        4
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.status.0;
        buffer[1..4].copy_from_slice(&pack_key_indexes(
            self.net_key_index.0,
            self.app_key_index.0,
        ));
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 4 {
            return Err(MessagePackError::BadLength);
        }
        let (net, app) = unpack_key_indexes([buffer[1], buffer[2], buffer[3]]);
        Ok(AppKeyStatus {
            status: ConfigStatusCode(buffer[0]),
            net_key_index: NetKeyIndex(net),
            app_key_index: AppKeyIndex(app),
        })
    }
}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct ModelAppStatus {
    pub status: ConfigStatusCode,
    pub element_address: UnicastAddress,
    pub app_key_index: AppKeyIndex,
    pub model_id: ModelID,
}
fn pack_model_id(model_id: ModelID, buffer: &mut [u8]) {
    match model_id {
        ModelID::SIG(id) => buffer[..2].copy_from_slice(&id.to_bytes_le()),
        ModelID::Vendor(cid, id) => {
            buffer[..2].copy_from_slice(&cid.to_bytes_le());
            buffer[2..4].copy_from_slice(&id.to_bytes_le());
        }
    }
}
fn unpack_model_id(buffer: &[u8]) -> Result<ModelID, MessagePackError> {
    match buffer.len() {
        2 => Ok(ModelID::SIG(
            u16::from_bytes_le(buffer).ok_or(MessagePackError::BadBytes)?,
        )),
        4 => Ok(ModelID::Vendor(
            CompanyID::from_bytes_le(&buffer[..2]).ok_or(MessagePackError::BadBytes)?,
            u16::from_bytes_le(&buffer[2..]).ok_or(MessagePackError::BadBytes)?,
        )),
        _ => Err(MessagePackError::BadLength),
    }
}
impl PackableMessage for ModelAppStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::ModelAppStatus.into()
    }

    fn message_size(&self) -> usize {
        5 + self.model_id.byte_len()
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.status.0;
        buffer[1..3].copy_from_slice(&self.element_address.to_bytes_le());
        buffer[3..5].copy_from_slice(&self.app_key_index.0.to_bytes_le());
        pack_model_id(self.model_id, &mut buffer[5..]);
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 7 && buffer.len() != 9 {
            return Err(MessagePackError::BadLength);
        }
        Ok(ModelAppStatus {
            status: ConfigStatusCode(buffer[0]),
            element_address: UnicastAddress::from_bytes_le(&buffer[1..3])
                .ok_or(MessagePackError::BadBytes)?,
            app_key_index: AppKeyIndex(
                u16::from_bytes_le(&buffer[3..5]).ok_or(MessagePackError::BadBytes)? & 0x0FFF,
            ),
            model_id: unpack_model_id(&buffer[5..])?,
        })
    }
}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct DefaultTTLGet;
impl PackableMessage for DefaultTTLGet {
    fn opcode() -> Opcode {
        ConfigOpcode::DefaultTTLGet.into()
    }

    fn message_size(&self) -> usize {
        0
    }

    fn pack_into(&self, _buffer: &mut [u8]) -> Result<(), MessagePackError> {
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.is_empty() {
            Ok(DefaultTTLGet)
        } else {
            Err(MessagePackError::BadLength)
        }
    }
}
/// Default TTL. `0x01` and anything above `0x7F` are prohibited.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct DefaultTTLStatus(pub TTL);
impl PackableMessage for DefaultTTLStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::DefaultTTLStatus.into()
    }

    fn message_size(&self) -> usize {
        1
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.is_empty() {
            Err(MessagePackError::SmallBuffer)
        } else if self.0.value() == 1 {
            Err(MessagePackError::BadState)
        } else {
            buffer[0] = self.0.value();
            Ok(())
        }
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 1 {
            return Err(MessagePackError::BadLength);
        }
        if buffer[0] == 1 {
            return Err(MessagePackError::BadBytes);
        }
        Ok(DefaultTTLStatus(
            TTL::try_from(buffer[0]).map_err(|_| MessagePackError::BadBytes)?,
        ))
    }
}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct NodeResetStatus;
impl PackableMessage for NodeResetStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::NodeResetStatus.into()
    }

    fn message_size(&self) -> usize {
        0
    }

    fn pack_into(&self, _buffer: &mut [u8]) -> Result<(), MessagePackError> {
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.is_empty() {
            Ok(NodeResetStatus)
        } else {
            Err(MessagePackError::BadLength)
        }
    }
}

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum RelayState {
    Disabled = 0x00,
    Enabled = 0x01,
    NotSupported = 0x02,
}
impl TryFrom<u8> for RelayState {
    type Error = MessagePackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(RelayState::Disabled),
            0x01 => Ok(RelayState::Enabled),
            0x02 => Ok(RelayState::NotSupported),
            _ => Err(MessagePackError::BadBytes),
        }
    }
}
/// 3 bit count and 5 bit interval steps packed in one octet.
fn pack_transmit(count: u8, steps: u8) -> u8 {
    (count & 0x07) | ((steps & 0x1F) << 3)
}
fn unpack_transmit(b: u8) -> (u8, u8) {
    (b & 0x07, b >> 3)
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct RelayStatus {
    pub relay: RelayState,
    pub retransmit_count: u8,
    pub retransmit_interval_steps: u8,
}
impl PackableMessage for RelayStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::RelayStatus.into()
    }

    fn message_size(&self) -> usize {
        2
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < 2 {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.relay as u8;
        buffer[1] = pack_transmit(self.retransmit_count, self.retransmit_interval_steps);
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 2 {
            return Err(MessagePackError::BadLength);
        }
        let (retransmit_count, retransmit_interval_steps) = unpack_transmit(buffer[1]);
        Ok(RelayStatus {
            relay: RelayState::try_from(buffer[0])?,
            retransmit_count,
            retransmit_interval_steps,
        })
    }
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct NetworkTransmitStatus {
    pub transmit_count: u8,
    pub interval_steps: u8,
}
impl PackableMessage for NetworkTransmitStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::NetworkTransmitStatus.into()
    }

    fn message_size(&self) -> usize {
        1
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.is_empty() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = pack_transmit(self.transmit_count, self.interval_steps);
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() != 1 {
            return Err(MessagePackError::BadLength);
        }
        let (transmit_count, interval_steps) = unpack_transmit(buffer[0]);
        Ok(NetworkTransmitStatus {
            transmit_count,
            interval_steps,
        })
    }
}

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct ElementComposition {
    pub location: u16,
    /// SIG models first, then vendor models.
    pub models: Vec<ModelID>,
}
impl ElementComposition {
    fn byte_len(&self) -> usize {
        4 + self.models.iter().map(|m| m.byte_len()).sum::<usize>()
    }
}
/// Composition Data Page 0.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct CompositionData {
    pub cid: CompanyID,
    pub pid: u16,
    pub vid: u16,
    pub crpl: u16,
    pub features: u16,
    pub elements: Vec<ElementComposition>,
}
const COMPOSITION_HEADER_LEN: usize = 10;
impl CompositionData {
    #[must_use]
    pub fn byte_len(&self) -> usize {
        COMPOSITION_HEADER_LEN
            + self
                .elements
                .iter()
                .map(ElementComposition::byte_len)
                .sum::<usize>()
    }
    pub fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.byte_len() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0..2].copy_from_slice(&self.cid.to_bytes_le());
        buffer[2..4].copy_from_slice(&self.pid.to_bytes_le());
        buffer[4..6].copy_from_slice(&self.vid.to_bytes_le());
        buffer[6..8].copy_from_slice(&self.crpl.to_bytes_le());
        buffer[8..10].copy_from_slice(&self.features.to_bytes_le());
        let mut pos = COMPOSITION_HEADER_LEN;
        for element in &self.elements {
            let sig = element
                .models
                .iter()
                .filter(|m| matches!(m, ModelID::SIG(_)))
                .count();
            let vendor = element.models.len() - sig;
            if sig > usize::from(u8::MAX) || vendor > usize::from(u8::MAX) {
                return Err(MessagePackError::BadState);
            }
            buffer[pos..pos + 2].copy_from_slice(&element.location.to_bytes_le());
            buffer[pos + 2] = sig as u8;
            buffer[pos + 3] = vendor as u8;
            pos += 4;
            let sig_models = element.models.iter().filter(|m| matches!(m, ModelID::SIG(_)));
            let vendor_models = element
                .models
                .iter()
                .filter(|m| matches!(m, ModelID::Vendor(..)));
            for model in sig_models.chain(vendor_models) {
                pack_model_id(*model, &mut buffer[pos..]);
                pos += model.byte_len();
            }
        }
        Ok(())
    }
    pub fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        if buffer.len() < COMPOSITION_HEADER_LEN {
            return Err(MessagePackError::BadLength);
        }
        let le = |pos: usize| u16::from_le_bytes([buffer[pos], buffer[pos + 1]]);
        let mut elements = Vec::new();
        let mut pos = COMPOSITION_HEADER_LEN;
        while pos < buffer.len() {
            if buffer.len() - pos < 4 {
                return Err(MessagePackError::BadLength);
            }
            let location = le(pos);
            let sig = usize::from(buffer[pos + 2]);
            let vendor = usize::from(buffer[pos + 3]);
            pos += 4;
            let end = pos + sig * 2 + vendor * 4;
            if end > buffer.len() {
                return Err(MessagePackError::BadLength);
            }
            let mut models = Vec::with_capacity(sig + vendor);
            for _ in 0..sig {
                models.push(unpack_model_id(&buffer[pos..pos + 2])?);
                pos += 2;
            }
            for _ in 0..vendor {
                models.push(unpack_model_id(&buffer[pos..pos + 4])?);
                pos += 4;
            }
            elements.push(ElementComposition { location, models });
        }
        Ok(CompositionData {
            cid: CompanyID(le(0)),
            pid: le(2),
            vid: le(4),
            crpl: le(6),
            features: le(8),
            elements,
        })
    }
}
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct CompositionDataStatus {
    pub page: u8,
    pub data: CompositionData,
}
impl PackableMessage for CompositionDataStatus {
    fn opcode() -> Opcode {
        ConfigOpcode::CompositionDataStatus.into()
    }

    fn message_size(&self) -> usize {
        1 + self.data.byte_len()
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.is_empty() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = self.page;
        self.data.pack_into(&mut buffer[1..])
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        match buffer.split_first() {
            // Only page 0 has a defined layout.
            Some((0, data)) => Ok(CompositionDataStatus {
                page: 0,
                data: CompositionData::unpack_from(data)?,
            }),
            Some(_) => Err(MessagePackError::BadBytes),
            None => Err(MessagePackError::BadLength),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_app_status() {
        let status = ModelAppStatus {
            status: ConfigStatusCode::SUCCESS,
            element_address: UnicastAddress::new(0x0102),
            app_key_index: AppKeyIndex(0x0456),
            model_id: ModelID::Vendor(CompanyID(0x0059), 0x0001),
        };
        let params = status.to_parameters().unwrap();
        assert_eq!(params, vec![0x00, 0x02, 0x01, 0x56, 0x04, 0x59, 0x00, 0x01, 0x00]);
        assert_eq!(ModelAppStatus::unpack_from(&params), Ok(status));
        assert_eq!(
            ModelAppStatus::unpack_from(&params[..8]),
            Err(MessagePackError::BadLength)
        );
    }
    #[test]
    fn test_default_ttl_prohibited() {
        assert_eq!(
            DefaultTTLStatus::unpack_from(&[0x05]),
            Ok(DefaultTTLStatus(TTL::new(5)))
        );
        assert_eq!(
            DefaultTTLStatus::unpack_from(&[0x01]),
            Err(MessagePackError::BadBytes)
        );
        assert_eq!(
            DefaultTTLStatus::unpack_from(&[0x80]),
            Err(MessagePackError::BadBytes)
        );
    }
    #[test]
    fn test_relay_status() {
        let status = RelayStatus::unpack_from(&[0x01, 0x4B]).unwrap();
        assert_eq!(status.relay, RelayState::Enabled);
        assert_eq!(status.retransmit_count, 3);
        assert_eq!(status.retransmit_interval_steps, 9);
        assert_eq!(status.to_parameters().unwrap(), vec![0x01, 0x4B]);
        assert!(RelayStatus::unpack_from(&[0x03, 0x00]).is_err());
    }
    #[test]
    fn test_composition_data() {
        let data = CompositionData {
            cid: CompanyID(0x000C),
            pid: 0x001A,
            vid: 0x0001,
            crpl: 0x0008,
            features: 0x0003,
            elements: vec![
                ElementComposition {
                    location: 0x0100,
                    models: vec![
                        ModelID::SIG(0x0000),
                        ModelID::SIG(0x1000),
                        ModelID::Vendor(CompanyID(0x003F), 0x002A),
                    ],
                },
                ElementComposition {
                    location: 0x0000,
                    models: vec![ModelID::SIG(0x1002)],
                },
            ],
        };
        let status = CompositionDataStatus { page: 0, data };
        let params = status.to_parameters().unwrap();
        assert_eq!(params.len(), 1 + 10 + (4 + 4 + 4) + (4 + 2));
        assert_eq!(&params[11..15], &[0x00, 0x01, 2, 1]);
        assert_eq!(CompositionDataStatus::unpack_from(&params), Ok(status));
        assert_eq!(
            CompositionDataStatus::unpack_from(&params[..params.len() - 1]),
            Err(MessagePackError::BadLength)
        );
    }
}
