//! Typed status (and a few request) messages and the opcode-keyed parse tables the dispatcher
//! uses to turn a decrypted Access PDU into a [`MeshStatus`].
use crate::access::Opcode;
use core::fmt::{Display, Formatter};

pub mod config;
pub mod generics;
pub mod proxy;
pub mod vendor;

/// Error when trying to pack a message into a byte buffer.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum MessagePackError {
    /// Byte Buffer too small to fit the whole message.
    SmallBuffer,
    /// Incoming Byte Buffer length doesn't make sense.
    BadLength,
    /// Incoming Byte Buffer creates an invalid message.
    BadBytes,
    /// Message can't be packed because the object is in a bad state.
    BadState,
}
impl Display for MessagePackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MessagePackError::SmallBuffer => "buffer too small for message",
            MessagePackError::BadLength => "bad message length",
            MessagePackError::BadBytes => "invalid message bytes",
            MessagePackError::BadState => "message in a bad state",
        };
        f.write_str(s)
    }
}
impl std::error::Error for MessagePackError {}

/// An Access Message that can be packed into a (little endian) byte buffer.
/// If a message comes in that matches `Opcode`, the stack will try to decode it with
/// `PackableMessage::unpack_from`.
pub trait PackableMessage: Sized {
    fn opcode() -> Opcode;
    /// Bytes need to fit the entire message in bytes (excluding opcode).
    fn message_size(&self) -> usize;
    /// Pack the message into the byte buffer (without the opcode). If the length of the buffer is
    /// too small or the object is in a bad state, return `MessagePackError`.
    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError>;
    /// Parameters as an owned buffer.
    fn to_parameters(&self) -> Result<Vec<u8>, MessagePackError> {
        let mut out = vec![0_u8; self.message_size()];
        self.pack_into(&mut out)?;
        Ok(out)
    }
    /// Unpack the message from the byte buffer (without the opcode). Make sure to check for a valid
    /// message or return a `MessagePackError` otherwise.
    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError>;
}
/// Every status the stack knows how to parse.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum MeshStatus {
    AppKey(config::AppKeyStatus),
    ModelApp(config::ModelAppStatus),
    DefaultTTL(config::DefaultTTLStatus),
    NodeReset(config::NodeResetStatus),
    Relay(config::RelayStatus),
    NetworkTransmit(config::NetworkTransmitStatus),
    CompositionData(config::CompositionDataStatus),
    GenericOnOff(generics::OnOffStatus),
    GenericLevel(generics::LevelStatus),
    Vendor(vendor::VendorStatus),
    ProxyFilter(proxy::FilterStatus),
}
impl MeshStatus {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            MeshStatus::AppKey(_) => config::AppKeyStatus::opcode(),
            MeshStatus::ModelApp(_) => config::ModelAppStatus::opcode(),
            MeshStatus::DefaultTTL(_) => config::DefaultTTLStatus::opcode(),
            MeshStatus::NodeReset(_) => config::NodeResetStatus::opcode(),
            MeshStatus::Relay(_) => config::RelayStatus::opcode(),
            MeshStatus::NetworkTransmit(_) => config::NetworkTransmitStatus::opcode(),
            MeshStatus::CompositionData(_) => config::CompositionDataStatus::opcode(),
            MeshStatus::GenericOnOff(_) => generics::OnOffStatus::opcode(),
            MeshStatus::GenericLevel(_) => generics::LevelStatus::opcode(),
            MeshStatus::Vendor(v) => v.opcode,
            MeshStatus::ProxyFilter(_) => proxy::FilterStatus::opcode(),
        }
    }
}
macro_rules! impl_into_status {
    ( $( $t:ty => $variant:ident ), * ) => {
        $(
            impl From<$t> for MeshStatus {
                fn from(status: $t) -> Self {
                    MeshStatus::$variant(status)
                }
            }
        )*
    }
}
impl_into_status!(
    config::AppKeyStatus => AppKey,
    config::ModelAppStatus => ModelApp,
    config::DefaultTTLStatus => DefaultTTL,
    config::NodeResetStatus => NodeReset,
    config::RelayStatus => Relay,
    config::NetworkTransmitStatus => NetworkTransmit,
    config::CompositionDataStatus => CompositionData,
    generics::OnOffStatus => GenericOnOff,
    generics::LevelStatus => GenericLevel,
    vendor::VendorStatus => Vendor,
    proxy::FilterStatus => ProxyFilter
);

/// Parses the parameters of one status opcode.
pub type StatusParser = fn(&[u8]) -> Result<MeshStatus, MessagePackError>;
/// `(opcode, parser)` pairs. Looked up linearly, tables are short.
pub type StatusTable = &'static [(Opcode, StatusParser)];

/// Generic table entry for any `PackableMessage` status.
pub fn unpack_status<M: PackableMessage + Into<MeshStatus>>(
    parameters: &[u8],
) -> Result<MeshStatus, MessagePackError> {
    M::unpack_from(parameters).map(Into::into)
}
#[must_use]
pub fn lookup(table: StatusTable, opcode: Opcode) -> Option<StatusParser> {
    table
        .iter()
        .find(|(o, _)| *o == opcode)
        .map(|(_, parser)| *parser)
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_tables() {
        let parser = lookup(config::STATUS_TABLE, config::AppKeyStatus::opcode()).unwrap();
        let status = parser(&[0x00, 0x01, 0x10, 0x00]).unwrap();
        assert_eq!(status.opcode(), config::AppKeyStatus::opcode());
        assert!(lookup(config::STATUS_TABLE, generics::OnOffStatus::opcode()).is_none());
        assert!(lookup(generics::STATUS_TABLE, generics::OnOffStatus::opcode()).is_some());
        assert!(lookup(proxy::STATUS_TABLE, proxy::FilterStatus::opcode()).is_some());
    }
}
