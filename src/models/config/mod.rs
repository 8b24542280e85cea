//! Configuration Server/Client messages. Secured with the Device Key of the configured node.
use crate::access::SigOpcode::{DoubleOctet, SingleOctet};
use crate::access::{Opcode, OpcodeConversationError};
use crate::models::{unpack_status, StatusParser, StatusTable};
use core::convert::TryFrom;

pub mod messages;

pub use messages::{
    AppKeyStatus, CompositionData, CompositionDataStatus, ConfigStatusCode, DefaultTTLGet,
    DefaultTTLStatus, ElementComposition, ModelAppStatus, NetworkTransmitStatus, NodeResetStatus,
    RelayState, RelayStatus,
};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum ConfigOpcode {
    AppKeyAdd,
    AppKeyDelete,
    AppKeyGet,
    AppKeyStatus,
    AppKeyUpdate,

    CompositionDataGet,
    CompositionDataStatus,

    DefaultTTLGet,
    DefaultTTLSet,
    DefaultTTLStatus,

    ModelAppBind,
    ModelAppStatus,
    ModelAppUnbind,

    NetworkTransmitGet,
    NetworkTransmitSet,
    NetworkTransmitStatus,

    NodeReset,
    NodeResetStatus,

    RelayGet,
    RelaySet,
    RelayStatus,
}
impl ConfigOpcode {
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        let sig = match self {
            ConfigOpcode::AppKeyAdd => SingleOctet(0x00),
            ConfigOpcode::AppKeyDelete => DoubleOctet(0x8000),
            ConfigOpcode::AppKeyGet => DoubleOctet(0x8001),
            ConfigOpcode::AppKeyStatus => DoubleOctet(0x8003),
            ConfigOpcode::AppKeyUpdate => SingleOctet(0x01),
            ConfigOpcode::CompositionDataGet => DoubleOctet(0x8008),
            ConfigOpcode::CompositionDataStatus => SingleOctet(0x02),
            ConfigOpcode::DefaultTTLGet => DoubleOctet(0x800C),
            ConfigOpcode::DefaultTTLSet => DoubleOctet(0x800D),
            ConfigOpcode::DefaultTTLStatus => DoubleOctet(0x800E),
            ConfigOpcode::ModelAppBind => DoubleOctet(0x803D),
            ConfigOpcode::ModelAppStatus => DoubleOctet(0x803E),
            ConfigOpcode::ModelAppUnbind => DoubleOctet(0x803F),
            ConfigOpcode::NetworkTransmitGet => DoubleOctet(0x8023),
            ConfigOpcode::NetworkTransmitSet => DoubleOctet(0x8024),
            ConfigOpcode::NetworkTransmitStatus => DoubleOctet(0x8025),
            ConfigOpcode::NodeReset => DoubleOctet(0x8049),
            ConfigOpcode::NodeResetStatus => DoubleOctet(0x804A),
            ConfigOpcode::RelayGet => DoubleOctet(0x8026),
            ConfigOpcode::RelaySet => DoubleOctet(0x8027),
            ConfigOpcode::RelayStatus => DoubleOctet(0x8028),
        };
        Opcode::SIG(sig)
    }
}
impl From<ConfigOpcode> for Opcode {
    fn from(opcode: ConfigOpcode) -> Self {
        opcode.opcode()
    }
}
impl TryFrom<Opcode> for ConfigOpcode {
    type Error = OpcodeConversationError;
    fn try_from(opcode: Opcode) -> Result<Self, OpcodeConversationError> {
        if let Opcode::SIG(opcode) = opcode {
            match opcode {
                SingleOctet(s) => match s {
                    0x00 => Ok(ConfigOpcode::AppKeyAdd),
                    0x01 => Ok(ConfigOpcode::AppKeyUpdate),
                    0x02 => Ok(ConfigOpcode::CompositionDataStatus),
                    _ => Err(OpcodeConversationError(())),
                },
                DoubleOctet(d) => match d {
                    0x8000 => Ok(ConfigOpcode::AppKeyDelete),
                    0x8001 => Ok(ConfigOpcode::AppKeyGet),
                    0x8003 => Ok(ConfigOpcode::AppKeyStatus),
                    0x8008 => Ok(ConfigOpcode::CompositionDataGet),
                    0x800C => Ok(ConfigOpcode::DefaultTTLGet),
                    0x800D => Ok(ConfigOpcode::DefaultTTLSet),
                    0x800E => Ok(ConfigOpcode::DefaultTTLStatus),
                    0x8023 => Ok(ConfigOpcode::NetworkTransmitGet),
                    0x8024 => Ok(ConfigOpcode::NetworkTransmitSet),
                    0x8025 => Ok(ConfigOpcode::NetworkTransmitStatus),
                    0x8026 => Ok(ConfigOpcode::RelayGet),
                    0x8027 => Ok(ConfigOpcode::RelaySet),
                    0x8028 => Ok(ConfigOpcode::RelayStatus),
                    0x803D => Ok(ConfigOpcode::ModelAppBind),
                    0x803E => Ok(ConfigOpcode::ModelAppStatus),
                    0x803F => Ok(ConfigOpcode::ModelAppUnbind),
                    0x8049 => Ok(ConfigOpcode::NodeReset),
                    0x804A => Ok(ConfigOpcode::NodeResetStatus),
                    _ => Err(OpcodeConversationError(())),
                },
            }
        } else {
            Err(OpcodeConversationError(()))
        }
    }
}
/// Statuses answered by a Configuration Server.
pub const STATUS_TABLE: StatusTable = &[
    (
        ConfigOpcode::AppKeyStatus.opcode(),
        unpack_status::<AppKeyStatus> as StatusParser,
    ),
    (
        ConfigOpcode::ModelAppStatus.opcode(),
        unpack_status::<ModelAppStatus> as StatusParser,
    ),
    (
        ConfigOpcode::DefaultTTLStatus.opcode(),
        unpack_status::<DefaultTTLStatus> as StatusParser,
    ),
    (
        ConfigOpcode::NodeResetStatus.opcode(),
        unpack_status::<NodeResetStatus> as StatusParser,
    ),
    (
        ConfigOpcode::RelayStatus.opcode(),
        unpack_status::<RelayStatus> as StatusParser,
    ),
    (
        ConfigOpcode::NetworkTransmitStatus.opcode(),
        unpack_status::<NetworkTransmitStatus> as StatusParser,
    ),
    (
        ConfigOpcode::CompositionDataStatus.opcode(),
        unpack_status::<CompositionDataStatus> as StatusParser,
    ),
];
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        for opcode in &[
            ConfigOpcode::AppKeyAdd,
            ConfigOpcode::AppKeyStatus,
            ConfigOpcode::CompositionDataStatus,
            ConfigOpcode::ModelAppUnbind,
            ConfigOpcode::NodeResetStatus,
        ] {
            assert_eq!(ConfigOpcode::try_from(opcode.opcode()), Ok(*opcode));
        }
        assert!(ConfigOpcode::try_from(Opcode::SIG(DoubleOctet(0x8204))).is_err());
    }
}
