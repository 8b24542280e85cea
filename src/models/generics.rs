//! Generic OnOff and Generic Level messages.
use crate::access::{Opcode, SigOpcode};
use crate::models::{unpack_status, MessagePackError, PackableMessage, StatusParser, StatusTable};

pub const ONOFF_SET: Opcode = Opcode::SIG(SigOpcode::DoubleOctet(0x8202));
pub const ONOFF_SET_UNACKNOWLEDGED: Opcode = Opcode::SIG(SigOpcode::DoubleOctet(0x8203));
pub const ONOFF_STATUS: Opcode = Opcode::SIG(SigOpcode::DoubleOctet(0x8204));
pub const LEVEL_STATUS: Opcode = Opcode::SIG(SigOpcode::DoubleOctet(0x8208));

/// Optional Transition Time and Delay of a Set message.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct Transition {
    pub transition_time: u8,
    pub delay: u8,
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct OnOffSet {
    pub on_off: bool,
    pub tid: u8,
    pub transition: Option<Transition>,
    /// Sends `Generic OnOff Set Unacknowledged` instead.
    pub unacknowledged: bool,
}
impl OnOffSet {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        if self.unacknowledged {
            ONOFF_SET_UNACKNOWLEDGED
        } else {
            ONOFF_SET
        }
    }
}
impl PackableMessage for OnOffSet {
    fn opcode() -> Opcode {
        ONOFF_SET
    }

    fn message_size(&self) -> usize {
        if self.transition.is_some() {
            4
        } else {
            2
        }
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = u8::from(self.on_off);
        buffer[1] = self.tid;
        if let Some(transition) = self.transition {
            buffer[2] = transition.transition_time;
            buffer[3] = transition.delay;
        }
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        let transition = match buffer.len() {
            2 => None,
            4 => Some(Transition {
                transition_time: buffer[2],
                delay: buffer[3],
            }),
            _ => return Err(MessagePackError::BadLength),
        };
        if buffer[0] > 1 {
            return Err(MessagePackError::BadBytes);
        }
        Ok(OnOffSet {
            on_off: buffer[0] == 1,
            tid: buffer[1],
            transition,
            unacknowledged: false,
        })
    }
}
/// Target state of a status with a transition in progress.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct Target<T> {
    pub target: T,
    pub remaining_time: u8,
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct OnOffStatus {
    pub present: bool,
    pub target: Option<Target<bool>>,
}
impl PackableMessage for OnOffStatus {
    fn opcode() -> Opcode {
        ONOFF_STATUS
    }

    fn message_size(&self) -> usize {
        if self.target.is_some() {
            3
        } else {
            1
        }
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[0] = u8::from(self.present);
        if let Some(target) = self.target {
            buffer[1] = u8::from(target.target);
            buffer[2] = target.remaining_time;
        }
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        let on_off = |b: u8| match b {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(MessagePackError::BadBytes),
        };
        match buffer.len() {
            1 => Ok(OnOffStatus {
                present: on_off(buffer[0])?,
                target: None,
            }),
            3 => Ok(OnOffStatus {
                present: on_off(buffer[0])?,
                target: Some(Target {
                    target: on_off(buffer[1])?,
                    remaining_time: buffer[2],
                }),
            }),
            _ => Err(MessagePackError::BadLength),
        }
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct LevelStatus {
    pub present: i16,
    pub target: Option<Target<i16>>,
}
impl PackableMessage for LevelStatus {
    fn opcode() -> Opcode {
        LEVEL_STATUS
    }

    fn message_size(&self) -> usize {
        if self.target.is_some() {
            5
        } else {
            2
        }
    }

    fn pack_into(&self, buffer: &mut [u8]) -> Result<(), MessagePackError> {
        if buffer.len() < self.message_size() {
            return Err(MessagePackError::SmallBuffer);
        }
        buffer[..2].copy_from_slice(&self.present.to_le_bytes());
        if let Some(target) = self.target {
            buffer[2..4].copy_from_slice(&target.target.to_le_bytes());
            buffer[4] = target.remaining_time;
        }
        Ok(())
    }

    fn unpack_from(buffer: &[u8]) -> Result<Self, MessagePackError> {
        let level = |pos: usize| i16::from_le_bytes([buffer[pos], buffer[pos + 1]]);
        match buffer.len() {
            2 => Ok(LevelStatus {
                present: level(0),
                target: None,
            }),
            5 => Ok(LevelStatus {
                present: level(0),
                target: Some(Target {
                    target: level(2),
                    remaining_time: buffer[4],
                }),
            }),
            _ => Err(MessagePackError::BadLength),
        }
    }
}
pub const STATUS_TABLE: StatusTable = &[
    (ONOFF_STATUS, unpack_status::<OnOffStatus> as StatusParser),
    (LEVEL_STATUS, unpack_status::<LevelStatus> as StatusParser),
];
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onoff_status() {
        assert_eq!(
            OnOffStatus::unpack_from(&[0x01]),
            Ok(OnOffStatus {
                present: true,
                target: None
            })
        );
        let moving = OnOffStatus::unpack_from(&[0x00, 0x01, 0x45]).unwrap();
        assert_eq!(
            moving.target,
            Some(Target {
                target: true,
                remaining_time: 0x45
            })
        );
        assert_eq!(
            OnOffStatus::unpack_from(&[0x02]),
            Err(MessagePackError::BadBytes)
        );
        assert_eq!(
            OnOffStatus::unpack_from(&[0x00, 0x01]),
            Err(MessagePackError::BadLength)
        );
    }
    #[test]
    fn test_onoff_set() {
        let set = OnOffSet {
            on_off: true,
            tid: 7,
            transition: None,
            unacknowledged: true,
        };
        assert_eq!(set.opcode(), ONOFF_SET_UNACKNOWLEDGED);
        assert_eq!(set.to_parameters().unwrap(), vec![0x01, 0x07]);
    }
    #[test]
    fn test_level_status() {
        let status = LevelStatus::unpack_from(&[0x00, 0x80, 0xFF, 0x7F, 0x0A]).unwrap();
        assert_eq!(status.present, i16::MIN);
        assert_eq!(status.target.unwrap().target, i16::MAX);
    }
}
