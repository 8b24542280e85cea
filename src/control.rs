//! Bluetooth Mesh Control Layer. Only the Segment Acknowledgement is handled by this stack, every
//! other opcode is recognized so it can be reported but its parameters are left alone.

use crate::lower::{BlockAck, SeqZero, UnsegmentedControlPDU, OBO, SEQ_ZERO_MAX};
use core::fmt::{Display, Formatter};

/// 7 Bit Control Opcode
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum ControlOpcode {
    Ack = 0x00, // Handled by the lower transport layer.
    FriendPoll = 0x01,
    FriendUpdate = 0x02,
    FriendRequest = 0x03,
    FriendOffer = 0x04,
    FriendClear = 0x05,
    FriendClearConfirm = 0x06,
    FriendSubscriptionListAdd = 0x07,
    FriendSubscriptionListRemove = 0x08,
    FriendSubscriptionListConfirm = 0x09,
    Heartbeat = 0x0A,
}
impl ControlOpcode {
    #[must_use]
    pub fn new(opcode: u8) -> Option<Self> {
        match opcode {
            0x00 => Some(ControlOpcode::Ack),
            0x01 => Some(ControlOpcode::FriendPoll),
            0x02 => Some(ControlOpcode::FriendUpdate),
            0x03 => Some(ControlOpcode::FriendRequest),
            0x04 => Some(ControlOpcode::FriendOffer),
            0x05 => Some(ControlOpcode::FriendClear),
            0x06 => Some(ControlOpcode::FriendClearConfirm),
            0x07 => Some(ControlOpcode::FriendSubscriptionListAdd),
            0x08 => Some(ControlOpcode::FriendSubscriptionListRemove),
            0x09 => Some(ControlOpcode::FriendSubscriptionListConfirm),
            0x0A => Some(ControlOpcode::Heartbeat),
            _ => None,
        }
    }
}
impl From<ControlOpcode> for u8 {
    fn from(opcode: ControlOpcode) -> Self {
        opcode as u8
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ControlMessageError {
    BadOpcode,
    BadLength,
}
impl Display for ControlMessageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ControlMessageError::BadOpcode => f.write_str("unexpected control opcode"),
            ControlMessageError::BadLength => f.write_str("bad control parameters length"),
        }
    }
}
impl std::error::Error for ControlMessageError {}

/// Segment Acknowledgement.
/// | Octet | Bits                         |
/// |-------|------------------------------|
/// | 0     | OBO(1) \| SeqZero[12..6]     |
/// | 1     | SeqZero[5..0] \| RFU(2)      |
/// | 2..6  | BlockAck (Big Endian)        |
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Ack {
    pub obo: OBO,
    pub seq_zero: SeqZero,
    pub block_ack: BlockAck,
}
const ACK_LEN: usize = 6;
impl Ack {
    pub const OPCODE: ControlOpcode = ControlOpcode::Ack;
    #[must_use]
    pub const fn byte_len() -> usize {
        ACK_LEN
    }
    #[must_use]
    pub fn pack(&self) -> [u8; ACK_LEN] {
        let seq_zero = self.seq_zero.value() & SEQ_ZERO_MAX;
        let mut out = [0_u8; ACK_LEN];
        out[0] = (u8::from(self.obo.0) << 7) | (seq_zero >> 6) as u8;
        out[1] = ((seq_zero & 0x3F) as u8) << 2;
        out[2..].copy_from_slice(&self.block_ack.0.to_be_bytes());
        out
    }
    pub fn unpack(buf: &[u8]) -> Result<Self, ControlMessageError> {
        if buf.len() != ACK_LEN {
            return Err(ControlMessageError::BadLength);
        }
        let seq_zero = (u16::from(buf[0] & 0x7F) << 6) | u16::from(buf[1] >> 2);
        Ok(Ack {
            obo: OBO(buf[0] & 0x80 != 0),
            seq_zero: SeqZero::new_masked(seq_zero),
            block_ack: BlockAck(u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]])),
        })
    }
    pub fn try_from_pdu(pdu: &UnsegmentedControlPDU) -> Result<Self, ControlMessageError> {
        if pdu.opcode() != Self::OPCODE {
            Err(ControlMessageError::BadOpcode)
        } else {
            Self::unpack(pdu.data())
        }
    }
    #[must_use]
    pub fn to_pdu(&self) -> UnsegmentedControlPDU {
        UnsegmentedControlPDU::new(Self::OPCODE, &self.pack())
    }
}
