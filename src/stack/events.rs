//! Events the stack reports to the application and the internal timer/ack events it queues for
//! itself.
use crate::access::Opcode;
use crate::address::{Address, UnicastAddress};
use crate::control::ControlOpcode;
use crate::lower::{BlockAck, SeqZero};
use crate::models::MeshStatus;
use crate::stack::segments::TimerKey;

/// Which layer failed to authenticate a PDU.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum DecryptionFailure {
    Network,
    ProxyConfiguration,
    UpperTransport { akf: bool },
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum UnknownPdu {
    Access(Opcode),
    Control(ControlOpcode),
    Proxy(u8),
    /// Access PDU too short for the opcode it starts with.
    BadOpcode,
}
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum StatusEvent {
    /// Every segment was acknowledged (or the message didn't need acknowledging).
    MessageSent {
        dst: Address,
    },
    MessageReceived {
        src: UnicastAddress,
        dst: Address,
        status: MeshStatus,
    },
    /// Network PDUs of a message were handed to the bearer.
    MessageProcessed {
        dst: Address,
        pdu_count: usize,
    },
    TransactionFailed {
        address: Address,
        incomplete_timer_expired: bool,
    },
    DecryptionFailed {
        src: Option<UnicastAddress>,
        failure: DecryptionFailure,
    },
    UnknownPduReceived {
        src: UnicastAddress,
        pdu: UnknownPdu,
    },
    BlockAcknowledgementReceived {
        src: UnicastAddress,
        seq_zero: SeqZero,
        block_ack: BlockAck,
    },
    BlockAcknowledgementSent {
        dst: UnicastAddress,
        seq_zero: SeqZero,
        block_ack: BlockAck,
    },
}
/// Work the dispatcher queues for itself and drains before returning.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum StackEvent {
    TimerExpired(TimerKey),
    SendBlockAck { src: UnicastAddress },
}
