//! Bluetooth Mesh Bearers. The stack only hands framed network PDUs (`pdu_type || network pdu`)
//! to a [`TransportBearer`]; advertising/GATT framing is up to the bearer.
use crate::address::Address;
use core::fmt::{Display, Formatter};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum BearerError {
    ChannelClosed,
    Rejected,
}
impl Display for BearerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            BearerError::ChannelClosed => f.write_str("bearer channel closed"),
            BearerError::Rejected => f.write_str("bearer rejected the frame"),
        }
    }
}
impl std::error::Error for BearerError {}

pub trait TransportBearer {
    /// Sends one framed PDU. `dst` is the mesh destination of the PDU, for bearers that route.
    fn send_pdu(&mut self, dst: Address, frame: &[u8]) -> Result<(), BearerError>;
}
impl<B: TransportBearer + ?Sized> TransportBearer for &mut B {
    fn send_pdu(&mut self, dst: Address, frame: &[u8]) -> Result<(), BearerError> {
        (**self).send_pdu(dst, frame)
    }
}
/// A frame leaving the stack.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct OutgoingFrame {
    pub dst: Address,
    pub frame: Vec<u8>,
}
/// Keeps every frame in memory. Used by the CLI to print frames and by tests to shuttle frames
/// between two stacks.
#[derive(Clone, Debug, Default)]
pub struct RecordingBearer {
    frames: Vec<OutgoingFrame>,
}
impl RecordingBearer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn frames(&self) -> &[OutgoingFrame] {
        &self.frames
    }
    pub fn take_frames(&mut self) -> Vec<OutgoingFrame> {
        core::mem::take(&mut self.frames)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
impl TransportBearer for RecordingBearer {
    fn send_pdu(&mut self, dst: Address, frame: &[u8]) -> Result<(), BearerError> {
        self.frames.push(OutgoingFrame {
            dst,
            frame: frame.to_vec(),
        });
        Ok(())
    }
}
/// Forwards frames into a tokio channel (the outgoing half of an async bearer).
#[cfg(feature = "full_stack")]
#[derive(Clone, Debug)]
pub struct ChannelBearer {
    tx: tokio::sync::mpsc::UnboundedSender<OutgoingFrame>,
}
#[cfg(feature = "full_stack")]
impl ChannelBearer {
    #[must_use]
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<OutgoingFrame>) -> Self {
        Self { tx }
    }
}
#[cfg(feature = "full_stack")]
impl TransportBearer for ChannelBearer {
    fn send_pdu(&mut self, dst: Address, frame: &[u8]) -> Result<(), BearerError> {
        self.tx
            .send(OutgoingFrame {
                dst,
                frame: frame.to_vec(),
            })
            .map_err(|_| BearerError::ChannelClosed)
    }
}
