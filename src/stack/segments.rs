//! Incoming segment reassembly. One in-flight message per source address, tracked by SeqAuth,
//! with the incomplete and block-ack timers kept in the dispatcher's `Scheduler`.
use crate::address::{Address, UnicastAddress};
use crate::control::Ack;
use crate::lower::{BlockAck, SegmentedPDU, SeqAuth, OBO};
use crate::mesh::{IVIndex, NetKeyIndex, SequenceNumber, TTL};
use crate::reassembler::{self, ContextHeader, ReassembleError};
use crate::scheduler::Scheduler;
use crate::stack::StackConfig;
use std::collections::BTreeMap;
use std::time::Instant;

/// Every timer the stack runs.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum TimerKey {
    /// Reassembly of a message from this source gives up.
    Incomplete(UnicastAddress),
    /// Time to acknowledge the segments received from this source.
    BlockAck(UnicastAddress),
    /// An outgoing segmented message to this destination was never fully acknowledged.
    Outgoing(Address),
}
/// Where to send the acknowledgement for a segmented message.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct AckTarget {
    pub ack: Ack,
    pub net_key_index: NetKeyIndex,
    /// TTL the segments were received with.
    pub ttl: TTL,
}
pub struct IncomingSegments {
    context: reassembler::Context,
    seq_auth: SeqAuth,
    dst: Address,
    net_key_index: NetKeyIndex,
    ttl: TTL,
    ack_sent: Option<BlockAck>,
}
impl IncomingSegments {
    #[must_use]
    pub fn seq_auth(&self) -> SeqAuth {
        self.seq_auth
    }
    #[must_use]
    pub fn dst(&self) -> Address {
        self.dst
    }
    #[must_use]
    pub fn block_ack(&self) -> BlockAck {
        self.context.block_ack()
    }
    fn ack_target(&self, block_ack: BlockAck) -> AckTarget {
        AckTarget {
            ack: Ack {
                obo: OBO(false),
                seq_zero: self.seq_auth.seq_zero(),
                block_ack,
            },
            net_key_index: self.net_key_index,
            ttl: self.ttl,
        }
    }
}
#[derive(Copy, Clone, Debug)]
struct CompletedSegments {
    seq_auth: SeqAuth,
    target: AckTarget,
}
/// Header info of a received segment.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct SegmentInfo {
    pub src: UnicastAddress,
    pub dst: Address,
    pub seq: SequenceNumber,
    pub iv_index: IVIndex,
    pub net_key_index: NetKeyIndex,
    pub ttl: TTL,
    /// `dst` is one of the local node's unicast addresses.
    pub local_dst: bool,
}
#[derive(Clone, Debug)]
pub enum SegmentOutcome {
    /// Segment stored, message still incomplete.
    Stored,
    /// Last missing segment arrived. `ack` is `Some` if the block-ack has to be sent now.
    Complete {
        upper_pdu: Vec<u8>,
        header: ContextHeader,
        seq_auth: SeqAuth,
        ack: Option<AckTarget>,
    },
    /// Segment of a message that was already reassembled. The sender missed our ack.
    AlreadyComplete { ack: Option<AckTarget> },
    /// Older than the last SeqAuth from this source.
    Ignored,
}
/// Lower Transport receive state for every peer.
#[derive(Default)]
pub struct LowerTransport {
    incoming: BTreeMap<UnicastAddress, IncomingSegments>,
    last_seq_auth: BTreeMap<UnicastAddress, SeqAuth>,
    completed: BTreeMap<UnicastAddress, CompletedSegments>,
}
impl LowerTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn incoming(&self, src: UnicastAddress) -> Option<&IncomingSegments> {
        self.incoming.get(&src)
    }
    #[must_use]
    pub fn last_seq_auth(&self, src: UnicastAddress) -> Option<SeqAuth> {
        self.last_seq_auth.get(&src).copied()
    }
    /// Handles one segment. Errors mean the segment was malformed and nothing was changed.
    pub fn receive_segment(
        &mut self,
        info: SegmentInfo,
        segment: &SegmentedPDU,
        now: Instant,
        config: &StackConfig,
        scheduler: &mut Scheduler<TimerKey, Instant>,
    ) -> Result<SegmentOutcome, ReassembleError> {
        let header = segment.header();
        if !header.is_valid() {
            return Err(ReassembleError::SegmentOutOfBounds);
        }
        let seq_auth = match SeqAuth::new(info.iv_index, info.seq, header.seq_zero) {
            Some(seq_auth) => seq_auth,
            None => return Ok(SegmentOutcome::Ignored),
        };
        let src = info.src;
        if let Some(completed) = self.completed.get(&src) {
            if completed.seq_auth == seq_auth {
                return Ok(SegmentOutcome::AlreadyComplete {
                    ack: if info.local_dst {
                        Some(completed.target)
                    } else {
                        None
                    },
                });
            }
        }
        let is_new = match self.last_seq_auth.get(&src) {
            Some(last) if seq_auth < *last => return Ok(SegmentOutcome::Ignored),
            Some(last) => seq_auth > *last,
            None => true,
        };
        if is_new {
            let mut context = reassembler::Context::new(ContextHeader::from_segment(segment));
            context.insert(segment)?;
            self.incoming.insert(
                src,
                IncomingSegments {
                    context,
                    seq_auth,
                    dst: info.dst,
                    net_key_index: info.net_key_index,
                    ttl: info.ttl,
                    ack_sent: None,
                },
            );
            self.last_seq_auth.insert(src, seq_auth);
            self.completed.remove(&src);
            scheduler.schedule(TimerKey::Incomplete(src), now + config.incomplete_timeout);
            if info.local_dst {
                scheduler.schedule(TimerKey::BlockAck(src), now + config.ack_timeout(info.ttl));
            } else {
                scheduler.cancel(&TimerKey::BlockAck(src));
            }
        } else {
            let incoming = match self.incoming.get_mut(&src) {
                Some(incoming) => incoming,
                None => return Ok(SegmentOutcome::Ignored),
            };
            // A segment we already hold still shows the sender is alive.
            let inserted = match incoming.context.insert(segment) {
                Ok(()) => true,
                Err(ReassembleError::SegmentAlreadyInserted) => false,
                Err(e) => return Err(e),
            };
            scheduler.schedule(TimerKey::Incomplete(src), now + config.incomplete_timeout);
            if info.local_dst && !scheduler.is_scheduled(&TimerKey::BlockAck(src)) {
                scheduler.schedule(TimerKey::BlockAck(src), now + config.ack_timeout(info.ttl));
            }
            if !inserted {
                return Ok(SegmentOutcome::Stored);
            }
        }
        let ready = self
            .incoming
            .get(&src)
            .map_or(false, |incoming| incoming.context.is_ready());
        if !ready {
            return Ok(SegmentOutcome::Stored);
        }
        scheduler.cancel(&TimerKey::Incomplete(src));
        scheduler.cancel(&TimerKey::BlockAck(src));
        let incoming = match self.incoming.remove(&src) {
            Some(incoming) => incoming,
            None => return Ok(SegmentOutcome::Stored),
        };
        let block_ack = incoming.block_ack();
        let target = incoming.ack_target(block_ack);
        let ack = if info.local_dst && incoming.ack_sent != Some(block_ack) {
            Some(target)
        } else {
            None
        };
        let header = *incoming.context.header();
        self.completed
            .insert(src, CompletedSegments { seq_auth, target });
        match incoming.context.finish() {
            Ok(upper_pdu) => Ok(SegmentOutcome::Complete {
                upper_pdu,
                header,
                seq_auth,
                ack,
            }),
            Err(_) => Ok(SegmentOutcome::Stored),
        }
    }
    /// Acknowledgement for the segments received so far from `src`. Marks the ack as sent.
    pub fn block_ack_for(&mut self, src: UnicastAddress) -> Option<AckTarget> {
        let incoming = self.incoming.get_mut(&src)?;
        let block_ack = incoming.block_ack();
        incoming.ack_sent = Some(block_ack);
        Some(incoming.ack_target(block_ack))
    }
    /// Drops the in-flight message from `src` (incomplete timer expired or state reset).
    pub fn expire(&mut self, src: UnicastAddress) -> Option<IncomingSegments> {
        self.incoming.remove(&src)
    }
    /// Forgets everything about `src`.
    pub fn reset(&mut self, src: UnicastAddress) {
        self.incoming.remove(&src);
        self.last_seq_auth.remove(&src);
        self.completed.remove(&src);
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AID, AKF};
    use crate::lower::{SegN, SegO, SegmentedAccessPDU, SeqZero, SZMIC};
    use core::time::Duration;

    fn segment(seq_zero: u16, seg_o: u8, seg_n: u8, len: usize) -> SegmentedPDU {
        SegmentedPDU::Access(SegmentedAccessPDU::new(
            AKF(true),
            AID::new(0x09),
            SZMIC(false),
            SeqZero::new(seq_zero),
            SegO::new(seg_o),
            SegN::new(seg_n),
            &vec![seg_o; len],
        ))
    }
    fn info(seq: u32) -> SegmentInfo {
        SegmentInfo {
            src: UnicastAddress::new(0x0003),
            dst: Address::from(0x0001),
            seq: SequenceNumber::new(seq).unwrap(),
            iv_index: IVIndex(0),
            net_key_index: NetKeyIndex(0),
            ttl: TTL::new(4),
            local_dst: true,
        }
    }
    #[test]
    fn test_block_ack_bits_and_completion() {
        let mut lower = LowerTransport::new();
        let mut scheduler = Scheduler::new();
        let config = StackConfig::default();
        let now = Instant::now();
        for (seg_o, seq) in [(0_u8, 10_u32), (2, 12), (3, 13)].iter() {
            let outcome = lower
                .receive_segment(info(*seq), &segment(10, *seg_o, 3, 12), now, &config, &mut scheduler)
                .unwrap();
            assert!(matches!(outcome, SegmentOutcome::Stored));
        }
        let src = UnicastAddress::new(0x0003);
        assert_eq!(lower.incoming(src).unwrap().block_ack(), BlockAck(0b1101));
        assert!(scheduler.is_scheduled(&TimerKey::Incomplete(src)));
        assert!(scheduler.is_scheduled(&TimerKey::BlockAck(src)));
        match lower
            .receive_segment(info(11), &segment(10, 1, 3, 12), now, &config, &mut scheduler)
            .unwrap()
        {
            SegmentOutcome::Complete {
                upper_pdu,
                seq_auth,
                ack,
                ..
            } => {
                assert_eq!(upper_pdu.len(), 48);
                assert_eq!(seq_auth.first_seq().value(), 10);
                assert_eq!(ack.unwrap().ack.block_ack, BlockAck(0b1111));
            }
            other => panic!("expected complete, got {:?}", other),
        }
        assert!(scheduler.is_empty());
        // Late duplicate re-sends the full ack.
        match lower
            .receive_segment(info(12), &segment(10, 2, 3, 12), now, &config, &mut scheduler)
            .unwrap()
        {
            SegmentOutcome::AlreadyComplete { ack } => {
                assert_eq!(ack.unwrap().ack.block_ack, BlockAck(0b1111))
            }
            other => panic!("expected already complete, got {:?}", other),
        }
    }
    #[test]
    fn test_stale_seq_auth_ignored() {
        let mut lower = LowerTransport::new();
        let mut scheduler = Scheduler::new();
        let config = StackConfig::default();
        let now = Instant::now();
        lower
            .receive_segment(info(20), &segment(20, 0, 1, 12), now, &config, &mut scheduler)
            .unwrap();
        let src = UnicastAddress::new(0x0003);
        let before = lower.incoming(src).unwrap().block_ack();
        let outcome = lower
            .receive_segment(info(21), &segment(5, 1, 1, 4), now, &config, &mut scheduler)
            .unwrap();
        assert!(matches!(outcome, SegmentOutcome::Ignored));
        assert_eq!(lower.incoming(src).unwrap().block_ack(), before);
        assert_eq!(lower.last_seq_auth(src).unwrap().first_seq().value(), 20);
    }
    #[test]
    fn test_duplicate_segment_restarts_timers() {
        let mut lower = LowerTransport::new();
        let mut scheduler = Scheduler::new();
        let config = StackConfig::default();
        let src = UnicastAddress::new(0x0003);
        let t0 = Instant::now();
        lower
            .receive_segment(info(40), &segment(40, 0, 2, 12), t0, &config, &mut scheduler)
            .unwrap();
        assert_eq!(
            scheduler.deadline(&TimerKey::Incomplete(src)),
            Some(t0 + Duration::from_secs(10))
        );
        // Ack timer already fired once.
        assert!(scheduler.cancel(&TimerKey::BlockAck(src)));

        let later = t0 + Duration::from_secs(6);
        let outcome = lower
            .receive_segment(info(42), &segment(40, 0, 2, 12), later, &config, &mut scheduler)
            .unwrap();
        assert!(matches!(outcome, SegmentOutcome::Stored));
        assert_eq!(
            scheduler.deadline(&TimerKey::Incomplete(src)),
            Some(t0 + Duration::from_secs(16))
        );
        assert_eq!(
            scheduler.deadline(&TimerKey::BlockAck(src)),
            Some(later + config.ack_timeout(TTL::new(4)))
        );
        assert_eq!(lower.incoming(src).unwrap().block_ack(), BlockAck(0b1));
    }
    #[test]
    fn test_malformed_segment_keeps_state() {
        let mut lower = LowerTransport::new();
        let mut scheduler = Scheduler::new();
        let config = StackConfig::default();
        let now = Instant::now();
        lower
            .receive_segment(info(30), &segment(30, 0, 2, 12), now, &config, &mut scheduler)
            .unwrap();
        // Non-final segment shorter than 12 bytes.
        assert!(lower
            .receive_segment(info(31), &segment(30, 1, 2, 5), now, &config, &mut scheduler)
            .is_err());
        // SegN disagreeing with the buffer.
        assert!(lower
            .receive_segment(info(32), &segment(30, 1, 3, 12), now, &config, &mut scheduler)
            .is_err());
        let src = UnicastAddress::new(0x0003);
        assert_eq!(lower.incoming(src).unwrap().block_ack(), BlockAck(0b1));
    }
}
