//! Synchronous message dispatcher. Owns the per-destination `MessageState` table, the segment
//! reassembly buffers and every timer. The replay cache lives in the directory so it is saved
//! with it. Frames, send requests and timer polls are processed one at a time and results are
//! reported as [`StatusEvent`]s.
use crate::access::{self, Opcode, SigOpcode};
use crate::address::{Address, UnicastAddress};
use crate::control::Ack;
use crate::directory::NodeDirectory;
use crate::lower::{self, BlockAck, SeqZero, SegO, SZMIC};
use crate::net::PDUType;
use crate::scheduler::Scheduler;
use crate::segmenter::LowerHeader;
use crate::stack::bearer::TransportBearer;
use crate::stack::events::{DecryptionFailure, StackEvent, StatusEvent, UnknownPdu};
use crate::stack::messages::{Message, OutgoingMessage};
use crate::stack::segments::{AckTarget, LowerTransport, SegmentInfo, SegmentOutcome, TimerKey};
use crate::stack::state::{apply_status, MessageState, PendingTransaction, StateKind};
use crate::stack::{
    DecryptedNetworkPDU, RecvError, SendError, StackConfig, StackInternals, UpperTransportHeader,
};
use crate::mesh::TTL;
use slog::{debug, o, trace, warn, Logger};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

pub struct MeshDispatcher<D: NodeDirectory, B: TransportBearer> {
    internals: StackInternals<D>,
    bearer: B,
    states: BTreeMap<Address, MessageState>,
    lower: LowerTransport,
    scheduler: Scheduler<TimerKey, Instant>,
    stack_events: VecDeque<StackEvent>,
    events: Vec<StatusEvent>,
    logger: Logger,
}
impl<D: NodeDirectory, B: TransportBearer> MeshDispatcher<D, B> {
    pub fn new(directory: D, bearer: B, config: StackConfig) -> Self {
        Self {
            internals: StackInternals::new(directory, config),
            bearer,
            states: BTreeMap::new(),
            lower: LowerTransport::new(),
            scheduler: Scheduler::new(),
            stack_events: VecDeque::new(),
            events: Vec::new(),
            logger: Logger::root(slog::Discard, o!()),
        }
    }
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }
    pub fn directory(&self) -> &D {
        self.internals.directory()
    }
    pub fn directory_mut(&mut self) -> &mut D {
        self.internals.directory_mut()
    }
    pub fn into_directory(self) -> D {
        self.internals.into_directory()
    }
    pub fn bearer(&self) -> &B {
        &self.bearer
    }
    pub fn bearer_mut(&mut self) -> &mut B {
        &mut self.bearer
    }
    pub fn config(&self) -> &StackConfig {
        self.internals.config()
    }
    /// Kind of the state kept for `address`, if any.
    #[must_use]
    pub fn state_kind(&self, address: Address) -> Option<StateKind> {
        self.states.get(&address).map(|state| state.kind)
    }
    /// Puts `address` in state `kind` without sending anything, so statuses from it are parsed
    /// with that kind's table. Used when the request was sent by an earlier session.
    pub fn expect_responses(&mut self, address: Address, kind: StateKind) {
        self.states.entry(address).or_default().kind = kind;
    }
    /// Status events reported since the last call.
    pub fn drain_events(&mut self) -> Vec<StatusEvent> {
        core::mem::take(&mut self.events)
    }
    /// Earliest timer deadline. The driver should call `poll_timers` once it passes.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }
    /// Builds `message` through every layer and hands its frames to the bearer. Validation
    /// errors are returned before anything is transmitted.
    ///
    /// Segmented messages to a unicast destination stay pending until a block acknowledgement
    /// covers every segment. Everything else is reported `MessageSent` right away.
    pub fn send(&mut self, message: &OutgoingMessage, now: Instant) -> Result<(), SendError> {
        let built = self.internals.create_message(message)?;
        let dst = built.dst;
        self.scheduler.cancel(&TimerKey::Outgoing(dst));
        let state = self.states.entry(dst).or_default();
        state.kind = StateKind::for_message(message);
        state.last_opcode = Some(message.opcode);
        state.pending = None;
        debug!(self.logger, "send"; "dst" => dst.value(), "opcode" => %message.opcode,
            "seq" => built.seq.value(), "segmented" => built.segmented);
        self.execute_send(&built)?;
        if built.segmented && dst.is_unicast() {
            self.scheduler.schedule(
                TimerKey::Outgoing(dst),
                now + self.internals.config().incomplete_timeout,
            );
            if let Some(state) = self.states.get_mut(&dst) {
                state.pending = Some(PendingTransaction {
                    message: built,
                    acked: BlockAck::default(),
                });
            }
        } else {
            self.events.push(StatusEvent::MessageSent { dst });
        }
        self.process_stack_events();
        Ok(())
    }
    /// Hands every network PDU of `message` to the bearer in segment order.
    pub fn execute_send(&mut self, message: &Message) -> Result<(), SendError> {
        let mut pdu_count = 0;
        for frame in message.frames() {
            self.bearer.send_pdu(message.dst, frame)?;
            pdu_count += 1;
        }
        self.events.push(StatusEvent::MessageProcessed {
            dst: message.dst,
            pdu_count,
        });
        Ok(())
    }
    /// Re-frames and resends only the segments `seg_os` of the transaction pending for `dst`.
    pub fn execute_resend(&mut self, dst: Address, seg_os: &[SegO]) -> Result<(), SendError> {
        let mut pending = self
            .states
            .get_mut(&dst)
            .and_then(|state| state.pending.take())
            .ok_or(SendError::NoPendingTransaction)?;
        let result = self.resend_segments(&mut pending.message, seg_os);
        if let Some(state) = self.states.get_mut(&dst) {
            state.pending = Some(pending);
        }
        let pdu_count = result?;
        self.events
            .push(StatusEvent::MessageProcessed { dst, pdu_count });
        Ok(())
    }
    fn resend_segments(&mut self, message: &mut Message, seg_os: &[SegO]) -> Result<usize, SendError> {
        for seg_o in seg_os {
            let frame = self.internals.reframe_segment(message, seg_o.value())?;
            trace!(self.logger, "resend segment"; "dst" => message.dst.value(), "seg_o" => seg_o.value());
            self.bearer.send_pdu(message.dst, &frame)?;
        }
        Ok(seg_os.len())
    }
    /// Forgets the state, pending transaction and reassembly buffer for `address`.
    pub fn reset_state(&mut self, address: Address) {
        self.states.remove(&address);
        self.scheduler.cancel(&TimerKey::Outgoing(address));
        if let Address::Unicast(unicast) = address {
            self.lower.reset(unicast);
            self.scheduler.cancel(&TimerKey::Incomplete(unicast));
            self.scheduler.cancel(&TimerKey::BlockAck(unicast));
        }
    }
    /// Fires every timer whose deadline is `<= now`.
    pub fn poll_timers(&mut self, now: Instant) {
        while let Some(key) = self.scheduler.pop_ready(now) {
            self.stack_events.push_back(StackEvent::TimerExpired(key));
        }
        self.process_stack_events();
    }
    fn process_stack_events(&mut self) {
        while let Some(event) = self.stack_events.pop_front() {
            match event {
                StackEvent::TimerExpired(TimerKey::Incomplete(src)) => {
                    debug!(self.logger, "incomplete timer expired"; "src" => src.value());
                    self.lower.expire(src);
                    self.scheduler.cancel(&TimerKey::BlockAck(src));
                    self.fail_transaction(src.into());
                }
                StackEvent::TimerExpired(TimerKey::BlockAck(src)) => {
                    // Ack before a reassembly expiry queued behind it drops the buffer.
                    self.stack_events
                        .push_front(StackEvent::SendBlockAck { src });
                }
                StackEvent::TimerExpired(TimerKey::Outgoing(dst)) => {
                    debug!(self.logger, "outgoing transaction timed out"; "dst" => dst.value());
                    self.fail_transaction(dst);
                }
                StackEvent::SendBlockAck { src } => {
                    if let Some(target) = self.lower.block_ack_for(src) {
                        if let Err(e) = self.send_ack(src, target) {
                            warn!(self.logger, "block ack send failed"; "dst" => src.value(), "error" => %e);
                        }
                    }
                }
            }
        }
    }
    fn fail_transaction(&mut self, address: Address) {
        self.states.insert(address, MessageState::default());
        self.events.push(StatusEvent::TransactionFailed {
            address,
            incomplete_timer_expired: true,
        });
    }
    fn send_ack(&mut self, dst: UnicastAddress, target: AckTarget) -> Result<(), SendError> {
        let ttl = if target.ttl.value() == 0 {
            TTL::new(0)
        } else {
            self.internals.default_ttl()
        };
        let message = self.internals.create_control(
            dst,
            target.net_key_index,
            ttl,
            Ack::OPCODE,
            &target.ack.pack(),
        )?;
        for frame in message.frames() {
            self.bearer.send_pdu(message.dst, frame)?;
        }
        debug!(self.logger, "block ack sent"; "dst" => dst.value(),
            "seq_zero" => target.ack.seq_zero.value(), "block_ack" => target.ack.block_ack.0);
        self.events.push(StatusEvent::BlockAcknowledgementSent {
            dst,
            seq_zero: target.ack.seq_zero,
            block_ack: target.ack.block_ack,
        });
        Ok(())
    }
    /// Handles one frame (`pdu_type || network pdu`) from the bearer.
    pub fn receive(&mut self, frame: &[u8], now: Instant) -> Result<(), RecvError> {
        let result = self.receive_frame(frame, now);
        if let Err(e) = &result {
            debug!(self.logger, "frame dropped"; "reason" => %e);
        }
        self.process_stack_events();
        result
    }
    fn receive_frame(&mut self, frame: &[u8], now: Instant) -> Result<(), RecvError> {
        let (&first, data) = frame
            .split_first()
            .ok_or(RecvError::MalformedNetworkPDU)?;
        let pdu_type = PDUType::new(first).ok_or(RecvError::BadPduType)?;
        let failure = match pdu_type {
            PDUType::Network => DecryptionFailure::Network,
            PDUType::ProxyConfiguration => DecryptionFailure::ProxyConfiguration,
            PDUType::MeshBeacon | PDUType::Provisioning => {
                return Err(RecvError::UnsupportedPduType)
            }
        };
        let decrypted = match self.internals.decrypt_network_pdu(pdu_type, data) {
            Ok(decrypted) => decrypted,
            Err(RecvError::NoMatchingNetKey) => {
                warn!(self.logger, "network decryption failed"; "pdu_type" => first);
                self.events
                    .push(StatusEvent::DecryptionFailed { src: None, failure });
                return Err(RecvError::NoMatchingNetKey);
            }
            Err(e) => return Err(e),
        };
        let header = decrypted.pdu.header;
        if self.internals.directory().is_local(header.src) {
            return Err(RecvError::OwnSrc);
        }
        let directory = self.internals.directory_mut();
        if directory
            .replay_cache_mut()
            .replay_check(header.src, decrypted.iv_index, header.seq)
        {
            return Err(RecvError::OldSeq);
        }
        if let Some(node) = directory.provisioned_node_mut(header.src) {
            node.set_sequence_number(header.seq);
        }
        trace!(self.logger, "network pdu"; "src" => header.src.value(),
            "dst" => decrypted.pdu.dst.value(), "seq" => header.seq.value(), "ctl" => header.ctl.0);
        if pdu_type == PDUType::ProxyConfiguration {
            return self.handle_proxy_config(&decrypted);
        }
        self.handle_lower(&decrypted, now)
    }
    fn handle_lower(&mut self, decrypted: &DecryptedNetworkPDU, now: Instant) -> Result<(), RecvError> {
        let header = decrypted.pdu.header;
        let src = header.src;
        let dst = decrypted.pdu.dst;
        let lower_pdu = lower::PDU::from_bytes(decrypted.pdu.transport_pdu(), header.ctl)
            .ok_or(RecvError::MalformedLowerPDU)?;
        self.states.entry(src.into()).or_default();
        let local_dst = dst
            .unicast()
            .map_or(false, |dst| self.internals.directory().is_local(dst));
        match lower_pdu {
            lower::PDU::UnsegmentedAccess(pdu) => self.handle_access(
                UpperTransportHeader {
                    src,
                    dst,
                    seq: header.seq,
                    iv_index: decrypted.iv_index,
                    net_key_index: decrypted.net_key_index,
                    akf: pdu.akf(),
                    aid: pdu.aid(),
                    szmic: SZMIC(false),
                },
                pdu.upper_pdu(),
                local_dst,
            ),
            lower::PDU::UnsegmentedControl(pdu) => {
                if pdu.opcode() == Ack::OPCODE {
                    let ack = Ack::try_from_pdu(&pdu).map_err(|_| RecvError::MalformedLowerPDU)?;
                    self.handle_ack(src, ack, now);
                } else {
                    self.unknown_pdu(src, UnknownPdu::Control(pdu.opcode()));
                }
                Ok(())
            }
            lower::PDU::SegmentedAccess(_) | lower::PDU::SegmentedControl(_) => {
                let segment = lower_pdu
                    .segmented()
                    .ok_or(RecvError::MalformedLowerPDU)?;
                let info = SegmentInfo {
                    src,
                    dst,
                    seq: header.seq,
                    iv_index: decrypted.iv_index,
                    net_key_index: decrypted.net_key_index,
                    ttl: header.ttl,
                    local_dst,
                };
                let outcome = self.lower.receive_segment(
                    info,
                    &segment,
                    now,
                    self.internals.config(),
                    &mut self.scheduler,
                )?;
                self.handle_segment_outcome(info, outcome)
            }
        }
    }
    fn handle_segment_outcome(
        &mut self,
        info: SegmentInfo,
        outcome: SegmentOutcome,
    ) -> Result<(), RecvError> {
        match outcome {
            SegmentOutcome::Stored => Ok(()),
            SegmentOutcome::Ignored => {
                debug!(self.logger, "stale segment ignored"; "src" => info.src.value(), "seq" => info.seq.value());
                Ok(())
            }
            SegmentOutcome::AlreadyComplete { ack } => {
                if let Some(target) = ack {
                    self.try_send_ack(info.src, target);
                }
                Ok(())
            }
            SegmentOutcome::Complete {
                upper_pdu,
                header,
                seq_auth,
                ack,
            } => {
                if let Some(target) = ack {
                    self.try_send_ack(info.src, target);
                }
                match header.lower_header() {
                    LowerHeader::Access { akf, aid, szmic } => self.handle_access(
                        UpperTransportHeader {
                            src: info.src,
                            dst: info.dst,
                            seq: seq_auth.first_seq(),
                            iv_index: info.iv_index,
                            net_key_index: info.net_key_index,
                            akf,
                            aid,
                            szmic,
                        },
                        &upper_pdu,
                        info.local_dst,
                    ),
                    LowerHeader::Control(opcode) => {
                        self.unknown_pdu(info.src, UnknownPdu::Control(opcode));
                        Ok(())
                    }
                }
            }
        }
    }
    fn try_send_ack(&mut self, dst: UnicastAddress, target: AckTarget) {
        if let Err(e) = self.send_ack(dst, target) {
            warn!(self.logger, "block ack send failed"; "dst" => dst.value(), "error" => %e);
        }
    }
    fn unknown_pdu(&mut self, src: UnicastAddress, pdu: UnknownPdu) {
        debug!(self.logger, "unknown pdu"; "src" => src.value(), "pdu" => ?pdu);
        self.events
            .push(StatusEvent::UnknownPduReceived { src, pdu });
    }
    fn handle_access(
        &mut self,
        header: UpperTransportHeader,
        upper_pdu: &[u8],
        local_dst: bool,
    ) -> Result<(), RecvError> {
        let src = header.src;
        let (payload, app_key_index) = match self.internals.decrypt_upper(&header, upper_pdu) {
            Ok(decrypted) => decrypted,
            Err(RecvError::NoMatchingAppKey) => {
                warn!(self.logger, "upper transport decryption failed"; "src" => src.value(), "akf" => header.akf.0);
                self.events.push(StatusEvent::DecryptionFailed {
                    src: Some(src),
                    failure: DecryptionFailure::UpperTransport { akf: header.akf.0 },
                });
                return Err(RecvError::NoMatchingAppKey);
            }
            Err(e) => return Err(e),
        };
        trace!(self.logger, "access pdu"; "src" => src.value(), "app_key_index" => ?app_key_index);
        let (opcode, parameters) = match access::decode(payload.payload()) {
            Ok(decoded) => decoded,
            Err(_) => {
                self.unknown_pdu(src, UnknownPdu::BadOpcode);
                return Err(RecvError::BadOpcode);
            }
        };
        let (kind, last_opcode) = self
            .states
            .get(&Address::from(src))
            .map_or((StateKind::NoOperation, None), |state| {
                (state.kind, state.last_opcode)
            });
        match kind.parse_status(opcode, parameters) {
            None => {
                self.unknown_pdu(src, UnknownPdu::Access(opcode));
                Ok(())
            }
            Some(Err(e)) => Err(RecvError::MalformedStatus(e)),
            Some(Ok(status)) => {
                if local_dst {
                    apply_status(self.internals.directory_mut(), src, &status, last_opcode);
                }
                self.events.push(StatusEvent::MessageReceived {
                    src,
                    dst: header.dst,
                    status,
                });
                Ok(())
            }
        }
    }
    /// Proxy configuration payloads are `opcode || parameters` straight from the network layer.
    fn handle_proxy_config(&mut self, decrypted: &DecryptedNetworkPDU) -> Result<(), RecvError> {
        let src = decrypted.pdu.header.src;
        let (&opcode, parameters) = decrypted
            .pdu
            .transport_pdu()
            .split_first()
            .ok_or(RecvError::MalformedLowerPDU)?;
        let status = StateKind::ProxyConfig
            .parse_status(Opcode::SIG(SigOpcode::SingleOctet(opcode)), parameters);
        match status {
            Some(Ok(status)) => {
                self.events.push(StatusEvent::MessageReceived {
                    src,
                    dst: decrypted.pdu.dst,
                    status,
                });
                Ok(())
            }
            Some(Err(e)) => Err(RecvError::MalformedStatus(e)),
            None => {
                self.unknown_pdu(src, UnknownPdu::Proxy(opcode));
                Ok(())
            }
        }
    }
    fn handle_ack(&mut self, src: UnicastAddress, ack: Ack, now: Instant) {
        self.events.push(StatusEvent::BlockAcknowledgementReceived {
            src,
            seq_zero: ack.seq_zero,
            block_ack: ack.block_ack,
        });
        let address = Address::from(src);
        let incomplete_timeout = self.internals.config().incomplete_timeout;
        let state = match self.states.get_mut(&address) {
            Some(state) => state,
            None => return,
        };
        let pending = match &mut state.pending {
            Some(pending) if SeqZero::from(pending.message.seq) == ack.seq_zero => pending,
            _ => {
                debug!(self.logger, "block ack without transaction"; "src" => src.value(),
                    "seq_zero" => ack.seq_zero.value());
                return;
            }
        };
        let seg_n = match pending.message.seg_n() {
            Some(seg_n) => seg_n,
            None => return,
        };
        if ack.block_ack.is_empty() {
            debug!(self.logger, "transaction cancelled by receiver"; "dst" => src.value());
            self.scheduler.cancel(&TimerKey::Outgoing(address));
            self.states.insert(address, MessageState::default());
            self.events.push(StatusEvent::TransactionFailed {
                address,
                incomplete_timer_expired: false,
            });
            return;
        }
        pending.acked = BlockAck(pending.acked.0 | ack.block_ack.0);
        if pending.acked.all_acked(seg_n) {
            state.pending = None;
            self.scheduler.cancel(&TimerKey::Outgoing(address));
            self.events.push(StatusEvent::MessageSent { dst: address });
            return;
        }
        let missing: Vec<SegO> = pending.acked.unacked(seg_n).collect();
        self.scheduler
            .schedule(TimerKey::Outgoing(address), now + incomplete_timeout);
        if let Err(e) = self.execute_resend(address, &missing) {
            warn!(self.logger, "resend failed"; "dst" => src.value(), "error" => %e);
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlOpcode;
    use crate::crypto::aes::MicSize;
    use crate::crypto::key::{AppKey, DevKey, NetKey};
    use crate::directory::{MeshNetwork, ProvisionedNode};
    use crate::lower::OBO;
    use crate::mesh::{AppKeyIndex, CompanyID, IVIndex, NetKeyIndex, SequenceNumber};
    use crate::models::config::ConfigOpcode;
    use crate::models::MeshStatus;
    use crate::segmenter::SegmentError;
    use crate::stack::bearer::RecordingBearer;
    use core::time::Duration;

    const NET_KEY: &str = "7dd7364cd842ad18c17c2b820c84c3d6";
    const APP_KEY: &str = "63964771734fbd76e3b40519d1d94a48";
    const PEER_DEV_KEY: [u8; 16] = [9; 16];

    type TestDispatcher = MeshDispatcher<MeshNetwork, RecordingBearer>;

    fn network(local: u16, peer: u16, app_key: &str) -> MeshNetwork {
        let provisioner = ProvisionedNode::new(
            UnicastAddress::new(local),
            1,
            DevKey::new_bytes([local as u8; 16]),
        );
        let mut network = MeshNetwork::new(
            provisioner,
            NetKey::from_hex(NET_KEY).unwrap(),
            IVIndex(0x1234_5678),
        );
        network.add_app_key(
            AppKeyIndex(0),
            AppKey::from_hex(app_key).unwrap(),
            NetKeyIndex(0),
        );
        network.add_node(ProvisionedNode::new(
            UnicastAddress::new(peer),
            1,
            DevKey::new_bytes(PEER_DEV_KEY),
        ));
        network
    }
    fn dispatcher(local: u16, peer: u16) -> TestDispatcher {
        MeshDispatcher::new(
            network(local, peer, APP_KEY),
            RecordingBearer::new(),
            StackConfig::default(),
        )
    }
    fn vendor_message() -> OutgoingMessage {
        // 3 octet opcode + 13 parameter bytes = 16 byte access PDU.
        OutgoingMessage::vendor(
            Address::from(0x0001),
            AppKeyIndex(0),
            Opcode::vendor(0x05, CompanyID(0x0059)),
            vec![0xAA; 13],
            true,
        )
    }
    fn frames(dispatcher: &mut TestDispatcher) -> Vec<Vec<u8>> {
        dispatcher
            .bearer_mut()
            .take_frames()
            .into_iter()
            .map(|f| f.frame)
            .collect()
    }
    fn block_acks_sent(events: &[StatusEvent]) -> Vec<BlockAck> {
        events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::BlockAcknowledgementSent { block_ack, .. } => Some(*block_ack),
                _ => None,
            })
            .collect()
    }
    fn failures(events: &[StatusEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, StatusEvent::TransactionFailed { .. }))
            .count()
    }

    #[test]
    fn test_segmented_end_to_end() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = dispatcher(0x0001, 0x0003);
        sender.send(&vendor_message(), now).unwrap();
        let sent = frames(&mut sender);
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sender.drain_events(),
            vec![StatusEvent::MessageProcessed {
                dst: Address::from(0x0001),
                pdu_count: 2
            }]
        );
        for frame in &sent {
            receiver.receive(frame, now).unwrap();
        }
        let events = receiver.drain_events();
        assert_eq!(block_acks_sent(&events), vec![BlockAck(0b11)]);
        assert!(events.iter().any(|e| matches!(e,
            StatusEvent::MessageReceived { src, .. } if *src == UnicastAddress::new(0x0003))));
        assert_eq!(receiver.next_deadline(), None);

        let acks = frames(&mut receiver);
        assert_eq!(acks.len(), 1);
        sender.receive(&acks[0], now).unwrap();
        let events = sender.drain_events();
        assert!(events.contains(&StatusEvent::MessageSent {
            dst: Address::from(0x0001)
        }));
        assert_eq!(sender.next_deadline(), None);
        // Every network PDU took its own sequence number.
        assert_eq!(
            sender.directory().provisioner().sequence_number(),
            SequenceNumber::new(2).unwrap()
        );
        assert_eq!(
            receiver
                .directory()
                .provisioned_node(UnicastAddress::new(0x0003))
                .unwrap()
                .sequence_number(),
            SequenceNumber::new(1).unwrap()
        );
    }
    #[test]
    fn test_incomplete_timer() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = dispatcher(0x0001, 0x0003);
        sender.send(&vendor_message(), now).unwrap();
        let sent = frames(&mut sender);
        receiver.receive(&sent[0], now).unwrap();
        assert!(receiver.drain_events().is_empty());

        receiver.poll_timers(now + Duration::from_secs(10));
        let events = receiver.drain_events();
        assert_eq!(block_acks_sent(&events), vec![BlockAck(0b01)]);
        assert_eq!(failures(&events), 1);
        assert!(events.contains(&StatusEvent::TransactionFailed {
            address: Address::from(0x0003),
            incomplete_timer_expired: true
        }));
        assert_eq!(
            receiver.state_kind(Address::from(0x0003)),
            Some(StateKind::NoOperation)
        );
        receiver.poll_timers(now + Duration::from_secs(30));
        assert_eq!(failures(&receiver.drain_events()), 0);

        // The sender never got its ack either.
        sender.poll_timers(now + Duration::from_secs(10));
        assert_eq!(failures(&sender.drain_events()), 1);
        assert_eq!(
            sender.state_kind(Address::from(0x0001)),
            Some(StateKind::NoOperation)
        );
    }
    #[test]
    fn test_reset_state() {
        let now = Instant::now();
        let peer = Address::from(0x0001);
        let mut sender = dispatcher(0x0003, 0x0001);
        sender.send(&vendor_message(), now).unwrap();
        assert_eq!(
            sender.state_kind(peer),
            Some(StateKind::VendorModelAcked(CompanyID(0x0059)))
        );
        assert!(sender.next_deadline().is_some());

        sender.reset_state(peer);
        assert_eq!(sender.state_kind(peer), None);
        assert_eq!(sender.next_deadline(), None);
        assert_eq!(
            sender.execute_resend(peer, &[SegO::new(0)]),
            Err(SendError::NoPendingTransaction)
        );
        sender.poll_timers(now + Duration::from_secs(10));
        assert_eq!(failures(&sender.drain_events()), 0);

        sender.expect_responses(peer, StateKind::Generic);
        assert_eq!(sender.state_kind(peer), Some(StateKind::Generic));
    }
    #[test]
    fn test_partial_ack_resends_missing_segments() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = dispatcher(0x0001, 0x0003);
        sender.send(&vendor_message(), now).unwrap();
        let sent = frames(&mut sender);
        receiver.receive(&sent[0], now).unwrap();
        receiver.poll_timers(now + Duration::from_millis(500));
        assert_eq!(
            block_acks_sent(&receiver.drain_events()),
            vec![BlockAck(0b01)]
        );
        let partial = frames(&mut receiver);
        assert_eq!(partial.len(), 1);

        sender.drain_events();
        sender.receive(&partial[0], now).unwrap();
        let resent = frames(&mut sender);
        assert_eq!(resent.len(), 1);
        assert_ne!(resent[0], sent[1]);
        assert!(sender.drain_events().contains(&StatusEvent::MessageProcessed {
            dst: Address::from(0x0001),
            pdu_count: 1
        }));

        receiver.receive(&resent[0], now).unwrap();
        let events = receiver.drain_events();
        assert_eq!(block_acks_sent(&events), vec![BlockAck(0b11)]);
        let full = frames(&mut receiver);
        sender.receive(&full[0], now).unwrap();
        assert!(sender.drain_events().contains(&StatusEvent::MessageSent {
            dst: Address::from(0x0001)
        }));
    }
    #[test]
    fn test_zero_block_ack_fails_transaction() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        sender.send(&vendor_message(), now).unwrap();
        sender.drain_events();
        let mut peer = StackInternals::new(
            network(0x0001, 0x0003, APP_KEY),
            StackConfig::default(),
        );
        let cancel = Ack {
            obo: OBO(false),
            seq_zero: SeqZero::from(SequenceNumber::new(0).unwrap()),
            block_ack: BlockAck(0),
        };
        let message = peer
            .create_control(
                UnicastAddress::new(0x0003),
                NetKeyIndex(0),
                TTL::new(5),
                ControlOpcode::Ack,
                &cancel.pack(),
            )
            .unwrap();
        let frame = message.frames().next().unwrap().to_vec();
        sender.receive(&frame, now).unwrap();
        assert!(sender
            .drain_events()
            .contains(&StatusEvent::TransactionFailed {
                address: Address::from(0x0001),
                incomplete_timer_expired: false
            }));
        assert_eq!(sender.next_deadline(), None);
    }
    #[test]
    fn test_status_updates_directory() {
        let now = Instant::now();
        let mut provisioner = dispatcher(0x0003, 0x0001);
        let mut node = dispatcher(0x0001, 0x0003);
        provisioner
            .send(
                &OutgoingMessage::config(
                    UnicastAddress::new(0x0001),
                    ConfigOpcode::DefaultTTLGet.opcode(),
                    Vec::new(),
                ),
                now,
            )
            .unwrap();
        assert!(provisioner.drain_events().contains(&StatusEvent::MessageSent {
            dst: Address::from(0x0001)
        }));
        assert_eq!(
            provisioner.state_kind(Address::from(0x0001)),
            Some(StateKind::Config)
        );
        node.send(
            &OutgoingMessage::config(
                UnicastAddress::new(0x0003),
                ConfigOpcode::DefaultTTLStatus.opcode(),
                vec![7],
            ),
            now,
        )
        .unwrap();
        let status = frames(&mut node);
        provisioner.receive(&status[0], now).unwrap();
        assert!(provisioner
            .drain_events()
            .iter()
            .any(|e| matches!(e, StatusEvent::MessageReceived { .. })));
        assert_eq!(
            provisioner
                .directory()
                .provisioned_node(UnicastAddress::new(0x0001))
                .unwrap()
                .default_ttl(),
            TTL::new(7)
        );
    }
    #[test]
    fn test_replay_and_wrong_app_key() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = MeshDispatcher::new(
            network(0x0001, 0x0003, "00112233445566778899aabbccddeeff"),
            RecordingBearer::new(),
            StackConfig::default(),
        );
        let on_off = OutgoingMessage::generic(
            Address::from(0x0001),
            AppKeyIndex(0),
            Opcode::sig(0x8202).unwrap(),
            vec![0x01, 0x00],
        );
        sender.send(&on_off, now).unwrap();
        assert!(sender.drain_events().contains(&StatusEvent::MessageSent {
            dst: Address::from(0x0001)
        }));
        let sent = frames(&mut sender);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            receiver.receive(&sent[0], now),
            Err(RecvError::NoMatchingAppKey)
        );
        assert_eq!(
            receiver.drain_events(),
            vec![StatusEvent::DecryptionFailed {
                src: Some(UnicastAddress::new(0x0003)),
                failure: DecryptionFailure::UpperTransport { akf: true }
            }]
        );
        assert_eq!(receiver.receive(&sent[0], now), Err(RecvError::OldSeq));
        assert!(receiver.drain_events().is_empty());
    }
    #[test]
    fn test_foreign_network_key() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut stranger = MeshDispatcher::new(
            MeshNetwork::new(
                ProvisionedNode::new(UnicastAddress::new(0x0001), 1, DevKey::new_bytes([1; 16])),
                NetKey::new_bytes([0x42; 16]),
                IVIndex(0x1234_5678),
            ),
            RecordingBearer::new(),
            StackConfig::default(),
        );
        sender.send(&vendor_message(), now).unwrap();
        let sent = frames(&mut sender);
        assert_eq!(
            stranger.receive(&sent[0], now),
            Err(RecvError::NoMatchingNetKey)
        );
        assert_eq!(
            stranger.drain_events(),
            vec![StatusEvent::DecryptionFailed {
                src: None,
                failure: DecryptionFailure::Network
            }]
        );
        assert_eq!(stranger.receive(&[0x01, 0x00], now), Err(RecvError::UnsupportedPduType));
    }
    #[test]
    fn test_replay_rejected_after_reload() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = dispatcher(0x0001, 0x0003);
        sender.send(&vendor_message(), now).unwrap();
        let sent = frames(&mut sender);
        for frame in &sent {
            receiver.receive(frame, now).unwrap();
        }
        receiver.drain_events();

        let mut restarted = MeshDispatcher::new(
            receiver.into_directory(),
            RecordingBearer::new(),
            StackConfig::default(),
        );
        for frame in &sent {
            assert_eq!(restarted.receive(frame, now), Err(RecvError::OldSeq));
        }
        assert!(restarted.drain_events().is_empty());
        assert!(restarted.bearer().frames().is_empty());
    }
    #[test]
    fn test_app_key_selected_by_aid() {
        const OTHER_APP_KEY: &str = "00112233445566778899aabbccddeeff";
        let now = Instant::now();
        let mut two_keys = network(0x0001, 0x0003, OTHER_APP_KEY);
        two_keys.add_app_key(
            AppKeyIndex(1),
            AppKey::from_hex(APP_KEY).unwrap(),
            NetKeyIndex(0),
        );
        let mut receiver =
            MeshDispatcher::new(two_keys, RecordingBearer::new(), StackConfig::default());
        let aids: Vec<_> = receiver
            .directory()
            .application_keys(NetKeyIndex(0))
            .iter()
            .map(|app| app.aid)
            .collect();
        assert_eq!(aids.len(), 2);
        assert_ne!(aids[0], aids[1]);

        let on_off_status = |app_key_index| {
            OutgoingMessage::generic(
                Address::from(0x0001),
                app_key_index,
                Opcode::sig(0x8204).unwrap(),
                vec![0x01],
            )
        };
        // Key at index 1 of the receiver, behind a key with another AID.
        let mut sender = dispatcher(0x0003, 0x0001);
        sender.send(&on_off_status(AppKeyIndex(0)), now).unwrap();
        receiver.receive(&frames(&mut sender)[0], now).unwrap();
        assert!(receiver.drain_events().iter().any(|e| matches!(e,
            StatusEvent::MessageReceived { status: MeshStatus::GenericOnOff(_), .. })));

        // AID matches none of the receiver's keys.
        let mut stranger = MeshDispatcher::new(
            network(0x0003, 0x0001, "0123456789abcdef0123456789abcdef"),
            RecordingBearer::new(),
            StackConfig::default(),
        );
        stranger
            .directory_mut()
            .provisioner_mut()
            .set_sequence_number(SequenceNumber::new(100).unwrap());
        let keys_before = (
            receiver.directory().network_keys().clone(),
            receiver.directory().app_key_map().clone(),
        );
        stranger.send(&on_off_status(AppKeyIndex(0)), now).unwrap();
        assert_eq!(
            receiver.receive(&frames(&mut stranger)[0], now),
            Err(RecvError::NoMatchingAppKey)
        );
        assert_eq!(
            receiver.drain_events(),
            vec![StatusEvent::DecryptionFailed {
                src: Some(UnicastAddress::new(0x0003)),
                failure: DecryptionFailure::UpperTransport { akf: true }
            }]
        );
        assert_eq!(
            (
                receiver.directory().network_keys().clone(),
                receiver.directory().app_key_map().clone(),
            ),
            keys_before
        );
    }
    /// Sends an access PDU of `len` bytes and feeds it (and the acks) between the two nodes.
    /// Returns how many network PDUs it took.
    fn round_trip(
        sender: &mut TestDispatcher,
        receiver: &mut TestDispatcher,
        len: usize,
        mic_size: MicSize,
        now: Instant,
    ) -> usize {
        let (opcode, parameters) = match len {
            1 => (Opcode::SIG(SigOpcode::SingleOctet(0x01)), Vec::new()),
            2 => (Opcode::sig(0x8201).unwrap(), Vec::new()),
            _ => (
                Opcode::vendor(0x05, CompanyID(0x0059)),
                (0..len - 3).map(|i| i as u8).collect(),
            ),
        };
        let message = OutgoingMessage::vendor(
            Address::from(0x0001),
            AppKeyIndex(0),
            opcode,
            parameters.clone(),
            true,
        )
        .with_mic_size(mic_size);
        sender.send(&message, now).unwrap();
        let sent = frames(sender);
        for frame in &sent {
            receiver.receive(frame, now).unwrap();
        }
        let received = receiver.drain_events().into_iter().any(|e| match e {
            StatusEvent::MessageReceived {
                status: MeshStatus::Vendor(status),
                ..
            } => status.parameters == parameters,
            StatusEvent::UnknownPduReceived {
                pdu: UnknownPdu::Access(received),
                ..
            } => len < 3 && received == opcode,
            _ => false,
        });
        assert!(received, "access pdu of {} bytes lost", len);
        for ack in frames(receiver) {
            sender.receive(&ack, now).unwrap();
        }
        assert!(
            sender.drain_events().contains(&StatusEvent::MessageSent {
                dst: Address::from(0x0001)
            }),
            "access pdu of {} bytes never acknowledged",
            len
        );
        sent.len()
    }
    #[test]
    fn test_round_trip_every_length() {
        let now = Instant::now();
        let mut sender = dispatcher(0x0003, 0x0001);
        let mut receiver = dispatcher(0x0001, 0x0003);
        for (mic_size, max_len) in [(MicSize::Small, 380), (MicSize::Big, 376)].iter() {
            for len in 1..=*max_len {
                let pdus = round_trip(&mut sender, &mut receiver, len, *mic_size, now);
                if len <= 11 {
                    assert_eq!(pdus, 1);
                } else {
                    let upper_len = len + mic_size.byte_size();
                    assert_eq!(pdus, (upper_len + 11) / 12, "{} bytes", len);
                }
            }
            assert_eq!(
                round_trip(&mut sender, &mut receiver, *max_len, *mic_size, now),
                32
            );
            let too_long = OutgoingMessage::vendor(
                Address::from(0x0001),
                AppKeyIndex(0),
                Opcode::vendor(0x05, CompanyID(0x0059)),
                vec![0; *max_len - 2],
                true,
            )
            .with_mic_size(*mic_size);
            assert_eq!(
                sender.send(&too_long, now),
                Err(SendError::Segment(SegmentError::TooLong))
            );
        }
        assert_eq!(receiver.next_deadline(), None);
    }
}
