//! Bluetooth Mesh Stack that connects all the layers together.
//! See [`StackInternals`] for the layer pipeline and [`dispatcher::MeshDispatcher`] for the state
//! machine driving it.

pub mod bearer;
pub mod dispatcher;
pub mod events;
#[cfg(feature = "full_stack")]
pub mod full;
pub mod messages;
pub mod segments;
pub mod state;

use crate::access::{self, Opcode, SigOpcode};
use crate::address::{Address, UnicastAddress};
use crate::control::ControlOpcode;
use crate::crypto::aes::MicSize;
use crate::crypto::materials::NetworkSecurityMaterials;
use crate::crypto::nonce::TransportNonceParts;
use crate::crypto::{AID, AKF};
use crate::directory::NodeDirectory;
use crate::lower::{self, SeqZero, SZMIC};
use crate::mesh::{AppKeyIndex, IVIndex, NetKeyIndex, SequenceNumber, CTL, TTL};
use crate::net::{self, PDUType, PrivateHeader, MAX_TRANSPORT_PDU_LEN};
use crate::segmenter::{LowerHeader, SegmentError, Segmenter};
use crate::stack::bearer::BearerError;
use crate::stack::messages::{
    AccessKey, AccessMessage, ControlMessage, Message, MessageBody, MessageKind, OutgoingMessage,
    ProxyConfigMessage,
};
use crate::upper::{AppPayload, EncryptedAppPayload, SecurityMaterials};
use crate::{models::MessagePackError, reassembler::ReassembleError};
use core::fmt::{Display, Formatter};
use core::time::Duration;
use std::collections::BTreeMap;

/// Lower Transport timing and TTL defaults.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct StackConfig {
    /// How long reassembly (and an unacknowledged outgoing transfer) may stall.
    pub incomplete_timeout: Duration,
    pub ack_timer_base: Duration,
    pub ack_timer_per_hop: Duration,
    /// Overrides the local node's default TTL when set.
    pub default_ttl: Option<TTL>,
}
impl Default for StackConfig {
    fn default() -> Self {
        Self {
            incomplete_timeout: Duration::from_secs(10),
            ack_timer_base: Duration::from_millis(150),
            ack_timer_per_hop: Duration::from_millis(50),
            default_ttl: None,
        }
    }
}
impl StackConfig {
    /// `150 + 50 * TTL` milliseconds by default.
    #[must_use]
    pub fn ack_timeout(&self, ttl: TTL) -> Duration {
        self.ack_timer_base + self.ack_timer_per_hop * u32::from(ttl.value())
    }
}
/// Returned when an outgoing message can't be sent for some reason.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum SendError {
    InvalidDestination,
    InvalidAppKeyIndex,
    InvalidNetKeyIndex,
    UnknownNode,
    OutOfSeq,
    Opcode,
    Segment(SegmentError),
    UpperEncrypt,
    NetEncrypt,
    Bearer(BearerError),
    NoPendingTransaction,
}
impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            SendError::InvalidDestination => f.write_str("invalid destination address"),
            SendError::InvalidAppKeyIndex => f.write_str("no application key at that index"),
            SendError::InvalidNetKeyIndex => f.write_str("no network key at that index"),
            SendError::UnknownNode => f.write_str("destination node isn't in the directory"),
            SendError::OutOfSeq => f.write_str("sequence numbers exhausted"),
            SendError::Opcode => f.write_str("opcode can't be encoded"),
            SendError::Segment(e) => write!(f, "segmentation failed: {}", e),
            SendError::UpperEncrypt => f.write_str("upper transport encryption failed"),
            SendError::NetEncrypt => f.write_str("network encryption failed"),
            SendError::Bearer(e) => write!(f, "bearer error: {}", e),
            SendError::NoPendingTransaction => {
                f.write_str("no segmented transaction pending for that address")
            }
        }
    }
}
impl std::error::Error for SendError {}
impl From<SegmentError> for SendError {
    fn from(e: SegmentError) -> Self {
        SendError::Segment(e)
    }
}
impl From<BearerError> for SendError {
    fn from(e: BearerError) -> Self {
        SendError::Bearer(e)
    }
}
/// Returned when an incoming frame can't be received for some reason.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum RecvError {
    BadPduType,
    UnsupportedPduType,
    MalformedNetworkPDU,
    NoMatchingNetKey,
    NoMatchingAppKey,
    UnknownSourceNode,
    OldSeq,
    OwnSrc,
    MalformedLowerPDU,
    MalformedUpperPDU,
    BadOpcode,
    MalformedStatus(MessagePackError),
    Reassemble(ReassembleError),
}
impl Display for RecvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            RecvError::BadPduType => f.write_str("bad pdu type"),
            RecvError::UnsupportedPduType => f.write_str("pdu type not handled by the stack"),
            RecvError::MalformedNetworkPDU => f.write_str("malformed network pdu"),
            RecvError::NoMatchingNetKey => f.write_str("no network key decrypts the pdu"),
            RecvError::NoMatchingAppKey => f.write_str("no application/device key decrypts the pdu"),
            RecvError::UnknownSourceNode => f.write_str("source node isn't in the directory"),
            RecvError::OldSeq => f.write_str("replayed sequence number"),
            RecvError::OwnSrc => f.write_str("pdu sent by the local node"),
            RecvError::MalformedLowerPDU => f.write_str("malformed lower transport pdu"),
            RecvError::MalformedUpperPDU => f.write_str("malformed upper transport pdu"),
            RecvError::BadOpcode => f.write_str("bad access opcode"),
            RecvError::MalformedStatus(e) => write!(f, "malformed status: {}", e),
            RecvError::Reassemble(e) => write!(f, "reassembly: {}", e),
        }
    }
}
impl std::error::Error for RecvError {}
impl From<ReassembleError> for RecvError {
    fn from(e: ReassembleError) -> Self {
        RecvError::Reassemble(e)
    }
}
/// `opcode || parameters`.
pub fn encode_access(opcode: Opcode, parameters: &[u8]) -> Result<Vec<u8>, SendError> {
    access::encode(opcode, parameters).map_err(|_| SendError::Opcode)
}
/// Encrypts the access PDU. Returns `encrypted || TransMIC`.
pub fn encrypt_upper(
    access_pdu: Vec<u8>,
    sm: &SecurityMaterials<'_>,
    mic_size: MicSize,
) -> Result<Vec<u8>, SendError> {
    Ok(AppPayload::new(access_pdu)
        .encrypt(sm, mic_size)
        .map_err(|_| SendError::UpperEncrypt)?
        .to_bytes())
}
/// Splits an upper transport PDU into lower transport PDUs (one if unsegmented).
pub fn segment_lower(
    upper_pdu: &[u8],
    header: LowerHeader,
    seq_zero: SeqZero,
    segmented: bool,
) -> Result<Vec<lower::PDU>, SendError> {
    let segmenter = Segmenter::new(upper_pdu, header, seq_zero, segmented)?;
    Ok(segmenter.pdus().map(|(_, pdu)| pdu).collect())
}
/// Encrypts, obfuscates and frames one network PDU.
pub fn frame_network(
    pdu_type: PDUType,
    header: PrivateHeader,
    dst: Address,
    transport_pdu: &[u8],
    net_sm: &NetworkSecurityMaterials,
    iv_index: IVIndex,
) -> Result<Vec<u8>, SendError> {
    if transport_pdu.is_empty() || transport_pdu.len() > MAX_TRANSPORT_PDU_LEN {
        return Err(SendError::NetEncrypt);
    }
    let encrypted = net::PDU::new(header, dst, transport_pdu)
        .encrypt(net_sm.network_keys(), iv_index, pdu_type)
        .map_err(|_| SendError::NetEncrypt)?;
    Ok(encrypted.to_frame(pdu_type))
}
/// Network PDU decrypted by one of the known network keys.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct DecryptedNetworkPDU {
    pub net_key_index: NetKeyIndex,
    pub iv_index: IVIndex,
    pub pdu: net::PDU,
}
/// Everything needed to pick the key and nonce for an upper transport PDU.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct UpperTransportHeader {
    pub src: UnicastAddress,
    pub dst: Address,
    /// SeqAuth sequence number for segmented messages.
    pub seq: SequenceNumber,
    pub iv_index: IVIndex,
    pub net_key_index: NetKeyIndex,
    pub akf: AKF,
    pub aid: AID,
    pub szmic: SZMIC,
}
impl UpperTransportHeader {
    fn mic_size(&self) -> MicSize {
        if self.szmic.0 {
            MicSize::Big
        } else {
            MicSize::Small
        }
    }
    fn nonce_parts(&self) -> TransportNonceParts {
        TransportNonceParts {
            aszmic: self.szmic.0,
            seq: self.seq,
            src: self.src,
            dst: self.dst,
            iv_index: self.iv_index,
        }
    }
}
/// Bluetooth Mesh Stack Internals for generic Stack operations. Owns the key/node directory and
/// runs every layer transform:
///
/// - Access (`encode_access`)
/// - Upper Transport (`encrypt_upper`, `decrypt_upper`)
/// - Lower Transport (`segment_lower`)
/// - Network (`frame_network`, `decrypt_network_pdu`)
///
/// This stack is inherently single threaded. Scheduling, reassembly and per-destination state are
/// handled by `MeshDispatcher`.
pub struct StackInternals<D: NodeDirectory> {
    directory: D,
    config: StackConfig,
}
impl<D: NodeDirectory> StackInternals<D> {
    pub fn new(directory: D, config: StackConfig) -> Self {
        Self { directory, config }
    }
    pub fn directory(&self) -> &D {
        &self.directory
    }
    /// Returns a mutable reference to the directory so sequence numbers and node state can be
    /// written back.
    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }
    pub fn into_directory(self) -> D {
        self.directory
    }
    pub fn config(&self) -> &StackConfig {
        &self.config
    }
    pub fn default_ttl(&self) -> TTL {
        self.config
            .default_ttl
            .unwrap_or_else(|| self.directory.provisioner().default_ttl())
    }
    /// Takes the next sequence number of the local node.
    pub fn next_seq(&mut self) -> Result<SequenceNumber, SendError> {
        self.directory
            .provisioner_mut()
            .next_sequence_number()
            .ok_or(SendError::OutOfSeq)
    }
    fn net_materials(&self, index: NetKeyIndex) -> Result<NetworkSecurityMaterials, SendError> {
        self.directory
            .network_keys()
            .get_keys(index)
            .copied()
            .ok_or(SendError::InvalidNetKeyIndex)
    }
    fn primary_net_materials(&self) -> Result<NetworkSecurityMaterials, SendError> {
        self.directory
            .primary_network_key()
            .copied()
            .ok_or(SendError::InvalidNetKeyIndex)
    }
    /// Key for an outgoing access message and the network key it's sent under.
    fn access_key(
        &self,
        kind: MessageKind,
        dst: Address,
    ) -> Result<(AccessKey, NetworkSecurityMaterials), SendError> {
        match kind {
            MessageKind::Config => {
                let dst = dst.unicast().ok_or(SendError::InvalidDestination)?;
                let dev_key = if self.directory.is_local(dst) {
                    *self.directory.provisioner().device_key()
                } else {
                    *self
                        .directory
                        .provisioned_node(dst)
                        .ok_or(SendError::UnknownNode)?
                        .device_key()
                };
                Ok((AccessKey::Device(dev_key), self.primary_net_materials()?))
            }
            MessageKind::ProxyConfig => Err(SendError::InvalidDestination),
            _ => {
                let index: AppKeyIndex = kind.app_key_index().ok_or(SendError::InvalidAppKeyIndex)?;
                let app = *self
                    .directory
                    .application_key(index)
                    .ok_or(SendError::InvalidAppKeyIndex)?;
                let net = self.net_materials(app.net_key_index)?;
                Ok((AccessKey::App(app), net))
            }
        }
    }
    /// Runs `msg` through every layer: `encode_access → encrypt_upper → segment_lower →
    /// frame_network`. Takes one sequence number per network PDU from the local node.
    pub fn create_message(&mut self, msg: &OutgoingMessage) -> Result<Message, SendError> {
        if msg.kind == MessageKind::ProxyConfig {
            return self.create_proxy_config(msg);
        }
        if !msg.dst.is_assigned() {
            return Err(SendError::InvalidDestination);
        }
        let (key, net_sm) = self.access_key(msg.kind, msg.dst)?;
        let access_pdu = encode_access(msg.opcode, &msg.parameters)?;
        let segmented = msg.force_segment
            || access_pdu.len() + MicSize::Small.byte_size() > lower::UNSEGMENTED_ACCESS_PDU_LEN;
        let mic_size = if segmented {
            msg.mic_size
        } else {
            MicSize::Small
        };
        let aszmic = segmented && mic_size.is_big();
        let iv_index = self.directory.iv_index();
        let src = self.directory.provisioner().unicast_address();
        let ttl = msg.ttl.unwrap_or_else(|| self.default_ttl());
        let seq = self.next_seq()?;
        let nonce_parts = TransportNonceParts {
            aszmic,
            seq,
            src,
            dst: msg.dst,
            iv_index,
        };
        let upper_transport_pdu = match &key {
            AccessKey::Device(dev_key) => encrypt_upper(
                access_pdu.clone(),
                &SecurityMaterials::Device(nonce_parts.to_device_nonce(), dev_key),
                mic_size,
            )?,
            AccessKey::App(app) => encrypt_upper(
                access_pdu.clone(),
                &SecurityMaterials::App(nonce_parts.to_app_nonce(), &app.app_key, app.aid),
                mic_size,
            )?,
        };
        let lower_transport_pdus = segment_lower(
            &upper_transport_pdu,
            LowerHeader::Access {
                akf: key.akf(),
                aid: key.aid(),
                szmic: SZMIC(aszmic),
            },
            SeqZero::from(seq),
            segmented,
        )?;
        let mut message = Message {
            pdu_type: PDUType::Network,
            ctl: CTL(false),
            ttl,
            src,
            dst: msg.dst,
            seq,
            iv_index,
            net_key_index: net_sm.net_key_index(),
            network_keys: *net_sm.network_keys(),
            segmented,
            body: MessageBody::Access(AccessMessage {
                opcode: msg.opcode,
                parameters: msg.parameters.clone(),
                key,
                aszmic,
                mic_size,
                access_pdu,
                upper_transport_pdu,
            }),
            lower_transport_pdus,
            network_pdus: BTreeMap::new(),
        };
        self.frame_all(&mut message, &net_sm)?;
        Ok(message)
    }
    /// Builds a transport control message (segment acknowledgements) to `dst`.
    pub fn create_control(
        &mut self,
        dst: UnicastAddress,
        net_key_index: NetKeyIndex,
        ttl: TTL,
        opcode: ControlOpcode,
        parameters: &[u8],
    ) -> Result<Message, SendError> {
        let net_sm = self.net_materials(net_key_index)?;
        let iv_index = self.directory.iv_index();
        let src = self.directory.provisioner().unicast_address();
        let seq = self.next_seq()?;
        let segmented = parameters.len() > lower::UNSEGMENTED_CONTROL_PDU_LEN;
        let lower_transport_pdus = segment_lower(
            parameters,
            LowerHeader::Control(opcode),
            SeqZero::from(seq),
            segmented,
        )?;
        let mut message = Message {
            pdu_type: PDUType::Network,
            ctl: CTL(true),
            ttl,
            src,
            dst: dst.into(),
            seq,
            iv_index,
            net_key_index,
            network_keys: *net_sm.network_keys(),
            segmented,
            body: MessageBody::Control(ControlMessage {
                opcode,
                parameters: parameters.to_vec(),
            }),
            lower_transport_pdus,
            network_pdus: BTreeMap::new(),
        };
        self.frame_all(&mut message, &net_sm)?;
        Ok(message)
    }
    /// Proxy configuration messages skip the transport layers: `opcode || parameters` is the
    /// network payload, secured with the proxy nonce and sent with CTL = 1, TTL = 0.
    fn create_proxy_config(&mut self, msg: &OutgoingMessage) -> Result<Message, SendError> {
        let opcode = match msg.opcode {
            Opcode::SIG(SigOpcode::SingleOctet(opcode)) => opcode,
            _ => return Err(SendError::Opcode),
        };
        let net_sm = self.primary_net_materials()?;
        let iv_index = self.directory.iv_index();
        let src = self.directory.provisioner().unicast_address();
        let seq = self.next_seq()?;
        let mut payload = Vec::with_capacity(1 + msg.parameters.len());
        payload.push(opcode);
        payload.extend_from_slice(&msg.parameters);
        let header = PrivateHeader {
            ctl: CTL(true),
            ttl: TTL::new(0),
            seq,
            src,
        };
        let frame = frame_network(
            PDUType::ProxyConfiguration,
            header,
            Address::Unassigned,
            &payload,
            &net_sm,
            iv_index,
        )?;
        let mut network_pdus = BTreeMap::new();
        network_pdus.insert(0, frame);
        Ok(Message {
            pdu_type: PDUType::ProxyConfiguration,
            ctl: CTL(true),
            ttl: TTL::new(0),
            src,
            dst: Address::Unassigned,
            seq,
            iv_index,
            net_key_index: net_sm.net_key_index(),
            network_keys: *net_sm.network_keys(),
            segmented: false,
            body: MessageBody::ProxyConfig(ProxyConfigMessage {
                opcode: msg.opcode,
                parameters: msg.parameters.clone(),
            }),
            lower_transport_pdus: Vec::new(),
            network_pdus,
        })
    }
    /// Segment 0 goes out with the message sequence number, every other segment takes a fresh
    /// one.
    fn frame_all(
        &mut self,
        message: &mut Message,
        net_sm: &NetworkSecurityMaterials,
    ) -> Result<(), SendError> {
        for index in 0..message.lower_transport_pdus.len() {
            let seq = if index == 0 {
                message.seq
            } else {
                self.next_seq()?
            };
            let frame = self.frame_lower(message, index, seq, net_sm)?;
            message.network_pdus.insert(index as u8, frame);
        }
        Ok(())
    }
    fn frame_lower(
        &self,
        message: &Message,
        index: usize,
        seq: SequenceNumber,
        net_sm: &NetworkSecurityMaterials,
    ) -> Result<Vec<u8>, SendError> {
        let lower_pdu = message
            .lower_transport_pdus
            .get(index)
            .ok_or(SendError::NoPendingTransaction)?;
        let header = PrivateHeader {
            ctl: message.ctl,
            ttl: message.ttl,
            seq,
            src: message.src,
        };
        frame_network(
            message.pdu_type,
            header,
            message.dst,
            lower_pdu.to_bytes().as_ref(),
            net_sm,
            message.iv_index,
        )
    }
    /// Re-frames segment `seg_o` with a fresh sequence number. The new frame replaces the old one
    /// in `message.network_pdus`.
    pub fn reframe_segment(
        &mut self,
        message: &mut Message,
        seg_o: u8,
    ) -> Result<Vec<u8>, SendError> {
        let net_sm = self.net_materials(message.net_key_index)?;
        let seq = self.next_seq()?;
        let frame = self.frame_lower(message, usize::from(seg_o), seq, &net_sm)?;
        message.network_pdus.insert(seg_o, frame.clone());
        Ok(frame)
    }
    /// Tries to find the matching `NetworkSecurityMaterials` in the directory. Every key with a
    /// matching `NID` is tried in key index order and the first one that authenticates wins.
    pub fn decrypt_network_pdu(
        &self,
        pdu_type: PDUType,
        data: &[u8],
    ) -> Result<DecryptedNetworkPDU, RecvError> {
        let pdu = net::EncryptedPDU::new(data).ok_or(RecvError::MalformedNetworkPDU)?;
        let iv_index = self
            .directory
            .iv_index()
            .matching_ivi(pdu.ivi())
            .ok_or(RecvError::NoMatchingNetKey)?;
        self.directory
            .network_keys()
            .matching_nid(pdu.nid())
            .find_map(|sm| {
                pdu.try_decrypt(sm.network_keys(), iv_index, pdu_type)
                    .ok()
                    .map(|pdu| DecryptedNetworkPDU {
                        net_key_index: sm.net_key_index(),
                        iv_index,
                        pdu,
                    })
            })
            .ok_or(RecvError::NoMatchingNetKey)
    }
    /// Decrypts an upper transport access PDU. AKF = 0 uses the device key of the source node,
    /// AKF = 1 every application key bound to the receiving network key with a matching AID.
    /// Returns the plaintext access PDU and the `AppKeyIndex` that decrypted it.
    pub fn decrypt_upper(
        &self,
        header: &UpperTransportHeader,
        upper_pdu: &[u8],
    ) -> Result<(AppPayload, Option<AppKeyIndex>), RecvError> {
        let encrypted =
            EncryptedAppPayload::from_upper_pdu(upper_pdu, header.mic_size(), header.akf, header.aid)
                .ok_or(RecvError::MalformedUpperPDU)?;
        let nonce_parts = header.nonce_parts();
        if !header.akf.0 {
            let node = self
                .directory
                .provisioned_node(header.src)
                .ok_or(RecvError::UnknownSourceNode)?;
            let sm = SecurityMaterials::Device(nonce_parts.to_device_nonce(), node.device_key());
            return encrypted
                .decrypt(&sm)
                .map(|payload| (payload, None))
                .map_err(|_| RecvError::NoMatchingAppKey);
        }
        let nonce = nonce_parts.to_app_nonce();
        self.directory
            .application_keys(header.net_key_index)
            .into_iter()
            .filter(|app| app.aid == header.aid)
            .find_map(|app| {
                encrypted
                    .decrypt(&SecurityMaterials::App(nonce, &app.app_key, app.aid))
                    .ok()
                    .map(|payload| (payload, Some(app.app_key_index)))
            })
            .ok_or(RecvError::NoMatchingAppKey)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::{AppKey, DevKey, NetKey};
    use crate::directory::{MeshNetwork, ProvisionedNode};

    fn internals() -> StackInternals<MeshNetwork> {
        let provisioner =
            ProvisionedNode::new(UnicastAddress::new(0x0003), 1, DevKey::new_bytes([1; 16]));
        let mut network = MeshNetwork::new(
            provisioner,
            NetKey::from_hex("7dd7364cd842ad18c17c2b820c84c3d6").unwrap(),
            IVIndex(0x1234_5678),
        );
        network.add_app_key(
            AppKeyIndex(0),
            AppKey::from_hex("63964771734fbd76e3b40519d1d94a48").unwrap(),
            NetKeyIndex(0),
        );
        network.add_node(ProvisionedNode::new(
            UnicastAddress::new(0x0001),
            1,
            DevKey::new_bytes([2; 16]),
        ));
        StackInternals::new(network, StackConfig::default())
    }
    #[test]
    fn test_ack_timeout() {
        let config = StackConfig::default();
        assert_eq!(config.ack_timeout(TTL::new(0)), Duration::from_millis(150));
        assert_eq!(config.ack_timeout(TTL::new(4)), Duration::from_millis(350));
    }
    #[test]
    fn test_segmented_message_layout() {
        let mut internals = internals();
        let out = OutgoingMessage::generic(
            Address::from(0x0001),
            AppKeyIndex(0),
            Opcode::vendor(0x15, crate::mesh::CompanyID(0x0059)),
            vec![0x55; 13],
        );
        let message = internals.create_message(&out).unwrap();
        assert!(message.segmented);
        match &message.body {
            MessageBody::Access(access) => {
                assert_eq!(access.access_pdu.len(), 16);
                assert_eq!(access.upper_transport_pdu.len(), 20);
            }
            other => panic!("expected access body, got {:?}", other),
        }
        assert_eq!(message.lower_transport_pdus.len(), 2);
        for pdu in &message.lower_transport_pdus {
            let seg = pdu.segmented().unwrap();
            assert_eq!(seg.header().seg_n.value(), 1);
        }
        let lens: Vec<usize> = message.frames().map(<[u8]>::len).collect();
        assert_eq!(lens, vec![1 + 9 + 4 + 12 + 4, 1 + 9 + 4 + 8 + 4]);
        // One sequence number per segment.
        assert_eq!(
            internals.directory().provisioner().sequence_number().value(),
            2
        );
    }
    #[test]
    fn test_unsegmented_forces_small_mic() {
        let mut internals = internals();
        let out = OutgoingMessage::config(
            UnicastAddress::new(0x0001),
            Opcode::sig(0x800C).unwrap(),
            Vec::new(),
        )
        .with_mic_size(MicSize::Big);
        let message = internals.create_message(&out).unwrap();
        assert!(!message.segmented);
        match &message.body {
            MessageBody::Access(access) => {
                assert_eq!(access.mic_size, MicSize::Small);
                assert!(!access.aszmic);
            }
            other => panic!("expected access body, got {:?}", other),
        }
        let frame = &message.network_pdus[&0];
        let decrypted = internals
            .decrypt_network_pdu(PDUType::Network, &frame[1..])
            .unwrap();
        assert_eq!(decrypted.pdu.dst, Address::from(0x0001));
        assert_eq!(decrypted.pdu.header.src, UnicastAddress::new(0x0003));
    }
    #[test]
    fn test_send_errors() {
        let mut internals = internals();
        let opcode = Opcode::sig(0x8204).unwrap();
        let bad_app = OutgoingMessage::generic(Address::from(0x0001), AppKeyIndex(7), opcode, vec![]);
        assert_eq!(
            internals.create_message(&bad_app),
            Err(SendError::InvalidAppKeyIndex)
        );
        let unknown = OutgoingMessage::config(UnicastAddress::new(0x0042), opcode, vec![]);
        assert_eq!(internals.create_message(&unknown), Err(SendError::UnknownNode));
        let unassigned =
            OutgoingMessage::generic(Address::Unassigned, AppKeyIndex(0), opcode, vec![]);
        assert_eq!(
            internals.create_message(&unassigned),
            Err(SendError::InvalidDestination)
        );
        // Nothing was sent so no sequence number was used.
        assert_eq!(
            internals.directory().provisioner().sequence_number().value(),
            0
        );
    }
}
