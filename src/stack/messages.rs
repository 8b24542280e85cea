//! Outgoing message requests and the layered `Message` the stack builds from them.
use crate::access::Opcode;
use crate::address::{Address, UnicastAddress};
use crate::control::ControlOpcode;
use crate::crypto::aes::MicSize;
use crate::crypto::key::DevKey;
use crate::crypto::materials::{ApplicationSecurityMaterials, NetworkKeys};
use crate::crypto::{AID, AKF};
use crate::lower::{self, SegN};
use crate::mesh::{AppKeyIndex, CompanyID, IVIndex, NetKeyIndex, SequenceNumber, CTL, TTL};
use crate::net::PDUType;
use std::collections::BTreeMap;

/// What kind of transaction an outgoing message starts. Picks the key material and the status
/// table used for the response.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum MessageKind {
    /// Foundation model message secured with the destination's device key.
    Config,
    Generic { app_key_index: AppKeyIndex },
    VendorAcked { app_key_index: AppKeyIndex },
    VendorUnacked { app_key_index: AppKeyIndex },
    /// Proxy configuration message to the directly connected proxy.
    ProxyConfig,
}
impl MessageKind {
    #[must_use]
    pub fn app_key_index(&self) -> Option<AppKeyIndex> {
        match self {
            MessageKind::Generic { app_key_index }
            | MessageKind::VendorAcked { app_key_index }
            | MessageKind::VendorUnacked { app_key_index } => Some(*app_key_index),
            MessageKind::Config | MessageKind::ProxyConfig => None,
        }
    }
}
/// Request to send an access (or proxy configuration) message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct OutgoingMessage {
    pub kind: MessageKind,
    pub opcode: Opcode,
    pub parameters: Vec<u8>,
    pub dst: Address,
    /// `None` uses the local node's default TTL.
    pub ttl: Option<TTL>,
    /// Only used if the message ends up segmented. Unsegmented messages always use a 32 bit MIC.
    pub mic_size: MicSize,
    pub force_segment: bool,
}
impl OutgoingMessage {
    #[must_use]
    pub fn new(kind: MessageKind, dst: Address, opcode: Opcode, parameters: Vec<u8>) -> Self {
        Self {
            kind,
            opcode,
            parameters,
            dst,
            ttl: None,
            mic_size: MicSize::Small,
            force_segment: false,
        }
    }
    #[must_use]
    pub fn config(dst: UnicastAddress, opcode: Opcode, parameters: Vec<u8>) -> Self {
        Self::new(MessageKind::Config, dst.into(), opcode, parameters)
    }
    #[must_use]
    pub fn generic(
        dst: Address,
        app_key_index: AppKeyIndex,
        opcode: Opcode,
        parameters: Vec<u8>,
    ) -> Self {
        Self::new(
            MessageKind::Generic { app_key_index },
            dst,
            opcode,
            parameters,
        )
    }
    #[must_use]
    pub fn vendor(
        dst: Address,
        app_key_index: AppKeyIndex,
        opcode: Opcode,
        parameters: Vec<u8>,
        acknowledged: bool,
    ) -> Self {
        let kind = if acknowledged {
            MessageKind::VendorAcked { app_key_index }
        } else {
            MessageKind::VendorUnacked { app_key_index }
        };
        Self::new(kind, dst, opcode, parameters)
    }
    /// Proxy configuration messages have no destination (the proxy is the peer).
    #[must_use]
    pub fn proxy_config(opcode: Opcode, parameters: Vec<u8>) -> Self {
        Self::new(
            MessageKind::ProxyConfig,
            Address::Unassigned,
            opcode,
            parameters,
        )
    }
    #[must_use]
    pub fn with_ttl(mut self, ttl: TTL) -> Self {
        self.ttl = Some(ttl);
        self
    }
    #[must_use]
    pub fn with_mic_size(mut self, mic_size: MicSize) -> Self {
        self.mic_size = mic_size;
        self
    }
    #[must_use]
    pub fn with_force_segment(mut self, force_segment: bool) -> Self {
        self.force_segment = force_segment;
        self
    }
    /// Company ID of vendor messages.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyID> {
        self.opcode.company_id()
    }
}
/// Key the Upper Transport PDU was secured with.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum AccessKey {
    Device(DevKey),
    App(ApplicationSecurityMaterials),
}
impl AccessKey {
    #[must_use]
    pub fn akf(&self) -> AKF {
        AKF(matches!(self, AccessKey::App(_)))
    }
    #[must_use]
    pub fn aid(&self) -> AID {
        match self {
            AccessKey::Device(_) => AID::new_masked(0),
            AccessKey::App(sm) => sm.aid,
        }
    }
}
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AccessMessage {
    pub opcode: Opcode,
    pub parameters: Vec<u8>,
    pub key: AccessKey,
    pub aszmic: bool,
    pub mic_size: MicSize,
    pub access_pdu: Vec<u8>,
    /// Encrypted access PDU || TransMIC.
    pub upper_transport_pdu: Vec<u8>,
}
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ControlMessage {
    pub opcode: ControlOpcode,
    pub parameters: Vec<u8>,
}
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ProxyConfigMessage {
    pub opcode: Opcode,
    pub parameters: Vec<u8>,
}
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum MessageBody {
    Access(AccessMessage),
    Control(ControlMessage),
    ProxyConfig(ProxyConfigMessage),
}
/// A message after it went through every layer. `network_pdus` maps segment index to the
/// complete frame (`pdu_type || network pdu`) handed to the bearer.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Message {
    pub pdu_type: PDUType,
    pub ctl: CTL,
    pub ttl: TTL,
    pub src: UnicastAddress,
    pub dst: Address,
    /// Sequence number of the first segment (SeqAuth for segmented messages).
    pub seq: SequenceNumber,
    pub iv_index: IVIndex,
    pub net_key_index: NetKeyIndex,
    pub network_keys: NetworkKeys,
    pub segmented: bool,
    pub body: MessageBody,
    /// Lower Transport PDUs by segment index. Empty for proxy configuration messages.
    pub lower_transport_pdus: Vec<lower::PDU>,
    pub network_pdus: BTreeMap<u8, Vec<u8>>,
}
impl Message {
    /// `None` for unsegmented messages.
    #[must_use]
    pub fn seg_n(&self) -> Option<SegN> {
        if self.segmented && !self.lower_transport_pdus.is_empty() {
            Some(SegN::new_masked((self.lower_transport_pdus.len() - 1) as u8))
        } else {
            None
        }
    }
    /// Frames in segment order.
    pub fn frames(&self) -> impl Iterator<Item = &'_ [u8]> {
        self.network_pdus.values().map(Vec::as_slice)
    }
}
