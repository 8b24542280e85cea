//! 13 byte AES-CCM nonces for the network, proxy, application and device security layers.
//!
//! | Nonce       | 0    | 1            | 2..5 | 5..7 | 7..9       | 9..13    |
//! |-------------|------|--------------|------|------|------------|----------|
//! | Network     | 0x00 | CTL<<7\|TTL  | SEQ  | SRC  | 0x0000     | IV Index |
//! | Application | 0x01 | ASZMIC<<7    | SEQ  | SRC  | DST        | IV Index |
//! | Device      | 0x02 | ASZMIC<<7    | SEQ  | SRC  | DST        | IV Index |
//! | Proxy       | 0x03 | 0x00         | SEQ  | SRC  | 0x0000     | IV Index |
use crate::address::{Address, UnicastAddress};
use crate::bytes::ToFromBytesEndian;
use crate::mesh::{IVIndex, SequenceNumber, CTL, TTL};

pub const NONCE_LEN: usize = 13;
#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
pub struct Nonce([u8; NONCE_LEN]);
impl Nonce {
    #[must_use]
    pub const fn new(bytes: [u8; NONCE_LEN]) -> Nonce {
        Nonce(bytes)
    }
}
impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}
/// Nonce Types
/// 0x04--0xFF RFU
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum NonceType {
    Network = 0x00,
    Application = 0x01,
    Device = 0x02,
    Proxy = 0x03,
}
impl NonceType {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
fn build(
    nonce_type: NonceType,
    flags: u8,
    seq: SequenceNumber,
    src: UnicastAddress,
    dst: u16,
    iv_index: IVIndex,
) -> Nonce {
    let mut out = [0_u8; NONCE_LEN];
    out[0] = nonce_type.as_u8();
    out[1] = flags;
    out[2..5].copy_from_slice(&seq.to_bytes_be());
    out[5..7].copy_from_slice(&src.to_bytes_be());
    out[7..9].copy_from_slice(&dst.to_be_bytes());
    out[9..13].copy_from_slice(&iv_index.to_bytes_be());
    Nonce(out)
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct NetworkNonceParts {
    pub ctl: CTL,
    pub ttl: TTL,
    pub src: UnicastAddress,
    pub seq: SequenceNumber,
    pub iv_index: IVIndex,
}

impl NetworkNonceParts {
    #[must_use]
    pub fn new(
        ctl: CTL,
        ttl: TTL,
        src: UnicastAddress,
        seq: SequenceNumber,
        iv_index: IVIndex,
    ) -> Self {
        Self {
            ctl,
            ttl,
            src,
            seq,
            iv_index,
        }
    }
    #[must_use]
    pub fn to_nonce(&self) -> Nonce {
        build(
            NonceType::Network,
            self.ttl.with_flag(self.ctl.0),
            self.seq,
            self.src,
            0,
            self.iv_index,
        )
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ProxyNonceParts {
    pub seq: SequenceNumber,
    pub src: UnicastAddress,
    pub iv_index: IVIndex,
}

impl ProxyNonceParts {
    #[must_use]
    pub fn to_nonce(&self) -> Nonce {
        build(NonceType::Proxy, 0x00, self.seq, self.src, 0, self.iv_index)
    }
}

/// Shared parts of the Application and Device nonces. `nonce_type` picks which.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TransportNonceParts {
    pub aszmic: bool,
    pub seq: SequenceNumber,
    pub src: UnicastAddress,
    pub dst: Address,
    pub iv_index: IVIndex,
}

impl TransportNonceParts {
    #[must_use]
    pub fn to_app_nonce(&self) -> Nonce {
        self.to_nonce(NonceType::Application)
    }
    #[must_use]
    pub fn to_device_nonce(&self) -> Nonce {
        self.to_nonce(NonceType::Device)
    }
    fn to_nonce(&self, nonce_type: NonceType) -> Nonce {
        build(
            nonce_type,
            (self.aszmic as u8) << 7,
            self.seq,
            self.src,
            self.dst.value(),
            self.iv_index,
        )
    }
}
