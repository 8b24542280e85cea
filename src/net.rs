//! Bluetooth Mesh
//! Network Layer is BIG Endian
//!
//! Mesh Network PDU (after the 1 byte proxy/bearer PDU type):
//! | Field Name    | Bits  | Notes                                                     |
//! |---------------|-------|-----------------------------------------------------------|
//! | IVI           | 1     | Least significant bit of IV Index                         |
//! | NID           | 7     | Value derived from the NetKey used to encrypt this PDU    |
//! | CTL           | 1     | Network Control                          (obfuscated)     |
//! | TTL           | 7     | Time To Live                             (obfuscated)     |
//! | SEQ           | 24    | Sequence Number                          (obfuscated)     |
//! | SRC           | 16    | Source Unicast Address                   (obfuscated)     |
//! | DST           | 16    | Destination Address                      (encrypted)      |
//! | Transport PDU | 8-128 | Transport PDU (1-16 Bytes)               (encrypted)      |
//! | NetMIC        | 32,64 | Message Integrity check for Payload (4 or 8 bytes)        |
//!
//! NetMIC is 32 bit when CTL == 0
//! NetMIC is 64 bit when CTL == 1
use crate::address::{Address, UnicastAddress};
use crate::bytes::ToFromBytesEndian;
use crate::crypto::aes::{AESCipher, MicSize};
use crate::crypto::key::PrivacyKey;
use crate::crypto::materials::NetworkKeys;
use crate::crypto::nonce::{NetworkNonceParts, Nonce, ProxyNonceParts};
use crate::crypto::MIC;
use crate::mesh::{IVIndex, SequenceNumber, CTL, IVI, NID, TTL};
use core::convert::TryFrom;
use core::fmt::{Display, Formatter};

/// Largest possible Network PDU (without the PDU type octet).
pub const MAX_NETWORK_PDU_LEN: usize = 29;
/// Largest possible Transport PDU carried by one Network PDU.
pub const MAX_TRANSPORT_PDU_LEN: usize = 16;
const PRIVATE_HEADER_LEN: usize = 6;
const PRIVACY_RANDOM_LEN: usize = 7;
/// IVI/NID (1) + obfuscated header (6) + DST (2) + Transport PDU (>=1) + NetMIC (>=4)
const MIN_NETWORK_PDU_LEN: usize = 1 + PRIVATE_HEADER_LEN + 2 + 1 + 4;

/// First octet of every frame handed to/received from the bearer.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum PDUType {
    Network = 0x00,
    MeshBeacon = 0x01,
    ProxyConfiguration = 0x02,
    Provisioning = 0x03,
}
impl PDUType {
    #[must_use]
    pub fn new(v: u8) -> Option<PDUType> {
        match v {
            0x00 => Some(PDUType::Network),
            0x01 => Some(PDUType::MeshBeacon),
            0x02 => Some(PDUType::ProxyConfiguration),
            0x03 => Some(PDUType::Provisioning),
            _ => None,
        }
    }
}
impl From<PDUType> for u8 {
    fn from(p: PDUType) -> Self {
        p as u8
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum DecryptError {
    /// Frame is too short/long to be a Network PDU.
    BadLength,
    /// NetMIC didn't authenticate. Probably the wrong `NetKey` (`NID` collision).
    BadMIC,
    /// Deobfuscated SRC isn't a unicast address.
    BadSrc,
}
impl Display for DecryptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            DecryptError::BadLength => f.write_str("bad network pdu length"),
            DecryptError::BadMIC => f.write_str("network mic mismatch"),
            DecryptError::BadSrc => f.write_str("network src not unicast"),
        }
    }
}
impl std::error::Error for DecryptError {}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct EncryptError(());
impl Display for EncryptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("network pdu can't be encrypted (too long or empty)")
    }
}
impl std::error::Error for EncryptError {}

/// The part of the header that gets obfuscated. `CTL|TTL, SEQ, SRC`.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct PrivateHeader {
    pub ctl: CTL,
    pub ttl: TTL,
    pub seq: SequenceNumber,
    pub src: UnicastAddress,
}
impl PrivateHeader {
    #[must_use]
    pub fn pack(&self) -> [u8; PRIVATE_HEADER_LEN] {
        let mut out = [0_u8; PRIVATE_HEADER_LEN];
        out[0] = self.ttl.with_flag(self.ctl.0);
        out[1..4].copy_from_slice(&self.seq.to_bytes_be());
        out[4..6].copy_from_slice(&self.src.to_bytes_be());
        out
    }
    pub fn unpack(bytes: &[u8; PRIVATE_HEADER_LEN]) -> Result<Self, DecryptError> {
        let (ttl, ctl) = TTL::new_with_flag(bytes[0]);
        Ok(PrivateHeader {
            ctl: CTL(ctl),
            ttl,
            seq: SequenceNumber::from_bytes_be(&bytes[1..4]).ok_or(DecryptError::BadLength)?,
            src: UnicastAddress::from_bytes_be(&bytes[4..6]).ok_or(DecryptError::BadSrc)?,
        })
    }
}
/// `PECB = e(PrivacyKey, 0x0000000000 || IV Index || Privacy Random)`.
#[must_use]
pub fn pecb(
    privacy_key: &PrivacyKey,
    iv_index: IVIndex,
    privacy_random: &[u8; PRIVACY_RANDOM_LEN],
) -> [u8; 16] {
    let mut block = [0_u8; 16];
    block[5..9].copy_from_slice(&iv_index.to_bytes_be());
    block[9..].copy_from_slice(&privacy_random[..]);
    AESCipher::new(*privacy_key.key()).ecb_encrypt(&block)
}
/// XORs the 6 header bytes with `PECB[0..6]`. Applying it twice gives back the input.
#[must_use]
pub fn obfuscate(
    privacy_key: &PrivacyKey,
    iv_index: IVIndex,
    privacy_random: &[u8; PRIVACY_RANDOM_LEN],
    header: [u8; PRIVATE_HEADER_LEN],
) -> [u8; PRIVATE_HEADER_LEN] {
    let pecb = pecb(privacy_key, iv_index, privacy_random);
    let mut out = header;
    for (b, p) in out.iter_mut().zip(pecb.iter()) {
        *b ^= p;
    }
    out
}
fn nonce(pdu_type: PDUType, header: &PrivateHeader, iv_index: IVIndex) -> Nonce {
    match pdu_type {
        PDUType::ProxyConfiguration => ProxyNonceParts {
            seq: header.seq,
            src: header.src,
            iv_index,
        }
        .to_nonce(),
        _ => NetworkNonceParts::new(header.ctl, header.ttl, header.src, header.seq, iv_index)
            .to_nonce(),
    }
}
fn mic_size(pdu_type: PDUType, ctl: CTL) -> MicSize {
    if ctl.0 || pdu_type == PDUType::ProxyConfiguration {
        MicSize::Big
    } else {
        MicSize::Small
    }
}

/// Plaintext Mesh Network PDU.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct PDU {
    pub header: PrivateHeader,
    pub dst: Address,
    transport_buf: [u8; MAX_TRANSPORT_PDU_LEN],
    transport_len: u8,
}
impl PDU {
    /// # Panics
    /// Panics if `transport_pdu` is empty or longer than 16 bytes.
    #[must_use]
    pub fn new(header: PrivateHeader, dst: Address, transport_pdu: &[u8]) -> PDU {
        assert!(
            !transport_pdu.is_empty() && transport_pdu.len() <= MAX_TRANSPORT_PDU_LEN,
            "bad transport pdu length {}",
            transport_pdu.len()
        );
        let mut buf = [0_u8; MAX_TRANSPORT_PDU_LEN];
        buf[..transport_pdu.len()].copy_from_slice(transport_pdu);
        PDU {
            header,
            dst,
            transport_buf: buf,
            transport_len: transport_pdu.len() as u8,
        }
    }
    #[must_use]
    pub fn transport_pdu(&self) -> &[u8] {
        &self.transport_buf[..usize::from(self.transport_len)]
    }
    /// Encrypts and obfuscates the PDU with the given `NetworkKeys`. `pdu_type` selects the
    /// network or proxy nonce.
    pub fn encrypt(
        &self,
        keys: &NetworkKeys,
        iv_index: IVIndex,
        pdu_type: PDUType,
    ) -> Result<OwnedEncryptedPDU, EncryptError> {
        let mic_size = mic_size(pdu_type, self.header.ctl);
        let transport_len = usize::from(self.transport_len);
        let encrypted_len = 2 + transport_len;
        let total = 1 + PRIVATE_HEADER_LEN + encrypted_len + mic_size.byte_size();
        if total > MAX_NETWORK_PDU_LEN {
            return Err(EncryptError(()));
        }
        let mut buf = [0_u8; MAX_NETWORK_PDU_LEN];
        buf[0] = keys.nid().with_flag(iv_index.ivi().0);
        let payload_start = 1 + PRIVATE_HEADER_LEN;
        let payload_end = payload_start + encrypted_len;
        buf[payload_start..payload_start + 2].copy_from_slice(&self.dst.to_bytes_be());
        buf[payload_start + 2..payload_end].copy_from_slice(self.transport_pdu());
        let mic = AESCipher::new(*keys.encryption_key().key())
            .ccm_encrypt(
                &nonce(pdu_type, &self.header, iv_index),
                b"",
                &mut buf[payload_start..payload_end],
                mic_size,
            )
            .map_err(|_| EncryptError(()))?;
        mic.be_pack_into(&mut buf[payload_end..total]);
        let mut privacy_random = [0_u8; PRIVACY_RANDOM_LEN];
        privacy_random.copy_from_slice(&buf[payload_start..payload_start + PRIVACY_RANDOM_LEN]);
        let obfuscated = obfuscate(
            keys.privacy_key(),
            iv_index,
            &privacy_random,
            self.header.pack(),
        );
        buf[1..payload_start].copy_from_slice(&obfuscated);
        Ok(OwnedEncryptedPDU { buf, len: total })
    }
}
/// Borrowed encrypted Network PDU (without the PDU type octet).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EncryptedPDU<'a> {
    data: &'a [u8],
}
impl<'a> EncryptedPDU<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Option<EncryptedPDU<'a>> {
        if data.len() < MIN_NETWORK_PDU_LEN || data.len() > MAX_NETWORK_PDU_LEN {
            None
        } else {
            Some(EncryptedPDU { data })
        }
    }
    #[must_use]
    pub fn ivi(&self) -> IVI {
        IVI(self.data[0] & 0x80 != 0)
    }
    #[must_use]
    pub fn nid(&self) -> NID {
        NID::from_masked_u8(self.data[0])
    }
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
    fn privacy_random(&self) -> [u8; PRIVACY_RANDOM_LEN] {
        let mut out = [0_u8; PRIVACY_RANDOM_LEN];
        let start = 1 + PRIVATE_HEADER_LEN;
        out.copy_from_slice(&self.data[start..start + PRIVACY_RANDOM_LEN]);
        out
    }
    /// Deobfuscates the header only. Useful for logging a PDU that can't be decrypted.
    pub fn private_header(
        &self,
        privacy_key: &PrivacyKey,
        iv_index: IVIndex,
    ) -> Result<PrivateHeader, DecryptError> {
        let mut obfuscated = [0_u8; PRIVATE_HEADER_LEN];
        obfuscated.copy_from_slice(&self.data[1..=PRIVATE_HEADER_LEN]);
        PrivateHeader::unpack(&obfuscate(
            privacy_key,
            iv_index,
            &self.privacy_random(),
            obfuscated,
        ))
    }
    /// Tries to decrypt the PDU with `keys`. A `DecryptError::BadMIC` means the key didn't match
    /// and the next candidate should be tried.
    pub fn try_decrypt(
        &self,
        keys: &NetworkKeys,
        iv_index: IVIndex,
        pdu_type: PDUType,
    ) -> Result<PDU, DecryptError> {
        let header = self.private_header(keys.privacy_key(), iv_index)?;
        let mic_size = mic_size(pdu_type, header.ctl);
        let payload_start = 1 + PRIVATE_HEADER_LEN;
        let mic_start = self
            .data
            .len()
            .checked_sub(mic_size.byte_size())
            .ok_or(DecryptError::BadLength)?;
        // DST and at least 1 byte of transport PDU.
        if mic_start < payload_start + 3 {
            return Err(DecryptError::BadLength);
        }
        let mic = MIC::try_from_bytes_be(&self.data[mic_start..]).ok_or(DecryptError::BadLength)?;
        let mut payload = [0_u8; MAX_NETWORK_PDU_LEN];
        let payload = &mut payload[..mic_start - payload_start];
        payload.copy_from_slice(&self.data[payload_start..mic_start]);
        AESCipher::new(*keys.encryption_key().key())
            .ccm_decrypt(&nonce(pdu_type, &header, iv_index), b"", payload, mic)
            .map_err(|_| DecryptError::BadMIC)?;
        let dst = Address::from_bytes_be(&payload[..2]).ok_or(DecryptError::BadLength)?;
        Ok(PDU::new(header, dst, &payload[2..]))
    }
}
/// Owned encrypted Network PDU (without the PDU type octet).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct OwnedEncryptedPDU {
    buf: [u8; MAX_NETWORK_PDU_LEN],
    len: usize,
}
impl OwnedEncryptedPDU {
    #[must_use]
    pub fn encrypted_pdu(&self) -> EncryptedPDU<'_> {
        EncryptedPDU {
            data: &self.buf[..self.len],
        }
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Bearer frame: `pdu_type || network pdu`.
    #[must_use]
    pub fn to_frame(&self, pdu_type: PDUType) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.len);
        out.push(pdu_type.into());
        out.extend_from_slice(self.data());
        out
    }
}
impl TryFrom<&[u8]> for OwnedEncryptedPDU {
    type Error = DecryptError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        EncryptedPDU::new(value).ok_or(DecryptError::BadLength)?;
        let mut buf = [0_u8; MAX_NETWORK_PDU_LEN];
        buf[..value.len()].copy_from_slice(value);
        Ok(OwnedEncryptedPDU {
            buf,
            len: value.len(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::hex_to_bytes;
    use crate::crypto::key::NetKey;

    fn message_1_keys() -> NetworkKeys {
        (&NetKey::from_hex("7dd7364cd842ad18c17c2b820c84c3d6").unwrap()).into()
    }
    /// Message #1 from Mesh Core v1.0 Sample Data
    fn message_1_pdu() -> PDU {
        PDU::new(
            PrivateHeader {
                ctl: CTL(true),
                ttl: TTL::new(0),
                seq: SequenceNumber::new(1).unwrap(),
                src: UnicastAddress::new(0x1201),
            },
            Address::from(0xFFFD),
            &hex_to_bytes("034b50057e400000010000").unwrap(),
        )
    }
    #[test]
    fn test_message_1_keys() {
        let keys = message_1_keys();
        assert_eq!(keys.nid(), NID::new(0x68));
        assert_eq!(
            keys.encryption_key(),
            &crate::crypto::key::EncryptionKey::from_hex("0953fa93e7caac9638f58820220a398e")
                .unwrap()
        );
        assert_eq!(
            keys.privacy_key(),
            &PrivacyKey::from_hex("8b84eedec100067d670971dd2aa700cf").unwrap()
        );
    }
    #[test]
    fn test_message_1_encrypt() {
        let encrypted = message_1_pdu()
            .encrypt(&message_1_keys(), IVIndex(0x1234_5678), PDUType::Network)
            .unwrap();
        assert_eq!(
            encrypted.data(),
            &hex_to_bytes("68eca487516765b5e5bfdacbaf6cb7fb6bff871f035444ce83a670df").unwrap()[..]
        );
        assert_eq!(encrypted.to_frame(PDUType::Network)[0], 0x00);
    }
    #[test]
    fn test_message_1_decrypt() {
        let bytes = hex_to_bytes("68eca487516765b5e5bfdacbaf6cb7fb6bff871f035444ce83a670df").unwrap();
        let encrypted = EncryptedPDU::new(&bytes).unwrap();
        assert_eq!(encrypted.nid(), NID::new(0x68));
        assert_eq!(encrypted.ivi(), IVI(false));
        let pdu = encrypted
            .try_decrypt(&message_1_keys(), IVIndex(0x1234_5678), PDUType::Network)
            .unwrap();
        assert_eq!(pdu, message_1_pdu());
    }
    #[test]
    fn test_wrong_keys_fail() {
        let bytes = hex_to_bytes("68eca487516765b5e5bfdacbaf6cb7fb6bff871f035444ce83a670df").unwrap();
        let encrypted = EncryptedPDU::new(&bytes).unwrap();
        let other: NetworkKeys = (&NetKey::new_bytes([0x55; 16])).into();
        assert!(encrypted
            .try_decrypt(&other, IVIndex(0x1234_5678), PDUType::Network)
            .is_err());
        assert_eq!(
            encrypted.try_decrypt(&message_1_keys(), IVIndex(0x1234_5678), PDUType::ProxyConfiguration),
            Err(DecryptError::BadMIC)
        );
    }
    #[test]
    fn test_obfuscation_involution() {
        let key = PrivacyKey::new_bytes([0x3C; 16]);
        let random = [1, 2, 3, 4, 5, 6, 7];
        let header = [0x81, 0x00, 0x00, 0x05, 0x12, 0x01];
        let once = obfuscate(&key, IVIndex(7), &random, header);
        assert_ne!(once, header);
        assert_eq!(obfuscate(&key, IVIndex(7), &random, once), header);
    }
    #[test]
    fn test_proxy_round_trip() {
        let keys = message_1_keys();
        let pdu = PDU::new(
            PrivateHeader {
                ctl: CTL(true),
                ttl: TTL::new(0),
                seq: SequenceNumber::new(9).unwrap(),
                src: UnicastAddress::new(0x0001),
            },
            Address::Unassigned,
            &[0x00, 0x01],
        );
        let encrypted = pdu
            .encrypt(&keys, IVIndex(1), PDUType::ProxyConfiguration)
            .unwrap();
        assert_eq!(encrypted.len(), 1 + 6 + 2 + 2 + 8);
        assert_eq!(encrypted.encrypted_pdu().ivi(), IVI(true));
        assert_eq!(
            encrypted
                .encrypted_pdu()
                .try_decrypt(&keys, IVIndex(1), PDUType::ProxyConfiguration)
                .unwrap(),
            pdu
        );
    }
    #[test]
    fn test_too_long() {
        let pdu = PDU::new(
            PrivateHeader {
                ctl: CTL(true),
                ttl: TTL::new(3),
                seq: SequenceNumber::new(1).unwrap(),
                src: UnicastAddress::new(0x0001),
            },
            Address::from(0x0002),
            &[0; 16],
        );
        assert!(pdu
            .encrypt(&message_1_keys(), IVIndex(0), PDUType::Network)
            .is_err());
    }
}
