//! Upper Transport Layer. Encrypts/decrypts Access PDUs with an Application or Device Key.
use crate::crypto::aes::{AESCipher, Error, MicSize};
use crate::crypto::key::{AppKey, DevKey, Key};
use crate::crypto::nonce::Nonce;
use crate::crypto::{AID, AKF, MIC};
use crate::lower::{SegmentedAccessPDU, UNSEGMENTED_ACCESS_PDU_LEN};

/// Key and nonce used for a single Upper Transport encryption/decryption.
pub enum SecurityMaterials<'a> {
    App(Nonce, &'a AppKey, AID),
    Device(Nonce, &'a DevKey),
}
impl<'a> SecurityMaterials<'a> {
    #[must_use]
    pub fn unpack(&self) -> (&Nonce, &Key) {
        match self {
            SecurityMaterials::App(n, k, _) => (n, k.key()),
            SecurityMaterials::Device(n, k) => (n, k.key()),
        }
    }
    #[must_use]
    pub fn akf(&self) -> AKF {
        match self {
            SecurityMaterials::App(..) => AKF(true),
            SecurityMaterials::Device(..) => AKF(false),
        }
    }
    /// `AID` that goes in the lower transport header. Device keys always use 0.
    #[must_use]
    pub fn aid(&self) -> AID {
        match self {
            SecurityMaterials::App(_, _, aid) => *aid,
            SecurityMaterials::Device(..) => AID::new_masked(0),
        }
    }
    pub fn encrypt(&self, payload: &mut [u8], mic_size: MicSize) -> Result<MIC, Error> {
        let (nonce, key) = self.unpack();
        AESCipher::new(*key).ccm_encrypt(nonce, b"", payload, mic_size)
    }
    pub fn decrypt(&self, payload: &mut [u8], mic: MIC) -> Result<(), Error> {
        let (nonce, key) = self.unpack();
        AESCipher::new(*key).ccm_decrypt(nonce, b"", payload, mic)
    }
}
/// Plaintext Access PDU.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AppPayload {
    data: Vec<u8>,
}
impl AppPayload {
    /// Encrypts the Access Payload in-place. It reuses the data `Vec` containing the plaintext
    /// data to hold the encrypted data.
    pub fn encrypt(
        self,
        sm: &SecurityMaterials<'_>,
        mic_size: MicSize,
    ) -> Result<EncryptedAppPayload, Error> {
        let mut data = self.data;
        let mic = sm.encrypt(data.as_mut(), mic_size)?;
        Ok(EncryptedAppPayload::new(data, mic, sm.akf(), sm.aid()))
    }
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.data.as_ref()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    #[must_use]
    pub fn new(payload: Vec<u8>) -> Self {
        Self { data: payload }
    }
}
/// Upper Transport Access PDU. Encrypted Access PDU followed by the TransMIC.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EncryptedAppPayload {
    data: Vec<u8>,
    mic: MIC,
    akf: AKF,
    aid: AID,
}
impl EncryptedAppPayload {
    #[must_use]
    pub fn new(data: Vec<u8>, mic: MIC, akf: AKF, aid: AID) -> Self {
        Self {
            data,
            mic,
            akf,
            aid,
        }
    }
    /// Splits the reassembled Upper Transport PDU into encrypted data and TransMIC.
    /// Returns `None` if there isn't at least 1 byte of data in front of the MIC.
    #[must_use]
    pub fn from_upper_pdu(pdu: &[u8], mic_size: MicSize, akf: AKF, aid: AID) -> Option<Self> {
        let mic_len = mic_size.byte_size();
        if pdu.len() <= mic_len {
            return None;
        }
        let (data, mic) = pdu.split_at(pdu.len() - mic_len);
        Some(Self::new(
            data.to_vec(),
            MIC::try_from_bytes_be(mic)?,
            akf,
            aid,
        ))
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
    #[must_use]
    pub fn mic(&self) -> MIC {
        self.mic
    }
    #[must_use]
    pub fn akf(&self) -> AKF {
        self.akf
    }
    #[must_use]
    pub fn aid(&self) -> AID {
        self.aid
    }
    /// Decrypts a copy of the payload so a failed attempt leaves `self` untouched for the next
    /// key candidate.
    pub fn decrypt(&self, sm: &SecurityMaterials<'_>) -> Result<AppPayload, Error> {
        let mut data = self.data.clone();
        sm.decrypt(data.as_mut(), self.mic)?;
        Ok(AppPayload::new(data))
    }
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_len() + self.mic.byte_size()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// `data || MIC` (MIC Big Endian).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.data);
        out.resize(self.len(), 0);
        self.mic.be_pack_into(&mut out[self.data.len()..]);
        out
    }
    #[must_use]
    pub fn should_segment(&self) -> bool {
        self.len() > UNSEGMENTED_ACCESS_PDU_LEN
    }
    /// Segments needed to carry this PDU (`ceil(len / 12)`), or 1 if it fits unsegmented.
    #[must_use]
    pub fn seg_count(&self) -> usize {
        if self.should_segment() {
            seg_count(self.len(), SegmentedAccessPDU::max_seg_len())
        } else {
            1
        }
    }
}
/// `ceil(len / max_seg_len)`.
#[must_use]
pub fn seg_count(len: usize, max_seg_len: usize) -> usize {
    (len + max_seg_len - 1) / max_seg_len
}
