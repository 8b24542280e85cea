//! A module for crypto AES functions. Essentially a wrapper around the RustCrypto `aes`, `ccm`
//! and `cmac` crates. This lets the rest of the library code to not have a hard dependence
//! on any 3rd party libs. Bluetooth Mesh uses 128-bit exclusively as its Key bit size.

use crate::crypto::key::Key;
use crate::crypto::{nonce::Nonce, Salt, MIC};
use aead::AeadInPlace;
use aes::cipher::consts::{U13, U4, U8};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use ccm::Ccm;
use cmac::{Cmac, Mac};
use core::fmt::{Display, Formatter};

pub const AES_BLOCK_LEN: usize = 16;
pub type AesBlock = [u8; AES_BLOCK_LEN];
/// Returned when a key can't be used to decrypt. (Wrong Key?)
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Error;
impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("AES-CCM authentication failed")
    }
}
impl std::error::Error for Error {}
type AesCcmBigMic = Ccm<Aes128, U8, U13>;
type AesCcmSmallMic = Ccm<Aes128, U4, U13>;
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum MicSize {
    Big,
    Small,
}
impl MicSize {
    #[must_use]
    pub fn byte_size(self) -> usize {
        match self {
            MicSize::Big => MIC::big_size(),
            MicSize::Small => MIC::small_size(),
        }
    }
    #[must_use]
    pub fn is_big(self) -> bool {
        match self {
            MicSize::Big => true,
            MicSize::Small => false,
        }
    }
}
impl Default for MicSize {
    fn default() -> Self {
        MicSize::Small
    }
}
pub struct AESCipher(Key);
impl AESCipher {
    #[must_use]
    pub const fn new(key: Key) -> AESCipher {
        AESCipher(key)
    }
    fn key_array(&self) -> &GenericArray<u8, aes::cipher::consts::U16> {
        GenericArray::from_slice(self.0.as_ref())
    }
    /// Encrypts a single 16 byte block with AES-ECB. Only used for the network header
    /// obfuscation (PECB).
    #[must_use]
    pub fn ecb_encrypt(&self, input: &AesBlock) -> AesBlock {
        let cipher = Aes128::new(self.key_array());
        let mut block = GenericArray::clone_from_slice(&input[..]);
        cipher.encrypt_block(&mut block);
        let mut out = [0_u8; AES_BLOCK_LEN];
        out.copy_from_slice(block.as_slice());
        out
    }
    #[must_use]
    pub fn cmac(&self, m: &[u8]) -> Key {
        self.cmac_slice(&[m])
    }
    #[must_use]
    pub fn cmac_slice(&self, ms: &[&[u8]]) -> Key {
        let mut cmac_context = <Cmac<Aes128> as KeyInit>::new(self.key_array());
        for m in ms {
            if !m.is_empty() {
                cmac_context.update(m);
            }
        }
        let code = cmac_context.finalize().into_bytes();
        let mut out = [0_u8; AES_BLOCK_LEN];
        out.copy_from_slice(code.as_slice());
        Key::new(out)
    }
    /// AES CCM encryption of the payload in place. Returns the detached MIC of `mic_size`.
    pub fn ccm_encrypt(
        &self,
        nonce: &Nonce,
        associated_data: &[u8],
        payload: &mut [u8],
        mic_size: MicSize,
    ) -> Result<MIC, Error> {
        let nonce = GenericArray::from_slice(nonce.as_ref());
        let tag = match mic_size {
            MicSize::Big => AesCcmBigMic::new(self.key_array())
                .encrypt_in_place_detached(nonce, associated_data, payload)
                .map_err(|_| Error)?
                .to_vec(),
            MicSize::Small => AesCcmSmallMic::new(self.key_array())
                .encrypt_in_place_detached(nonce, associated_data, payload)
                .map_err(|_| Error)?
                .to_vec(),
        };
        MIC::try_from_bytes_be(&tag).ok_or(Error)
    }
    /// AES CCM decryption of the payload. To supply no associated data, pass it an empty slice
    /// (such as `b""`). This function will return an [`Error`] if the MIC doesn't match; the
    /// payload must be treated as garbage in that case.
    pub fn ccm_decrypt(
        &self,
        nonce: &Nonce,
        associated_data: &[u8],
        payload: &mut [u8],
        mic: MIC,
    ) -> Result<(), Error> {
        let nonce = GenericArray::from_slice(nonce.as_ref());
        match mic {
            MIC::Big(b) => AesCcmBigMic::new(self.key_array())
                .decrypt_in_place_detached(
                    nonce,
                    associated_data,
                    payload,
                    GenericArray::from_slice(&b.to_be_bytes()),
                )
                .map_err(|_| Error),
            MIC::Small(s) => AesCcmSmallMic::new(self.key_array())
                .decrypt_in_place_detached(
                    nonce,
                    associated_data,
                    payload,
                    GenericArray::from_slice(&s.to_be_bytes()),
                )
                .map_err(|_| Error),
        }
    }
}

impl From<Key> for AESCipher {
    fn from(k: Key) -> Self {
        Self::new(k)
    }
}
impl From<Salt> for AESCipher {
    fn from(s: Salt) -> Self {
        s.as_key().into()
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ccm_round_trip() {
        let cipher = AESCipher::new(Key::new([0x42; 16]));
        let nonce = Nonce::new([0x01; 13]);
        let plain = *b"hello mesh";
        let mut buf = plain;
        let mic = cipher
            .ccm_encrypt(&nonce, b"", &mut buf[..], MicSize::Small)
            .unwrap();
        assert_eq!(mic.byte_size(), 4);
        assert_ne!(buf, plain);
        cipher.ccm_decrypt(&nonce, b"", &mut buf[..], mic).unwrap();
        assert_eq!(buf, plain);
    }
    #[test]
    fn test_ccm_wrong_mic() {
        let cipher = AESCipher::new(Key::new([0x42; 16]));
        let nonce = Nonce::new([0x01; 13]);
        let mut buf = *b"segment";
        let mic = cipher
            .ccm_encrypt(&nonce, b"", &mut buf[..], MicSize::Big)
            .unwrap();
        let bad = match mic {
            MIC::Big(b) => MIC::Big(b ^ 1),
            MIC::Small(s) => MIC::Small(s ^ 1),
        };
        assert_eq!(
            cipher.ccm_decrypt(&nonce, b"", &mut buf[..], bad),
            Err(Error)
        );
    }
}
