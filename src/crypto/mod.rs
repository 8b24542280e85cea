//! Mesh security: key types and derivation (`k_funcs`), AES-CCM/CMAC/ECB (`aes`), nonces and the
//! per-network/per-application key material the layers look keys up in (`materials`).
use crate::bytes::ToFromBytesEndian;
use crate::crypto::key::{Key, NetKey};
use core::fmt::{Display, Formatter};

pub mod aes;
pub mod k_funcs;
pub mod key;
pub mod materials;
pub mod nonce;

pub use k_funcs::{k1, k2, k3, k4, s1};

/// Parses 32 hex characters into 16 bytes.
#[must_use]
pub fn hex_16_to_array(hex: &str) -> Option<[u8; 16]> {
    if hex.len() != 32 || !hex.is_ascii() {
        return None;
    }
    let mut out = [0_u8; 16];
    for (byte, pair) in out.iter_mut().zip(hex.as_bytes().chunks(2)) {
        let pair = core::str::from_utf8(pair).ok()?;
        *byte = u8::from_str_radix(pair, 16).ok()?;
    }
    Some(out)
}

/// Message Integrity Check. Network PDUs use 32 bits (access) or 64 bits (control); the upper
/// transport uses 32 bits unless a segmented message asks for 64 (`SZMIC`).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MIC {
    Big(u64),
    Small(u32),
}
impl MIC {
    #[must_use]
    pub fn try_from_bytes_be(bytes: &[u8]) -> Option<MIC> {
        match bytes.len() {
            4 => Some(MIC::Small(u32::from_bytes_be(bytes)?)),
            8 => Some(MIC::Big(u64::from_bytes_be(bytes)?)),
            _ => None,
        }
    }
    /// 4 or 8.
    /// ```
    /// use bluetooth_mesh_stack::crypto::MIC;
    /// assert_eq!(MIC::Big(0u64).byte_size(), 8);
    /// assert_eq!(MIC::Small(0u32).byte_size(), 4);
    /// ```
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            MIC::Big(_) => Self::big_size(),
            MIC::Small(_) => Self::small_size(),
        }
    }
    /// Writes the MIC Big Endian into the front of `buffer`.
    /// # Panics
    /// Panics if `buffer.len() < self.byte_size()`.
    pub fn be_pack_into(&self, buffer: &mut [u8]) {
        match self {
            MIC::Big(b) => buffer[..8].copy_from_slice(&b.to_be_bytes()),
            MIC::Small(s) => buffer[..4].copy_from_slice(&s.to_be_bytes()),
        }
    }
    #[must_use]
    pub const fn small_size() -> usize {
        4
    }
    #[must_use]
    pub const fn big_size() -> usize {
        8
    }
}
impl Display for MIC {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            MIC::Big(b) => write!(f, "Big({:016X})", b),
            MIC::Small(s) => write!(f, "Small({:08X})", s),
        }
    }
}

/// 6 bit application key identifier from `k4`. Lets a receiver skip AppKeys that can't match.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
pub struct AID(u8);
impl AID {
    const MASK: u8 = 0x3F;
    /// # Panics
    /// Panics if `aid > 63`.
    #[must_use]
    pub fn new(aid: u8) -> AID {
        assert!(aid <= Self::MASK, "AID {} doesn't fit in 6 bits", aid);
        AID(aid)
    }
    /// Keeps the low 6 bits of `aid`.
    #[must_use]
    pub const fn new_masked(aid: u8) -> AID {
        AID(aid & Self::MASK)
    }
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}
impl Display for AID {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "AID(0x{:02X})", self.0)
    }
}
/// Application Key Flag. `true` when an `AppKey` secures the upper transport PDU,
/// `false` for the `DevKey`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
pub struct AKF(pub bool);

/// 128 bit salt from `s1`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
pub struct Salt([u8; 16]);
impl Salt {
    #[must_use]
    pub const fn new(salt: [u8; 16]) -> Salt {
        Salt(salt)
    }
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Salt> {
        hex_16_to_array(hex).map(Salt)
    }
    #[must_use]
    pub const fn as_key(&self) -> Key {
        Key::new(self.0)
    }
}
impl AsRef<[u8]> for Salt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
/// 64-bit Network ID derived from a `NetKey` with `k3`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
pub struct NetworkID(pub u64);
impl From<&NetKey> for NetworkID {
    fn from(k: &NetKey) -> Self {
        NetworkID(k3(k.key()))
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_16() {
        let bytes = hex_16_to_array("000102030405060708090a0b0c0d0eFF").unwrap();
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes[15], 0xFF);
        assert_eq!(hex_16_to_array("00"), None);
        assert_eq!(hex_16_to_array("zz0102030405060708090a0b0c0d0e0f"), None);
    }
    #[test]
    fn test_network_id() {
        let net_key = NetKey::from_hex("7dd7364cd842ad18c17c2b820c84c3d6").unwrap();
        assert_eq!(NetworkID::from(&net_key), NetworkID(0x3ecaff672f673370));
    }
}
