//! 128 bit keys. Each role (network, application, device, and the two `k2` outputs) is its own
//! newtype around [`Key`] so one can't be passed where another is expected.
use crate::crypto::{hex_16_to_array, Salt, AID};
use crate::random::{self, Randomizable};
use core::fmt::{Formatter, LowerHex};

pub const KEY_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Key([u8; KEY_LEN]);
pub const ZERO_KEY: Key = Key([0_u8; KEY_LEN]);

impl Key {
    #[must_use]
    pub const fn new(key_bytes: [u8; KEY_LEN]) -> Key {
        Key(key_bytes)
    }
    /// 32 hex characters, big endian.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Key> {
        hex_16_to_array(hex).map(Key)
    }
    #[must_use]
    pub const fn as_salt(&self) -> Salt {
        Salt::new(self.0)
    }
}
impl Randomizable for Key {
    fn random_secure() -> Self {
        Key(random::rand_16_bytes())
    }
}
impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
impl LowerHex for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{:02x}", b))
    }
}
macro_rules! key_newtype {
    ( $( $(#[$meta:meta])* $name:ident ),* ) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Hash, Eq, PartialOrd, PartialEq, Ord)]
            #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
            pub struct $name(Key);
            impl $name {
                #[must_use]
                pub const fn new_bytes(key_bytes: [u8; KEY_LEN]) -> Self {
                    Self(Key(key_bytes))
                }
                #[must_use]
                pub const fn new(key: Key) -> Self {
                    Self(key)
                }
                #[must_use]
                pub fn from_hex(hex: &str) -> Option<Self> {
                    Key::from_hex(hex).map(Self)
                }
                #[must_use]
                pub const fn key(&self) -> &Key {
                    &self.0
                }
            }
            impl Randomizable for $name {
                fn random_secure() -> Self {
                    Self(Key::random_secure())
                }
            }
        )*
    };
}
key_newtype!(
    /// Network Key. Every network PDU is secured with key material derived from it (`k2`).
    NetKey,
    /// Application Key. Secures access messages to/from models bound to it.
    AppKey,
    /// Device Key. Unique per node and only known by the node and the provisioner.
    DevKey,
    EncryptionKey,
    PrivacyKey
);

impl AppKey {
    #[must_use]
    pub fn aid(&self) -> AID {
        super::k4(self)
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hex() {
        let key = Key::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(format!("{:x}", key), "000102030405060708090a0b0c0d0e0f");
        assert!(Key::from_hex("0001").is_none());
        assert_eq!(
            DevKey::from_hex("000102030405060708090A0B0C0D0E0F").map(|k| *k.key()),
            Some(key)
        );
    }
    #[test]
    fn test_random_keys_differ() {
        assert_ne!(AppKey::random_secure(), AppKey::random_secure());
    }
}
