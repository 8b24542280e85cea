//! Key derivation functions (Mesh Profile 3.8.2). Everything is built on `s1` (salt generation)
//! and AES-CMAC. `k3` and `k4` are `k1` with fixed salts and suffixes.
use crate::crypto::aes::AESCipher;
use crate::crypto::key::{AppKey, EncryptionKey, Key, PrivacyKey, ZERO_KEY};
use crate::crypto::{Salt, AID};
use crate::mesh::NID;

/// `s1(M) = AES-CMAC_ZERO(M)`
#[must_use]
pub fn s1(m: impl AsRef<[u8]>) -> Salt {
    AESCipher::new(ZERO_KEY).cmac(m.as_ref()).as_salt()
}
/// `T = AES-CMAC_salt(N)`. The first step of `k1` and `k2`.
fn salted_key(n: &Key, salt: Salt) -> AESCipher {
    AESCipher::new(AESCipher::from(salt).cmac(n.as_ref()))
}
/// `k1(N, SALT, P) = AES-CMAC_T(P)`
#[must_use]
pub fn k1(n: &Key, salt: Salt, p: &[u8]) -> Key {
    salted_key(n, salt).cmac(p)
}
/// Network key material. `p == b"\x00"` gives the master credentials, the only ones this stack
/// sends with.
///
/// # Panics
/// Panics if `p` is empty.
#[must_use]
pub fn k2(n: &Key, p: impl AsRef<[u8]>) -> (NID, EncryptionKey, PrivacyKey) {
    let p = p.as_ref();
    assert!(!p.is_empty(), "k2 needs at least one octet of P");
    let t = salted_key(n, s1("smk2"));
    let t1 = t.cmac_slice(&[p, &[0x01]]);
    let t2 = t.cmac_slice(&[t1.as_ref(), p, &[0x02]]);
    let t3 = t.cmac_slice(&[t2.as_ref(), p, &[0x03]]);
    (
        NID::from_masked_u8(t1.as_ref()[15]),
        EncryptionKey::new(t2),
        PrivacyKey::new(t3),
    )
}
/// 64 bit network ID (the low 8 octets of `k1(N, s1("smk3"), "id64" || 0x01)`).
#[must_use]
pub fn k3(n: &Key) -> u64 {
    let k = k1(n, s1("smk3"), b"id64\x01");
    let mut id = [0_u8; 8];
    id.copy_from_slice(&k.as_ref()[8..]);
    u64::from_be_bytes(id)
}
/// 6 bit application key ID (the last octet of `k1(AppKey, s1("smk4"), "id6" || 0x01)`).
#[must_use]
pub fn k4(app_key: &AppKey) -> AID {
    let k = k1(app_key.key(), s1("smk4"), b"id6\x01");
    AID::new_masked(k.as_ref()[15])
}

/// Mesh Profile v1.0 sample data (8.1 and 8.2).
#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::NetKey;

    fn sample_net_key() -> NetKey {
        NetKey::from_hex("7dd7364cd842ad18c17c2b820c84c3d6").unwrap()
    }

    #[test]
    fn test_s1() {
        assert_eq!(
            s1("test"),
            Salt::from_hex("b73cefbd641ef2ea598c2b6efb62f79c").unwrap()
        );
    }
    #[test]
    fn test_k1() {
        let n = Key::from_hex("3216d1509884b533248541792b877f98").unwrap();
        let salt = Salt::from_hex("2ba14ffa0df84a2831938d57d276cab4").unwrap();
        let p = Key::from_hex("5a09d60797eeb4478aada59db3352a0d").unwrap();
        assert_eq!(
            k1(&n, salt, p.as_ref()),
            Key::from_hex("f6ed15a8934afbe7d83e8dcb57fcf5d7").unwrap()
        );
    }
    #[test]
    fn test_k2_master() {
        let n = Key::from_hex("f7a2a44f8e8a8029064f173ddc1e2b00").unwrap();
        assert_eq!(
            k2(&n, b"\x00"),
            (
                NID::new(0x7F),
                EncryptionKey::from_hex("9f589181a0f50de73c8070c7a6d27f46").unwrap(),
                PrivacyKey::from_hex("4c715bd4a64b938f99b453351653124f").unwrap()
            )
        );
    }
    #[test]
    fn test_k2_sample_network() {
        let (nid, encryption_key, privacy_key) = k2(sample_net_key().key(), [0x00]);
        assert_eq!(nid, NID::new(0x68));
        assert_eq!(
            encryption_key,
            EncryptionKey::from_hex("0953fa93e7caac9638f58820220a398e").unwrap()
        );
        assert_eq!(
            privacy_key,
            PrivacyKey::from_hex("8b84eedec100067d670971dd2aa700cf").unwrap()
        );
    }
    #[test]
    fn test_k3() {
        let n = Key::from_hex("f7a2a44f8e8a8029064f173ddc1e2b00").unwrap();
        assert_eq!(k3(&n), 0xff04_6958_233d_b014);
    }
    #[test]
    fn test_k4() {
        let app_key = AppKey::from_hex("3216d1509884b533248541792b877f98").unwrap();
        assert_eq!(k4(&app_key), AID::new(0x38));
    }
}
