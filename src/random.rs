//! Generalized over the rand Library so there's no hard dependencies.

/// Types that can be securely generated from random bytes (keys).
pub trait Randomizable: Sized {
    fn random_secure() -> Self;
}

#[must_use]
pub fn rand_16_bytes() -> [u8; 16] {
    rand::random()
}
