//! A zeroizing 32-byte secret, used for the plaintext data key.
//!
//! The data key lives for the lifetime of a `File` but must never survive
//! past it in memory: it is wiped on drop, and on load failure once it has
//! been decoded but before the `File` is fully constructed.

use zeroize::Zeroize;

pub struct SecretKey([u8; 32]);

impl SecretKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}
