//! AEAD encryption and Snappy compression over raw byte slices.
//!
//! Both operations are pure functions of a 32-byte key and a byte slice; the
//! codec never touches JSON or any LEAF-specific structure.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;

use crate::error::{Error, Result};

const NONCE_LEN: usize = 24;

/// Encrypts `plaintext` under `key`, returning `nonce || ciphertext || tag`.
///
/// A fresh 24-byte nonce is drawn from the OS CSPRNG on every call; nonces
/// are never derived from content, so repeated saves of identical data
/// produce different bytes.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| Error::AuthFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Splits `blob` into `nonce || ciphertext` and verifies + decrypts it under
/// `key`. Fails with `ShortInput` if there isn't even room for a nonce, and
/// `AuthFailed` if the tag does not verify (wrong key or tampered data).
pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(Error::ShortInput);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::AuthFailed)
}

/// Snappy-compresses `data`. Compression of well-formed input cannot fail.
pub fn compress(data: &[u8]) -> Vec<u8> {
    snap::raw::Encoder::new()
        .compress_vec(data)
        .expect("snappy compression of an in-memory buffer cannot fail")
}

/// Snappy-decompresses `data`, failing with `CompressionFailed` on malformed
/// input (corrupt frame header, truncated block, etc).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|e| Error::CompressionFailed(e.to_string()))
}
