//! Binds a data-key pair to a [`Database`] and drives the load/save pipeline
//! by composing the codec, the wire envelope, and the database.

use std::io::{Read, Write};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::database::Database;
use crate::entry::LogEntry;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::secret::SecretKey;

const KEY_LEN: usize = 32;

/// The payload JSON, once decrypted and decompressed. Only `log` is
/// defined; unknown top-level fields are ignored for forward compatibility.
#[derive(Serialize, Deserialize)]
struct Payload {
    #[serde(default)]
    log: Vec<LogEntry>,
}

/// A LEAF archive: the two-tier key pair plus the database they protect.
///
/// The plaintext data key is sensitive and is wiped from memory as soon as
/// the `File` (or a failed `open` attempt) no longer needs it.
pub struct File {
    data_key_plain: Option<SecretKey>,
    data_key_cipher: Option<Vec<u8>>,
    db: Database,
}

fn require_key_len(key: &[u8]) -> Result<[u8; KEY_LEN]> {
    key.try_into().map_err(|_| Error::BadKeyLength(key.len()))
}

impl File {
    /// Creates a new, empty archive. Generates a fresh 32-byte data key and
    /// wraps it under `access_key` (which must be exactly 32 bytes).
    pub fn new(access_key: &[u8]) -> Result<Self> {
        let access_key = require_key_len(access_key)?;

        let mut raw = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut raw);
        let cipher = codec::encrypt(&access_key, &raw)?;

        tracing::debug!("created new archive");
        Ok(Self {
            data_key_plain: Some(SecretKey::new(raw)),
            data_key_cipher: Some(cipher),
            db: Database::new(),
        })
    }

    /// Opens an archive from `reader`, unwrapping the data key with
    /// `access_key` and replaying the log to rebuild the table index.
    ///
    /// Any plaintext data key decoded along the way is wiped before this
    /// function returns an error.
    pub fn open<R: Read>(access_key: &[u8], mut reader: R) -> Result<Self> {
        let access_key = require_key_len(access_key)?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let envelope = Envelope::from_json(&bytes)?;

        let data_key_bytes = codec::decrypt(&access_key, &envelope.key)?;
        let data_key = require_key_len(&data_key_bytes)
            .map_err(|_| Error::Malformed("data key has the wrong length".into()))?;
        // `plain` is dropped (and zeroised) on every path out of this
        // function, including the early returns below.
        let plain = SecretKey::new(data_key);

        let compressed = codec::decrypt(plain.as_bytes(), &envelope.data)?;
        let json_bytes = codec::decompress(&compressed)?;
        let payload: Payload =
            serde_json::from_slice(&json_bytes).map_err(|e| Error::Malformed(e.to_string()))?;
        let db = Database::from_log(payload.log)?;

        tracing::debug!(entries = db.log().len(), "opened archive");
        Ok(Self {
            data_key_plain: Some(plain),
            data_key_cipher: Some(envelope.key),
            db,
        })
    }

    /// Persists the database to `writer` in a single write: JSON-encode the
    /// log, Snappy-compress it, AEAD-encrypt it under the plaintext data
    /// key, and wrap the already-cached wrapped data key into the envelope.
    ///
    /// Does not generate a new data key or re-wrap it — the ciphertext form
    /// is reused verbatim so that reopening the file needs only the same
    /// access key.
    pub fn write_to<W: Write>(&mut self, mut writer: W) -> Result<()> {
        let plain = self
            .data_key_plain
            .as_ref()
            .ok_or_else(|| Error::Malformed("archive has no data key".into()))?;
        let cipher = self
            .data_key_cipher
            .as_ref()
            .ok_or_else(|| Error::Malformed("archive has no data key".into()))?;

        let payload = Payload {
            log: self.db.log().to_vec(),
        };
        let json_bytes = serde_json::to_vec(&payload).expect("log is always JSON-encodable");
        let compressed = codec::compress(&json_bytes);
        let data_blob = codec::encrypt(plain.as_bytes(), &compressed)?;

        let envelope = Envelope::new(cipher.clone(), data_blob);
        let out = envelope.to_json()?;
        writer.write_all(&out)?;

        self.db.mark_saved();
        tracing::debug!(entries = self.db.log().len(), "saved archive");
        Ok(())
    }

    /// Read-only access to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Mutable access to the underlying database (tables, rewind/revert).
    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }
}
