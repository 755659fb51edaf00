//! LEAF: a single-file encrypted, log-structured store for small,
//! high-value structured data (passwords, notes, bookmarks).
//!
//! A [`File`] binds a caller-supplied 32-byte access key to a [`Database`]
//! of named [`Table`]s, each mapping string keys to arbitrary JSON values.
//! Every mutation is appended to an in-memory log; [`Database::rewind`] and
//! [`Database::revert`] let a caller inspect (and undo inspecting) any
//! prior point in that log's history before deciding whether to persist it.
//!
//! This crate is the storage engine only: a CLI, interactive passphrase
//! prompting, atomic file replacement, and passphrase-to-key derivation are
//! deliberately out of scope. Callers supply a 32-byte key and any
//! `std::io::Read`/`std::io::Write`.

mod codec;
mod entry;
mod envelope;
mod error;
mod secret;

pub mod database;
pub mod file;
pub mod table;

pub use database::Database;
pub use entry::LogEntry;
pub use error::{Error, Result};
pub use file::File;
pub use table::Table;
