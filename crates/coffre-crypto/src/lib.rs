//! Coffre Sealed-Resource Primitives
//!
//! Byte-level building blocks for the Coffre SDK: the sealed-resource wire
//! format, one-shot AEAD sealing, and the chunked stream format. Pure
//! functions with deterministic outputs. Callers provide random bytes, which
//! keeps every function testable without an entropy source.
//!
//! # Formats
//!
//! A sealed resource always begins with a one-byte format version followed by
//! a 16-byte resource ID, so the resource ID is recoverable from any
//! ciphertext by header inspection alone:
//!
//! ```text
//! simple (version 1):
//!   version(1) || resource_id(16) || nonce(24) || body(plaintext_len + 16)
//!
//! stream (version 2):
//!   version(1) || resource_id(16) || salt(16)
//!   then per chunk: length(4, BE) || body(chunk_len + 16)
//! ```
//!
//! The simple format has a fixed 57-byte overhead over the plaintext
//! ([`SIMPLE_OVERHEAD`]), independent of content. Stream chunks bind their
//! index into the AEAD nonce, so reordering and splicing chunks from other
//! positions fail authentication. Dropping trailing chunks whole is not
//! detectable at this layer; the stream consumer ends every stream with a
//! chunk shorter than its fixed chunk size and treats any other ending as
//! truncation.
//!
//! # Security
//!
//! - XChaCha20-Poly1305 AEAD; the full header is authenticated as associated
//!   data
//! - Stream chunk keys are HKDF-derived from the resource key and the stream
//!   salt, separating the one-shot and stream domains under one resource ID
//! - Key material is zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod format;
mod keys;
mod seal;
mod stream;

pub use error::SealError;
pub use format::{
    NONCE_SIZE, RESOURCE_ID_SIZE, SIMPLE_HEADER_SIZE, SIMPLE_OVERHEAD, SIMPLE_VERSION,
    STREAM_HEADER_SIZE, STREAM_VERSION, TAG_SIZE, resource_id,
};
pub use keys::{ResourceId, ResourceKey};
pub use seal::{open, seal};
pub use stream::{
    CHUNK_BODY_OVERHEAD, STREAM_SALT_SIZE, derive_chunk_key, open_chunk, parse_stream_header,
    seal_chunk, stream_header,
};
