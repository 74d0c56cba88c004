//! Coffre SDK Core
//!
//! Session-oriented client-side end-to-end encryption: device sessions with
//! registration and verification sub-states, buffer and stream encryption
//! with recipient sharing, provisional identities, groups, and device
//! revocation. All server-side resolution (identities, proofs, key grants,
//! membership, revocation status) lives behind the [`BackendClient`]
//! capability; all cryptographic sealing lives in `coffre-crypto`.
//!
//! # Architecture
//!
//! Every backend operation completes exactly once on a worker thread owned
//! by the backend implementation; the [`bridge`] module marshals that
//! result back to the blocking caller through a one-shot channel. A
//! [`Session`] is exclusively owned and externally serialized by its
//! caller; only the bridge and the process-wide log handler are internally
//! thread-safe.
//!
//! # Components
//!
//! - [`Session`]: lifecycle state machine and buffer encryption engine
//! - [`EncryptionSession`]: recipient-bound reusable encryptor
//! - [`OutputStream`]: pull side of stream encryption/decryption
//! - [`Verification`] / [`VerificationMethod`]: identity proofs
//! - [`Identity`] / [`PublicIdentity`] / [`ProvisionalIdentity`]: tokens
//! - [`BackendClient`]: the consumed network capability
//! - [`set_log_handler`]: process-wide log registration

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
pub mod bridge;
mod device;
mod encryption_session;
mod error;
mod group;
mod identity;
mod loghandler;
mod rng;
mod session;
mod stream;
mod types;
mod verification;

pub use coffre_crypto::{ResourceId, SIMPLE_OVERHEAD, STREAM_HEADER_SIZE, resource_id};
pub use encryption_session::EncryptionSession;
pub use error::{Error, ErrorKind};
pub use identity::{Identity, IdentityTarget, ProvisionalIdentity, PublicIdentity};
pub use loghandler::{LogLevel, LogRecord, clear_log_handler, set_log_handler};
pub use session::{EncryptionOptions, Session, SessionConfig};
pub use stream::{OutputStream, STREAM_CHUNK_SIZE};
pub use types::{DeviceId, DeviceInfo, DeviceToken, GroupId, Status};
pub use verification::{AttachResult, Verification, VerificationMethod};

pub use backend::BackendClient;
