//! Test collaborators for the Coffre SDK.
//!
//! [`TestBackend`] is a complete in-memory [`BackendClient`] that completes
//! every call from a worker thread, and [`TestApp`] wraps it with the
//! identity-minting and code-delivery roles an application vendor plays in
//! production. Together they let integration tests drive full multi-user
//! scenarios without any network.
//!
//! [`BackendClient`]: coffre_core::BackendClient

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod app;
mod backend;

pub use app::{DEFAULT_PASSPHRASE, TestApp};
pub use backend::{MAX_CODE_ATTEMPTS, MAX_GROUP_SIZE, TestBackend};
