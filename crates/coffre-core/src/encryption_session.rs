//! Recipient-bound reusable encryptor.
//!
//! An [`EncryptionSession`] fixes a sharing policy once, at creation, and
//! then encrypts any number of buffers or streams for those recipients
//! without another key registration. Every ciphertext it produces carries
//! the same [`ResourceId`], so one `share` call covers all of them.

use std::{
    io::Read,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use coffre_crypto::{ResourceId, ResourceKey, seal};

use crate::{error::Error, rng, stream::OutputStream};

/// A lightweight sharing-policy binder created by
/// [`Session::encryption_session`](crate::Session::encryption_session).
///
/// Valid only while the parent [`Session`](crate::Session) that opened it
/// stays `Ready`: once the parent stops or is destroyed, every operation
/// fails with [`Error::PreconditionFailed`], even if the parent is started
/// again later.
pub struct EncryptionSession {
    key: ResourceKey,
    resource_id: ResourceId,
    parent_ready: Arc<AtomicBool>,
}

impl EncryptionSession {
    pub(crate) fn new(
        key: ResourceKey,
        resource_id: ResourceId,
        parent_ready: Arc<AtomicBool>,
    ) -> Self {
        Self { key, resource_id, parent_ready }
    }

    /// The resource ID stamped on every ciphertext this session produces.
    ///
    /// Always equal to
    /// [`get_resource_id`](crate::Session::get_resource_id) of any output.
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Encrypt a buffer under the bound policy.
    ///
    /// The key registration already happened at creation, so no backend
    /// call is made.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] once the parent session is no longer
    /// `Ready`.
    pub fn encrypt(&self, clear_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.guard()?;
        Ok(seal(&self.key, self.resource_id, &rng::random_array(), clear_data))
    }

    /// Encrypt a stream of unbounded length under the bound policy.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] once the parent session is no longer
    /// `Ready`.
    pub fn stream_encrypt<R>(&self, clear_source: R) -> Result<OutputStream, Error>
    where
        R: Read + Send + 'static,
    {
        self.guard()?;
        Ok(OutputStream::spawn_encrypt(self.key.clone(), self.resource_id, clear_source))
    }

    fn guard(&self) -> Result<(), Error> {
        if self.parent_ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::PreconditionFailed(
                "the parent session is no longer ready".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for EncryptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSession")
            .field("resource_id", &self.resource_id)
            .finish_non_exhaustive()
    }
}
