//! Session state machine and buffer encryption engine.
//!
//! A [`Session`] owns one device's connection to the encryption backend:
//! `Stopped` until started, then `Ready` directly or via the registration
//! and verification sub-states. A session is exclusively owned by its
//! caller and is not internally serialized; concurrent use from several
//! threads must be coordinated by the owner. All backend calls block the
//! calling thread through the one-shot completion bridge.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use coffre_crypto::{ResourceId, ResourceKey, open, seal};

use crate::{
    backend::{BackendClient, OpenSessionRequest, ResourceGrant, SharePolicy},
    encryption_session::EncryptionSession,
    error::Error,
    identity::{Identity, PublicIdentity},
    loghandler::{self, LogLevel},
    rng,
    types::{DeviceId, DeviceToken, GroupId, Status},
    verification::Verification,
};

/// Configuration for creating a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The application this session belongs to.
    pub app_id: String,
    /// An existing filesystem path for persistent device-local data; also
    /// the stable reference that identifies this device to the backend.
    pub writable_path: String,
    /// Override of the backend service location. `None` uses the
    /// implementation default.
    pub url: Option<String>,
}

/// Sharing policy for [`Session::encrypt`] and friends.
#[derive(Debug, Clone)]
pub struct EncryptionOptions {
    /// Public identities of individual recipients, registered or
    /// provisional.
    pub share_with_users: Vec<PublicIdentity>,
    /// Group recipients.
    pub share_with_groups: Vec<GroupId>,
    /// Whether the encrypting user can decrypt the output. Defaults to
    /// true; when false, the author's own decrypt fails with
    /// `InvalidArgument` because the key was deliberately never granted.
    pub share_with_self: bool,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        Self { share_with_users: Vec::new(), share_with_groups: Vec::new(), share_with_self: true }
    }
}

impl EncryptionOptions {
    pub(crate) fn to_policy(&self) -> SharePolicy {
        SharePolicy {
            users: self.share_with_users.clone(),
            groups: self.share_with_groups.clone(),
            author_excluded: !self.share_with_self,
        }
    }
}

/// One device's connection to the encryption backend.
pub struct Session {
    backend: Arc<dyn BackendClient>,
    config: SessionConfig,
    status: Status,
    destroyed: bool,
    device_token: Option<DeviceToken>,
    device_id: Option<DeviceId>,
    /// Shared with every [`EncryptionSession`] opened from this session;
    /// true exactly while this session is `Ready`.
    ready_flag: Arc<AtomicBool>,
}

impl Session {
    /// Create a stopped session.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the application ID or writable path
    /// is empty, detected synchronously.
    pub fn new(config: SessionConfig, backend: Arc<dyn BackendClient>) -> Result<Self, Error> {
        if config.app_id.is_empty() {
            return Err(Error::InvalidArgument("application id must not be empty".to_string()));
        }
        if config.writable_path.is_empty() {
            return Err(Error::InvalidArgument("writable path must not be empty".to_string()));
        }
        Ok(Self {
            backend,
            config,
            status: Status::Stopped,
            destroyed: false,
            device_token: None,
            device_id: None,
            ready_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// This device's identifier.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless the session is `Ready`.
    pub fn device_id(&self) -> Result<DeviceId, Error> {
        self.guard()?;
        match (&self.device_id, self.status) {
            (Some(id), Status::Ready) => Ok(id.clone()),
            _ => Err(Error::PreconditionFailed(
                "device id is only available in Ready".to_string(),
            )),
        }
    }

    /// Start the session with a secret identity token.
    ///
    /// The backend decides whether this device/user pairing is new
    /// (`IdentityRegistrationNeeded`), known but untrusted on this device
    /// (`IdentityVerificationNeeded`), or already trusted (`Ready`).
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless the session is `Stopped`
    /// - [`Error::InvalidArgument`] on a malformed token or an identity for
    ///   a different application, detected before any backend call
    /// - [`Error::NetworkError`] / [`Error::InternalError`] from the
    ///   backend
    pub fn start(&mut self, identity_token: &str) -> Result<Status, Error> {
        self.guard()?;
        if self.status != Status::Stopped {
            return Err(Error::PreconditionFailed(format!(
                "cannot start from {:?}",
                self.status
            )));
        }

        let identity = Identity::from_token(identity_token)?;
        if identity.app_id() != self.config.app_id {
            return Err(Error::InvalidArgument(format!(
                "identity belongs to application {:?}, session is configured for {:?}",
                identity.app_id(),
                self.config.app_id
            )));
        }

        let opened = self
            .backend
            .open_session(OpenSessionRequest {
                app_id: self.config.app_id.clone(),
                user_id: identity.user_id().to_string(),
                local_device_ref: self.config.writable_path.clone(),
            })
            .wait()?;

        self.device_token = Some(opened.device_token);
        self.device_id = opened.device_id;
        self.status = opened.status;
        self.ready_flag.store(self.status == Status::Ready, Ordering::Release);
        loghandler::emit(
            LogLevel::Info,
            "session",
            format!("started for user {:?}: {:?}", identity.user_id(), self.status),
        );
        Ok(self.status)
    }

    /// Establish the user's first verification method and this device's
    /// key material, transitioning to `Ready`.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless the status is
    /// `IdentityRegistrationNeeded`.
    pub fn register_identity(&mut self, verification: Verification) -> Result<(), Error> {
        let token = self.token_in(Status::IdentityRegistrationNeeded, "register_identity")?;
        verification.validate()?;

        let device_id = self.backend.register_identity(token, verification).wait()?;
        self.device_id = Some(device_id);
        self.status = Status::Ready;
        self.ready_flag.store(true, Ordering::Release);
        loghandler::emit(LogLevel::Info, "session", "identity registered".to_string());
        Ok(())
    }

    /// Prove control of an already-registered method, transitioning to
    /// `Ready`.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless the status is
    ///   `IdentityVerificationNeeded`
    /// - [`Error::InvalidVerification`] / [`Error::TooManyAttempts`] /
    ///   [`Error::ExpiredVerification`] on a failed proof
    pub fn verify_identity(&mut self, verification: Verification) -> Result<(), Error> {
        let token = self.token_in(Status::IdentityVerificationNeeded, "verify_identity")?;
        verification.validate()?;

        let device_id = self.backend.verify_identity(token, verification).wait()?;
        self.device_id = Some(device_id);
        self.status = Status::Ready;
        self.ready_flag.store(true, Ordering::Release);
        loghandler::emit(LogLevel::Info, "session", "identity verified".to_string());
        Ok(())
    }

    /// Stop the session, releasing the backend connection.
    ///
    /// Stopping an already-stopped session is a no-op. The session can be
    /// started again afterwards, but encryption sessions opened before the
    /// stop stay dead: their parent run is over.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.guard()?;
        let Some(token) = self.device_token.take() else {
            return Ok(());
        };

        self.status = Status::Stopped;
        self.device_id = None;
        self.ready_flag.store(false, Ordering::Release);
        // A fresh flag for the next run; outstanding encryptors keep the
        // old one, permanently false
        self.ready_flag = Arc::new(AtomicBool::new(false));
        self.backend.close_session(token).wait()?;
        loghandler::emit(LogLevel::Info, "session", "stopped".to_string());
        Ok(())
    }

    /// Stop if necessary, then make the session permanently unusable.
    ///
    /// Every later call on this object fails fast with
    /// [`Error::PreconditionFailed`].
    pub fn destroy(&mut self) -> Result<(), Error> {
        self.stop()?;
        self.destroyed = true;
        loghandler::emit(LogLevel::Info, "session", "destroyed".to_string());
        Ok(())
    }

    /// Encrypt a buffer, registering its key with the backend under the
    /// sharing policy in `options` (or author-only when `None`).
    ///
    /// Output length is always `clear_data.len() + SIMPLE_OVERHEAD`; the
    /// empty input is legal and produces a header-only ciphertext.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless `Ready`
    /// - [`Error::DeviceRevoked`] once this device has been revoked
    /// - recipient validation errors from the backend, with no ciphertext
    ///   produced
    pub fn encrypt(
        &self,
        clear_data: &[u8],
        options: Option<&EncryptionOptions>,
    ) -> Result<Vec<u8>, Error> {
        let token = self.ready_token("encrypt")?;

        let key = ResourceKey::from_bytes(rng::random_array());
        let resource_id = ResourceId::from_bytes(rng::random_array());
        let policy = options.map(EncryptionOptions::to_policy).unwrap_or_default();

        // Register the grant first: if any recipient is invalid, fail with
        // no ciphertext handed out
        self.backend
            .publish_resource_key(token, ResourceGrant { resource_id, key: key.clone() }, policy)
            .wait()?;

        Ok(seal(&key, resource_id, &rng::random_array(), clear_data))
    }

    /// Decrypt a buffer previously produced by any session holding a grant
    /// this user can use.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] on input too short to carry a header,
    ///   detected before any backend call; also when the caller encrypted
    ///   this resource with `share_with_self = false`
    /// - [`Error::DecryptionFailed`] when no usable key is granted, or the
    ///   ciphertext fails authentication
    /// - [`Error::DeviceRevoked`] once this device has been revoked
    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>, Error> {
        let token = self.ready_token("decrypt")?;
        let resource_id = coffre_crypto::resource_id(encrypted_data)?;

        let key = self.backend.fetch_resource_key(token, resource_id).wait()?;
        Ok(open(&key, encrypted_data)?)
    }

    /// Read the resource ID out of a ciphertext header.
    ///
    /// Pure header inspection: requires no backend call, no decryption
    /// capability, and no particular session status.
    pub fn get_resource_id(&self, encrypted_data: &[u8]) -> Result<ResourceId, Error> {
        self.guard()?;
        Ok(coffre_crypto::resource_id(encrypted_data)?)
    }

    /// Share existing resources with more recipients and groups.
    ///
    /// Atomic across the whole list: all resources become shared with all
    /// recipients, or none do.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on an empty resource list, detected
    /// synchronously.
    pub fn share(
        &self,
        resource_ids: &[ResourceId],
        options: &EncryptionOptions,
    ) -> Result<(), Error> {
        let token = self.ready_token("share")?;
        if resource_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "resource id list must not be empty".to_string(),
            ));
        }

        let policy = SharePolicy {
            users: options.share_with_users.clone(),
            groups: options.share_with_groups.clone(),
            // Self-exclusion is an encryption-time decision only
            author_excluded: false,
        };
        self.backend.share(token, resource_ids.to_vec(), policy).wait()
    }

    /// Open an [`EncryptionSession`] that fixes a sharing policy once and
    /// amortizes the key registration over many encrypt calls.
    ///
    /// # Errors
    ///
    /// Same contract as [`Session::encrypt`] for the bound recipients.
    pub fn encryption_session(
        &self,
        options: Option<&EncryptionOptions>,
    ) -> Result<EncryptionSession, Error> {
        let token = self.ready_token("encryption_session")?;

        let key = ResourceKey::from_bytes(rng::random_array());
        let resource_id = ResourceId::from_bytes(rng::random_array());
        let policy = options.map(EncryptionOptions::to_policy).unwrap_or_default();

        self.backend
            .publish_resource_key(token, ResourceGrant { resource_id, key: key.clone() }, policy)
            .wait()?;

        Ok(EncryptionSession::new(key, resource_id, Arc::clone(&self.ready_flag)))
    }

    /// Fail unless the session is `Ready`, returning the device token.
    pub(crate) fn ready_token(&self, operation: &str) -> Result<DeviceToken, Error> {
        self.token_in(Status::Ready, operation)
    }

    /// Fail unless registration is still needed, returning the device
    /// token.
    pub(crate) fn registration_token(&self, operation: &str) -> Result<DeviceToken, Error> {
        self.token_in(Status::IdentityRegistrationNeeded, operation)
    }

    /// The backend capability, for sibling modules.
    pub(crate) fn backend(&self) -> &Arc<dyn BackendClient> {
        &self.backend
    }

    fn token_in(&self, required: Status, operation: &str) -> Result<DeviceToken, Error> {
        self.guard()?;
        if self.status != required {
            return Err(Error::PreconditionFailed(format!(
                "cannot {operation} from {:?}, requires {required:?}",
                self.status
            )));
        }
        self.device_token.ok_or_else(|| {
            Error::InternalError(format!("{required:?} session has no device token"))
        })
    }

    /// Used-after-destroy check, first line of every operation.
    fn guard(&self) -> Result<(), Error> {
        if self.destroyed {
            return Err(Error::PreconditionFailed("session used after destroy".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("app_id", &self.config.app_id)
            .field("status", &self.status)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}
