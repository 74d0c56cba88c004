//! Application-level test driver.
//!
//! A [`TestApp`] plays the role the application vendor plays in
//! production: it owns the backend, mints identities on its identity
//! server, and relays verification codes that would normally arrive by
//! email.

use std::sync::Arc;

use coffre_core::{
    BackendClient, Error, Identity, ProvisionalIdentity, Session, SessionConfig, Status,
    Verification,
};
use rand::RngCore;

use crate::backend::TestBackend;

/// Passphrase used by [`TestApp::open_ready_session`] when it registers or
/// verifies on the caller's behalf.
pub const DEFAULT_PASSPHRASE: &str = "six seahorses in a paper cup";

/// One test application: a fresh backend plus identity-minting helpers.
pub struct TestApp {
    app_id: String,
    backend: Arc<TestBackend>,
}

impl TestApp {
    /// Create an application with a random ID and an empty backend.
    pub fn new() -> Self {
        let app_id = format!("app-{}", hex::encode(random_bytes::<8>()));
        let backend = Arc::new(TestBackend::new(&app_id));
        Self { app_id, backend }
    }

    /// The application's ID.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The backend, as the capability sessions consume.
    pub fn client(&self) -> Arc<dyn BackendClient> {
        Arc::clone(&self.backend) as Arc<dyn BackendClient>
    }

    /// The backend, with harness-only helpers available.
    pub fn backend(&self) -> &TestBackend {
        &self.backend
    }

    /// Mint a secret identity for `user_id`, as the identity server would.
    pub fn create_identity(&self, user_id: &str) -> Identity {
        Identity::create(&self.app_id, user_id)
    }

    /// Mint a provisional identity for an email address.
    pub fn create_provisional_identity(&self, email: &str) -> ProvisionalIdentity {
        ProvisionalIdentity::create(&self.app_id, email)
    }

    /// Configuration for a brand-new device.
    pub fn session_config(&self) -> SessionConfig {
        self.session_config_at(&format!("/tmp/coffre-test/{}", hex::encode(random_bytes::<8>())))
    }

    /// Configuration for a specific device path, for restart scenarios.
    pub fn session_config_at(&self, writable_path: &str) -> SessionConfig {
        SessionConfig {
            app_id: self.app_id.clone(),
            writable_path: writable_path.to_string(),
            url: None,
        }
    }

    /// Issue a verification code for `email`, as if delivered there.
    pub fn verification_code(&self, email: &str) -> String {
        self.backend.issue_verification_code(email)
    }

    /// Expire every outstanding verification code.
    pub fn expire_verification_codes(&self) {
        self.backend.expire_pending_codes();
    }

    /// A well-formed OIDC ID token for `subject`, in the harness format.
    pub fn oidc_token(&self, subject: &str) -> String {
        format!("oidc.{subject}.{}", hex::encode(random_bytes::<4>()))
    }

    /// Start a `Ready` session for `identity` on a brand-new device,
    /// registering or verifying with [`DEFAULT_PASSPHRASE`] as needed.
    ///
    /// # Errors
    ///
    /// Whatever the underlying start, register, or verify call returns.
    pub fn open_ready_session(&self, identity: &Identity) -> Result<Session, Error> {
        self.open_ready_session_at(
            identity,
            &format!("/tmp/coffre-test/{}", hex::encode(random_bytes::<8>())),
        )
    }

    /// Like [`TestApp::open_ready_session`], but on a specific device path.
    ///
    /// # Errors
    ///
    /// Whatever the underlying start, register, or verify call returns.
    pub fn open_ready_session_at(
        &self,
        identity: &Identity,
        writable_path: &str,
    ) -> Result<Session, Error> {
        let mut session = Session::new(self.session_config_at(writable_path), self.client())?;
        match session.start(&identity.to_token())? {
            Status::Ready => {},
            Status::IdentityRegistrationNeeded => {
                session.register_identity(Verification::Passphrase(
                    DEFAULT_PASSPHRASE.to_string(),
                ))?;
            },
            Status::IdentityVerificationNeeded => {
                session
                    .verify_identity(Verification::Passphrase(DEFAULT_PASSPHRASE.to_string()))?;
            },
            Status::Stopped => {
                return Err(Error::InternalError(
                    "start left the session stopped".to_string(),
                ));
            },
        }
        Ok(session)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ready_session_out_of_the_box() {
        let app = TestApp::new();
        let alice = app.create_identity("alice");

        let session = app.open_ready_session(&alice).unwrap();
        assert_eq!(session.status(), Status::Ready);
        assert!(session.device_id().is_ok());
    }

    #[test]
    fn distinct_apps_get_distinct_ids() {
        assert_ne!(TestApp::new().app_id(), TestApp::new().app_id());
    }
}
