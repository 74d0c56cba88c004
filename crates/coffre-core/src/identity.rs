//! Identity tokens: the secret, public, and provisional halves.
//!
//! Tokens are hex-encoded CBOR so they survive copy-paste through any
//! transport. An [`Identity`] is the secret token a device uses to start a
//! session; a [`PublicIdentity`] is the shareable half usable as a sharing
//! recipient; a [`ProvisionalIdentity`] pre-issues an identity for an email
//! address before its owner ever creates a device.

use rand::RngCore;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Error;

/// Secret identity token binding a user to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    app_id: String,
    user_id: String,
    user_secret: [u8; 32],
}

impl Identity {
    /// Mint a fresh identity for `user_id` within `app_id`.
    ///
    /// In production this runs wherever the application's identity server
    /// lives; the secret never reaches the encryption backend.
    pub fn create(app_id: &str, user_id: &str) -> Self {
        let mut user_secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut user_secret);
        Self { app_id: app_id.to_string(), user_id: user_id.to_string(), user_secret }
    }

    /// Parse a secret identity token.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on any malformed token, detected locally.
    pub fn from_token(token: &str) -> Result<Self, Error> {
        decode_token(token, "identity")
    }

    /// Serialize to a transportable token string.
    pub fn to_token(&self) -> String {
        encode_token(self)
    }

    /// Derive the shareable half of this identity.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            app_id: self.app_id.clone(),
            target: IdentityTarget::User(self.user_id.clone()),
        }
    }

    /// Application this identity belongs to.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// User this identity names.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Who a public identity designates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityTarget {
    /// A registered user, by user ID.
    User(String),
    /// A not-yet-claimed provisional identity, by email address.
    ProvisionalEmail(String),
}

/// Shareable, non-secret identity usable as an encryption recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicIdentity {
    app_id: String,
    target: IdentityTarget,
}

impl PublicIdentity {
    /// Parse a public identity token.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on any malformed token.
    pub fn from_token(token: &str) -> Result<Self, Error> {
        decode_token(token, "public identity")
    }

    /// Serialize to a transportable token string.
    pub fn to_token(&self) -> String {
        encode_token(self)
    }

    /// Application this identity belongs to.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Who this identity designates.
    pub fn target(&self) -> &IdentityTarget {
        &self.target
    }
}

/// Secret half of a provisional identity issued for an email address.
///
/// Claiming it (see
/// [`Session::attach_provisional_identity`](crate::Session::attach_provisional_identity))
/// grants access to everything previously encrypted for the matching public
/// provisional identity, which is why the claim demands proof of control
/// over the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalIdentity {
    app_id: String,
    email: String,
    claim_secret: [u8; 32],
}

impl ProvisionalIdentity {
    /// Mint a provisional identity for `email` within `app_id`.
    pub fn create(app_id: &str, email: &str) -> Self {
        let mut claim_secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut claim_secret);
        Self { app_id: app_id.to_string(), email: email.to_string(), claim_secret }
    }

    /// Parse a provisional identity token.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] on any malformed token.
    pub fn from_token(token: &str) -> Result<Self, Error> {
        decode_token(token, "provisional identity")
    }

    /// Serialize to a transportable token string.
    pub fn to_token(&self) -> String {
        encode_token(self)
    }

    /// Derive the shareable half, usable as a sharing recipient before the
    /// identity is ever claimed.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            app_id: self.app_id.clone(),
            target: IdentityTarget::ProvisionalEmail(self.email.clone()),
        }
    }

    /// Application this identity belongs to.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Email address this identity is reserved for.
    pub fn email(&self) -> &str {
        &self.email
    }
}

fn encode_token<T: Serialize>(value: &T) -> String {
    let mut raw = Vec::new();
    let Ok(()) = ciborium::ser::into_writer(value, &mut raw) else {
        unreachable!("CBOR serialization of an identity token cannot fail");
    };
    hex::encode(raw)
}

fn decode_token<T: DeserializeOwned>(token: &str, what: &str) -> Result<T, Error> {
    if token.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} token must not be empty")));
    }
    let raw = hex::decode(token)
        .map_err(|_| Error::InvalidArgument(format!("{what} token is not valid hex")))?;
    ciborium::de::from_reader(raw.as_slice())
        .map_err(|_| Error::InvalidArgument(format!("{what} token is malformed")))
}
