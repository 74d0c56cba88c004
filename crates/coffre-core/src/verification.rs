//! Verification proofs and registered-method descriptions.
//!
//! A [`Verification`] is a proof a caller presents to unlock key material;
//! a [`VerificationMethod`] describes a method registered on the user's
//! account. Both are closed sums, so every consumption site matches
//! exhaustively and an unhandled variant is a compile error.

use crate::{error::Error, types::Status};

/// A proof of identity presented to register, verify, or claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// An email address plus the code the backend delivered to it.
    Email {
        /// Address the code was requested for.
        email: String,
        /// Single-purpose code received at that address.
        verification_code: String,
    },
    /// A user-chosen passphrase.
    Passphrase(String),
    /// A self-held recovery secret from
    /// [`Session::generate_verification_key`](crate::Session::generate_verification_key).
    VerificationKey(String),
    /// An OIDC ID token whose subject must match the identity being
    /// verified.
    OidcIdToken(String),
}

impl Verification {
    /// The registered-method kind this proof corresponds to.
    pub fn method(&self) -> VerificationMethod {
        match self {
            Self::Email { email, .. } => VerificationMethod::Email(email.clone()),
            Self::Passphrase(_) => VerificationMethod::Passphrase,
            Self::VerificationKey(_) => VerificationMethod::VerificationKey,
            Self::OidcIdToken(_) => VerificationMethod::OidcIdToken,
        }
    }

    /// Reject structurally empty proofs before any backend round-trip.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        let problem = match self {
            Self::Email { email, .. } if email.is_empty() => Some("email must not be empty"),
            Self::Email { verification_code, .. } if verification_code.is_empty() => {
                Some("verification code must not be empty")
            },
            Self::Passphrase(passphrase) if passphrase.is_empty() => {
                Some("passphrase must not be empty")
            },
            Self::VerificationKey(key) if key.is_empty() => {
                Some("verification key must not be empty")
            },
            Self::OidcIdToken(token) if token.is_empty() => {
                Some("oidc id token must not be empty")
            },
            Self::Email { .. }
            | Self::Passphrase(_)
            | Self::VerificationKey(_)
            | Self::OidcIdToken(_) => None,
        };
        match problem {
            Some(reason) => Err(Error::InvalidArgument(reason.to_string())),
            None => Ok(()),
        }
    }
}

/// A verification method registered on a user's account.
///
/// A user may register several; at least one exists once registration
/// completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerificationMethod {
    /// Email-code verification, with the registered address.
    Email(String),
    /// Passphrase verification.
    Passphrase,
    /// A self-held recovery key. The library never stores it.
    VerificationKey,
    /// OIDC ID-token verification.
    OidcIdToken,
}

impl VerificationMethod {
    /// True if `other` replaces this method rather than adding a new one.
    ///
    /// Methods are keyed by kind: setting a new email replaces the old
    /// email method even when the address differs.
    pub fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Email(_), Self::Email(_))
                | (Self::Passphrase, Self::Passphrase)
                | (Self::VerificationKey, Self::VerificationKey)
                | (Self::OidcIdToken, Self::OidcIdToken)
        )
    }
}

/// Outcome of [`Session::attach_provisional_identity`](crate::Session::attach_provisional_identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachResult {
    /// `Ready` when the identity is claimed; `IdentityVerificationNeeded`
    /// when a proof must be presented first.
    pub status: Status,
    /// The method that must now be satisfied, when verification is needed.
    pub method: Option<VerificationMethod>,
}

impl crate::Session {
    /// The full set of verification methods registered for this user.
    ///
    /// Order is not significant. At least one method exists once
    /// registration has completed.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless `Ready`.
    pub fn verification_methods(&self) -> Result<Vec<VerificationMethod>, Error> {
        let token = self.ready_token("verification_methods")?;
        self.backend().verification_methods(token).wait()
    }

    /// Add a verification method, or replace the registered method of the
    /// same kind.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless `Ready`
    /// - [`Error::InvalidVerification`] when the proof itself fails (e.g. a
    ///   wrong email code)
    pub fn set_verification_method(&self, verification: Verification) -> Result<(), Error> {
        let token = self.ready_token("set_verification_method")?;
        verification.validate()?;
        self.backend().set_verification_method(token, verification).wait()
    }

    /// Generate a self-held recovery secret equivalent in power to full
    /// identity control.
    ///
    /// Valid only while registration is needed, before any other method is
    /// chosen. The caller must persist the key; the library never stores
    /// it.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless the status is
    /// `IdentityRegistrationNeeded`.
    pub fn generate_verification_key(&self) -> Result<String, Error> {
        let token = self.registration_token("generate_verification_key")?;
        self.backend().generate_verification_key(token).wait()
    }

    /// First or second phase of claiming a provisional identity.
    ///
    /// Claiming silently grants access to everything previously encrypted
    /// for the provisional identity, so it demands proof of control over
    /// the target email (or OIDC subject): the first call returns
    /// `IdentityVerificationNeeded` plus the method to satisfy, and after a
    /// matching [`Session::verify_provisional_identity`] a second call
    /// idempotently returns `Ready`.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless `Ready`.
    pub fn attach_provisional_identity(
        &self,
        provisional_token: &str,
    ) -> Result<AttachResult, Error> {
        let token = self.ready_token("attach_provisional_identity")?;
        let provisional = crate::identity::ProvisionalIdentity::from_token(provisional_token)?;
        self.backend().attach_provisional_identity(token, provisional).wait()
    }

    /// Present the proof demanded by a pending provisional attach.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidVerification`] when the proof does not match the
    ///   provisional identity's target (wrong code, mismatched OIDC
    ///   subject)
    /// - [`Error::PreconditionFailed`] unless `Ready`
    pub fn verify_provisional_identity(&self, verification: Verification) -> Result<(), Error> {
        let token = self.ready_token("verify_provisional_identity")?;
        verification.validate()?;
        self.backend().verify_provisional_identity(token, verification).wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_maps_to_its_method_kind() {
        let proof = Verification::Email {
            email: "alice@example.com".to_string(),
            verification_code: "12345678".to_string(),
        };
        assert_eq!(proof.method(), VerificationMethod::Email("alice@example.com".to_string()));

        assert_eq!(
            Verification::Passphrase("hunter2".to_string()).method(),
            VerificationMethod::Passphrase
        );
    }

    #[test]
    fn empty_proofs_are_rejected() {
        assert!(Verification::Passphrase(String::new()).validate().is_err());
        assert!(Verification::VerificationKey(String::new()).validate().is_err());
        assert!(
            Verification::Email { email: String::new(), verification_code: "1".to_string() }
                .validate()
                .is_err()
        );
        assert!(
            Verification::Email {
                email: "a@b.c".to_string(),
                verification_code: String::new()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn email_methods_replace_each_other_across_addresses() {
        let old = VerificationMethod::Email("old@example.com".to_string());
        let new = VerificationMethod::Email("new@example.com".to_string());
        assert!(old.same_kind(&new));
        assert!(!old.same_kind(&VerificationMethod::Passphrase));
    }
}
