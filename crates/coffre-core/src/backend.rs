//! The backend capability consumed by every session.
//!
//! The network service that resolves identities, verification proofs, key
//! grants, group membership, and device revocation lives behind
//! [`BackendClient`]. Implementations own their worker threads and deliver
//! each result through the one-shot [`Completion`] bridge; the SDK never
//! assumes where completion happens.

use coffre_crypto::{ResourceId, ResourceKey};

use crate::{
    bridge::Completion,
    identity::{ProvisionalIdentity, PublicIdentity},
    types::{DeviceId, DeviceInfo, DeviceToken, GroupId, Status},
    verification::{AttachResult, Verification, VerificationMethod},
};

/// Request to open a device session.
#[derive(Debug, Clone)]
pub struct OpenSessionRequest {
    /// Application the identity is bound to.
    pub app_id: String,
    /// User named by the identity token.
    pub user_id: String,
    /// Stable reference for this device's local storage; the backend keys
    /// device records on (user, reference).
    pub local_device_ref: String,
}

/// Response to a successful `open_session`.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    /// Credential for every subsequent call in this session.
    pub device_token: DeviceToken,
    /// `Ready`, `IdentityRegistrationNeeded`, or
    /// `IdentityVerificationNeeded`.
    pub status: Status,
    /// The device's identifier, present when the device is already trusted.
    pub device_id: Option<DeviceId>,
}

/// Who may decrypt a resource.
#[derive(Debug, Clone, Default)]
pub struct SharePolicy {
    /// Individual recipients, registered or provisional.
    pub users: Vec<PublicIdentity>,
    /// Group recipients.
    pub groups: Vec<GroupId>,
    /// True when the author deliberately withheld access from themselves;
    /// the backend records the denial so the author's own fetch is an
    /// argument error rather than a missing-key error.
    pub author_excluded: bool,
}

/// A resource key being registered with the backend.
#[derive(Debug, Clone)]
pub struct ResourceGrant {
    /// The resource the key protects.
    pub resource_id: ResourceId,
    /// The key itself. Wrapping it for recipients is the backend's
    /// key-exchange concern, outside this SDK.
    pub key: ResourceKey,
}

/// Network service resolving identities, proofs, grants, groups, and
/// devices.
///
/// All methods are issued from the caller's thread and completed from the
/// implementation's workers; no method may block the caller itself. A
/// revoked device's token must make every method fail with
/// [`Error::DeviceRevoked`](crate::Error::DeviceRevoked).
pub trait BackendClient: Send + Sync {
    /// Open a device session, deciding the resulting [`Status`].
    fn open_session(&self, req: OpenSessionRequest) -> Completion<OpenedSession>;

    /// Close a device session, releasing its token.
    fn close_session(&self, device: DeviceToken) -> Completion<()>;

    /// Establish the user's first verification method and this device's
    /// trust. Valid only while registration is needed.
    fn register_identity(&self, device: DeviceToken, proof: Verification) -> Completion<DeviceId>;

    /// Prove control of an already-registered method to trust this device.
    fn verify_identity(&self, device: DeviceToken, proof: Verification) -> Completion<DeviceId>;

    /// Produce a self-held recovery secret. The backend remembers only that
    /// the method exists, never the secret.
    fn generate_verification_key(&self, device: DeviceToken) -> Completion<String>;

    /// The full set of registered methods, order not significant.
    fn verification_methods(&self, device: DeviceToken) -> Completion<Vec<VerificationMethod>>;

    /// Add a method, or replace the registered method of the same kind.
    fn set_verification_method(&self, device: DeviceToken, proof: Verification) -> Completion<()>;

    /// First or second phase of the provisional-identity claim.
    fn attach_provisional_identity(
        &self,
        device: DeviceToken,
        token: ProvisionalIdentity,
    ) -> Completion<AttachResult>;

    /// Present the proof demanded by a pending provisional attach.
    fn verify_provisional_identity(
        &self,
        device: DeviceToken,
        proof: Verification,
    ) -> Completion<()>;

    /// Register a fresh resource key together with its sharing policy.
    fn publish_resource_key(
        &self,
        device: DeviceToken,
        grant: ResourceGrant,
        policy: SharePolicy,
    ) -> Completion<()>;

    /// Fetch the key for a resource this device's user may decrypt.
    fn fetch_resource_key(&self, device: DeviceToken, id: ResourceId) -> Completion<ResourceKey>;

    /// Extend the sharing policy of existing resources. Atomic: all listed
    /// resources are shared with all named recipients, or none are.
    fn share(
        &self,
        device: DeviceToken,
        ids: Vec<ResourceId>,
        policy: SharePolicy,
    ) -> Completion<()>;

    /// Create a group from its initial members. Atomic: any invalid member
    /// means no group exists.
    fn create_group(
        &self,
        device: DeviceToken,
        members: Vec<PublicIdentity>,
    ) -> Completion<GroupId>;

    /// Add members to a group; they gain retroactive access to every
    /// resource ever shared with it.
    fn update_group_members(
        &self,
        device: DeviceToken,
        group: GroupId,
        members_to_add: Vec<PublicIdentity>,
    ) -> Completion<()>;

    /// All devices ever created for this user, including revoked ones.
    fn device_list(&self, device: DeviceToken) -> Completion<Vec<DeviceInfo>>;

    /// Revoke a device. One-way; the revoked device's operations start
    /// failing immediately.
    fn revoke_device(&self, device: DeviceToken, target: DeviceId) -> Completion<()>;
}
