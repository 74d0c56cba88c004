//! In-memory [`BackendClient`] implementation.
//!
//! [`TestBackend`] models one application's backend: users, devices,
//! verification methods, resource grants, groups, and provisional claims,
//! all in a single mutex-guarded table. Every trait method completes from a
//! spawned worker thread, so the completion bridge is exercised the same
//! way a real network client would exercise it.
//!
//! Keys are stored in the clear; wrapping them for recipients is a
//! key-exchange concern this harness does not model.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use coffre_core::{
    AttachResult, DeviceId, DeviceInfo, DeviceToken, Error, GroupId, IdentityTarget,
    ProvisionalIdentity, PublicIdentity, Status, Verification, VerificationMethod,
    backend::{BackendClient, OpenSessionRequest, OpenedSession, ResourceGrant, SharePolicy},
    bridge::{Completion, completion},
};
use coffre_crypto::{ResourceId, ResourceKey};
use rand::{Rng, RngCore};

/// Hard cap on group membership; exceeding it fails with
/// [`Error::GroupTooBig`].
pub const MAX_GROUP_SIZE: usize = 1000;

/// Wrong email codes tolerated before the code burns out.
pub const MAX_CODE_ATTEMPTS: u32 = 3;

struct DeviceRecord {
    local_ref: String,
    device_id: DeviceId,
    is_revoked: bool,
    trusted: bool,
}

enum MethodRecord {
    Email { address: String },
    Passphrase { passphrase: String },
    VerificationKey { key: String },
    Oidc { subject: String },
}

impl MethodRecord {
    fn describe(&self) -> VerificationMethod {
        match self {
            Self::Email { address } => VerificationMethod::Email(address.clone()),
            Self::Passphrase { .. } => VerificationMethod::Passphrase,
            Self::VerificationKey { .. } => VerificationMethod::VerificationKey,
            Self::Oidc { .. } => VerificationMethod::OidcIdToken,
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Default)]
struct UserRecord {
    methods: Vec<MethodRecord>,
    devices: Vec<DeviceRecord>,
    pending_verification_key: Option<String>,
}

struct SessionRecord {
    user_id: String,
    local_ref: String,
    /// Emails whose attach came back `IdentityVerificationNeeded` and is
    /// still waiting for a matching proof.
    pending_claims: HashSet<String>,
    verified_emails: HashSet<String>,
    verified_subjects: HashSet<String>,
}

struct ResourceRecord {
    key: ResourceKey,
    author: String,
    author_excluded: bool,
    users: HashSet<String>,
    emails: HashSet<String>,
    groups: HashSet<GroupId>,
}

struct GroupRecord {
    users: HashSet<String>,
    emails: HashSet<String>,
}

struct CodeRecord {
    code: String,
    attempts: u32,
    expired: bool,
}

struct State {
    app_id: String,
    next_token: u64,
    users: HashMap<String, UserRecord>,
    sessions: HashMap<u64, SessionRecord>,
    resources: HashMap<ResourceId, ResourceRecord>,
    groups: HashMap<GroupId, GroupRecord>,
    codes: HashMap<String, CodeRecord>,
    claimed: HashMap<String, String>,
}

/// One application's in-memory backend.
///
/// Shared as `Arc<TestBackend>` between the sessions under test and the
/// test driver; the driver side uses [`TestBackend::issue_verification_code`]
/// and [`TestBackend::expire_pending_codes`] to play the role of the email
/// delivery channel.
pub struct TestBackend {
    state: Arc<Mutex<State>>,
}

impl TestBackend {
    /// Create an empty backend for the given application.
    pub fn new(app_id: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                app_id: app_id.to_string(),
                next_token: 1,
                users: HashMap::new(),
                sessions: HashMap::new(),
                resources: HashMap::new(),
                groups: HashMap::new(),
                codes: HashMap::new(),
                claimed: HashMap::new(),
            })),
        }
    }

    /// Issue a fresh verification code for `email`, as if delivered there.
    ///
    /// Replaces any earlier code for the same address and resets its
    /// attempt counter.
    pub fn issue_verification_code(&self, email: &str) -> String {
        let code = format!("{:08}", rand::thread_rng().gen_range(0..100_000_000u32));
        self.lock().codes.insert(
            email.to_string(),
            CodeRecord { code: code.clone(), attempts: 0, expired: false },
        );
        code
    }

    /// Mark every outstanding verification code as expired.
    pub fn expire_pending_codes(&self) {
        for record in self.lock().codes.values_mut() {
            record.expired = true;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state on a worker thread, delivering its result
    /// through the bridge.
    fn run<T, F>(&self, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut State) -> Result<T, Error> + Send + 'static,
    {
        let (completer, done) = completion();
        let state = Arc::clone(&self.state);
        thread::spawn(move || {
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            completer.complete(f(&mut guard));
        });
        done
    }
}

impl BackendClient for TestBackend {
    fn open_session(&self, req: OpenSessionRequest) -> Completion<OpenedSession> {
        self.run(move |state| {
            if req.app_id != state.app_id {
                return Err(Error::InvalidArgument(format!(
                    "unknown application {:?}",
                    req.app_id
                )));
            }
            if req.user_id.is_empty() {
                return Err(Error::InvalidArgument("user id must not be empty".to_string()));
            }

            let user = state.users.entry(req.user_id.clone()).or_default();
            let index = match user.devices.iter().position(|d| d.local_ref == req.local_device_ref)
            {
                Some(index) => index,
                None => {
                    user.devices.push(DeviceRecord {
                        local_ref: req.local_device_ref.clone(),
                        device_id: DeviceId::from_bytes(random_bytes()),
                        is_revoked: false,
                        trusted: false,
                    });
                    user.devices.len() - 1
                },
            };
            let device = &user.devices[index];

            let status = if user.methods.is_empty() {
                Status::IdentityRegistrationNeeded
            } else if device.trusted {
                Status::Ready
            } else {
                Status::IdentityVerificationNeeded
            };
            let device_id = (status == Status::Ready).then(|| device.device_id.clone());

            let raw = state.next_token;
            state.next_token += 1;
            state.sessions.insert(
                raw,
                SessionRecord {
                    user_id: req.user_id.clone(),
                    local_ref: req.local_device_ref,
                    pending_claims: HashSet::new(),
                    verified_emails: HashSet::new(),
                    verified_subjects: HashSet::new(),
                },
            );
            tracing::debug!(user = %req.user_id, ?status, "session opened");

            Ok(OpenedSession { device_token: DeviceToken::from_raw(raw), status, device_id })
        })
    }

    fn close_session(&self, device: DeviceToken) -> Completion<()> {
        self.run(move |state| {
            state.sessions.remove(&device.as_raw());
            Ok(())
        })
    }

    fn register_identity(&self, device: DeviceToken, proof: Verification) -> Completion<DeviceId> {
        self.run(move |state| {
            let who = caller(state, device)?;
            if !user(state, &who.user_id)?.methods.is_empty() {
                return Err(Error::PreconditionFailed(
                    "identity is already registered".to_string(),
                ));
            }
            if let Verification::VerificationKey(key) = &proof {
                match &user(state, &who.user_id)?.pending_verification_key {
                    Some(expected) if expected == key => {},
                    Some(_) => {
                        return Err(Error::InvalidVerification(
                            "verification key does not match the generated one".to_string(),
                        ));
                    },
                    None => {
                        return Err(Error::InvalidVerification(
                            "no verification key was generated for this user".to_string(),
                        ));
                    },
                }
            }

            let record = prove_method(state, device, proof)?;
            let registered = user_mut(state, &who.user_id)?;
            registered.methods.push(record);
            registered.pending_verification_key = None;
            trust_device(state, &who);
            Ok(who.device_id)
        })
    }

    fn verify_identity(&self, device: DeviceToken, proof: Verification) -> Completion<DeviceId> {
        self.run(move |state| {
            let who = caller(state, device)?;
            if user(state, &who.user_id)?.methods.is_empty() {
                return Err(Error::PreconditionFailed(
                    "identity is not registered yet".to_string(),
                ));
            }
            check_proof(state, device, &who.user_id, proof)?;
            trust_device(state, &who);
            Ok(who.device_id)
        })
    }

    fn generate_verification_key(&self, device: DeviceToken) -> Completion<String> {
        self.run(move |state| {
            let who = caller(state, device)?;
            if !user(state, &who.user_id)?.methods.is_empty() {
                return Err(Error::PreconditionFailed(
                    "a verification key can only be generated before registration".to_string(),
                ));
            }
            let key = hex::encode(random_bytes::<32>());
            user_mut(state, &who.user_id)?.pending_verification_key = Some(key.clone());
            Ok(key)
        })
    }

    fn verification_methods(&self, device: DeviceToken) -> Completion<Vec<VerificationMethod>> {
        self.run(move |state| {
            let who = caller(state, device)?;
            Ok(user(state, &who.user_id)?.methods.iter().map(MethodRecord::describe).collect())
        })
    }

    fn set_verification_method(&self, device: DeviceToken, proof: Verification) -> Completion<()> {
        self.run(move |state| {
            let who = caller(state, device)?;
            if user(state, &who.user_id)?.methods.is_empty() {
                return Err(Error::PreconditionFailed(
                    "identity is not registered yet".to_string(),
                ));
            }
            let record = prove_method(state, device, proof)?;
            let methods = &mut user_mut(state, &who.user_id)?.methods;
            match methods.iter().position(|m| m.same_kind(&record)) {
                Some(index) => methods[index] = record,
                None => methods.push(record),
            }
            Ok(())
        })
    }

    fn attach_provisional_identity(
        &self,
        device: DeviceToken,
        token: ProvisionalIdentity,
    ) -> Completion<AttachResult> {
        self.run(move |state| {
            let who = caller(state, device)?;
            if token.app_id() != state.app_id {
                return Err(Error::InvalidArgument(
                    "provisional identity belongs to a different application".to_string(),
                ));
            }
            let email = token.email().to_string();

            if let Some(owner) = state.claimed.get(&email) {
                if *owner == who.user_id {
                    return Ok(AttachResult { status: Status::Ready, method: None });
                }
                return Err(Error::InvalidArgument(
                    "provisional identity was already claimed by another user".to_string(),
                ));
            }

            let proven = state.sessions.get(&device.as_raw()).is_some_and(|session| {
                session.verified_emails.contains(&email)
                    || session.verified_subjects.contains(&email)
            });
            if !proven {
                if let Some(session) = state.sessions.get_mut(&device.as_raw()) {
                    session.pending_claims.insert(email.clone());
                }
                return Ok(AttachResult {
                    status: Status::IdentityVerificationNeeded,
                    method: Some(VerificationMethod::Email(email)),
                });
            }

            // The claim rewrites every pending grant for this email into a
            // grant for the claiming user.
            state.claimed.insert(email.clone(), who.user_id.clone());
            for resource in state.resources.values_mut() {
                if resource.emails.remove(&email) {
                    resource.users.insert(who.user_id.clone());
                }
            }
            for group in state.groups.values_mut() {
                if group.emails.remove(&email) {
                    group.users.insert(who.user_id.clone());
                }
            }
            tracing::debug!(email = %email, user = %who.user_id, "provisional identity claimed");
            Ok(AttachResult { status: Status::Ready, method: None })
        })
    }

    fn verify_provisional_identity(
        &self,
        device: DeviceToken,
        proof: Verification,
    ) -> Completion<()> {
        self.run(move |state| {
            caller(state, device)?;
            match proof {
                Verification::Email { email, verification_code } => {
                    if !claim_is_pending(state, device, &email) {
                        return Err(Error::InvalidVerification(format!(
                            "{email:?} does not match a pending provisional identity"
                        )));
                    }
                    verify_email_code(state, &email, &verification_code)?;
                    if let Some(session) = state.sessions.get_mut(&device.as_raw()) {
                        session.verified_emails.insert(email);
                    }
                    Ok(())
                },
                Verification::OidcIdToken(token) => {
                    let subject = oidc_subject(&token)?;
                    if !claim_is_pending(state, device, &subject) {
                        return Err(Error::InvalidVerification(
                            "oidc token subject does not match a pending provisional identity"
                                .to_string(),
                        ));
                    }
                    if let Some(session) = state.sessions.get_mut(&device.as_raw()) {
                        session.verified_subjects.insert(subject);
                    }
                    Ok(())
                },
                Verification::Passphrase(_) | Verification::VerificationKey(_) => {
                    Err(Error::InvalidArgument(
                        "an email address cannot be proved with this method".to_string(),
                    ))
                },
            }
        })
    }

    fn publish_resource_key(
        &self,
        device: DeviceToken,
        grant: ResourceGrant,
        policy: SharePolicy,
    ) -> Completion<()> {
        self.run(move |state| {
            let who = caller(state, device)?;
            let (mut users, emails) = resolve_recipients(state, &policy.users)?;
            check_groups(state, &policy.groups)?;
            if !policy.author_excluded {
                users.insert(who.user_id.clone());
            }
            state.resources.insert(
                grant.resource_id,
                ResourceRecord {
                    key: grant.key,
                    author: who.user_id,
                    author_excluded: policy.author_excluded,
                    users,
                    emails,
                    groups: policy.groups.into_iter().collect(),
                },
            );
            Ok(())
        })
    }

    fn fetch_resource_key(&self, device: DeviceToken, id: ResourceId) -> Completion<ResourceKey> {
        self.run(move |state| {
            let who = caller(state, device)?;
            let resource = state.resources.get(&id).ok_or_else(|| {
                Error::DecryptionFailed(format!("no key grant exists for resource {id}"))
            })?;
            if resource.author_excluded && resource.author == who.user_id {
                return Err(Error::InvalidArgument(
                    "the author chose not to grant themselves this key".to_string(),
                ));
            }
            if !can_fetch(state, resource, &who.user_id) {
                return Err(Error::DecryptionFailed(format!(
                    "this user holds no grant for resource {id}"
                )));
            }
            Ok(resource.key.clone())
        })
    }

    fn share(
        &self,
        device: DeviceToken,
        ids: Vec<ResourceId>,
        policy: SharePolicy,
    ) -> Completion<()> {
        self.run(move |state| {
            let who = caller(state, device)?;

            // Validate everything up front so the whole call is atomic.
            for id in &ids {
                let resource = state.resources.get(id).ok_or_else(|| {
                    Error::InvalidArgument(format!("unknown resource {id}"))
                })?;
                if resource.author != who.user_id && !can_fetch(state, resource, &who.user_id) {
                    return Err(Error::InvalidArgument(format!(
                        "cannot share resource {id} without access to its key"
                    )));
                }
            }
            let (users, emails) = resolve_recipients(state, &policy.users)?;
            check_groups(state, &policy.groups)?;

            for id in &ids {
                if let Some(resource) = state.resources.get_mut(id) {
                    resource.users.extend(users.iter().cloned());
                    resource.emails.extend(emails.iter().cloned());
                    resource.groups.extend(policy.groups.iter().cloned());
                }
            }
            Ok(())
        })
    }

    fn create_group(
        &self,
        device: DeviceToken,
        members: Vec<PublicIdentity>,
    ) -> Completion<GroupId> {
        self.run(move |state| {
            caller(state, device)?;
            if members.is_empty() {
                return Err(Error::InvalidArgument(
                    "a group needs at least one member".to_string(),
                ));
            }
            if members.len() > MAX_GROUP_SIZE {
                return Err(Error::GroupTooBig(format!(
                    "{} members exceeds the limit of {MAX_GROUP_SIZE}",
                    members.len()
                )));
            }
            let (users, emails) = resolve_recipients(state, &members)?;

            let group_id = GroupId::from_bytes(random_bytes());
            state.groups.insert(group_id.clone(), GroupRecord { users, emails });
            Ok(group_id)
        })
    }

    fn update_group_members(
        &self,
        device: DeviceToken,
        group: GroupId,
        members_to_add: Vec<PublicIdentity>,
    ) -> Completion<()> {
        self.run(move |state| {
            caller(state, device)?;
            let current = state
                .groups
                .get(&group)
                .map(|record| record.users.len() + record.emails.len())
                .ok_or_else(|| Error::InvalidArgument(format!("unknown group {group}")))?;
            if members_to_add.is_empty() {
                return Err(Error::InvalidArgument(
                    "at least one member must be added".to_string(),
                ));
            }
            if current + members_to_add.len() > MAX_GROUP_SIZE {
                return Err(Error::GroupTooBig(format!(
                    "group would exceed the limit of {MAX_GROUP_SIZE} members"
                )));
            }
            let (users, emails) = resolve_recipients(state, &members_to_add)?;

            if let Some(record) = state.groups.get_mut(&group) {
                record.users.extend(users);
                record.emails.extend(emails);
            }
            Ok(())
        })
    }

    fn device_list(&self, device: DeviceToken) -> Completion<Vec<DeviceInfo>> {
        self.run(move |state| {
            let who = caller(state, device)?;
            Ok(user(state, &who.user_id)?
                .devices
                .iter()
                .map(|d| DeviceInfo { device_id: d.device_id.clone(), is_revoked: d.is_revoked })
                .collect())
        })
    }

    fn revoke_device(&self, device: DeviceToken, target: DeviceId) -> Completion<()> {
        self.run(move |state| {
            let who = caller(state, device)?;
            let record = user_mut(state, &who.user_id)?
                .devices
                .iter_mut()
                .find(|d| d.device_id == target)
                .ok_or_else(|| Error::InvalidArgument(format!("unknown device {target}")))?;
            if record.is_revoked {
                return Err(Error::PreconditionFailed(
                    "device is already revoked".to_string(),
                ));
            }
            record.is_revoked = true;
            tracing::debug!(device = %target, user = %who.user_id, "device revoked");
            Ok(())
        })
    }
}

struct Caller {
    user_id: String,
    local_ref: String,
    device_id: DeviceId,
}

/// Resolve a device token to its user and device, failing with
/// [`Error::DeviceRevoked`] for revoked devices.
fn caller(state: &State, token: DeviceToken) -> Result<Caller, Error> {
    let session = state
        .sessions
        .get(&token.as_raw())
        .ok_or_else(|| Error::InternalError("unknown device token".to_string()))?;
    let device = user(state, &session.user_id)?
        .devices
        .iter()
        .find(|d| d.local_ref == session.local_ref)
        .ok_or_else(|| Error::InternalError("session references a missing device".to_string()))?;
    if device.is_revoked {
        return Err(Error::DeviceRevoked);
    }
    Ok(Caller {
        user_id: session.user_id.clone(),
        local_ref: session.local_ref.clone(),
        device_id: device.device_id.clone(),
    })
}

fn user<'a>(state: &'a State, user_id: &str) -> Result<&'a UserRecord, Error> {
    state
        .users
        .get(user_id)
        .ok_or_else(|| Error::InternalError(format!("unknown user {user_id:?}")))
}

fn user_mut<'a>(state: &'a mut State, user_id: &str) -> Result<&'a mut UserRecord, Error> {
    state
        .users
        .get_mut(user_id)
        .ok_or_else(|| Error::InternalError(format!("unknown user {user_id:?}")))
}

fn trust_device(state: &mut State, who: &Caller) {
    if let Some(record) = state.users.get_mut(&who.user_id) {
        if let Some(device) = record.devices.iter_mut().find(|d| d.local_ref == who.local_ref) {
            device.trusted = true;
        }
    }
}

/// Validate a proof and turn it into a method record. Email codes are
/// consumed here; proven emails and OIDC subjects are remembered on the
/// session for later provisional claims.
fn prove_method(
    state: &mut State,
    token: DeviceToken,
    proof: Verification,
) -> Result<MethodRecord, Error> {
    match proof {
        Verification::Email { email, verification_code } => {
            verify_email_code(state, &email, &verification_code)?;
            if let Some(session) = state.sessions.get_mut(&token.as_raw()) {
                session.verified_emails.insert(email.clone());
            }
            Ok(MethodRecord::Email { address: email })
        },
        Verification::Passphrase(passphrase) => Ok(MethodRecord::Passphrase { passphrase }),
        Verification::VerificationKey(key) => Ok(MethodRecord::VerificationKey { key }),
        Verification::OidcIdToken(id_token) => {
            let subject = oidc_subject(&id_token)?;
            if let Some(session) = state.sessions.get_mut(&token.as_raw()) {
                session.verified_subjects.insert(subject.clone());
            }
            Ok(MethodRecord::Oidc { subject })
        },
    }
}

/// Match a proof against the user's registered methods.
fn check_proof(
    state: &mut State,
    token: DeviceToken,
    user_id: &str,
    proof: Verification,
) -> Result<(), Error> {
    match proof {
        Verification::Passphrase(presented) => {
            let registered = user(state, user_id)?.methods.iter().find_map(|m| match m {
                MethodRecord::Passphrase { passphrase } => Some(passphrase.clone()),
                _ => None,
            });
            match registered {
                None => Err(Error::InvalidVerification(
                    "no passphrase method is registered".to_string(),
                )),
                Some(stored) if stored == presented => Ok(()),
                Some(_) => Err(Error::InvalidVerification("wrong passphrase".to_string())),
            }
        },
        Verification::Email { email, verification_code } => {
            let registered = user(state, user_id)?.methods.iter().any(
                |m| matches!(m, MethodRecord::Email { address } if *address == email),
            );
            if !registered {
                return Err(Error::InvalidVerification(
                    "this email address is not a registered method".to_string(),
                ));
            }
            verify_email_code(state, &email, &verification_code)?;
            if let Some(session) = state.sessions.get_mut(&token.as_raw()) {
                session.verified_emails.insert(email);
            }
            Ok(())
        },
        Verification::VerificationKey(presented) => {
            let registered = user(state, user_id)?.methods.iter().find_map(|m| match m {
                MethodRecord::VerificationKey { key } => Some(key.clone()),
                _ => None,
            });
            match registered {
                None => Err(Error::InvalidVerification(
                    "no verification key method is registered".to_string(),
                )),
                Some(stored) if stored == presented => Ok(()),
                Some(_) => Err(Error::InvalidVerification("wrong verification key".to_string())),
            }
        },
        Verification::OidcIdToken(id_token) => {
            let subject = oidc_subject(&id_token)?;
            let registered = user(state, user_id)?.methods.iter().find_map(|m| match m {
                MethodRecord::Oidc { subject } => Some(subject.clone()),
                _ => None,
            });
            match registered {
                None => Err(Error::InvalidVerification(
                    "no oidc method is registered".to_string(),
                )),
                Some(stored) if stored == subject => {
                    if let Some(session) = state.sessions.get_mut(&token.as_raw()) {
                        session.verified_subjects.insert(subject);
                    }
                    Ok(())
                },
                Some(_) => Err(Error::InvalidVerification(
                    "oidc token subject does not match the registered subject".to_string(),
                )),
            }
        },
    }
}

/// Check an email code. Wrong codes burn attempts; a burnt-out or expired
/// code never verifies again, not even the right one.
fn verify_email_code(state: &mut State, email: &str, code: &str) -> Result<(), Error> {
    let record = state.codes.get_mut(email).ok_or_else(|| {
        Error::InvalidVerification(format!("no verification code was issued for {email:?}"))
    })?;
    if record.expired {
        return Err(Error::ExpiredVerification(format!(
            "the verification code for {email:?} has expired"
        )));
    }
    if record.attempts >= MAX_CODE_ATTEMPTS {
        return Err(Error::TooManyAttempts(format!(
            "too many wrong codes presented for {email:?}"
        )));
    }
    if record.code != code {
        record.attempts += 1;
        return Err(Error::InvalidVerification("wrong verification code".to_string()));
    }
    state.codes.remove(email);
    Ok(())
}

/// True if this session has an unanswered attach for `email`. A proof for
/// any other address (or OIDC subject) is a mismatch, not a no-op.
fn claim_is_pending(state: &State, token: DeviceToken, email: &str) -> bool {
    state
        .sessions
        .get(&token.as_raw())
        .is_some_and(|session| session.pending_claims.contains(email))
}

/// Pull the subject out of a harness OIDC token, `oidc.<subject>.<nonce>`.
fn oidc_subject(token: &str) -> Result<String, Error> {
    let malformed = || Error::InvalidVerification("malformed oidc id token".to_string());
    let rest = token.strip_prefix("oidc.").ok_or_else(malformed)?;
    let (subject, _nonce) = rest.rsplit_once('.').ok_or_else(malformed)?;
    if subject.is_empty() {
        return Err(malformed());
    }
    Ok(subject.to_string())
}

/// Split recipients into registered user IDs and pending provisional
/// emails, rejecting unknown users and foreign applications. Emails whose
/// provisional identity was already claimed resolve to the claiming user.
fn resolve_recipients(
    state: &State,
    recipients: &[PublicIdentity],
) -> Result<(HashSet<String>, HashSet<String>), Error> {
    let mut users = HashSet::new();
    let mut emails = HashSet::new();
    for identity in recipients {
        if identity.app_id() != state.app_id {
            return Err(Error::InvalidArgument(format!(
                "recipient belongs to application {:?}",
                identity.app_id()
            )));
        }
        match identity.target() {
            IdentityTarget::User(user_id) => {
                if !state.users.contains_key(user_id) {
                    return Err(Error::InvalidArgument(format!(
                        "unknown recipient user {user_id:?}"
                    )));
                }
                users.insert(user_id.clone());
            },
            IdentityTarget::ProvisionalEmail(email) => match state.claimed.get(email) {
                Some(owner) => {
                    users.insert(owner.clone());
                },
                None => {
                    emails.insert(email.clone());
                },
            },
        }
    }
    Ok((users, emails))
}

fn check_groups(state: &State, groups: &[GroupId]) -> Result<(), Error> {
    for group in groups {
        if !state.groups.contains_key(group) {
            return Err(Error::InvalidArgument(format!("unknown group {group}")));
        }
    }
    Ok(())
}

fn can_fetch(state: &State, resource: &ResourceRecord, user_id: &str) -> bool {
    resource.users.contains(user_id)
        || resource
            .groups
            .iter()
            .any(|g| state.groups.get(g).is_some_and(|record| record.users.contains(user_id)))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
