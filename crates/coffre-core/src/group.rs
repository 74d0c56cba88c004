//! Group management: creating sharing groups and growing their membership.

use crate::{error::Error, identity::PublicIdentity, session::Session, types::GroupId};

impl Session {
    /// Create a group from its initial members and return its ID.
    ///
    /// Atomic: if any member identity is invalid, no group is created. The
    /// server of record owns the authoritative membership list.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless `Ready`
    /// - [`Error::InvalidArgument`] on an empty member list, detected
    ///   synchronously
    /// - [`Error::GroupTooBig`] when the member list exceeds the backend
    ///   limit
    pub fn create_group(&self, members: &[PublicIdentity]) -> Result<GroupId, Error> {
        let token = self.ready_token("create_group")?;
        if members.is_empty() {
            return Err(Error::InvalidArgument(
                "a group needs at least one member".to_string(),
            ));
        }

        self.backend().create_group(token, members.to_vec()).wait()
    }

    /// Add members to an existing group.
    ///
    /// Additive only: this design has no removal operation. New members
    /// retroactively gain access to every resource ever shared with the
    /// group; the backend re-wraps the group key material rather than
    /// rotating it.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionFailed`] unless `Ready`
    /// - [`Error::InvalidArgument`] on an empty add list, detected
    ///   synchronously, or an unknown group
    pub fn update_group_members(
        &self,
        group_id: &GroupId,
        members_to_add: &[PublicIdentity],
    ) -> Result<(), Error> {
        let token = self.ready_token("update_group_members")?;
        if members_to_add.is_empty() {
            return Err(Error::InvalidArgument(
                "member list to add must not be empty".to_string(),
            ));
        }

        self.backend()
            .update_group_members(token, group_id.clone(), members_to_add.to_vec())
            .wait()
    }
}
