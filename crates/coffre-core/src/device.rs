//! Device registry: enumeration and revocation of a user's devices.

use crate::{
    error::Error,
    loghandler::{self, LogLevel},
    session::Session,
    types::{DeviceId, DeviceInfo},
};

impl Session {
    /// All devices ever created for the current user, including revoked
    /// ones, each tagged with its revocation flag.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless `Ready`.
    pub fn device_list(&self) -> Result<Vec<DeviceInfo>, Error> {
        let token = self.ready_token("device_list")?;
        self.backend().device_list(token).wait()
    }

    /// Revoke one of the user's devices.
    ///
    /// One-way: a revoked device cannot be un-revoked. Sessions on the
    /// revoked device start failing backend operations with
    /// [`Error::DeviceRevoked`], even mid-session; their local status does
    /// not flip.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionFailed`] unless `Ready`.
    pub fn revoke_device(&self, device_id: &DeviceId) -> Result<(), Error> {
        let token = self.ready_token("revoke_device")?;
        self.backend().revoke_device(token, device_id.clone()).wait()?;
        loghandler::emit(LogLevel::Warning, "device", format!("revoked device {device_id}"));
        Ok(())
    }
}
