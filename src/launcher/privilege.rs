//! One-way transition to the identity the start script runs as.
use std::io;

use serde::Serialize;
use tracing::{error, info};

use crate::lib::errors::{ElevationStep, LaunchError};

use super::LaunchRequest;

/// Target uid/gid pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    pub const ROOT: Identity = Identity { uid: 0, gid: 0 };
}

/// Real and effective ids of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub real_uid: u32,
    pub effective_uid: u32,
    pub real_gid: u32,
    pub effective_gid: u32,
}

impl Credentials {
    /// True only when real and effective ids both equal `identity`.
    pub fn matches(&self, identity: Identity) -> bool {
        self.real_uid == identity.uid
            && self.effective_uid == identity.uid
            && self.real_gid == identity.gid
            && self.effective_gid == identity.gid
    }
}

/// Abstraction over the platform's privilege-set primitives.
pub trait PrivilegeBackend {
    fn drop_supplementary_groups(&self) -> io::Result<()>;
    fn set_gid(&self, gid: u32) -> io::Result<()>;
    fn set_uid(&self, uid: u32) -> io::Result<()>;
    fn credentials(&self) -> Credentials;
}

impl<T: PrivilegeBackend + ?Sized> PrivilegeBackend for &T {
    fn drop_supplementary_groups(&self) -> io::Result<()> {
        (**self).drop_supplementary_groups()
    }

    fn set_gid(&self, gid: u32) -> io::Result<()> {
        (**self).set_gid(gid)
    }

    fn set_uid(&self, uid: u32) -> io::Result<()> {
        (**self).set_uid(uid)
    }

    fn credentials(&self) -> Credentials {
        (**self).credentials()
    }
}

/// Backend that changes the identity of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrivileges;

impl PrivilegeBackend for SystemPrivileges {
    fn drop_supplementary_groups(&self) -> io::Result<()> {
        let result = unsafe { libc::setgroups(0, std::ptr::null()) };
        check(result)
    }

    fn set_gid(&self, gid: u32) -> io::Result<()> {
        let result = unsafe { libc::setgid(gid as libc::gid_t) };
        check(result)
    }

    fn set_uid(&self, uid: u32) -> io::Result<()> {
        let result = unsafe { libc::setuid(uid as libc::uid_t) };
        check(result)
    }

    fn credentials(&self) -> Credentials {
        unsafe {
            Credentials {
                real_uid: libc::getuid(),
                effective_uid: libc::geteuid(),
                real_gid: libc::getgid(),
                effective_gid: libc::getegid(),
            }
        }
    }
}

fn check(result: libc::c_int) -> io::Result<()> {
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Proof that the process holds the target identity. Required by `execute`.
#[derive(Debug)]
pub struct Elevated {
    identity: Identity,
}

impl Elevated {
    pub fn identity(&self) -> Identity {
        self.identity
    }
}

/// Assume `target` for the rest of the process lifetime.
///
/// Takes a validated request so that elevation cannot happen on an
/// unvalidated input path. Supplementary groups go first, then the gid, then
/// the uid (after `setuid` the process may no longer change its groups). The
/// resulting credentials are checked; a partial transition is an error.
pub fn elevate_privileges<B>(
    backend: &B,
    target: Identity,
    request: &LaunchRequest,
) -> Result<Elevated, LaunchError>
where
    B: PrivilegeBackend + ?Sized,
{
    let before = backend.credentials();
    info!(
        target: "level_launcher::launch",
        level = %request.level(),
        from_uid = before.real_uid,
        from_euid = before.effective_uid,
        to_uid = target.uid,
        to_gid = target.gid,
        "Assuming target identity"
    );

    backend
        .drop_supplementary_groups()
        .map_err(|source| fail(ElevationStep::DropGroups, source))?;
    backend
        .set_gid(target.gid)
        .map_err(|source| fail(ElevationStep::SetGid, source))?;
    backend
        .set_uid(target.uid)
        .map_err(|source| fail(ElevationStep::SetUid, source))?;

    let after = backend.credentials();
    if !after.matches(target) {
        return Err(fail(
            ElevationStep::Verify,
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "credentials after elevation are uid={}/{} gid={}/{}",
                    after.real_uid, after.effective_uid, after.real_gid, after.effective_gid
                ),
            ),
        ));
    }

    Ok(Elevated { identity: target })
}

fn fail(step: ElevationStep, source: io::Error) -> LaunchError {
    error!(
        target: "level_launcher::launch",
        step = step.as_str(),
        reason = %source,
        "Privilege escalation failed"
    );
    LaunchError::PrivilegeEscalationFailed { step, source }
}
