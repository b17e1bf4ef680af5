//! Ownership and mode checks for files the launcher reads or executes as root.

use std::{
    fs,
    os::unix::fs::{MetadataExt, PermissionsExt},
    path::Path,
};

use crate::lib::errors::UntrustedFile;

/// Group-write and other-write bits.
const FOREIGN_WRITE_BITS: u32 = 0o022;
/// Execute bits for owner, group and others.
const ANY_EXECUTE_BITS: u32 = 0o111;
/// Restricted-deletion flag; entries can only be replaced by their owner.
const STICKY_BIT: u32 = 0o1000;

/// Fail unless `path` is a regular file owned by one of `allowed_owners` that
/// only its owner can write, inside directories that satisfy
/// [`ensure_trusted_ancestors`].
pub fn ensure_trusted_file(path: &Path, allowed_owners: &[u32]) -> Result<(), UntrustedFile> {
    let metadata = fs::metadata(path).map_err(UntrustedFile::Metadata)?;
    if !metadata.is_file() {
        return Err(UntrustedFile::NotRegularFile);
    }
    if !allowed_owners.is_empty() && !allowed_owners.contains(&metadata.uid()) {
        return Err(UntrustedFile::Owner {
            owner: metadata.uid(),
            allowed: allowed_owners.to_vec(),
        });
    }
    let mode = metadata.permissions().mode();
    if mode & FOREIGN_WRITE_BITS != 0 {
        return Err(UntrustedFile::Writable { mode: mode & 0o7777 });
    }
    ensure_trusted_ancestors(path, allowed_owners)
}

/// Fail unless every directory above the resolved `path` is owned by one of
/// `allowed_owners` and is not writable by group or others. Sticky
/// directories such as `/tmp` are accepted.
pub fn ensure_trusted_ancestors(path: &Path, allowed_owners: &[u32]) -> Result<(), UntrustedFile> {
    let resolved = fs::canonicalize(path).map_err(UntrustedFile::Metadata)?;
    for dir in resolved.ancestors().skip(1) {
        let metadata = fs::metadata(dir).map_err(UntrustedFile::Metadata)?;
        if !allowed_owners.is_empty() && !allowed_owners.contains(&metadata.uid()) {
            return Err(UntrustedFile::DirectoryOwner {
                path: dir.to_path_buf(),
                owner: metadata.uid(),
            });
        }
        let mode = metadata.permissions().mode();
        if mode & FOREIGN_WRITE_BITS != 0 && mode & STICKY_BIT == 0 {
            return Err(UntrustedFile::WritableDirectory {
                path: dir.to_path_buf(),
                mode: mode & 0o7777,
            });
        }
    }
    Ok(())
}

/// Fail unless `path` is a regular file with at least one execute bit set.
pub fn ensure_executable(path: &Path) -> Result<(), UntrustedFile> {
    let metadata = fs::metadata(path).map_err(UntrustedFile::Metadata)?;
    if !metadata.is_file() {
        return Err(UntrustedFile::NotRegularFile);
    }
    let mode = metadata.permissions().mode();
    if mode & ANY_EXECUTE_BITS == 0 {
        return Err(UntrustedFile::NotExecutable { mode: mode & 0o7777 });
    }
    Ok(())
}

/// Owners acceptable for root-consumed files: root plus the effective uid.
pub fn trusted_owners() -> Vec<u32> {
    let euid = unsafe { libc::geteuid() };
    let mut owners = vec![0];
    if euid != 0 {
        owners.push(euid);
    }
    owners
}
