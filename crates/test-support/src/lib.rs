#![deny(unsafe_code)]

//! Shared test utilities for the aclkit workspace.
//!
//! Tests that touch the filesystem work inside [`scratch_dir`] and check
//! [`acls_supported`] before relying on extended ACLs; container and CI
//! filesystems do not always carry them. Tests that render names look them
//! up with [`user_name`] and [`group_name`] and skip when the system
//! databases have no entry.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Once;

use nix::unistd::{Gid, Group, Uid, User};
use tempfile::TempDir;

/// Creates a temporary directory removed when the handle drops.
///
/// # Panics
///
/// Panics when the directory cannot be created.
#[must_use]
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("create scratch dir")
}

/// Creates `dir/name` with the exact permission bits in `mode`, bypassing
/// the process umask.
///
/// # Panics
///
/// Panics when the file cannot be created or its mode set.
pub fn file_with_mode(dir: &Path, name: &str, mode: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"acl test fixture").expect("create fixture");
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod fixture");
    path
}

/// Reports whether the filesystem holding `path` stores POSIX ACLs.
#[cfg(target_os = "linux")]
#[must_use]
pub fn acls_supported(path: &Path) -> bool {
    use rustix::io::Errno;

    let mut empty = [0u8; 0];
    !matches!(
        rustix::fs::getxattr(path, "system.posix_acl_access", &mut empty[..]),
        Err(Errno::NOTSUP)
    )
}

/// Reports whether the filesystem holding `path` stores POSIX ACLs.
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn acls_supported(_path: &Path) -> bool {
    false
}

/// Effective uid of the test process, a qualifier the kernel always maps.
#[must_use]
pub fn current_uid() -> u32 {
    rustix::process::geteuid().as_raw()
}

/// Effective gid of the test process.
#[must_use]
pub fn current_gid() -> u32 {
    rustix::process::getegid().as_raw()
}

/// Name the user database gives `uid`, if any.
#[must_use]
pub fn user_name(uid: u32) -> Option<String> {
    User::from_uid(Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|user| user.name)
}

/// Name the group database gives `gid`, if any.
#[must_use]
pub fn group_name(gid: u32) -> Option<String> {
    Group::from_gid(Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|group| group.name)
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_mode_ignores_umask() {
        let dir = scratch_dir();
        let file = file_with_mode(dir.path(), "f", 0o604);
        let mode = fs::metadata(file).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o604);
    }

    #[test]
    fn root_names_resolve_when_known() {
        if let Some(name) = user_name(0) {
            assert!(!name.is_empty());
        }
        if let Some(name) = group_name(0) {
            assert!(!name.is_empty());
        }
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let path = {
            let dir = scratch_dir();
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
