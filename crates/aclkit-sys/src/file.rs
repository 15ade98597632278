//! Reading and writing ACLs on filesystem objects.
//!
//! Paths follow symbolic links, matching `acl_get_file(3)`. Objects that
//! carry no extended access ACL report the minimal ACL derived from their
//! mode; directories without a default ACL report an empty one. Both rules
//! also hold when the filesystem does not support ACLs at all.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use rustix::fs::{self, Mode, Stat};

use crate::handle::{RawAcl, status};
use crate::{invalid_argument, sys};

/// Which of an object's ACLs an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AclType {
    /// The ACL checked on access to the object itself.
    Access,
    /// The ACL inherited by objects created inside a directory.
    Default,
}

impl AclType {
    const fn as_raw(self) -> sys::acl_type_t {
        match self {
            Self::Access => sys::ACL_TYPE_ACCESS,
            Self::Default => sys::ACL_TYPE_DEFAULT,
        }
    }
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| invalid_argument())
}

fn is_unsupported(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::ENOTSUP)
}

/// What a filesystem without ACL support stands in for.
fn unsupported(ty: AclType, stat: impl FnOnce() -> rustix::io::Result<Stat>) -> io::Result<RawAcl> {
    match ty {
        AclType::Access => RawAcl::from_mode(u32::from(stat()?.st_mode)),
        AclType::Default => RawAcl::init(0),
    }
}

/// Reads the access or default ACL of `path`.
pub fn get_file(path: &Path, ty: AclType) -> io::Result<RawAcl> {
    let c_path = c_path(path)?;
    // Safety: the pointer remains valid for the duration of the call.
    match RawAcl::from_ptr(unsafe { sys::acl_get_file(c_path.as_ptr(), ty.as_raw()) }) {
        Err(error) if is_unsupported(&error) => unsupported(ty, || fs::stat(path)),
        result => result,
    }
}

/// Reads the access ACL of an open descriptor.
pub fn get_fd(fd: BorrowedFd<'_>) -> io::Result<RawAcl> {
    // Safety: the descriptor is borrowed for the duration of the call.
    match RawAcl::from_ptr(unsafe { sys::acl_get_fd(fd.as_raw_fd()) }) {
        Err(error) if is_unsupported(&error) => unsupported(AclType::Access, || fs::fstat(fd)),
        result => result,
    }
}

fn chmod_fallback(
    acl: &RawAcl,
    stat: impl FnOnce() -> rustix::io::Result<Stat>,
    chmod: impl FnOnce(Mode) -> rustix::io::Result<()>,
) -> io::Result<()> {
    let Some(perms) = acl.equiv_mode()? else {
        return Err(io::Error::from_raw_os_error(libc::ENOTSUP));
    };
    let special = u32::from(stat()?.st_mode) & 0o7000;
    chmod(Mode::from_raw_mode(special | perms))?;
    Ok(())
}

/// Replaces the access or default ACL of `path`.
///
/// The ACL must pass `acl_valid(3)` or the call fails with `EINVAL` without
/// touching the object. An empty default ACL removes the directory's
/// default ACL. On filesystems without ACL support an access ACL equivalent
/// to plain permission bits is applied with `chmod` instead.
pub fn set_file(path: &Path, ty: AclType, acl: &RawAcl) -> io::Result<()> {
    if ty == AclType::Default && acl.is_empty() {
        return delete_def_file(path);
    }
    if !acl.valid() {
        return Err(invalid_argument());
    }
    let c_path = c_path(path)?;
    // Safety: arguments are valid pointers and libacl only reads the ACL.
    match status(unsafe { sys::acl_set_file(c_path.as_ptr(), ty.as_raw(), acl.as_ptr()) }) {
        Err(error) if ty == AclType::Access && is_unsupported(&error) => {
            chmod_fallback(acl, || fs::stat(path), |mode| fs::chmod(path, mode))
        }
        result => result,
    }
}

/// Replaces the access ACL of an open descriptor, with the same rules as
/// [`set_file`].
pub fn set_fd(fd: BorrowedFd<'_>, acl: &RawAcl) -> io::Result<()> {
    if !acl.valid() {
        return Err(invalid_argument());
    }
    // Safety: the descriptor is borrowed and the ACL pointer stays valid for
    // the duration of the call.
    match status(unsafe { sys::acl_set_fd(fd.as_raw_fd(), acl.as_ptr()) }) {
        Err(error) if is_unsupported(&error) => {
            chmod_fallback(acl, || fs::fstat(fd), |mode| fs::fchmod(fd, mode))
        }
        result => result,
    }
}

/// Removes the default ACL of a directory. A missing ACL, or a filesystem
/// without ACL support, is not an error.
pub fn delete_def_file(path: &Path) -> io::Result<()> {
    let c_path = c_path(path)?;
    // Safety: the call removes the default ACL when present.
    match status(unsafe { sys::acl_delete_def_file(c_path.as_ptr()) }) {
        Err(error) if is_unsupported(&error) => Ok(()),
        result => result,
    }
}
