//! crates/acl/src/file.rs
//!
//! Associating ACLs with filesystem objects.
//!
//! A [`Target`] names the object, either by path (symbolic links are
//! followed) or by an open descriptor. Default ACLs only exist on
//! directories and can only be addressed by path.

use std::fmt;
use std::fs::File;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use aclkit_sys::AclType;
use tracing::debug;

use crate::container::Acl;
use crate::error::{AclError, Result};

/// Which of an object's ACLs to read or write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AclKind {
    /// The ACL checked when the object itself is accessed.
    #[default]
    Access,
    /// The ACL a directory passes on to objects created inside it.
    Default,
}

impl From<AclKind> for AclType {
    fn from(kind: AclKind) -> Self {
        match kind {
            AclKind::Access => Self::Access,
            AclKind::Default => Self::Default,
        }
    }
}

impl fmt::Display for AclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Access => "access",
            Self::Default => "default",
        })
    }
}

/// Filesystem object an ACL is read from or applied to.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    /// An open file descriptor.
    Fd(BorrowedFd<'a>),
    /// A path, resolved through symbolic links.
    Path(&'a Path),
}

impl<'a> From<&'a Path> for Target<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for Target<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Self::Path(path.as_path())
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(path: &'a str) -> Self {
        Self::Path(Path::new(path))
    }
}

impl<'a> From<BorrowedFd<'a>> for Target<'a> {
    fn from(fd: BorrowedFd<'a>) -> Self {
        Self::Fd(fd)
    }
}

impl<'a> From<&'a File> for Target<'a> {
    fn from(file: &'a File) -> Self {
        Self::Fd(file.as_fd())
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fd(fd) => write!(f, "descriptor {}", fd.as_raw_fd()),
            Self::Path(path) => write!(f, "'{}'", path.display()),
        }
    }
}

/// Default ACLs are addressed by directory path only.
fn check_default_target<'a>(target: Target<'a>, context: &'static str) -> Result<&'a Path> {
    let Target::Path(path) = target else {
        return Err(AclError::invalid_argument(
            "default ACLs can only be addressed by path",
        ));
    };
    let metadata = std::fs::metadata(path).map_err(|error| AclError::io(context, target, error))?;
    if !metadata.is_dir() {
        return Err(AclError::invalid_argument(format!(
            "{target} is not a directory; only directories carry a default ACL"
        )));
    }
    Ok(path)
}

impl Acl {
    /// Reads the access or default ACL of `target`.
    ///
    /// An object without an extended access ACL yields the minimal ACL
    /// equivalent to its mode bits, and a directory without a default ACL
    /// yields an empty one.
    ///
    /// # Errors
    ///
    /// [`AclError::InvalidArgument`] for a default ACL requested through a
    /// descriptor or on something other than a directory,
    /// [`AclError::Io`] for failures reported by the operating system.
    pub fn read_from<'t>(target: impl Into<Target<'t>>, kind: AclKind) -> Result<Self> {
        const CONTEXT: &str = "read ACL of";
        let target = target.into();
        let raw = match (kind, target) {
            (AclKind::Default, _) => {
                let path = check_default_target(target, CONTEXT)?;
                aclkit_sys::get_file(path, AclType::Default)
            }
            (AclKind::Access, Target::Path(path)) => aclkit_sys::get_file(path, AclType::Access),
            (AclKind::Access, Target::Fd(fd)) => aclkit_sys::get_fd(fd),
        }
        .map_err(|error| AclError::io(CONTEXT, target, error))?;

        debug!(target: "acl::file", object = %target, %kind, entries = raw.len(), "read ACL");
        Ok(Self::from_raw(raw))
    }

    /// Replaces the access or default ACL of `target` with this one.
    ///
    /// The ACL is written exactly as stored. An ACL that breaks a structural
    /// rule is refused with `EINVAL` and the object is left untouched. An
    /// empty default ACL removes the directory's default ACL.
    ///
    /// # Errors
    ///
    /// Same as [`Acl::read_from`].
    pub fn apply_to<'t>(&self, target: impl Into<Target<'t>>, kind: AclKind) -> Result<()> {
        const CONTEXT: &str = "apply ACL to";
        let target = target.into();
        let raw = self.raw();
        let written = match (kind, target) {
            (AclKind::Default, _) => {
                let path = check_default_target(target, CONTEXT)?;
                aclkit_sys::set_file(path, AclType::Default, &raw)
            }
            (AclKind::Access, Target::Path(path)) => {
                aclkit_sys::set_file(path, AclType::Access, &raw)
            }
            (AclKind::Access, Target::Fd(fd)) => aclkit_sys::set_fd(fd, &raw),
        };
        written.map_err(|error| AclError::io(CONTEXT, target, error))?;

        debug!(target: "acl::file", object = %target, %kind, entries = raw.len(), "applied ACL");
        Ok(())
    }
}

/// Removes the default ACL of the directory at `path`.
///
/// A directory without a default ACL is left as it is.
pub fn delete_default(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    aclkit_sys::delete_def_file(path)
        .map_err(|error| AclError::io("delete default ACL of", Target::Path(path), error))?;
    debug!(target: "acl::file", path = %path.display(), "deleted default ACL");
    Ok(())
}

/// ACL access for open files.
pub trait FileAclExt {
    /// Reads the access ACL through the descriptor.
    fn acl(&self) -> Result<Acl>;

    /// Replaces the access ACL through the descriptor.
    fn set_acl(&self, acl: &Acl) -> Result<()>;
}

impl FileAclExt for File {
    fn acl(&self) -> Result<Acl> {
        Acl::read_from(self, AclKind::Access)
    }

    fn set_acl(&self, acl: &Acl) -> Result<()> {
        acl.apply_to(self, AclKind::Access)
    }
}
