#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod container;
mod entry;
mod error;
mod file;
mod options;
mod permset;
mod tag;

/// Raw `<sys/acl.h>` tag and permission values.
pub mod consts {
    pub use aclkit_sys::{
        ACL_EXECUTE, ACL_GROUP, ACL_GROUP_OBJ, ACL_MASK, ACL_OTHER, ACL_READ, ACL_UNDEFINED_ID,
        ACL_UNDEFINED_TAG, ACL_USER, ACL_USER_OBJ, ACL_WRITE,
    };
}

pub use aclkit_sys::ValidityError;

pub use crate::container::{Acl, Entries};
pub use crate::entry::Entry;
pub use crate::error::{AclError, Result};
pub use crate::file::{AclKind, FileAclExt, Target, delete_default};
pub use crate::options::{DEFAULT_ACL_PREFIX, DEFAULT_CAPACITY, EffectiveRights, TextOptions};
pub use crate::permset::Permset;
pub use crate::tag::TagType;
