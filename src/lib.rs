#![deny(unsafe_code)]

//! POSIX access control lists on top of the system libacl.
//!
//! This crate re-exports the object model from [`acl`]. The libacl binding
//! it is built on is available as [`sys`] for callers that need the raw
//! `<sys/acl.h>` view: owned `acl_t` handles and entry handles without
//! generation tracking.

pub use acl::*;

/// Raw libacl binding without entry reference tracking.
pub use aclkit_sys as sys;
