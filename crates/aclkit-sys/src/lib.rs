#![allow(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `aclkit_sys` wraps the system `libacl` so callers can manipulate POSIX.1e
//! access control lists without touching raw pointers. The library owns the
//! entry storage, the text grammar, the validity rules and the kernel
//! encoding; this crate only moves values across the boundary and turns
//! `errno` into [`std::io::Error`].
//!
//! # Design
//!
//! - [`RawAcl`] owns an `acl_t` and releases it through `acl_free` on drop.
//! - [`RawEntry`] is an opaque `acl_entry_t`. Every method taking one first
//!   checks that the handle is currently linked into the ACL it is passed
//!   with, so a stale or foreign handle yields `EINVAL` instead of a
//!   dangling dereference.
//! - `libacl` keeps entries sorted and relinks an entry whenever its tag or
//!   qualifier changes. Handles survive that; positions do not.
//! - [`get_file`], [`set_file`] and friends add the fallbacks needed on
//!   filesystems that do not store ACLs: the mode bits stand in for the
//!   access ACL, and an access ACL equivalent to plain permissions is applied
//!   with `chmod`.
//!
//! # Invariants
//!
//! - Tag, permission and text option values match `<sys/acl.h>` and
//!   `<acl/libacl.h>` bit-for-bit.
//! - Every pointer obtained from `libacl` is released with `acl_free`.

mod file;
mod handle;
mod text;
mod valid;

pub use file::{AclType, delete_def_file, get_fd, get_file, set_fd, set_file};
pub use handle::{RawAcl, RawEntry};
pub use text::{
    TEXT_ABBREVIATE, TEXT_ALL_EFFECTIVE, TEXT_NUMERIC_IDS, TEXT_SMART_INDENT, TEXT_SOME_EFFECTIVE,
    TextError,
};
pub use valid::ValidityError;

/// Tag of a freshly created entry that has not been assigned a principal.
pub const ACL_UNDEFINED_TAG: u32 = 0x00;
/// Owning user of the object.
pub const ACL_USER_OBJ: u32 = 0x01;
/// Named user, qualified by a uid.
pub const ACL_USER: u32 = 0x02;
/// Owning group of the object.
pub const ACL_GROUP_OBJ: u32 = 0x04;
/// Named group, qualified by a gid.
pub const ACL_GROUP: u32 = 0x08;
/// Upper bound for the group class permissions.
pub const ACL_MASK: u32 = 0x10;
/// Everybody else.
pub const ACL_OTHER: u32 = 0x20;

/// Execute (search) permission.
pub const ACL_EXECUTE: u32 = 0x01;
/// Write permission.
pub const ACL_WRITE: u32 = 0x02;
/// Read permission.
pub const ACL_READ: u32 = 0x04;
/// Every permission bit an entry may carry.
pub const ACL_PERM_MASK: u32 = ACL_READ | ACL_WRITE | ACL_EXECUTE;

/// Qualifier of named entries that have not been given an id.
pub const ACL_UNDEFINED_ID: u32 = u32::MAX;

/// Returns `true` for tags that carry a uid/gid qualifier.
#[must_use]
pub const fn is_named_tag(tag: u32) -> bool {
    matches!(tag, ACL_USER | ACL_GROUP)
}

fn invalid_argument() -> std::io::Error {
    std::io::Error::from_raw_os_error(libc::EINVAL)
}

mod sys {
    #![allow(non_camel_case_types)]

    use libc::{c_char, c_int, c_uint, c_void, mode_t, ssize_t};

    pub type acl_t = *mut c_void;
    pub type acl_entry_t = *mut c_void;
    pub type acl_permset_t = *mut c_void;
    pub type acl_type_t = c_uint;
    pub type acl_tag_t = c_int;
    pub type acl_perm_t = c_uint;

    pub const ACL_TYPE_ACCESS: acl_type_t = 0x8000;
    pub const ACL_TYPE_DEFAULT: acl_type_t = 0x4000;

    pub const ACL_FIRST_ENTRY: c_int = 0;
    pub const ACL_NEXT_ENTRY: c_int = 1;

    pub const ACL_MULTI_ERROR: c_int = 0x1000;
    pub const ACL_DUPLICATE_ERROR: c_int = 0x2000;
    pub const ACL_MISS_ERROR: c_int = 0x3000;
    pub const ACL_ENTRY_ERROR: c_int = 0x4000;

    unsafe extern "C" {
        pub fn acl_init(count: c_int) -> acl_t;
        pub fn acl_dup(acl: acl_t) -> acl_t;
        pub fn acl_free(obj_p: *mut c_void) -> c_int;
        pub fn acl_entries(acl: acl_t) -> c_int;

        pub fn acl_from_text(buf_p: *const c_char) -> acl_t;
        pub fn acl_to_text(acl: acl_t, len_p: *mut ssize_t) -> *mut c_char;
        pub fn acl_to_any_text(
            acl: acl_t,
            prefix: *const c_char,
            separator: c_char,
            options: c_int,
        ) -> *mut c_char;

        pub fn acl_valid(acl: acl_t) -> c_int;
        pub fn acl_check(acl: acl_t, last: *mut c_int) -> c_int;
        pub fn acl_calc_mask(acl_p: *mut acl_t) -> c_int;
        pub fn acl_from_mode(mode: mode_t) -> acl_t;
        pub fn acl_equiv_mode(acl: acl_t, mode_p: *mut mode_t) -> c_int;

        pub fn acl_create_entry(acl_p: *mut acl_t, entry_p: *mut acl_entry_t) -> c_int;
        pub fn acl_delete_entry(acl: acl_t, entry_d: acl_entry_t) -> c_int;
        pub fn acl_copy_entry(dest_d: acl_entry_t, src_d: acl_entry_t) -> c_int;
        pub fn acl_get_entry(acl: acl_t, entry_id: c_int, entry_p: *mut acl_entry_t) -> c_int;

        pub fn acl_get_tag_type(entry_d: acl_entry_t, tag_type_p: *mut acl_tag_t) -> c_int;
        pub fn acl_set_tag_type(entry_d: acl_entry_t, tag_type: acl_tag_t) -> c_int;
        pub fn acl_get_qualifier(entry_d: acl_entry_t) -> *mut c_void;
        pub fn acl_set_qualifier(entry_d: acl_entry_t, tag_qualifier_p: *const c_void) -> c_int;
        pub fn acl_get_permset(entry_d: acl_entry_t, permset_p: *mut acl_permset_t) -> c_int;
        pub fn acl_set_permset(entry_d: acl_entry_t, permset_d: acl_permset_t) -> c_int;
        pub fn acl_clear_perms(permset_d: acl_permset_t) -> c_int;
        pub fn acl_add_perm(permset_d: acl_permset_t, perm: acl_perm_t) -> c_int;
        pub fn acl_get_perm(permset_d: acl_permset_t, perm: acl_perm_t) -> c_int;

        pub fn acl_get_file(path_p: *const c_char, ty: acl_type_t) -> acl_t;
        pub fn acl_get_fd(fd: c_int) -> acl_t;
        pub fn acl_set_file(path_p: *const c_char, ty: acl_type_t, acl: acl_t) -> c_int;
        pub fn acl_set_fd(fd: c_int, acl: acl_t) -> c_int;
        pub fn acl_delete_def_file(path_p: *const c_char) -> c_int;
    }
}
