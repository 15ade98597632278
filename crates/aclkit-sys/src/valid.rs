//! Validity checks, mask recalculation and mode equivalence.

use std::io;

use libc::c_int;
use thiserror::Error;

use crate::ACL_MASK;
use crate::handle::{RawAcl, status};
use crate::sys;

/// First rule an ACL violates, as reported by `acl_check(3)`.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidityError {
    /// A tag that may appear once appears again.
    #[error("entry {index} repeats a tag that may appear only once")]
    MultipleEntries {
        /// List position where the check stopped.
        index: usize,
    },
    /// Two named entries of the same kind share a qualifier.
    #[error("entry {index} repeats a user or group qualifier")]
    DuplicateQualifier {
        /// List position where the check stopped.
        index: usize,
    },
    /// A mandatory entry, or the mask required by named entries, is absent.
    #[error("a required entry is missing")]
    MissingEntry,
    /// An entry has an undefined or unknown tag.
    #[error("entry {index} has an invalid tag type")]
    InvalidEntry {
        /// List position where the check stopped.
        index: usize,
    },
}

impl ValidityError {
    fn from_code(code: c_int, last: c_int) -> io::Result<Self> {
        let index = usize::try_from(last).unwrap_or(0);
        match code {
            sys::ACL_MULTI_ERROR => Ok(Self::MultipleEntries { index }),
            sys::ACL_DUPLICATE_ERROR => Ok(Self::DuplicateQualifier { index }),
            sys::ACL_MISS_ERROR => Ok(Self::MissingEntry),
            sys::ACL_ENTRY_ERROR => Ok(Self::InvalidEntry { index }),
            other => Err(io::Error::other(format!("unexpected acl_check result {other:#x}"))),
        }
    }
}

impl RawAcl {
    /// `acl_valid(3)`: one owner, owning group and other entry, at most one
    /// mask (mandatory with named entries), unique qualifiers.
    #[must_use]
    pub fn valid(&self) -> bool {
        // Safety: the ACL pointer remains valid for the duration of the call.
        unsafe { sys::acl_valid(self.as_ptr()) == 0 }
    }

    /// Same rules as [`RawAcl::valid`], reporting which one is broken.
    pub fn check(&self) -> io::Result<Option<ValidityError>> {
        let mut last: c_int = 0;
        // Safety: the ACL pointer is valid and `last` is a valid out-pointer.
        match unsafe { sys::acl_check(self.as_ptr(), &mut last) } {
            0 => Ok(None),
            -1 => Err(io::Error::last_os_error()),
            code => ValidityError::from_code(code, last).map(Some),
        }
    }

    /// `acl_calc_mask(3)`: sets the mask to the union of the group class
    /// permissions, creating the mask entry when there is none.
    ///
    /// Returns `true` when an entry was created.
    pub fn calc_mask(&mut self) -> io::Result<bool> {
        let had_mask = self.contains_tag(ACL_MASK)?;
        let mut acl = self.as_ptr();
        // Safety: `acl` is a valid ACL and libacl may replace it in place.
        let result = unsafe { sys::acl_calc_mask(&mut acl) };
        self.replace_ptr(acl);
        status(result)?;
        Ok(!had_mask)
    }

    /// `acl_equiv_mode(3)`: the permission bits this ACL amounts to, or
    /// `None` when it carries named entries.
    pub fn equiv_mode(&self) -> io::Result<Option<u32>> {
        let mut mode: libc::mode_t = 0;
        // Safety: the ACL pointer is valid and `mode` is a valid out-pointer.
        match unsafe { sys::acl_equiv_mode(self.as_ptr(), &mut mode) } {
            0 => Ok(Some(u32::from(mode) & 0o777)),
            1 => Ok(None),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn contains_tag(&self, tag: u32) -> io::Result<bool> {
        for entry in self.entries()? {
            if self.get_tag_type(entry)? == tag {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
