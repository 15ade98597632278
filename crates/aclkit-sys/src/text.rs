//! Text conversion through `acl_from_text(3)`, `acl_to_text(3)` and
//! `acl_to_any_text(3)`.

use std::ffi::{CStr, CString};
use std::io;
use std::ptr;

use libc::{c_char, c_int};
use thiserror::Error;

use crate::handle::RawAcl;
use crate::{invalid_argument, sys};

/// Show `#effective:` comments where the mask removes permissions.
pub const TEXT_SOME_EFFECTIVE: i32 = 0x01;
/// Show `#effective:` comments on every entry of the group class.
pub const TEXT_ALL_EFFECTIVE: i32 = 0x02;
/// Align effective-rights comments with tabs.
pub const TEXT_SMART_INDENT: i32 = 0x04;
/// Keep qualifiers numeric instead of resolving user and group names.
pub const TEXT_NUMERIC_IDS: i32 = 0x08;
/// Write `u`, `g`, `m` and `o` instead of the full tag names.
pub const TEXT_ABBREVIATE: i32 = 0x10;

/// Failure to parse ACL text.
#[derive(Debug, Error)]
pub enum TextError {
    /// libacl rejected the text.
    #[error("malformed ACL text{}", at_line(.line))]
    Syntax {
        /// 1-based line that fails to parse on its own, when one does.
        line: Option<usize>,
    },
    /// Parsing failed for a reason other than the text itself.
    #[error(transparent)]
    Os(#[from] io::Error),
}

#[allow(clippy::ref_option)]
fn at_line(line: &Option<usize>) -> String {
    line.map_or_else(String::new, |line| format!(" at line {line}"))
}

fn parse(text: &str) -> io::Result<RawAcl> {
    let text = CString::new(text).map_err(|_| invalid_argument())?;
    // Safety: the pointer remains valid for the duration of the call.
    RawAcl::from_ptr(unsafe { sys::acl_from_text(text.as_ptr()) })
}

/// libacl reports `EINVAL` for the text as a whole; the first line that
/// does not parse on its own is the one to blame.
fn failing_line(text: &str) -> Option<usize> {
    text.split('\n')
        .enumerate()
        .find(|(_, line)| !line.trim().is_empty() && parse(line).is_err())
        .map(|(index, _)| index + 1)
}

/// Takes ownership of a string allocated by libacl.
fn take_text(text: *mut c_char) -> io::Result<String> {
    if text.is_null() {
        return Err(io::Error::last_os_error());
    }
    // Safety: libacl returns a NUL-terminated string.
    let owned = unsafe { CStr::from_ptr(text) }
        .to_string_lossy()
        .into_owned();
    // Safety: the string came from libacl and is released exactly once.
    unsafe {
        sys::acl_free(text.cast());
    }
    Ok(owned)
}

impl RawAcl {
    /// Parses the long or short text form. Entries are separated by
    /// newlines or commas, `#` starts a comment, and qualifiers may be
    /// numeric ids or user/group names.
    pub fn from_text(text: &str) -> Result<Self, TextError> {
        match parse(text) {
            Ok(acl) => Ok(acl),
            Err(error) if error.raw_os_error() == Some(libc::EINVAL) => Err(TextError::Syntax {
                line: failing_line(text),
            }),
            Err(error) => Err(TextError::Os(error)),
        }
    }

    /// Renders the form `acl_to_text(3)` produces: long tag names, resolved
    /// names, newline after every entry, and an `#effective:` comment where
    /// the mask removes permissions.
    pub fn to_text(&self) -> io::Result<String> {
        // Safety: the ACL pointer remains valid for the duration of the call;
        // a null length pointer is allowed.
        take_text(unsafe { sys::acl_to_text(self.as_ptr(), ptr::null_mut()) })
    }

    /// Renders with explicit `TEXT_*` options. `prefix` is written before
    /// every entry; `separator` must be ASCII.
    pub fn to_any_text(&self, prefix: &str, separator: char, options: i32) -> io::Result<String> {
        let separator = u8::try_from(separator)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(invalid_argument)?;
        let prefix = if prefix.is_empty() {
            None
        } else {
            Some(CString::new(prefix).map_err(|_| invalid_argument())?)
        };
        let prefix_ptr = prefix.as_ref().map_or(ptr::null(), |prefix| prefix.as_ptr());
        // Safety: `prefix_ptr` is null or points at a live C string, and the ACL
        // pointer remains valid for the duration of the call.
        take_text(unsafe {
            sys::acl_to_any_text(
                self.as_ptr(),
                prefix_ptr,
                separator as c_char,
                options as c_int,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "user::rw-\ngroup::r--\nother::r--\n";

    #[test]
    fn minimal_text_round_trips() {
        let acl = RawAcl::from_text(MINIMAL).expect("parse");
        assert_eq!(acl.len(), 3);
        assert_eq!(acl.to_text().expect("text"), MINIMAL);
    }

    #[test]
    fn short_form_and_commas_are_accepted() {
        let acl = RawAcl::from_text("u::rw-,g::r--,o::r--").expect("parse");
        assert_eq!(acl.to_text().expect("text"), MINIMAL);
    }

    #[test]
    fn any_text_honours_prefix_separator_and_abbreviation() {
        let acl = RawAcl::from_text(MINIMAL).expect("parse");
        let text = acl
            .to_any_text("default:", ',', TEXT_ABBREVIATE)
            .expect("text");
        assert_eq!(text, "default:u::rw-,default:g::r--,default:o::r--");
    }

    #[test]
    fn mask_restriction_is_commented() {
        let acl = RawAcl::from_text(
            "user::rw-\nuser:54321:rwx\ngroup::r--\nmask::r--\nother::---\n",
        )
        .expect("parse");
        let text = acl.to_text().expect("text");
        assert!(text.contains("user:54321:rwx\t#effective:r--\n"), "{text:?}");

        let plain = acl.to_any_text("", '\n', TEXT_NUMERIC_IDS).expect("text");
        assert!(!plain.contains("#effective"), "{plain:?}");
    }

    #[test]
    fn syntax_error_names_first_bad_line() {
        let err = RawAcl::from_text("user::rw-\ngroup::r--\nbogus::r--\nother::---\n").unwrap_err();
        assert!(matches!(err, TextError::Syntax { line: Some(3) }));
        assert!(err.to_string().ends_with("at line 3"));
    }

    #[test]
    fn interior_nul_is_a_syntax_error() {
        assert!(matches!(
            RawAcl::from_text("user::rw-\nother::r\0--"),
            Err(TextError::Syntax { line: Some(2) })
        ));
    }

    #[test]
    fn non_ascii_separator_is_rejected() {
        let acl = RawAcl::from_text(MINIMAL).expect("parse");
        let err = acl.to_any_text("", '→', 0).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }
}
