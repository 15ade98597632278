//! Owned `acl_t` handles and entry primitives.

use std::fmt;
use std::io;
use std::ptr::{self, NonNull};

use libc::{c_int, c_void};

use crate::{ACL_EXECUTE, ACL_PERM_MASK, ACL_READ, ACL_WRITE, invalid_argument, sys};

/// Maps a libacl status return onto `errno`.
pub(crate) fn status(result: c_int) -> io::Result<()> {
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

fn permset_of(entry: sys::acl_entry_t) -> io::Result<sys::acl_permset_t> {
    let mut permset: sys::acl_permset_t = ptr::null_mut();
    // Safety: `entry` was located in a live ACL by the caller.
    status(unsafe { sys::acl_get_permset(entry, &mut permset) })?;
    Ok(permset)
}

/// An ACL allocated by `libacl`, released when dropped.
pub struct RawAcl {
    ptr: NonNull<c_void>,
}

// Safety: the handle is exclusively owned and libacl keeps no thread-local
// state for it. The traversal cursor inside rules out `Sync`.
unsafe impl Send for RawAcl {}

/// Opaque reference to one entry of a [`RawAcl`].
///
/// The handle stays attached to its entry while the entry moves inside the
/// list. It carries no lifetime; [`RawAcl`] methods refuse handles that are
/// not currently linked into the ACL they are called on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawEntry(NonNull<c_void>);

impl RawAcl {
    /// Takes ownership of a pointer returned by libacl, turning `NULL` into
    /// the pending `errno`.
    pub(crate) fn from_ptr(ptr: sys::acl_t) -> io::Result<Self> {
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or_else(io::Error::last_os_error)
    }

    pub(crate) fn as_ptr(&self) -> sys::acl_t {
        self.ptr.as_ptr()
    }

    /// Adopts the pointer libacl wrote back through an `acl_t *` argument.
    pub(crate) fn replace_ptr(&mut self, ptr: sys::acl_t) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.ptr = ptr;
        }
    }

    /// Allocates an empty ACL with room for `count` entries.
    ///
    /// Counts beyond `c_int` fail with `EINVAL`; exhausted memory with
    /// `ENOMEM`.
    pub fn init(count: usize) -> io::Result<Self> {
        let count = c_int::try_from(count).map_err(|_| invalid_argument())?;
        // Safety: `acl_init` only reads its integer argument.
        Self::from_ptr(unsafe { sys::acl_init(count) })
    }

    /// Deep-copies the ACL.
    pub fn dup(&self) -> io::Result<Self> {
        // Safety: `acl_dup` returns a new ACL when provided with a valid one.
        Self::from_ptr(unsafe { sys::acl_dup(self.as_ptr()) })
    }

    /// Builds the three-entry ACL equivalent to the permission bits of
    /// `mode`.
    pub fn from_mode(mode: u32) -> io::Result<Self> {
        // Safety: acl_from_mode allocates a new ACL from the provided bitmask.
        Self::from_ptr(unsafe { sys::acl_from_mode(mode as libc::mode_t) })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        // Safety: the ACL pointer remains valid for the duration of the call.
        let count = unsafe { sys::acl_entries(self.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    /// Returns `true` when the ACL has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles to every entry, in list order.
    pub fn entries(&self) -> io::Result<Vec<RawEntry>> {
        let mut handles = Vec::with_capacity(self.len());
        let mut which = sys::ACL_FIRST_ENTRY;
        loop {
            let mut entry: sys::acl_entry_t = ptr::null_mut();
            // Safety: the ACL pointer is valid and `entry` is a valid out-pointer.
            let result = unsafe { sys::acl_get_entry(self.as_ptr(), which, &mut entry) };
            match result {
                1 => handles.push(RawEntry(NonNull::new(entry).ok_or_else(invalid_argument)?)),
                0 => return Ok(handles),
                -1 => return Err(io::Error::last_os_error()),
                value => {
                    return Err(io::Error::other(format!(
                        "unexpected acl_get_entry result {value}"
                    )));
                }
            }
            which = sys::ACL_NEXT_ENTRY;
        }
    }

    /// Resolves `entry` to a pointer libacl may dereference, or `EINVAL`
    /// when it is not linked into this ACL.
    pub(crate) fn locate(&self, entry: RawEntry) -> io::Result<sys::acl_entry_t> {
        if self.entries()?.contains(&entry) {
            Ok(entry.0.as_ptr())
        } else {
            Err(invalid_argument())
        }
    }

    /// Appends an entry with an undefined tag, no qualifier and no
    /// permissions.
    pub fn create_entry(&mut self) -> io::Result<RawEntry> {
        let mut acl = self.as_ptr();
        let mut entry: sys::acl_entry_t = ptr::null_mut();
        // Safety: both out-pointers are valid; libacl may replace `acl` when it
        // has to grow the list.
        let result = unsafe { sys::acl_create_entry(&mut acl, &mut entry) };
        self.replace_ptr(acl);
        status(result)?;
        NonNull::new(entry)
            .map(RawEntry)
            .ok_or_else(io::Error::last_os_error)
    }

    /// Unlinks and frees `entry`. The handle must not be used afterwards.
    pub fn delete_entry(&mut self, entry: RawEntry) -> io::Result<()> {
        let entry = self.locate(entry)?;
        // Safety: `entry` is linked into this ACL.
        status(unsafe { sys::acl_delete_entry(self.as_ptr(), entry) })
    }

    /// Reads the raw tag value of `entry`.
    pub fn get_tag_type(&self, entry: RawEntry) -> io::Result<u32> {
        let entry = self.locate(entry)?;
        let mut tag: sys::acl_tag_t = 0;
        // Safety: `entry` is linked into this ACL and `tag` is a valid out-pointer.
        status(unsafe { sys::acl_get_tag_type(entry, &mut tag) })?;
        u32::try_from(tag).map_err(|_| invalid_argument())
    }

    /// Assigns a tag. libacl rejects [`ACL_UNDEFINED_TAG`](crate::ACL_UNDEFINED_TAG)
    /// and unknown values with `EINVAL`, and moves the entry to its sorted
    /// position.
    pub fn set_tag_type(&mut self, entry: RawEntry, tag: u32) -> io::Result<()> {
        let entry = self.locate(entry)?;
        let tag = sys::acl_tag_t::try_from(tag).map_err(|_| invalid_argument())?;
        // Safety: `entry` is linked into this ACL.
        status(unsafe { sys::acl_set_tag_type(entry, tag) })
    }

    /// Reads the uid or gid of a named entry. Other tags fail with `EINVAL`.
    pub fn get_qualifier(&self, entry: RawEntry) -> io::Result<u32> {
        let entry = self.locate(entry)?;
        // Safety: `entry` is linked into this ACL.
        let id = unsafe { sys::acl_get_qualifier(entry) };
        if id.is_null() {
            return Err(io::Error::last_os_error());
        }
        // Safety: libacl hands back a heap copy of the entry's `id_t`.
        let value = unsafe { id.cast::<libc::id_t>().read() };
        // Safety: the copy belongs to the caller and is released exactly once.
        unsafe {
            sys::acl_free(id);
        }
        Ok(value)
    }

    /// Assigns the uid or gid of a named entry. Other tags fail with `EINVAL`.
    pub fn set_qualifier(&mut self, entry: RawEntry, id: u32) -> io::Result<()> {
        let entry = self.locate(entry)?;
        let id: libc::id_t = id;
        // Safety: `entry` is linked into this ACL and libacl copies the id out
        // of `id` before returning.
        status(unsafe { sys::acl_set_qualifier(entry, ptr::from_ref(&id).cast()) })
    }

    /// Reads the permission bits of `entry`.
    pub fn get_permset(&self, entry: RawEntry) -> io::Result<u32> {
        let permset = permset_of(self.locate(entry)?)?;
        let mut bits = 0;
        for perm in [ACL_READ, ACL_WRITE, ACL_EXECUTE] {
            // Safety: `permset` belongs to an entry linked into this ACL.
            match unsafe { sys::acl_get_perm(permset, perm) } {
                1 => bits |= perm,
                0 => {}
                _ => return Err(io::Error::last_os_error()),
            }
        }
        Ok(bits)
    }

    /// Replaces the permission bits of `entry` in one call. Bits outside
    /// `rwx` fail with `EINVAL` before the entry is touched.
    pub fn set_permset(&mut self, entry: RawEntry, bits: u32) -> io::Result<()> {
        if bits & !ACL_PERM_MASK != 0 {
            return Err(invalid_argument());
        }
        let entry = self.locate(entry)?;
        let permset = permset_of(entry)?;
        // Safety: `permset` belongs to `entry`, which is linked into this ACL.
        unsafe {
            status(sys::acl_clear_perms(permset))?;
            if bits != 0 {
                status(sys::acl_add_perm(permset, bits))?;
            }
            status(sys::acl_set_permset(entry, permset))
        }
    }

    /// Copies tag, qualifier and permissions of `src` in `source` onto
    /// `dest` in this ACL.
    pub fn copy_entry(&mut self, dest: RawEntry, source: &Self, src: RawEntry) -> io::Result<()> {
        let dest = self.locate(dest)?;
        let src = source.locate(src)?;
        // Safety: both entries are linked into live ACLs.
        status(unsafe { sys::acl_copy_entry(dest, src) })
    }

    /// [`RawAcl::copy_entry`] with both entries in this ACL.
    pub fn copy_entry_within(&mut self, dest: RawEntry, src: RawEntry) -> io::Result<()> {
        let dest = self.locate(dest)?;
        let src = self.locate(src)?;
        // Safety: both entries are linked into this ACL.
        status(unsafe { sys::acl_copy_entry(dest, src) })
    }
}

impl Drop for RawAcl {
    fn drop(&mut self) {
        // Safety: the ACL pointer originates from libacl allocation APIs and is
        // owned by this value.
        unsafe {
            sys::acl_free(self.as_ptr());
        }
    }
}

impl fmt::Debug for RawAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAcl")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ACL_GROUP, ACL_MASK, ACL_UNDEFINED_TAG, ACL_USER, ACL_USER_OBJ};

    #[test]
    fn created_entry_starts_blank() {
        let mut acl = RawAcl::init(2).expect("init");
        assert!(acl.is_empty());

        let entry = acl.create_entry().expect("create");
        assert_eq!(acl.len(), 1);
        assert_eq!(acl.get_tag_type(entry).expect("tag"), ACL_UNDEFINED_TAG);
        assert_eq!(acl.get_permset(entry).expect("perms"), 0);
    }

    #[test]
    fn oversized_count_is_rejected() {
        let err = RawAcl::init(usize::MAX).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn handle_follows_entry_through_retagging() {
        let mut acl = RawAcl::from_mode(0o640).expect("from mode");
        let entry = acl.create_entry().expect("create");
        acl.set_tag_type(entry, ACL_USER).expect("tag");
        acl.set_qualifier(entry, 54321).expect("qualifier");
        acl.set_permset(entry, ACL_READ | ACL_WRITE).expect("perms");

        assert_eq!(acl.get_tag_type(entry).expect("tag"), ACL_USER);
        assert_eq!(acl.get_qualifier(entry).expect("qualifier"), 54321);
        assert_eq!(acl.get_permset(entry).expect("perms"), ACL_READ | ACL_WRITE);
    }

    #[test]
    fn deleted_and_foreign_handles_are_refused() {
        let mut acl = RawAcl::from_mode(0o600).expect("from mode");
        let other = RawAcl::from_mode(0o600).expect("from mode");
        let foreign = other.entries().expect("entries")[0];
        assert_eq!(
            acl.get_tag_type(foreign).unwrap_err().raw_os_error(),
            Some(libc::EINVAL)
        );

        let entry = acl.create_entry().expect("create");
        acl.delete_entry(entry).expect("delete");
        assert_eq!(acl.len(), 3);
        assert_eq!(
            acl.delete_entry(entry).unwrap_err().raw_os_error(),
            Some(libc::EINVAL)
        );
    }

    #[test]
    fn qualifier_and_tag_rules_come_from_libacl() {
        let mut acl = RawAcl::init(1).expect("init");
        let entry = acl.create_entry().expect("create");
        let einval = Some(libc::EINVAL);

        assert_eq!(
            acl.set_tag_type(entry, ACL_UNDEFINED_TAG).unwrap_err().raw_os_error(),
            einval
        );
        acl.set_tag_type(entry, ACL_MASK).expect("tag");
        assert_eq!(acl.set_qualifier(entry, 7).unwrap_err().raw_os_error(), einval);
        assert_eq!(acl.get_qualifier(entry).unwrap_err().raw_os_error(), einval);
    }

    #[test]
    fn permset_is_replaced_not_merged() {
        let mut acl = RawAcl::init(1).expect("init");
        let entry = acl.create_entry().expect("create");
        acl.set_tag_type(entry, ACL_USER_OBJ).expect("tag");

        acl.set_permset(entry, ACL_PERM_MASK).expect("perms");
        acl.set_permset(entry, ACL_EXECUTE).expect("perms");
        assert_eq!(acl.get_permset(entry).expect("perms"), ACL_EXECUTE);

        assert!(acl.set_permset(entry, 0o10).is_err());
        assert_eq!(acl.get_permset(entry).expect("perms"), ACL_EXECUTE);
    }

    #[test]
    fn copy_entry_across_and_within_acls() {
        let mut source = RawAcl::init(1).expect("init");
        let src = source.create_entry().expect("create");
        source.set_tag_type(src, ACL_GROUP).expect("tag");
        source.set_qualifier(src, 54322).expect("qualifier");
        source.set_permset(src, ACL_READ).expect("perms");

        let mut dest = RawAcl::init(2).expect("init");
        let first = dest.create_entry().expect("create");
        dest.copy_entry(first, &source, src).expect("copy");
        assert_eq!(dest.get_tag_type(first).expect("tag"), ACL_GROUP);
        assert_eq!(dest.get_qualifier(first).expect("qualifier"), 54322);

        let second = dest.create_entry().expect("create");
        dest.copy_entry_within(second, first).expect("copy within");
        assert_eq!(dest.get_permset(second).expect("perms"), ACL_READ);
    }

    #[test]
    fn dup_shares_nothing() {
        let original = RawAcl::from_mode(0o700).expect("from mode");
        let mut copy = original.dup().expect("dup");
        let entry = copy.entries().expect("entries")[0];
        copy.set_permset(entry, 0).expect("perms");

        let first = original.entries().expect("entries")[0];
        assert_eq!(original.get_permset(first).expect("perms"), ACL_PERM_MASK);
        assert!(format!("{copy:?}").contains("entries"));
    }
}
