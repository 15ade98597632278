//! Entry references.

use std::fmt;
use std::io;
use std::ptr;

use aclkit_sys::{ACL_UNDEFINED_ID, RawAcl, RawEntry, is_named_tag};
use tracing::trace;

use crate::container::Acl;
use crate::error::{AclError, Result};
use crate::permset::Permset;
use crate::tag::TagType;

/// A reference to one entry of an [`Acl`].
///
/// The reference records the container generation it was issued in and the
/// libacl handle of the entry. Every operation re-checks the generation
/// against the container and fails with [`AclError::StaleReference`] once
/// the container has gained or lost an entry since. A stale reference never
/// becomes live again; obtain a fresh one from [`Acl::entries`].
///
/// libacl keeps entries sorted, so changing the tag or qualifier may move
/// the entry within the list. The reference moves with it.
///
/// Entries hold no state of their own: reads and writes go straight to the
/// container's storage.
#[derive(Clone, Copy)]
pub struct Entry<'a> {
    acl: &'a Acl,
    generation: u64,
    raw: RawEntry,
}

impl<'a> Entry<'a> {
    pub(crate) const fn new(acl: &'a Acl, generation: u64, raw: RawEntry) -> Self {
        Self {
            acl,
            generation,
            raw,
        }
    }

    /// The ACL this entry belongs to.
    #[must_use]
    pub const fn acl(&self) -> &'a Acl {
        self.acl
    }

    /// Hands out the libacl handle while the reference is current.
    pub(crate) fn resolve(&self) -> Result<RawEntry> {
        if self.acl.generation() != self.generation {
            return Err(AclError::StaleReference);
        }
        Ok(self.raw)
    }

    fn read<T>(
        &self,
        operation: &'static str,
        read: impl FnOnce(&RawAcl, RawEntry) -> io::Result<T>,
    ) -> Result<T> {
        let raw = self.resolve()?;
        read(&*self.acl.raw(), raw).map_err(|error| AclError::os(operation, error))
    }

    fn write(
        &self,
        operation: &'static str,
        write: impl FnOnce(&mut RawAcl, RawEntry) -> io::Result<()>,
    ) -> Result<()> {
        let raw = self.resolve()?;
        write(&mut *self.acl.raw_mut(), raw).map_err(|error| AclError::os(operation, error))
    }

    /// Reads the tag type.
    pub fn tag_type(&self) -> Result<TagType> {
        TagType::try_from(self.read("get tag type", RawAcl::get_tag_type)?)
    }

    /// Assigns the tag type. A stored qualifier survives the change but is
    /// only reported while the tag is [`TagType::User`] or
    /// [`TagType::Group`].
    ///
    /// # Errors
    ///
    /// [`TagType::Undefined`] cannot be assigned; libacl rejects it with
    /// [`AclError::Os`].
    pub fn set_tag_type(&self, tag: TagType) -> Result<()> {
        self.write("set tag type", |raw, entry| {
            raw.set_tag_type(entry, tag.as_raw())
        })?;
        trace!(target: "acl::entry", generation = self.generation, %tag, "set tag type");
        Ok(())
    }

    /// Reads the uid or gid of a named entry.
    ///
    /// Returns `None` when the tag is neither [`TagType::User`] nor
    /// [`TagType::Group`], or when no qualifier has been assigned yet.
    pub fn qualifier(&self) -> Result<Option<u32>> {
        self.read("get qualifier", |raw, entry| {
            if !is_named_tag(raw.get_tag_type(entry)?) {
                return Ok(None);
            }
            let id = raw.get_qualifier(entry)?;
            Ok((id != ACL_UNDEFINED_ID).then_some(id))
        })
    }

    /// Assigns the uid or gid of a named entry.
    ///
    /// Set the tag to [`TagType::User`] or [`TagType::Group`] first; libacl
    /// rejects qualifiers on other entries with [`AclError::Os`].
    pub fn set_qualifier(&self, id: u32) -> Result<()> {
        self.write("set qualifier", |raw, entry| raw.set_qualifier(entry, id))?;
        trace!(target: "acl::entry", generation = self.generation, id, "set qualifier");
        Ok(())
    }

    /// Reads the permission set.
    pub fn permset(&self) -> Result<Permset> {
        Permset::try_from(self.read("get permset", RawAcl::get_permset)?)
    }

    /// Replaces the whole permission set in one operation.
    pub fn set_permset(&self, perms: Permset) -> Result<()> {
        self.write("set permset", |raw, entry| {
            raw.set_permset(entry, perms.bits())
        })?;
        trace!(target: "acl::entry", generation = self.generation, %perms, "set permset");
        Ok(())
    }

    /// Replaces the permission set from raw `<sys/acl.h>` bits.
    ///
    /// # Errors
    ///
    /// Bits outside read, write and execute fail with
    /// [`AclError::InvalidArgument`] before the entry is touched.
    pub fn set_permset_bits(&self, bits: u32) -> Result<()> {
        self.set_permset(Permset::try_from(bits)?)
    }

    /// Copies tag type, qualifier and permissions from `source` with
    /// `acl_copy_entry(3)`.
    ///
    /// `source` may belong to a different ACL. Both references must be live.
    pub fn copy_from(&self, source: &Entry<'_>) -> Result<()> {
        let src = source.resolve()?;
        let dest = self.resolve()?;
        let copied = if ptr::eq(self.acl, source.acl) {
            self.acl.raw_mut().copy_entry_within(dest, src)
        } else {
            self.acl
                .raw_mut()
                .copy_entry(dest, &source.acl.raw(), src)
        };
        copied.map_err(|error| AclError::os("copy entry", error))?;
        trace!(target: "acl::entry", generation = self.generation, "copied entry");
        Ok(())
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("generation", &self.generation)
            .field("handle", &self.raw)
            .finish_non_exhaustive()
    }
}
