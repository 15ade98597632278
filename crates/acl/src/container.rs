//! The ACL container and its entry traversal.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::iter::FusedIterator;
use std::ptr;
use std::str::FromStr;
use std::vec;

use aclkit_sys::{RawAcl, RawEntry};
use tracing::{debug, trace};

use crate::entry::Entry;
use crate::error::{AclError, Result};
use crate::options::{DEFAULT_CAPACITY, TextOptions};

/// An access control list.
///
/// The container exclusively owns its entry storage and releases it when
/// dropped. Entries are reached through [`Entry`] views that borrow the
/// container; adding or removing an entry moves the container to a new
/// generation, after which every view handed out earlier fails with
/// [`AclError::StaleReference`].
///
/// `Acl` is `Send` but not `Sync`: it mutates through shared references and
/// performs no locking.
pub struct Acl {
    storage: RefCell<RawAcl>,
    generation: Cell<u64>,
}

impl Acl {
    pub(crate) fn from_raw(raw: RawAcl) -> Self {
        Self {
            storage: RefCell::new(raw),
            generation: Cell::new(0),
        }
    }

    /// Allocates an empty ACL with room for [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Allocates an empty ACL with room for `capacity` entries.
    ///
    /// The hint only sizes the initial allocation; the ACL grows as entries
    /// are created.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::InvalidArgument`] for a hint beyond `i32::MAX`
    /// and [`AclError::Allocation`] when libacl runs out of memory.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if i32::try_from(capacity).is_err() {
            return Err(AclError::invalid_argument(format!(
                "capacity {capacity} exceeds what libacl accepts"
            )));
        }
        let raw = RawAcl::init(capacity).map_err(|error| AclError::storage("allocate ACL", error))?;
        debug!(target: "acl::container", capacity, "allocated ACL");
        Ok(Self::from_raw(raw))
    }

    /// Deep-copies the current entries of `source`.
    ///
    /// The copy shares no storage with `source` and starts with no
    /// outstanding entry references.
    pub fn duplicate(source: &Self) -> Result<Self> {
        let raw = source
            .raw()
            .dup()
            .map_err(|error| AclError::storage("duplicate ACL", error))?;
        debug!(target: "acl::container", entries = raw.len(), "duplicated ACL");
        Ok(Self::from_raw(raw))
    }

    /// Parses the text form, e.g. `user::rw-\ngroup::r--\nother::r--\n`,
    /// with `acl_from_text(3)`.
    ///
    /// Qualifiers may be numeric ids or user/group names. Entries are
    /// stored in libacl's order, which sorts them by tag and qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Parse`] when libacl rejects the text, naming the
    /// first line that does not parse on its own.
    pub fn from_text(text: &str) -> Result<Self> {
        let raw = RawAcl::from_text(text)?;
        debug!(target: "acl::container", entries = raw.len(), "parsed ACL text");
        Ok(Self::from_raw(raw))
    }

    /// Builds the minimal ACL equivalent to the permission bits of `mode`.
    pub fn from_mode(mode: u32) -> Result<Self> {
        let raw = RawAcl::from_mode(mode)
            .map_err(|error| AclError::storage("build ACL from mode", error))?;
        Ok(Self::from_raw(raw))
    }

    /// Renders the canonical text form produced by `acl_to_text(3)`.
    ///
    /// One newline-terminated entry per line in storage order. Qualifiers
    /// are written as names where the system databases know the id, and an
    /// entry whose permissions the mask restricts carries a trailing
    /// `\t#effective:` comment.
    pub fn to_text(&self) -> Result<String> {
        self.raw()
            .to_text()
            .map_err(|error| AclError::storage("render ACL text", error))
    }

    /// Renders the text form using `options`, through `acl_to_any_text(3)`.
    pub fn to_text_with(&self, options: &TextOptions) -> Result<String> {
        options
            .render(&self.raw())
            .map_err(|error| AclError::storage("render ACL text", error))
    }

    /// Reports whether the ACL satisfies the structural rules the kernel
    /// enforces.
    ///
    /// An invalid ACL is a normal answer, not an error. Use
    /// [`Acl::validate`] to learn which rule is broken.
    pub fn is_valid(&self) -> bool {
        self.raw().valid()
    }

    /// Checks the structural rules, reporting the first one violated.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Invalid`] describing the violation.
    pub fn validate(&self) -> Result<()> {
        let verdict = self
            .raw()
            .check()
            .map_err(|error| AclError::os("check ACL", error))?;
        match verdict {
            None => Ok(()),
            Some(violation) => Err(violation.into()),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.raw().len()
    }

    /// Returns `true` when the ACL has no entries.
    pub fn is_empty(&self) -> bool {
        self.raw().is_empty()
    }

    /// Traverses the entries in storage order, starting from the first one
    /// on every call.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            acl: self,
            generation: self.generation(),
            pending: None,
            finished: false,
        }
    }

    /// Appends an entry with an undefined tag, no qualifier and no
    /// permissions.
    ///
    /// Creation may reallocate the entry storage, so every entry reference
    /// obtained before this call becomes stale. The returned reference is the
    /// only live one until the ACL is enumerated again.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Allocation`] when the storage cannot grow.
    pub fn create_entry(&self) -> Result<Entry<'_>> {
        let raw = self
            .raw_mut()
            .create_entry()
            .map_err(|error| AclError::storage("create entry", error))?;
        let generation = self.advance_generation();
        trace!(target: "acl::container", entries = self.len(), generation, "created entry");
        Ok(Entry::new(self, generation, raw))
    }

    /// Removes `entry` from the ACL.
    ///
    /// Every other outstanding reference becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::InvalidArgument`] when `entry` belongs to another
    /// ACL, [`AclError::StaleReference`] when it no longer resolves, and
    /// [`AclError::Os`] when the removal itself fails.
    pub fn delete_entry(&self, entry: Entry<'_>) -> Result<()> {
        if !ptr::eq(entry.acl(), self) {
            return Err(AclError::invalid_argument(
                "entry belongs to a different ACL",
            ));
        }
        let raw = entry.resolve()?;
        self.raw_mut()
            .delete_entry(raw)
            .map_err(|error| AclError::os("delete entry", error))?;
        let generation = self.advance_generation();
        trace!(target: "acl::container", entries = self.len(), generation, "deleted entry");
        Ok(())
    }

    /// Sets the mask entry to the union of the group class permissions,
    /// creating a mask when none exists.
    ///
    /// Creating a mask counts as creating an entry and makes existing
    /// references stale.
    pub fn calc_mask(&self) -> Result<()> {
        let created = self
            .raw_mut()
            .calc_mask()
            .map_err(|error| AclError::storage("calculate mask", error))?;
        if created {
            let generation = self.advance_generation();
            trace!(target: "acl::container", generation, "created mask entry");
        }
        Ok(())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub(crate) fn raw(&self) -> Ref<'_, RawAcl> {
        self.storage.borrow()
    }

    pub(crate) fn raw_mut(&self) -> RefMut<'_, RawAcl> {
        self.storage.borrow_mut()
    }

    fn advance_generation(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }
}

impl fmt::Debug for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Acl");
        debug.field("generation", &self.generation.get());
        match self.storage.try_borrow() {
            Ok(raw) => {
                debug.field("entries", &raw.len());
            }
            Err(_) => {
                debug.field("entries", &"<borrowed>");
            }
        }
        debug.finish()
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_text().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Acl {
    type Err = AclError;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_text(text)
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = Result<Entry<'a>>;
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Entries<'a> {
        self.entries()
    }
}

/// Iterator over the entries of an [`Acl`], created by [`Acl::entries`].
///
/// The entry list is captured on the first call to `next`, so retagging an
/// entry mid-traversal neither repeats nor skips entries. If the ACL gains
/// or loses an entry mid-traversal the iterator yields one
/// [`AclError::StaleReference`] and then ends.
#[derive(Debug)]
pub struct Entries<'a> {
    acl: &'a Acl,
    generation: u64,
    pending: Option<vec::IntoIter<RawEntry>>,
    finished: bool,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.acl.generation() != self.generation {
            self.finished = true;
            return Some(Err(AclError::StaleReference));
        }
        if self.pending.is_none() {
            match self.acl.raw().entries() {
                Ok(handles) => self.pending = Some(handles.into_iter()),
                Err(error) => {
                    self.finished = true;
                    return Some(Err(AclError::os("get entry", error)));
                }
            }
        }

        match self.pending.as_mut().and_then(Iterator::next) {
            Some(raw) => Some(Ok(Entry::new(self.acl, self.generation, raw))),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl FusedIterator for Entries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Permset, TagType};

    const MINIMAL: &str = "user::rw-\ngroup::r--\nother::r--\n";

    fn collect(acl: &Acl) -> Vec<Entry<'_>> {
        acl.entries()
            .collect::<Result<Vec<_>>>()
            .expect("enumerate entries")
    }

    fn tags(acl: &Acl) -> Vec<TagType> {
        collect(acl)
            .iter()
            .map(|entry| entry.tag_type().expect("tag"))
            .collect()
    }

    #[test]
    fn acl_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Acl>();
    }

    #[test]
    fn new_acl_is_empty_and_invalid() {
        let acl = Acl::new().expect("new");
        assert!(acl.is_empty());
        assert!(!acl.is_valid());
        assert_eq!(acl.to_text().expect("text"), "");
    }

    #[test]
    fn impossible_capacity_is_rejected_up_front() {
        assert!(matches!(
            Acl::with_capacity(usize::MAX),
            Err(AclError::InvalidArgument(_))
        ));
    }

    #[test]
    fn duplicate_does_not_alias_source() {
        let source = Acl::from_text(MINIMAL).expect("parse");
        let copy = Acl::duplicate(&source).expect("duplicate");
        assert_eq!(copy.to_text().expect("text"), source.to_text().expect("text"));

        let first = source.entries().next().expect("entry").expect("live");
        first.set_permset(Permset::EMPTY).expect("set perms");
        assert_eq!(copy.to_text().expect("text"), MINIMAL);
        assert_ne!(source.to_text().expect("text"), MINIMAL);
    }

    #[test]
    fn parse_error_reports_line() {
        let err = Acl::from_text("user::rw-\nuser:::\n").unwrap_err();
        assert!(matches!(err, AclError::Parse { line: Some(2) }));
    }

    #[test]
    fn entries_follow_storage_order_and_restart() {
        let acl: Acl = "user::rw-,group::r--,other::r--".parse().expect("parse");
        let expected = vec![TagType::UserObj, TagType::GroupObj, TagType::Other];
        assert_eq!(tags(&acl), expected);
        assert_eq!(tags(&acl), expected);
    }

    #[test]
    fn retagging_keeps_the_reference_on_its_entry() {
        let acl = Acl::from_text(MINIMAL).expect("parse");
        let entry = acl.create_entry().expect("create");
        entry.set_tag_type(TagType::User).expect("tag");
        entry.set_qualifier(54321).expect("qualifier");
        entry.set_permset(Permset::READ).expect("perms");

        assert_eq!(entry.tag_type().expect("tag"), TagType::User);
        assert_eq!(entry.qualifier().expect("qualifier"), Some(54321));
        assert_eq!(tags(&acl).iter().filter(|tag| **tag == TagType::User).count(), 1);
    }

    #[test]
    fn traversal_stops_with_stale_error_after_mutation() {
        let acl = Acl::from_text(MINIMAL).expect("parse");
        let mut entries = acl.entries();
        assert!(entries.next().expect("first").is_ok());

        acl.create_entry().expect("create");

        assert!(matches!(entries.next(), Some(Err(AclError::StaleReference))));
        assert!(entries.next().is_none());
    }

    #[test]
    fn create_entry_invalidates_previous_references() {
        let acl = Acl::from_text(MINIMAL).expect("parse");
        let before = collect(&acl);

        let created = acl.create_entry().expect("create");
        created.set_tag_type(TagType::Mask).expect("live entry");

        for entry in &before {
            assert!(matches!(entry.tag_type(), Err(AclError::StaleReference)));
            assert!(matches!(
                entry.set_permset(Permset::ALL),
                Err(AclError::StaleReference)
            ));
        }
    }

    #[test]
    fn create_then_delete_restores_count() {
        let acl = Acl::from_text(MINIMAL).expect("parse");
        let count = acl.len();

        let entry = acl.create_entry().expect("create");
        assert_eq!(acl.len(), count + 1);
        acl.delete_entry(entry).expect("delete");

        assert_eq!(acl.len(), count);
        assert_eq!(acl.to_text().expect("text"), MINIMAL);
    }

    #[test]
    fn delete_rejects_foreign_and_stale_entries() {
        let acl = Acl::from_text(MINIMAL).expect("parse");
        let other = Acl::from_text(MINIMAL).expect("parse");

        let foreign = other.entries().next().expect("entry").expect("live");
        assert!(matches!(
            acl.delete_entry(foreign),
            Err(AclError::InvalidArgument(_))
        ));

        let entries = collect(&acl);
        acl.delete_entry(entries[0]).expect("delete first");
        assert!(matches!(
            acl.delete_entry(entries[1]),
            Err(AclError::StaleReference)
        ));
        assert_eq!(acl.len(), 2);
    }

    #[test]
    fn validity_is_stable_without_mutation() {
        let acl = Acl::from_text("user::rw-,user:54321:r--,group::r--,other::---").expect("parse");
        assert_eq!(acl.is_valid(), acl.is_valid());
        assert!(!acl.is_valid());
        assert!(matches!(
            acl.validate(),
            Err(AclError::Invalid(aclkit_sys::ValidityError::MissingEntry))
        ));

        acl.calc_mask().expect("calc mask");
        assert!(acl.is_valid());
        assert!(acl.validate().is_ok());
        assert_eq!(acl.is_valid(), acl.is_valid());
    }

    #[test]
    fn calc_mask_stales_references_only_when_it_creates() {
        let acl = Acl::from_text("user::rw-,group::r--,mask::---,other::---").expect("parse");
        let entries = collect(&acl);
        acl.calc_mask().expect("calc mask");
        assert!(entries[0].tag_type().is_ok());
        let mask = entries
            .iter()
            .find(|entry| entry.tag_type().expect("tag") == TagType::Mask)
            .expect("mask entry");
        assert_eq!(mask.permset().expect("mask perms"), Permset::READ);

        let plain = Acl::from_mode(0o644).expect("from mode");
        let entries = collect(&plain);
        plain.calc_mask().expect("calc mask");
        assert!(matches!(entries[0].tag_type(), Err(AclError::StaleReference)));
        assert_eq!(plain.len(), 4);
    }

    #[test]
    fn to_text_round_trip_stabilises() {
        let acl = Acl::from_text("u::rwx,g::r--,g:54322:rw-,m::rw-,o::r--").expect("parse");
        let first = acl.to_text().expect("text");
        let second = Acl::from_text(&first)
            .expect("reparse")
            .to_text()
            .expect("text");
        assert_eq!(first, second);
        assert_eq!(acl.to_string(), first);
    }

    #[test]
    fn default_options_render_like_to_text() {
        let acl = Acl::from_text("user::rw-\nuser:54321:rwx\ngroup::r--\nmask::r--\nother::---\n")
            .expect("parse");
        assert_eq!(
            acl.to_text_with(&TextOptions::default()).expect("text"),
            acl.to_text().expect("text")
        );
    }

    #[test]
    fn to_text_with_applies_options() {
        let acl = Acl::from_mode(0o750).expect("from mode");
        let text = acl
            .to_text_with(
                &TextOptions::new()
                    .abbreviate(true)
                    .separator(',')
                    .with_prefix(crate::DEFAULT_ACL_PREFIX),
            )
            .expect("text");
        assert_eq!(text, "default:u::rwx,default:g::r-x,default:o::---");
    }

    #[test]
    fn debug_lists_entries() {
        let acl = Acl::from_mode(0o600).expect("from mode");
        let debug = format!("{acl:?}");
        assert!(debug.contains("generation"));
        assert!(debug.contains("entries: 3"));
    }
}
