//! Rendering options for ACL text.

use std::io;

use aclkit_sys::{
    RawAcl, TEXT_ABBREVIATE, TEXT_ALL_EFFECTIVE, TEXT_NUMERIC_IDS, TEXT_SMART_INDENT,
    TEXT_SOME_EFFECTIVE,
};

/// Number of entries [`Acl::new`](crate::Acl::new) reserves room for.
pub const DEFAULT_CAPACITY: usize = 10;

/// Prefix conventionally written before default ACL entries.
pub const DEFAULT_ACL_PREFIX: &str = "default:";

/// When to annotate group class entries with `#effective:` rights.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum EffectiveRights {
    /// Never.
    Hidden,
    /// Where the mask removes permissions the entry grants.
    #[default]
    WhenMasked,
    /// On every entry the mask applies to.
    Always,
}

/// Options that control how an ACL is rendered as text.
///
/// The defaults produce the form returned by
/// [`Acl::to_text`](crate::Acl::to_text): long tag names, user and group
/// names where the system databases know the id, effective rights where
/// the mask restricts an entry, one newline-terminated entry per line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextOptions {
    abbreviate: bool,
    numeric_ids: bool,
    effective: EffectiveRights,
    smart_indent: bool,
    separator: char,
    prefix: &'static str,
}

impl TextOptions {
    /// Creates a new [`TextOptions`] value with the canonical defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            abbreviate: false,
            numeric_ids: false,
            effective: EffectiveRights::WhenMasked,
            smart_indent: false,
            separator: '\n',
            prefix: "",
        }
    }

    /// Writes `u`, `g`, `m` and `o` instead of the full tag names.
    #[must_use]
    pub const fn abbreviate(mut self, abbreviate: bool) -> Self {
        self.abbreviate = abbreviate;
        self
    }

    /// Writes qualifiers as numeric ids instead of user and group names.
    #[must_use]
    #[doc(alias = "--numeric")]
    pub const fn numeric_ids(mut self, numeric: bool) -> Self {
        self.numeric_ids = numeric;
        self
    }

    /// Chooses where `#effective:` comments appear.
    #[must_use]
    pub const fn effective_rights(mut self, effective: EffectiveRights) -> Self {
        self.effective = effective;
        self
    }

    /// Aligns effective-rights comments in a column.
    #[must_use]
    pub const fn smart_indent(mut self, indent: bool) -> Self {
        self.smart_indent = indent;
        self
    }

    /// Separates entries with `separator`, which must be ASCII. Any
    /// separator other than a newline is only written between entries.
    #[must_use]
    pub const fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Writes `prefix` before every entry, typically [`DEFAULT_ACL_PREFIX`].
    #[must_use]
    pub const fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    /// Reports whether tag names are abbreviated.
    #[must_use]
    pub const fn abbreviated(&self) -> bool {
        self.abbreviate
    }

    /// Reports whether qualifiers stay numeric.
    #[must_use]
    pub const fn uses_numeric_ids(&self) -> bool {
        self.numeric_ids
    }

    pub(crate) const fn flags(&self) -> i32 {
        let mut flags = match self.effective {
            EffectiveRights::Hidden => 0,
            EffectiveRights::WhenMasked => TEXT_SOME_EFFECTIVE,
            EffectiveRights::Always => TEXT_ALL_EFFECTIVE,
        };
        if self.smart_indent {
            flags |= TEXT_SMART_INDENT;
        }
        if self.numeric_ids {
            flags |= TEXT_NUMERIC_IDS;
        }
        if self.abbreviate {
            flags |= TEXT_ABBREVIATE;
        }
        flags
    }

    pub(crate) fn render(&self, raw: &RawAcl) -> io::Result<String> {
        let mut text = raw.to_any_text(self.prefix, self.separator, self.flags())?;
        if self.separator == '\n' && !text.is_empty() {
            text.push('\n');
        }
        Ok(text)
    }
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_acl_to_text() {
        let options = TextOptions::default();
        assert!(!options.abbreviated());
        assert!(!options.uses_numeric_ids());
        assert_eq!(options.flags(), TEXT_SOME_EFFECTIVE);
    }

    #[test]
    fn builder_methods_combine_flags() {
        let flags = TextOptions::new()
            .abbreviate(true)
            .numeric_ids(true)
            .effective_rights(EffectiveRights::Always)
            .smart_indent(true)
            .flags();
        assert_eq!(
            flags,
            TEXT_ABBREVIATE | TEXT_NUMERIC_IDS | TEXT_ALL_EFFECTIVE | TEXT_SMART_INDENT
        );

        let hidden = TextOptions::new().effective_rights(EffectiveRights::Hidden);
        assert_eq!(hidden.flags(), 0);
    }

    #[test]
    fn newline_separated_text_ends_with_newline() {
        let raw = RawAcl::from_mode(0o640).expect("from mode");
        let text = TextOptions::new().render(&raw).expect("render");
        assert_eq!(text, "user::rw-\ngroup::r--\nother::---\n");

        let empty = RawAcl::init(0).expect("init");
        assert_eq!(TextOptions::new().render(&empty).expect("render"), "");
    }
}
