//! Entry permission sets.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::consts;
use crate::error::AclError;

/// Read, write and execute bits of one entry.
///
/// The wrapped value is always a subset of `READ | WRITE | EXECUTE`; raw
/// integers with other bits are rejected by [`Permset::try_from`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permset(u32);

impl Permset {
    /// No permissions.
    pub const EMPTY: Self = Self(0);
    /// Execute (search for directories).
    pub const EXECUTE: Self = Self(consts::ACL_EXECUTE);
    /// Write.
    pub const WRITE: Self = Self(consts::ACL_WRITE);
    /// Read.
    pub const READ: Self = Self(consts::ACL_READ);
    /// Read, write and execute.
    pub const ALL: Self = Self(consts::ACL_READ | consts::ACL_WRITE | consts::ACL_EXECUTE);

    /// Returns the set for `bits`, or `None` when bits outside `rwx` are set.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when every bit of `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when no permission is granted.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u32> for Permset {
    type Error = AclError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::from_bits(bits).ok_or_else(|| {
            AclError::invalid_argument(format!(
                "permission bits {bits:#x} outside read/write/execute"
            ))
        })
    }
}

impl From<Permset> for u32 {
    fn from(perms: Permset) -> Self {
        perms.0
    }
}

impl BitOr for Permset {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permset {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permset {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Renders the `rwx` form used in ACL text, e.g. `r-x`.
impl fmt::Display for Permset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |perm: Self, ch: char| if self.contains(perm) { ch } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::READ, 'r'),
            flag(Self::WRITE, 'w'),
            flag(Self::EXECUTE, 'x')
        )
    }
}
