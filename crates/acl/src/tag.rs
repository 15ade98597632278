//! Entry tag types.

use std::fmt;

use crate::error::AclError;
use crate::consts;

/// Principal class an entry applies to.
///
/// Discriminants equal the `<sys/acl.h>` values, so `tag as u32` yields an
/// integer other ACL tools understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TagType {
    /// A created entry that has not been assigned a principal yet.
    Undefined = consts::ACL_UNDEFINED_TAG,
    /// The owning user.
    UserObj = consts::ACL_USER_OBJ,
    /// A named user, qualified by uid.
    User = consts::ACL_USER,
    /// The owning group.
    GroupObj = consts::ACL_GROUP_OBJ,
    /// A named group, qualified by gid.
    Group = consts::ACL_GROUP,
    /// Upper bound on the group class permissions.
    Mask = consts::ACL_MASK,
    /// Everybody else.
    Other = consts::ACL_OTHER,
}

impl TagType {
    /// Returns the raw `<sys/acl.h>` value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Returns `true` for [`TagType::User`] and [`TagType::Group`], the tags
    /// whose entries carry a qualifier.
    #[must_use]
    pub const fn has_qualifier(self) -> bool {
        matches!(self, Self::User | Self::Group)
    }
}

impl TryFrom<u32> for TagType {
    type Error = AclError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            consts::ACL_UNDEFINED_TAG => Ok(Self::Undefined),
            consts::ACL_USER_OBJ => Ok(Self::UserObj),
            consts::ACL_USER => Ok(Self::User),
            consts::ACL_GROUP_OBJ => Ok(Self::GroupObj),
            consts::ACL_GROUP => Ok(Self::Group),
            consts::ACL_MASK => Ok(Self::Mask),
            consts::ACL_OTHER => Ok(Self::Other),
            _ => Err(AclError::invalid_argument(format!(
                "unknown ACL tag type {value:#x}"
            ))),
        }
    }
}

impl From<TagType> for u32 {
    fn from(tag: TagType) -> Self {
        tag.as_raw()
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undefined => "undefined",
            Self::UserObj => "user_obj",
            Self::User => "user",
            Self::GroupObj => "group_obj",
            Self::Group => "group",
            Self::Mask => "mask",
            Self::Other => "other",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_sys_acl_header() {
        assert_eq!(TagType::Undefined as u32, 0x00);
        assert_eq!(TagType::UserObj as u32, 0x01);
        assert_eq!(TagType::User as u32, 0x02);
        assert_eq!(TagType::GroupObj as u32, 0x04);
        assert_eq!(TagType::Group as u32, 0x08);
        assert_eq!(TagType::Mask as u32, 0x10);
        assert_eq!(TagType::Other as u32, 0x20);
    }

    #[test]
    fn raw_values_convert_back() {
        for tag in [TagType::UserObj, TagType::Group, TagType::Other] {
            assert_eq!(TagType::try_from(u32::from(tag)).expect("known tag"), tag);
        }
        assert!(matches!(
            TagType::try_from(0x40),
            Err(AclError::InvalidArgument(_))
        ));
    }

    #[test]
    fn only_named_tags_have_qualifiers() {
        assert!(TagType::User.has_qualifier());
        assert!(TagType::Group.has_qualifier());
        assert!(!TagType::UserObj.has_qualifier());
        assert!(!TagType::Mask.has_qualifier());
    }
}
