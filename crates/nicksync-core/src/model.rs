//! Member and identity data.

use std::fmt;

/// Tag used in place of an affiliation tag for members with no identity record.
pub const PLACEHOLDER_TAG: &str = "-----";

/// Stable platform-assigned identity of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the community (guild) a member snapshot was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommunityId(pub u64);

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a community member as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Stable identity
    pub id: MemberId,

    /// Community the snapshot belongs to (renames are scoped to it)
    pub community: CommunityId,

    /// Account handle, used for logging and for the fallback name
    pub handle: String,

    /// Current display name; `None` when the platform shows the bare handle
    pub display_name: Option<String>,
}

impl Member {
    /// Create a member snapshot.
    pub fn new(
        id: MemberId,
        community: CommunityId,
        handle: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            id,
            community,
            handle: handle.into(),
            display_name,
        }
    }

    /// Whether the current display name is exactly `name` (case-sensitive).
    pub fn is_displayed_as(&self, name: &str) -> bool {
        self.display_name.as_deref() == Some(name)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.handle, self.id)
    }
}

/// Registered identity data for a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Short organisation code, e.g. a corporation ticker
    pub tag: String,

    /// Registered real name
    pub real_name: String,
}

impl IdentityRecord {
    pub fn new(tag: impl Into<String>, real_name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            real_name: real_name.into(),
        }
    }
}

/// The name a member ought to be displayed as.
///
/// `[TAG] Real Name` for registered members, `[-----] handle` otherwise.
pub fn desired_name(record: Option<&IdentityRecord>, handle: &str) -> String {
    match record {
        Some(record) => format!("[{}] {}", record.tag, record.real_name),
        None => format!("[{}] {}", PLACEHOLDER_TAG, handle),
    }
}
