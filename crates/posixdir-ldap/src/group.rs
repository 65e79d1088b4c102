//! Group record and request types.

use crate::session::LdapEntry;
use serde::{Deserialize, Serialize};

/// POSIX group fields of a group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Numeric group id.
    pub gid: String,
    /// Member usernames, verbatim from the directory. The engine neither
    /// deduplicates nor resolves them against user entries.
    pub members: Vec<String>,
}

impl GroupRecord {
    /// Builds a record from a directory entry; absent attributes map to
    /// empty values.
    #[must_use]
    pub fn from_entry(entry: &LdapEntry) -> Self {
        Self {
            gid: entry.first_or_empty("gidNumber").to_string(),
            members: entry.values("memberUid").to_vec(),
        }
    }

    /// Returns the number of members in the group.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Field replacements for an existing group; unset fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub(crate) new_name: Option<String>,
    pub(crate) gid: Option<String>,
}

impl GroupChanges {
    /// Starts an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a rename. Renames are not supported and are rejected
    /// explicitly rather than silently ignored.
    #[must_use]
    pub fn with_new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    /// Replaces the numeric group id (validated before use).
    #[must_use]
    pub fn with_gid(mut self, gid: impl Into<String>) -> Self {
        self.gid = Some(gid.into());
        self
    }
}
