//! User record and request types.

use crate::session::LdapEntry;
use posixdir_core::Error;
use serde::{Deserialize, Serialize};

/// POSIX account fields of a user entry, in `passwd(5)` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Password hash or placeholder as stored in the directory.
    pub password: String,
    /// Numeric user id.
    pub uid: String,
    /// Numeric primary group id.
    pub gid: String,
    /// Display field; unused and kept empty.
    pub gecos: String,
    /// Home directory path.
    pub home: String,
    /// Login shell path.
    pub shell: String,
}

impl UserRecord {
    /// Builds a record from a directory entry; absent attributes map to
    /// empty strings.
    #[must_use]
    pub fn from_entry(entry: &LdapEntry) -> Self {
        Self {
            password: entry.first_or_empty("userPassword").to_string(),
            uid: entry.first_or_empty("uidNumber").to_string(),
            gid: entry.first_or_empty("gidNumber").to_string(),
            gecos: String::new(),
            home: entry.first_or_empty("homeDirectory").to_string(),
            shell: entry.first_or_empty("loginShell").to_string(),
        }
    }
}

/// Request to create a user.
///
/// Unset (or blank) fields fall back to the configured defaults; the uid
/// and gid are allocated from their identifier spaces when absent.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub(crate) name: String,
    pub(crate) uid: Option<String>,
    pub(crate) gid: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) shell: Option<String>,
    pub(crate) home: Option<String>,
    pub(crate) shadow_max: Option<String>,
    pub(crate) shadow_warning: Option<String>,
}

impl NewUser {
    /// Starts a request for the given username.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Requests a specific numeric user id (validated before use).
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Requests a specific primary group id.
    #[must_use]
    pub fn with_gid(mut self, gid: impl Into<String>) -> Self {
        self.gid = Some(gid.into());
        self
    }

    /// Sets the initial password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the login shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Sets the home directory.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Sets the password max age in days.
    #[must_use]
    pub fn with_shadow_max(mut self, shadow_max: impl Into<String>) -> Self {
        self.shadow_max = Some(shadow_max.into());
        self
    }

    /// Sets the password expiry warning period in days.
    #[must_use]
    pub fn with_shadow_warning(mut self, shadow_warning: impl Into<String>) -> Self {
        self.shadow_warning = Some(shadow_warning.into());
        self
    }
}

/// Field replacements for an existing user; unset fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub(crate) uid: Option<String>,
    pub(crate) gid: Option<String>,
    pub(crate) home: Option<String>,
    pub(crate) shell: Option<String>,
}

impl UserChanges {
    /// Starts an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the numeric user id (validated before use).
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Replaces the primary group id (validated before use).
    #[must_use]
    pub fn with_gid(mut self, gid: impl Into<String>) -> Self {
        self.gid = Some(gid.into());
        self
    }

    /// Replaces the home directory.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Replaces the login shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }
}

/// Result of a user creation.
///
/// The companion primary group is created best-effort: its failure does
/// not abort the user creation, but is reported here instead of being
/// swallowed, so callers can decide whether to compensate.
#[derive(Debug)]
pub struct AddUserOutcome {
    /// The resolved numeric user id.
    pub uid: String,
    /// Error from the companion group creation, if it failed.
    pub companion_group_error: Option<Error>,
}

/// Result of a user deletion.
#[derive(Debug)]
pub struct DeleteUserOutcome {
    /// Error from the companion group deletion, if it failed.
    pub companion_group_error: Option<Error>,
}
