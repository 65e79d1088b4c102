//! Directory administration engine for POSIX users and groups.
//!
//! This crate provides strongly-typed managers for administering POSIX
//! accounts and groups in an LDAP directory: CRUD on both entry kinds,
//! numeric identifier allocation and validation, companion primary-group
//! lifecycle, and credential operations (bind verification and the
//! password-modify extended operation).

#![deny(missing_docs)]

mod client;
mod config;
mod dn;
mod group;
mod groups;
mod ids;
mod session;
mod user;
mod users;

#[cfg(test)]
mod testutil;

pub use client::DirectoryClient;
pub use config::{
    DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_PASSWORD, DEFAULT_PORT,
    DEFAULT_SHADOW_MAX, DEFAULT_SHADOW_WARNING, DEFAULT_SHELL,
};
pub use dn::{DistinguishedName, DnError, Rdn};
pub use group::{GroupChanges, GroupRecord};
pub use groups::GroupManager;
pub use ids::{IdSpace, ID_CEILING, ID_FLOOR};
pub use session::{DirectoryModification, DirectorySession, LdapEntry};
pub use user::{AddUserOutcome, DeleteUserOutcome, NewUser, UserChanges, UserRecord};
pub use users::UserManager;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = posixdir_core::Result<T>;

/// Trims an optional field, treating blank values as unset.
pub(crate) fn normalized(value: Option<&str>) -> Option<&str> {
    match value {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        None => None,
    }
}
