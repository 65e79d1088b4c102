//! Group management operations.

use crate::config::DirectoryConfig;
use crate::group::{GroupChanges, GroupRecord};
use crate::ids::{self, IdSpace};
use crate::normalized;
use crate::session::{escape_filter_value, DirectoryModification, DirectorySession, LdapEntry};
use crate::Result;
use posixdir_core::Error;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const GROUP_LIST_FILTER: &str = "(objectClass=posixGroup)";
const GROUP_OBJECT_CLASSES: &[&str] = &["posixGroup", "top"];

/// CRUD operations on POSIX group entries.
///
/// Shares one [`DirectorySession`] with the user manager; each operation
/// holds the session lock for its whole duration.
#[derive(Clone)]
pub struct GroupManager {
    session: Arc<Mutex<DirectorySession>>,
    config: Arc<DirectoryConfig>,
}

impl GroupManager {
    /// Creates a group manager over the shared session.
    #[must_use]
    pub fn new(session: Arc<Mutex<DirectorySession>>, config: Arc<DirectoryConfig>) -> Self {
        Self { session, config }
    }

    /// Lists all POSIX groups keyed by group name.
    ///
    /// An empty directory yields an empty map, not an error.
    ///
    /// # Errors
    ///
    /// Returns the session error when the listing fails.
    pub async fn get_all_groups(&self) -> Result<HashMap<String, GroupRecord>> {
        let mut session = self.session.lock().await;
        let entries = session
            .search(self.config.base_dn().as_str(), GROUP_LIST_FILTER, &[])
            .await?;

        let mut groups = HashMap::new();
        for entry in entries {
            let name = entry.first_or_empty("cn").to_string();
            groups.insert(name, GroupRecord::from_entry(&entry));
        }
        Ok(groups)
    }

    /// Returns the raw entries matching the group name exactly.
    ///
    /// Zero matches is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is blank.
    pub async fn get_group(&self, name: &str) -> Result<Vec<LdapEntry>> {
        let mut session = self.session.lock().await;
        search_group(&mut session, &self.config, name).await
    }

    /// Creates a group, allocating a gid when none is supplied.
    ///
    /// Returns the resolved gid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is blank, identifier
    /// errors when a supplied gid is invalid, and the protocol error when
    /// the add fails.
    pub async fn add_group(&self, name: &str, gid: Option<&str>) -> Result<String> {
        let mut session = self.session.lock().await;
        create_group_entry(&mut session, &self.config, name, gid).await
    }

    /// Deletes a group, refusing while members remain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotEmpty`] when the member list is non-empty.
    pub async fn delete_group(&self, name: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        let members = group_members(&mut session, &self.config, name).await?;
        if !members.is_empty() {
            return Err(Error::GroupNotEmpty(format!(
                "group {name} not removed because it still has {} member(s)",
                members.len()
            )));
        }

        session
            .delete(self.config.group_entry_dn(name).as_str())
            .await
    }

    /// Applies changes to a group entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is blank or no change is
    /// requested, and [`Error::NotImplemented`] for a rename request.
    pub async fn modify_group(&self, name: &str, changes: &GroupChanges) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::Validation(
                "group name can not be empty when modifying a group".to_string(),
            ));
        }

        let new_name = normalized(changes.new_name.as_deref());
        let gid = normalized(changes.gid.as_deref());
        if new_name.is_none() && gid.is_none() {
            return Err(Error::Validation(
                "at least one change must be provided".to_string(),
            ));
        }

        if new_name.is_some() {
            return Err(Error::NotImplemented(
                "group rename is not supported".to_string(),
            ));
        }

        let mut session = self.session.lock().await;
        let mut modifications = Vec::new();
        if let Some(gid) = gid {
            ids::verify_id(&mut session, &self.config, IdSpace::Group, gid).await?;
            modifications.push(DirectoryModification::replace("gidNumber", gid));
        }

        session
            .modify(self.config.group_entry_dn(name).as_str(), &modifications)
            .await
    }

    /// Appends a member to the group.
    ///
    /// A blank username is a no-op. The target user is not checked for
    /// existence and duplicates are not detected.
    ///
    /// # Errors
    ///
    /// Returns the protocol error when the modification fails.
    pub async fn add_member(&self, name: &str, username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Ok(());
        }

        let mut session = self.session.lock().await;
        session
            .modify(
                self.config.group_entry_dn(name).as_str(),
                &[DirectoryModification::Add {
                    attribute: "memberUid".to_string(),
                    values: vec![username.to_string()],
                }],
            )
            .await
    }

    /// Removes a member from the group.
    ///
    /// A blank username is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the protocol error when the modification fails.
    pub async fn remove_member(&self, name: &str, username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Ok(());
        }

        let mut session = self.session.lock().await;
        session
            .modify(
                self.config.group_entry_dn(name).as_str(),
                &[DirectoryModification::Delete {
                    attribute: "memberUid".to_string(),
                    values: vec![username.to_string()],
                }],
            )
            .await
    }
}

/// Creates a group entry; shared with the user manager for companion
/// groups.
pub(crate) async fn create_group_entry(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    name: &str,
    gid: Option<&str>,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "group name can not be empty when adding a group".to_string(),
        ));
    }

    let gid = match gid.map(str::trim).filter(|gid| !gid.is_empty()) {
        Some(gid) => {
            ids::verify_id(session, config, IdSpace::Group, gid).await?;
            gid.to_string()
        }
        None => ids::next_id(session, config, IdSpace::Group).await?,
    };

    let attributes = vec![
        ("cn".to_string(), vec![name.to_string()]),
        (
            "objectClass".to_string(),
            GROUP_OBJECT_CLASSES.iter().map(|oc| (*oc).to_string()).collect(),
        ),
        ("gidNumber".to_string(), vec![gid.clone()]),
    ];

    session
        .add(config.group_entry_dn(name).as_str(), attributes)
        .await?;
    Ok(gid)
}

/// Deletes a group entry without the membership guard; shared with the
/// user manager for companion group removal.
pub(crate) async fn delete_group_entry(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    name: &str,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "group name can not be empty when deleting a group".to_string(),
        ));
    }

    session.delete(config.group_entry_dn(name).as_str()).await
}

async fn search_group(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    name: &str,
) -> Result<Vec<LdapEntry>> {
    if name.trim().is_empty() {
        return Err(Error::Validation(
            "group name can not be empty when getting a group".to_string(),
        ));
    }

    let filter = format!(
        "(&(cn={})(objectClass=posixGroup))",
        escape_filter_value(name.trim())
    );
    session
        .search(config.base_dn().as_str(), &filter, &[])
        .await
}

async fn group_members(
    session: &mut DirectorySession,
    config: &DirectoryConfig,
    name: &str,
) -> Result<Vec<String>> {
    let entries = search_group(session, config, name).await?;
    Ok(entries
        .first()
        .map(|entry| entry.values("memberUid").to_vec())
        .unwrap_or_default())
}
