//! User management operations.

use crate::config::DirectoryConfig;
use crate::groups;
use crate::ids::{self, IdSpace};
use crate::normalized;
use crate::session::{escape_filter_value, DirectoryModification, DirectorySession, LdapEntry};
use crate::user::{AddUserOutcome, DeleteUserOutcome, NewUser, UserChanges, UserRecord};
use crate::Result;
use posixdir_core::Error;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

const USER_LIST_FILTER: &str = "(objectClass=posixAccount)";
const USER_OBJECT_CLASSES: &[&str] = &["inetOrgPerson", "posixAccount", "top", "shadowAccount"];

/// CRUD and credential operations on POSIX user entries.
///
/// Shares one [`DirectorySession`] with the group manager; each operation
/// holds the session lock for its whole duration, which serializes the
/// identifier scan-then-add sequence within the process.
#[derive(Clone)]
pub struct UserManager {
    session: Arc<Mutex<DirectorySession>>,
    config: Arc<DirectoryConfig>,
}

impl UserManager {
    /// Creates a user manager over the shared session.
    #[must_use]
    pub fn new(session: Arc<Mutex<DirectorySession>>, config: Arc<DirectoryConfig>) -> Self {
        Self { session, config }
    }

    /// Lists all POSIX accounts keyed by username.
    ///
    /// An empty directory yields an empty map, not an error.
    ///
    /// # Errors
    ///
    /// Returns the session error when the listing fails.
    pub async fn get_all_users(&self) -> Result<HashMap<String, UserRecord>> {
        let mut session = self.session.lock().await;
        let entries = session
            .search(self.config.base_dn().as_str(), USER_LIST_FILTER, &[])
            .await?;

        let mut users = HashMap::new();
        for entry in entries {
            let name = entry.first_or_empty("uid").to_string();
            users.insert(name, UserRecord::from_entry(&entry));
        }
        Ok(users)
    }

    /// Returns the raw entries matching the username exactly.
    ///
    /// Zero matches is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is blank.
    pub async fn get_user(&self, name: &str) -> Result<Vec<LdapEntry>> {
        if name.trim().is_empty() {
            return Err(Error::Validation(
                "user name can not be empty when getting a user".to_string(),
            ));
        }

        let filter = format!(
            "(&(uid={})(objectClass=posixAccount))",
            escape_filter_value(name.trim())
        );
        let mut session = self.session.lock().await;
        session
            .search(self.config.base_dn().as_str(), &filter, &[])
            .await
    }

    /// Creates a user entry together with a same-named companion group.
    ///
    /// Unset fields fall back to the configured defaults. The companion
    /// group is created best-effort with the resolved gid; its failure is
    /// reported in the outcome rather than aborting the user creation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank username or non-integer
    /// shadow fields, identifier errors for an invalid explicit uid, and
    /// the protocol error when the user add itself fails.
    pub async fn add_user(&self, request: &NewUser) -> Result<AddUserOutcome> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "user name can not be empty when adding a user".to_string(),
            ));
        }

        let mut session = self.session.lock().await;

        let uid = match normalized(request.uid.as_deref()) {
            Some(uid) => {
                ids::verify_id(&mut session, &self.config, IdSpace::User, uid).await?;
                uid.to_string()
            }
            None => ids::next_id(&mut session, &self.config, IdSpace::User).await?,
        };

        // An explicit gid is not validated here; the companion group
        // creation below runs it through the group-space validator.
        let gid = match normalized(request.gid.as_deref()) {
            Some(gid) => gid.to_string(),
            None => ids::next_id(&mut session, &self.config, IdSpace::Group).await?,
        };

        let password = normalized(request.password.as_deref())
            .unwrap_or(self.config.default_password())
            .to_string();
        let shell = normalized(request.shell.as_deref())
            .unwrap_or(self.config.default_shell())
            .to_string();
        let home = normalized(request.home.as_deref())
            .map_or_else(|| format!("/home/{name}"), str::to_string);
        let shadow_max = resolve_shadow_field(
            normalized(request.shadow_max.as_deref()),
            self.config.default_shadow_max(),
            "shadowMax",
        )?;
        let shadow_warning = resolve_shadow_field(
            normalized(request.shadow_warning.as_deref()),
            self.config.default_shadow_warning(),
            "shadowWarning",
        )?;
        let mail = format!("{name}@{}", self.config.mail_domain());

        let companion_group_error =
            match groups::create_group_entry(&mut session, &self.config, name, Some(&gid)).await {
                Ok(_) => None,
                Err(err) => {
                    warn!(user = name, error = %err, "companion group creation failed");
                    Some(err)
                }
            };

        let attributes = vec![
            ("cn".to_string(), vec![name.to_string()]),
            ("sn".to_string(), vec![name.to_string()]),
            (
                "objectClass".to_string(),
                USER_OBJECT_CLASSES.iter().map(|oc| (*oc).to_string()).collect(),
            ),
            ("shadowMax".to_string(), vec![shadow_max]),
            ("shadowWarning".to_string(), vec![shadow_warning]),
            ("loginShell".to_string(), vec![shell]),
            ("uidNumber".to_string(), vec![uid.clone()]),
            ("gidNumber".to_string(), vec![gid]),
            ("userPassword".to_string(), vec![password]),
            ("homeDirectory".to_string(), vec![home]),
            ("mail".to_string(), vec![mail]),
        ];

        session
            .add(self.config.user_dn(name).as_str(), attributes)
            .await?;

        Ok(AddUserOutcome {
            uid,
            companion_group_error,
        })
    }

    /// Deletes a user entry and, best-effort, its same-named companion
    /// group.
    ///
    /// The companion group is removed without the non-empty guard; its
    /// failure is reported in the outcome rather than aborting the user
    /// deletion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank username and the protocol
    /// error when the user delete itself fails.
    pub async fn delete_user(&self, name: &str) -> Result<DeleteUserOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "user name can not be empty when deleting a user".to_string(),
            ));
        }

        let mut session = self.session.lock().await;

        let companion_group_error =
            match groups::delete_group_entry(&mut session, &self.config, name).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(user = name, error = %err, "companion group deletion failed");
                    Some(err)
                }
            };

        session.delete(self.config.user_dn(name).as_str()).await?;

        Ok(DeleteUserOutcome {
            companion_group_error,
        })
    }

    /// Applies changes to a user entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is blank or no change is
    /// requested, identifier errors for invalid uid/gid replacements, and
    /// the protocol error when the modify fails.
    pub async fn modify_user(&self, name: &str, changes: &UserChanges) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::Validation(
                "user name can not be empty when modifying a user".to_string(),
            ));
        }

        let uid = normalized(changes.uid.as_deref());
        let gid = normalized(changes.gid.as_deref());
        let home = normalized(changes.home.as_deref());
        let shell = normalized(changes.shell.as_deref());
        if uid.is_none() && gid.is_none() && home.is_none() && shell.is_none() {
            return Err(Error::Validation(
                "at least one change must be provided".to_string(),
            ));
        }

        let mut session = self.session.lock().await;
        let mut modifications = Vec::new();

        if let Some(uid) = uid {
            ids::verify_id(&mut session, &self.config, IdSpace::User, uid).await?;
            modifications.push(DirectoryModification::replace("uidNumber", uid));
        }
        if let Some(gid) = gid {
            ids::verify_id(&mut session, &self.config, IdSpace::Group, gid).await?;
            modifications.push(DirectoryModification::replace("gidNumber", gid));
        }
        if let Some(home) = home {
            modifications.push(DirectoryModification::replace("homeDirectory", home));
        }
        if let Some(shell) = shell {
            modifications.push(DirectoryModification::replace("loginShell", shell));
        }

        session
            .modify(self.config.user_dn(name.trim()).as_str(), &modifications)
            .await
    }

    /// Verifies a user's credentials by binding as their directory
    /// identity on a fresh connection, which is always released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] when the bind is rejected and
    /// [`Error::Connection`] when no server is reachable.
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<()> {
        let session = self.session.lock().await;
        session
            .verify_credentials(self.config.user_dn(name.trim()).as_str(), password)
            .await
    }

    /// Rotates a user's password through the password-modify extended
    /// operation.
    ///
    /// Unless `force` is set, the old password is first verified with a
    /// bind probe. When forced, the old password is passed through
    /// unchecked (it may be empty or stale); the directory decides
    /// acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] when the old-password probe fails and
    /// the protocol error when the extended operation is rejected.
    pub async fn change_password(
        &self,
        name: &str,
        old_password: &str,
        new_password: &str,
        force: bool,
    ) -> Result<()> {
        if !force {
            self.authenticate(name, old_password)
                .await
                .map_err(|_| Error::Credential("old password error".to_string()))?;
        }

        let mut session = self.session.lock().await;
        session
            .change_password(
                self.config.user_dn(name.trim()).as_str(),
                old_password,
                new_password,
            )
            .await
    }
}

fn resolve_shadow_field(value: Option<&str>, default: &str, field: &str) -> Result<String> {
    match value {
        Some(value) => {
            value.parse::<i64>().map_err(|_| {
                Error::Validation(format!("{field} `{value}` is not an integer"))
            })?;
            Ok(value.to_string())
        }
        None => Ok(default.to_string()),
    }
}
