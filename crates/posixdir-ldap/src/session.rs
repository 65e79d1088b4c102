//! Shared directory session.
//!
//! The session owns one lazily-established connection to the first
//! reachable candidate server, bound as the administrative identity. Every
//! primitive re-ensures the session first; a protocol failure discards the
//! cached connection so the next call reconnects. Failed operations are
//! never retried within the same call.

use crate::config::DirectoryConfig;
use crate::Result;
use async_trait::async_trait;
use ldap3::exop::PasswordModify;
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use posixdir_core::Error;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// LDAP entry representation used by the engine.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (value order preserved from the server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns the first value of the attribute, or `""` when absent.
    #[must_use]
    pub fn first_or_empty(&self, attribute: &str) -> &str {
        self.first(attribute).unwrap_or_default()
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A single modification applied to a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryModification {
    /// Add attribute values.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Delete attribute values.
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete (empty removes the attribute).
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values.
        values: Vec<String>,
    },
}

impl DirectoryModification {
    /// Replace helper for the common single-value case.
    #[must_use]
    pub fn replace(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Replace {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapHandle: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;
    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()>;
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
    async fn delete(&mut self, dn: &str) -> Result<()>;
    async fn password_modify(
        &mut self,
        dn: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn LdapHandle>>;
}

/// Shared administrative session over the directory.
///
/// One instance is meant to be wrapped in `Arc<tokio::sync::Mutex<_>>` and
/// shared between the user and group managers; each manager operation holds
/// the lock for its whole duration, so the scan-then-mutate sequences are
/// serialized within the process.
pub struct DirectorySession {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    handle: Option<Box<dyn LdapHandle>>,
}

impl DirectorySession {
    /// Creates a session that connects lazily using the real LDAP connector.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        let connector: Box<dyn LdapConnector> =
            Box::new(RealLdapConnector::new(config.connection_timeout()));
        Self {
            config,
            connector,
            handle: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_connector(
        config: Arc<DirectoryConfig>,
        connector: Box<dyn LdapConnector>,
    ) -> Self {
        Self {
            config,
            connector,
            handle: None,
        }
    }

    /// Searches the whole subtree under `base_dn`.
    ///
    /// A protocol failure discards the cached connection and surfaces as
    /// [`Error::Search`]; the next primitive reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] / [`Error::Auth`] when the session
    /// cannot be established, [`Error::Search`] on protocol failure.
    pub async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        self.ensure_session().await?;
        let result = match self.handle.as_mut() {
            Some(handle) => handle.search(base_dn, filter, attributes).await,
            None => return Err(Error::Connection("session not established".to_string())),
        };
        match result {
            Ok(entries) => Ok(entries),
            Err(err) => {
                self.invalidate().await;
                Err(Error::Search(err.to_string()))
            }
        }
    }

    /// Adds an entry with the given attribute set.
    ///
    /// # Errors
    ///
    /// Propagates the underlying protocol error; the cached connection is
    /// discarded on failure.
    pub async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()> {
        self.ensure_session().await?;
        let result = match self.handle.as_mut() {
            Some(handle) => handle.add(dn, attributes).await,
            None => return Err(Error::Connection("session not established".to_string())),
        };
        self.settle(result).await
    }

    /// Applies modifications to the entry at `dn`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying protocol error; the cached connection is
    /// discarded on failure.
    pub async fn modify(
        &mut self,
        dn: &str,
        modifications: &[DirectoryModification],
    ) -> Result<()> {
        self.ensure_session().await?;
        let result = match self.handle.as_mut() {
            Some(handle) => handle.modify(dn, modifications).await,
            None => return Err(Error::Connection("session not established".to_string())),
        };
        self.settle(result).await
    }

    /// Deletes the entry at `dn`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying protocol error; the cached connection is
    /// discarded on failure.
    pub async fn delete(&mut self, dn: &str) -> Result<()> {
        self.ensure_session().await?;
        let result = match self.handle.as_mut() {
            Some(handle) => handle.delete(dn).await,
            None => return Err(Error::Connection("session not established".to_string())),
        };
        self.settle(result).await
    }

    /// Invokes the password-modify extended operation for `dn`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying protocol error; the directory decides
    /// whether the old password is acceptable.
    pub async fn change_password(
        &mut self,
        dn: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        self.ensure_session().await?;
        let result = match self.handle.as_mut() {
            Some(handle) => handle.password_modify(dn, old_password, new_password).await,
            None => return Err(Error::Connection("session not established".to_string())),
        };
        self.settle(result).await
    }

    /// Verifies credentials by binding as `dn` on a fresh connection.
    ///
    /// The fresh connection is always released, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when no server is reachable and
    /// [`Error::Credential`] when the bind is rejected.
    pub async fn verify_credentials(&self, dn: &str, password: &str) -> Result<()> {
        let mut handle = self.connect_any().await?;
        let outcome = handle.simple_bind(dn, password).await;
        let _ = handle.unbind().await;
        outcome.map_err(|err| Error::Credential(err.to_string()))
    }

    /// Releases the cached connection. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let _ = handle.unbind().await;
        }
    }

    /// Establishes and admin-binds the connection if none is cached.
    async fn ensure_session(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let mut handle = self.connect_any().await?;
        let credentials = self.config.credentials();
        if let Err(err) = handle
            .simple_bind(credentials.bind_dn(), credentials.bind_password())
            .await
        {
            let _ = handle.unbind().await;
            return Err(Error::Auth(err.to_string()));
        }

        self.handle = Some(handle);
        Ok(())
    }

    /// Tries each candidate server in order until one accepts a connection.
    async fn connect_any(&self) -> Result<Box<dyn LdapHandle>> {
        let mut last_error = None;
        for server in self.config.servers() {
            let url = self.config.server_url(server);
            debug!(%url, "connecting to directory server");
            match self.connector.connect(&url).await {
                Ok(handle) => return Ok(handle),
                Err(err) => last_error = Some(err),
            }
        }

        Err(Error::Connection(match last_error {
            Some(err) => format!("no directory server reachable: {err}"),
            None => "no directory server reachable".to_string(),
        }))
    }

    /// Propagates a primitive outcome, tearing the connection down on error.
    async fn settle(&mut self, result: Result<()>) -> Result<()> {
        if result.is_err() {
            self.invalidate().await;
        }
        result
    }

    async fn invalidate(&mut self) {
        debug!("discarding directory connection after protocol error");
        self.close().await;
    }
}

/// Real LDAP connector backed by `ldap3`.
struct RealLdapConnector {
    connection_timeout: std::time::Duration,
}

impl RealLdapConnector {
    const fn new(connection_timeout: std::time::Duration) -> Self {
        Self { connection_timeout }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn LdapHandle>> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connection_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapHandle { inner: ldap }))
    }
}

struct RealLdapHandle {
    inner: ldap3::Ldap,
}

#[async_trait]
impl LdapHandle for RealLdapHandle {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .inner
            .simple_bind(dn, password)
            .await
            .map_err(|err| protocol_error("bind", &err))?;
        result
            .success()
            .map_err(|err| protocol_error("bind", &err))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let result = self
            .inner
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(|err| protocol_error("search", &err))?;
        let (entries, _) = result
            .success()
            .map_err(|err| protocol_error("search", &err))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()> {
        let attrs = attributes
            .into_iter()
            .map(|(attribute, values)| (attribute, values.into_iter().collect::<HashSet<_>>()))
            .collect::<Vec<_>>();
        let result = self
            .inner
            .add(dn, attrs)
            .await
            .map_err(|err| protocol_error("add", &err))?;
        result.success().map_err(|err| protocol_error("add", &err))?;
        Ok(())
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods = modifications
            .iter()
            .map(|m| match m {
                DirectoryModification::Add { attribute, values } => Mod::Add(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
                DirectoryModification::Delete { attribute, values } => Mod::Delete(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
                DirectoryModification::Replace { attribute, values } => Mod::Replace(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
            })
            .collect::<Vec<_>>();

        let result = self
            .inner
            .modify(dn, mods)
            .await
            .map_err(|err| protocol_error("modify", &err))?;
        result
            .success()
            .map_err(|err| protocol_error("modify", &err))?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let result = self
            .inner
            .delete(dn)
            .await
            .map_err(|err| protocol_error("delete", &err))?;
        result
            .success()
            .map_err(|err| protocol_error("delete", &err))?;
        Ok(())
    }

    async fn password_modify(
        &mut self,
        dn: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let exop = PasswordModify {
            user_id: Some(dn),
            old_pass: if old_password.is_empty() {
                None
            } else {
                Some(old_password)
            },
            new_pass: Some(new_password),
        };
        let result = self
            .inner
            .extended(exop)
            .await
            .map_err(|err| protocol_error("passwd", &err))?;
        result
            .success()
            .map_err(|err| protocol_error("passwd", &err))?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner
            .unbind()
            .await
            .map_err(|err| protocol_error("unbind", &err))?;
        Ok(())
    }
}

/// Escapes a value for embedding in a search filter (RFC 4515).
pub(crate) fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn protocol_error(operation: &str, err: &dyn std::fmt::Display) -> Error {
    Error::Protocol {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}
