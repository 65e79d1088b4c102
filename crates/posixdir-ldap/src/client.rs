//! Entry point combining user and group management over one session.

use crate::config::DirectoryConfig;
use crate::groups::GroupManager;
use crate::session::DirectorySession;
use crate::users::UserManager;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Directory administration client.
///
/// Owns a single lazily-connected [`DirectorySession`] shared by the user
/// and group managers, so identifier allocation and the scan-then-mutate
/// sequences behind it are serialized within the process.
#[derive(Clone)]
pub struct DirectoryClient {
    session: Arc<Mutex<DirectorySession>>,
    users: UserManager,
    groups: GroupManager,
    config: Arc<DirectoryConfig>,
}

impl DirectoryClient {
    /// Creates a client for the configured directory.
    ///
    /// No connection is made until the first operation needs one.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(Mutex::new(DirectorySession::new(Arc::clone(&config))));
        Self::assemble(session, config)
    }

    #[cfg(test)]
    pub(crate) fn with_session(session: DirectorySession, config: Arc<DirectoryConfig>) -> Self {
        Self::assemble(Arc::new(Mutex::new(session)), config)
    }

    fn assemble(session: Arc<Mutex<DirectorySession>>, config: Arc<DirectoryConfig>) -> Self {
        let users = UserManager::new(Arc::clone(&session), Arc::clone(&config));
        let groups = GroupManager::new(Arc::clone(&session), Arc::clone(&config));
        Self {
            session,
            users,
            groups,
            config,
        }
    }

    /// User management operations.
    #[must_use]
    pub fn users(&self) -> &UserManager {
        &self.users
    }

    /// Group management operations.
    #[must_use]
    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Releases the cached connection, if any. Safe to call repeatedly;
    /// a later operation reconnects.
    pub async fn close(&self) {
        self.session.lock().await.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{admin_handle, config, offline_session, session_with};
    use crate::user::NewUser;
    use posixdir_core::Error;

    #[tokio::test]
    async fn validation_failures_never_touch_the_directory() {
        let client = DirectoryClient::with_session(offline_session(), config());

        let err = client.users().add_user(&NewUser::new(" ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = client.groups().delete_group("").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn managers_share_one_connection() {
        let mut handle = admin_handle();
        handle.expect_search().times(2).returning(|_, _, _| Ok(Vec::new()));

        let client = DirectoryClient::with_session(session_with(handle), config());
        client.users().get_all_users().await.unwrap();
        client.groups().get_all_groups().await.unwrap();
    }

    #[tokio::test]
    async fn close_without_connection_is_a_no_op() {
        let client = DirectoryClient::with_session(offline_session(), config());
        client.close().await;
        client.close().await;
    }
}
