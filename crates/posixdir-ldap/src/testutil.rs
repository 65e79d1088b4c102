//! Shared mock plumbing for engine tests.

use crate::config::DirectoryConfig;
use crate::dn::DistinguishedName;
use crate::session::{DirectorySession, LdapEntry, LdapHandle, MockLdapConnector, MockLdapHandle};
use posixdir_core::credentials::AdminCredentials;
use posixdir_core::Error;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) fn config() -> Arc<DirectoryConfig> {
    let credentials = AdminCredentials::new(
        "cn=admin,dc=example,dc=com".to_string(),
        "secret".to_string(),
    );
    let base_dn = DistinguishedName::parse("dc=example,dc=com").unwrap();
    Arc::new(
        DirectoryConfig::new(vec!["ldap1.example.com".to_string()], credentials, base_dn).unwrap(),
    )
}

/// Mock handle that accepts the admin bind and releases cleanly.
pub(crate) fn admin_handle() -> MockLdapHandle {
    let mut handle = MockLdapHandle::new();
    handle.expect_simple_bind().returning(|_, _| Ok(()));
    handle.expect_unbind().returning(|| Ok(()));
    handle
}

/// Session whose connector hands out the given handles in order.
pub(crate) fn session_with_handles(handles: Vec<MockLdapHandle>) -> DirectorySession {
    let queue = Mutex::new(VecDeque::from(handles));
    let mut connector = MockLdapConnector::new();
    connector.expect_connect().returning(move |_| {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .map(|handle| Box::new(handle) as Box<dyn LdapHandle>)
            .ok_or_else(|| Error::Connection("mock connector exhausted".to_string()))
    });
    DirectorySession::with_connector(config(), Box::new(connector))
}

/// Session backed by a single mock handle.
pub(crate) fn session_with(handle: MockLdapHandle) -> DirectorySession {
    session_with_handles(vec![handle])
}

/// Session whose connector must never be asked for a connection.
pub(crate) fn offline_session() -> DirectorySession {
    let mut connector = MockLdapConnector::new();
    connector.expect_connect().times(0);
    DirectorySession::with_connector(config(), Box::new(connector))
}

pub(crate) fn entry(dn: &str, attributes: &[(&str, &[&str])]) -> LdapEntry {
    LdapEntry {
        dn: dn.to_string(),
        attributes: attributes
            .iter()
            .map(|(attribute, values)| {
                (
                    (*attribute).to_string(),
                    values.iter().map(|value| (*value).to_string()).collect(),
                )
            })
            .collect(),
    }
}
