//! Administrative bind identity for the directory.

use serde::{Deserialize, Serialize};

/// Credentials used for the administrative directory bind.
///
/// The password is excluded from serialized output so configuration dumps
/// never leak the admin secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminCredentials {
    /// Distinguished name of the administrative identity
    pub bind_dn: String,

    /// Administrative bind password
    #[serde(skip_serializing)]
    pub bind_password: String,
}

impl AdminCredentials {
    /// Create new administrative credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The LDAP DN for the admin account
    /// * `bind_password` - The admin password
    #[must_use]
    pub const fn new(bind_dn: String, bind_password: String) -> Self {
        Self {
            bind_dn,
            bind_password,
        }
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        &self.bind_password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let creds = AdminCredentials::new(
            "cn=admin,dc=example,dc=com".to_string(),
            "secret".to_string(),
        );

        assert_eq!(creds.bind_dn(), "cn=admin,dc=example,dc=com");
        assert_eq!(creds.bind_password(), "secret");
    }

    #[test]
    fn password_not_serialized() {
        let creds = AdminCredentials::new(
            "cn=admin,dc=example,dc=com".to_string(),
            "secret".to_string(),
        );

        let json = serde_json::to_string(&creds).unwrap();
        assert!(json.contains("cn=admin"));
        assert!(!json.contains("secret"));
    }
}
