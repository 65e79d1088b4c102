//! Configuration for the directory administration engine.

use crate::dn::{DistinguishedName, Rdn};
use crate::Result;
use posixdir_core::credentials::AdminCredentials;
use posixdir_core::Error;
use std::time::Duration;
use url::Url;

/// Default directory port.
pub const DEFAULT_PORT: u16 = 389;
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default login shell assigned to new users.
pub const DEFAULT_SHELL: &str = "/bin/bash";
/// Placeholder password assigned when a new user has none.
pub const DEFAULT_PASSWORD: &str = "changeme";
/// Default `shadowMax` (password max age, days).
pub const DEFAULT_SHADOW_MAX: &str = "99999";
/// Default `shadowWarning` (password expiry warning, days).
pub const DEFAULT_SHADOW_WARNING: &str = "14";

/// Configuration for connecting to and administering the directory.
///
/// The administrative identity, base DN and container names are fixed at
/// construction; the caller supplies the list of candidate servers.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    servers: Vec<String>,
    port: u16,
    credentials: AdminCredentials,
    base_dn: DistinguishedName,
    people_dn: DistinguishedName,
    group_dn: DistinguishedName,
    mail_domain: String,
    default_password: String,
    default_shell: String,
    default_shadow_max: String,
    default_shadow_warning: String,
    connection_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a new directory configuration.
    ///
    /// People and group containers default to `ou=People` and `ou=Group`
    /// under the base DN; the mail domain defaults to the dot-joined `dc`
    /// components of the base DN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the server list is empty or a server
    /// entry does not form a valid `ldap://` URL.
    pub fn new(
        servers: Vec<String>,
        credentials: AdminCredentials,
        base_dn: DistinguishedName,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::Config(
                "at least one directory server is required".to_string(),
            ));
        }
        for server in &servers {
            Url::parse(&format!("ldap://{server}:{DEFAULT_PORT}"))
                .map_err(|err| Error::Config(format!("invalid server address {server}: {err}")))?;
        }

        let people_dn = base_dn.child(Rdn::new("ou", "People"));
        let group_dn = base_dn.child(Rdn::new("ou", "Group"));
        let mail_domain = derive_mail_domain(&base_dn);

        Ok(Self {
            servers,
            port: DEFAULT_PORT,
            credentials,
            base_dn,
            people_dn,
            group_dn,
            mail_domain,
            default_password: DEFAULT_PASSWORD.to_string(),
            default_shell: DEFAULT_SHELL.to_string(),
            default_shadow_max: DEFAULT_SHADOW_MAX.to_string(),
            default_shadow_warning: DEFAULT_SHADOW_WARNING.to_string(),
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
        })
    }

    /// Candidate server hosts, tried in order.
    #[must_use]
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Directory port shared by all candidate servers.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Administrative bind credentials.
    #[must_use]
    pub const fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    /// Base distinguished name of the tree.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Container holding user entries.
    #[must_use]
    pub const fn people_dn(&self) -> &DistinguishedName {
        &self.people_dn
    }

    /// Container holding group entries.
    #[must_use]
    pub const fn group_dn(&self) -> &DistinguishedName {
        &self.group_dn
    }

    /// Domain used to derive user mail addresses.
    #[must_use]
    pub fn mail_domain(&self) -> &str {
        &self.mail_domain
    }

    /// Placeholder password for new users created without one.
    #[must_use]
    pub fn default_password(&self) -> &str {
        &self.default_password
    }

    /// Login shell for new users created without one.
    #[must_use]
    pub fn default_shell(&self) -> &str {
        &self.default_shell
    }

    /// Default `shadowMax` value.
    #[must_use]
    pub fn default_shadow_max(&self) -> &str {
        &self.default_shadow_max
    }

    /// Default `shadowWarning` value.
    #[must_use]
    pub fn default_shadow_warning(&self) -> &str {
        &self.default_shadow_warning
    }

    /// Connection establishment timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// DN of the user entry named `name`.
    #[must_use]
    pub fn user_dn(&self, name: &str) -> DistinguishedName {
        self.people_dn.child(Rdn::new("uid", name))
    }

    /// DN of the group entry named `name`.
    #[must_use]
    pub fn group_entry_dn(&self, name: &str) -> DistinguishedName {
        self.group_dn.child(Rdn::new("cn", name))
    }

    /// URL for the given server host, using the configured port.
    #[must_use]
    pub fn server_url(&self, server: &str) -> String {
        format!("ldap://{}:{}", server, self.port)
    }

    /// Overrides the directory port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the people container DN.
    #[must_use]
    pub fn with_people_dn(mut self, dn: DistinguishedName) -> Self {
        self.people_dn = dn;
        self
    }

    /// Overrides the group container DN.
    #[must_use]
    pub fn with_group_dn(mut self, dn: DistinguishedName) -> Self {
        self.group_dn = dn;
        self
    }

    /// Overrides the mail domain used for derived addresses.
    #[must_use]
    pub fn with_mail_domain(mut self, domain: impl Into<String>) -> Self {
        self.mail_domain = domain.into();
        self
    }

    /// Overrides the placeholder password for new users.
    #[must_use]
    pub fn with_default_password(mut self, password: impl Into<String>) -> Self {
        self.default_password = password.into();
        self
    }

    /// Overrides the default login shell.
    #[must_use]
    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    /// Overrides the default shadow aging values.
    #[must_use]
    pub fn with_shadow_defaults(
        mut self,
        max: impl Into<String>,
        warning: impl Into<String>,
    ) -> Self {
        self.default_shadow_max = max.into();
        self.default_shadow_warning = warning.into();
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }
}

fn derive_mail_domain(base_dn: &DistinguishedName) -> String {
    let parts: Vec<&str> = base_dn
        .rdns()
        .iter()
        .filter(|rdn| rdn.attribute().eq_ignore_ascii_case("dc"))
        .map(|rdn| rdn.value())
        .collect();

    if parts.is_empty() {
        "localdomain".to_string()
    } else {
        parts.join(".")
    }
}
