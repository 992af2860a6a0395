use std::net::SocketAddr;

use crate::messages::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the catalogue REST service.
#[derive(Clone)]
pub struct CatalogueConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub default_locale: Locale,
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    /// Expected `iss` claim; unchecked when `None`.
    pub jwt_issuer: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for CatalogueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("default_locale", &self.default_locale)
            .field("database_url", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}

/// A manager-service login, parsed from `MANAGER_USERS`.
#[derive(Clone, PartialEq, Eq)]
pub struct ManagerUser {
    pub username: String,
    /// bcrypt hash of the password (`$2b$...`).
    pub password_hash: String,
    pub roles: Vec<String>,
}

impl ManagerUser {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl std::fmt::Debug for ManagerUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerUser")
            .field("username", &self.username)
            .field("password_hash", &"[redacted]")
            .field("roles", &self.roles)
            .finish()
    }
}

/// OAuth2 client-credentials registration used to obtain catalogue tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated scopes to request; the server default when `None`.
    pub scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// How the manager authenticates to the catalogue service.
#[derive(Clone, PartialEq, Eq)]
pub enum CatalogueAuth {
    /// A pre-issued bearer token, sent as-is.
    Token(String),
    /// Tokens fetched from an OAuth2 token endpoint and refreshed before expiry.
    ClientCredentials(ClientCredentials),
}

impl std::fmt::Debug for CatalogueAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogueAuth::Token(_) => f.debug_tuple("Token").field(&"[redacted]").finish(),
            CatalogueAuth::ClientCredentials(credentials) => f
                .debug_tuple("ClientCredentials")
                .field(credentials)
                .finish(),
        }
    }
}

/// Settings for the manager web front-end.
#[derive(Clone)]
pub struct ManagerConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub default_locale: Locale,
    /// Base URL of the catalogue service, e.g. `http://localhost:8081`.
    pub catalogue_url: String,
    pub catalogue_auth: CatalogueAuth,
    pub client_timeout_secs: u64,
    /// Idle time after which a session is discarded.
    pub session_ttl_secs: u64,
    pub users: Vec<ManagerUser>,
}

impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("default_locale", &self.default_locale)
            .field("catalogue_url", &self.catalogue_url)
            .field("catalogue_auth", &self.catalogue_auth)
            .field("client_timeout_secs", &self.client_timeout_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("users", &self.users)
            .finish()
    }
}
