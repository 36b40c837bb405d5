//! Server configuration loading
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file passed with `--config`
//! 3. Environment variables prefixed `GATEHOUSE_`, nested keys joined by `__`
//!
//! # Supported Environment Variables
//!
//! - `GATEHOUSE_BIND`: listen address (default `0.0.0.0:3001`)
//! - `GATEHOUSE_PREFETCH_KEYS`: fetch the key set before serving (bool)
//! - `GATEHOUSE_AUTH__JWKS_URI`: JWKS endpoint of the identity provider
//! - `GATEHOUSE_AUTH__ISSUER`: expected `iss` claim
//! - `GATEHOUSE_AUTH__AUDIENCES`: expected audience
//! - `GATEHOUSE_AUTH__REQUIRED_SCOPE`: permission for `/api/private` (default `read:messages`)
//! - `GATEHOUSE_AUTH__LEEWAY_SECS`, `GATEHOUSE_AUTH__CACHE_TTL_SECS`,
//!   `GATEHOUSE_AUTH__MIN_REFRESH_INTERVAL_SECS`, `GATEHOUSE_AUTH__FETCH_TIMEOUT_SECS`

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use gatehouse_auth::AuthorizationConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GATEHOUSE";

/// Response texts of the two routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    /// Body of `/api/public`
    pub public: String,
    /// Body of `/api/private` for authorized callers
    pub private: String,
}

impl Messages {
    /// Default texts, naming `scope` in the private message
    pub fn for_scope(scope: &str) -> Self {
        Self {
            public: "Hello from a public endpoint! You don't need to be authenticated to see this."
                .to_string(),
            private: format!(
                "Hello from a private endpoint! You need to be authenticated and have a scope of {scope} to see this."
            ),
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::for_scope("read:messages")
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Fetch the key set before accepting requests; failure aborts startup
    pub prefetch_keys: bool,
    /// Token validation settings for `/api/private`
    pub auth: AuthorizationConfig,
    /// Route response texts; both must be given when the section is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Messages>,
}

impl ServerConfig {
    /// Configured route texts, or the defaults for the configured scope
    pub fn messages(&self) -> Messages {
        self.messages
            .clone()
            .unwrap_or_else(|| Messages::for_scope(&self.auth.required_scope))
    }

    /// Environment source reading `GATEHOUSE_*` variables
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true)
    }

    /// Configuration builder with defaults, an optional file and `env`
    ///
    /// # Errors
    ///
    /// Returns an error if a default cannot be set.
    pub fn builder(
        path: Option<&Path>,
        env: Environment,
    ) -> Result<ConfigBuilder<DefaultState>> {
        let mut builder = Config::builder()
            .set_default("bind", "0.0.0.0:3001")?
            .set_default("prefetch_keys", true)?
            .set_default("auth.required_scope", "read:messages")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.add_source(env))
    }

    /// Load from defaults, `path` and the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read, a value has the wrong
    /// type, or the authorization settings do not validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Self::environment())
    }

    /// Load with an explicit environment source
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::load`].
    pub fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let config = Self::builder(path, env)?
            .build()
            .context("Failed to build configuration")?;

        let server: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        server
            .auth
            .validate()
            .context("Invalid authorization configuration")?;

        tracing::info!(
            bind = %server.bind,
            jwks_uri = %server.auth.jwks_uri,
            issuer = %server.auth.issuer,
            required_scope = %server.auth.required_scope,
            "Loaded configuration"
        );

        Ok(server)
    }
}
