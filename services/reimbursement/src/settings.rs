//! Service settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `settings.{toml,yaml,json}` file in the working directory, then
//! environment variables prefixed with `ERS_` using `__` between nested
//! keys (`ERS_AUTH__JWT_SECRET`, `ERS_POLICY__MIN_PASSWORD_LENGTH`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::validation::DEFAULT_MIN_PASSWORD_LENGTH;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret used to sign access tokens
    pub jwt_secret: String,
    /// Lifetime of an access token in seconds
    pub token_expiry_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicySettings {
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// HTTP mail relay endpoint; messages are only logged when absent
    pub relay_url: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub policy: PolicySettings,
    pub notification: NotificationSettings,
}

impl Settings {
    /// Load settings from defaults, the optional file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.bind_address", "0.0.0.0:3000")?
            .set_default("auth.token_expiry_seconds", 1800)?
            .set_default(
                "policy.min_password_length",
                DEFAULT_MIN_PASSWORD_LENGTH as u64,
            )?
            .set_default("notification.sender", "notifications@ers.local")?
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("ERS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
