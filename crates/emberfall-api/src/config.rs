//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use emberfall_session::domain::EngineConfig;

use crate::error::AppError;

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string for save slots.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Campaign document to serve.
    pub campaign_path: PathBuf,
    /// Fixed RNG seed; entropy when unset.
    pub rng_seed: Option<u64>,
    /// Overrides the campaign's starting location.
    pub starting_location: Option<String>,
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
        };

        let database_url = required("DATABASE_URL")?;
        let campaign_path = PathBuf::from(required("CAMPAIGN_PATH")?);
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let rng_seed = lookup("RNG_SEED")
            .map(|raw| {
                raw.parse()
                    .map_err(|e| AppError::Config(format!("RNG_SEED must be a valid u64: {e}")))
            })
            .transpose()?;

        Ok(Self {
            database_url,
            host,
            port,
            campaign_path,
            rng_seed,
            starting_location: lookup("STARTING_LOCATION"),
        })
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an unparseable host.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            starting_location: self.starting_location.clone(),
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/emberfall"),
        ("CAMPAIGN_PATH", "campaigns/ashfall.yaml"),
    ];

    #[test]
    fn test_defaults_apply_when_optional_vars_are_unset() {
        let config = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.campaign_path, PathBuf::from("campaigns/ashfall.yaml"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_database_url_is_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("CAMPAIGN_PATH", "x.yaml")]));

        let Err(AppError::Config(message)) = result else {
            panic!("expected a config error");
        };
        assert!(message.contains("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));

        let result = AppConfig::from_lookup(lookup_from(&pairs));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_seed_and_starting_location_are_read() {
        // Arrange
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("RNG_SEED", "42"), ("STARTING_LOCATION", "old_mine"), ("PORT", "8080")]);

        // Act
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();

        // Assert
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.engine_config().starting_location.as_deref(),
            Some("old_mine")
        );
    }
}
