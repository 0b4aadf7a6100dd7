use std::{env, path::Path};

use crate::error::ConfigError;

pub const DEFAULT_APP_NAME: &str = "notes-store";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub connection_string: String,
    pub database: String,
    pub app_name: String,
}

impl Config {
    /// Loads the configuration from the process environment, reading `.env`
    /// first when one is present in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        if Path::new(".env").exists() {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
                Err(e) => tracing::warn!("Failed to read .env file: {e}"),
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let connection_string = required("MONGODB_CONNECTION_STRING")?;
        let database = required("MONGODB_DATABASE")?;
        let app_name = lookup("MONGODB_APP_NAME")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        Ok(Self {
            connection_string,
            database,
            app_name,
        })
    }

    /// Connection string tagged with `appName` so connections can be told
    /// apart in server-side logs. An existing `appName` is left untouched.
    pub fn connection_uri(&self) -> String {
        let uri = &self.connection_string;
        let app_name = urlencoding::encode(&self.app_name);

        if uri.contains("appName") {
            uri.clone()
        } else if uri.contains('?') {
            format!("{uri}&appName={app_name}")
        } else {
            let has_path = uri
                .split_once("://")
                .is_some_and(|(_, rest)| rest.contains('/'));
            let slash = if has_path { "" } else { "/" };
            format!("{uri}{slash}?appName={app_name}")
        }
    }
}
