use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "IGNITE_ENV";
const CONFIG_DIR_ENV: &str = "IGNITE_CONFIG_DIR";
const ENV_PREFIX: &str = "IGNITE";

/// Deployment environment the bootstrap is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub principal: PrincipalSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `IGNITE_*` variables (`__` separates nested keys).
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load from an explicit config directory and environment name, with
    /// `IGNITE_*` overrides read from the process environment.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        Self::load_layers(config_dir, environment, None)
    }

    /// Like [`Settings::load_from`], but `vars` stands in for the process
    /// environment when given.
    fn load_layers(
        config_dir: &std::path::Path,
        environment: &str,
        vars: Option<config::Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{environment}.toml"));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_name() -> String {
        "reactive_api_db".to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        5000
    }

    fn default_app_name() -> String {
        "ignite".to_string()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            name: Self::default_name(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            app_name: Self::default_app_name(),
        }
    }
}

/// Application credential provisioned on the selected database.
#[derive(Clone, Deserialize)]
pub struct PrincipalSettings {
    #[serde(default = "PrincipalSettings::default_user")]
    pub user: String,
    #[serde(default = "PrincipalSettings::default_password")]
    pub password: String,
    #[serde(default = "PrincipalSettings::default_role")]
    pub role: String,
}

impl PrincipalSettings {
    fn default_user() -> String {
        "app_user".to_string()
    }

    fn default_password() -> String {
        "app_password".to_string()
    }

    fn default_role() -> String {
        "readWrite".to_string()
    }
}

impl Default for PrincipalSettings {
    fn default() -> Self {
        Self {
            user: Self::default_user(),
            password: Self::default_password(),
            role: Self::default_role(),
        }
    }
}

impl std::fmt::Debug for PrincipalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalSettings")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// How the bootstrap treats objects that already exist.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    /// Every creation call must succeed; a second run fails.
    #[default]
    Strict,
    /// Skip the principal and collection when present, and seed only an
    /// empty collection.
    IfAbsent,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BootstrapSettings {
    #[serde(default)]
    pub mode: BootstrapMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_targets_local_mongodb() {
        let settings = Settings::default();
        assert_eq!(settings.database.uri, "mongodb://localhost:27017");
        assert_eq!(settings.database.name, "reactive_api_db");
        assert_eq!(settings.database.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn default_principal_has_read_write_role() {
        let settings = Settings::default();
        assert_eq!(settings.principal.user, "app_user");
        assert_eq!(settings.principal.role, "readWrite");
        assert_eq!(settings.bootstrap.mode, BootstrapMode::Strict);
    }

    #[test]
    fn principal_debug_hides_password() {
        let rendered = format!("{:?}", PrincipalSettings::default());
        assert!(!rendered.contains("app_password"));
    }

    #[test]
    fn missing_config_dir_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("ignite-settings-missing");
        let settings = Settings::load_layers(&dir, "staging", Some(vars(&[]))).unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.database.name, "reactive_api_db");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let dir = std::env::temp_dir().join("ignite-settings-missing");
        assert!(Settings::load_layers(&dir, "qa", Some(vars(&[]))).is_err());
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = std::env::temp_dir().join(format!("ignite-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("base.toml"),
            "[database]\nname = \"base_db\"\n[bootstrap]\nmode = \"if_absent\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("production.toml"), "[database]\nname = \"prod_db\"\n").unwrap();

        let settings = Settings::load_layers(&dir, "production", Some(vars(&[]))).unwrap();
        assert_eq!(settings.database.name, "prod_db");
        assert_eq!(settings.bootstrap.mode, BootstrapMode::IfAbsent);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn prefixed_variables_override_files_and_defaults() {
        let dir = std::env::temp_dir().join(format!("ignite-settings-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("base.toml"), "[database]\nname = \"base_db\"\n").unwrap();

        let settings = Settings::load_layers(
            &dir,
            "local",
            Some(vars(&[
                ("IGNITE_DATABASE__NAME", "env_db"),
                ("IGNITE_DATABASE__CONNECT_TIMEOUT_MS", "250"),
                ("IGNITE_PRINCIPAL__PASSWORD", "s3cret"),
                ("IGNITE_BOOTSTRAP__MODE", "if_absent"),
                ("OTHER_DATABASE__NAME", "ignored"),
            ])),
        )
        .unwrap();

        assert_eq!(settings.database.name, "env_db");
        assert_eq!(settings.database.connect_timeout(), Duration::from_millis(250));
        assert_eq!(settings.principal.password, "s3cret");
        assert_eq!(settings.principal.user, "app_user");
        assert_eq!(settings.bootstrap.mode, BootstrapMode::IfAbsent);

        std::fs::remove_dir_all(&dir).ok();
    }
}
