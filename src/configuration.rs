use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::FileFormat;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgSslMode;
use sqlx::ConnectOptions;

/// Top-level server configuration, loaded via `get_configuration`. All fields must be
/// present (from the base file or an environment override), otherwise initialisation
/// fails immediately and the server never starts.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub object_store: ObjectStoreSettings,
    pub sdes: SdesSettings,
    pub callback: CallbackSettings,
    pub workers: WorkerSettings,
    pub internal_auth: InternalAuthSettings,
    /// Accept `http://.../localhost/...` callback URLs. Only ever `true` outside
    /// production, for local/dev testing against a loopback callback receiver.
    pub allow_localhost_callbacks: bool,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    /// Connection options without a target database, used by test setup to create a
    /// fresh randomly named database before running migrations against it.
    pub fn connection_without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl { PgSslMode::Require } else { PgSslMode::Prefer };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn connection(&self) -> PgConnectOptions {
        self.connection_without_db().database(&self.database_name).log_statements(tracing::log::LevelFilter::Trace)
    }
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct ObjectStoreSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ObjectStoreSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Deserialize, Clone)]
pub struct SdesSettings {
    pub base_url: String,
    pub timeout_ms: u64,
    pub information_type: String,
    pub recipient_or_sender: String,
    pub object_store_location_prefix: String,
}

impl SdesSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Deserialize, Clone)]
pub struct CallbackSettings {
    pub timeout_ms: u64,
}

impl CallbackSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

#[derive(Deserialize, Clone)]
pub struct WorkerSettings {
    pub initial_delay_ms: u64,
    pub sdes_worker_interval_ms: u64,
    pub processed_item_worker_interval_ms: u64,
    pub failed_item_worker_interval_ms: u64,
    pub failed_item_worker_max_failures: i32,
    pub lock_ttl_ms: u64,
}

impl WorkerSettings {
    pub fn initial_delay(&self) -> Duration { Duration::from_millis(self.initial_delay_ms) }
    pub fn sdes_worker_interval(&self) -> Duration { Duration::from_millis(self.sdes_worker_interval_ms) }
    pub fn processed_item_worker_interval(&self) -> Duration {
        Duration::from_millis(self.processed_item_worker_interval_ms)
    }
    pub fn failed_item_worker_interval(&self) -> Duration {
        Duration::from_millis(self.failed_item_worker_interval_ms)
    }
    pub fn lock_ttl(&self) -> chrono::Duration { chrono::Duration::milliseconds(self.lock_ttl_ms as i64) }
}

#[derive(Deserialize, Clone)]
pub struct InternalAuthSettings {
    pub token: Secret<String>,
}

/// Which environment-specific overlay to apply on top of `base.yaml`.
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}

/// Load `configuration/base.yaml`, layered with `configuration/{environment}.yaml`
/// (`APP_ENVIRONMENT`, default `local`), then `APP_`-prefixed environment variables
/// (double-underscore separated, e.g. `APP_DATABASE__PORT`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().expect("failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).format(FileFormat::Yaml))
        .add_source(config::File::from(configuration_directory.join(environment_filename)).format(FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize()
}
