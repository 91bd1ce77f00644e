use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// アプリケーション設定
///
/// 環境変数（と作業ディレクトリの `.env`）から読み込む。
/// セクションごとにプレフィックスを分ける（`server.port` → `SERVER_PORT`）。
#[derive(Debug)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logger: LoggerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("環境変数の読み込みに失敗 ({prefix}*): {source}")]
    Env {
        prefix: &'static str,
        #[source]
        source: envy::Error,
    },

    #[error("未対応のデータベースドライバー: {0}")]
    UnsupportedDriver(String),

    #[error("不正な sslmode: {0}")]
    InvalidSslMode(String),
}

/// 情報表示用（ヘルスチェックとログに出す）
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
    #[serde(default = "default_app_env")]
    pub env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// リクエストボディ読み込みのタイムアウト（秒）
    #[serde(default = "default_timeout_secs")]
    pub read_timeout: u64,
    /// レスポンスを返すまでのタイムアウト（秒）
    #[serde(default = "default_timeout_secs")]
    pub write_timeout: u64,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    pub host: String,
    #[serde(default = "default_database_port")]
    pub port: u16,
    pub username: String,
    pub password: SecretBox<String>,
    pub dbname: String,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DRIVER: &str = "postgres";
const DEFAULT_DATABASE_PORT: u16 = 5432;
const DEFAULT_SSLMODE: &str = "disable";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

fn default_app_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_database_port() -> u16 {
    DEFAULT_DATABASE_PORT
}

fn default_sslmode() -> String {
    DEFAULT_SSLMODE.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// 任意のキー・値の組から読み込む（テスト用）
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        Ok(Self {
            app: section("APP_", &vars)?,
            server: section("SERVER_", &vars)?,
            database: section("DATABASE_", &vars)?,
            logger: section("LOGGER_", &vars)?,
        })
    }
}

fn section<T>(prefix: &'static str, vars: &[(String, String)]) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    envy::prefixed(prefix)
        .from_iter(vars.iter().cloned())
        .map_err(|source| ConfigError::Env { prefix, source })
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            env: default_app_env(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout: default_timeout_secs(),
            write_timeout: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }
}

impl DatabaseConfig {
    /// DSN の各要素から接続オプションを組み立てる
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if !matches!(self.driver.as_str(), "postgres" | "postgresql") {
            return Err(ConfigError::UnsupportedDriver(self.driver.clone()));
        }

        let ssl_mode = PgSslMode::from_str(&self.sslmode)
            .map_err(|_| ConfigError::InvalidSslMode(self.sslmode.clone()))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.expose_secret())
            .database(&self.dbname)
            .ssl_mode(ssl_mode))
    }
}
