//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "configs/main";
const ENV_PREFIX: &str = "GOODS";
const DEFAULT_APP_NAME: &str = "goods-service";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_PG_HOST: &str = "localhost";
const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_PG_NAME: &str = "goods";
const DEFAULT_PG_USER: &str = "postgres";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REDIS_ADDR: &str = "localhost:6379";
const DEFAULT_REDIS_MAX_RETRIES: usize = 3;
const DEFAULT_REDIS_DIAL_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REDIS_TIMEOUT_SECS: u64 = 3;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
const DEFAULT_CLICKHOUSE_PORT: u16 = 9000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
    pub postgresql: PostgresSettings,
    pub cache: CacheSettings,
    pub clickhouse: Option<ClickhouseSettings>,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// IP literal or hostname, resolved when the listener binds.
    pub host: String,
    pub port: u16,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Postgres connection. `url` wins over the discrete fields when present.
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub addr: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db: u32,
    pub max_retries: usize,
    pub dial_timeout: Duration,
    pub timeout: Duration,
    pub ttl: Duration,
    pub memory_capacity: NonZeroUsize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            addr: DEFAULT_REDIS_ADDR.to_string(),
            user: None,
            password: None,
            db: 0,
            max_retries: DEFAULT_REDIS_MAX_RETRIES,
            dial_timeout: Duration::from_secs(DEFAULT_REDIS_DIAL_TIMEOUT_SECS),
            timeout: Duration::from_secs(DEFAULT_REDIS_TIMEOUT_SECS),
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            memory_capacity: NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Analytics sink settings. Parsed and validated, not connected.
#[derive(Debug, Clone)]
pub struct ClickhouseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    app: RawAppSettings,
    http: RawHttpSettings,
    logging: RawLoggingSettings,
    postgresql: RawPostgresSettings,
    redis: RawRedisSettings,
    #[serde(alias = "clh")]
    clickhouse: Option<RawClickhouseSettings>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.http_host.as_ref() {
            self.http.host = Some(host.clone());
        }
        if let Some(port) = overrides.http_port {
            self.http.port = Some(port);
        }
        if let Some(seconds) = overrides.graceful_shutdown_seconds {
            self.http.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.postgresql.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.postgresql.max_connections = Some(max);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.redis.backend = Some(backend.clone());
        }
        if let Some(addr) = overrides.redis_addr.as_ref() {
            self.redis.addr = Some(addr.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.redis.ttl = Some(ttl);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.postgresql.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            app,
            http,
            logging,
            postgresql,
            redis,
            clickhouse,
        } = raw;

        Ok(Self {
            app: build_app_settings(app),
            http: build_http_settings(http)?,
            logging: build_logging_settings(logging)?,
            postgresql: build_postgres_settings(postgresql)?,
            cache: build_cache_settings(redis)?,
            clickhouse: clickhouse.map(build_clickhouse_settings).transpose()?,
        })
    }
}

fn build_app_settings(app: RawAppSettings) -> AppSettings {
    AppSettings {
        name: non_blank(app.name).unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        version: non_blank(app.version).unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let host = non_blank(http.host).unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = http.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "http.port",
            "port must be greater than zero",
        ));
    }

    if host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(LoadError::invalid(
            "http.host",
            format!("`{host}` is not a valid host"),
        ));
    }

    let graceful_secs = http
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "http.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(HttpSettings {
        host,
        port,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_postgres_settings(pg: RawPostgresSettings) -> Result<PostgresSettings, LoadError> {
    let port = pg.port.unwrap_or(DEFAULT_PG_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "postgresql.port",
            "port must be greater than zero",
        ));
    }

    let max_connections = non_zero_u32(
        pg.max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "postgresql.max_connections",
    )?;

    let acquire_secs = pg
        .acquire_timeout_seconds
        .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);
    if acquire_secs == 0 {
        return Err(LoadError::invalid(
            "postgresql.acquire_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(PostgresSettings {
        url: non_blank(pg.url),
        host: non_blank(pg.host).unwrap_or_else(|| DEFAULT_PG_HOST.to_string()),
        port,
        name: non_blank(pg.name).unwrap_or_else(|| DEFAULT_PG_NAME.to_string()),
        user: non_blank(pg.user).unwrap_or_else(|| DEFAULT_PG_USER.to_string()),
        password: non_blank(pg.password),
        max_connections,
        acquire_timeout: Duration::from_secs(acquire_secs),
    })
}

fn build_cache_settings(redis: RawRedisSettings) -> Result<CacheSettings, LoadError> {
    let defaults = CacheSettings::default();

    let backend = match non_blank(redis.backend) {
        Some(value) => value
            .parse()
            .map_err(|reason: String| LoadError::invalid("redis.backend", reason))?,
        None => defaults.backend,
    };

    let addr = non_blank(redis.addr).unwrap_or(defaults.addr);
    if !addr.contains(':') {
        return Err(LoadError::invalid(
            "redis.addr",
            format!("expected host:port, got `{addr}`"),
        ));
    }

    let ttl_secs = redis.ttl.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid("redis.ttl", "must be greater than zero"));
    }

    let dial_secs = redis
        .dial_timeout
        .unwrap_or(DEFAULT_REDIS_DIAL_TIMEOUT_SECS);
    if dial_secs == 0 {
        return Err(LoadError::invalid(
            "redis.dialtimeout",
            "must be greater than zero",
        ));
    }

    let timeout_secs = redis.timeout.unwrap_or(DEFAULT_REDIS_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "redis.timeout",
            "must be greater than zero",
        ));
    }

    let memory_capacity = match redis.memory_capacity {
        Some(value) => NonZeroUsize::new(value)
            .ok_or_else(|| LoadError::invalid("redis.memory_capacity", "must be greater than zero"))?,
        None => defaults.memory_capacity,
    };

    Ok(CacheSettings {
        backend,
        addr,
        user: non_blank(redis.user),
        password: non_blank(redis.password),
        db: redis.db.unwrap_or(defaults.db),
        max_retries: redis.max_retries.unwrap_or(defaults.max_retries),
        dial_timeout: Duration::from_secs(dial_secs),
        timeout: Duration::from_secs(timeout_secs),
        ttl: Duration::from_secs(ttl_secs),
        memory_capacity,
    })
}

fn build_clickhouse_settings(
    clickhouse: RawClickhouseSettings,
) -> Result<ClickhouseSettings, LoadError> {
    let port = clickhouse.port.unwrap_or(DEFAULT_CLICKHOUSE_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "clickhouse.port",
            "port must be greater than zero",
        ));
    }

    Ok(ClickhouseSettings {
        host: non_blank(clickhouse.host).unwrap_or_else(|| DEFAULT_PG_HOST.to_string()),
        port,
        name: non_blank(clickhouse.name).unwrap_or_default(),
        user: non_blank(clickhouse.user).unwrap_or_default(),
        password: non_blank(clickhouse.password),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAppSettings {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPostgresSettings {
    url: Option<String>,
    name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedisSettings {
    backend: Option<String>,
    addr: Option<String>,
    user: Option<String>,
    password: Option<String>,
    db: Option<u32>,
    #[serde(alias = "maxretries")]
    max_retries: Option<usize>,
    #[serde(alias = "dialtimeout")]
    dial_timeout: Option<u64>,
    timeout: Option<u64>,
    ttl: Option<u64>,
    memory_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClickhouseSettings {
    name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
