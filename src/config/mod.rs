//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, SeedArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_LOCKOUT_MINUTES: u64 = 15;
const DEFAULT_MAX_SESSIONS: u32 = 10_000;
const DEFAULT_CACHE_EXPIRY_HOURS: u64 = 24;
const DEFAULT_PAGE_SIZE: u32 = 6;
const DEFAULT_STATE_FILE: &str = "data/state.json";
const DEFAULT_UPLOAD_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 20 * 1024 * 1024;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
    pub listing: ListingSettings,
    pub storage: StorageSettings,
    pub uploads: UploadSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Documents are kept in memory when unset.
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub access_code: Option<String>,
    pub max_attempts: NonZeroU32,
    pub lockout: Duration,
    /// Upper bound on persisted session blobs before stale ones are pruned.
    pub max_sessions: NonZeroUsize,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("access_code", &self.access_code.as_ref().map(|_| "<redacted>"))
            .field("max_attempts", &self.max_attempts)
            .field("lockout", &self.lockout)
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub expiry: Duration,
}

#[derive(Debug, Clone)]
pub struct ListingSettings {
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Present only when both a cloud name and an upload preset are configured.
    pub media: Option<MediaServiceSettings>,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct MediaServiceSettings {
    pub api_base: Url,
    pub cloud_name: String,
    pub upload_preset: String,
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
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Seed(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    auth: RawAuthSettings,
    cache: RawCacheSettings,
    listing: RawListingSettings,
    storage: RawStorageSettings,
    uploads: RawUploadSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(code) = overrides.auth_access_code.as_ref() {
            self.auth.access_code = Some(code.clone());
        }
        if let Some(max) = overrides.auth_max_attempts {
            self.auth.max_attempts = Some(max);
        }
        if let Some(minutes) = overrides.auth_lockout_minutes {
            self.auth.lockout_minutes = Some(minutes);
        }
        if let Some(hours) = overrides.cache_expiry_hours {
            self.cache.expiry_hours = Some(hours);
        }
        if let Some(size) = overrides.listing_page_size {
            self.listing.page_size = Some(size);
        }
        if let Some(path) = overrides.storage_state_file.as_ref() {
            self.storage.state_file = Some(path.clone());
        }
        if let Some(name) = overrides.uploads_cloud_name.as_ref() {
            self.uploads.cloud_name = Some(name.clone());
        }
        if let Some(preset) = overrides.uploads_upload_preset.as_ref() {
            self.uploads.upload_preset = Some(preset.clone());
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            auth,
            cache,
            listing,
            storage,
            uploads,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            auth: build_auth_settings(auth)?,
            cache: build_cache_settings(cache)?,
            listing: build_listing_settings(listing)?,
            storage: build_storage_settings(storage)?,
            uploads: build_upload_settings(uploads)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
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

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let max_attempts = non_zero_u32(
        auth.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).into(),
        "auth.max_attempts",
    )?;

    let lockout_minutes = auth.lockout_minutes.unwrap_or(DEFAULT_LOCKOUT_MINUTES);
    if lockout_minutes == 0 {
        return Err(LoadError::invalid(
            "auth.lockout_minutes",
            "must be greater than zero",
        ));
    }
    let lockout_secs = lockout_minutes
        .checked_mul(60)
        .ok_or_else(|| LoadError::invalid("auth.lockout_minutes", "value is too large"))?;

    let max_sessions = non_zero_u32(
        auth.max_sessions.unwrap_or(DEFAULT_MAX_SESSIONS).into(),
        "auth.max_sessions",
    )?;
    let max_sessions = usize::try_from(max_sessions.get())
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("auth.max_sessions", "value exceeds usize"))?;

    Ok(AuthSettings {
        access_code: non_blank(auth.access_code),
        max_attempts,
        lockout: Duration::from_secs(lockout_secs),
        max_sessions,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let hours = cache.expiry_hours.unwrap_or(DEFAULT_CACHE_EXPIRY_HOURS);
    if hours == 0 {
        return Err(LoadError::invalid(
            "cache.expiry_hours",
            "must be greater than zero",
        ));
    }
    let secs = hours
        .checked_mul(3600)
        .ok_or_else(|| LoadError::invalid("cache.expiry_hours", "value is too large"))?;

    Ok(CacheSettings {
        expiry: Duration::from_secs(secs),
    })
}

fn build_listing_settings(listing: RawListingSettings) -> Result<ListingSettings, LoadError> {
    let size = non_zero_u32(
        listing.page_size.unwrap_or(DEFAULT_PAGE_SIZE).into(),
        "listing.page_size",
    )?;
    let page_size = usize::try_from(size.get())
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| LoadError::invalid("listing.page_size", "value exceeds usize"))?;

    Ok(ListingSettings { page_size })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let state_file = storage
        .state_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));
    if state_file.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.state_file",
            "path must not be empty",
        ));
    }

    Ok(StorageSettings { state_file })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    let api_base_raw = uploads
        .api_base
        .unwrap_or_else(|| DEFAULT_UPLOAD_API_BASE.to_string());
    let api_base = Url::parse(api_base_raw.trim())
        .map_err(|err| LoadError::invalid("uploads.api_base", err.to_string()))?;

    let media = match (non_blank(uploads.cloud_name), non_blank(uploads.upload_preset)) {
        (Some(cloud_name), Some(upload_preset)) => Some(MediaServiceSettings {
            api_base,
            cloud_name,
            upload_preset,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(LoadError::invalid(
                "uploads.upload_preset",
                "required when uploads.cloud_name is set",
            ));
        }
        (None, Some(_)) => {
            return Err(LoadError::invalid(
                "uploads.cloud_name",
                "required when uploads.upload_preset is set",
            ));
        }
    };

    Ok(UploadSettings {
        media,
        max_request_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
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
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    access_code: Option<String>,
    max_attempts: Option<u32>,
    lockout_minutes: Option<u64>,
    max_sessions: Option<u32>,
}

impl std::fmt::Debug for RawAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAuthSettings")
            .field("access_code", &self.access_code.as_ref().map(|_| "<redacted>"))
            .field("max_attempts", &self.max_attempts)
            .field("lockout_minutes", &self.lockout_minutes)
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    expiry_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListingSettings {
    page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    api_base: Option<String>,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
    max_request_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
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

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
