use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio portfolio and blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Folio HTTP service.
    Serve(Box<ServeArgs>),
    /// Write the default profile when none is stored yet.
    Seed(SeedArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the admin access code.
    #[arg(long = "auth-access-code", value_name = "CODE", env = "FOLIO_ACCESS_CODE", hide_env_values = true)]
    pub auth_access_code: Option<String>,

    /// Override the number of wrong codes accepted before lockout.
    #[arg(long = "auth-max-attempts", value_name = "COUNT")]
    pub auth_max_attempts: Option<u32>,

    /// Override the lockout duration.
    #[arg(long = "auth-lockout-minutes", value_name = "MINUTES")]
    pub auth_lockout_minutes: Option<u64>,

    /// Override the content cache freshness window.
    #[arg(long = "cache-expiry-hours", value_name = "HOURS")]
    pub cache_expiry_hours: Option<u64>,

    /// Override the number of items per list page.
    #[arg(long = "listing-page-size", value_name = "COUNT")]
    pub listing_page_size: Option<u32>,

    /// Override the file holding session and cache state.
    #[arg(long = "storage-state-file", value_name = "PATH")]
    pub storage_state_file: Option<PathBuf>,

    /// Override the media service cloud name.
    #[arg(long = "uploads-cloud-name", value_name = "NAME")]
    pub uploads_cloud_name: Option<String>,

    /// Override the media service unsigned upload preset.
    #[arg(long = "uploads-upload-preset", value_name = "PRESET")]
    pub uploads_upload_preset: Option<String>,

    /// Override the maximum request size for admin forms in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,
}
