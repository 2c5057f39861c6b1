use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_cache_hit_total",
            Unit::Count,
            "Total number of content cache hits."
        );
        describe_counter!(
            "folio_cache_miss_total",
            Unit::Count,
            "Total number of content cache misses, including stale entries."
        );
        describe_counter!(
            "folio_login_failed_total",
            Unit::Count,
            "Total number of wrong access codes submitted outside a lockout."
        );
        describe_counter!(
            "folio_login_lockout_total",
            Unit::Count,
            "Total number of lockouts started."
        );
        describe_counter!(
            "folio_session_pruned_total",
            Unit::Count,
            "Total number of stale session blobs removed to stay under the limit."
        );
        describe_counter!(
            "folio_upload_total",
            Unit::Count,
            "Total number of images forwarded to the media service."
        );
        describe_counter!(
            "folio_upload_failed_total",
            Unit::Count,
            "Total number of failed image uploads."
        );
        describe_histogram!(
            "folio_http_request_duration_ms",
            Unit::Milliseconds,
            "Time to produce a response, labelled by section and status class."
        );
    });
}
