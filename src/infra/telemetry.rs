use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    cache::metric_names,
    config::{LogFormat, LoggingSettings},
};

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
            metric_names::METRIC_HIT,
            Unit::Count,
            "Cache reads answered from the cache, labelled by entry kind."
        );
        describe_counter!(
            metric_names::METRIC_MISS,
            Unit::Count,
            "Cache reads that fell through to the document store."
        );
        describe_counter!(
            metric_names::METRIC_BACKEND_ERROR,
            Unit::Count,
            "Cache backend calls that failed or timed out, labelled by operation."
        );
        describe_counter!(
            metric_names::METRIC_PATCH,
            Unit::Count,
            "In-place patches of cached posts, labelled by result."
        );
        describe_counter!(
            metric_names::METRIC_EVICTIONS,
            Unit::Count,
            "Keys evicted by the memory backend due to capacity."
        );
        describe_histogram!(
            metric_names::METRIC_APPLY_MS,
            Unit::Milliseconds,
            "Latency of applying a coherence plan after a mutation."
        );
    });
}
