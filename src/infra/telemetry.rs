use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::queue::{
        METRIC_COMPLETED, METRIC_PENDING, METRIC_REJECTED, METRIC_RENDER_MS, METRIC_SUBMITTED,
        METRIC_WAITER_DROPPED,
    },
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

/// Register metric descriptions with the installed recorder. Safe to call
/// more than once.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_SUBMITTED,
            Unit::Count,
            "Total number of render submissions, labelled by admission outcome."
        );
        describe_counter!(
            METRIC_REJECTED,
            Unit::Count,
            "Total number of submissions rejected because the queue was closed."
        );
        describe_gauge!(
            METRIC_PENDING,
            Unit::Count,
            "Current number of render jobs waiting for a worker."
        );
        describe_counter!(
            METRIC_COMPLETED,
            Unit::Count,
            "Total number of render jobs finished, labelled by status."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "Render function latency in milliseconds."
        );
        describe_counter!(
            METRIC_WAITER_DROPPED,
            Unit::Count,
            "Total number of outcomes discarded because the waiter had gone away."
        );
    });
}
