//! Tracing subscriber setup.

use crate::LoggingConfig;
use chronicler_error::{ChroniclerError, ChroniclerResult, ConfigError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. With the `observability`
/// feature, spans are also exported to stdout through OpenTelemetry.
///
/// Fails if the filter directive is invalid or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> ChroniclerResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level()))
        .map_err(|e| {
            ChroniclerError::from(ConfigError::invalid_value(
                "logging.level",
                config.level(),
                e,
            ))
        })?;

    let fmt_layer = if *config.json() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    #[cfg(feature = "observability")]
    let registry = registry.with(otel::layer());

    registry.try_init().map_err(|e| {
        ChroniclerError::from(ConfigError::new(format!(
            "Failed to install tracing subscriber: {}",
            e
        )))
    })
}

#[cfg(feature = "observability")]
mod otel {
    use opentelemetry::{KeyValue, global, trace::TracerProvider};
    use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
    use opentelemetry_stdout::SpanExporter;
    use tracing::Subscriber;
    use tracing_subscriber::{Layer, registry::LookupSpan};

    const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

    pub(super) fn layer<S>() -> impl Layer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let resource = Resource::builder()
            .with_service_name(SERVICE_NAME)
            .with_attributes(vec![KeyValue::new(
                "service.version",
                env!("CARGO_PKG_VERSION"),
            )])
            .build();

        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_resource(resource)
            .build();
        global::set_tracer_provider(provider.clone());

        tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
    }
}
