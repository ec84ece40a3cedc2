//! Span export to an OTLP collector (Tempo, Jaeger, an OpenTelemetry
//! collector in front of Elasticsearch).

use crate::{BoxedLayer, TelemetryError};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};

/// Build the export pipeline and the layer feeding it.
///
/// Must run inside a Tokio runtime: the batch exporter spawns onto it.
pub(crate) fn span_export_layer(
    service_name: &str,
    endpoint: &str,
) -> Result<(BoxedLayer, TracerProvider), TelemetryError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", service_name.to_string()),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let tracer = provider.tracer(service_name.to_string());
    let layer = tracing_opentelemetry::layer().with_tracer(tracer);

    Ok((Box::new(layer), provider))
}
