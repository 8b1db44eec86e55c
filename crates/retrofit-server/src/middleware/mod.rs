//! HTTP middleware
//!
//! - Request logging with tracing
//! - Echoing the caller's correlation id on every response

use axum::http::HeaderName;
use tower_http::{
    propagate_header::PropagateHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

/// Copy `X-Correlation-ID` from the request onto the response
pub fn correlation_id_layer() -> PropagateHeaderLayer {
    PropagateHeaderLayer::new(HeaderName::from_static(CORRELATION_ID_HEADER))
}
