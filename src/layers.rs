use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use color_eyre::eyre::Report;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

/// Installs `color-eyre` and the global subscriber: pretty stderr output,
/// `RUST_LOG` filtering and span traces for error reports.
pub fn init_tracing() -> Result<(), Report> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    color_eyre::install()?;

    let format_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives()))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}

fn default_directives() -> String {
    let crate_name = env!("CARGO_CRATE_NAME");
    format!("warn,{crate_name}=debug,tower_http=debug,axum::rejection=trace")
}

type Classifier = SharedClassifier<ServerErrorsAsFailures>;

/// One `http_request` span per request, closed with status and latency.
#[must_use]
pub fn trace_layer() -> TraceLayer<
    Classifier,
    impl Clone + Fn(&Request<Body>) -> Span,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let matched_path = request
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str);
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                matched_path,
                path = request.uri().path(),
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
