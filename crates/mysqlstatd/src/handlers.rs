//! HTTP request handlers: telemetry endpoint, landing page and health.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

use crate::exposition;

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

/// Runs one poll through the registry and renders the text exposition format.
/// The poll blocks on database I/O, so it runs on the blocking pool.
pub(crate) async fn handle_metrics(State(registry): State<Arc<Registry>>) -> Response {
    let encoded = tokio::task::spawn_blocking(move || encode(&registry)).await;

    match encoded {
        Ok(Ok(body)) => (
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!(error = %e, "metrics task panicked in spawn_blocking");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn encode(registry: &Registry) -> prometheus::Result<Vec<u8>> {
    let families = registry.gather();
    let mut buffer = Vec::new();
    exposition::encode_text(&families, &mut buffer)?;
    Ok(buffer)
}

pub(crate) async fn handle_landing(page: Arc<str>) -> Html<String> {
    Html(page.to_string())
}

pub(crate) fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>MySQL exporter</title></head>\n\
         <body>\n\
         <h1>MySQL exporter</h1>\n\
         <p><a href=\"{telemetry_path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}
