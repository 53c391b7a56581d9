//! Axum route serving the registry snapshot.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::registry::Metrics;

impl Metrics {
    /// Router exposing `GET <server.path>` with the text exposition format.
    ///
    /// The path is read from the configuration at call time; rebuild the
    /// router after re-initializing with a different path.
    pub fn router(&self) -> Router {
        let path = self.config().server.path;
        Router::new()
            .route(&path, get(render_metrics))
            .with_state(self.clone())
    }
}

async fn render_metrics(State(metrics): State<Metrics>) -> Response {
    match metrics.metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "metrics exposition failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.code().as_str()).into_response()
        }
    }
}
