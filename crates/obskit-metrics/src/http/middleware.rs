//! Request-timing middleware.
//!
//! Every request that is not excluded is timed into the reserved time measure
//! [`API_REQUEST_MEASURE`] with labels `method`, `route` and `statusCode`.
//! The measure is looked up on each request, so an installed layer keeps
//! recording after the registry is re-initialized.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use obskit_core::error::{ObsError, Result};
use obskit_core::label_values;

use crate::config::MeasureOptions;
use crate::measure::TimeMeasure;
use crate::registry::Metrics;
use crate::tracker::{EndOptions, StartOptions};

/// Name of the auto-created request measure.
pub const API_REQUEST_MEASURE: &str = "API_REQUEST_MEASURE";

const REQUEST_LABELS: [&str; 3] = ["method", "route", "statusCode"];

/// Before/after request hook pair bound to a [`Metrics`] handle.
#[derive(Clone)]
pub struct RequestTiming {
    metrics: Metrics,
    filter: Arc<HashSet<String>>,
}

impl Metrics {
    /// Build the request-timing hook, creating [`API_REQUEST_MEASURE`] on first use.
    ///
    /// Requests whose path is listed in `filter` are not timed.
    pub fn middleware<I, S>(&self, filter: I) -> Result<RequestTiming>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let timing = RequestTiming {
            metrics: self.clone(),
            filter: Arc::new(filter.into_iter().map(Into::into).collect()),
        };
        timing.measure()?;
        Ok(timing)
    }

    fn request_measure(&self) -> Result<Arc<TimeMeasure>> {
        if let Some(measure) = self.get(API_REQUEST_MEASURE)? {
            return measure
                .as_time()
                .cloned()
                .ok_or_else(|| ObsError::NameConflict(measure.name().to_string()));
        }
        let opts = MeasureOptions::new(API_REQUEST_MEASURE).labels(REQUEST_LABELS);
        match self.add_time_measure(opts) {
            Ok(m) => Ok(m),
            // lost a race with another request
            Err(ObsError::NameConflict(name)) => self
                .get(API_REQUEST_MEASURE)?
                .and_then(|m| m.as_time().cloned())
                .ok_or(ObsError::NameConflict(name)),
            Err(e) => Err(e),
        }
    }
}

impl RequestTiming {
    /// The request measure of the current registry, created when missing.
    pub fn measure(&self) -> Result<Arc<TimeMeasure>> {
        self.metrics.request_measure()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.filter.contains(path)
    }

    /// Install the hooks around every route of `router`.
    pub fn layer<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, track_request))
    }

    fn before(&self) -> Result<(Arc<TimeMeasure>, String)> {
        let measure = self.measure()?;
        let id = measure.start(StartOptions::default())?;
        Ok((measure, id))
    }
}

fn after(measure: &TimeMeasure, id: String, method: String, route: String, status: u16) {
    let labels = label_values([
        ("method", method),
        ("route", route),
        ("statusCode", status.to_string()),
    ]);
    if let Err(e) = measure.end(EndOptions::new(id).label_values(labels)) {
        tracing::warn!(error = %e, "request timing dropped");
    }
}

async fn track_request(State(timing): State<RequestTiming>, req: Request, next: Next) -> Response {
    if timing.is_excluded(req.uri().path()) {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let (measure, id) = match timing.before() {
        Ok(started) => started,
        Err(e) => {
            tracing::warn!(error = %e, "request timing unavailable");
            return next.run(req).await;
        }
    };
    let response = next.run(req).await;
    after(&measure, id, method, route, response.status().as_u16());
    response
}
