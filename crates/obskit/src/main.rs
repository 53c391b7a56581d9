//! obskit demo service
//!
//! Loads `obskit.yaml` (or `$OBSKIT_CONFIG`), times every request through the
//! metrics middleware, serves the exposition route and emits a small span tree
//! per job.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obskit::{
    config,
    metrics::{MeasureOptions, Metrics},
    tracer::{KeyValue, StartSpanOptions, Tracer},
};

#[derive(Clone)]
struct DemoState {
    tracer: Tracer,
    jobs: std::sync::Arc<obskit::metrics::CounterMeasure>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::var("OBSKIT_CONFIG").unwrap_or_else(|_| "obskit.yaml".into());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = std::env::var("OBSKIT_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .expect("OBSKIT_LISTEN must be a valid SocketAddr");

    let metrics = Metrics::new();
    metrics.init(cfg.metrics.clone()).await.expect("metrics init failed");
    if let Some(addr) = metrics.local_addr().await {
        tracing::info!(%addr, "metrics listener started");
    }

    // the blocking OTLP client must not be built on a runtime thread
    let tracer = Tracer::new();
    if let Some(tracer_cfg) = cfg.tracer.clone() {
        let t = tracer.clone();
        tokio::task::spawn_blocking(move || t.init(tracer_cfg))
            .await
            .expect("tracer init task panicked")
            .expect("tracer init failed");
    }

    let jobs = metrics
        .add_counter_measure(MeasureOptions::new("jobs").labels(["outcome"]))
        .expect("jobs measure");
    let timing = metrics.middleware(["/health"]).expect("request timing");

    let app = Router::new()
        .route("/jobs/:id", get(run_job))
        .route("/health", get(|| async { "ok" }))
        .with_state(DemoState {
            tracer: tracer.clone(),
            jobs,
        });
    let app = timing.layer(app).merge(metrics.router());

    tracing::info!(%listen, "obskit demo starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    metrics.shutdown().await;
    let result = tokio::task::spawn_blocking(move || tracer.shutdown()).await;
    if let Ok(Err(e)) = result {
        tracing::warn!(error = %e, "tracer shutdown failed");
    }
}

async fn run_job(State(state): State<DemoState>, Path(id): Path<String>) -> (StatusCode, String) {
    let outcome = match traced_job(&state.tracer, &id).await {
        Ok(()) => "done",
        Err(e) => {
            tracing::debug!(job = %id, error = %e, "job ran untraced");
            "untraced"
        }
    };
    let labels = obskit::core::label_values([("outcome", outcome)]);
    if let Err(e) = state.jobs.inc(&labels) {
        tracing::warn!(error = %e, "jobs counter update failed");
    }
    (StatusCode::OK, format!("job {id} {outcome}\n"))
}

async fn traced_job(tracer: &Tracer, id: &str) -> obskit::core::Result<()> {
    let job = tracer.start_span(
        StartSpanOptions::new("job")
            .id(id)
            .tags([KeyValue::new("jobId", id.to_string())]),
    )?;
    for step in ["fetch", "process"] {
        let mut span = tracer.start_span(StartSpanOptions::new(step).id(id))?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        span.add_tag([KeyValue::new("step", step)]);
        span.finish();
    }
    job.finish();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
