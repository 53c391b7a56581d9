//! Internal listener started when `server.port` is configured.

use std::net::SocketAddr;

use obskit_core::error::{ObsError, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::registry::Metrics;

pub(crate) struct ExpositionServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ExpositionServer {
    pub(crate) async fn start(metrics: Metrics, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await
            .map_err(|e| ObsError::Backend(format!("bind metrics listener on port {port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ObsError::Backend(format!("metrics listener address: {e}")))?;

        let app = metrics.router();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let signal = async move {
                let _ = rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(signal).await {
                tracing::error!(error = %e, "metrics listener failed");
            }
        });

        tracing::info!(%addr, "metrics listener started");
        Ok(Self {
            addr,
            shutdown: tx,
            task,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "metrics listener task ended abnormally");
        }
        tracing::info!(addr = %self.addr, "metrics listener stopped");
    }
}
