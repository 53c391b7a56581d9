//! Caller-owned measure registry.
//!
//! `Metrics` is a cheap handle (`Arc` inside). Measures are keyed by their
//! effective name (`prefix + name`) and each keeps its series in its own
//! backend registry. The shared `prometheus::Registry` only carries the
//! default collectors and is swapped wholesale on `init`.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use obskit_core::error::{ObsError, Result};
use prometheus::{Registry, TextEncoder};

use crate::config::measure::is_valid_metric_name;
use crate::config::{MetricsConfig, MeasureOptions, SummaryOptions, TimeMeasureOptions};
use crate::http::server::ExpositionServer;
use crate::measure::{CounterMeasure, GaugeMeasure, Measure, SummaryMeasure, TimeMeasure};

/// Arguments for [`Metrics::remove_measure_entries`].
#[derive(Debug, Clone, Default)]
pub struct RemoveEntriesOptions {
    pub label_name: String,
    pub label_value: String,
    /// Measure names (without prefix).
    pub metrics_to_remove: Vec<String>,
}

#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    measures: DashMap<String, Measure>,
    state: RwLock<RegistryState>,
    server: tokio::sync::Mutex<Option<ExpositionServer>>,
}

#[derive(Default)]
struct RegistryState {
    registry: Registry,
    config: MetricsConfig,
}

impl Metrics {
    /// An empty registry with the default configuration. Call [`Metrics::init`]
    /// to apply a configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all state and apply `config`.
    ///
    /// Clears every measure, swaps in a fresh backend registry and stops any
    /// running listener before optionally starting a new one. The listener
    /// lock is held throughout, so concurrent `init` calls run one at a time.
    pub async fn init(&self, config: MetricsConfig) -> Result<()> {
        config.validate()?;
        let mut server = self.inner.server.lock().await;
        if let Some(running) = server.take() {
            running.stop().await;
        }

        let registry = Registry::new();
        if config.collect_default {
            register_default_collectors(&registry)?;
        }
        let port = config.server.port;
        tracing::info!(
            prefix = %config.prefix,
            path = %config.server.path,
            collect_default = config.collect_default,
            "metrics registry initialized"
        );
        {
            let mut state = self.write_state();
            self.inner.measures.clear();
            *state = RegistryState { registry, config };
        }

        if let Some(port) = port {
            *server = Some(ExpositionServer::start(self.clone(), port).await?);
        }
        Ok(())
    }

    /// Stop the internal listener, if one is running.
    pub async fn shutdown(&self) {
        let server = self.inner.server.lock().await.take();
        if let Some(server) = server {
            server.stop().await;
        }
    }

    /// Address of the internal listener, if one is running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server.lock().await.as_ref().map(|s| s.local_addr())
    }

    pub fn config(&self) -> MetricsConfig {
        self.read_state().config.clone()
    }

    pub fn prefix(&self) -> String {
        self.read_state().config.prefix.clone()
    }

    /// The backend registry holding the default collectors.
    pub fn registry(&self) -> Registry {
        self.read_state().registry.clone()
    }

    pub fn add_time_measure(&self, opts: impl Into<TimeMeasureOptions>) -> Result<Arc<TimeMeasure>> {
        let opts = opts.into();
        opts.validate()?;
        self.add(&opts.measure.name, |name| TimeMeasure::new(name, &opts), Measure::Time)
    }

    pub fn add_counter_measure(&self, opts: MeasureOptions) -> Result<Arc<CounterMeasure>> {
        opts.validate()?;
        self.add(&opts.name, |name| CounterMeasure::new(name, &opts), Measure::Counter)
    }

    pub fn add_gauge_measure(&self, opts: MeasureOptions) -> Result<Arc<GaugeMeasure>> {
        opts.validate()?;
        self.add(&opts.name, |name| GaugeMeasure::new(name, &opts), Measure::Gauge)
    }

    pub fn add_summary_measure(&self, opts: impl Into<SummaryOptions>) -> Result<Arc<SummaryMeasure>> {
        let opts = opts.into();
        opts.validate()?;
        self.add(&opts.measure.name, |name| SummaryMeasure::new(name, &opts), Measure::Summary)
    }

    fn add<M>(
        &self,
        name: &str,
        build: impl FnOnce(String) -> Result<M>,
        wrap: impl FnOnce(Arc<M>) -> Measure,
    ) -> Result<Arc<M>> {
        // held until the insert so a concurrent `init` cannot interleave
        let state = self.read_state();
        let full = format!("{}{name}", state.config.prefix);
        if !is_valid_metric_name(&full) {
            return Err(ObsError::Validation(format!("{full:?} is not a valid metric name")));
        }

        match self.inner.measures.entry(full.clone()) {
            Entry::Occupied(_) => Err(ObsError::NameConflict(full)),
            Entry::Vacant(slot) => {
                let measure = Arc::new(build(full.clone())?);
                let handle = wrap(Arc::clone(&measure));
                tracing::debug!(name = %full, kind = handle.kind().as_str(), "measure added");
                slot.insert(handle);
                Ok(measure)
            }
        }
    }

    /// Look up a measure by its unprefixed name.
    pub fn get(&self, name: &str) -> Result<Option<Measure>> {
        if name.is_empty() {
            return Err(ObsError::Argument("name must be defined".into()));
        }
        let full = format!("{}{name}", self.prefix());
        Ok(self.inner.measures.get(&full).map(|r| r.value().clone()))
    }

    /// Release and forget a measure. Unknown names are ignored.
    pub fn remove_measure(&self, name: &str) {
        let full = format!("{}{name}", self.prefix());
        if let Some((_, measure)) = self.inner.measures.remove(&full) {
            measure.remove();
            tracing::debug!(name = %full, "measure removed");
        }
    }

    /// Drop the exported entries carrying `label_name = label_value` from each
    /// listed measure, keeping the measure definitions.
    pub fn remove_measure_entries(&self, opts: &RemoveEntriesOptions) {
        for name in &opts.metrics_to_remove {
            let measure = match self.get(name) {
                Ok(Some(m)) => m,
                _ => continue,
            };
            measure.remove_entries_by_label(&opts.label_name, &opts.label_value);
        }
    }

    /// Effective names of every registered measure, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.measures.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.measures.is_empty()
    }

    /// Serialize every registered measure in the text exposition format.
    pub fn metrics(&self) -> Result<String> {
        let mut measures: Vec<(String, Measure)> = self
            .inner
            .measures
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        measures.sort_by(|a, b| a.0.cmp(&b.0));

        let mut families = self.registry().gather();
        for (_, measure) in &measures {
            families.extend(measure.gather());
        }
        let mut out = TextEncoder::new()
            .encode_to_string(&families)
            .map_err(|e| ObsError::Backend(format!("encode failed: {e}")))?;

        for summary in measures.iter().filter_map(|(_, m)| m.as_summary()) {
            summary.render(&mut out);
        }
        Ok(out)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(target_os = "linux")]
fn register_default_collectors(registry: &Registry) -> Result<()> {
    use prometheus::process_collector::ProcessCollector;

    registry
        .register(Box::new(ProcessCollector::for_self()))
        .map_err(|e| ObsError::Backend(format!("process collector: {e}")))
}

#[cfg(not(target_os = "linux"))]
fn register_default_collectors(_registry: &Registry) -> Result<()> {
    tracing::warn!("default process collectors are only available on linux");
    Ok(())
}
