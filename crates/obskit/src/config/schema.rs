use serde::Deserialize;
use obskit_core::error::Result;
use obskit_metrics::MetricsConfig;
use obskit_tracer::TracerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObskitConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Tracing stays disabled when absent.
    #[serde(default)]
    pub tracer: Option<TracerConfig>,
}

impl ObskitConfig {
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;
        if let Some(tracer) = &self.tracer {
            tracer.validate()?;
        }
        Ok(())
    }
}
