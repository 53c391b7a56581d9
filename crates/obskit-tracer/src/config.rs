//! Tracer configuration (strict parsing + validation).

use serde::Deserialize;
use obskit_core::error::{ObsError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TracerConfig {
    pub service_name: String,

    #[serde(default)]
    pub sampler: SamplerConfig,

    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl TracerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            sampler: SamplerConfig::default(),
            reporter: ReporterConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(ObsError::Validation("tracer serviceName is required".into()));
        }
        self.sampler.validate()?;
        self.reporter.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplerKind {
    /// `param >= 1` samples everything, anything lower samples nothing.
    Const,
    /// Sample a `param` fraction of traces.
    Probabilistic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerConfig {
    #[serde(rename = "type", default = "default_sampler_kind")]
    pub kind: SamplerKind,

    #[serde(default = "default_sampler_param")]
    pub param: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            kind: default_sampler_kind(),
            param: default_sampler_param(),
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.param) {
            return Err(ObsError::Validation(
                "sampler.param must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_sampler_kind() -> SamplerKind {
    SamplerKind::Const
}
fn default_sampler_param() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReporterConfig {
    /// Full OTLP/HTTP traces endpoint. Overrides agent host/port.
    #[serde(default)]
    pub collector_endpoint: Option<String>,

    #[serde(default = "default_agent_host")]
    pub agent_host: String,

    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Log every finished span at debug level.
    #[serde(default)]
    pub log_spans: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            collector_endpoint: None,
            agent_host: default_agent_host(),
            agent_port: default_agent_port(),
            flush_interval_ms: default_flush_interval_ms(),
            log_spans: false,
        }
    }
}

impl ReporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collector_endpoint.is_none() && self.agent_host.is_empty() {
            return Err(ObsError::Validation(
                "reporter.agentHost must not be empty".into(),
            ));
        }
        if !(100..=60000).contains(&self.flush_interval_ms) {
            return Err(ObsError::Validation(
                "reporter.flushIntervalMs must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    /// OTLP/HTTP endpoint spans are exported to.
    pub fn endpoint(&self) -> String {
        match &self.collector_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("http://{}:{}/v1/traces", self.agent_host, self.agent_port),
        }
    }
}

fn default_agent_host() -> String {
    "localhost".into()
}
fn default_agent_port() -> u16 {
    4318
}
fn default_flush_interval_ms() -> u64 {
    1000
}
