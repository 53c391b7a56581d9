use serde::Deserialize;
use obskit_core::error::{ObsError, Result};

use super::measure::is_valid_metric_name;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MetricsConfig {
    /// Also register the process default collectors.
    #[serde(default)]
    pub collect_default: bool,

    #[serde(default)]
    pub server: ServerSection,

    /// Prepended to every measure name.
    #[serde(default)]
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            collect_default: false,
            server: ServerSection::default(),
            prefix: String::new(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.is_empty() && !is_valid_metric_name(&self.prefix) {
            return Err(ObsError::Validation(format!(
                "prefix {:?} is not a valid metric name prefix",
                self.prefix
            )));
        }

        self.server.validate()?;

        Ok(())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_collect_default(mut self, collect: bool) -> Self {
        self.collect_default = collect;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = Some(port);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.server.path = path.into();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// When set, an internal listener serves the metrics route on this port.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: None,
            path: default_path(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(ObsError::Validation(
                "server.path must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

fn default_path() -> String {
    "/metrics".into()
}
