//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `DIABETES_API_PORT`
pub const ENV_PREFIX: &str = "DIABETES_API";

/// Model location used when none is configured, relative to the executable
pub const DEFAULT_MODEL_PATH: &str = "models/logistic_model.json";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Address to bind the HTTP server to
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Classifier artifact; relative paths resolve against the executable directory
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Expected SHA256 of the artifact, checked before parsing
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            host: default_host(),
            port: default_port(),
            model_path: None,
            model_sha256: None,
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `diabetes-api` file and the environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("diabetes-api").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            );
        Self::from_builder(builder)
    }

    /// Deserialize from an already assembled set of sources
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the model path against the directory holding the executable
    pub fn resolve_model_path(&self) -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Failed to locate service executable")?;
        let base = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(self.model_path_from(base))
    }

    /// Resolve the model path against an explicit base directory
    pub fn model_path_from(&self, base: &Path) -> PathBuf {
        let configured = self
            .model_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        if configured.is_absolute() {
            configured
        } else {
            base.join(configured)
        }
    }
}
