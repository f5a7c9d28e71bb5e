//! Configuration for the `ppl` command line.
//!
//! Every section is optional; command line flags override file values.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::ModelKind;
use ppl::{Method, MethodOptions, VizOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Inference method names accepted on the command line and in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MethodName {
    Enumerate,
    Rejection,
    LikelihoodWeighting,
    /// Single-site MCMC with prior proposals.
    Mh,
    /// Single-site MCMC with Gaussian drift on continuous choices.
    Drift,
    Forward,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub viz: VizOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Overrides the model's default method.
    #[serde(default)]
    pub method: Option<MethodName>,

    #[serde(flatten)]
    pub options: MethodOptions,
}

fn default_seed() -> u64 {
    42
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            method: None,
            options: MethodOptions::default(),
        }
    }
}

impl MethodName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodName::Enumerate => "enumerate",
            MethodName::Rejection => "rejection",
            MethodName::LikelihoodWeighting => "likelihood_weighting",
            MethodName::Mh => "mh",
            MethodName::Drift => "drift",
            MethodName::Forward => "forward",
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let options = &self.inference.options;
        if options.samples == Some(0) {
            return Err(ConfigError::Invalid("samples must be positive".to_string()));
        }
        if options.lag == 0 {
            return Err(ConfigError::Invalid("lag must be positive".to_string()));
        }
        if !(options.drift_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "drift_scale must be positive, got {}",
                options.drift_scale
            )));
        }
        if self.viz.width == 0 || self.viz.bins == 0 || self.viz.grid == 0 {
            return Err(ConfigError::Invalid(
                "viz width, bins and grid must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl InferenceConfig {
    /// Resolve the method to run `kind` with. `name` and `samples` come from
    /// the command line and take precedence over the file.
    pub fn method_for(
        &self,
        kind: ModelKind,
        name: Option<MethodName>,
        samples: Option<usize>,
    ) -> Result<Method, ConfigError> {
        let mut options = self.options.clone();
        if samples.is_some() {
            options.samples = samples;
        }
        if options.samples == Some(0) {
            return Err(ConfigError::Invalid("samples must be positive".to_string()));
        }

        let name = name.or(self.method).map(|name| name.as_str());
        kind.method(name, &options)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# ppl configuration file

[inference]
seed = 42
# method = "drift"   # enumerate | rejection | likelihood_weighting | mh | drift | forward
# samples = 10000
burn = 1000
lag = 1
drift_scale = 0.25
max_executions = 100000
max_attempts = 10000000
# max_score = 0.0    # rejection with soft evidence

[viz]
width = 40
bins = 20
grid = 16
"#;
