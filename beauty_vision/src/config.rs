// THEORY:
// A session is fully described by plain records for the initial beauty
// parameters and for the pipeline and stream settings. `BeautyConfig` bundles
// them for storage as JSON.
//
// Every section and field carries `#[serde(default)]`, so a config file only
// needs the values it changes and `{}` is a valid configuration. Live parameter
// changes do not go through this file; they travel over the `ParameterChannel`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_modules::parameters::BeautyParameters;
use crate::error::{BeautyError, Result};
use crate::parallel_pipeline::StreamConfig;
use crate::pipeline::PipelineConfig;

/// Everything needed to start a session. Missing sections and fields fall back
/// to their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautyConfig {
    /// Initial value of the parameter channel.
    pub parameters: BeautyParameters,
    pub pipeline: PipelineConfig,
    pub stream: StreamConfig,
}

impl BeautyConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| BeautyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON, suitable for `load`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload).map_err(|source| BeautyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
