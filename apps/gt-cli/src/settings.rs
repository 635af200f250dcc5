//! Solve settings loaded from YAML.

use std::fs;
use std::path::Path;

use gt_graph::RelaxConfig;
use gt_solver::NewtonConfig;
use serde::{Deserialize, Serialize};

use crate::cycle::CycleParams;
use crate::error::{CliError, CliResult};

/// Everything a demo run can be tuned with. Missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveSettings {
    pub relax: RelaxConfig,
    pub newton: NewtonConfig,
    pub cycle: CycleParams,
}

impl SolveSettings {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&text).map_err(|source| CliError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.relax.validate()?;
        self.newton.validate()?;
        self.cycle.validate()?;
        Ok(())
    }
}
