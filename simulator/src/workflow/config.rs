use anyhow::{bail, Context};
use rivelcore::prelude::{FilterPolicy, InterpMethod};
use rivelcore::VelocitySource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub ensembles: usize,
    pub seed: u64,
    /// Navigation reference: "BT", "GGA", or "VTG".
    pub nav_reference: String,
    pub composite: bool,
    pub difference_filter: FilterPolicy,
    pub vertical_filter: FilterPolicy,
    pub interp_method: InterpMethod,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ensembles: 600,
            seed: 0,
            nav_reference: "BT".to_string(),
            composite: false,
            difference_filter: FilterPolicy::Auto,
            vertical_filter: FilterPolicy::Auto,
            interp_method: InterpMethod::Linear,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.nav_source()?;
        Ok(config)
    }

    pub fn from_args(ensembles: usize, seed: u64, composite: bool) -> Self {
        Self {
            ensembles,
            seed,
            composite,
            ..Default::default()
        }
    }

    pub fn nav_source(&self) -> anyhow::Result<VelocitySource> {
        match self.nav_reference.as_str() {
            "BT" => Ok(VelocitySource::BottomTrack),
            "GGA" => Ok(VelocitySource::Gga),
            "VTG" => Ok(VelocitySource::Vtg),
            other => bail!("unknown navigation reference {other:?}"),
        }
    }

    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            ensembles: self.ensembles,
            seed: self.seed,
            ..Default::default()
        }
    }
}
