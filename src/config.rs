//! Settings for the field solver.
//!
//! The defaults match the tolerances the coil editor has always used, so a missing
//! configuration file gives the same results as an empty one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;
use crate::quadrature::QuadOptions;

/// Tunable parameters of the Biot-Savart integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Absolute error tolerance of each line integral.
    pub epsabs: f64,
    /// Relative error tolerance of each line integral.
    pub epsrel: f64,
    /// Maximum number of adaptive subintervals per integral.
    pub limit: usize,
    /// Number of grid points handed to a worker thread at a time.
    pub batch_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            epsabs: 1e-6,
            epsrel: 1e-6,
            limit: 50,
            batch_size: 1024,
        }
    }
}

impl SolverConfig {
    pub fn quad_options(&self) -> QuadOptions {
        QuadOptions {
            epsabs: self.epsabs,
            epsrel: self.epsrel,
            limit: self.limit,
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<SolverConfig, WorkspaceError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<SolverConfig, WorkspaceError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Loads a configuration file. Files ending in `.json` are read as JSON, anything
    /// else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SolverConfig, WorkspaceError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SolverConfig::from_json_str(&contents),
            _ => SolverConfig::from_yaml_str(&contents),
        }
    }
}
