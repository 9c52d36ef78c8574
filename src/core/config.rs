use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::toolkit::vector_space::PageRankConfig;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VsmConfig {
    /// A feature is confident when its match-distribution deviation is strictly above this.
    pub confidence_interval: f64,

    pub damping_factor: f64,
    pub convergence_tolerance: f64,
    pub max_iterations: usize,

    /// Multiplier applied to `(pagerank + variance) / 2` for input-text vectors.
    pub affinity_scale: f64,

    pub matrix_decimals: u32,

    /// Entry bound per cache slot. Eviction is size-based only.
    pub cache_capacity: usize,
}

impl VsmConfig {

    pub fn new() -> Self {
        Self {
            confidence_interval: crate::CONFIDENCE_INTERVAL,
            damping_factor: crate::DEFAULT_DAMPING_FACTOR,
            convergence_tolerance: crate::DEFAULT_CONVERGENCE_TOLERANCE,
            max_iterations: crate::DEFAULT_MAX_ITERATIONS,
            affinity_scale: 10.0,
            matrix_decimals: 5,
            cache_capacity: crate::DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Defaults, then the optional file, then `VSM_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("VSM").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn pagerank(&self) -> PageRankConfig {
        PageRankConfig {
            damping_factor: self.damping_factor,
            tolerance: self.convergence_tolerance,
            max_iterations: self.max_iterations,
        }
    }
}

impl Default for VsmConfig {
    fn default() -> Self {
        Self::new()
    }
}
