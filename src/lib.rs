

pub mod core;
pub mod db;
pub mod toolkit;
pub mod utils;

pub use core::cache::VsmCache;
pub use core::config::VsmConfig;
pub use core::error::{Result, VsmError};
pub use core::events::EventBus;
pub use db::{GraphStore, MemoryGraph, NodePropertyCache, PatternMatcher, PhraseMatcher};
pub use toolkit::vector_space::VectorSpaceModel;


/// Features whose match distribution does not exceed this are dropped as noise.
pub const CONFIDENCE_INTERVAL: f64 = 0.15;


pub const DEFAULT_VARIANCE: f64 = 1.0;


pub const DEFAULT_DAMPING_FACTOR: f64 = 0.85;


pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 1e-6;


pub const DEFAULT_MAX_ITERATIONS: usize = 200;


/// Upper bound on entries per cache slot.
pub const DEFAULT_CACHE_CAPACITY: usize = 20_000_000;
