

pub mod cache;
pub mod config;
pub mod error;
pub mod events;

pub use cache::{CacheKind, CacheStats, VsmCache};
pub use config::VsmConfig;
pub use error::{Result, VsmError};
pub use events::{Event, EventBus, GraphMutation};
