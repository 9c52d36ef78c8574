

pub mod base;
pub mod bus;

pub use base::{Event, GraphMutation, GRAPH_MUTATED};
pub use bus::{EventBus, EventHandler};
