
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::NodeId;


pub const GRAPH_MUTATED: &str = "graph.mutated";


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {

    pub event_id: Uuid,

    pub event_type: String,

    pub timestamp: DateTime<Utc>,

    pub payload: Value,
}

impl Event {

    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            payload,
        }
    }
}


/// A change to the underlying corpus graph, published by whoever owns the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphMutation {
    ClassAdded { class: NodeId },
    PatternAdded { feature: NodeId },
    ClassEdgeChanged { feature: NodeId, class: NodeId },
    AffinityEdgeChanged { from: NodeId, to: NodeId },
}

impl GraphMutation {
    pub fn to_event(&self) -> Event {
        let payload = serde_json::to_value(self).unwrap_or(Value::Null);
        Event::new(GRAPH_MUTATED, payload)
    }

    pub fn from_event(event: &Event) -> Option<Self> {
        if event.event_type != GRAPH_MUTATED {
            return None;
        }
        serde_json::from_value(event.payload.clone()).ok()
    }
}
