use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::base::Event;


pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;


pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Vec<EventHandler>>>>,
}

impl EventBus {

    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }


    pub async fn register(&self, event_type: &str, handler: EventHandler) {
        let mut handlers = self.handlers.write().await;
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        debug!("Registered handler for event type: {}", event_type);
    }

    /// Runs every handler for the event on its own task and waits for all of them.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;

        let Some(event_handlers) = handlers.get(&event.event_type) else {
            debug!("No handlers for event type: {}", event.event_type);
            return;
        };

        let tasks: Vec<_> = event_handlers
            .iter()
            .map(|handler| {
                let handler = Arc::clone(handler);
                let event = event.clone();
                tokio::spawn(async move {
                    handler(event);
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!("Event handler for {} failed: {}", event.event_type, e);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
