use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Events emitted while a session generates and publishes forms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Generation events
    GenerationStarted {
        provider: String,
        model: String,
    },
    GenerationCompleted {
        title: String,
        questions: usize,
    },
    GenerationFailed {
        error: String,
    },

    // Auth events
    SignedIn,
    AuthFailed {
        error: String,
    },

    // Publish events
    PublishStarted {
        title: String,
    },
    PublishCompleted {
        responder_uri: String,
        requests: usize,
    },
    /// The form was created but its content could not be applied.
    PublishIncomplete {
        form_id: String,
        responder_uri: String,
        error: String,
    },
    PublishFailed {
        error: String,
    },
}

/// Event bus for component communication
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics from events
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    pub forms_generated: usize,
    pub generation_failures: usize,
    pub forms_published: usize,
    pub publish_failures: usize,
    pub orphaned_forms: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::GenerationCompleted { .. } => metrics.forms_generated += 1,
            Event::GenerationFailed { .. } => metrics.generation_failures += 1,
            Event::PublishCompleted { .. } => metrics.forms_published += 1,
            Event::PublishIncomplete { .. } => {
                metrics.publish_failures += 1;
                metrics.orphaned_forms += 1;
            }
            Event::PublishFailed { .. } => metrics.publish_failures += 1,
            _ => {}
        }
    }
}

/// Trait for components that can emit events
#[async_trait::async_trait]
pub trait EventEmitter {
    fn set_event_bus(&mut self, bus: Arc<EventBus>);

    async fn emit_event(&self, event: Event) -> Result<()>;
}

/// Helper macro to implement EventEmitter trait
#[macro_export]
macro_rules! impl_event_emitter {
    ($type:ty) => {
        #[async_trait::async_trait]
        impl EventEmitter for $type {
            fn set_event_bus(&mut self, bus: Arc<EventBus>) {
                self.event_bus = Some(bus);
            }

            async fn emit_event(&self, event: Event) -> anyhow::Result<()> {
                if let Some(bus) = &self.event_bus {
                    bus.emit(event).await
                } else {
                    Ok(())
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let bus = EventBus::new(100);
        let mut receiver = bus.subscribe();

        bus.emit(Event::PublishStarted { title: "Survey".to_string() })
            .await
            .unwrap();

        match receiver.recv().await.unwrap() {
            Event::PublishStarted { title } => assert_eq!(title, "Survey"),
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert!(bus.emit(Event::SignedIn).await.is_ok());
    }

    #[tokio::test]
    async fn test_metrics_update() {
        let bus = EventBus::new(100);

        bus.emit(Event::GenerationCompleted { title: "T".to_string(), questions: 3 })
            .await
            .unwrap();
        bus.emit(Event::PublishIncomplete {
            form_id: "abc".to_string(),
            responder_uri: "https://example.test/abc".to_string(),
            error: "boom".to_string(),
        })
        .await
        .unwrap();

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.forms_generated, 1);
        assert_eq!(metrics.publish_failures, 1);
        assert_eq!(metrics.orphaned_forms, 1);
        assert_eq!(metrics.forms_published, 0);
    }
}
