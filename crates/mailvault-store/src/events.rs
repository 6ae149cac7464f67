use std::sync::{Arc, Mutex};

use serde_json::Value;

pub const EVENT_MESSAGE_STORED: &str = "message.stored";
pub const EVENT_MESSAGE_STATUS_UPDATED: &str = "message.status_updated";
pub const EVENT_PUSH_FAILED: &str = "message.push_failed";

/// Fire-and-forget notification sink. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event_type: &str, payload: Value);
}

/// Optional sink handle; publishing through `None` is a no-op.
pub type SharedSink = Option<Arc<dyn EventSink>>;

pub(crate) fn emit_event(sink: &SharedSink, event_type: &str, payload: Value) {
    if let Some(sink) = sink {
        tracing::debug!(event = event_type, "Publishing event");
        sink.publish(event_type, payload);
    }
}

/// Sink that records every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn of_type(&self, event_type: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event_type: &str, payload: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push((event_type.to_string(), payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = Arc::new(MemorySink::new());
        let shared: SharedSink = Some(sink.clone());

        emit_event(&shared, EVENT_MESSAGE_STORED, json!({ "message_id": "a" }));
        emit_event(&shared, EVENT_PUSH_FAILED, json!({ "branch": "main" }));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, EVENT_MESSAGE_STORED);
        assert_eq!(sink.of_type(EVENT_PUSH_FAILED), vec![json!({ "branch": "main" })]);
    }

    #[test]
    fn test_missing_sink_is_noop() {
        emit_event(&None, EVENT_MESSAGE_STORED, json!({}));
    }
}
