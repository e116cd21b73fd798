//! Domain events
//!
//! Handlers publish through an [`EventPublisher`] injected with the call
//! context. The publisher only holds a weak reference to its sink, so once a
//! session is gone anything still in flight publishes into nothing.

use edgar_core::{Error, ErrorKind, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResourceUpdate,
    ToolCall,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::ResourceUpdate, EventKind::ToolCall, EventKind::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ResourceUpdate => "resource-update",
            EventKind::ToolCall => "tool-call",
            EventKind::Error => "error",
        }
    }

    /// Comma list such as `tool-call,error`; empty input selects everything.
    pub fn parse_list(raw: Option<&str>) -> Result<Vec<EventKind>> {
        let mut kinds = Vec::new();
        for part in raw.unwrap_or("").split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            kinds.extend(Self::ALL);
        }
        Ok(kinds)
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::bad_input(format!("Unknown event kind '{}'", s)))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DomainEvent {
    /// An upstream resource was fetched.
    ResourceUpdate { uri: String },
    /// A tool finished, successfully or not.
    ToolCall { tool: String, ok: bool },
    Error {
        kind: ErrorKind,
        message: String,
        source: String,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::ResourceUpdate { .. } => EventKind::ResourceUpdate,
            DomainEvent::ToolCall { .. } => EventKind::ToolCall,
            DomainEvent::Error { .. } => EventKind::Error,
        }
    }
}

/// Receiver side of an [`EventPublisher`].
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

#[derive(Clone, Default)]
pub struct EventPublisher {
    sink: Option<Weak<dyn EventSink>>,
}

impl EventPublisher {
    pub fn new(sink: Weak<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn to(sink: &Arc<dyn EventSink>) -> Self {
        Self::new(Arc::downgrade(sink))
    }

    /// Publisher that drops everything.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn publish(&self, event: DomainEvent) {
        debug!(event = %event.kind(), ?event, "Domain event");
        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            sink.publish(event);
        }
    }

    pub fn resource_update(&self, uri: impl Into<String>) {
        self.publish(DomainEvent::ResourceUpdate { uri: uri.into() });
    }

    pub fn tool_call(&self, tool: &str, ok: bool) {
        self.publish(DomainEvent::ToolCall {
            tool: tool.to_string(),
            ok,
        });
    }

    pub fn error(&self, kind: ErrorKind, message: impl Into<String>, source: impl Into<String>) {
        self.publish(DomainEvent::Error {
            kind,
            message: message.into(),
            source: source.into(),
        });
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("attached", &self.sink.as_ref().map_or(false, |s| s.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<DomainEvent>>);

    impl EventSink for Recorder {
        fn publish(&self, event: DomainEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_event_serialization() {
        let value = serde_json::to_value(DomainEvent::ToolCall { tool: "get-company-facts".into(), ok: true }).unwrap();
        assert_eq!(value["type"], "tool-call");
        assert_eq!(value["ok"], true);

        let value = serde_json::to_value(DomainEvent::Error {
            kind: ErrorKind::BadInput,
            message: "bad".into(),
            source: "x".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "BadInput");
    }

    #[test]
    fn test_publisher_delivers_in_order() {
        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn EventSink> = recorder.clone();
        let publisher = EventPublisher::to(&sink);

        publisher.resource_update("/submissions/CIK0000320193.json");
        publisher.tool_call("get-company-submissions", true);

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::ResourceUpdate);
        assert_eq!(events[1].kind(), EventKind::ToolCall);
    }

    #[test]
    fn test_publisher_outliving_sink_is_noop() {
        let sink: Arc<dyn EventSink> = Arc::new(Recorder::default());
        let publisher = EventPublisher::to(&sink);
        drop(sink);
        publisher.tool_call("late", false);
        EventPublisher::disabled().tool_call("nowhere", true);
    }

    #[test]
    fn test_parse_kind_list() {
        assert_eq!(EventKind::parse_list(None).unwrap().len(), 3);
        assert_eq!(
            EventKind::parse_list(Some("error, tool-call,error")).unwrap(),
            vec![EventKind::Error, EventKind::ToolCall]
        );
        assert!(EventKind::parse_list(Some("everything")).is_err());
    }
}
