//! Run events
//!
//! The engine reports progress through an [`EventSink`]: every node firing,
//! pruned branch, cache hit and budget cut-off. Sinks decide what to do
//! with them; the engine never fails a run because a sink refused an event.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Trait for receiving run events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered
    fn send(&self, event: RunEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while running a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    /// A top-level run started
    #[serde(rename_all = "camelCase")]
    RunStarted { execution_id: String },

    /// A node's runner is about to be invoked
    #[serde(rename_all = "camelCase")]
    NodeFired {
        execution_id: String,
        /// Name of the function whose program contains the node ("main" at top level)
        caller: String,
        node_id: String,
        function: String,
    },

    /// A stop value was produced and its edge was not followed
    #[serde(rename_all = "camelCase")]
    BranchStopped {
        execution_id: String,
        node_id: String,
        key: String,
    },

    /// A result was served from the memoization cache
    #[serde(rename_all = "camelCase")]
    CacheHit { execution_id: String, key: String },

    /// The step budget ran out with frames still pending
    #[serde(rename_all = "camelCase")]
    BudgetExhausted {
        execution_id: String,
        caller: String,
        pending: Vec<String>,
    },

    /// A top-level run finished
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        execution_id: String,
        outputs: Vec<String>,
    },

    /// A top-level run failed
    #[serde(rename_all = "camelCase")]
    RunFailed { execution_id: String, error: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: RunEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for tests that assert on firing order.
pub struct VecEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `(caller, node_id)` of every fired node, in order
    pub fn fired(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::NodeFired {
                    caller, node_id, ..
                } => Some((caller, node_id)),
                _ => None,
            })
            .collect()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}

/// Forwards node firings to a `(caller, node_id)` callback and drops the rest
pub struct FnEventSink<F> {
    callback: F,
}

impl<F> FnEventSink<F>
where
    F: Fn(&str, &str) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventSink for FnEventSink<F>
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        if let RunEvent::NodeFired {
            caller, node_id, ..
        } = &event
        {
            (self.callback)(caller, node_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(node_id: &str) -> RunEvent {
        RunEvent::NodeFired {
            execution_id: "exec1".to_string(),
            caller: "main".to_string(),
            node_id: node_id.to_string(),
            function: "math.add".to_string(),
        }
    }

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(fired("a")).unwrap();
        sink.send(RunEvent::CacheHit {
            execution_id: "exec1".to_string(),
            key: "fib::{}".to_string(),
        })
        .unwrap();
        sink.send(fired("b")).unwrap();

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.fired(),
            vec![
                ("main".to_string(), "a".to_string()),
                ("main".to_string(), "b".to_string())
            ]
        );
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_fn_event_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = FnEventSink::new(|caller: &str, node_id: &str| {
            seen.lock().unwrap().push(format!("{}/{}", caller, node_id));
        });
        sink.send(fired("x")).unwrap();
        sink.send(RunEvent::RunStarted {
            execution_id: "exec1".to_string(),
        })
        .unwrap();
        drop(sink);
        assert_eq!(seen.into_inner().unwrap(), vec!["main/x".to_string()]);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(fired("n1")).unwrap();
        assert_eq!(json["type"], "nodeFired");
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["executionId"], "exec1");
    }

    #[test]
    fn test_null_event_sink() {
        NullEventSink.send(fired("a")).unwrap();
    }
}
