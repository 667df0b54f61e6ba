//! State Tracker: a state machine exposed as a privileged built-in
//! plugin with wait-for-state semantics. Like
//! [`crate::introspection`], it keeps a `Weak` handle straight to
//! [`FrameworkInner`] for the parts of its job (deferred emission of the
//! three derived events, direct history storage) that go beyond what the
//! restricted `PluginContext` is meant to expose.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

use hookweave_types::HookError;

use crate::factory::FrameworkInner;
use crate::hooks::{ClosureHandler, HookOutcome};
use crate::plugin::{Plugin, PluginContext};

/// One entry in the bounded history, and the shape of "the current
/// state".
#[derive(Debug, Clone, serde::Serialize)]
pub struct StateRecord {
    pub status: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub previous: String,
}

/// An optional schema constraining allowed states and transitions,
/// registered via `api:registerStateSchema`.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct StateSchema {
    states: Vec<String>,
    transitions: Vec<(String, String)>,
}

impl StateSchema {
    fn allows(&self, from: &str, to: &str) -> Result<(), HookError> {
        if !self.states.is_empty() && !self.states.iter().any(|s| s == to) {
            return Err(HookError::invalid_transition(format!(
                "state '{to}' is not in the registered schema"
            )));
        }
        if !self.transitions.is_empty()
            && !self.transitions.iter().any(|(f, t)| f == from && t == to)
        {
            return Err(HookError::invalid_transition(format!(
                "transition '{from}' -> '{to}' is not declared in the registered schema"
            )));
        }
        Ok(())
    }
}

struct TrackerState {
    current: StateRecord,
    history: Vec<StateRecord>,
    capacity: usize,
    schema: Option<StateSchema>,
    waiters: HashMap<String, Vec<oneshot::Sender<StateRecord>>>,
}

impl TrackerState {
    fn new(capacity: usize) -> Self {
        Self {
            current: StateRecord {
                status: "idle".to_string(),
                data: Value::Null,
                timestamp: Utc::now(),
                previous: String::new(),
            },
            history: Vec::new(),
            capacity,
            schema: None,
            waiters: HashMap::new(),
        }
    }

    fn push_history(&mut self, record: StateRecord) {
        self.history.push(record);
        if self.history.len() > self.capacity {
            let overflow = self.history.len() - self.capacity;
            self.history.drain(0..overflow);
        }
    }
}

pub struct StateTrackerPlugin {
    framework: Weak<FrameworkInner>,
    default_timeout_ms: u64,
    state: Arc<Mutex<TrackerState>>,
}

impl StateTrackerPlugin {
    pub fn new(framework: Weak<FrameworkInner>, history_capacity: usize, default_timeout_ms: u64) -> Self {
        Self {
            framework,
            default_timeout_ms,
            state: Arc::new(Mutex::new(TrackerState::new(history_capacity))),
        }
    }
}

#[async_trait]
impl Plugin for StateTrackerPlugin {
    fn name(&self) -> Option<&str> {
        Some("state-tracker")
    }

    async fn setup(&self, ctx: PluginContext) -> Result<(), HookError> {
        let state = self.state.clone();
        ctx.on(
            "api:getCurrentState",
            0,
            Arc::new(ClosureHandler::new(move |_event| {
                let state = state.clone();
                async move {
                    let tracker = state.lock().await;
                    Ok(HookOutcome::ok(json!({
                        "status": tracker.current.status,
                        "data": tracker.current.data,
                        "timestamp": tracker.current.timestamp,
                    })))
                }
            })),
        )
        .await?;

        let state = self.state.clone();
        let framework = self.framework.clone();
        ctx.on(
            "api:setState",
            0,
            Arc::new(ClosureHandler::new(move |event| {
                let state = state.clone();
                let framework = framework.clone();
                async move { set_state(&state, &framework, event).await }
            })),
        )
        .await?;

        let state = self.state.clone();
        let default_timeout_ms = self.default_timeout_ms;
        ctx.on(
            "api:waitForState",
            0,
            Arc::new(ClosureHandler::new(move |event| {
                let state = state.clone();
                async move { wait_for_state(&state, event, default_timeout_ms).await }
            })),
        )
        .await?;

        let state = self.state.clone();
        ctx.on(
            "api:getStateHistory",
            0,
            Arc::new(ClosureHandler::new(move |_event| {
                let state = state.clone();
                async move {
                    let tracker = state.lock().await;
                    Ok(HookOutcome::ok(json!({
                        "history": tracker.history.iter().map(|r| json!({
                            "status": r.status,
                            "data": r.data,
                            "timestamp": r.timestamp,
                            "previous": r.previous,
                        })).collect::<Vec<_>>(),
                        "capacity": tracker.capacity,
                    })))
                }
            })),
        )
        .await?;

        let state = self.state.clone();
        ctx.on(
            "api:registerStateSchema",
            0,
            Arc::new(ClosureHandler::new(move |event: Value| {
                let state = state.clone();
                async move {
                    let schema: StateSchema = serde_json::from_value(
                        event.get("schema").cloned().unwrap_or(Value::Null),
                    )
                    .unwrap_or_default();
                    state.lock().await.schema = Some(schema);
                    Ok(HookOutcome::undefined())
                }
            })),
        )
        .await?;

        Ok(())
    }
}

async fn set_state(
    state: &Arc<Mutex<TrackerState>>,
    framework: &Weak<FrameworkInner>,
    event: Value,
) -> Result<HookOutcome, HookError> {
    let Some(to) = event.get("state").and_then(Value::as_str).map(str::to_string) else {
        return Ok(HookOutcome::caller_error(HookError::invalid_transition(
            "setState requires a 'state' field",
        )));
    };
    let data = event.get("data").cloned().unwrap_or(Value::Null);

    let (record, waiters) = {
        let mut tracker = state.lock().await;
        let from = tracker.current.status.clone();

        if let Some(schema) = tracker.schema.clone() {
            if let Err(err) = schema.allows(&from, &to) {
                return Ok(HookOutcome::caller_error(err));
            }
        }

        let record = StateRecord {
            status: to.clone(),
            data: data.clone(),
            timestamp: Utc::now(),
            previous: from.clone(),
        };
        tracker.push_history(record.clone());
        tracker.current = record.clone();
        let waiters = tracker.waiters.remove(&to).unwrap_or_default();
        (record, waiters)
    };

    for waiter in waiters {
        let _ = waiter.send(record.clone());
    }

    if let Some(fw) = framework.upgrade() {
        let from = record.previous.clone();
        let to = record.status.clone();
        let _ = fw
            .deferred
            .enqueue(
                "state:transition",
                json!({ "from": from, "to": to, "data": data, "timestamp": record.timestamp }),
                "state-tracker",
            )
            .await;
        let _ = fw
            .deferred
            .enqueue(
                format!("state:entered:{to}"),
                json!({ "from": from, "data": data }),
                "state-tracker",
            )
            .await;
        let _ = fw
            .deferred
            .enqueue(
                format!("state:exited:{from}"),
                json!({ "to": to, "data": data }),
                "state-tracker",
            )
            .await;
    }

    Ok(HookOutcome::ok(json!({
        "status": record.status,
        "data": record.data,
        "timestamp": record.timestamp,
        "previous": record.previous,
    })))
}

async fn wait_for_state(
    state: &Arc<Mutex<TrackerState>>,
    event: Value,
    default_timeout_ms: u64,
) -> Result<HookOutcome, HookError> {
    let Some(target) = event.get("state").and_then(Value::as_str).map(str::to_string) else {
        return Ok(HookOutcome::caller_error(HookError::invalid_transition(
            "waitForState requires a 'state' field",
        )));
    };
    let timeout_ms = event
        .get("timeout")
        .and_then(Value::as_u64)
        .unwrap_or(default_timeout_ms);

    {
        let tracker = state.lock().await;
        if tracker.current.status == target {
            let record = tracker.current.clone();
            return Ok(HookOutcome::ok(json!({
                "status": record.status,
                "data": record.data,
                "timestamp": record.timestamp,
                "previous": record.previous,
            })));
        }
    }

    if timeout_ms == 0 {
        return Ok(HookOutcome::caller_error(HookError::timeout(format!(
            "waitForState('{target}') timed out immediately (timeout <= 0)"
        ))));
    }

    let (tx, rx) = oneshot::channel();
    state
        .lock()
        .await
        .waiters
        .entry(target.clone())
        .or_default()
        .push(tx);

    match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
        Ok(Ok(record)) => Ok(HookOutcome::ok(json!({
            "status": record.status,
            "data": record.data,
            "timestamp": record.timestamp,
            "previous": record.previous,
        }))),
        Ok(Err(_)) => Ok(HookOutcome::caller_error(HookError::internal(
            "state waiter channel closed unexpectedly",
        ))),
        Err(_) => Ok(HookOutcome::caller_error(HookError::timeout(format!(
            "waitForState('{target}') timed out after {timeout_ms}ms"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_respects_capacity() {
        let tracker = Arc::new(Mutex::new(TrackerState::new(2)));
        {
            let mut t = tracker.lock().await;
            t.push_history(StateRecord {
                status: "a".into(),
                data: Value::Null,
                timestamp: Utc::now(),
                previous: "idle".into(),
            });
            t.push_history(StateRecord {
                status: "b".into(),
                data: Value::Null,
                timestamp: Utc::now(),
                previous: "a".into(),
            });
            t.push_history(StateRecord {
                status: "c".into(),
                data: Value::Null,
                timestamp: Utc::now(),
                previous: "b".into(),
            });
        }
        let t = tracker.lock().await;
        assert_eq!(t.history.len(), 2);
        assert_eq!(t.history.last().unwrap().status, "c");
    }

    #[test]
    fn schema_rejects_undeclared_transition() {
        let schema = StateSchema {
            states: vec!["idle".into(), "loading".into()],
            transitions: vec![("idle".into(), "loading".into())],
        };
        assert!(schema.allows("idle", "loading").is_ok());
        assert!(schema.allows("loading", "idle").is_err());
    }
}
