//! Deferred-emission queue: `emit` enqueues, a single drain runs once
//! the top-level dispatch chain that triggered it returns to depth
//! zero, re-entrancy during a drain is guarded against, and each hook
//! name has its own recursion bound.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use hookweave_types::HookError;

struct Inner {
    queue: VecDeque<(String, Value, String)>,
    recursion_counts: HashMap<String, u32>,
    draining: bool,
}

/// Owns the process-wide (per-`Framework`-instance) deferred-event queue
/// and the dispatch-depth counter used to decide when to drain it.
pub struct DeferredQueue {
    inner: Mutex<Inner>,
    depth: AtomicUsize,
    bound: u32,
}

impl DeferredQueue {
    pub fn new(bound: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                recursion_counts: HashMap::new(),
                draining: false,
            }),
            depth: AtomicUsize::new(0),
            bound,
        }
    }

    /// Marks entry into a top-level (or nested, while draining) dispatch.
    pub fn enter(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks exit from a dispatch, returning the depth after decrement.
    /// Callers drain only when this reaches zero.
    pub fn exit(&self) -> usize {
        self.depth.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Appends `(hook_name, event, emitter)` to the queue unless
    /// `hook_name`'s recursion counter has hit the configured bound, in
    /// which case the enqueue is dropped and `false` is returned so the
    /// caller can surface a `recursion-bound` diagnostic.
    pub async fn enqueue(&self, hook_name: impl Into<String>, event: Value, emitter: impl Into<String>) -> bool {
        let hook_name = hook_name.into();
        let mut inner = self.inner.lock().await;
        let count = inner.recursion_counts.entry(hook_name.clone()).or_insert(0);
        if *count >= self.bound {
            warn!(hook = hook_name.as_str(), bound = self.bound, "deferred emission dropped: recursion bound reached");
            return false;
        }
        *count += 1;
        inner.queue.push_back((hook_name, event, emitter.into()));
        true
    }

    /// Drains the queue by repeatedly popping the front entry and
    /// invoking `dispatch` on it, until empty. Invoking `dispatch`
    /// decrements the entry's recursion counter. A `draining` guard
    /// ensures that if `dispatch` itself triggers a nested drain attempt
    /// (because depth returns to zero inside the drain loop too), that
    /// nested attempt is a no-op rather than a second concurrent drain.
    pub async fn drain_with<F, Fut>(&self, dispatch: F)
    where
        F: Fn(String, Value) -> Fut,
        Fut: Future<Output = Result<Value, HookError>>,
    {
        {
            let mut inner = self.inner.lock().await;
            if inner.draining {
                return;
            }
            inner.draining = true;
        }

        loop {
            let next = {
                let mut inner = self.inner.lock().await;
                inner.queue.pop_front()
            };
            let Some((hook_name, event, _emitter)) = next else {
                break;
            };
            let _ = dispatch(hook_name.clone(), event).await;
            let mut inner = self.inner.lock().await;
            if let Some(count) = inner.recursion_counts.get_mut(&hook_name) {
                *count = count.saturating_sub(1);
            }
        }

        let mut inner = self.inner.lock().await;
        inner.draining = false;
    }
}
