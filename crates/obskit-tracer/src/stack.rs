//! Per-flow span stacks.
//!
//! Each flow id maps to a LIFO of the spans started under it and not yet
//! finished. The top entry is the implicit parent of the next span started
//! under the same flow. Empty stacks are dropped from the map.

use dashmap::DashMap;
use opentelemetry::trace::SpanContext;

/// Stack entry for a started span.
#[derive(Debug, Clone)]
pub struct ActiveSpan {
    /// Flow id the span was started under.
    pub id: String,
    pub name: String,
    pub span_context: SpanContext,
}

#[derive(Debug, Default)]
pub struct SpanStacks {
    stacks: DashMap<String, Vec<ActiveSpan>>,
}

impl SpanStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, span: ActiveSpan) {
        self.stacks.entry(span.id.clone()).or_default().push(span);
    }

    /// Most recently pushed span for `id`, if any.
    pub fn top(&self, id: &str) -> Option<ActiveSpan> {
        self.stacks.get(id).and_then(|s| s.last().cloned())
    }

    /// Remove and return the top of `id`'s stack; drops the stack once empty.
    pub fn pop(&self, id: &str) -> Option<ActiveSpan> {
        let popped = {
            let mut stack = self.stacks.get_mut(id)?;
            stack.pop()
        };
        self.stacks.remove_if(id, |_, s| s.is_empty());
        popped
    }

    pub fn depth(&self, id: &str) -> usize {
        self.stacks.get(id).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of flows with at least one active span.
    pub fn flows(&self) -> usize {
        self.stacks.len()
    }

    pub fn clear(&self) {
        self.stacks.clear();
    }
}
