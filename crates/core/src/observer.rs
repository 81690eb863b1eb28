//! Observer hooks for hosts that render loop progress.
//!
//! Observers are invoked synchronously on the loop's task, in event order.
//! They must not block for long.

use crate::agent::LoopState;
use crate::tool::{ToolCallRequest, ToolOutcome};

/// Receives streamed tokens, tool outcomes, and state transitions.
///
/// Every method defaults to a no-op, so an observer only implements what it
/// renders.
pub trait Observer: Send + Sync {
    /// A chunk of generated text, in generation order.
    fn on_token(&self, _token: &str) {}

    /// A tool call finished (successfully or not).
    fn on_tool(&self, _call: &ToolCallRequest, _outcome: &ToolOutcome) {}

    /// The loop moved into `state`. `message` may be empty.
    fn on_state(&self, _state: LoopState, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

type TokenFn = Box<dyn Fn(&str) + Send + Sync>;
type ToolFn = Box<dyn Fn(&ToolCallRequest, &ToolOutcome) + Send + Sync>;
type StateFn = Box<dyn Fn(LoopState, &str) + Send + Sync>;

/// Observer built from closures. Unset callbacks are skipped.
#[derive(Default)]
pub struct FnObserver {
    token: Option<TokenFn>,
    tool: Option<ToolFn>,
    state: Option<StateFn>,
}

impl FnObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_token(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.token = Some(Box::new(f));
        self
    }

    pub fn on_tool(
        mut self,
        f: impl Fn(&ToolCallRequest, &ToolOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.tool = Some(Box::new(f));
        self
    }

    pub fn on_state(mut self, f: impl Fn(LoopState, &str) + Send + Sync + 'static) -> Self {
        self.state = Some(Box::new(f));
        self
    }
}

impl Observer for FnObserver {
    fn on_token(&self, token: &str) {
        if let Some(f) = &self.token {
            f(token);
        }
    }

    fn on_tool(&self, call: &ToolCallRequest, outcome: &ToolOutcome) {
        if let Some(f) = &self.tool {
            f(call, outcome);
        }
    }

    fn on_state(&self, state: LoopState, message: &str) {
        if let Some(f) = &self.state {
            f(state, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn fn_observer_routes_callbacks() {
        let tokens = Arc::new(Mutex::new(String::new()));
        let states = Arc::new(Mutex::new(Vec::new()));

        let t = tokens.clone();
        let s = states.clone();
        let observer = FnObserver::new()
            .on_token(move |tok| t.lock().unwrap().push_str(tok))
            .on_state(move |state, _| s.lock().unwrap().push(state));

        Observer::on_token(&observer, "Hel");
        Observer::on_token(&observer, "lo");
        Observer::on_state(&observer, LoopState::Done, "");
        // unset callback is a no-op
        Observer::on_tool(
            &observer,
            &ToolCallRequest::new("call_0", "x", Default::default()),
            &ToolOutcome::success(""),
        );

        assert_eq!(*tokens.lock().unwrap(), "Hello");
        assert_eq!(*states.lock().unwrap(), vec![LoopState::Done]);
    }
}
