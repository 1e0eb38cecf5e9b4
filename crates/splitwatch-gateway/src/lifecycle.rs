//! Response lifecycle: Open -> Finalizing -> Sent.
//!
//! Header-emitting work is registered as finalize hooks while the response is
//! Open. `finalize` moves to Finalizing, runs the hooks in registration order
//! against the outgoing headers, then marks the response Sent. Hooks run at
//! most once; later `finalize` calls and late registrations are refused.

use std::fmt;

use axum::http::HeaderMap;
use splitwatch_core::diagnostics::DiagnosticSink;
use splitwatch_core::error::Result;

/// Work to run against the response headers right before they go out.
pub type FinalizeHook = Box<dyn FnOnce(&mut HeaderMap) -> Result<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    /// Handler still producing the response; hooks may be registered.
    Open,
    /// Hooks are running against the headers.
    Finalizing,
    /// Headers handed back to the server; nothing may touch them.
    Sent,
}

pub struct ResponseLifecycle {
    phase: ResponsePhase,
    hooks: Vec<FinalizeHook>,
}

impl ResponseLifecycle {
    pub fn new() -> Self {
        Self {
            phase: ResponsePhase::Open,
            hooks: Vec::new(),
        }
    }

    pub fn phase(&self) -> ResponsePhase {
        self.phase
    }

    /// Register a hook. Returns false (and drops the hook) unless Open.
    pub fn on_finalize(&mut self, hook: FinalizeHook) -> bool {
        if self.phase != ResponsePhase::Open {
            return false;
        }
        self.hooks.push(hook);
        true
    }

    /// Run all hooks once. Hook errors go to `diagnostics` and do not stop the
    /// remaining hooks. Returns false if the response was already finalized.
    pub fn finalize(&mut self, headers: &mut HeaderMap, diagnostics: &dyn DiagnosticSink) -> bool {
        if self.phase != ResponsePhase::Open {
            return false;
        }
        self.phase = ResponsePhase::Finalizing;
        for hook in self.hooks.drain(..) {
            if let Err(err) = hook(headers) {
                diagnostics.report(&err);
            }
        }
        self.phase = ResponsePhase::Sent;
        true
    }
}

impl Default for ResponseLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseLifecycle")
            .field("phase", &self.phase)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use splitwatch_core::diagnostics::RecordingSink;
    use splitwatch_core::error::{DiagnosticKind, TimingError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn hooks_run_once_in_order() {
        let sink = RecordingSink::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut lc = ResponseLifecycle::new();

        for v in ["a", "b"] {
            let calls = calls.clone();
            assert!(lc.on_finalize(Box::new(move |h: &mut HeaderMap| {
                calls.fetch_add(1, Ordering::SeqCst);
                h.append("x-order", HeaderValue::from_static(v));
                Ok(())
            })));
        }

        let mut headers = HeaderMap::new();
        assert!(lc.finalize(&mut headers, sink.as_ref()));
        assert!(!lc.finalize(&mut headers, sink.as_ref()));

        assert_eq!(lc.phase(), ResponsePhase::Sent);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let order: Vec<_> = headers.get_all("x-order").iter().collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn late_registration_is_refused() {
        let sink = RecordingSink::new();
        let mut lc = ResponseLifecycle::new();
        lc.finalize(&mut HeaderMap::new(), sink.as_ref());
        assert!(!lc.on_finalize(Box::new(|_: &mut HeaderMap| Ok(()))));
    }

    #[test]
    fn failing_hook_is_reported_and_others_still_run() {
        let sink = RecordingSink::new();
        let mut lc = ResponseLifecycle::new();
        lc.on_finalize(Box::new(|_: &mut HeaderMap| Err(TimingError::Adapter("boom".into()))));
        lc.on_finalize(Box::new(|h: &mut HeaderMap| {
            h.insert("x-after", HeaderValue::from_static("1"));
            Ok(())
        }));

        let mut headers = HeaderMap::new();
        lc.finalize(&mut headers, sink.as_ref());
        assert_eq!(sink.kinds(), [DiagnosticKind::Adapter]);
        assert!(headers.contains_key("x-after"));
    }
}
