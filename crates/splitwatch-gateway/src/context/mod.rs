//! Typed request context carrying the per-request trackers.
//!
//! The middleware stores trackers in a `TimingScopes` request extension keyed
//! by namespace. Handlers take `Timing` for the default tracker or
//! `Extension<TimingScopes>` when several namespaces are layered.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use splitwatch_core::Tracker;

use crate::middleware::DEFAULT_NAMESPACE;

/// Trackers attached to one request, in attachment order.
#[derive(Debug, Clone, Default)]
pub struct TimingScopes {
    scopes: Vec<(String, Tracker)>,
}

impl TimingScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `tracker` under `namespace`, replacing a tracker already there.
    pub fn attach(&mut self, namespace: &str, tracker: Tracker) {
        match self.scopes.iter_mut().find(|(ns, _)| ns == namespace) {
            Some(slot) => slot.1 = tracker,
            None => self.scopes.push((namespace.to_string(), tracker)),
        }
    }

    pub fn get(&self, namespace: &str) -> Option<&Tracker> {
        self.scopes
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, t)| t)
    }

    /// Tracker under the default namespace, else the first one attached.
    pub fn primary(&self) -> Option<&Tracker> {
        self.get(DEFAULT_NAMESPACE)
            .or_else(|| self.scopes.first().map(|(_, t)| t))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|(ns, _)| ns.as_str())
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Extractor for the request's primary tracker.
///
/// Never rejects: without the middleware, handlers get a detached tracker
/// whose metrics are simply never emitted.
#[derive(Debug, Clone)]
pub struct Timing(pub Tracker);

impl std::ops::Deref for Timing {
    type Target = Tracker;

    fn deref(&self) -> &Tracker {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Timing
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tracker = parts
            .extensions
            .get::<TimingScopes>()
            .and_then(TimingScopes::primary)
            .cloned();
        match tracker {
            Some(t) => Ok(Timing(t)),
            None => {
                tracing::debug!("no server timing tracker on request, using a detached one");
                Ok(Timing(Tracker::new()))
            }
        }
    }
}
