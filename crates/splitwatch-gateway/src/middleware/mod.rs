//! `Server-Timing` middleware for axum.
//!
//! Per request:
//! - create a `Tracker` and attach it to the request's `TimingScopes`
//! - decide (via `WriteHeaders`) whether headers should be emitted
//! - run the handler, then finalize the response lifecycle, which appends
//!   one `Server-Timing` header per tracked metric
//!
//! Nothing in here may fail the request: every error becomes a diagnostic.

pub mod options;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use splitwatch_core::error::{Result, TimingError};
use splitwatch_core::header::{is_token, TimingEntry, SERVER_TIMING};
use splitwatch_core::metric::is_valid_label;
use splitwatch_core::Tracker;

use crate::context::TimingScopes;
use crate::lifecycle::{FinalizeHook, ResponseLifecycle};

pub use options::{ServerTimingOptions, WriteHeaders, DEFAULT_NAMESPACE};

/// Wrap every route of `router` with the middleware.
pub fn with_server_timing<S>(router: Router<S>, opts: ServerTimingOptions) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(Arc::new(opts), server_timing))
}

/// Middleware entry, for `axum::middleware::from_fn_with_state`.
pub async fn server_timing(
    State(opts): State<Arc<ServerTimingOptions>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut lifecycle = ResponseLifecycle::new();

    match attach_tracker(&opts, &mut req) {
        Ok(tracker) => match opts.write_headers.evaluate(&req) {
            Ok(true) => {
                lifecycle.on_finalize(emit_hook(tracker, Arc::clone(&opts)));
            }
            Ok(false) => {}
            Err(err) => opts.diagnostics.report(&err),
        },
        Err(err) => opts.diagnostics.report(&err),
    }

    let mut res = next.run(req).await;
    lifecycle.finalize(res.headers_mut(), opts.diagnostics.as_ref());
    res
}

fn attach_tracker(opts: &ServerTimingOptions, req: &mut Request) -> Result<Tracker> {
    if !is_valid_label(&opts.namespace) {
        return Err(TimingError::Adapter(format!(
            "invalid tracker namespace: {:?}",
            opts.namespace
        )));
    }
    let tracker = Tracker::with_options(opts.tracker_options());
    let ext = req.extensions_mut();
    match ext.get_mut::<TimingScopes>() {
        Some(scopes) => scopes.attach(&opts.namespace, tracker.clone()),
        None => {
            let mut scopes = TimingScopes::new();
            scopes.attach(&opts.namespace, tracker.clone());
            ext.insert(scopes);
        }
    }
    tracing::debug!(namespace = %opts.namespace, "server timing tracker attached");
    Ok(tracker)
}

fn emit_hook(tracker: Tracker, opts: Arc<ServerTimingOptions>) -> FinalizeHook {
    Box::new(move |headers: &mut HeaderMap| write_server_timing(&tracker, &opts, headers).map(|_| ()))
}

/// Finalize `tracker` and append its metrics as `Server-Timing` headers.
///
/// Metrics whose name is not an HTTP token, or whose value is not valid
/// header bytes, are skipped and reported as one adapter error after the
/// valid ones are written. A panicking `before_emit` callback is reported
/// separately and does not stop emission. Returns the number of header
/// values appended.
pub fn write_server_timing(
    tracker: &Tracker,
    opts: &ServerTimingOptions,
    headers: &mut HeaderMap,
) -> Result<usize> {
    let metrics = tracker.finalize();
    if let Some(before_emit) = &opts.before_emit {
        if panic::catch_unwind(AssertUnwindSafe(|| before_emit(&metrics))).is_err() {
            opts.diagnostics
                .report(&TimingError::Adapter("before_emit callback panicked".into()));
        }
    }

    let name = HeaderName::from_static(SERVER_TIMING);
    let mut written = 0;
    let mut rejected = Vec::new();
    for metric in &metrics {
        if !is_token(metric.name()) {
            rejected.push(metric.name().to_string());
            continue;
        }
        let value = TimingEntry(metric).to_string();
        match HeaderValue::from_str(&value) {
            Ok(v) => {
                headers.append(name.clone(), v);
                written += 1;
            }
            Err(_) => rejected.push(value),
        }
    }
    tracing::debug!(written, rejected = rejected.len(), "server timing headers written");

    if rejected.is_empty() {
        Ok(written)
    } else {
        Err(TimingError::Adapter(format!(
            "server timing entries skipped (bad name or header bytes): {rejected:?}"
        )))
    }
}
