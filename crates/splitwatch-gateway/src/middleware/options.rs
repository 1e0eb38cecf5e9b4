use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::extract::Request;
use splitwatch_core::clock::{Clock, SystemClock};
use splitwatch_core::diagnostics::{default_sink, DiagnosticSink};
use splitwatch_core::error::{Result, TimingError};
use splitwatch_core::metric::Meta;
use splitwatch_core::{Metric, TrackerOptions};

use crate::config::{ServerTimingSection, WriteHeadersRule, WriteHeadersSpec};

pub const DEFAULT_NAMESPACE: &str = "serverTiming";

type Predicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;
type EmitCallback = Arc<dyn Fn(&[Metric]) + Send + Sync>;

/// Whether the middleware emits `Server-Timing` for a request.
#[derive(Clone, Default)]
pub enum WriteHeaders {
    #[default]
    Never,
    Always,
    When(Predicate),
}

impl WriteHeaders {
    pub fn when<F>(f: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        WriteHeaders::When(Arc::new(f))
    }

    /// A panicking predicate is an adapter error, never a failed request.
    pub fn evaluate(&self, req: &Request) -> Result<bool> {
        match self {
            WriteHeaders::Never => Ok(false),
            WriteHeaders::Always => Ok(true),
            WriteHeaders::When(f) => panic::catch_unwind(AssertUnwindSafe(|| f(req)))
                .map_err(|_| TimingError::Adapter("write_headers predicate panicked".into())),
        }
    }
}

impl fmt::Debug for WriteHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteHeaders::Never => f.write_str("Never"),
            WriteHeaders::Always => f.write_str("Always"),
            WriteHeaders::When(_) => f.write_str("When(..)"),
        }
    }
}

impl From<bool> for WriteHeaders {
    fn from(flag: bool) -> Self {
        if flag {
            WriteHeaders::Always
        } else {
            WriteHeaders::Never
        }
    }
}

impl From<&WriteHeadersSpec> for WriteHeaders {
    fn from(spec: &WriteHeadersSpec) -> Self {
        match spec {
            WriteHeadersSpec::Flag(flag) => (*flag).into(),
            WriteHeadersSpec::Rule(rule) => {
                let WriteHeadersRule { header, path_prefix } = rule.clone();
                WriteHeaders::when(move |req| {
                    let header_ok = header
                        .as_deref()
                        .map_or(true, |h| req.headers().contains_key(h));
                    let path_ok = path_prefix
                        .as_deref()
                        .map_or(true, |p| req.uri().path().starts_with(p));
                    header_ok && path_ok
                })
            }
        }
    }
}

/// Middleware settings; build once, share through `Arc`.
#[derive(Clone)]
pub struct ServerTimingOptions {
    pub namespace: String,
    pub write_headers: WriteHeaders,
    /// Global metadata merged into every metric.
    pub meta: Meta,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub clock: Arc<dyn Clock>,
    /// Called with the finalized snapshot before header values are written.
    pub before_emit: Option<EmitCallback>,
}

impl ServerTimingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn write_headers(mut self, write_headers: impl Into<WriteHeaders>) -> Self {
        self.write_headers = write_headers.into();
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn before_emit<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Metric]) + Send + Sync + 'static,
    {
        self.before_emit = Some(Arc::new(f));
        self
    }

    pub(crate) fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            clock: Arc::clone(&self.clock),
            diagnostics: Arc::clone(&self.diagnostics),
            meta: self.meta.clone(),
        }
    }
}

impl Default for ServerTimingOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            write_headers: WriteHeaders::Never,
            meta: Meta::new(),
            diagnostics: default_sink(),
            clock: Arc::new(SystemClock),
            before_emit: None,
        }
    }
}

impl From<&ServerTimingSection> for ServerTimingOptions {
    fn from(section: &ServerTimingSection) -> Self {
        Self::new()
            .namespace(section.namespace.clone())
            .write_headers(&section.write_headers)
            .meta(section.meta.clone())
    }
}

impl fmt::Debug for ServerTimingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerTimingOptions")
            .field("namespace", &self.namespace)
            .field("write_headers", &self.write_headers)
            .field("meta", &self.meta)
            .field("before_emit", &self.before_emit.is_some())
            .finish_non_exhaustive()
    }
}
