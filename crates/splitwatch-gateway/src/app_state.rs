//! Shared application state for the splitwatch gateway.

use std::sync::Arc;

use splitwatch_core::error::Result;

use crate::config::GatewayConfig;
use crate::middleware::ServerTimingOptions;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    server_timing: ServerTimingOptions,
}

impl AppState {
    /// Build application state from a loaded config.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;
        let server_timing = ServerTimingOptions::from(&cfg.server_timing);
        tracing::info!(
            namespace = %server_timing.namespace,
            write_headers = ?server_timing.write_headers,
            "server timing configured"
        );
        Ok(Self::with_options(cfg, server_timing))
    }

    /// Like `new`, with middleware options supplied by the caller
    /// (custom diagnostics sink, clock, or predicate).
    pub fn with_options(cfg: GatewayConfig, server_timing: ServerTimingOptions) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg, server_timing }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn server_timing(&self) -> ServerTimingOptions {
        self.inner.server_timing.clone()
    }
}
