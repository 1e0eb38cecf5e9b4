use std::net::SocketAddr;

use serde::Deserialize;
use splitwatch_core::error::{Result, TimingError};
use splitwatch_core::metric::{is_valid_label, Meta};

use crate::middleware::DEFAULT_NAMESPACE;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub server_timing: ServerTimingSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TimingError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.server_timing.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            TimingError::Config(format!("gateway.listen must be a socket address: {}", self.listen))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerTimingSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub write_headers: WriteHeadersSpec,

    /// Global metadata merged into every metric.
    #[serde(default)]
    pub meta: Meta,
}

impl Default for ServerTimingSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            write_headers: WriteHeadersSpec::default(),
            meta: Meta::new(),
        }
    }
}

impl ServerTimingSection {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_label(&self.namespace) {
            return Err(TimingError::Config("server_timing.namespace must not be empty".into()));
        }
        self.write_headers.validate()
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}

/// `write_headers: true` or a rule such as `{ header: "x-debug-timing" }`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WriteHeadersSpec {
    Flag(bool),
    Rule(WriteHeadersRule),
}

impl Default for WriteHeadersSpec {
    fn default() -> Self {
        WriteHeadersSpec::Flag(false)
    }
}

impl WriteHeadersSpec {
    pub fn validate(&self) -> Result<()> {
        match self {
            WriteHeadersSpec::Flag(_) => Ok(()),
            WriteHeadersSpec::Rule(rule) => rule.validate(),
        }
    }
}

/// Emit only when every listed condition holds.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WriteHeadersRule {
    /// Request carries this header (any value).
    #[serde(default)]
    pub header: Option<String>,
    /// Request path starts with this prefix.
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl WriteHeadersRule {
    pub fn validate(&self) -> Result<()> {
        if self.header.is_none() && self.path_prefix.is_none() {
            return Err(TimingError::Config(
                "server_timing.write_headers rule must set header or path_prefix".into(),
            ));
        }
        if let Some(h) = &self.header {
            if axum::http::HeaderName::from_bytes(h.as_bytes()).is_err() {
                return Err(TimingError::Config(format!(
                    "server_timing.write_headers.header is not a valid header name: {h}"
                )));
            }
        }
        Ok(())
    }
}
