//! Interception policy for capture boundaries.

use crate::error::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of externally observable call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Model invocation
    Model,
    /// Tool invocation
    Tool,
    /// HTTP call
    Http,
}

impl Boundary {
    /// The wire string for this boundary
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Tool => "tool",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy for allowing or denying capture boundary execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptionPolicy {
    /// Allow model boundaries
    pub allow_model: bool,
    /// Allow tool boundaries
    pub allow_tool: bool,
    /// Allow HTTP boundaries
    pub allow_http: bool,
    /// When set, only these hosts may be called (allowlist wins)
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// Hosts that may never be called
    pub blocked_hosts: BTreeSet<String>,
    /// Whether HTTP request/response bodies are captured
    pub capture_http_bodies: bool,
}

impl Default for InterceptionPolicy {
    fn default() -> Self {
        Self {
            allow_model: true,
            allow_tool: true,
            allow_http: true,
            allowed_hosts: None,
            blocked_hosts: BTreeSet::new(),
            capture_http_bodies: false,
        }
    }
}

impl InterceptionPolicy {
    /// Check whether a boundary call is allowed.
    ///
    /// For HTTP boundaries the target URL's host is filtered against the
    /// allowlist (which wins when non-empty) and then the blocklist.
    ///
    /// # Errors
    ///
    /// Returns a policy error describing the denial.
    pub fn check(&self, boundary: Boundary, target: &str) -> CaptureResult<()> {
        match boundary {
            Boundary::Model => {
                if !self.allow_model {
                    return Err(CaptureError::BoundaryDenied { boundary });
                }
            }
            Boundary::Tool => {
                if !self.allow_tool {
                    return Err(CaptureError::BoundaryDenied { boundary });
                }
            }
            Boundary::Http => {
                if !self.allow_http {
                    return Err(CaptureError::BoundaryDenied { boundary });
                }
                let host = extract_host(target);
                if let Some(allowed) = &self.allowed_hosts {
                    if !allowed.contains(&host) {
                        return Err(CaptureError::HostBlocked {
                            host,
                            hint: "Add host to allowed_hosts to allow this call.".to_string(),
                        });
                    }
                }
                if self.blocked_hosts.contains(&host) {
                    return Err(CaptureError::HostBlocked {
                        host,
                        hint: "Remove it from blocked_hosts to allow this call.".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Lowercased host component of a URL, without scheme, userinfo, or port.
#[must_use]
pub fn extract_host(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host_port.split(':').next().unwrap_or(host_port);
    host.to_ascii_lowercase()
}
