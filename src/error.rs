// src/error.rs
//! Closed error kinds shared by the sync pipeline and its adapters.

use std::fmt;

/// Boxed cause carried by [`SyncError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where an upstream HTTP call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Connection-level fault: no application response was received.
    Network,
    /// The service answered with a non-success status.
    Status(u16),
    /// The service answered 2xx but the body was unusable.
    Response,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Network => f.write_str("network"),
            Upstream::Status(code) => write!(f, "http {code}"),
            Upstream::Response => f.write_str("invalid response"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{message}")]
    Fetch {
        message: String,
        upstream: Upstream,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{message}")]
    Publish {
        message: String,
        upstream: Upstream,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{message}")]
    Store {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{message}")]
    Render { message: String },
}

impl SyncError {
    pub fn fetch(upstream: Upstream, message: impl Into<String>) -> Self {
        SyncError::Fetch {
            message: message.into(),
            upstream,
            source: None,
        }
    }

    pub fn publish(upstream: Upstream, message: impl Into<String>) -> Self {
        SyncError::Publish {
            message: message.into(),
            upstream,
            code: None,
            source: None,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        SyncError::Store {
            message: message.into(),
            source: None,
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        SyncError::Render {
            message: message.into(),
        }
    }

    /// Attach an underlying cause. No-op for `Render`, which never wraps one.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        match &mut self {
            SyncError::Fetch { source, .. }
            | SyncError::Publish { source, .. }
            | SyncError::Store { source, .. } => *source = Some(cause.into()),
            SyncError::Render { .. } => {}
        }
        self
    }

    /// Attach the upstream error code (publishing only).
    pub fn with_code(mut self, value: impl Into<String>) -> Self {
        if let SyncError::Publish { code, .. } = &mut self {
            *code = Some(value.into());
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Fetch { .. } => "fetch",
            SyncError::Publish { .. } => "publish",
            SyncError::Store { .. } => "store",
            SyncError::Render { .. } => "render",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Fetch { upstream, .. } | SyncError::Publish { upstream, .. } => {
                match upstream {
                    Upstream::Status(code) => Some(*code),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Transient network faults and 5xx answers are worth another attempt.
    /// Client errors, malformed responses, storage and render failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Fetch { upstream, .. } | SyncError::Publish { upstream, .. } => {
                match upstream {
                    Upstream::Network => true,
                    Upstream::Status(code) => (500..600).contains(code),
                    Upstream::Response => false,
                }
            }
            SyncError::Store { .. } | SyncError::Render { .. } => false,
        }
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(cause) = cur {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        cur = cause.source();
    }
    out
}
