//! Error types for upstream catalog operations.
//!
//! Every failure carries an [`ErrorContext`] naming the operation and resource
//! involved, so a per-chapter failure inside a batch can still be traced back
//! to the call that produced it.

use std::fmt;

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Structured context for upstream errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "fetch_chapter", "search")
    pub operation: Option<String>,
    /// The resource ID if applicable
    pub resource_id: Option<String>,
    /// Whether a caller could reasonably retry
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the resource ID.
    pub fn with_resource(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none() && self.resource_id.is_none() && !self.retryable
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref id) = self.resource_id {
            parts.push(format!("id={}", id));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, " [{}]", parts.join(", "))
    }
}

/// Error type for upstream operations
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream could not be reached.
    #[error("Connection error: {message}{context}")]
    Connection {
        message: String,
        context: ErrorContext,
    },

    /// The requested resource does not exist upstream.
    #[error("Not found: {message}{context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The upstream answered with a non-success status.
    #[error("Upstream returned status {code}: {message}{context}")]
    Status {
        code: u16,
        message: String,
        context: ErrorContext,
    },

    /// The upstream answered with a body that could not be decoded.
    #[error("Decode error: {message}{context}")]
    Decode {
        message: String,
        context: ErrorContext,
    },

    /// The upstream did not answer in time.
    #[error("Timeout: {message}{context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// Client construction or settings problem.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Anything else.
    #[error("Internal error: {message}{context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl UpstreamError {
    pub fn connection(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Connection {
            message: message.into(),
            context: context.retryable(),
        }
    }

    pub fn not_found(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    pub fn status(code: u16, message: impl Into<String>, context: ErrorContext) -> Self {
        let context = if code >= 500 { context.retryable() } else { context };
        Self::Status {
            code,
            message: message.into(),
            context,
        }
    }

    pub fn decode(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Decode {
            message: message.into(),
            context,
        }
    }

    pub fn timeout(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Timeout {
            message: message.into(),
            context: context.retryable(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Internal {
            message: message.into(),
            context,
        }
    }

    /// The bare message without the context suffix.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection { message, .. }
            | Self::NotFound { message, .. }
            | Self::Status { message, .. }
            | Self::Decode { message, .. }
            | Self::Timeout { message, .. }
            | Self::Configuration { message }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Connection { context, .. }
            | Self::NotFound { context, .. }
            | Self::Status { context, .. }
            | Self::Decode { context, .. }
            | Self::Timeout { context, .. }
            | Self::Internal { context, .. } => Some(context),
            Self::Configuration { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_retryable(&self) -> bool {
        self.context().map(|c| c.retryable).unwrap_or(false)
    }
}
