//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Message Model Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid in-app message: {message}")]
    InvalidMessage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Adapter/Display Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Adapter error: {message}")]
    Adapter { message: String },

    #[error("Display error: {message}")]
    Display { message: String },

    // ─────────────────────────────────────────────────────────────
    // Asset Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Asset error: {message}")]
    Assets { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// Catch-all for errors with added context
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
        }
    }

    pub fn display(message: impl Into<String>) -> Self {
        Self::Display {
            message: message.into(),
        }
    }

    pub fn assets(message: impl Into<String>) -> Self {
        Self::Assets {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Adapter { .. } | Error::Assets { .. } | Error::ChannelSend { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Context Extension
// ─────────────────────────────────────────────────────────────────

pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::Context {
            context: f(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::adapter("prepare failed");
        assert_eq!(err.to_string(), "Adapter error: prepare failed");
    }

    #[test]
    fn test_context_wrapping() {
        let result: Result<()> = Err(Error::assets("fetch timed out")).context("preparing banner");
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("preparing banner"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::adapter("x").is_recoverable());
        assert!(Error::assets("x").is_recoverable());
        assert!(!Error::invalid_message("x").is_recoverable());
        assert!(!Error::ChannelClosed.is_recoverable());
    }
}
