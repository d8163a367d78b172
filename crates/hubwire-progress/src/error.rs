use thiserror::Error;

/// Error returned synchronously to the caller of `report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("progress may only be reported before the invocation returns")]
    InvalidState,
}

/// Failure of a single progress delivery.
///
/// These never reach the handler that called `report`; the reporter hands
/// them to its [`DeliveryLogger`](crate::DeliveryLogger) instead.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize progress value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("connection closed before progress could be delivered")]
    Disconnected,

    #[error("progress delivery failed: {0}")]
    Transport(String),

    #[error("no async runtime available to observe progress delivery")]
    NoRuntime,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeliveryError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Stable short code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Disconnected => "disconnected",
            Self::Transport(_) => "transport",
            Self::NoRuntime => "no_runtime",
            Self::Other(_) => "other",
        }
    }
}
