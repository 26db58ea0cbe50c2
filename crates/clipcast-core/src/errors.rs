use thiserror::Error;

/// Errors reported by the recording pipelines.
///
/// `Clone` so a recorder can store its terminal result and replay it on a
/// repeated `stop` without re-invoking the encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Stop was requested but zero usable frames were ever accepted.
    #[error("no frames were captured")]
    NoFrames,

    /// The encoder or container finalize failed, or the output file could
    /// not be created. Carries the encoder's own message when available.
    #[error("failed to save recording: {reason}")]
    SaveFailed { reason: String },

    /// The capture source failed to start or stop.
    #[error("capture source error: {reason}")]
    Source { reason: String },

    /// `start` was called while a session is already active.
    #[error("a recording session is already active")]
    SessionActive,

    /// `stop` was called with no session to stop.
    #[error("no active recording session")]
    NoSession,
}

impl CaptureError {
    pub fn save_failed(reason: impl Into<String>) -> Self {
        Self::SaveFailed { reason: reason.into() }
    }

    pub fn source(reason: impl Into<String>) -> Self {
        Self::Source { reason: reason.into() }
    }
}
