//! Error types for the sound engine.

use std::path::PathBuf;

use hushtone_core::envelopes::AutomationError;

/// Errors surfaced by [`SoundEngine`](crate::SoundEngine) and its backends.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The platform refused to create or resume the synthesis context.
    #[error("audio context unavailable: {reason}")]
    ContextUnavailable {
        /// What the backend reported.
        reason: String,
    },

    /// An alarm tone was passed where an ambient texture was expected.
    #[error("sound '{0}' is not an ambient texture")]
    NotATexture(String),

    /// An ambient texture was passed where an alarm tone was expected.
    #[error("sound '{0}' is not an alarm tone")]
    NotATone(String),

    /// No catalog entry with this id.
    #[error("unknown sound: {0}")]
    UnknownSound(String),

    /// The render command queue is full; the audio thread is not draining it.
    #[error("render queue is full")]
    Backpressure,

    /// The tone envelope could not be scheduled.
    #[error("gain automation: {0}")]
    Automation(AutomationError),

    /// No audio output device on the system.
    #[error("no audio output device available")]
    NoDevice,

    /// The requested output device was not found.
    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    /// The device only offers a sample format we cannot render.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Stream setup or control failure.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Failed to read a config file.
    #[error("failed to read config '{path}': {source}")]
    ReadConfig {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// A config value is out of range.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidConfig {
        /// Offending key.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl EngineError {
    /// Wrap any backend failure as a context-unavailable error.
    pub fn context_unavailable(err: impl std::fmt::Display) -> Self {
        EngineError::ContextUnavailable { reason: err.to_string() }
    }

    /// Recast a backend error as context-unavailable, keeping one that already is.
    pub fn into_context_unavailable(self) -> Self {
        match self {
            e @ EngineError::ContextUnavailable { .. } => e,
            other => EngineError::context_unavailable(other),
        }
    }
}

impl From<AutomationError> for EngineError {
    fn from(err: AutomationError) -> Self {
        EngineError::Automation(err)
    }
}

/// Stopping a source node that has already stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// The node finished on its own or was stopped before.
    #[error("node already stopped")]
    AlreadyStopped,
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
