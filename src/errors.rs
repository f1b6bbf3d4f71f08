use crate::Energy;

/// Error taxonomy for the AI engine. Each variant maps to a recovery
/// policy: validation errors reject the message, capacity failures turn
/// into WAIT decisions, buffer and training errors are logged and the
/// request path continues.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid observation field '{field}': {reason}")]
    InvalidObservation { field: String, reason: String },

    #[error("insufficient energy: {available:.1} available, {required:.1} required")]
    InsufficientEnergy { required: Energy, available: Energy },

    #[error("gate evaluation failed: {0}")]
    GateEvaluation(String),

    #[error("{0} not initialized")]
    ModelNotInitialized(&'static str),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("training error in {phase}: {reason}")]
    Training { phase: String, reason: String },

    #[error("invalid configuration '{name}': {reason}")]
    Config { name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("buffer lock not acquired within {0:?}")]
    LockTimeout(std::time::Duration),

    #[error("no pending experience for territory '{0}'")]
    NoPending(String),
}

impl EngineError {
    pub fn invalid<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidObservation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// wire error code for the VALIDATION_ERROR / typed-error envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidObservation { .. } => "VALIDATION_ERROR",
            Self::InsufficientEnergy { .. } => "INSUFFICIENT_ENERGY",
            Self::GateEvaluation(_) => "GATE_ERROR",
            Self::ModelNotInitialized(_) => "MODEL_NOT_INITIALIZED",
            Self::Buffer(_) => "BUFFER_ERROR",
            Self::Training { .. } => "TRAINING_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// whether the client may retry the same message unchanged
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Buffer(BufferError::LockTimeout(_)))
    }
}
