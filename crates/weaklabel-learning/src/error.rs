use thiserror::Error;

/// Errors raised while assembling, training or scoring.
#[derive(Debug, Error)]
pub enum LearnError {
    /// Two matrices or vectors that must line up row-for-row do not.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// Gold labels must be exactly -1 or 1.
    #[error("gold labels must be in {{-1, 1}}: found {value} at index {index}")]
    InvalidLabel { index: usize, value: i32 },

    /// A labeling function voted outside {-1, 0, 1}.
    #[error("labeling function {lf_index} ('{lf_name}') returned {value} for candidate {candidate}")]
    InvalidVote {
        lf_index: usize,
        lf_name: String,
        candidate: usize,
        value: i8,
    },

    /// The selected strategy needs a collaborator that was not supplied.
    #[error("missing capability: {0}")]
    MissingCapability(&'static str),

    /// Accuracy was requested for an LF that never fired.
    #[error("accuracy undefined for labeling function {lf_index}: zero coverage")]
    DivisionUndefined { lf_index: usize },

    /// Weights or predictions were requested before `train` / `test`.
    #[error("{0} is not available until the model has been trained")]
    NotTrained(&'static str),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid hyperparameter '{name}': {reason}")]
    InvalidHyperparameter { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, LearnError>;

impl LearnError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        LearnError::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}
