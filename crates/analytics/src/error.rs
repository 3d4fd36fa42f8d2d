use core_types::{CoreError, WindowKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StudyError {
    #[error("Not enough data for {context}: need at least {required} observations, found {found}")]
    InsufficientData {
        context: String,
        required: usize,
        found: usize,
    },

    #[error("Misaligned dates: {0}")]
    MisalignedDates(String),

    #[error("Invalid {window} window: {reason}")]
    InvalidWindow { window: WindowKind, reason: String },

    #[error("Degenerate variance: {0}")]
    DegenerateVariance(String),

    #[error(
        "Incomparable event windows: {left} has {left_len} rows but {right} has {right_len}"
    )]
    IncomparableWindows {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StudyError {
    pub(crate) fn invalid_window(window: WindowKind, reason: impl Into<String>) -> Self {
        StudyError::InvalidWindow {
            window,
            reason: reason.into(),
        }
    }
}
