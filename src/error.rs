//! Error taxonomy for the analysis core.
//!
//! Every stage of the pipeline is deterministic, so nothing is retried here:
//! errors go straight back to the caller with the offending parameter or
//! sample index attached.

use thiserror::Error;

/// Convenience alias used throughout the analysis core.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Caller-supplied configuration violates a stated constraint.
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// Input series or mask violates a structural invariant.
    #[error("Invalid input{}: {}", fmt_index(.index), .reason)]
    InvalidInput { reason: String, index: Option<usize> },

    /// Degenerate empty input where no empty-result convention applies.
    #[error("Empty input: {context}")]
    EmptyInput { context: String },
}

fn fmt_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at index {i}"),
        None => String::new(),
    }
}

impl AnalysisError {
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>, index: Option<usize>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
            index,
        }
    }

    pub fn empty_input(context: impl Into<String>) -> Self {
        Self::EmptyInput {
            context: context.into(),
        }
    }

    /// Name of the offending parameter, if this is a parameter error.
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }
}
