//! Error types shared by the Chartmark crates.
//!
//! Geometry never produces these: a conversion the host cannot answer is
//! `None` and simply skips a frame.

use crate::model::DrawingKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawingError {
    #[error("{kind} needs {expected} points but got {found}")]
    WrongPointCount {
        kind: DrawingKind,
        expected: usize,
        found: usize,
    },

    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by the host for an update or delete request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("request rejected: {0}")]
    Rejected(String),
}
