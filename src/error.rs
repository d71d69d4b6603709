//! Top-level error type.
//!
//! Subsystems define their own diagnostic errors next to the code that
//! raises them ([`KnowledgeError`], [`ConfigError`], [`SnapshotError`]);
//! this enum wraps them so callers that touch several subsystems can use `?`
//! without losing codes or help text.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::knowledge::KnowledgeError;
use crate::snapshot::SnapshotError;

#[derive(Debug, Error, Diagnostic)]
pub enum SilentRiskError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub type SilentRiskResult<T> = std::result::Result<T, SilentRiskError>;
