//! Domain errors for the timer and the ledger.
//!
//! Infrastructure (stores, settings) stays on `anyhow`; these enums are what
//! callers match on.

use crate::timer::TimerPhase;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("cannot {op} while timer is {phase}")]
    InvalidTransition { op: &'static str, phase: TimerPhase },

    #[error("session length must not be negative (got {0}s)")]
    NegativeLength(i64),

    #[error("session length must be a non-negative number of minutes (got {0})")]
    InvalidLength(f64),

    #[error("break length must be positive (got {0}s)")]
    NonPositiveBreak(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Blocks the save; nothing is persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Book not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
