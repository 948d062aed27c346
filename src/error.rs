use thiserror::Error;

/// Failures the engine can report. A ratio with no solution and a cancelled
/// run are ordinary outcomes and are not represented here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("piece {piece_id}: requested {requested}, only {remaining} remaining")]
    InsufficientQuantity {
        piece_id: u32,
        requested: u32,
        remaining: u32,
    },

    #[error("refusing to commit a group without items")]
    EmptyGroup,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
