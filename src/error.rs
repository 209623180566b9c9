//! Error taxonomy
//!
//! - Invalid transition: reported through `Result`, the caller decides.
//! - Consistency violation: logged and carried inside a degraded undo outcome,
//!   never returned as an `Err`.
//! - Acceptance rejection: a normal negative answer from a container.
//! - Missing collaborator: unknown ids; the operation becomes a no-op.

use serde::{Deserialize, Serialize};

use crate::table::{ContainerId, InteractionState, PieceId};

/// A requested state change is not in the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("transition {from:?} -> {to:?} is not allowed")]
    Forbidden {
        from: InteractionState,
        to: InteractionState,
    },
}

/// Why a container declined a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Rejection {
    #[error("capacity {capacity} exceeded ({resident} resident + {incoming} incoming)")]
    Capacity {
        capacity: usize,
        resident: usize,
        incoming: usize,
    },
    #[error("container accepts {expected:?}, batch carries {found:?}")]
    TypeMismatch {
        expected: String,
        found: Option<String>,
    },
    #[error("batch lists the same piece twice")]
    DuplicatePiece,
}

/// Failure of a library-driven move
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MoveError {
    #[error("container {0} is not registered")]
    UnknownContainer(ContainerId),
    #[error("piece {0} does not exist")]
    UnknownPiece(PieceId),
    #[error("empty batch")]
    EmptyBatch,
    #[error("rejected by container: {0}")]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Undo could not be applied as recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ConsistencyViolation {
    #[error("{pieces} pieces recorded with {indices} original indices")]
    LengthMismatch { pieces: usize, indices: usize },
    #[error("history references container {0} which no longer exists")]
    MissingContainer(ContainerId),
}

/// Owner fields and membership lists disagree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipViolation {
    #[error("{piece} is listed by {first} and {second}")]
    ListedTwice {
        piece: PieceId,
        first: ContainerId,
        second: ContainerId,
    },
    #[error("{container} lists {piece} whose owner is {owner:?}")]
    ListedWithoutOwnership {
        piece: PieceId,
        container: ContainerId,
        owner: Option<ContainerId>,
    },
    #[error("{piece} names {owner} as owner but is not listed there")]
    OwnerDoesNotList { piece: PieceId, owner: ContainerId },
}

/// Settings / configuration failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("container {name:?} has capacity 0")]
    ZeroCapacity { name: String },
    #[error("container {name:?} has a sensor with non-positive size")]
    NonPositiveSensor { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_render() {
        let err = TransitionError::Forbidden {
            from: InteractionState::Moving,
            to: InteractionState::Holding,
        };
        assert_eq!(err.to_string(), "transition Moving -> Holding is not allowed");

        let err = MoveError::from(Rejection::Capacity {
            capacity: 5,
            resident: 4,
            incoming: 2,
        });
        assert!(err.to_string().contains("capacity 5 exceeded"));
    }
}
