//! Outbound events for the host (renderer, animation driver, audio)

use serde::Serialize;

use super::container::ContainerId;
use super::motion::{MotionHandle, MotionKind};
use super::piece::{PieceId, Transform};
use super::state::InteractionState;

/// Everything the core wants the outside world to know or do.
/// Drained by the host once per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableEvent {
    StateChanged {
        piece: PieceId,
        from: InteractionState,
        to: InteractionState,
    },
    /// Animate `piece` to `target` over `duration` seconds, then report `handle`
    MotionStarted {
        piece: PieceId,
        handle: MotionHandle,
        kind: MotionKind,
        target: Transform,
        duration: f32,
    },
    /// Stop animating; `handle` will never be honoured
    MotionCancelled { piece: PieceId, handle: MotionHandle },
    /// Container recomputed targets/visibility/partitions for its pieces
    LayoutRefreshed {
        container: ContainerId,
        revision: u64,
    },
    Dropped {
        container: ContainerId,
        pieces: Vec<PieceId>,
        index: Option<usize>,
    },
    /// No container took the batch; pieces are heading back to rest
    DropReturned { pieces: Vec<PieceId> },
    HistoryRecorded { description: String, depth: usize },
    HistoryUndone { description: String, depth: usize },
}
