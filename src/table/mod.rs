//! Deterministic interaction core
//!
//! All piece/container logic lives here. This module must stay pure:
//! - Single-threaded, driven by the host's event thread
//! - Seeded RNG only
//! - Stable iteration order (registration order for containers, id order for pieces)
//! - No rendering or tweening; animations go out as events and come back as handles

pub mod container;
pub mod coordinator;
pub mod events;
pub mod gate;
pub mod history;
pub mod motion;
pub mod piece;
pub mod restore;
pub mod sensor;
pub mod state;

pub use container::{Container, ContainerId, ContainerKind, LayoutSlot, PileDirection, ReorderMode};
pub use coordinator::{
    ContainerOutline, ContainerSnapshot, Coordinator, DropOutcome, PointerAction, SceneHandles,
    TableSnapshot, UndoOutcome,
};
pub use events::TableEvent;
pub use gate::{GateSlot, InteractionGate};
pub use history::{History, HistoryRecord, PieceOrigin};
pub use motion::{MotionHandle, MotionKind};
pub use piece::{Piece, PieceArena, PieceId, PieceVisual, PointerFilter, Transform};
pub use restore::{RestorePlan, RestoreStep, RestoreStrategy, restore_plan};
pub use sensor::{Axis, Rect, Sensor, SensorOutline};
pub use state::{InteractionState, NoHooks, StateMachine, Transition, TransitionHooks};
