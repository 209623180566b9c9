//! Pilekit - drag-and-drop interaction core for arranging pieces in containers
//!
//! Core modules:
//! - `table`: Deterministic interaction core (state machine, sensors, containers, undo)
//! - `settings`: Data-driven tuning and container/piece configuration
//! - `error`: Typed error taxonomy
//!
//! Rendering, easing curves and asset loading live in the host. The core talks
//! to them through [`table::TableEvent`]s drained from the [`table::Coordinator`].

pub mod error;
pub mod settings;
pub mod table;

pub use error::{
    ConfigError, ConsistencyViolation, MoveError, OwnershipViolation, Rejection, TransitionError,
};
pub use settings::{ContainerConfig, HoverSettings, PieceConfig, SceneConfig, Settings};
pub use table::{
    Axis, Container, ContainerId, ContainerKind, Coordinator, History, HistoryRecord,
    InteractionState, Piece, PieceId, PointerAction, Sensor, TableEvent, Transform, UndoOutcome,
};

/// Framework defaults
pub mod consts {
    /// Default piece size (width, height) in host units
    pub const PIECE_WIDTH: f32 = 150.0;
    pub const PIECE_HEIGHT: f32 = 210.0;

    /// Default programmatic move duration (seconds)
    pub const MOVE_DURATION: f32 = 0.3;

    /// Hover effect defaults
    pub const HOVER_SCALE: f32 = 1.1;
    pub const HOVER_LIFT: f32 = 30.0;
    pub const HOVER_Z_BOOST: i32 = 100;
    pub const HOVER_DURATION: f32 = 0.1;

    /// Depth boost while held / while animating so the piece draws above its container
    pub const HOLD_Z_BOOST: i32 = 1000;
    pub const MOVING_Z_BOOST: i32 = 500;

    /// Hand spread cap (total width pieces may occupy)
    pub const HAND_MAX_SPREAD: f32 = 700.0;

    /// Pile stacking defaults
    pub const PILE_GAP: f32 = 0.5;
    pub const PILE_MAX_VISIBLE: usize = 6;

    /// Tolerance for "already at target" comparisons
    pub const TRANSFORM_EPSILON: f32 = 0.01;
}

/// Approximate float comparison used for transform targets
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= consts::TRANSFORM_EPSILON
}

/// Normalize a rotation in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
