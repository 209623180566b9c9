//! Cancellable animation handles
//!
//! The core never animates anything itself. It asks the host to animate a
//! piece toward a target and hands out a `MotionHandle`; the host reports
//! completion with that handle. A handle resolves at most once, and a handle
//! that was cancelled or replaced resolves to nothing.

use serde::{Deserialize, Serialize};

use super::piece::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MotionHandle(pub u64);

impl std::fmt::Display for MotionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "motion#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionKind {
    /// Programmatic move (piece is in `Moving`)
    Move,
    /// Hover lift/scale effect (piece is in `Hovering`)
    Hover,
}

/// An in-flight animation the core is waiting on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveMotion {
    pub handle: MotionHandle,
    pub target: Transform,
}

/// Monotonic handle allocator, one per session
#[derive(Debug, Clone)]
pub struct MotionIds {
    next: u64,
}

impl Default for MotionIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl MotionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> MotionHandle {
        let handle = MotionHandle(self.next);
        self.next += 1;
        handle
    }
}
