//! Per-piece interaction state machine
//!
//! Four states, a fixed transition table, and exit/enter hooks as the only
//! place side effects happen.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Interaction state of a single piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InteractionState {
    /// No interaction
    #[default]
    Idle,
    /// Pointer is over the piece, not held
    Hovering,
    /// Actively dragged
    Holding,
    /// Programmatic animation in progress, input ignored
    Moving,
}

impl InteractionState {
    pub const ALL: [InteractionState; 4] = [
        InteractionState::Idle,
        InteractionState::Hovering,
        InteractionState::Holding,
        InteractionState::Moving,
    ];

    /// Whether `self -> next` is in the transition table (self-loops are not)
    pub fn can_transition_to(self, next: InteractionState) -> bool {
        use InteractionState::*;
        matches!(
            (self, next),
            (Idle, Hovering)
                | (Idle, Holding)
                | (Idle, Moving)
                | (Hovering, Idle)
                | (Hovering, Holding)
                | (Hovering, Moving)
                | (Holding, Idle)
                | (Holding, Moving)
                | (Moving, Idle)
        )
    }

    /// Whether pointer input should reach the piece in this state
    pub fn accepts_input(self) -> bool {
        !matches!(self, InteractionState::Moving)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Hovering => "hovering",
            InteractionState::Holding => "holding",
            InteractionState::Moving => "moving",
        }
    }
}

/// Result of a successful `change_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested state equals the current one
    Unchanged,
    Changed {
        from: InteractionState,
        to: InteractionState,
    },
}

impl Transition {
    pub fn changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }
}

/// Side effects attached to state changes
pub trait TransitionHooks {
    fn on_exit(&mut self, state: InteractionState);
    fn on_enter(&mut self, state: InteractionState, previous: InteractionState);
}

/// Hooks that do nothing
pub struct NoHooks;

impl TransitionHooks for NoHooks {
    fn on_exit(&mut self, _state: InteractionState) {}
    fn on_enter(&mut self, _state: InteractionState, _previous: InteractionState) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    current: InteractionState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> InteractionState {
        self.current
    }

    /// Request a state change.
    ///
    /// Same state is a successful no-op. A transition outside the table fails
    /// with no side effect. Otherwise runs exit(old), assigns, runs enter(new, old).
    pub fn change_state<H: TransitionHooks>(
        &mut self,
        next: InteractionState,
        hooks: &mut H,
    ) -> Result<Transition, TransitionError> {
        let from = self.current;
        if next == from {
            return Ok(Transition::Unchanged);
        }
        if !from.can_transition_to(next) {
            return Err(TransitionError::Forbidden { from, to: next });
        }
        hooks.on_exit(from);
        self.current = next;
        hooks.on_enter(next, from);
        Ok(Transition::Changed { from, to: next })
    }
}
