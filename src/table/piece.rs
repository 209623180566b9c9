//! Pieces: identity, interaction state, visual bookkeeping and ownership

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::container::ContainerId;
use super::events::TableEvent;
use super::motion::{ActiveMotion, MotionIds, MotionKind};
use super::state::{InteractionState, StateMachine, Transition, TransitionHooks};
use crate::approx_eq;
use crate::error::TransitionError;
use crate::settings::{PieceConfig, Settings};

static NEXT_PIECE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique piece identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl PieceId {
    /// Allocate a fresh id (never reused within the process)
    pub fn next() -> Self {
        PieceId(NEXT_PIECE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "piece#{}", self.0)
    }
}

/// Position, rotation (degrees) and scale of a piece
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            scale: Vec2::ONE,
        }
    }

    pub fn at(position: Vec2) -> Self {
        Self::new(position, 0.0)
    }

    /// Same position and rotation within tolerance (scale is cosmetic)
    pub fn same_placement(&self, other: &Transform) -> bool {
        approx_eq(self.position.x, other.position.x)
            && approx_eq(self.position.y, other.position.y)
            && approx_eq(
                crate::normalize_degrees(self.rotation),
                crate::normalize_degrees(other.rotation),
            )
    }
}

/// Whether pointer events stop at this piece or pass through to what is below
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerFilter {
    #[default]
    Stop,
    Pass,
}

/// Render-facing state, mutated only by transition hooks and layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PieceVisual {
    pub transform: Transform,
    /// Where the piece sits when left alone (captured before hover/drag)
    pub rest: Transform,
    pub base_z: i32,
    pub z_index: i32,
    pub pointer_filter: PointerFilter,
    pub visible: bool,
    pub interactive: bool,
}

impl PieceVisual {
    fn new(transform: Transform) -> Self {
        Self {
            transform,
            rest: transform,
            base_z: 0,
            z_index: 0,
            pointer_filter: PointerFilter::Stop,
            visible: true,
            interactive: true,
        }
    }
}

/// Shared collaborators a transition hook may touch
pub(crate) struct Effects<'a> {
    pub settings: &'a Settings,
    pub motions: &'a mut MotionIds,
    pub events: &'a mut Vec<TableEvent>,
}

#[derive(Debug, Clone)]
pub struct Piece {
    id: PieceId,
    pub name: String,
    /// Type token matched against a container's accept filter
    pub kind_tag: Option<String>,
    pub interaction_enabled: bool,
    machine: StateMachine,
    visual: PieceVisual,
    /// Spawn-time transform, captured once
    origin: Transform,
    owner: Option<ContainerId>,
    /// Resting target most recently assigned by the owner's layout
    pub(crate) layout_target: Option<Transform>,
    pub(crate) move_motion: Option<ActiveMotion>,
    pub(crate) hover_motion: Option<ActiveMotion>,
    /// Offset from the pointer to the piece position while held
    pub(crate) grab_offset: Vec2,
}

impl Piece {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            id: PieceId::next(),
            name: name.into(),
            kind_tag: None,
            interaction_enabled: true,
            machine: StateMachine::new(),
            visual: PieceVisual::new(transform),
            origin: transform,
            owner: None,
            layout_target: None,
            move_motion: None,
            hover_motion: None,
            grab_offset: Vec2::ZERO,
        }
    }

    pub fn from_config(config: &PieceConfig) -> Self {
        let mut piece = Self::new(config.name.clone(), config.transform);
        piece.kind_tag = config.kind_tag.clone();
        piece.interaction_enabled = config.interaction_enabled;
        piece
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.kind_tag = Some(tag.into());
        self
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn state(&self) -> InteractionState {
        self.machine.current()
    }

    pub fn owner(&self) -> Option<ContainerId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ContainerId>) {
        self.owner = owner;
    }

    pub fn origin(&self) -> Transform {
        self.origin
    }

    pub fn visual(&self) -> &PieceVisual {
        &self.visual
    }

    pub fn transform(&self) -> Transform {
        self.visual.transform
    }

    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.visual.transform = transform;
    }

    pub fn rest(&self) -> Transform {
        self.visual.rest
    }

    pub(crate) fn set_rest(&mut self, rest: Transform) {
        self.visual.rest = rest;
    }

    pub fn layout_target(&self) -> Option<Transform> {
        self.layout_target
    }

    /// Apply the container layout's depth/visibility verdict
    pub(crate) fn apply_layout(&mut self, base_z: i32, visible: bool, interactive: bool) {
        self.visual.z_index += base_z - self.visual.base_z;
        self.visual.base_z = base_z;
        self.visual.visible = visible;
        self.visual.interactive = interactive;
    }

    /// Whether pointer input may start hovering/holding this piece
    pub fn accepts_pointer(&self) -> bool {
        self.interaction_enabled && self.visual.interactive && self.state().accepts_input()
    }

    /// Drive the state machine, running this piece's hooks
    pub(crate) fn change_state(
        &mut self,
        next: InteractionState,
        fx: &mut Effects<'_>,
    ) -> Result<Transition, TransitionError> {
        let mut hooks = PieceHooks {
            id: self.id,
            visual: &mut self.visual,
            hover_motion: &mut self.hover_motion,
            fx,
        };
        let transition = self.machine.change_state(next, &mut hooks)?;
        if let Transition::Changed { from, to } = transition {
            hooks.fx.events.push(TableEvent::StateChanged {
                piece: self.id,
                from,
                to,
            });
        }
        Ok(transition)
    }
}

struct PieceHooks<'a, 'b> {
    id: PieceId,
    visual: &'a mut PieceVisual,
    hover_motion: &'a mut Option<ActiveMotion>,
    fx: &'a mut Effects<'b>,
}

impl TransitionHooks for PieceHooks<'_, '_> {
    fn on_exit(&mut self, state: InteractionState) {
        match state {
            InteractionState::Hovering => {
                if let Some(motion) = self.hover_motion.take() {
                    self.fx.events.push(TableEvent::MotionCancelled {
                        piece: self.id,
                        handle: motion.handle,
                    });
                }
                self.visual.transform = self.visual.rest;
                self.visual.z_index = self.visual.base_z;
            }
            InteractionState::Holding | InteractionState::Moving => {
                self.visual.z_index = self.visual.base_z;
            }
            InteractionState::Idle => {}
        }
    }

    fn on_enter(&mut self, state: InteractionState, previous: InteractionState) {
        let settings = self.fx.settings;
        match state {
            InteractionState::Idle => {
                self.visual.z_index = self.visual.base_z;
                self.visual.pointer_filter = PointerFilter::Stop;
            }
            InteractionState::Hovering => {
                self.visual.rest = self.visual.transform;
                self.visual.z_index = self.visual.base_z + settings.hover.z_boost;
                let rest = self.visual.rest;
                let target = Transform {
                    position: rest.position - Vec2::new(0.0, settings.hover.lift),
                    rotation: rest.rotation,
                    scale: rest.scale * settings.hover.scale,
                };
                let handle = self.fx.motions.allocate();
                *self.hover_motion = Some(ActiveMotion { handle, target });
                self.fx.events.push(TableEvent::MotionStarted {
                    piece: self.id,
                    handle,
                    kind: MotionKind::Hover,
                    target,
                    duration: settings.hover.duration,
                });
            }
            InteractionState::Holding => {
                // From Hovering the rest transform was captured on hover entry
                if previous == InteractionState::Idle {
                    self.visual.rest = self.visual.transform;
                }
                self.visual.z_index = self.visual.base_z + settings.hold_z_boost;
                self.visual.pointer_filter = PointerFilter::Pass;
            }
            InteractionState::Moving => {
                self.visual.z_index = self.visual.base_z + settings.moving_z_boost;
                self.visual.pointer_filter = PointerFilter::Pass;
            }
        }
    }
}

/// Owning store for every piece in a session, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct PieceArena {
    pieces: BTreeMap<PieceId, Piece>,
}

impl PieceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, piece: Piece) -> PieceId {
        let id = piece.id();
        self.pieces.insert(id, piece);
        id
    }

    pub fn remove(&mut self, id: PieceId) -> Option<Piece> {
        self.pieces.remove(&id)
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn get_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(&id)
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.pieces.contains_key(&id)
    }

    pub fn owner_of(&self, id: PieceId) -> Option<ContainerId> {
        self.pieces.get(&id).and_then(Piece::owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Piece> {
        self.pieces.values_mut()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}
