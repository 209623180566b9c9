//! Session coordinator: container registry, pointer routing, moves and undo
//!
//! One coordinator per session. Containers register explicitly (registration
//! order is drop-routing priority). Everything runs on the event thread: the
//! host feeds pointer actions, calls `tick` once per frame while something is
//! held, reports finished animations, and drains `TableEvent`s.

use std::collections::HashMap;

use glam::Vec2;
use serde::Serialize;

use super::container::{Container, ContainerId, ReorderMode};
use super::events::TableEvent;
use super::gate::InteractionGate;
use super::history::{History, HistoryRecord, PieceOrigin};
use super::motion::{ActiveMotion, MotionHandle, MotionIds, MotionKind};
use super::piece::{Effects, Piece, PieceArena, PieceId, Transform};
use super::restore::restore_plan;
use super::sensor::SensorOutline;
use super::state::{InteractionState, Transition};
use crate::error::{ConfigError, ConsistencyViolation, MoveError, OwnershipViolation, TransitionError};
use crate::settings::{SceneConfig, Settings};

/// Pointer input, already resolved to a piece by the host's hit testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    Enter { piece: PieceId },
    Exit { piece: PieceId },
    Down { piece: PieceId, position: Vec2 },
    Up { position: Vec2 },
}

/// Result of releasing the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Nothing was held
    Ignored,
    Accepted {
        container: ContainerId,
        index: Option<usize>,
    },
    /// No container took the batch; pieces return to rest
    Returned,
}

/// Result of `Coordinator::undo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// History was empty
    Empty,
    Restored(HistoryRecord),
    /// Record consumed, but it could not be applied exactly
    Degraded {
        record: HistoryRecord,
        violation: ConsistencyViolation,
    },
}

/// Names from a scene mapped to the ids they were given
#[derive(Debug, Clone, Default)]
pub struct SceneHandles {
    pub containers: HashMap<String, ContainerId>,
    pub pieces: HashMap<String, PieceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub name: String,
    pub pieces: Vec<PieceId>,
}

/// Membership and ownership at a point in time (debugging/tests, not persistence)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub containers: Vec<ContainerSnapshot>,
    pub owners: Vec<(PieceId, Option<ContainerId>)>,
    pub history_depth: usize,
}

/// Sensor geometry for debug drawing, with the container origin to offset it by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerOutline {
    pub container: ContainerId,
    pub origin: Vec2,
    pub sensor: SensorOutline,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    settings: Settings,
    pieces: PieceArena,
    /// Registration order
    containers: Vec<Container>,
    history: History,
    gate: InteractionGate,
    motions: MotionIds,
    events: Vec<TableEvent>,
    pointer: Vec2,
}

impl Coordinator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Build a session from a scene description.
    ///
    /// A piece naming an unknown container is logged and left without one.
    pub fn from_scene(scene: &SceneConfig) -> Result<(Self, SceneHandles), ConfigError> {
        let mut coordinator = Self::new(scene.settings.clone());
        let mut handles = SceneHandles::default();
        for config in &scene.containers {
            config.validate()?;
            let container = Container::from_config(config, scene.settings.piece_size);
            let id = coordinator.register(container);
            handles.containers.insert(config.name.clone(), id);
        }
        for config in &scene.pieces {
            let id = coordinator.spawn(Piece::from_config(config));
            handles.pieces.insert(config.name.clone(), id);
            let Some(name) = &config.container else {
                continue;
            };
            match handles.containers.get(name) {
                Some(&container) => {
                    if let Err(err) = coordinator.add(container, id, None) {
                        log::error!("Scene piece {:?} not placed: {}", config.name, err);
                    }
                }
                None => log::error!(
                    "Scene piece {:?} names unknown container {:?}",
                    config.name,
                    name
                ),
            }
        }
        Ok((coordinator, handles))
    }

    // === Accessors ===

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pieces(&self) -> &PieceArena {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.iter().find(|c| c.id() == id)
    }

    /// Registered containers in registration order
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn gate(&self) -> &InteractionGate {
        &self.gate
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn events(&self) -> &[TableEvent] {
        &self.events
    }

    /// Hand pending events to the host
    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    fn container_index(&self, id: ContainerId) -> Option<usize> {
        self.containers.iter().position(|c| c.id() == id)
    }

    fn require_container(&self, id: ContainerId) -> Result<usize, MoveError> {
        self.container_index(id).ok_or_else(|| {
            log::error!("{} is not registered with the coordinator", id);
            MoveError::UnknownContainer(id)
        })
    }

    fn require_piece(&self, id: PieceId) -> Result<(), MoveError> {
        if self.pieces.contains(id) {
            Ok(())
        } else {
            log::error!("{} does not exist", id);
            Err(MoveError::UnknownPiece(id))
        }
    }

    // === Registry ===

    pub fn register(&mut self, container: Container) -> ContainerId {
        let id = container.id();
        log::info!(
            "Registered {} {:?} (priority {})",
            id,
            container.name,
            self.containers.len()
        );
        self.containers.push(container);
        id
    }

    /// Remove a container from routing; its pieces lose their owner.
    /// History naming it will take the degraded path on undo.
    pub fn deregister(&mut self, id: ContainerId) -> Option<Container> {
        let index = self.container_index(id)?;
        let released = self.containers[index].take_all(&mut self.pieces);
        for piece in released {
            if let Some(entry) = self.pieces.get_mut(piece) {
                entry.set_owner(None);
            }
        }
        log::info!("Deregistered {}", id);
        Some(self.containers.remove(index))
    }

    pub fn spawn(&mut self, piece: Piece) -> PieceId {
        self.pieces.insert(piece)
    }

    pub fn set_interaction_enabled(&mut self, piece: PieceId, enabled: bool) {
        if let Some(entry) = self.pieces.get_mut(piece) {
            entry.interaction_enabled = enabled;
        }
    }

    // === State machine plumbing ===

    /// Library-driven transition; keeps the gate in step with hover exits
    fn transition(
        &mut self,
        piece: PieceId,
        next: InteractionState,
    ) -> Result<Transition, TransitionError> {
        let Some(entry) = self.pieces.get_mut(piece) else {
            log::error!("Transition requested for unknown {}", piece);
            return Ok(Transition::Unchanged);
        };
        let mut fx = Effects {
            settings: &self.settings,
            motions: &mut self.motions,
            events: &mut self.events,
        };
        let result = entry.change_state(next, &mut fx);
        if let Ok(Transition::Changed {
            from: InteractionState::Hovering,
            ..
        }) = result
        {
            self.gate.release_hover(piece);
        }
        result
    }

    // === Motion ===

    /// Animate `piece` to `target`. Replaces any in-flight move.
    ///
    /// Returns `Ok(false)` when already there (or already heading there).
    pub fn move_piece(
        &mut self,
        piece: PieceId,
        target: Transform,
        duration: f32,
    ) -> Result<bool, TransitionError> {
        let Some(entry) = self.pieces.get(piece) else {
            log::error!("Move requested for unknown {}", piece);
            return Ok(false);
        };
        match entry.move_motion {
            Some(motion) if motion.target.same_placement(&target) => return Ok(false),
            None if entry.transform().same_placement(&target) => return Ok(false),
            _ => {}
        }

        self.transition(piece, InteractionState::Moving)?;

        let handle = self.motions.allocate();
        let Some(entry) = self.pieces.get_mut(piece) else {
            return Ok(false);
        };
        if let Some(previous) = entry.move_motion.take() {
            self.events.push(TableEvent::MotionCancelled {
                piece,
                handle: previous.handle,
            });
        }
        entry.move_motion = Some(ActiveMotion { handle, target });
        self.events.push(TableEvent::MotionStarted {
            piece,
            handle,
            kind: MotionKind::Move,
            target,
            duration,
        });
        Ok(true)
    }

    /// Host callback: the animation behind `handle` completed.
    ///
    /// Returns false for cancelled, replaced or unknown handles.
    pub fn motion_finished(&mut self, handle: MotionHandle) -> bool {
        let found = self.pieces.iter().find_map(|p| {
            if p.move_motion.is_some_and(|m| m.handle == handle) {
                Some((p.id(), MotionKind::Move))
            } else if p.hover_motion.is_some_and(|m| m.handle == handle) {
                Some((p.id(), MotionKind::Hover))
            } else {
                None
            }
        });
        let Some((piece, kind)) = found else {
            log::debug!("Ignoring stale {}", handle);
            return false;
        };
        let Some(entry) = self.pieces.get_mut(piece) else {
            return false;
        };
        match kind {
            MotionKind::Move => {
                if let Some(motion) = entry.move_motion.take() {
                    entry.set_transform(motion.target);
                    entry.set_rest(motion.target);
                }
                if let Err(err) = self.transition(piece, InteractionState::Idle) {
                    log::error!("{} finished moving but could not settle: {}", piece, err);
                }
            }
            MotionKind::Hover => {
                if let Some(motion) = entry.hover_motion.take() {
                    entry.set_transform(motion.target);
                }
            }
        }
        true
    }

    /// Send a piece back to where it rested before it was picked up
    pub fn return_to_rest(&mut self, piece: PieceId) -> Result<bool, TransitionError> {
        let Some(rest) = self.pieces.get(piece).map(Piece::rest) else {
            return Ok(false);
        };
        self.move_piece(piece, rest, self.settings.move_duration)
    }

    /// Send a piece back to its spawn transform
    pub fn return_to_origin(&mut self, piece: PieceId) -> Result<bool, TransitionError> {
        let Some(origin) = self.pieces.get(piece).map(Piece::origin) else {
            return Ok(false);
        };
        self.move_piece(piece, origin, self.settings.move_duration)
    }

    /// Push resident pieces toward their layout targets after a change
    fn settle(&mut self, container: ContainerId) {
        let Some(index) = self.container_index(container) else {
            return;
        };
        self.events.push(TableEvent::LayoutRefreshed {
            container,
            revision: self.containers[index].revision(),
        });
        let members = self.containers[index].pieces().to_vec();
        for piece in members {
            let Some(entry) = self.pieces.get_mut(piece) else {
                continue;
            };
            let Some(target) = entry.layout_target() else {
                continue;
            };
            match entry.state() {
                InteractionState::Holding => continue,
                InteractionState::Hovering if entry.rest().same_placement(&target) => continue,
                InteractionState::Idle if entry.transform().same_placement(&target) => {
                    entry.set_rest(target);
                    continue;
                }
                _ => {}
            }
            if let Err(err) = self.move_piece(piece, target, self.settings.move_duration) {
                log::error!("{} could not move to its slot: {}", piece, err);
            }
        }
    }

    fn settle_all(&mut self, mut touched: Vec<ContainerId>) {
        touched.sort();
        touched.dedup();
        for container in touched {
            self.settle(container);
        }
    }

    // === Membership ===

    /// Take `piece` out of whatever container owns it and clear its owner
    fn detach(&mut self, piece: PieceId) -> Option<ContainerId> {
        let owner = self.pieces.owner_of(piece)?;
        match self.container_index(owner) {
            Some(index) => {
                self.containers[index].remove(&mut self.pieces, piece);
            }
            None => log::error!("{} claims unregistered owner {}", piece, owner),
        }
        if let Some(entry) = self.pieces.get_mut(piece) {
            entry.set_owner(None);
        }
        Some(owner)
    }

    /// Place a piece without recording history, detaching it from any other owner
    pub fn add(
        &mut self,
        container: ContainerId,
        piece: PieceId,
        index: Option<usize>,
    ) -> Result<bool, MoveError> {
        self.require_piece(piece)?;
        let target = self.require_container(container)?;
        let mut touched = vec![container];
        if self.pieces.owner_of(piece).is_some_and(|o| o != container) {
            touched.extend(self.detach(piece));
        }
        let added = self.containers[target].add(&mut self.pieces, piece, index);
        self.settle_all(touched);
        Ok(added)
    }

    /// Remove a piece from a container and clear its owner (no history)
    pub fn remove(&mut self, container: ContainerId, piece: PieceId) -> Result<bool, MoveError> {
        let target = self.require_container(container)?;
        let removed = self.containers[target].remove(&mut self.pieces, piece);
        if removed {
            if let Some(entry) = self.pieces.get_mut(piece) {
                entry.set_owner(None);
            }
        }
        self.settle(container);
        Ok(removed)
    }

    /// Detach every piece from a container, returning them in order
    pub fn clear_container(&mut self, container: ContainerId) -> Result<Vec<PieceId>, MoveError> {
        let target = self.require_container(container)?;
        let released = self.containers[target].take_all(&mut self.pieces);
        for &piece in &released {
            if let Some(entry) = self.pieces.get_mut(piece) {
                entry.set_owner(None);
            }
        }
        self.settle(container);
        Ok(released)
    }

    pub fn shuffle(&mut self, container: ContainerId, seed: u64) -> Result<(), MoveError> {
        let target = self.require_container(container)?;
        self.containers[target].shuffle(&mut self.pieces, seed);
        self.settle(container);
        Ok(())
    }

    /// Move a batch into `to`, starting at `index` (or appended), recording
    /// history when any piece arrives from elsewhere.
    ///
    /// Returns whether a history record was pushed. Rejections leave
    /// everything untouched.
    pub fn move_pieces(
        &mut self,
        to: ContainerId,
        batch: &[PieceId],
        index: Option<usize>,
    ) -> Result<bool, MoveError> {
        if batch.is_empty() {
            return Err(MoveError::EmptyBatch);
        }
        for &piece in batch {
            self.require_piece(piece)?;
        }
        let target = self.require_container(to)?;
        let tag = self.pieces.get(batch[0]).and_then(|p| p.kind_tag.as_deref());
        self.containers[target].can_accept_tagged(batch, tag)?;

        if batch.iter().all(|&p| self.containers[target].contains(p)) {
            self.reorder(target, batch, index);
            self.settle(to);
            return Ok(false);
        }

        let origins = self.capture_origins(batch);
        let record = HistoryRecord::from_origins(to, batch.to_vec(), origins);
        let description = record.describe();
        self.history.push(record);
        self.events.push(TableEvent::HistoryRecorded {
            description,
            depth: self.history.len(),
        });

        // Pulling resident pieces out from in front of the insertion point shifts it
        let mut insert_at = index;
        let mut touched = vec![to];
        for &piece in batch {
            if self.pieces.owner_of(piece) == Some(to) {
                if let (Some(at), Some(pos)) = (insert_at, self.containers[target].index_of(piece)) {
                    if pos < at {
                        insert_at = Some(at - 1);
                    }
                }
            }
            touched.extend(self.detach(piece));
        }

        let container = &mut self.containers[target];
        match insert_at {
            Some(at) => {
                let at = at.min(container.len());
                for &piece in batch.iter().rev() {
                    container.add(&mut self.pieces, piece, Some(at));
                }
            }
            None => {
                for &piece in batch {
                    container.add(&mut self.pieces, piece, None);
                }
            }
        }
        self.settle_all(touched);
        Ok(true)
    }

    /// Each piece's current owner and index within it
    fn capture_origins(&self, batch: &[PieceId]) -> Vec<Option<PieceOrigin>> {
        batch
            .iter()
            .map(|&piece| {
                let container = self.pieces.owner_of(piece)?;
                let index = self.container(container)?.index_of(piece)?;
                Some(PieceOrigin { container, index })
            })
            .collect()
    }

    /// Reorder pieces that already live in the container (never recorded)
    fn reorder(&mut self, target: usize, batch: &[PieceId], index: Option<usize>) {
        let container = &mut self.containers[target];
        if batch.len() == 1 && container.reorder() == ReorderMode::SwapOnly {
            let at = index.unwrap_or(container.len().saturating_sub(1));
            container.swap(&mut self.pieces, batch[0], at);
            return;
        }
        let mut insert_at = index;
        for &piece in batch {
            if let (Some(at), Some(pos)) = (insert_at, container.index_of(piece)) {
                if pos < at {
                    insert_at = Some(at - 1);
                }
            }
            container.remove(&mut self.pieces, piece);
        }
        match insert_at {
            Some(at) => {
                let at = at.min(container.len());
                for &piece in batch.iter().rev() {
                    container.add(&mut self.pieces, piece, Some(at));
                }
            }
            None => {
                for &piece in batch {
                    container.add(&mut self.pieces, piece, None);
                }
            }
        }
    }

    // === History ===

    /// Reverse the most recent recorded move; no-op on empty history
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(record) = self.history.pop() else {
            log::debug!("Undo with empty history");
            return UndoOutcome::Empty;
        };
        log::info!("History pop: {}", record.describe());
        self.events.push(TableEvent::HistoryUndone {
            description: record.describe(),
            depth: self.history.len(),
        });
        if record.has_origins() {
            return self.restore_origins(record);
        }

        let pieces: Vec<PieceId> = record
            .pieces
            .iter()
            .copied()
            .filter(|&p| {
                let exists = self.pieces.contains(p);
                if !exists {
                    log::error!("Undo skipping {} which no longer exists", p);
                }
                exists
            })
            .collect();

        let Some(from) = record.from else {
            let mut touched = Vec::new();
            for &piece in &pieces {
                touched.extend(self.detach(piece));
            }
            self.settle_all(touched);
            return UndoOutcome::Restored(record);
        };

        let Some(source) = self.container_index(from) else {
            let violation = ConsistencyViolation::MissingContainer(from);
            log::error!("Undo of {} degraded: {}", record.describe(), violation);
            return UndoOutcome::Degraded { record, violation };
        };

        let indices: &[usize] = if pieces.len() == record.pieces.len() {
            &record.from_indices
        } else {
            &[]
        };
        let plan = restore_plan(&pieces, indices);

        let mut touched = vec![from, record.to];
        for &piece in &pieces {
            touched.extend(self.detach(piece));
        }
        for step in &plan.steps {
            self.containers[source].add(&mut self.pieces, step.piece, step.index);
        }
        self.settle_all(touched);

        match plan.violation {
            Some(violation) => UndoOutcome::Degraded { record, violation },
            None => UndoOutcome::Restored(record),
        }
    }

    /// Undo a record that knows every piece's previous placement: each
    /// source container gets its own pieces back at their own indices
    fn restore_origins(&mut self, record: HistoryRecord) -> UndoOutcome {
        let mut groups: Vec<(ContainerId, Vec<PieceId>, Vec<usize>)> = Vec::new();
        let mut loose = Vec::new();
        for (&piece, origin) in record.pieces.iter().zip(&record.origins) {
            if !self.pieces.contains(piece) {
                log::error!("Undo skipping {} which no longer exists", piece);
                continue;
            }
            match origin {
                Some(origin) => match groups.iter_mut().find(|g| g.0 == origin.container) {
                    Some(group) => {
                        group.1.push(piece);
                        group.2.push(origin.index);
                    }
                    None => groups.push((origin.container, vec![piece], vec![origin.index])),
                },
                None => loose.push(piece),
            }
        }

        if let Some(missing) = groups
            .iter()
            .map(|g| g.0)
            .find(|&c| self.container_index(c).is_none())
        {
            let violation = ConsistencyViolation::MissingContainer(missing);
            log::error!("Undo of {} degraded: {}", record.describe(), violation);
            return UndoOutcome::Degraded { record, violation };
        }

        let mut touched = vec![record.to];
        for &piece in groups.iter().flat_map(|g| g.1.iter()).chain(&loose) {
            touched.extend(self.detach(piece));
        }
        for (container, pieces, indices) in &groups {
            let Some(slot) = self.container_index(*container) else {
                continue;
            };
            let plan = restore_plan(pieces, indices);
            for step in &plan.steps {
                self.containers[slot].add(&mut self.pieces, step.piece, step.index);
            }
            touched.push(*container);
        }
        self.settle_all(touched);
        UndoOutcome::Restored(record)
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    /// End of session: release the gate, cancel animations, idle every piece
    /// and clear history
    pub fn teardown(&mut self) {
        self.gate.reset();
        let ids: Vec<PieceId> = self.pieces.iter().map(Piece::id).collect();
        for piece in ids {
            if let Some(entry) = self.pieces.get_mut(piece) {
                if let Some(motion) = entry.move_motion.take() {
                    self.events.push(TableEvent::MotionCancelled {
                        piece,
                        handle: motion.handle,
                    });
                }
            }
            if let Err(err) = self.transition(piece, InteractionState::Idle) {
                log::error!("{} could not be idled on teardown: {}", piece, err);
            }
        }
        self.history.clear();
    }

    // === Pointer input ===

    /// Dispatch a pointer action. Only `Up` produces an outcome.
    pub fn handle(&mut self, action: PointerAction) -> Option<DropOutcome> {
        match action {
            PointerAction::Enter { piece } => {
                self.pointer_enter(piece);
                None
            }
            PointerAction::Exit { piece } => {
                self.pointer_exit(piece);
                None
            }
            PointerAction::Down { piece, position } => {
                self.pointer_down(piece, position);
                None
            }
            PointerAction::Up { position } => Some(self.pointer_up(position)),
        }
    }

    /// Pointer entered a piece. Advisory: returns whether it started hovering.
    pub fn pointer_enter(&mut self, piece: PieceId) -> bool {
        let eligible = self
            .pieces
            .get(piece)
            .is_some_and(|p| p.accepts_pointer() && p.state() == InteractionState::Idle);
        if !eligible || !self.gate.claim_hover(piece) {
            log::debug!("{} hover ignored", piece);
            return false;
        }
        match self.transition(piece, InteractionState::Hovering) {
            Ok(_) => true,
            Err(err) => {
                self.gate.release_hover(piece);
                log::debug!("{} hover rejected: {}", piece, err);
                false
            }
        }
    }

    pub fn pointer_exit(&mut self, piece: PieceId) -> bool {
        let hovering = self
            .pieces
            .get(piece)
            .is_some_and(|p| p.state() == InteractionState::Hovering);
        if !hovering {
            return false;
        }
        self.transition(piece, InteractionState::Idle).is_ok()
    }

    /// Pointer pressed on a piece. Advisory: returns whether a batch was picked up.
    pub fn pointer_down(&mut self, piece: PieceId, position: Vec2) -> bool {
        self.pointer = position;
        let Some(entry) = self.pieces.get(piece) else {
            return false;
        };
        if !entry.accepts_pointer() || !self.gate.can_hold(piece) {
            log::debug!("{} pick-up ignored", piece);
            return false;
        }
        let batch = match entry.owner() {
            Some(owner) => match self.container(owner).and_then(|c| c.grab_batch(piece)) {
                Some(batch) => batch,
                None => {
                    log::debug!("{} may not be lifted from {}", piece, owner);
                    return false;
                }
            },
            None => vec![piece],
        };
        let liftable = batch.iter().all(|&p| {
            self.pieces.get(p).is_some_and(|e| {
                e.interaction_enabled
                    && matches!(
                        e.state(),
                        InteractionState::Idle | InteractionState::Hovering
                    )
            })
        });
        if !liftable {
            log::debug!("{} batch busy, pick-up ignored", piece);
            return false;
        }

        for &p in &batch {
            if let Err(err) = self.transition(p, InteractionState::Holding) {
                log::debug!("{} hold rejected: {}", p, err);
            }
        }
        for &p in &batch {
            if let Some(entry) = self.pieces.get_mut(p) {
                entry.grab_offset = entry.transform().position - position;
            }
        }
        self.gate.claim_hold(piece, batch)
    }

    /// Per-frame callback: held pieces follow the pointer
    pub fn tick(&mut self, pointer: Vec2) {
        self.pointer = pointer;
        let Some(batch) = self.gate.holding().map(<[PieceId]>::to_vec) else {
            return;
        };
        for piece in batch {
            if let Some(entry) = self.pieces.get_mut(piece) {
                if entry.state() == InteractionState::Holding {
                    let mut transform = entry.transform();
                    transform.position = pointer + entry.grab_offset;
                    entry.set_transform(transform);
                }
            }
        }
    }

    /// First registered container that takes the batch at `pointer`:
    /// capacity, sensor containment and type filter must all pass
    pub fn route_drop(&self, batch: &[PieceId], pointer: Vec2) -> Option<(ContainerId, Option<usize>)> {
        let lead = batch.first()?;
        let tag = self.pieces.get(*lead).and_then(|p| p.kind_tag.as_deref());
        self.containers
            .iter()
            .find(|c| c.can_accept_tagged(batch, tag).is_ok() && c.sensor_contains(pointer))
            .map(|c| (c.id(), c.drop_index(pointer)))
    }

    /// Pointer released: route the held batch or send it home
    pub fn pointer_up(&mut self, position: Vec2) -> DropOutcome {
        if self.gate.holding().is_none() {
            return DropOutcome::Ignored;
        }
        self.tick(position);
        let batch: Vec<PieceId> = self
            .gate
            .release_hold()
            .unwrap_or_default()
            .into_iter()
            .filter(|&p| {
                self.pieces
                    .get(p)
                    .is_some_and(|e| e.state() == InteractionState::Holding)
            })
            .collect();
        if batch.is_empty() {
            return DropOutcome::Ignored;
        }

        if let Some((container, index)) = self.route_drop(&batch, position) {
            log::debug!("Drop of {} pieces routed to {}", batch.len(), container);
            for &piece in &batch {
                if let Err(err) = self.transition(piece, InteractionState::Idle) {
                    log::error!("{} could not be released: {}", piece, err);
                }
            }
            match self.move_pieces(container, &batch, index) {
                Ok(_) => {
                    self.events.push(TableEvent::Dropped {
                        container,
                        pieces: batch,
                        index,
                    });
                    return DropOutcome::Accepted { container, index };
                }
                Err(err) => log::error!("Routed drop failed: {}", err),
            }
        }

        log::debug!("Drop of {} pieces returned", batch.len());
        for &piece in &batch {
            if let Err(err) = self.return_to_rest(piece) {
                log::error!("{} could not return: {}", piece, err);
            }
        }
        self.events.push(TableEvent::DropReturned { pieces: batch });
        DropOutcome::Returned
    }

    // === Introspection ===

    pub fn sensor_outlines(&self) -> Vec<ContainerOutline> {
        self.containers
            .iter()
            .filter_map(|c| {
                c.sensor().map(|s| ContainerOutline {
                    container: c.id(),
                    origin: c.origin(),
                    sensor: s.outline(),
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            containers: self
                .containers
                .iter()
                .map(|c| ContainerSnapshot {
                    id: c.id(),
                    name: c.name.clone(),
                    pieces: c.pieces().to_vec(),
                })
                .collect(),
            owners: self.pieces.iter().map(|p| (p.id(), p.owner())).collect(),
            history_depth: self.history.len(),
        }
    }

    /// Verify owner fields and membership lists agree
    pub fn check_ownership(&self) -> Result<(), OwnershipViolation> {
        let mut seen: HashMap<PieceId, ContainerId> = HashMap::new();
        for container in &self.containers {
            for &piece in container.pieces() {
                if let Some(&first) = seen.get(&piece) {
                    return Err(OwnershipViolation::ListedTwice {
                        piece,
                        first,
                        second: container.id(),
                    });
                }
                seen.insert(piece, container.id());
                let owner = self.pieces.owner_of(piece);
                if owner != Some(container.id()) {
                    return Err(OwnershipViolation::ListedWithoutOwnership {
                        piece,
                        container: container.id(),
                        owner,
                    });
                }
            }
        }
        for piece in self.pieces.iter() {
            if let Some(owner) = piece.owner() {
                if seen.get(&piece.id()) != Some(&owner) {
                    return Err(OwnershipViolation::OwnerDoesNotList {
                        piece: piece.id(),
                        owner,
                    });
                }
            }
        }
        Ok(())
    }
}
