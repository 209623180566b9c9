//! Containers: ordered piece membership, acceptance rules and layout
//!
//! Order is meaningful (both z-order and logical sequence). Membership only
//! changes through `add`/`remove`/`swap`/`shuffle`, and every change refreshes
//! the layout, which rewrites each resident piece's target, depth and
//! visibility plus the sensor partitions.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::piece::{PieceArena, PieceId, Transform};
use super::sensor::{Axis, Rect, Sensor};
use crate::consts::*;
use crate::error::Rejection;
use crate::settings::ContainerConfig;

static NEXT_CONTAINER_ID: AtomicU32 = AtomicU32::new(1);

/// Container identity, assigned monotonically at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

impl ContainerId {
    pub fn next() -> Self {
        ContainerId(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// How a single resident piece dropped back into its own container is reordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReorderMode {
    /// Remove and reinsert, shifting the pieces in between
    #[default]
    Shift,
    /// Exchange places with the piece at the target index
    SwapOnly,
}

/// Direction a pile grows toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PileDirection {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl PileDirection {
    pub fn offset(self) -> Vec2 {
        match self {
            PileDirection::Up => Vec2::new(0.0, -1.0),
            PileDirection::Down => Vec2::new(0.0, 1.0),
            PileDirection::Left => Vec2::new(-1.0, 0.0),
            PileDirection::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Closed set of container behaviours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Row of pieces centred on the origin; drops land between pieces
    Hand {
        max_spread: f32,
        /// Resize the sensor width to follow the row
        fit_sensor: bool,
    },
    /// Stack; drops always go on top
    Pile {
        direction: PileDirection,
        gap: f32,
        max_visible: usize,
        /// Only the top piece may be picked up
        restrict_to_top: bool,
        /// Picking a piece also lifts every piece above it
        grab_above: bool,
    },
}

impl ContainerKind {
    pub fn hand() -> Self {
        ContainerKind::Hand {
            max_spread: HAND_MAX_SPREAD,
            fit_sensor: false,
        }
    }

    pub fn pile() -> Self {
        ContainerKind::Pile {
            direction: PileDirection::Up,
            gap: PILE_GAP,
            max_visible: PILE_MAX_VISIBLE,
            restrict_to_top: true,
            grab_above: false,
        }
    }
}

/// Layout verdict for one resident piece
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutSlot {
    pub transform: Transform,
    pub z_index: i32,
    pub visible: bool,
    pub interactive: bool,
}

#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    pub name: String,
    kind: ContainerKind,
    /// World position of the container centre; sensor and partitions are relative to it
    origin: Vec2,
    piece_size: Vec2,
    capacity: Option<usize>,
    accept_type: Option<String>,
    reorder: ReorderMode,
    pieces: Vec<PieceId>,
    sensor: Option<Sensor>,
    revision: u64,
}

impl Container {
    pub fn new(name: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            id: ContainerId::next(),
            name: name.into(),
            kind,
            origin: Vec2::ZERO,
            piece_size: Vec2::new(PIECE_WIDTH, PIECE_HEIGHT),
            capacity: None,
            accept_type: None,
            reorder: ReorderMode::Shift,
            pieces: Vec::new(),
            sensor: None,
            revision: 0,
        }
    }

    pub fn from_config(config: &ContainerConfig, piece_size: Vec2) -> Self {
        let mut container = Self::new(config.name.clone(), config.kind.clone())
            .with_origin(config.origin)
            .with_piece_size(piece_size)
            .with_reorder(config.reorder);
        container.capacity = config.capacity;
        container.accept_type = config.accept_type.clone();
        if let Some(sensor) = &config.sensor {
            let mut built = Sensor::new(Rect::new(sensor.position, sensor.size));
            built.set_enabled(sensor.enabled);
            container.sensor = Some(built);
        }
        container
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_piece_size(mut self, size: Vec2) -> Self {
        self.piece_size = size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_accept_type(mut self, tag: impl Into<String>) -> Self {
        self.accept_type = Some(tag.into());
        self
    }

    pub fn with_reorder(mut self, reorder: ReorderMode) -> Self {
        self.reorder = reorder;
        self
    }

    pub fn with_sensor(mut self, sensor: Sensor) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn accept_type(&self) -> Option<&str> {
        self.accept_type.as_deref()
    }

    pub fn reorder(&self) -> ReorderMode {
        self.reorder
    }

    pub fn sensor(&self) -> Option<&Sensor> {
        self.sensor.as_ref()
    }

    pub fn sensor_mut(&mut self) -> Option<&mut Sensor> {
        self.sensor.as_mut()
    }

    /// Bumped on every layout refresh
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pieces(&self) -> &[PieceId] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn contains(&self, piece: PieceId) -> bool {
        self.pieces.contains(&piece)
    }

    pub fn index_of(&self, piece: PieceId) -> Option<usize> {
        self.pieces.iter().position(|&p| p == piece)
    }

    /// Last `n` pieces (the top of a pile), bottom first
    pub fn top_pieces(&self, n: usize) -> &[PieceId] {
        &self.pieces[self.pieces.len().saturating_sub(n)..]
    }

    /// Convert a world-space point into this container's local space
    pub fn to_local(&self, point: Vec2) -> Vec2 {
        point - self.origin
    }

    /// Whether the sensor is present, enabled and contains the world-space point
    pub fn sensor_contains(&self, point: Vec2) -> bool {
        self.sensor
            .as_ref()
            .is_some_and(|s| s.enabled() && s.contains(self.to_local(point)))
    }

    /// Preferred insertion index for a drop at a world-space point
    pub fn drop_index(&self, point: Vec2) -> Option<usize> {
        self.sensor
            .as_ref()
            .and_then(|s| s.drop_index(self.to_local(point)))
    }

    /// Type filter; no filter accepts everything
    pub fn matches_type(&self, tag: Option<&str>) -> bool {
        match &self.accept_type {
            None => true,
            Some(expected) => tag == Some(expected.as_str()),
        }
    }

    /// Acceptance plus the type filter, judged on the lead piece's tag
    pub fn can_accept_tagged(&self, batch: &[PieceId], tag: Option<&str>) -> Result<(), Rejection> {
        self.can_accept(batch)?;
        match &self.accept_type {
            Some(expected) if !self.matches_type(tag) => Err(Rejection::TypeMismatch {
                expected: expected.clone(),
                found: tag.map(str::to_string),
            }),
            _ => Ok(()),
        }
    }

    /// Pure acceptance predicate: no duplicates in the batch and the capacity
    /// bound holds counting only pieces not already resident
    pub fn can_accept(&self, batch: &[PieceId]) -> Result<(), Rejection> {
        for (i, piece) in batch.iter().enumerate() {
            if batch[..i].contains(piece) {
                return Err(Rejection::DuplicatePiece);
            }
        }
        if let Some(capacity) = self.capacity {
            let incoming = batch.iter().filter(|p| !self.contains(**p)).count();
            if self.pieces.len() + incoming > capacity {
                return Err(Rejection::Capacity {
                    capacity,
                    resident: self.pieces.len(),
                    incoming,
                });
            }
        }
        Ok(())
    }

    /// Insert `piece` at `index` (clamped to `0..=len`) or append, and claim
    /// ownership. Never removes the piece from another container.
    ///
    /// Re-adding a resident piece changes nothing but still refreshes.
    pub fn add(&mut self, arena: &mut PieceArena, piece: PieceId, index: Option<usize>) -> bool {
        if self.pieces.contains(&piece) {
            self.refresh(arena);
            return false;
        }
        let Some(entry) = arena.get_mut(piece) else {
            log::error!("{}: cannot add unknown {}", self.id, piece);
            return false;
        };
        entry.set_owner(Some(self.id));
        match index {
            Some(i) => self.pieces.insert(i.min(self.pieces.len()), piece),
            None => self.pieces.push(piece),
        }
        self.refresh(arena);
        true
    }

    /// Remove by identity. The piece's owner field is left for the caller.
    pub fn remove(&mut self, arena: &mut PieceArena, piece: PieceId) -> bool {
        let Some(index) = self.index_of(piece) else {
            return false;
        };
        self.pieces.remove(index);
        self.refresh(arena);
        true
    }

    /// Exchange `piece` with whatever sits at `index` (clamped to the last slot)
    pub fn swap(&mut self, arena: &mut PieceArena, piece: PieceId, index: usize) -> bool {
        let Some(from) = self.index_of(piece) else {
            return false;
        };
        let to = index.min(self.pieces.len() - 1);
        self.pieces.swap(from, to);
        self.refresh(arena);
        true
    }

    /// Detach every piece, returning them in order. Owners are left for the caller.
    pub(crate) fn take_all(&mut self, arena: &mut PieceArena) -> Vec<PieceId> {
        let taken = std::mem::take(&mut self.pieces);
        self.refresh(arena);
        taken
    }

    /// Deterministically reorder resident pieces
    pub fn shuffle(&mut self, arena: &mut PieceArena, seed: u64) {
        let mut rng = Pcg32::seed_from_u64(seed);
        self.pieces.shuffle(&mut rng);
        self.refresh(arena);
    }

    /// Up to `n` distinct resident pieces chosen by `seed`
    pub fn random_pieces(&self, n: usize, seed: u64) -> Vec<PieceId> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut picked = self.pieces.clone();
        picked.shuffle(&mut rng);
        picked.truncate(n);
        picked
    }

    /// Which pieces a pointer-down on `piece` lifts, or `None` if it may not be lifted
    pub fn grab_batch(&self, piece: PieceId) -> Option<Vec<PieceId>> {
        let index = self.index_of(piece)?;
        match &self.kind {
            ContainerKind::Hand { .. } => Some(vec![piece]),
            ContainerKind::Pile {
                restrict_to_top,
                grab_above,
                ..
            } => {
                let is_top = index + 1 == self.pieces.len();
                if *restrict_to_top && !is_top {
                    None
                } else if *grab_above {
                    Some(self.pieces[index..].to_vec())
                } else {
                    Some(vec![piece])
                }
            }
        }
    }

    /// Resting slots for the current membership, in membership order
    pub fn layout_slots(&self) -> Vec<LayoutSlot> {
        let count = self.pieces.len();
        match &self.kind {
            ContainerKind::Hand { max_spread, .. } => {
                let step = hand_step(self.piece_size.x, *max_spread, count);
                let total = step * count.saturating_sub(1) as f32;
                (0..count)
                    .map(|i| LayoutSlot {
                        transform: Transform::at(
                            self.origin + Vec2::new(-total / 2.0 + step * i as f32, 0.0),
                        ),
                        z_index: i as i32,
                        visible: true,
                        interactive: true,
                    })
                    .collect()
            }
            ContainerKind::Pile {
                direction,
                gap,
                max_visible,
                restrict_to_top,
                ..
            } => {
                let first_visible = count.saturating_sub(*max_visible);
                (0..count)
                    .map(|i| {
                        let lifted = i.saturating_sub(first_visible) as f32;
                        let visible = i >= first_visible;
                        let interactive = if *restrict_to_top {
                            i + 1 == count
                        } else {
                            visible
                        };
                        LayoutSlot {
                            transform: Transform::at(self.origin + direction.offset() * *gap * lifted),
                            z_index: i as i32,
                            visible,
                            interactive,
                        }
                    })
                    .collect()
            }
        }
    }

    /// Recompute targets, depth, visibility and sensor partitions for every
    /// resident piece
    pub fn refresh(&mut self, arena: &mut PieceArena) {
        self.revision += 1;
        let slots = self.layout_slots();
        for (&id, slot) in self.pieces.iter().zip(&slots) {
            if let Some(piece) = arena.get_mut(id) {
                piece.layout_target = Some(slot.transform);
                piece.apply_layout(slot.z_index, slot.visible, slot.interactive);
            }
        }

        let origin = self.origin;
        let piece_width = self.piece_size.x;
        let Some(sensor) = self.sensor.as_mut() else {
            return;
        };
        match &self.kind {
            ContainerKind::Hand { fit_sensor, .. } => {
                let centres: Vec<f32> = slots
                    .iter()
                    .map(|s| s.transform.position.x - origin.x)
                    .collect();
                if *fit_sensor {
                    let rect = sensor.rect();
                    let span = match (centres.first(), centres.last()) {
                        (Some(first), Some(last)) => last - first,
                        _ => 0.0,
                    };
                    let width = span + piece_width;
                    sensor.set_rect(Rect::new(
                        Vec2::new(-width / 2.0, rect.position.y),
                        Vec2::new(width, rect.size.y),
                    ));
                }
                sensor.set_partitions(Axis::Vertical, centres);
            }
            ContainerKind::Pile { .. } => sensor.clear_partitions(),
        }
    }
}

/// Horizontal distance between neighbouring hand pieces
fn hand_step(piece_width: f32, max_spread: f32, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    piece_width.min(max_spread / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::piece::Piece;

    fn arena_with(n: usize) -> (PieceArena, Vec<PieceId>) {
        let mut arena = PieceArena::new();
        let ids = (0..n)
            .map(|i| arena.insert(Piece::new(format!("p{i}"), Transform::default())))
            .collect();
        (arena, ids)
    }

    fn hand_with_sensor() -> Container {
        Container::new("hand", ContainerKind::hand()).with_sensor(Sensor::new(Rect::centered(
            Vec2::ZERO,
            Vec2::new(800.0, 200.0),
        )))
    }

    #[test]
    fn test_add_append_and_clamped_insert() {
        let (mut arena, ids) = arena_with(4);
        let mut hand = hand_with_sensor();
        assert!(hand.add(&mut arena, ids[0], None));
        assert!(hand.add(&mut arena, ids[1], None));
        assert!(hand.add(&mut arena, ids[2], Some(0)));
        assert!(hand.add(&mut arena, ids[3], Some(99)));
        assert_eq!(hand.pieces(), &[ids[2], ids[0], ids[1], ids[3]]);
        assert!(ids.iter().all(|&id| arena.owner_of(id) == Some(hand.id())));
    }

    #[test]
    fn test_re_add_is_idempotent_but_refreshes() {
        let (mut arena, ids) = arena_with(2);
        let mut hand = hand_with_sensor();
        hand.add(&mut arena, ids[0], None);
        hand.add(&mut arena, ids[1], None);
        let revision = hand.revision();
        assert!(!hand.add(&mut arena, ids[0], Some(1)));
        assert!(!hand.add(&mut arena, ids[0], None));
        assert_eq!(hand.pieces(), &[ids[0], ids[1]]);
        assert_eq!(hand.revision(), revision + 2);
    }

    #[test]
    fn test_remove_keeps_owner_field() {
        let (mut arena, ids) = arena_with(2);
        let mut pile = Container::new("pile", ContainerKind::pile());
        pile.add(&mut arena, ids[0], None);
        assert!(pile.remove(&mut arena, ids[0]));
        assert!(!pile.remove(&mut arena, ids[0]));
        assert!(!pile.remove(&mut arena, ids[1]));
        assert!(pile.is_empty());
        assert_eq!(arena.owner_of(ids[0]), Some(pile.id()));
    }

    #[test]
    fn test_capacity_counts_only_new_pieces() {
        let (mut arena, ids) = arena_with(4);
        let mut hand = hand_with_sensor().with_capacity(3);
        hand.add(&mut arena, ids[0], None);
        hand.add(&mut arena, ids[1], None);
        assert!(hand.can_accept(&[ids[0], ids[2]]).is_ok());
        assert_eq!(
            hand.can_accept(&[ids[2], ids[3]]),
            Err(Rejection::Capacity {
                capacity: 3,
                resident: 2,
                incoming: 2
            })
        );
        assert_eq!(
            hand.can_accept(&[ids[2], ids[2]]),
            Err(Rejection::DuplicatePiece)
        );
    }

    #[test]
    fn test_type_filter() {
        let hand = Container::new("hand", ContainerKind::hand()).with_accept_type("card");
        assert!(hand.matches_type(Some("card")));
        assert!(!hand.matches_type(Some("token")));
        assert!(!hand.matches_type(None));
        let open = Container::new("table", ContainerKind::pile());
        assert!(open.matches_type(None));
    }

    #[test]
    fn test_tagged_acceptance_reports_mismatch() {
        let (_, ids) = arena_with(1);
        let hand = Container::new("hand", ContainerKind::hand()).with_accept_type("card");
        assert_eq!(hand.can_accept_tagged(&ids, Some("card")), Ok(()));
        assert_eq!(
            hand.can_accept_tagged(&ids, Some("token")),
            Err(Rejection::TypeMismatch {
                expected: "card".into(),
                found: Some("token".into()),
            })
        );
        assert_eq!(
            hand.can_accept_tagged(&ids, None),
            Err(Rejection::TypeMismatch {
                expected: "card".into(),
                found: None,
            })
        );
        // Duplicate check runs before the type filter
        assert_eq!(
            hand.can_accept_tagged(&[ids[0], ids[0]], Some("token")),
            Err(Rejection::DuplicatePiece)
        );
    }

    #[test]
    fn test_hand_partitions_follow_piece_centres() {
        let (mut arena, ids) = arena_with(3);
        let mut hand = hand_with_sensor()
            .with_piece_size(Vec2::new(100.0, 140.0))
            .with_origin(Vec2::new(500.0, 400.0));
        for &id in &ids {
            hand.add(&mut arena, id, None);
        }
        let sensor = hand.sensor().unwrap();
        assert_eq!(sensor.partitions(Axis::Vertical), &[-100.0, 0.0, 100.0]);
        // Left of every centre, between first and second, right of all
        assert_eq!(hand.drop_index(Vec2::new(350.0, 400.0)), Some(0));
        assert_eq!(hand.drop_index(Vec2::new(450.0, 400.0)), Some(1));
        assert_eq!(hand.drop_index(Vec2::new(650.0, 400.0)), Some(3));
        let target = arena.get(ids[2]).unwrap().layout_target().unwrap();
        assert_eq!(target.position, Vec2::new(600.0, 400.0));
    }

    #[test]
    fn test_hand_fit_sensor() {
        let (mut arena, ids) = arena_with(2);
        let mut hand = Container::new(
            "hand",
            ContainerKind::Hand {
                max_spread: 700.0,
                fit_sensor: true,
            },
        )
        .with_piece_size(Vec2::new(100.0, 140.0))
        .with_sensor(Sensor::new(Rect::new(Vec2::new(0.0, -70.0), Vec2::new(10.0, 140.0))));
        hand.add(&mut arena, ids[0], None);
        assert_eq!(hand.sensor().unwrap().rect().size.x, 100.0);
        hand.add(&mut arena, ids[1], None);
        let rect = hand.sensor().unwrap().rect();
        assert_eq!(rect.size, Vec2::new(200.0, 140.0));
        assert_eq!(rect.position, Vec2::new(-100.0, -70.0));
    }

    #[test]
    fn test_pile_visibility_and_grab_rules() {
        let (mut arena, ids) = arena_with(4);
        let mut pile = Container::new(
            "pile",
            ContainerKind::Pile {
                direction: PileDirection::Down,
                gap: 10.0,
                max_visible: 2,
                restrict_to_top: true,
                grab_above: false,
            },
        );
        for &id in &ids {
            pile.add(&mut arena, id, None);
        }
        let slots = pile.layout_slots();
        assert_eq!(
            slots.iter().map(|s| s.visible).collect::<Vec<_>>(),
            vec![false, false, true, true]
        );
        assert_eq!(slots[3].transform.position, Vec2::new(0.0, 10.0));
        assert!(!arena.get(ids[2]).unwrap().visual().interactive);
        assert_eq!(pile.grab_batch(ids[2]), None);
        assert_eq!(pile.grab_batch(ids[3]), Some(vec![ids[3]]));
        assert_eq!(pile.top_pieces(2), &[ids[2], ids[3]]);
        assert_eq!(pile.top_pieces(10).len(), 4);
    }

    #[test]
    fn test_pile_grab_above() {
        let (mut arena, ids) = arena_with(4);
        let mut pile = Container::new(
            "tableau",
            ContainerKind::Pile {
                direction: PileDirection::Down,
                gap: 30.0,
                max_visible: 20,
                restrict_to_top: false,
                grab_above: true,
            },
        );
        for &id in &ids {
            pile.add(&mut arena, id, None);
        }
        assert_eq!(pile.grab_batch(ids[1]), Some(vec![ids[1], ids[2], ids[3]]));
    }

    #[test]
    fn test_swap() {
        let (mut arena, ids) = arena_with(3);
        let mut hand = hand_with_sensor();
        for &id in &ids {
            hand.add(&mut arena, id, None);
        }
        assert!(hand.swap(&mut arena, ids[0], 7));
        assert_eq!(hand.pieces(), &[ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_seeded_shuffle_and_random_draw_are_deterministic() {
        let (mut arena, ids) = arena_with(8);
        let mut a = Container::new("a", ContainerKind::pile());
        for &id in &ids {
            a.add(&mut arena, id, None);
        }
        let draw = a.random_pieces(3, 42);
        assert_eq!(draw, a.random_pieces(3, 42));
        assert_eq!(draw.len(), 3);
        assert!(draw.iter().all(|p| a.contains(*p)));

        let before = a.pieces().to_vec();
        a.shuffle(&mut arena, 7);
        let once = a.pieces().to_vec();
        let mut sorted = once.clone();
        sorted.sort();
        assert_eq!(sorted, before);

        let mut b = Container::new("b", ContainerKind::pile());
        for &id in &before {
            b.pieces.push(id);
        }
        b.shuffle(&mut arena, 7);
        assert_eq!(b.pieces(), once.as_slice());
    }
}
