//! Exclusive interaction slot
//!
//! A single pointer means at most one piece (or one held batch) may be
//! hovering or holding at a time. This is shared mutable state scoped to one
//! session; it is only touched from the event thread and is released on
//! teardown.

use super::piece::PieceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateSlot {
    Hovering(PieceId),
    /// `lead` is the piece the pointer went down on
    Holding { lead: PieceId, batch: Vec<PieceId> },
}

#[derive(Debug, Clone, Default)]
pub struct InteractionGate {
    slot: Option<GateSlot>,
}

impl InteractionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> Option<&GateSlot> {
        self.slot.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.slot.is_none()
    }

    /// A piece may start hovering when nothing else hovers or holds
    pub fn can_hover(&self, piece: PieceId) -> bool {
        match &self.slot {
            None => true,
            Some(GateSlot::Hovering(current)) => *current == piece,
            Some(GateSlot::Holding { .. }) => false,
        }
    }

    /// A piece may be picked up when nothing is held and no other piece hovers
    pub fn can_hold(&self, piece: PieceId) -> bool {
        match &self.slot {
            None => true,
            Some(GateSlot::Hovering(current)) => *current == piece,
            Some(GateSlot::Holding { .. }) => false,
        }
    }

    pub fn hovering(&self) -> Option<PieceId> {
        match &self.slot {
            Some(GateSlot::Hovering(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn holding(&self) -> Option<&[PieceId]> {
        match &self.slot {
            Some(GateSlot::Holding { batch, .. }) => Some(batch),
            _ => None,
        }
    }

    pub fn claim_hover(&mut self, piece: PieceId) -> bool {
        if !self.can_hover(piece) {
            return false;
        }
        self.slot = Some(GateSlot::Hovering(piece));
        true
    }

    pub fn claim_hold(&mut self, lead: PieceId, batch: Vec<PieceId>) -> bool {
        if !self.can_hold(lead) {
            return false;
        }
        self.slot = Some(GateSlot::Holding { lead, batch });
        true
    }

    /// Release the hover slot if `piece` owns it
    pub fn release_hover(&mut self, piece: PieceId) {
        if self.hovering() == Some(piece) {
            self.slot = None;
        }
    }

    /// Release a held batch, returning it
    pub fn release_hold(&mut self) -> Option<Vec<PieceId>> {
        match self.slot.take() {
            Some(GateSlot::Holding { batch, .. }) => Some(batch),
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Drop any claim (session teardown)
    pub fn reset(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_hover() {
        let mut gate = InteractionGate::new();
        let (a, b) = (PieceId(1), PieceId(2));
        assert!(gate.claim_hover(a));
        assert!(gate.claim_hover(a));
        assert!(!gate.claim_hover(b));
        gate.release_hover(b);
        assert_eq!(gate.hovering(), Some(a));
        gate.release_hover(a);
        assert!(gate.is_free());
    }

    #[test]
    fn test_hold_excludes_everything() {
        let mut gate = InteractionGate::new();
        let (a, b) = (PieceId(1), PieceId(2));
        assert!(gate.claim_hover(a));
        assert!(!gate.can_hold(b));
        assert!(gate.claim_hold(a, vec![a, b]));
        assert!(!gate.can_hover(a));
        assert!(!gate.can_hold(b));
        assert_eq!(gate.holding(), Some(&[a, b][..]));
        assert_eq!(gate.release_hold(), Some(vec![a, b]));
        assert!(gate.is_free());
    }

    #[test]
    fn test_release_hold_keeps_hover() {
        let mut gate = InteractionGate::new();
        gate.claim_hover(PieceId(3));
        assert_eq!(gate.release_hold(), None);
        assert_eq!(gate.hovering(), Some(PieceId(3)));
        gate.reset();
        assert!(gate.is_free());
    }
}
