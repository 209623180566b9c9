//! Undo placement: turn recorded original indices back into insertions
//!
//! Sequential re-insertion at recorded indices only lands pieces where they
//! were when the insertions cannot disturb each other. Two orders are used:
//!
//! - contiguous run (`[2, 3, 4]`): insert from the lowest index upward, one
//!   slot per piece, rebuilding the block that was moved together;
//! - scattered indices (`[4, 1]`): insert in ascending original index,
//!   clamped to the current length. Lower slots are filled first, so every
//!   later index is measured against a prefix that is already restored.
//!   Equal indices keep input order, each tie landing just after the previous one.
//!
//! Anything that cannot be planned exactly falls back to appending in input order.

use serde::Serialize;

use super::piece::PieceId;
use crate::error::ConsistencyViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestoreStrategy {
    /// No indices (or unusable ones): append each piece in input order
    Append,
    Contiguous,
    Scattered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreStep {
    pub piece: PieceId,
    /// Insertion index; `None` appends
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestorePlan {
    pub strategy: RestoreStrategy,
    pub steps: Vec<RestoreStep>,
    /// Set when the degraded path was taken because the inputs were inconsistent
    pub violation: Option<ConsistencyViolation>,
}

impl RestorePlan {
    fn append(pieces: &[PieceId], violation: Option<ConsistencyViolation>) -> Self {
        Self {
            strategy: RestoreStrategy::Append,
            steps: pieces
                .iter()
                .map(|&piece| RestoreStep { piece, index: None })
                .collect(),
            violation,
        }
    }
}

/// Plan the re-insertion of `pieces` into the container they came from.
pub fn restore_plan(pieces: &[PieceId], from_indices: &[usize]) -> RestorePlan {
    if from_indices.is_empty() {
        return RestorePlan::append(pieces, None);
    }
    if from_indices.len() != pieces.len() {
        let violation = ConsistencyViolation::LengthMismatch {
            pieces: pieces.len(),
            indices: from_indices.len(),
        };
        log::warn!("Undo falling back to append: {}", violation);
        return RestorePlan::append(pieces, Some(violation));
    }

    // Stable sort keeps input order among equal indices
    let mut pairs: Vec<(usize, PieceId)> = from_indices
        .iter()
        .copied()
        .zip(pieces.iter().copied())
        .collect();
    pairs.sort_by_key(|&(index, _)| index);

    let contiguous = pairs.windows(2).all(|w| w[1].0 == w[0].0 + 1);
    if contiguous {
        let low = pairs[0].0;
        let steps = pairs
            .iter()
            .enumerate()
            .map(|(offset, &(_, piece))| RestoreStep {
                piece,
                index: Some(low + offset),
            })
            .collect();
        return RestorePlan {
            strategy: RestoreStrategy::Contiguous,
            steps,
            violation: None,
        };
    }

    let mut steps = Vec::with_capacity(pairs.len());
    let mut previous: Option<usize> = None;
    for (index, piece) in pairs {
        let target = match previous {
            Some(prev) if index <= prev => prev + 1,
            _ => index,
        };
        previous = Some(target);
        steps.push(RestoreStep {
            piece,
            index: Some(target),
        });
    }
    RestorePlan {
        strategy: RestoreStrategy::Scattered,
        steps,
        violation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<PieceId> {
        (1..=n).map(PieceId).collect()
    }

    /// Apply a plan to a plain vector the way `Container::add` would (clamped insert)
    fn apply(mut seq: Vec<PieceId>, plan: &RestorePlan) -> Vec<PieceId> {
        for step in &plan.steps {
            match step.index {
                Some(i) => seq.insert(i.min(seq.len()), step.piece),
                None => seq.push(step.piece),
            }
        }
        seq
    }

    /// Remove `picked` (by position) from `original`, then restore via the plan
    fn round_trip(original: &[PieceId], picked: &[usize]) -> Vec<PieceId> {
        let pieces: Vec<PieceId> = picked.iter().map(|&i| original[i]).collect();
        let remaining: Vec<PieceId> = original
            .iter()
            .copied()
            .filter(|p| !pieces.contains(p))
            .collect();
        let plan = restore_plan(&pieces, picked);
        apply(remaining, &plan)
    }

    #[test]
    fn test_contiguous_run() {
        let original = ids(6);
        let plan = restore_plan(&original[2..5], &[2, 3, 4]);
        assert_eq!(plan.strategy, RestoreStrategy::Contiguous);
        assert_eq!(round_trip(&original, &[2, 3, 4]), original);
    }

    #[test]
    fn test_contiguous_run_given_out_of_order() {
        let original = ids(5);
        // Same block listed in a different order still restores exactly
        assert_eq!(round_trip(&original, &[3, 1, 2]), original);
    }

    #[test]
    fn test_scattered_indices() {
        let original = ids(5);
        let plan = restore_plan(&[original[4], original[1]], &[4, 1]);
        assert_eq!(plan.strategy, RestoreStrategy::Scattered);
        assert_eq!(round_trip(&original, &[4, 1]), original);
    }

    #[test]
    fn test_scattered_mixed_adjacent_and_distant() {
        let original = ids(4);
        assert_eq!(round_trip(&original, &[0, 1, 3]), original);
        assert_eq!(round_trip(&original, &[3, 0, 1]), original);
    }

    #[test]
    fn test_equal_indices_keep_input_order() {
        let (a, b, p, q) = (PieceId(1), PieceId(2), PieceId(10), PieceId(11));
        let plan = restore_plan(&[p, q], &[1, 1]);
        assert_eq!(plan.strategy, RestoreStrategy::Scattered);
        assert_eq!(apply(vec![a, b], &plan), vec![a, p, q, b]);
    }

    #[test]
    fn test_empty_indices_append() {
        let pieces = ids(3);
        let plan = restore_plan(&pieces, &[]);
        assert_eq!(plan.strategy, RestoreStrategy::Append);
        assert!(plan.violation.is_none());
        assert!(plan.steps.iter().all(|s| s.index.is_none()));
    }

    #[test]
    fn test_length_mismatch_degrades() {
        crate::init_test_logging();
        let pieces = ids(3);
        let plan = restore_plan(&pieces, &[0, 1]);
        assert_eq!(plan.strategy, RestoreStrategy::Append);
        assert_eq!(
            plan.violation,
            Some(ConsistencyViolation::LengthMismatch { pieces: 3, indices: 2 })
        );
        let order: Vec<_> = plan.steps.iter().map(|s| s.piece).collect();
        assert_eq!(order, pieces);
    }

    #[test]
    fn test_indices_past_end_clamp() {
        let original = ids(2);
        // Source shrank since the move; clamped inserts still keep relative order
        let plan = restore_plan(&[PieceId(7), PieceId(8)], &[5, 9]);
        assert_eq!(
            apply(original.clone(), &plan),
            vec![original[0], original[1], PieceId(7), PieceId(8)]
        );
    }
}
