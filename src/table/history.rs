//! Move history (LIFO, unbounded, no redo)

use serde::{Deserialize, Serialize};

use super::container::ContainerId;
use super::piece::PieceId;

/// Where one piece sat before a recorded move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceOrigin {
    pub container: ContainerId,
    pub index: usize,
}

/// Pre-move state of one recorded move. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Previous owner of the first piece that arrived from elsewhere;
    /// `None` when that piece had no container
    pub from: Option<ContainerId>,
    pub to: ContainerId,
    pub pieces: Vec<PieceId>,
    /// Index of each piece in its previous container, parallel to `pieces`;
    /// empty when any piece had no container
    pub from_indices: Vec<usize>,
    /// Previous placement of each piece, parallel to `pieces`. Batches may
    /// mix sources (including `to` itself); undo restores each group into
    /// its own container.
    #[serde(default)]
    pub origins: Vec<Option<PieceOrigin>>,
}

impl HistoryRecord {
    /// Single-source record. Origins are derived when `from_indices` is
    /// parallel to `pieces`; otherwise they stay empty and undo falls back
    /// to `from`/`from_indices` alone.
    pub fn new(
        from: Option<ContainerId>,
        to: ContainerId,
        pieces: Vec<PieceId>,
        from_indices: Vec<usize>,
    ) -> Self {
        let origins = match from {
            None => vec![None; pieces.len()],
            Some(container) if from_indices.len() == pieces.len() => from_indices
                .iter()
                .map(|&index| Some(PieceOrigin { container, index }))
                .collect(),
            Some(_) => Vec::new(),
        };
        Self {
            from,
            to,
            pieces,
            from_indices,
            origins,
        }
    }

    /// Record built from each piece's previous placement
    pub fn from_origins(
        to: ContainerId,
        pieces: Vec<PieceId>,
        origins: Vec<Option<PieceOrigin>>,
    ) -> Self {
        debug_assert_eq!(pieces.len(), origins.len(), "origins must be parallel to pieces");
        let lead = origins
            .iter()
            .find(|o| o.is_none_or(|o| o.container != to))
            .or(origins.first())
            .copied()
            .flatten();
        let from_indices = origins
            .iter()
            .map(|o| o.map(|o| o.index))
            .collect::<Option<Vec<usize>>>()
            .unwrap_or_default();
        Self {
            from: lead.map(|o| o.container),
            to,
            pieces,
            from_indices,
            origins,
        }
    }

    /// Whether every piece has a recorded origin entry
    pub fn has_origins(&self) -> bool {
        !self.pieces.is_empty() && self.origins.len() == self.pieces.len()
    }

    /// Distinct previous owners, in first-appearance order
    pub fn sources(&self) -> Vec<ContainerId> {
        let mut sources: Vec<ContainerId> = Vec::new();
        for origin in self.origins.iter().flatten() {
            if !sources.contains(&origin.container) {
                sources.push(origin.container);
            }
        }
        sources
    }

    pub fn describe(&self) -> String {
        let pieces = self
            .pieces
            .iter()
            .map(PieceId::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let from = self
            .from
            .map(|c| c.to_string())
            .unwrap_or_else(|| "nowhere".to_string());
        let extra = self.sources().len().saturating_sub(1);
        let from = if extra > 0 {
            format!("{from} (+{extra} more)")
        } else {
            from
        };
        if self.from_indices.is_empty() {
            format!("[{pieces}] {from} -> {}", self.to)
        } else {
            format!("[{pieces}] {from} {:?} -> {}", self.from_indices, self.to)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    records: Vec<HistoryRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: HistoryRecord) {
        log::info!("History push: {}", record.describe());
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<HistoryRecord> {
        self.records.pop()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            log::info!("History reset ({} records dropped)", self.records.len());
        }
        self.records.clear();
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
