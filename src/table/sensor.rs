//! Drop sensors: a detection rectangle plus partition boundaries
//!
//! Boundaries split the rectangle into `N + 1` zones along one axis. The
//! partition index of a point is the number of boundaries it has passed.
//!
//! The sensor works in whatever space its rectangle is expressed in; the
//! caller converts query points into that space first.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Partition axis.
/// `Vertical` boundaries are x-coordinates (left to right),
/// `Horizontal` boundaries are y-coordinates (top to bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    #[inline]
    fn coordinate(self, point: Vec2) -> f32 {
        match self {
            Axis::Vertical => point.x,
            Axis::Horizontal => point.y,
        }
    }
}

/// Axis-aligned rectangle (top-left position + size)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub position: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    /// Rectangle of `size` centred on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size / 2.0, size)
    }

    pub fn end(&self) -> Vec2 {
        self.position + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size / 2.0
    }

    /// Half-open containment: left/top edges inside, right/bottom edges outside
    pub fn contains(&self, point: Vec2) -> bool {
        let end = self.end();
        point.x >= self.position.x && point.x < end.x && point.y >= self.position.y && point.y < end.y
    }
}

/// Read-only view for debug drawing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorOutline {
    pub rect: Rect,
    pub enabled: bool,
    pub vertical: Vec<f32>,
    pub horizontal: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    rect: Rect,
    enabled: bool,
    vertical: Vec<f32>,
    horizontal: Vec<f32>,
}

impl Sensor {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            enabled: true,
            vertical: Vec::new(),
            horizontal: Vec::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.rect.contains(point)
    }

    pub fn partitions(&self, axis: Axis) -> &[f32] {
        match axis {
            Axis::Vertical => &self.vertical,
            Axis::Horizontal => &self.horizontal,
        }
    }

    /// Replace every boundary on `axis` at once.
    ///
    /// Precondition: `boundaries` ascend along the axis. This is not checked;
    /// unsorted boundaries give meaningless indices.
    pub fn set_partitions(&mut self, axis: Axis, boundaries: Vec<f32>) {
        debug_assert!(
            boundaries.windows(2).all(|w| w[0] <= w[1]),
            "partition boundaries must ascend"
        );
        match axis {
            Axis::Vertical => self.vertical = boundaries,
            Axis::Horizontal => self.horizontal = boundaries,
        }
    }

    pub fn clear_partitions(&mut self) {
        self.vertical.clear();
        self.horizontal.clear();
    }

    /// Zone index of `point` along `axis`.
    ///
    /// `None` when the point is outside the rectangle or the axis has no
    /// boundaries; otherwise the count of boundaries `<=` the point's coordinate.
    pub fn partition_index(&self, point: Vec2, axis: Axis) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let boundaries = self.partitions(axis);
        if boundaries.is_empty() {
            return None;
        }
        let coordinate = axis.coordinate(point);
        Some(boundaries.iter().filter(|&&b| b <= coordinate).count())
    }

    /// Insertion index preference for a drop at `point`: vertical first,
    /// then horizontal; `None` means append
    pub fn drop_index(&self, point: Vec2) -> Option<usize> {
        self.partition_index(point, Axis::Vertical)
            .or_else(|| self.partition_index(point, Axis::Horizontal))
    }

    pub fn outline(&self) -> SensorOutline {
        SensorOutline {
            rect: self.rect,
            enabled: self.enabled,
            vertical: self.vertical.clone(),
            horizontal: self.horizontal.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor_300() -> Sensor {
        Sensor::new(Rect::new(Vec2::ZERO, Vec2::new(300.0, 100.0)))
    }

    #[test]
    fn test_vertical_partition_index() {
        let mut sensor = sensor_300();
        sensor.set_partitions(Axis::Vertical, vec![100.0, 200.0]);
        assert_eq!(sensor.partition_index(Vec2::new(150.0, 50.0), Axis::Vertical), Some(1));
        assert_eq!(sensor.partition_index(Vec2::new(50.0, 50.0), Axis::Vertical), Some(0));
        assert_eq!(sensor.partition_index(Vec2::new(250.0, 50.0), Axis::Vertical), Some(2));
        // Boundary itself counts as passed
        assert_eq!(sensor.partition_index(Vec2::new(100.0, 50.0), Axis::Vertical), Some(1));
    }

    #[test]
    fn test_outside_is_none_regardless_of_boundaries() {
        let mut sensor = sensor_300();
        sensor.set_partitions(Axis::Vertical, vec![100.0, 200.0]);
        assert_eq!(sensor.partition_index(Vec2::new(150.0, 150.0), Axis::Vertical), None);
        assert_eq!(sensor.partition_index(Vec2::new(-1.0, 50.0), Axis::Vertical), None);
        assert_eq!(sensor.partition_index(Vec2::new(300.0, 50.0), Axis::Vertical), None);
    }

    #[test]
    fn test_no_boundaries_is_none() {
        let sensor = sensor_300();
        assert!(sensor.contains(Vec2::new(10.0, 10.0)));
        assert_eq!(sensor.partition_index(Vec2::new(10.0, 10.0), Axis::Horizontal), None);
        assert_eq!(sensor.drop_index(Vec2::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_horizontal_and_drop_index_order() {
        let mut sensor = sensor_300();
        sensor.set_partitions(Axis::Horizontal, vec![25.0, 75.0]);
        let point = Vec2::new(10.0, 80.0);
        assert_eq!(sensor.partition_index(point, Axis::Horizontal), Some(2));
        assert_eq!(sensor.drop_index(point), Some(2));

        sensor.set_partitions(Axis::Vertical, vec![5.0]);
        assert_eq!(sensor.drop_index(point), Some(1));
    }

    #[test]
    fn test_set_partitions_replaces() {
        let mut sensor = sensor_300();
        sensor.set_partitions(Axis::Vertical, vec![10.0, 20.0, 30.0]);
        sensor.set_partitions(Axis::Vertical, vec![150.0]);
        assert_eq!(sensor.partitions(Axis::Vertical), &[150.0]);
        let outline = sensor.outline();
        assert_eq!(outline.vertical, vec![150.0]);
        assert!(outline.horizontal.is_empty());
        sensor.clear_partitions();
        assert!(sensor.partitions(Axis::Vertical).is_empty());
    }

    #[test]
    fn test_rect_half_open() {
        let rect = Rect::centered(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert!(rect.contains(Vec2::new(-5.0, -5.0)));
        assert!(!rect.contains(Vec2::new(5.0, 0.0)));
        assert_eq!(rect.center(), Vec2::ZERO);
    }
}
