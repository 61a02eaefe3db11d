// A committed pointer gesture: where the pointer went and what it drew with.

use crate::brush::BrushDescriptor;
use crate::geometry::Point;

/// Immutable once built. Layers replay these to rebuild their pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeRecord {
    points: Vec<Point>,
    brush: BrushDescriptor,
}

impl StrokeRecord {
    /// None when `points` is empty: there is nothing to record.
    pub fn new(points: Vec<Point>, brush: BrushDescriptor) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self { points, brush })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn brush(&self) -> &BrushDescriptor {
        &self.brush
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_gesture_is_not_recorded() {
        assert!(StrokeRecord::new(Vec::new(), BrushDescriptor::default()).is_none());
    }

    #[test]
    fn record_keeps_its_own_brush_copy() {
        let mut live = BrushDescriptor::default();
        let rec = StrokeRecord::new(vec![Point::new(1.0, 2.0)], live.clone()).unwrap();
        live.size = 40.0;
        assert_eq!(rec.brush().size, 2.0);
        assert_eq!(rec.points(), &[Point::new(1.0, 2.0)]);
    }
}
