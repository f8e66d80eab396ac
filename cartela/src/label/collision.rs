use cartela_types::Box2d;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Boxes of all labels and symbols placed so far in a render pass.
///
/// Boxes overlap only if they share interior points: boxes touching by an edge don't collide.
#[derive(Debug, Default, Clone)]
pub struct CollisionDetector {
    tree: RTree<IndexedBox>,
    boxes: Vec<Box2d>,
}

fn overlaps(a: &Box2d, b: &Box2d) -> bool {
    a.minx < b.maxx && b.minx < a.maxx && a.miny < b.maxy && b.miny < a.maxy
}

impl CollisionDetector {
    /// Creates an empty detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of placed boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns true if nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Placed boxes in insertion order.
    pub fn boxes(&self) -> &[Box2d] {
        &self.boxes
    }

    /// Checks that no box overlaps any placed box expanded by `minimum_distance`.
    pub fn has_placement(&self, boxes: &[Box2d], minimum_distance: f64) -> bool {
        let distance = minimum_distance.max(0.0);
        boxes.iter().all(|bbox| {
            if !bbox.is_valid() {
                return true;
            }

            let envelope = AABB::from_corners(
                [bbox.minx - distance, bbox.miny - distance],
                [bbox.maxx + distance, bbox.maxy + distance],
            );
            !self
                .tree
                .locate_in_envelope_intersecting(&envelope)
                .any(|entry| overlaps(&self.boxes[entry.data].pad(distance), bbox))
        })
    }

    /// Registers the boxes without checking for collisions.
    pub fn insert(&mut self, boxes: &[Box2d]) {
        for bbox in boxes.iter().filter(|b| b.is_valid()) {
            let index = self.boxes.len();
            self.boxes.push(*bbox);
            self.tree.insert(IndexedBox::new(
                Rectangle::from_corners([bbox.minx, bbox.miny], [bbox.maxx, bbox.maxy]),
                index,
            ));
        }
    }

    /// Registers the boxes if none of them collides with already placed ones. Returns whether
    /// they were placed.
    pub fn try_place(&mut self, boxes: &[Box2d], minimum_distance: f64) -> bool {
        if !self.has_placement(boxes, minimum_distance) {
            return false;
        }

        self.insert(boxes);
        true
    }

    /// Removes all boxes.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.boxes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_and_collisions() {
        let mut detector = CollisionDetector::new();
        assert!(detector.try_place(&[Box2d::new(0.0, 0.0, 10.0, 10.0)], 0.0));
        assert!(!detector.try_place(&[Box2d::new(5.0, 5.0, 15.0, 15.0)], 0.0));
        assert!(detector.try_place(&[Box2d::new(10.0, 0.0, 20.0, 10.0)], 0.0));
        assert_eq!(detector.len(), 2);

        assert!(!detector.has_placement(&[Box2d::new(22.0, 0.0, 30.0, 10.0)], 3.0));
        assert!(detector.has_placement(&[Box2d::new(22.0, 0.0, 30.0, 10.0)], 1.5));

        detector.clear();
        assert!(detector.is_empty());
        assert!(detector.try_place(&[Box2d::new(5.0, 5.0, 15.0, 15.0)], 0.0));
    }

    #[test]
    fn all_boxes_must_fit() {
        let mut detector = CollisionDetector::new();
        detector.insert(&[Box2d::new(0.0, 0.0, 1.0, 1.0)]);
        let boxes = [
            Box2d::new(5.0, 5.0, 6.0, 6.0),
            Box2d::new(0.5, 0.5, 2.0, 2.0),
        ];
        assert!(!detector.try_place(&boxes, 0.0));
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn placement_does_not_depend_on_distant_boxes() {
        let label = [Box2d::new(0.0, 0.0, 10.0, 4.0)];
        let mut alone = CollisionDetector::new();
        let mut crowded = CollisionDetector::new();
        crowded.insert(&[Box2d::new(13.0, 0.0, 20.0, 4.0)]);

        assert!(alone.try_place(&label, 2.0));
        assert!(crowded.try_place(&label, 2.0));
    }
}
