//! Quadtree spatial index for "what overlaps this box" queries
//!
//! The index is built once per relaxation pass and never mutated afterwards,
//! so it has no removal or update operation.

use super::types::Bounds;

/// Default number of entries a node holds before it subdivides
pub const DEFAULT_CAPACITY: usize = 4;

/// Depth at which nodes stop subdividing and just accumulate entries
const MAX_DEPTH: usize = 16;

/// A region quadtree keyed by bounding boxes
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    root: Node<T>,
    capacity: usize,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<T> {
    boundary: Bounds,
    depth: usize,
    /// Entries that fit in this node but straddle a child boundary stay here
    entries: Vec<(Bounds, T)>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: Copy> QuadTree<T> {
    /// Create an empty index covering `boundary`
    pub fn new(boundary: Bounds, capacity: usize) -> Self {
        Self {
            root: Node::new(boundary, 0),
            capacity: capacity.max(1),
            len: 0,
        }
    }

    /// Build an index over `items` in one go
    pub fn build(boundary: Bounds, capacity: usize, items: impl IntoIterator<Item = (Bounds, T)>) -> Self {
        let mut tree = Self::new(boundary, capacity);
        for (bounds, value) in items {
            tree.insert(bounds, value);
        }
        tree
    }

    /// Insert an entry. Returns `false` only when `bounds` lies entirely
    /// outside the index boundary.
    pub fn insert(&mut self, bounds: Bounds, value: T) -> bool {
        if !self.root.boundary.intersects(&bounds) {
            return false;
        }
        self.root.insert(bounds, value, self.capacity);
        self.len += 1;
        true
    }

    /// Every entry whose box intersects `region` (touching included)
    pub fn query(&self, region: &Bounds) -> Vec<T> {
        let mut found = Vec::new();
        self.root.query(region, &mut found);
        found
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T: Copy> Node<T> {
    fn new(boundary: Bounds, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, bounds: Bounds, value: T, capacity: usize) {
        if let Some(children) = self.children.as_mut() {
            if let Some(child) = children.iter_mut().find(|c| c.boundary.contains(&bounds)) {
                child.insert(bounds, value, capacity);
                return;
            }
            self.entries.push((bounds, value));
            return;
        }

        self.entries.push((bounds, value));
        if self.entries.len() > capacity && self.depth < MAX_DEPTH {
            self.subdivide(capacity);
        }
    }

    fn subdivide(&mut self, capacity: usize) {
        let Bounds { x, y, w, h } = self.boundary;
        let (qw, qh) = (w / 2.0, h / 2.0);
        let depth = self.depth + 1;
        let mut children = Box::new([
            Node::new(Bounds::new(x + w / 4.0, y - h / 4.0, qw, qh), depth),
            Node::new(Bounds::new(x - w / 4.0, y - h / 4.0, qw, qh), depth),
            Node::new(Bounds::new(x + w / 4.0, y + h / 4.0, qw, qh), depth),
            Node::new(Bounds::new(x - w / 4.0, y + h / 4.0, qw, qh), depth),
        ]);

        let mut kept = Vec::new();
        for (bounds, value) in self.entries.drain(..) {
            match children.iter_mut().find(|c| c.boundary.contains(&bounds)) {
                Some(child) => child.insert(bounds, value, capacity),
                None => kept.push((bounds, value)),
            }
        }
        self.entries = kept;
        self.children = Some(children);
    }

    fn query(&self, region: &Bounds, found: &mut Vec<T>) {
        if !self.boundary.intersects(region) {
            return;
        }
        found.extend(
            self.entries
                .iter()
                .filter(|(bounds, _)| bounds.intersects(region))
                .map(|(_, value)| *value),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(region, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Bounds {
        Bounds::from_corner(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_insert_outside_boundary_fails() {
        let mut tree = QuadTree::new(canvas(), DEFAULT_CAPACITY);
        assert!(!tree.insert(Bounds::new(150.0, 150.0, 10.0, 10.0), 0));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_partially_outside_is_accepted() {
        let mut tree = QuadTree::new(canvas(), DEFAULT_CAPACITY);
        assert!(tree.insert(Bounds::new(0.0, 0.0, 4.0, 4.0), 7));
        assert_eq!(tree.query(&Bounds::new(1.0, 1.0, 1.0, 1.0)), vec![7]);
    }

    #[test]
    fn test_query_after_subdivision() {
        let mut tree = QuadTree::new(canvas(), 2);
        for i in 0..20 {
            let x = 2.5 + (i % 5) as f64 * 20.0;
            let y = 2.5 + (i / 5) as f64 * 20.0;
            assert!(tree.insert(Bounds::new(x, y, 4.0, 4.0), i));
        }
        assert_eq!(tree.len(), 20);

        let mut hits = tree.query(&Bounds::from_corner(0.0, 0.0, 30.0, 10.0));
        hits.sort();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_straddling_entry_is_found_from_every_quadrant() {
        let mut tree = QuadTree::new(canvas(), 1);
        tree.insert(Bounds::new(10.0, 10.0, 2.0, 2.0), 1);
        tree.insert(Bounds::new(90.0, 90.0, 2.0, 2.0), 2);
        // Spans all four quadrants of the root
        tree.insert(Bounds::new(50.0, 50.0, 20.0, 20.0), 3);

        for probe in [
            Bounds::new(42.0, 42.0, 1.0, 1.0),
            Bounds::new(58.0, 42.0, 1.0, 1.0),
            Bounds::new(42.0, 58.0, 1.0, 1.0),
            Bounds::new(58.0, 58.0, 1.0, 1.0),
        ] {
            assert_eq!(tree.query(&probe), vec![3]);
        }
    }
}
