//! Force-based overlap relaxation ("shake")
//!
//! Each pass rebuilds the quadtree from current positions, pushes every
//! overlapping pair apart along its axis of minimum penetration, and clamps
//! the moved rectangles back inside the canvas. Fixed rectangles absorb force
//! but never move.

use tracing::{debug, warn};

use super::quadtree::{QuadTree, DEFAULT_CAPACITY};
use super::types::{Canvas, Rectangle, OVERLAP_EPSILON};

/// Outcome of a shake run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShakeReport {
    /// Passes that moved rectangles
    pub passes: usize,
    /// Overlapping pairs left after the last pass
    pub remaining_overlaps: usize,
}

impl ShakeReport {
    pub fn is_clean(&self) -> bool {
        self.remaining_overlaps == 0
    }
}

/// Relaxes overlaps between rectangles on a canvas
#[derive(Debug, Clone)]
pub struct ShakeResolver {
    canvas: Canvas,
    strength: f64,
    capacity: usize,
}

/// A detected overlap between the rectangles at two slice indices
#[derive(Debug, Clone, Copy, PartialEq)]
struct Contact {
    a: usize,
    b: usize,
    push: (f64, f64),
}

impl ShakeResolver {
    pub fn new(canvas: Canvas, strength: f64) -> Self {
        Self {
            canvas,
            strength,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the quadtree node capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Run exactly `passes` relaxation passes. Overlap may remain afterwards.
    pub fn relax(&self, rects: &mut [Rectangle], passes: usize) -> ShakeReport {
        let report = self.run(rects, passes, false);
        debug!(
            passes = report.passes,
            remaining = report.remaining_overlaps,
            "shake finished"
        );
        report
    }

    /// Relax until a pass detects no overlap or `max_passes` is spent.
    ///
    /// Residual overlap is logged as a warning and reported, never an error.
    pub fn legalize(&self, rects: &mut [Rectangle], max_passes: usize) -> ShakeReport {
        let report = self.run(rects, max_passes, true);
        if report.is_clean() {
            debug!(passes = report.passes, "legalization converged");
        } else {
            warn!(
                passes = report.passes,
                remaining = report.remaining_overlaps,
                "legalization budget exhausted with overlap remaining"
            );
        }
        report
    }

    fn run(&self, rects: &mut [Rectangle], max_passes: usize, stop_when_clear: bool) -> ShakeReport {
        let mut report = ShakeReport::default();
        for _ in 0..max_passes {
            let contacts = self.contacts(rects);
            if contacts.is_empty() && stop_when_clear {
                return report;
            }

            let mut pushes = vec![(0.0, 0.0); rects.len()];
            for contact in &contacts {
                let (px, py) = contact.push;
                pushes[contact.a].0 += px;
                pushes[contact.a].1 += py;
                pushes[contact.b].0 -= px;
                pushes[contact.b].1 -= py;
            }

            for (rect, (px, py)) in rects.iter_mut().zip(pushes) {
                if rect.fixed {
                    continue;
                }
                let mut bounds = rect.bounds();
                bounds.x += px * self.strength;
                bounds.y += py * self.strength;
                rect.set_bounds(self.canvas.clamp(bounds));
            }
            report.passes += 1;
        }
        report.remaining_overlaps = self.contacts(rects).len();
        report
    }

    /// Overlapping pairs with at least one movable member
    fn contacts(&self, rects: &[Rectangle]) -> Vec<Contact> {
        let index = QuadTree::build(
            self.canvas.bounds(),
            self.capacity,
            rects.iter().enumerate().map(|(i, r)| (r.bounds(), i)),
        );

        let mut contacts = Vec::new();
        for (i, rect) in rects.iter().enumerate() {
            let bounds = rect.bounds();
            for j in index.query(&bounds) {
                if j <= i {
                    continue;
                }
                let other = &rects[j];
                if rect.fixed && other.fixed {
                    continue;
                }
                let (overlap_x, overlap_y) = bounds.penetration(&other.bounds());
                if overlap_x <= OVERLAP_EPSILON || overlap_y <= OVERLAP_EPSILON {
                    continue;
                }
                let push = if overlap_x < overlap_y {
                    (overlap_x.copysign(rect.x - other.x), 0.0)
                } else {
                    (0.0, overlap_y.copysign(rect.y - other.y))
                };
                contacts.push(Contact { a: i, b: j, push });
            }
        }
        contacts
    }
}

/// Count every overlapping pair, fixed or not
pub fn count_overlaps(rects: &[Rectangle], canvas: Canvas) -> usize {
    let index = QuadTree::build(
        canvas.bounds(),
        DEFAULT_CAPACITY,
        rects.iter().enumerate().map(|(i, r)| (r.bounds(), i)),
    );
    rects
        .iter()
        .enumerate()
        .map(|(i, rect)| {
            let bounds = rect.bounds();
            index
                .query(&bounds)
                .into_iter()
                .filter(|&j| j > i && bounds.overlaps(&rects[j].bounds()))
                .count()
        })
        .sum()
}
