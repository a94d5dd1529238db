//! Constraint group generators
//!
//! Symmetric and aligned groups are placed as fixed clusters before free
//! growth, by rejection sampling: a whole candidate cluster is proposed at a
//! random anchor and accepted only if every member lies inside the canvas and
//! clear of everything placed so far. A group that cannot be placed within
//! its attempt budget is skipped with a warning. Hierarchical grouping runs on
//! the finished layout and only adds metadata.

pub mod alignment;
pub mod grouping;
pub mod symmetry;

pub use alignment::{chain_position, AlignmentGenerator};
pub use grouping::{GroupingReport, HierarchicalGrouper};
pub use symmetry::SymmetryGenerator;

use crate::layout::{Bounds, Canvas};

/// Outcome of a constraint group placement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementReport {
    pub requested: usize,
    pub placed: usize,
    pub rectangles_added: usize,
}

impl PlacementReport {
    pub fn skipped(&self) -> usize {
        self.requested - self.placed
    }
}

/// Whether a candidate cluster can be accepted as is
pub(crate) fn fits(candidates: &[Bounds], canvas: Canvas, occupied: &[Bounds]) -> bool {
    candidates.iter().all(|c| canvas.contains(c))
        && !candidates
            .iter()
            .any(|c| occupied.iter().any(|o| o.overlaps(c)))
}
