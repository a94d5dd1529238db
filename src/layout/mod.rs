//! Layout model and placement engine
//!
//! This module holds the in-memory scene (`Layout` and its rectangles, pins
//! and constraint records), the quadtree used for overlap queries, the shake
//! relaxation, free-population seeding and the growth simulation.

pub mod growth;
pub mod population;
pub mod quadtree;
pub mod record;
pub mod shake;
pub mod types;

pub use growth::{
    Direction, GrowthEngine, GrowthObserver, GrowthPhase, GrowthReport, NoopObserver, Termination,
};
pub use population::{category_plan, seed_population, PopulationReport};
pub use quadtree::QuadTree;
pub use record::{LayoutRecord, PinRecord, RectangleRecord};
pub use shake::{count_overlaps, ShakeReport, ShakeResolver};
pub use types::*;
