//! Pin and netlist synthesis

pub mod edges;
pub mod pins;

pub use edges::{nearest_neighbour_edges, placed_pins, probabilistic_edges, EdgeSet, PlacedPin};
pub use pins::{assign_pins, pin_count, sample_offsets};

use rand::Rng;
use tracing::info;

use crate::config::NetlistConfig;
use crate::layout::Layout;

/// Outcome of netlist synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetlistReport {
    pub pins_created: usize,
    pub nearest_edges: usize,
    pub probabilistic_edges: usize,
}

impl NetlistReport {
    pub fn total_edges(&self) -> usize {
        self.nearest_edges + self.probabilistic_edges
    }
}

/// Adds pins to unpinned rectangles, then replaces the layout's edge list
pub struct NetlistSynthesizer<'a> {
    config: &'a NetlistConfig,
}

impl<'a> NetlistSynthesizer<'a> {
    pub fn new(config: &'a NetlistConfig) -> Self {
        Self { config }
    }

    pub fn synthesize<R: Rng + ?Sized>(&self, layout: &mut Layout, rng: &mut R) -> NetlistReport {
        let mut report = NetlistReport {
            pins_created: assign_pins(layout, self.config, rng),
            ..NetlistReport::default()
        };

        let pins = placed_pins(layout);
        if pins.len() < 2 {
            layout.edges.clear();
            return report;
        }

        let mut edges = nearest_neighbour_edges(&pins);
        report.nearest_edges = edges.len();
        report.probabilistic_edges = probabilistic_edges(&pins, self.config, rng, &mut edges);
        layout.edges = edges.into_iter().collect();

        info!(
            pins = pins.len(),
            created = report.pins_created,
            nearest = report.nearest_edges,
            probabilistic = report.probabilistic_edges,
            "netlist synthesized"
        );
        report
    }
}
