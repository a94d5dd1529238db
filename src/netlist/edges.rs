//! Netlist edge synthesis
//!
//! Two stages write into one deduplicated edge set keyed by sorted pin-id
//! pairs. The nearest-neighbour stage links every pin to its closest pin on a
//! different rectangle. The probabilistic stage then offers each pin its K
//! nearest foreign pins within the length cutoff (L1 distance), accepting
//! each with probability `p_max * exp(-decay_rate * d)`.

use std::collections::BTreeSet;

use rand::Rng;

use crate::config::NetlistConfig;
use crate::layout::{Layout, PinId, Point, RectId};

/// Undirected edge set, each pair stored with the smaller id first
pub type EdgeSet = BTreeSet<(PinId, PinId)>;

/// A pin resolved to its absolute position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedPin {
    pub id: PinId,
    pub parent: RectId,
    pub at: Point,
}

/// Every pin of the layout with its absolute position, in rectangle order
pub fn placed_pins(layout: &Layout) -> Vec<PlacedPin> {
    layout
        .rectangles
        .iter()
        .flat_map(|rect| {
            rect.pins.iter().map(move |pin| PlacedPin {
                id: pin.id,
                parent: rect.id,
                at: pin.position(rect),
            })
        })
        .collect()
}

fn edge(a: PinId, b: PinId) -> (PinId, PinId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Link every pin to its Euclidean-nearest pin on another rectangle
pub fn nearest_neighbour_edges(pins: &[PlacedPin]) -> EdgeSet {
    let mut edges = EdgeSet::new();
    for pin in pins {
        let nearest = pins
            .iter()
            .filter(|other| other.parent != pin.parent)
            .min_by(|a, b| pin.at.distance(&a.at).total_cmp(&pin.at.distance(&b.at)));
        if let Some(other) = nearest {
            edges.insert(edge(pin.id, other.id));
        }
    }
    edges
}

/// Add distance-decayed random edges between K-nearest neighbours.
///
/// Returns how many new edges were inserted.
pub fn probabilistic_edges<R: Rng + ?Sized>(
    pins: &[PlacedPin],
    config: &NetlistConfig,
    rng: &mut R,
    edges: &mut EdgeSet,
) -> usize {
    let mut added = 0;
    for pin in pins {
        let mut candidates: Vec<(f64, PinId)> = pins
            .iter()
            .filter(|other| other.parent != pin.parent)
            .map(|other| (pin.at.manhattan(&other.at), other.id))
            .filter(|&(d, _)| d < config.max_edge_length)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.truncate(config.k_nearest);

        for (distance, other) in candidates {
            let probability = config.p_max * (-config.decay_rate * distance).exp();
            if rng.gen::<f64>() < probability && edges.insert(edge(pin.id, other)) {
                added += 1;
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pin(id: usize, parent: usize, x: f64, y: f64) -> PlacedPin {
        PlacedPin {
            id: PinId(id),
            parent: RectId(parent),
            at: Point::new(x, y),
        }
    }

    #[test]
    fn test_nearest_skips_same_parent() {
        let pins = vec![
            pin(0, 0, 0.0, 0.0),
            pin(1, 0, 1.0, 0.0),
            pin(2, 1, 10.0, 0.0),
        ];
        let edges = nearest_neighbour_edges(&pins);
        let expected: EdgeSet = [(PinId(0), PinId(2)), (PinId(1), PinId(2))].into();
        assert_eq!(edges, expected);
    }

    #[test]
    fn test_every_pin_gets_an_edge() {
        let pins: Vec<PlacedPin> = (0..20)
            .map(|i| pin(i, i / 3, (i * 7 % 13) as f64, (i * 5 % 11) as f64))
            .collect();
        let edges = nearest_neighbour_edges(&pins);
        for p in &pins {
            assert!(edges.iter().any(|&(a, b)| a == p.id || b == p.id));
        }
    }

    #[test]
    fn test_probabilistic_stage_respects_cutoff() {
        let pins = vec![pin(0, 0, 0.0, 0.0), pin(1, 1, 300.0, 0.0)];
        let config = NetlistConfig {
            p_max: 1.0,
            decay_rate: 0.0,
            max_edge_length: 200.0,
            ..NetlistConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut edges = EdgeSet::new();
        assert_eq!(probabilistic_edges(&pins, &config, &mut rng, &mut edges), 0);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_probabilistic_stage_takes_k_nearest() {
        // Certain acceptance; only the two nearest neighbours of pin 0 qualify
        let pins = vec![
            pin(0, 0, 0.0, 0.0),
            pin(1, 1, 5.0, 0.0),
            pin(2, 2, 0.0, 6.0),
            pin(3, 3, 50.0, 50.0),
        ];
        let config = NetlistConfig {
            p_max: 1.0,
            decay_rate: 0.0,
            max_edge_length: 1000.0,
            k_nearest: 2,
            ..NetlistConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut edges = EdgeSet::new();
        probabilistic_edges(&pins, &config, &mut rng, &mut edges);
        assert!(edges.contains(&(PinId(0), PinId(1))));
        assert!(edges.contains(&(PinId(0), PinId(2))));
        assert!(!edges.contains(&(PinId(0), PinId(3))));
    }
}
