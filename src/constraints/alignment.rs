//! Aligned chains
//!
//! A chain starts at a seed rectangle. Every further member shares one edge
//! or center line with the seed and is placed a random gap past the previous
//! member, along the axis perpendicular to the shared line.

use rand::Rng;
use tracing::{info, warn};

use crate::config::AlignmentConfig;
use crate::error::ConfigError;
use crate::layout::{
    AlignMode, AlignmentConstraint, AlignmentGroupId, Bounds, Canvas, GroupTag, Layout, Rectangle,
};
use crate::sampling::{self, WeightedChoice};

use super::{fits, PlacementReport};

/// Bounds of the next chain member of size `w` x `h`.
///
/// `seed` provides the shared line, `last` the previous member the chain
/// advances from.
pub fn chain_position(
    seed: &Bounds,
    last: &Bounds,
    mode: AlignMode,
    w: f64,
    h: f64,
    gap: f64,
) -> Bounds {
    let below = last.bottom() + gap + h / 2.0;
    let beside = last.right() + gap + w / 2.0;
    let (x, y) = match mode {
        AlignMode::Left => (seed.left() + w / 2.0, below),
        AlignMode::Right => (seed.right() - w / 2.0, below),
        AlignMode::Top => (beside, seed.top() + h / 2.0),
        AlignMode::Bottom => (beside, seed.bottom() - h / 2.0),
        AlignMode::HCenter => (seed.x, below),
        AlignMode::VCenter => (beside, seed.y),
    };
    Bounds::new(x, y, w, h)
}

/// Places aligned chains as fixed rectangles and records their constraints
pub struct AlignmentGenerator<'a> {
    config: &'a AlignmentConfig,
    canvas: Canvas,
    modes: WeightedChoice<AlignMode>,
}

impl<'a> AlignmentGenerator<'a> {
    pub fn new(config: &'a AlignmentConfig, canvas: Canvas) -> Result<Self, ConfigError> {
        let modes = WeightedChoice::new(
            "alignment.mode_weights",
            config.mode_weights.iter().map(|m| (m.mode, m.weight)),
        )?;
        Ok(Self {
            config,
            canvas,
            modes,
        })
    }

    pub fn place<R: Rng + ?Sized>(&self, layout: &mut Layout, rng: &mut R) -> PlacementReport {
        let mut occupied = layout.occupied();
        let mut report = PlacementReport {
            requested: sampling::count(rng, self.config.num_sets),
            ..PlacementReport::default()
        };

        for i in 0..report.requested {
            let id = AlignmentGroupId(i);
            let accepted = (0..self.config.max_attempts).find_map(|_| {
                let (mode, chain) = self.propose(rng);
                fits(&chain, self.canvas, &occupied).then_some((mode, chain))
            });

            let Some((mode, chain)) = accepted else {
                warn!(group = %id, "no room for aligned chain, skipping");
                continue;
            };
            occupied.extend_from_slice(&chain);

            let tag = GroupTag::Aligned { id, mode };
            let mut previous = None;
            for bounds in &chain {
                let rect_id = layout.allocate_rect_id();
                layout.push(Rectangle::new(rect_id, *bounds).fixed_in(tag));
                if let Some(source) = previous {
                    layout.alignment_constraints.push(AlignmentConstraint {
                        source,
                        target: rect_id,
                        mode,
                    });
                }
                previous = Some(rect_id);
            }
            report.rectangles_added += chain.len();
            report.placed += 1;
        }

        info!(
            placed = report.placed,
            skipped = report.skipped(),
            rectangles = report.rectangles_added,
            "aligned chains placed"
        );
        report
    }

    /// A candidate chain: the mode and every member's bounds, seed first
    fn propose<R: Rng + ?Sized>(&self, rng: &mut R) -> (AlignMode, Vec<Bounds>) {
        let cfg = self.config;
        let length = sampling::count(rng, cfg.components_per_set);
        let mode = self.modes.sample(rng);

        let w = sampling::uniform(rng, cfg.width_range);
        let h = sampling::uniform(rng, cfg.height_range);
        let seed = Bounds::new(
            sampling::between(rng, cfg.padding + w / 2.0, self.canvas.width - cfg.padding - w / 2.0),
            sampling::between(rng, cfg.padding + h / 2.0, self.canvas.height - cfg.padding - h / 2.0),
            w,
            h,
        );

        let mut chain = Vec::with_capacity(length);
        chain.push(seed);
        for _ in 1..length {
            let w = sampling::uniform(rng, cfg.width_range);
            let h = sampling::uniform(rng, cfg.height_range);
            let gap = sampling::uniform(rng, cfg.gap_range);
            let last = chain[chain.len() - 1];
            chain.push(chain_position(&seed, &last, mode, w, h, gap));
        }
        (mode, chain)
    }
}
