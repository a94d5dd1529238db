//! Mirrored groups
//!
//! A two-fold group is one or more mirrored pairs stacked along the
//! non-mirror axis; a four-fold group is a 2x2 quad mirrored across both
//! axes. Pins are sampled once for the base member of each pair or quad and
//! reflected onto its partners, so the pin geometry is exactly symmetric.

use rand::Rng;
use tracing::{info, warn};

use crate::config::{NetlistConfig, SymmetryConfig};
use crate::error::ConfigError;
use crate::layout::{
    Bounds, Canvas, GroupTag, Layout, MirrorAxis, Pin, Point, Rectangle, SymmetryGroupId,
    SymmetryPattern,
};
use crate::netlist::{pin_count, sample_offsets};
use crate::sampling::{self, WeightedChoice};

use super::{fits, PlacementReport};

/// How a member's pins relate to its base member's pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reflection {
    Identity,
    Across(MirrorAxis),
    Both,
}

impl Reflection {
    fn apply(self, offset: (f64, f64)) -> (f64, f64) {
        match self {
            Reflection::Identity => offset,
            Reflection::Across(axis) => axis.mirror(offset),
            Reflection::Both => (-offset.0, -offset.1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Member {
    bounds: Bounds,
    /// Index of the pair or quad this member belongs to
    set: usize,
    reflection: Reflection,
}

/// Places mirrored groups as fixed rectangles with mirrored pins
pub struct SymmetryGenerator<'a> {
    config: &'a SymmetryConfig,
    netlist: &'a NetlistConfig,
    canvas: Canvas,
    variants: WeightedChoice<SymmetryPattern>,
}

impl<'a> SymmetryGenerator<'a> {
    pub fn new(
        config: &'a SymmetryConfig,
        netlist: &'a NetlistConfig,
        canvas: Canvas,
    ) -> Result<Self, ConfigError> {
        let variants = WeightedChoice::new(
            "symmetry.variants",
            config.variants.iter().map(|v| (v.pattern, v.weight)),
        )?;
        Ok(Self {
            config,
            netlist,
            canvas,
            variants,
        })
    }

    /// Place a random number of groups around what the layout already holds
    pub fn place<R: Rng + ?Sized>(&self, layout: &mut Layout, rng: &mut R) -> PlacementReport {
        let mut occupied = layout.occupied();
        let mut report = PlacementReport {
            requested: sampling::count(rng, self.config.num_groups),
            ..PlacementReport::default()
        };

        for i in 0..report.requested {
            let id = SymmetryGroupId(i);
            let pattern = self.variants.sample(rng);
            let accepted = (0..self.config.max_attempts).find_map(|_| {
                let members = self.propose(pattern, rng);
                let bounds: Vec<Bounds> = members.iter().map(|m| m.bounds).collect();
                fits(&bounds, self.canvas, &occupied).then_some(members)
            });

            let Some(members) = accepted else {
                warn!(group = %id, ?pattern, "no room for symmetric group, skipping");
                continue;
            };
            occupied.extend(members.iter().map(|m| m.bounds));
            report.rectangles_added += self.commit(layout, id, pattern, &members, rng);
            report.placed += 1;
        }

        info!(
            placed = report.placed,
            skipped = report.skipped(),
            rectangles = report.rectangles_added,
            "symmetric groups placed"
        );
        report
    }

    fn anchor<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let mx = self.config.anchor_margin.min(self.canvas.width / 2.0);
        let my = self.config.anchor_margin.min(self.canvas.height / 2.0);
        Point::new(
            sampling::between(rng, mx, self.canvas.width - mx),
            sampling::between(rng, my, self.canvas.height - my),
        )
    }

    fn propose<R: Rng + ?Sized>(&self, pattern: SymmetryPattern, rng: &mut R) -> Vec<Member> {
        let center = self.anchor(rng);
        let w = sampling::uniform(rng, self.config.width_range);
        let h = sampling::uniform(rng, self.config.height_range);
        match pattern {
            SymmetryPattern::TwoFold { axis, pairs } => {
                let gap = sampling::uniform(rng, self.config.mirror_gap_range);
                let stack_gap = sampling::uniform(rng, self.config.stack_gap_range);
                two_fold(center, w, h, axis, pairs, gap, stack_gap)
            }
            SymmetryPattern::FourFold => {
                let gap_x = sampling::uniform(rng, self.config.mirror_gap_range);
                let gap_y = sampling::uniform(rng, self.config.mirror_gap_range);
                four_fold(center, w, h, gap_x, gap_y)
            }
        }
    }

    /// Allocate ids for an accepted group and give it mirrored pins
    fn commit<R: Rng + ?Sized>(
        &self,
        layout: &mut Layout,
        id: SymmetryGroupId,
        pattern: SymmetryPattern,
        members: &[Member],
        rng: &mut R,
    ) -> usize {
        let tag = GroupTag::Symmetric { id, pattern };
        let mut base_offsets: Vec<Vec<(f64, f64)>> = Vec::new();

        for member in members {
            if member.set == base_offsets.len() {
                let b = member.bounds;
                let count = pin_count(b.area(), self.netlist.k, self.netlist.p);
                base_offsets.push(sample_offsets(
                    rng,
                    b.w,
                    b.h,
                    count,
                    self.netlist.pin_edge_margin_ratio,
                ));
            }

            let rect_id = layout.allocate_rect_id();
            let mut rect = Rectangle::new(rect_id, member.bounds).fixed_in(tag);
            for &offset in &base_offsets[member.set] {
                let pin_id = layout.allocate_pin_id();
                rect.pins
                    .push(Pin::new(pin_id, rect_id, member.reflection.apply(offset)));
            }
            layout.push(rect);
        }
        members.len()
    }
}

/// Mirrored pairs around `center`, stacked along the non-mirror axis
fn two_fold(
    center: Point,
    w: f64,
    h: f64,
    axis: MirrorAxis,
    pairs: usize,
    gap: f64,
    stack_gap: f64,
) -> Vec<Member> {
    let mut members = Vec::with_capacity(pairs * 2);
    for set in 0..pairs {
        let k = set as f64;
        let (base, mirror) = match axis {
            MirrorAxis::Vertical => {
                let span = pairs as f64 * h + (pairs - 1) as f64 * stack_gap;
                let y = center.y - span / 2.0 + h / 2.0 + k * (h + stack_gap);
                let dx = gap / 2.0 + w / 2.0;
                (
                    Bounds::new(center.x - dx, y, w, h),
                    Bounds::new(center.x + dx, y, w, h),
                )
            }
            MirrorAxis::Horizontal => {
                let span = pairs as f64 * w + (pairs - 1) as f64 * stack_gap;
                let x = center.x - span / 2.0 + w / 2.0 + k * (w + stack_gap);
                let dy = gap / 2.0 + h / 2.0;
                (
                    Bounds::new(x, center.y - dy, w, h),
                    Bounds::new(x, center.y + dy, w, h),
                )
            }
        };
        members.push(Member {
            bounds: base,
            set,
            reflection: Reflection::Identity,
        });
        members.push(Member {
            bounds: mirror,
            set,
            reflection: Reflection::Across(axis),
        });
    }
    members
}

/// A quad mirrored across both axes through `center`
fn four_fold(center: Point, w: f64, h: f64, gap_x: f64, gap_y: f64) -> Vec<Member> {
    let dx = gap_x / 2.0 + w / 2.0;
    let dy = gap_y / 2.0 + h / 2.0;
    [
        (-dx, -dy, Reflection::Identity),
        (dx, -dy, Reflection::Across(MirrorAxis::Vertical)),
        (-dx, dy, Reflection::Across(MirrorAxis::Horizontal)),
        (dx, dy, Reflection::Both),
    ]
    .into_iter()
    .map(|(ox, oy, reflection)| Member {
        bounds: Bounds::new(center.x + ox, center.y + oy, w, h),
        set: 0,
        reflection,
    })
    .collect()
}
