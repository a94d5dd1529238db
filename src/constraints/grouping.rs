//! Proximity-based hierarchical grouping
//!
//! Runs on a finished layout. Every symmetric group, aligned chain and
//! remaining singleton becomes one item with a centroid; random seeds then
//! collect their nearest unclaimed neighbours into hierarchical groups. No
//! rectangle moves.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::config::GroupingConfig;
use crate::layout::{
    AlignmentGroupId, HierarchicalGroupConstraint, HierarchicalGroupId, Layout, Point,
    RectId, SymmetryGroupId,
};
use crate::sampling;

/// Outcome of a grouping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupingReport {
    pub requested: usize,
    pub created: usize,
    /// Rectangles that received a grouping id
    pub rectangles_grouped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Symmetry(SymmetryGroupId),
    Alignment(AlignmentGroupId),
}

/// A placeable unit: a whole constraint group or one free rectangle
#[derive(Debug, Clone)]
struct Item {
    centroid: Point,
    /// Indices into the layout's rectangle list
    members: Vec<usize>,
}

/// Bundles nearby items into hierarchical group constraints
pub struct HierarchicalGrouper<'a> {
    config: &'a GroupingConfig,
}

impl<'a> HierarchicalGrouper<'a> {
    pub fn new(config: &'a GroupingConfig) -> Self {
        Self { config }
    }

    pub fn group<R: Rng + ?Sized>(&self, layout: &mut Layout, rng: &mut R) -> GroupingReport {
        let items = collect_items(layout);
        let radius = self.config.max_search_radius.unwrap_or(f64::INFINITY);
        let mut claimed = vec![false; items.len()];
        let mut report = GroupingReport {
            requested: sampling::count(rng, self.config.num_groups),
            ..GroupingReport::default()
        };

        for i in 0..report.requested {
            let available: Vec<usize> = (0..items.len()).filter(|&j| !claimed[j]).collect();
            if available.len() < 2 {
                break;
            }
            let Some(&seed) = available.choose(rng) else {
                break;
            };
            let wanted = sampling::count(rng, self.config.items_per_group).saturating_sub(1);
            if wanted == 0 {
                continue;
            }

            let origin = items[seed].centroid;
            let mut neighbours: Vec<(f64, usize)> = available
                .iter()
                .filter(|&&j| j != seed)
                .map(|&j| (origin.distance(&items[j].centroid), j))
                .filter(|&(d, _)| d <= radius)
                .collect();
            neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
            neighbours.truncate(wanted);
            if neighbours.is_empty() {
                continue;
            }

            let id = HierarchicalGroupId(i);
            let chosen: Vec<usize> = std::iter::once(seed)
                .chain(neighbours.into_iter().map(|(_, j)| j))
                .collect();
            let mut members: Vec<RectId> = Vec::new();
            for &item in &chosen {
                claimed[item] = true;
                for &r in &items[item].members {
                    layout.rectangles[r].constraints.hierarchical = Some(id);
                    members.push(layout.rectangles[r].id);
                }
            }
            members.sort();

            report.created += 1;
            report.rectangles_grouped += members.len();
            layout
                .hierarchical_groups
                .push(HierarchicalGroupConstraint { id, members });
        }

        info!(
            created = report.created,
            rectangles = report.rectangles_grouped,
            "hierarchical groups formed"
        );
        report
    }
}

/// Items in a stable order: constraint groups by id, then singletons
fn collect_items(layout: &Layout) -> Vec<Item> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    let mut singles = Vec::new();

    for (i, rect) in layout.rectangles.iter().enumerate() {
        let slots = &rect.constraints;
        if slots.hierarchical.is_some() {
            continue;
        }
        if let Some(id) = slots.symmetry {
            groups.entry(GroupKey::Symmetry(id)).or_default().push(i);
        } else if let Some(id) = slots.alignment {
            groups.entry(GroupKey::Alignment(id)).or_default().push(i);
        } else {
            singles.push(i);
        }
    }

    groups
        .into_values()
        .chain(singles.into_iter().map(|i| vec![i]))
        .filter_map(|members| {
            let bounds = members
                .iter()
                .map(|&i| layout.rectangles[i].bounds())
                .reduce(|a, b| a.union(&b))?;
            Some(Item {
                centroid: bounds.center(),
                members,
            })
        })
        .collect()
}
