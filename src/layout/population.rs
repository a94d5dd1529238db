//! Seeding of the free (growable) rectangle population
//!
//! The population is split across component categories by proportion and each
//! member is dropped at a random non-overlapping position by rejection sampling.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::config::{CategoryConfig, PopulationConfig};
use crate::sampling;

use super::types::{Bounds, Layout, Rectangle};

/// Outcome of seeding the free population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopulationReport {
    pub requested: usize,
    pub placed: usize,
}

impl PopulationReport {
    pub fn skipped(&self) -> usize {
        self.requested - self.placed
    }
}

/// Category index per population member, before shuffling.
///
/// Each category gets `floor(n * proportion)` members; the remainder goes to
/// the category with the largest proportion.
pub fn category_plan(config: &PopulationConfig) -> Vec<usize> {
    let n = config.num_rectangles;
    let mut plan = Vec::with_capacity(n);
    for (i, cat) in config.categories.iter().enumerate() {
        let share = (n as f64 * cat.proportion).floor() as usize;
        plan.extend(std::iter::repeat(i).take(share.min(n - plan.len())));
    }

    let dominant = config
        .categories
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.proportion.total_cmp(&b.proportion))
        .map(|(i, _)| i);
    if let Some(dominant) = dominant {
        plan.resize(n, dominant);
    }
    plan
}

/// Place the free population around whatever the layout already holds
pub fn seed_population<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &PopulationConfig,
    rng: &mut R,
) -> PopulationReport {
    let mut plan = category_plan(config);
    plan.shuffle(rng);

    let mut occupied = layout.occupied();
    let mut report = PopulationReport {
        requested: plan.len(),
        placed: 0,
    };

    for cat_index in plan {
        let category = &config.categories[cat_index];
        let Some(bounds) = find_spot(layout, category, &occupied, config.placement_attempts, rng)
        else {
            continue;
        };
        let growth_prob = sampling::uniform(rng, category.growth_prob_range);
        let id = layout.allocate_rect_id();
        layout.push(
            Rectangle::new(id, bounds)
                .with_growth_prob(growth_prob)
                .with_category(category.name.clone()),
        );
        occupied.push(bounds);
        report.placed += 1;
    }

    if report.skipped() > 0 {
        warn!(
            skipped = report.skipped(),
            "some free rectangles found no room and were skipped"
        );
    }
    info!(placed = report.placed, "free population seeded");
    report
}

fn find_spot<R: Rng + ?Sized>(
    layout: &Layout,
    category: &CategoryConfig,
    occupied: &[Bounds],
    attempts: usize,
    rng: &mut R,
) -> Option<Bounds> {
    let canvas = layout.canvas;
    for _ in 0..attempts {
        let w = sampling::uniform(rng, category.width_range);
        let h = sampling::uniform(rng, category.height_range);
        if w > canvas.width || h > canvas.height {
            continue;
        }
        let x = sampling::between(rng, w / 2.0, canvas.width - w / 2.0);
        let y = sampling::between(rng, h / 2.0, canvas.height - h / 2.0);
        let candidate = Bounds::new(x, y, w, h);
        if !occupied.iter().any(|b| b.overlaps(&candidate)) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::Canvas;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn category(name: &str, proportion: f64) -> CategoryConfig {
        CategoryConfig {
            name: name.to_string(),
            proportion,
            width_range: (1.0, 1.0),
            height_range: (1.0, 1.0),
            growth_prob_range: (0.2, 0.4),
        }
    }

    #[test]
    fn test_category_plan_assigns_remainder_to_dominant() {
        let config = PopulationConfig {
            num_rectangles: 10,
            placement_attempts: 10,
            categories: vec![category("macro", 0.15), category("std_cell", 0.8)],
        };
        let plan = category_plan(&config);
        assert_eq!(plan.len(), 10);
        assert_eq!(plan.iter().filter(|&&c| c == 0).count(), 1);
        assert_eq!(plan.iter().filter(|&&c| c == 1).count(), 9);
    }

    #[test]
    fn test_category_plan_caps_oversubscribed_proportions() {
        let config = PopulationConfig {
            num_rectangles: 4,
            placement_attempts: 10,
            categories: vec![category("a", 1.0), category("b", 1.0)],
        };
        assert_eq!(category_plan(&config), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_seeded_rectangles_are_disjoint_and_inside() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut layout = Layout::new(Canvas::new(200.0, 200.0));
        let config = PopulationConfig {
            num_rectangles: 30,
            placement_attempts: 100,
            categories: vec![CategoryConfig {
                width_range: (5.0, 15.0),
                height_range: (5.0, 15.0),
                ..category("macro", 1.0)
            }],
        };

        let report = seed_population(&mut layout, &config, &mut rng);
        assert_eq!(report.requested, 30);
        assert_eq!(report.placed, layout.rectangles.len());

        for (i, a) in layout.rectangles.iter().enumerate() {
            assert!(layout.canvas.contains(&a.bounds()));
            assert!(!a.fixed);
            assert_eq!(a.category.as_deref(), Some("macro"));
            assert!((0.2..=0.4).contains(&a.growth_prob));
            for b in &layout.rectangles[i + 1..] {
                assert!(!a.bounds().overlaps(&b.bounds()));
            }
        }
    }
}
