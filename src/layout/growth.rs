//! Growth simulation
//!
//! Movable rectangles grow one step at a time in a random direction until the
//! layout reaches its target density or stops making progress. A run moves
//! through these phases:
//!
//! ```text
//! Growing -> (Stagnating -> Recovering -> Growing)* -> Legalizing -> Done
//! ```
//!
//! Recovery either rolls every movable rectangle back a few steps and shakes
//! the layout, or drops unit rectangles into empty grid cells (infill). The
//! loop ends on target density, the stagnation limit, or the iteration budget;
//! all three are normal endings and are followed by a legalization shake.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::GrowthConfig;
use crate::sampling;

use super::quadtree::{QuadTree, DEFAULT_CAPACITY};
use super::shake::{ShakeReport, ShakeResolver};
use super::types::{Bounds, Canvas, Layout, Rectangle};

/// Iterations between progress log lines
const PROGRESS_INTERVAL: usize = 50;

/// Side of the rectangles created by infill
const INFILL_SIZE: f64 = 1.0;

/// Smallest extent rollback shrinks a rectangle to
const MIN_EXTENT: f64 = 1.0;

/// Direction a rectangle grows toward; the opposite edge stays put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    /// Grow `bounds` by `step` toward this direction
    pub fn apply(&self, bounds: Bounds, step: f64) -> Bounds {
        let half = step / 2.0;
        match self {
            Direction::Right => Bounds::new(bounds.x + half, bounds.y, bounds.w + step, bounds.h),
            Direction::Left => Bounds::new(bounds.x - half, bounds.y, bounds.w + step, bounds.h),
            Direction::Down => Bounds::new(bounds.x, bounds.y + half, bounds.w, bounds.h + step),
            Direction::Up => Bounds::new(bounds.x, bounds.y - half, bounds.w, bounds.h + step),
        }
    }
}

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPhase {
    Growing,
    Stagnating,
    Recovering,
    Legalizing,
    Done,
}

/// Why the growth loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    TargetDensity,
    StagnationLimit,
    IterationBudget,
}

/// Summary of a growth run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthReport {
    pub iterations: usize,
    pub termination: Termination,
    pub final_density: f64,
    pub rollbacks: usize,
    pub infill_triggers: usize,
    pub infill_added: usize,
    pub legalization: ShakeReport,
}

/// Hooks into a growth run, e.g. for capturing animation frames.
///
/// Every method defaults to doing nothing.
pub trait GrowthObserver {
    fn on_phase(&mut self, _phase: GrowthPhase) {}

    /// Called after every growth iteration with the density it reached
    fn on_iteration(&mut self, _iteration: usize, _density: f64, _rects: &[Rectangle]) {}

    /// Called after every movable rectangle was shrunk
    fn on_rollback(&mut self, _rects: &[Rectangle]) {}

    /// Called after a relaxation (`legalize == false`) or the final legalization
    fn on_shake(&mut self, _legalize: bool, _report: &ShakeReport, _rects: &[Rectangle]) {}

    fn on_infill(&mut self, _added: usize, _rects: &[Rectangle]) {}

    fn on_finish(&mut self, _report: &GrowthReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GrowthObserver for NoopObserver {}

impl<T: GrowthObserver + ?Sized> GrowthObserver for &mut T {
    fn on_phase(&mut self, phase: GrowthPhase) {
        (**self).on_phase(phase)
    }

    fn on_iteration(&mut self, iteration: usize, density: f64, rects: &[Rectangle]) {
        (**self).on_iteration(iteration, density, rects)
    }

    fn on_rollback(&mut self, rects: &[Rectangle]) {
        (**self).on_rollback(rects)
    }

    fn on_shake(&mut self, legalize: bool, report: &ShakeReport, rects: &[Rectangle]) {
        (**self).on_shake(legalize, report, rects)
    }

    fn on_infill(&mut self, added: usize, rects: &[Rectangle]) {
        (**self).on_infill(added, rects)
    }

    fn on_finish(&mut self, report: &GrowthReport) {
        (**self).on_finish(report)
    }
}

/// Grows the movable rectangles of a layout toward a target density
pub struct GrowthEngine<'a, R: Rng + ?Sized, O = NoopObserver> {
    config: &'a GrowthConfig,
    canvas: Canvas,
    shaker: ShakeResolver,
    rng: &'a mut R,
    observer: O,
    phase: GrowthPhase,
}

impl<'a, R: Rng + ?Sized> GrowthEngine<'a, R, NoopObserver> {
    pub fn new(config: &'a GrowthConfig, canvas: Canvas, rng: &'a mut R) -> Self {
        Self {
            config,
            canvas,
            shaker: ShakeResolver::new(canvas, config.shake_strength),
            rng,
            observer: NoopObserver,
            phase: GrowthPhase::Growing,
        }
    }
}

impl<'a, R: Rng + ?Sized, O: GrowthObserver> GrowthEngine<'a, R, O> {
    /// Attach an observer
    pub fn with_observer<P: GrowthObserver>(self, observer: P) -> GrowthEngine<'a, R, P> {
        GrowthEngine {
            config: self.config,
            canvas: self.canvas,
            shaker: self.shaker,
            rng: self.rng,
            observer,
            phase: self.phase,
        }
    }

    /// Set the quadtree node capacity used by shake passes
    pub fn with_index_capacity(mut self, capacity: usize) -> Self {
        self.shaker = self.shaker.with_capacity(capacity);
        self
    }

    pub fn phase(&self) -> GrowthPhase {
        self.phase
    }

    /// Run the growth loop and the final legalization on `layout`
    pub fn run(&mut self, layout: &mut Layout) -> GrowthReport {
        let config = self.config;
        self.set_phase(GrowthPhase::Growing);

        let mut window = 0;
        let mut idle = 0;
        let mut shakes_since_infill = 0;
        let mut rollbacks = 0;
        let mut infill_triggers = 0;
        let mut infill_added = 0;
        let mut iterations = 0;
        let mut termination = Termination::IterationBudget;

        for iteration in 0..config.max_iterations {
            iterations = iteration + 1;
            let changed = self.grow_step(&mut layout.rectangles);
            let density = layout.density();
            self.observer
                .on_iteration(iteration, density, &layout.rectangles);

            if iterations % PROGRESS_INTERVAL == 0 {
                debug!(
                    iteration = iterations,
                    density,
                    idle,
                    shakes_since_infill,
                    rectangles = layout.rectangles.len(),
                    "growth progress"
                );
            }

            if density >= config.target_density {
                termination = Termination::TargetDensity;
                break;
            }

            if changed {
                window = 0;
                idle = 0;
                continue;
            }
            window += 1;
            idle += 1;

            if idle >= config.stagnation_limit {
                termination = Termination::StagnationLimit;
                break;
            }
            if window < config.shake_trigger_threshold {
                continue;
            }

            self.set_phase(GrowthPhase::Stagnating);
            self.set_phase(GrowthPhase::Recovering);
            let wants_infill = shakes_since_infill >= config.infill_trigger_after_n_shakes
                && infill_triggers < config.infill_max_triggers;
            let added = if wants_infill { self.infill(layout) } else { 0 };
            if added > 0 {
                infill_triggers += 1;
                infill_added += added;
                shakes_since_infill = 0;
            } else {
                self.rollback(&mut layout.rectangles);
                self.shake(&mut layout.rectangles);
                rollbacks += 1;
                shakes_since_infill += 1;
            }
            window = 0;
            self.set_phase(GrowthPhase::Growing);
        }

        self.set_phase(GrowthPhase::Legalizing);
        let legalization = self
            .shaker
            .legalize(&mut layout.rectangles, config.legalize_iterations);
        self.observer
            .on_shake(true, &legalization, &layout.rectangles);

        let report = GrowthReport {
            iterations,
            termination,
            final_density: layout.density(),
            rollbacks,
            infill_triggers,
            infill_added,
            legalization,
        };
        self.set_phase(GrowthPhase::Done);
        self.observer.on_finish(&report);

        info!(
            iterations,
            ?termination,
            density = report.final_density,
            rectangles = layout.rectangles.len(),
            "growth finished"
        );
        report
    }

    /// One growth iteration over every movable rectangle. Returns whether any grew.
    pub fn grow_step(&mut self, rects: &mut [Rectangle]) -> bool {
        let mut order: Vec<usize> = rects
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.fixed)
            .map(|(i, _)| i)
            .collect();
        order.shuffle(&mut *self.rng);

        let mut changed = false;
        for i in order {
            if self.rng.gen::<f64>() >= rects[i].growth_prob {
                continue;
            }
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            changed |= self.try_grow(rects, i, direction);
        }
        changed
    }

    /// Grow `rects[index]` one step toward `direction`.
    ///
    /// The attempt is rejected, leaving the rectangle untouched, when it would
    /// exceed the aspect-ratio limit, leave the canvas, or overlap any other
    /// rectangle. Fixed rectangles never grow.
    pub fn try_grow(&self, rects: &mut [Rectangle], index: usize, direction: Direction) -> bool {
        if rects[index].fixed {
            return false;
        }
        let grown = direction.apply(rects[index].bounds(), self.config.growth_step);

        let max_ratio = self.config.max_aspect_ratio;
        if grown.w / grown.h > max_ratio || grown.h / grown.w > max_ratio {
            return false;
        }
        if !self.canvas.contains(&grown) {
            return false;
        }
        let collides = rects
            .iter()
            .enumerate()
            .any(|(j, other)| j != index && other.bounds().overlaps(&grown));
        if collides {
            return false;
        }

        rects[index].set_bounds(grown);
        true
    }

    /// Shrink every movable rectangle by `rollback_steps` growth steps
    fn rollback(&mut self, rects: &mut [Rectangle]) {
        let shrink = self.config.rollback_steps as f64 * self.config.growth_step;
        debug!(shrink, "rolling back growth");
        for rect in rects.iter_mut().filter(|r| !r.fixed) {
            rect.w = (rect.w - shrink).max(MIN_EXTENT);
            rect.h = (rect.h - shrink).max(MIN_EXTENT);
        }
        self.observer.on_rollback(rects);
    }

    fn shake(&mut self, rects: &mut [Rectangle]) {
        let report = self.shaker.relax(rects, self.config.shake_iterations);
        self.observer.on_shake(false, &report, rects);
    }

    /// Drop unit rectangles into empty cells of a coarse grid. Returns how many were added.
    fn infill(&mut self, layout: &mut Layout) -> usize {
        let config = self.config;
        let density = config.infill_grid_density;
        let step_x = self.canvas.width / density as f64;
        let step_y = self.canvas.height / density as f64;

        let index = QuadTree::build(
            self.canvas.bounds(),
            DEFAULT_CAPACITY,
            layout
                .rectangles
                .iter()
                .enumerate()
                .map(|(i, r)| (r.bounds(), i)),
        );
        let is_free = |cell: &Bounds| {
            index
                .query(cell)
                .into_iter()
                .all(|k| !layout.rectangles[k].bounds().overlaps(cell))
        };

        let mut empty = Vec::new();
        for i in 0..density {
            for j in 0..density {
                let cell = Bounds::new(
                    (i as f64 + 0.5) * step_x,
                    (j as f64 + 0.5) * step_y,
                    INFILL_SIZE,
                    INFILL_SIZE,
                );
                if self.canvas.contains(&cell) && is_free(&cell) {
                    empty.push(cell);
                }
            }
        }

        if empty.is_empty() {
            warn!("infill found no empty grid cell");
            return 0;
        }

        let chosen: Vec<Bounds> = empty
            .choose_multiple(&mut *self.rng, config.infill_component_count)
            .copied()
            .collect();
        let mut added: Vec<Bounds> = Vec::with_capacity(chosen.len());
        for cell in chosen {
            if added.iter().any(|b| b.overlaps(&cell)) {
                continue;
            }
            let prob = sampling::uniform(&mut *self.rng, config.infill_growth_prob_range);
            let id = layout.allocate_rect_id();
            layout.push(Rectangle::new(id, cell).with_growth_prob(prob));
            added.push(cell);
        }

        debug!(added = added.len(), "infill placed new rectangles");
        self.observer.on_infill(added.len(), &layout.rectangles);
        added.len()
    }

    fn set_phase(&mut self, phase: GrowthPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.observer.on_phase(phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::shake::count_overlaps;
    use crate::layout::types::RectId;
    use std::collections::BTreeSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> GrowthConfig {
        GrowthConfig {
            growth_step: 2.0,
            max_aspect_ratio: 3.0,
            ..GrowthConfig::default()
        }
    }

    fn rect(id: usize, bounds: Bounds) -> Rectangle {
        Rectangle::new(RectId(id), bounds).with_growth_prob(1.0)
    }

    #[test]
    fn test_direction_keeps_opposite_edge() {
        let b = Bounds::new(10.0, 10.0, 4.0, 4.0);
        let right = Direction::Right.apply(b, 2.0);
        assert_eq!(right.left(), b.left());
        assert_eq!(right.w, 6.0);
        let up = Direction::Up.apply(b, 2.0);
        assert_eq!(up.bottom(), b.bottom());
        assert_eq!(up.h, 6.0);
    }

    #[test]
    fn test_grow_into_free_space() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(0);
        let engine = GrowthEngine::new(&config, Canvas::new(100.0, 100.0), &mut rng);
        let mut rects = vec![rect(0, Bounds::new(50.0, 50.0, 1.0, 1.0))];
        assert!(engine.try_grow(&mut rects, 0, Direction::Left));
        assert_eq!(rects[0].bounds(), Bounds::new(49.0, 50.0, 3.0, 1.0));
    }

    #[test]
    fn test_aspect_ratio_rejection() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(0);
        let engine = GrowthEngine::new(&config, Canvas::new(100.0, 100.0), &mut rng);
        let before = Bounds::new(50.0, 50.0, 3.0, 1.0);
        let mut rects = vec![rect(0, before)];
        assert!(!engine.try_grow(&mut rects, 0, Direction::Right));
        assert_eq!(rects[0].bounds(), before);
        assert!(engine.try_grow(&mut rects, 0, Direction::Down));
    }

    #[test]
    fn test_canvas_edge_rejection() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(0);
        let engine = GrowthEngine::new(&config, Canvas::new(100.0, 100.0), &mut rng);
        let before = Bounds::new(0.5, 50.0, 1.0, 1.0);
        let mut rects = vec![rect(0, before)];
        assert!(!engine.try_grow(&mut rects, 0, Direction::Left));
        assert_eq!(rects[0].bounds(), before);
    }

    #[test]
    fn test_fixed_rectangles_never_grow() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(0);
        let engine = GrowthEngine::new(&config, Canvas::new(100.0, 100.0), &mut rng);
        let mut fixed = rect(0, Bounds::new(50.0, 50.0, 4.0, 4.0));
        fixed.fixed = true;
        let mut rects = vec![fixed];
        assert!(!engine.try_grow(&mut rects, 0, Direction::Right));
    }

    #[test]
    fn test_rollback_respects_fixed_and_minimum() {
        let config = GrowthConfig {
            rollback_steps: 2,
            ..config()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut engine = GrowthEngine::new(&config, Canvas::new(100.0, 100.0), &mut rng);
        let mut fixed = rect(0, Bounds::new(20.0, 20.0, 10.0, 10.0));
        fixed.fixed = true;
        let mut rects = vec![
            fixed,
            rect(1, Bounds::new(60.0, 60.0, 10.0, 6.0)),
            rect(2, Bounds::new(80.0, 80.0, 3.0, 3.0)),
        ];
        engine.rollback(&mut rects);
        assert_eq!(rects[0].bounds(), Bounds::new(20.0, 20.0, 10.0, 10.0));
        assert_eq!(rects[1].bounds(), Bounds::new(60.0, 60.0, 6.0, 2.0));
        assert_eq!(rects[2].bounds(), Bounds::new(80.0, 80.0, 1.0, 1.0));
    }

    #[test]
    fn test_infill_fills_empty_cells_only() {
        let config = GrowthConfig {
            infill_grid_density: 4,
            infill_component_count: 16,
            ..config()
        };
        let canvas = Canvas::new(40.0, 40.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut layout = Layout::new(canvas);
        // Covers the left half: cell centers at x = 5 and x = 15
        let id = layout.allocate_rect_id();
        layout.push(rect(id.0, Bounds::from_corner(0.0, 0.0, 20.0, 40.0)));

        let mut engine = GrowthEngine::new(&config, canvas, &mut rng);
        let added = engine.infill(&mut layout);
        assert_eq!(added, 8);
        assert_eq!(layout.rectangles.len(), 9);
        for r in &layout.rectangles[1..] {
            assert!(r.x > 20.0);
            assert_eq!((r.w, r.h), (1.0, 1.0));
            assert!(!r.fixed);
        }
        let ids: BTreeSet<usize> = layout.rectangles.iter().map(|r| r.id.0).collect();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_infill_reports_zero_when_full() {
        let config = GrowthConfig {
            infill_grid_density: 4,
            ..config()
        };
        let canvas = Canvas::new(40.0, 40.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut layout = Layout::new(canvas);
        layout.push(rect(0, Bounds::from_corner(0.0, 0.0, 40.0, 40.0)));
        let mut engine = GrowthEngine::new(&config, canvas, &mut rng);
        assert_eq!(engine.infill(&mut layout), 0);
        assert_eq!(layout.rectangles.len(), 1);
    }

    #[derive(Default)]
    struct Phases(Vec<GrowthPhase>);

    impl GrowthObserver for Phases {
        fn on_phase(&mut self, phase: GrowthPhase) {
            self.0.push(phase);
        }
    }

    #[test]
    fn test_run_reaches_target_density_on_open_canvas() {
        let config = GrowthConfig {
            target_density: 0.05,
            max_iterations: 500,
            ..config()
        };
        let canvas = Canvas::new(100.0, 100.0);
        let mut layout = Layout::new(canvas);
        layout.push(rect(0, Bounds::new(30.0, 30.0, 1.0, 1.0)));
        layout.push(rect(1, Bounds::new(70.0, 70.0, 1.0, 1.0)));

        let mut rng = StdRng::seed_from_u64(4);
        let mut phases = Phases::default();
        let report = GrowthEngine::new(&config, canvas, &mut rng)
            .with_observer(&mut phases)
            .run(&mut layout);

        assert_eq!(report.termination, Termination::TargetDensity);
        assert!(report.final_density >= 0.05);
        assert!(report.legalization.is_clean());
        assert_eq!(
            phases.0,
            vec![GrowthPhase::Legalizing, GrowthPhase::Done]
        );
    }

    /// Recovery actions in order: `R` for rollback, `I` for infill
    #[derive(Default)]
    struct Recoveries(String);

    impl GrowthObserver for Recoveries {
        fn on_rollback(&mut self, _rects: &[Rectangle]) {
            self.0.push('R');
        }

        fn on_infill(&mut self, _added: usize, _rects: &[Rectangle]) {
            self.0.push('I');
        }
    }

    #[test]
    fn test_recovery_alternates_rollback_and_infill() {
        let config = GrowthConfig {
            target_density: 1.0,
            max_iterations: 300,
            shake_trigger_threshold: 3,
            infill_trigger_after_n_shakes: 2,
            infill_max_triggers: 2,
            ..config()
        };
        let canvas = Canvas::new(60.0, 60.0);
        let mut layout = Layout::new(canvas);
        let seeds = [
            (10.0, 10.0),
            (30.0, 10.0),
            (50.0, 10.0),
            (10.0, 50.0),
            (30.0, 50.0),
            (50.0, 50.0),
        ];
        for (i, (x, y)) in seeds.into_iter().enumerate() {
            layout.push(rect(i, Bounds::new(x, y, 1.0, 1.0)));
        }

        let mut rng = StdRng::seed_from_u64(31);
        let mut events = Recoveries::default();
        let mut engine = GrowthEngine::new(&config, canvas, &mut rng).with_observer(&mut events);
        assert_eq!(engine.phase(), GrowthPhase::Growing);
        let report = engine.run(&mut layout);
        assert_eq!(engine.phase(), GrowthPhase::Done);

        assert!(events.0.starts_with("RRIRRI"), "recoveries: {}", events.0);
        assert_eq!(report.infill_triggers, config.infill_max_triggers);
        assert_eq!(events.0.matches('I').count(), report.infill_triggers);
        assert_eq!(events.0.matches('R').count(), report.rollbacks);
        assert!(report.rollbacks > 2);
        assert_eq!(layout.rectangles.len(), seeds.len() + report.infill_added);
        assert!(report.legalization.is_clean());
        assert_eq!(count_overlaps(&layout.rectangles, canvas), 0);
    }

    #[test]
    fn test_run_stops_at_stagnation_limit() {
        let config = GrowthConfig {
            target_density: 1.0,
            stagnation_limit: 5,
            shake_trigger_threshold: 100,
            max_iterations: 1000,
            ..config()
        };
        let canvas = Canvas::new(10.0, 10.0);
        let mut layout = Layout::new(canvas);
        // Spans the full width and leaves one unit strip below, too thin to grow into
        layout.push(rect(0, Bounds::new(5.0, 4.5, 10.0, 9.0)));

        let mut rng = StdRng::seed_from_u64(4);
        let report = GrowthEngine::new(&config, canvas, &mut rng).run(&mut layout);
        assert_eq!(report.termination, Termination::StagnationLimit);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.rollbacks, 0);
    }

    #[test]
    fn test_run_respects_iteration_budget() {
        let config = GrowthConfig {
            target_density: 1.0,
            max_iterations: 3,
            ..config()
        };
        let canvas = Canvas::new(100.0, 100.0);
        let mut layout = Layout::new(canvas);
        layout.push(rect(0, Bounds::new(50.0, 50.0, 1.0, 1.0)));
        let mut rng = StdRng::seed_from_u64(4);
        let report = GrowthEngine::new(&config, canvas, &mut rng).run(&mut layout);
        assert_eq!(report.termination, Termination::IterationBudget);
        assert_eq!(report.iterations, 3);
    }
}
