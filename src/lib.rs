//! Floorplan Synth - synthetic rectangle-packing layouts with netlists
//!
//! This library places constrained clusters (mirrored groups, aligned chains),
//! grows a free population of rectangles toward a target density, groups the
//! result by proximity and attaches pins and a netlist.
//!
//! # Example
//!
//! ```rust
//! use floorplan_synth::{generate, GeneratorConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = GeneratorConfig::new().with_canvas(400.0, 400.0);
//! let mut rng = StdRng::seed_from_u64(7);
//! let generation = generate(&config, &mut rng).unwrap();
//!
//! assert!(!generation.layout.rectangles.is_empty());
//! assert!(generation.layout.density() > 0.0);
//! ```

pub mod config;
pub mod constraints;
pub mod error;
pub mod layout;
pub mod netlist;
mod sampling;

pub use config::GeneratorConfig;
pub use constraints::{
    AlignmentGenerator, GroupingReport, HierarchicalGrouper, PlacementReport, SymmetryGenerator,
};
pub use error::ConfigError;
pub use layout::{
    GrowthEngine, GrowthObserver, GrowthReport, Layout, LayoutRecord, NoopObserver,
    PopulationReport, ShakeResolver,
};
pub use netlist::{NetlistReport, NetlistSynthesizer};

use rand::Rng;
use tracing::info;

/// A finished layout together with the report of every pipeline stage
#[derive(Debug, Clone)]
pub struct Generation {
    pub layout: Layout,
    pub symmetry: PlacementReport,
    pub alignment: PlacementReport,
    pub population: PopulationReport,
    pub growth: GrowthReport,
    pub grouping: GroupingReport,
    pub netlist: NetlistReport,
}

impl Generation {
    /// Serializable view of the layout
    pub fn record(&self) -> LayoutRecord {
        LayoutRecord::from(&self.layout)
    }
}

/// Generate one layout
///
/// The configuration is validated first; an invalid value is the only error.
/// Everything else (skipped groups, early termination, residual overlap) is
/// reported in the returned [`Generation`].
pub fn generate<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Generation, ConfigError> {
    generate_with_observer(config, rng, NoopObserver)
}

/// Generate one layout, reporting growth progress to `observer`
///
/// # Example
///
/// ```rust
/// use floorplan_synth::layout::{GrowthObserver, GrowthPhase};
/// use floorplan_synth::{generate_with_observer, GeneratorConfig};
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// #[derive(Default)]
/// struct Frames(usize);
///
/// impl GrowthObserver for Frames {
///     fn on_phase(&mut self, phase: GrowthPhase) {
///         if phase == GrowthPhase::Done {
///             self.0 += 1;
///         }
///     }
/// }
///
/// let config = GeneratorConfig::new()
///     .with_canvas(300.0, 300.0)
///     .without_constraint_groups();
/// let mut frames = Frames::default();
/// let mut rng = StdRng::seed_from_u64(1);
/// generate_with_observer(&config, &mut rng, &mut frames).unwrap();
/// assert_eq!(frames.0, 1);
/// ```
pub fn generate_with_observer<R: Rng + ?Sized, O: GrowthObserver>(
    config: &GeneratorConfig,
    rng: &mut R,
    observer: O,
) -> Result<Generation, ConfigError> {
    config.validate()?;
    let canvas = config.canvas();
    let mut layout = Layout::new(canvas);

    // Fixed clusters go first so free rectangles grow around them
    let symmetry = if config.symmetry.enable {
        SymmetryGenerator::new(&config.symmetry, &config.netlist, canvas)?.place(&mut layout, rng)
    } else {
        PlacementReport::default()
    };
    let alignment = if config.alignment.enable {
        AlignmentGenerator::new(&config.alignment, canvas)?.place(&mut layout, rng)
    } else {
        PlacementReport::default()
    };

    let population = layout::seed_population(&mut layout, &config.population, rng);
    let growth = GrowthEngine::new(&config.growth, canvas, &mut *rng)
        .with_index_capacity(config.index_capacity)
        .with_observer(observer)
        .run(&mut layout);

    let grouping = if config.grouping.enable {
        HierarchicalGrouper::new(&config.grouping).group(&mut layout, rng)
    } else {
        GroupingReport::default()
    };
    let netlist = NetlistSynthesizer::new(&config.netlist).synthesize(&mut layout, rng);

    info!(
        rectangles = layout.rectangles.len(),
        pins = layout.pin_count(),
        edges = layout.edges.len(),
        density = layout.density(),
        "layout generated"
    );

    Ok(Generation {
        layout,
        symmetry,
        alignment,
        population,
        growth,
        grouping,
        netlist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GrowthConfig, PopulationConfig};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig::new()
            .with_canvas(400.0, 400.0)
            .with_population(PopulationConfig {
                num_rectangles: 40,
                ..PopulationConfig::default()
            })
            .with_growth(GrowthConfig {
                max_iterations: 300,
                ..GrowthConfig::default()
            })
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let config = small_config().with_canvas(0.0, 400.0);
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate(&config, &mut rng).unwrap_err();
        assert_eq!(err.field(), Some("canvas_width"));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let config = small_config();
        let a = generate(&config, &mut StdRng::seed_from_u64(99)).expect("valid config");
        let b = generate(&config, &mut StdRng::seed_from_u64(99)).expect("valid config");
        assert_eq!(a.record(), b.record());
        assert_eq!(a.growth, b.growth);
    }

    #[test]
    fn test_disabled_generators_report_nothing() {
        let config = small_config().without_constraint_groups();
        let generation = generate(&config, &mut StdRng::seed_from_u64(5)).expect("valid config");
        assert_eq!(generation.symmetry, PlacementReport::default());
        assert_eq!(generation.alignment, PlacementReport::default());
        assert_eq!(generation.grouping, GroupingReport::default());
        assert!(generation.layout.rectangles.iter().all(|r| !r.fixed));
        assert!(generation.layout.hierarchical_groups.is_empty());
    }
}
