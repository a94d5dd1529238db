//! Generator configuration
//!
//! All parameters live in one plain struct tree that deserializes from TOML.
//! Every section carries `#[serde(default)]`, so a config file only needs to
//! name the values it overrides:
//!
//! ```toml
//! canvas_width = 800.0
//! canvas_height = 600.0
//!
//! [growth]
//! target_density = 0.65
//!
//! [symmetry]
//! enable = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::types::{AlignMode, Canvas, MirrorAxis, SymmetryPattern};

/// Inclusive `[low, high]` range of reals
pub type RealRange = (f64, f64);

/// Inclusive `[low, high]` range of counts
pub type CountRange = (usize, usize);

/// Complete parameter set for one layout run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Seed for the run; the CLI derives one per sample when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Quadtree node capacity used by the shake passes
    pub index_capacity: usize,
    pub population: PopulationConfig,
    pub growth: GrowthConfig,
    pub netlist: NetlistConfig,
    pub symmetry: SymmetryConfig,
    pub alignment: AlignmentConfig,
    pub grouping: GroupingConfig,
}

/// Free rectangles seeded before growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub num_rectangles: usize,
    /// Rejection-sampling attempts per rectangle
    pub placement_attempts: usize,
    pub categories: Vec<CategoryConfig>,
}

/// Initial size and growth propensity of one component category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    /// Share of `num_rectangles` assigned to this category
    pub proportion: f64,
    pub width_range: RealRange,
    pub height_range: RealRange,
    pub growth_prob_range: RealRange,
}

/// Growth simulation and recovery parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub growth_step: f64,
    pub max_aspect_ratio: f64,
    pub target_density: f64,
    pub max_iterations: usize,
    /// Consecutive idle iterations that trigger a recovery action
    pub shake_trigger_threshold: usize,
    /// Consecutive idle iterations that end the run
    pub stagnation_limit: usize,
    /// Growth steps undone on every movable rectangle during rollback
    pub rollback_steps: usize,
    pub shake_strength: f64,
    pub shake_iterations: usize,
    pub legalize_iterations: usize,
    /// Infill samples a `density x density` grid of cell centers
    pub infill_grid_density: usize,
    pub infill_component_count: usize,
    pub infill_trigger_after_n_shakes: usize,
    pub infill_max_triggers: usize,
    pub infill_growth_prob_range: RealRange,
}

/// Pin and netlist synthesis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistConfig {
    /// Pin density constant in `k * area^p`
    pub k: f64,
    /// Rent exponent in `k * area^p`
    pub p: f64,
    pub pin_edge_margin_ratio: f64,
    /// Connection probability at zero distance
    pub p_max: f64,
    pub decay_rate: f64,
    /// Manhattan cutoff for probabilistic edges
    pub max_edge_length: f64,
    /// Candidates considered per pin in the probabilistic stage
    pub k_nearest: usize,
}

/// Mirrored group generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetryConfig {
    pub enable: bool,
    pub num_groups: CountRange,
    pub width_range: RealRange,
    pub height_range: RealRange,
    /// Gap between mirror partners across the axis
    pub mirror_gap_range: RealRange,
    /// Gap between stacked pairs along the axis
    pub stack_gap_range: RealRange,
    /// Minimum distance of a group anchor from the canvas edge
    pub anchor_margin: f64,
    pub max_attempts: usize,
    pub variants: Vec<SymmetryVariant>,
}

/// A weighted symmetry pattern choice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryVariant {
    pub weight: f64,
    #[serde(flatten)]
    pub pattern: SymmetryPattern,
}

/// Alignment chain generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub enable: bool,
    pub num_sets: CountRange,
    pub components_per_set: CountRange,
    pub width_range: RealRange,
    pub height_range: RealRange,
    pub gap_range: RealRange,
    /// Minimum distance of a chain seed from the canvas edge
    pub padding: f64,
    pub max_attempts: usize,
    pub mode_weights: Vec<AlignModeWeight>,
}

/// A weighted alignment mode choice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignModeWeight {
    pub mode: AlignMode,
    pub weight: f64,
}

/// Post-growth proximity grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub enable: bool,
    pub num_groups: CountRange,
    pub items_per_group: CountRange,
    /// Neighbours farther than this from the seed are never grouped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_search_radius: Option<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1000.0,
            canvas_height: 1000.0,
            seed: None,
            index_capacity: 4,
            population: PopulationConfig::default(),
            growth: GrowthConfig::default(),
            netlist: NetlistConfig::default(),
            symmetry: SymmetryConfig::default(),
            alignment: AlignmentConfig::default(),
            grouping: GroupingConfig::default(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            num_rectangles: 120,
            placement_attempts: 500,
            categories: vec![
                CategoryConfig {
                    name: "macro".to_string(),
                    proportion: 0.1,
                    width_range: (20.0, 60.0),
                    height_range: (20.0, 60.0),
                    growth_prob_range: (0.6, 0.9),
                },
                CategoryConfig {
                    name: "std_cell".to_string(),
                    proportion: 0.9,
                    width_range: (1.0, 1.0),
                    height_range: (1.0, 1.0),
                    growth_prob_range: (0.1, 0.5),
                },
            ],
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            growth_step: 2.0,
            max_aspect_ratio: 3.0,
            target_density: 0.7,
            max_iterations: 2000,
            shake_trigger_threshold: 20,
            stagnation_limit: 200,
            rollback_steps: 3,
            shake_strength: 0.5,
            shake_iterations: 10,
            legalize_iterations: 100,
            infill_grid_density: 40,
            infill_component_count: 10,
            infill_trigger_after_n_shakes: 3,
            infill_max_triggers: 5,
            infill_growth_prob_range: (0.1, 0.5),
        }
    }
}

impl Default for NetlistConfig {
    fn default() -> Self {
        Self {
            k: 0.05,
            p: 0.6,
            pin_edge_margin_ratio: 0.1,
            p_max: 0.5,
            decay_rate: 0.01,
            max_edge_length: 200.0,
            k_nearest: 5,
        }
    }
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            enable: true,
            num_groups: (1, 3),
            width_range: (20.0, 60.0),
            height_range: (20.0, 60.0),
            mirror_gap_range: (5.0, 20.0),
            stack_gap_range: (5.0, 15.0),
            anchor_margin: 150.0,
            max_attempts: 200,
            variants: vec![
                SymmetryVariant {
                    weight: 2.0,
                    pattern: SymmetryPattern::TwoFold {
                        axis: MirrorAxis::Vertical,
                        pairs: 1,
                    },
                },
                SymmetryVariant {
                    weight: 1.0,
                    pattern: SymmetryPattern::TwoFold {
                        axis: MirrorAxis::Horizontal,
                        pairs: 2,
                    },
                },
                SymmetryVariant {
                    weight: 1.0,
                    pattern: SymmetryPattern::FourFold,
                },
            ],
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        let mode_weights = [
            AlignMode::Left,
            AlignMode::Right,
            AlignMode::Top,
            AlignMode::Bottom,
            AlignMode::HCenter,
            AlignMode::VCenter,
        ]
        .into_iter()
        .map(|mode| AlignModeWeight { mode, weight: 1.0 })
        .collect();

        Self {
            enable: true,
            num_sets: (1, 3),
            components_per_set: (2, 5),
            width_range: (15.0, 40.0),
            height_range: (15.0, 40.0),
            gap_range: (5.0, 20.0),
            padding: 100.0,
            max_attempts: 150,
            mode_weights,
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            enable: true,
            num_groups: (3, 8),
            items_per_group: (2, 5),
            max_search_radius: None,
        }
    }
}

impl GeneratorConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.canvas_width, self.canvas_height)
    }

    /// Set the canvas size
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Set the run seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_population(mut self, population: PopulationConfig) -> Self {
        self.population = population;
        self
    }

    pub fn with_growth(mut self, growth: GrowthConfig) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_netlist(mut self, netlist: NetlistConfig) -> Self {
        self.netlist = netlist;
        self
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryConfig) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingConfig) -> Self {
        self.grouping = grouping;
        self
    }

    /// Disable all three constraint group passes
    pub fn without_constraint_groups(mut self) -> Self {
        self.symmetry.enable = false;
        self.alignment.enable = false;
        self.grouping.enable = false;
        self
    }

    /// Check every value the engine relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("canvas_width", self.canvas_width)?;
        positive("canvas_height", self.canvas_height)?;
        ensure(self.index_capacity > 0, "index_capacity", "must be at least 1")?;

        let pop = &self.population;
        if pop.num_rectangles > 0 {
            ensure(
                !pop.categories.is_empty(),
                "population.categories",
                "at least one category is required when num_rectangles > 0",
            )?;
        }
        for (i, cat) in pop.categories.iter().enumerate() {
            let field = |name: &str| format!("population.categories[{}].{}", i, name);
            ensure(!cat.name.is_empty(), &field("name"), "must not be empty")?;
            ensure(
                cat.proportion.is_finite() && cat.proportion >= 0.0,
                &field("proportion"),
                "must be a non-negative number",
            )?;
            size_range(&field("width_range"), cat.width_range)?;
            size_range(&field("height_range"), cat.height_range)?;
            probability_range(&field("growth_prob_range"), cat.growth_prob_range)?;
        }

        let g = &self.growth;
        positive("growth.growth_step", g.growth_step)?;
        ensure(
            g.max_aspect_ratio >= 1.0,
            "growth.max_aspect_ratio",
            "must be at least 1",
        )?;
        ensure(
            g.target_density > 0.0 && g.target_density <= 1.0,
            "growth.target_density",
            "must be in (0, 1]",
        )?;
        ensure(
            g.shake_trigger_threshold > 0,
            "growth.shake_trigger_threshold",
            "must be at least 1",
        )?;
        ensure(
            g.stagnation_limit > 0,
            "growth.stagnation_limit",
            "must be at least 1",
        )?;
        positive("growth.shake_strength", g.shake_strength)?;
        ensure(
            g.infill_grid_density > 0,
            "growth.infill_grid_density",
            "must be at least 1",
        )?;
        probability_range("growth.infill_growth_prob_range", g.infill_growth_prob_range)?;

        let n = &self.netlist;
        ensure(n.k >= 0.0, "netlist.k", "must be non-negative")?;
        ensure(n.p >= 0.0, "netlist.p", "must be non-negative")?;
        ensure(
            (0.0..=0.5).contains(&n.pin_edge_margin_ratio),
            "netlist.pin_edge_margin_ratio",
            "must be in [0, 0.5]",
        )?;
        ensure(
            (0.0..=1.0).contains(&n.p_max),
            "netlist.p_max",
            "must be a probability",
        )?;
        ensure(n.decay_rate >= 0.0, "netlist.decay_rate", "must be non-negative")?;
        positive("netlist.max_edge_length", n.max_edge_length)?;

        let s = &self.symmetry;
        if s.enable {
            count_range("symmetry.num_groups", s.num_groups)?;
            size_range("symmetry.width_range", s.width_range)?;
            size_range("symmetry.height_range", s.height_range)?;
            gap_range("symmetry.mirror_gap_range", s.mirror_gap_range)?;
            gap_range("symmetry.stack_gap_range", s.stack_gap_range)?;
            ensure(s.anchor_margin >= 0.0, "symmetry.anchor_margin", "must be non-negative")?;
            weights("symmetry.variants", s.variants.iter().map(|v| v.weight))?;
            for (i, variant) in s.variants.iter().enumerate() {
                if let SymmetryPattern::TwoFold { pairs, .. } = variant.pattern {
                    ensure(
                        pairs > 0,
                        &format!("symmetry.variants[{}].pairs", i),
                        "must be at least 1",
                    )?;
                }
            }
        }

        let a = &self.alignment;
        if a.enable {
            count_range("alignment.num_sets", a.num_sets)?;
            count_range("alignment.components_per_set", a.components_per_set)?;
            ensure(
                a.components_per_set.0 > 0,
                "alignment.components_per_set",
                "a chain needs at least one member",
            )?;
            size_range("alignment.width_range", a.width_range)?;
            size_range("alignment.height_range", a.height_range)?;
            gap_range("alignment.gap_range", a.gap_range)?;
            ensure(a.padding >= 0.0, "alignment.padding", "must be non-negative")?;
            weights("alignment.mode_weights", a.mode_weights.iter().map(|m| m.weight))?;
        }

        let gr = &self.grouping;
        if gr.enable {
            count_range("grouping.num_groups", gr.num_groups)?;
            count_range("grouping.items_per_group", gr.items_per_group)?;
            if let Some(radius) = gr.max_search_radius {
                ensure(
                    radius >= 0.0,
                    "grouping.max_search_radius",
                    "must be non-negative",
                )?;
            }
        }

        Ok(())
    }
}

fn ensure(condition: bool, field: &str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, reason))
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    ensure(value.is_finite() && value > 0.0, field, "must be a positive number")
}

fn ordered(field: &str, (low, high): RealRange) -> Result<(), ConfigError> {
    ensure(
        low.is_finite() && high.is_finite(),
        field,
        "bounds must be finite",
    )?;
    ensure(low <= high, field, "low bound exceeds high bound")
}

fn size_range(field: &str, range: RealRange) -> Result<(), ConfigError> {
    ordered(field, range)?;
    ensure(range.0 > 0.0, field, "sizes must be positive")
}

fn gap_range(field: &str, range: RealRange) -> Result<(), ConfigError> {
    ordered(field, range)?;
    ensure(range.0 >= 0.0, field, "gaps must be non-negative")
}

fn probability_range(field: &str, range: RealRange) -> Result<(), ConfigError> {
    ordered(field, range)?;
    ensure(
        range.0 >= 0.0 && range.1 <= 1.0,
        field,
        "probabilities must be in [0, 1]",
    )
}

fn count_range(field: &str, (low, high): CountRange) -> Result<(), ConfigError> {
    ensure(low <= high, field, "low bound exceeds high bound")
}

fn weights(field: &str, weights: impl Iterator<Item = f64>) -> Result<(), ConfigError> {
    let mut total = 0.0;
    for weight in weights {
        ensure(
            weight.is_finite() && weight >= 0.0,
            field,
            "weights must be non-negative",
        )?;
        total += weight;
    }
    ensure(total > 0.0, field, "at least one weight must be positive")
}
