//! Core data model: rectangles, pins, constraint records and the owning layout

use std::fmt;

use serde::{Deserialize, Serialize};

/// Penetration depth below which two boxes are treated as touching, not overlapping
pub const OVERLAP_EPSILON: f64 = 1e-9;

/// A 2D point in canvas coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Manhattan distance to another point
    pub fn manhattan(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// An axis-aligned box described by its center and extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build a box from its top-left corner and extent
    pub fn from_corner(left: f64, top: f64, w: f64, h: f64) -> Self {
        Self::new(left + w / 2.0, top + h / 2.0, w, h)
    }

    pub fn left(&self) -> f64 {
        self.x - self.w / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.w / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.h / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Closed-interval intersection test; touching boxes intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }

    /// Penetration depth along each axis. Both components are positive only
    /// when the boxes share interior area.
    pub fn penetration(&self, other: &Bounds) -> (f64, f64) {
        let overlap_x = (self.w + other.w) / 2.0 - (self.x - other.x).abs();
        let overlap_y = (self.h + other.h) / 2.0 - (self.y - other.y).abs();
        (overlap_x, overlap_y)
    }

    /// True when the boxes share a positive-area region
    pub fn overlaps(&self, other: &Bounds) -> bool {
        let (ox, oy) = self.penetration(other);
        ox > OVERLAP_EPSILON && oy > OVERLAP_EPSILON
    }

    /// True when the box fully contains `other`
    pub fn contains(&self, other: &Bounds) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Smallest box enclosing both
    pub fn union(&self, other: &Bounds) -> Bounds {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::from_corner(left, top, right - left, bottom - top)
    }
}

/// The drawable area every rectangle must stay inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The canvas as a box anchored at the origin
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corner(0.0, 0.0, self.width, self.height)
    }

    /// True when `bounds` lies within `[0, width] x [0, height]`, up to rounding
    pub fn contains(&self, bounds: &Bounds) -> bool {
        bounds.left() >= -OVERLAP_EPSILON
            && bounds.right() <= self.width + OVERLAP_EPSILON
            && bounds.top() >= -OVERLAP_EPSILON
            && bounds.bottom() <= self.height + OVERLAP_EPSILON
    }

    /// Move a box's center so the box lies inside the canvas.
    ///
    /// A box larger than the canvas along an axis is centered on that axis.
    pub fn clamp(&self, bounds: Bounds) -> Bounds {
        let clamp_axis = |center: f64, extent: f64, limit: f64| {
            let half = extent / 2.0;
            if half * 2.0 >= limit {
                limit / 2.0
            } else {
                center.clamp(half, limit - half)
            }
        };
        Bounds {
            x: clamp_axis(bounds.x, bounds.w, self.width),
            y: clamp_axis(bounds.y, bounds.h, self.height),
            ..bounds
        }
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Unique rectangle identifier within a layout
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RectId(pub usize);

/// Unique pin identifier within a layout
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PinId(pub usize);

impl fmt::Display for RectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a mirrored group, displayed as `sym_group_N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymmetryGroupId(pub usize);

/// Identifier of an alignment chain, displayed as `align_group_N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlignmentGroupId(pub usize);

/// Identifier of a proximity cluster, displayed as `h_group_N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierarchicalGroupId(pub usize);

impl fmt::Display for SymmetryGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_group_{}", self.0)
    }
}

impl fmt::Display for AlignmentGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "align_group_{}", self.0)
    }
}

impl fmt::Display for HierarchicalGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h_group_{}", self.0)
    }
}

// ============================================================================
// Constraint tags
// ============================================================================

/// Mirror axis of a two-fold symmetric group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorAxis {
    /// Partners sit left/right of a vertical axis; pin offsets flip in x
    Vertical,
    /// Partners sit above/below a horizontal axis; pin offsets flip in y
    Horizontal,
}

impl MirrorAxis {
    /// Mirror a pin offset across this axis
    pub fn mirror(&self, (dx, dy): (f64, f64)) -> (f64, f64) {
        match self {
            MirrorAxis::Vertical => (-dx, dy),
            MirrorAxis::Horizontal => (dx, -dy),
        }
    }
}

/// Geometry of a symmetric group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymmetryPattern {
    /// Mirrored pairs, optionally stacked along the non-mirror axis
    TwoFold {
        axis: MirrorAxis,
        #[serde(default = "default_pairs")]
        pairs: usize,
    },
    /// A 2x2 quad mirrored across both axes
    FourFold,
}

fn default_pairs() -> usize {
    1
}

/// Edge or center line shared by the members of an alignment chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    Left,
    Right,
    Top,
    Bottom,
    /// Shared center x; the chain advances downward
    HCenter,
    /// Shared center y; the chain advances rightward
    VCenter,
}

impl AlignMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignMode::Left => "left",
            AlignMode::Right => "right",
            AlignMode::Top => "top",
            AlignMode::Bottom => "bottom",
            AlignMode::HCenter => "h_center",
            AlignMode::VCenter => "v_center",
        }
    }

    /// Whether the chain grows along the y axis
    pub fn stacks_vertically(&self) -> bool {
        matches!(self, AlignMode::Left | AlignMode::Right | AlignMode::HCenter)
    }
}

impl fmt::Display for AlignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of group a rectangle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Symmetric,
    Aligned,
    Hierarchical,
}

/// Placement-time group membership, set by the constraint generators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupTag {
    Symmetric {
        id: SymmetryGroupId,
        pattern: SymmetryPattern,
    },
    Aligned {
        id: AlignmentGroupId,
        mode: AlignMode,
    },
}

impl GroupTag {
    pub fn kind(&self) -> GroupKind {
        match self {
            GroupTag::Symmetric { .. } => GroupKind::Symmetric,
            GroupTag::Aligned { .. } => GroupKind::Aligned,
        }
    }
}

/// Constraint memberships of a rectangle, one optional slot per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintSlots {
    pub symmetry: Option<SymmetryGroupId>,
    pub alignment: Option<AlignmentGroupId>,
    pub hierarchical: Option<HierarchicalGroupId>,
}

impl ConstraintSlots {
    pub fn is_empty(&self) -> bool {
        self.symmetry.is_none() && self.alignment.is_none() && self.hierarchical.is_none()
    }
}

// ============================================================================
// Rectangles and pins
// ============================================================================

/// A connection point on a rectangle, stored as an offset from the parent's center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
    pub id: PinId,
    /// Owning rectangle; resolve through [`Layout::rectangle`]
    pub parent: RectId,
    pub dx: f64,
    pub dy: f64,
}

impl Pin {
    pub fn new(id: PinId, parent: RectId, (dx, dy): (f64, f64)) -> Self {
        Self { id, parent, dx, dy }
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    /// Absolute position given the parent's current center
    pub fn position(&self, parent: &Rectangle) -> Point {
        Point::new(parent.x + self.dx, parent.y + self.dy)
    }
}

/// A placed component
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub id: RectId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Probability of attempting growth each iteration, in `[0, 1]`
    pub growth_prob: f64,
    /// Component category name (e.g. `macro`, `std_cell`)
    pub category: Option<String>,
    /// Placed by a constraint generator; growth and shake never move it
    pub fixed: bool,
    pub group: Option<GroupTag>,
    pub pins: Vec<Pin>,
    pub constraints: ConstraintSlots,
}

impl Rectangle {
    pub fn new(id: RectId, bounds: Bounds) -> Self {
        Self {
            id,
            x: bounds.x,
            y: bounds.y,
            w: bounds.w,
            h: bounds.h,
            growth_prob: 0.0,
            category: None,
            fixed: false,
            group: None,
            pins: Vec::new(),
            constraints: ConstraintSlots::default(),
        }
    }

    pub fn with_growth_prob(mut self, prob: f64) -> Self {
        self.growth_prob = prob;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Mark as immovable and attach a group tag
    pub fn fixed_in(mut self, tag: GroupTag) -> Self {
        self.fixed = true;
        self.group = Some(tag);
        match tag {
            GroupTag::Symmetric { id, .. } => self.constraints.symmetry = Some(id),
            GroupTag::Aligned { id, .. } => self.constraints.alignment = Some(id),
        }
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.w, self.h)
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.x = bounds.x;
        self.y = bounds.y;
        self.w = bounds.w;
        self.h = bounds.h;
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Group kind for grouping bookkeeping; hierarchical membership takes precedence
    pub fn group_kind(&self) -> Option<GroupKind> {
        if self.constraints.hierarchical.is_some() {
            return Some(GroupKind::Hierarchical);
        }
        self.group.map(|tag| tag.kind())
    }
}

// ============================================================================
// Constraint records
// ============================================================================

/// Two chain neighbours that share an edge or center line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentConstraint {
    pub source: RectId,
    pub target: RectId,
    pub mode: AlignMode,
}

/// Rectangles bundled into one proximity cluster
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalGroupConstraint {
    pub id: HierarchicalGroupId,
    pub members: Vec<RectId>,
}

// ============================================================================
// Layout
// ============================================================================

/// A complete scene: canvas, rectangles with their pins, netlist and constraint records
#[derive(Debug, Clone)]
pub struct Layout {
    pub canvas: Canvas,
    pub rectangles: Vec<Rectangle>,
    /// Undirected netlist edges, each stored with the smaller pin id first
    pub edges: Vec<(PinId, PinId)>,
    pub alignment_constraints: Vec<AlignmentConstraint>,
    pub hierarchical_groups: Vec<HierarchicalGroupConstraint>,
    next_rect_id: usize,
    next_pin_id: usize,
}

impl Layout {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            rectangles: Vec::new(),
            edges: Vec::new(),
            alignment_constraints: Vec::new(),
            hierarchical_groups: Vec::new(),
            next_rect_id: 0,
            next_pin_id: 0,
        }
    }

    /// Sum of rectangle areas over canvas area
    pub fn density(&self) -> f64 {
        density(&self.rectangles, self.canvas)
    }

    /// Reserve the next unused rectangle id
    pub fn allocate_rect_id(&mut self) -> RectId {
        let id = RectId(self.next_rect_id);
        self.next_rect_id += 1;
        id
    }

    /// Reserve the next unused pin id
    pub fn allocate_pin_id(&mut self) -> PinId {
        let id = PinId(self.next_pin_id);
        self.next_pin_id += 1;
        id
    }

    /// Rectangle id that the next allocation would return, without reserving it
    pub fn peek_rect_id(&self) -> RectId {
        RectId(self.next_rect_id)
    }

    /// Add a rectangle, advancing the id counters past its id and its pins
    pub fn push(&mut self, rect: Rectangle) {
        self.next_rect_id = self.next_rect_id.max(rect.id.0 + 1);
        if let Some(max_pin) = rect.pins.iter().map(|p| p.id.0).max() {
            self.next_pin_id = self.next_pin_id.max(max_pin + 1);
        }
        self.rectangles.push(rect);
    }

    pub fn rectangle(&self, id: RectId) -> Option<&Rectangle> {
        self.rectangles.iter().find(|r| r.id == id)
    }

    /// All pins in rectangle order
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.rectangles.iter().flat_map(|r| r.pins.iter())
    }

    pub fn pin_count(&self) -> usize {
        self.rectangles.iter().map(|r| r.pins.len()).sum()
    }

    /// Absolute position of a pin, resolved through its parent
    pub fn pin_position(&self, pin: &Pin) -> Option<Point> {
        self.rectangle(pin.parent).map(|parent| pin.position(parent))
    }

    /// Bounding boxes of every rectangle currently placed
    pub fn occupied(&self) -> Vec<Bounds> {
        self.rectangles.iter().map(Rectangle::bounds).collect()
    }
}

/// Sum of rectangle areas over canvas area
pub fn density(rects: &[Rectangle], canvas: Canvas) -> f64 {
    rects.iter().map(Rectangle::area).sum::<f64>() / canvas.area()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Bounds::from_corner(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::from_corner(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_penetration_depth() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(8.0, 1.0, 10.0, 10.0);
        let (ox, oy) = a.penetration(&b);
        assert_eq!(ox, 2.0);
        assert_eq!(oy, 9.0);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_union() {
        let a = Bounds::from_corner(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::from_corner(20.0, 5.0, 10.0, 10.0);
        let u = a.union(&b);
        assert_eq!(u, Bounds::from_corner(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn test_canvas_clamp() {
        let canvas = Canvas::new(100.0, 50.0);
        let clamped = canvas.clamp(Bounds::new(-5.0, 60.0, 10.0, 10.0));
        assert_eq!(clamped, Bounds::new(5.0, 45.0, 10.0, 10.0));
        assert!(canvas.contains(&clamped));
    }

    #[test]
    fn test_canvas_clamp_oversized() {
        let canvas = Canvas::new(100.0, 50.0);
        let clamped = canvas.clamp(Bounds::new(0.0, 0.0, 120.0, 10.0));
        assert_eq!(clamped.x, 50.0);
    }

    #[test]
    fn test_group_id_display() {
        assert_eq!(SymmetryGroupId(3).to_string(), "sym_group_3");
        assert_eq!(AlignmentGroupId(0).to_string(), "align_group_0");
        assert_eq!(HierarchicalGroupId(7).to_string(), "h_group_7");
    }

    #[test]
    fn test_mirror_axis() {
        assert_eq!(MirrorAxis::Vertical.mirror((2.0, 3.0)), (-2.0, 3.0));
        assert_eq!(MirrorAxis::Horizontal.mirror((2.0, 3.0)), (2.0, -3.0));
    }

    #[test]
    fn test_hierarchical_kind_takes_precedence() {
        let tag = GroupTag::Aligned {
            id: AlignmentGroupId(1),
            mode: AlignMode::Left,
        };
        let mut rect = Rectangle::new(RectId(0), Bounds::new(5.0, 5.0, 2.0, 2.0)).fixed_in(tag);
        assert_eq!(rect.group_kind(), Some(GroupKind::Aligned));
        assert_eq!(rect.constraints.alignment, Some(AlignmentGroupId(1)));
        rect.constraints.hierarchical = Some(HierarchicalGroupId(0));
        assert_eq!(rect.group_kind(), Some(GroupKind::Hierarchical));
    }

    #[test]
    fn test_layout_id_allocation_skips_pushed_ids() {
        let mut layout = Layout::new(Canvas::new(100.0, 100.0));
        let mut rect = Rectangle::new(RectId(4), Bounds::new(10.0, 10.0, 2.0, 2.0));
        rect.pins.push(Pin::new(PinId(9), RectId(4), (1.0, 0.0)));
        layout.push(rect);
        assert_eq!(layout.allocate_rect_id(), RectId(5));
        assert_eq!(layout.allocate_pin_id(), PinId(10));
    }

    #[test]
    fn test_density_and_pin_position() {
        let mut layout = Layout::new(Canvas::new(10.0, 10.0));
        let mut rect = Rectangle::new(RectId(0), Bounds::new(5.0, 5.0, 5.0, 2.0));
        rect.pins.push(Pin::new(PinId(0), RectId(0), (-2.5, 0.5)));
        layout.push(rect);
        assert!((layout.density() - 0.1).abs() < 1e-12);
        let pin = layout.pins().next().copied().expect("pin");
        assert_eq!(layout.pin_position(&pin), Some(Point::new(2.5, 5.5)));
    }
}
