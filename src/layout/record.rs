//! Serializable output tree of a finished layout
//!
//! The record is a flat, engine-independent view: rectangles with their
//! constraint memberships rendered as strings, pins with parent ids and
//! relative offsets, and the netlist and constraint lists as plain id tuples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{AlignMode, ConstraintSlots, Layout, PinId, RectId, Rectangle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub rectangles: Vec<RectangleRecord>,
    pub pins: Vec<PinRecord>,
    pub netlist_edges: Vec<(PinId, PinId)>,
    pub alignment_constraints: Vec<(RectId, RectId, AlignMode)>,
    pub hierarchical_group_constraints: Vec<Vec<RectId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleRecord {
    pub id: RectId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub growth_prob: f64,
    pub fixed: bool,
    pub category: Option<String>,
    /// `symmetry_id` / `alignment_id` / `grouping_id` to the group's display id
    pub constraints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: PinId,
    pub parent_rect_id: RectId,
    pub rel_pos: (f64, f64),
}

impl LayoutRecord {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Layout> for LayoutRecord {
    fn from(layout: &Layout) -> Self {
        Self {
            canvas_width: layout.canvas.width,
            canvas_height: layout.canvas.height,
            rectangles: layout.rectangles.iter().map(RectangleRecord::from).collect(),
            pins: layout
                .pins()
                .map(|pin| PinRecord {
                    id: pin.id,
                    parent_rect_id: pin.parent,
                    rel_pos: pin.offset(),
                })
                .collect(),
            netlist_edges: layout.edges.clone(),
            alignment_constraints: layout
                .alignment_constraints
                .iter()
                .map(|c| (c.source, c.target, c.mode))
                .collect(),
            hierarchical_group_constraints: layout
                .hierarchical_groups
                .iter()
                .map(|g| g.members.clone())
                .collect(),
        }
    }
}

impl From<&Rectangle> for RectangleRecord {
    fn from(rect: &Rectangle) -> Self {
        Self {
            id: rect.id,
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            growth_prob: rect.growth_prob,
            fixed: rect.fixed,
            category: rect.category.clone(),
            constraints: constraint_map(&rect.constraints),
        }
    }
}

fn constraint_map(slots: &ConstraintSlots) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(id) = slots.symmetry {
        map.insert("symmetry_id".to_string(), id.to_string());
    }
    if let Some(id) = slots.alignment {
        map.insert("alignment_id".to_string(), id.to_string());
    }
    if let Some(id) = slots.hierarchical {
        map.insert("grouping_id".to_string(), id.to_string());
    }
    map
}
