//! Placer working state for cells and groups.
//!
//! Cells are created once per design instance on import and never destroyed
//! during a run. Positions are core-relative and change only through grid
//! paint/erase or journal undo/redo.

use crate::data::{Instance, InstanceKind, Orient, Site};
use crate::grid::LayerKey;
use crate::ids::{CellId, GroupId, SiteId};
use sitewise_common::{Point, Rect};

/// A placeable entity.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Cell ID (same index as the design instance).
    pub id: CellId,
    /// Instance name.
    pub name: String,
    /// Width in database units.
    pub width: i32,
    /// Height in database units.
    pub height: i32,
    /// Current core-relative x of the lower-left corner.
    pub x: i32,
    /// Current core-relative y of the lower-left corner.
    pub y: i32,
    /// Core-relative location at import; displacement is measured from here.
    pub init: Point,
    /// Current orientation.
    pub orient: Orient,
    /// Master kind.
    pub kind: InstanceKind,
    /// Fixed cells never move.
    pub fixed: bool,
    /// Whether the cell is currently painted on the grid.
    pub placed: bool,
    /// Held cells are exempt from further refinement and swapping.
    pub hold: bool,
    /// Site of the master.
    pub site: Option<SiteId>,
    /// Owning group.
    pub group: Option<GroupId>,
    /// Assigned region rectangle, core-relative.
    pub region: Option<Rect>,
    /// The cell's site belongs to a hybrid row pattern.
    pub hybrid: bool,
    /// The cell's site is a hybrid parent (defines a row pattern).
    pub hybrid_parent: bool,
    /// Layer the cell is legalized on. Resolved once the grid exists.
    pub layer: LayerKey,
    /// Per-instance `(left, right)` padding override in sites.
    pub pad_override: Option<(i32, i32)>,
}

impl Cell {
    /// Creates the working copy of a design instance.
    ///
    /// The location is converted to core-relative coordinates and recorded as
    /// the initial location. Fixed instances start out placed.
    pub fn from_instance(id: CellId, inst: &Instance, site: Option<&Site>, core: Rect) -> Self {
        let x = inst.location.x - core.x_min;
        let y = inst.location.y - core.y_min;
        Self {
            id,
            name: inst.name.clone(),
            width: inst.width,
            height: inst.height,
            x,
            y,
            init: Point::new(x, y),
            orient: inst.orient,
            kind: inst.kind,
            fixed: inst.fixed,
            placed: inst.fixed,
            hold: false,
            site: inst.site,
            group: inst.group,
            region: None,
            hybrid: site.is_some_and(|s| s.hybrid),
            hybrid_parent: site.is_some_and(|s| s.has_row_pattern()),
            layer: LayerKey::default(),
            pad_override: inst.padding,
        }
    }

    /// Area of the cell.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Returns `true` for row-based standard cells.
    pub fn is_std_cell(&self) -> bool {
        self.kind == InstanceKind::StdCell
    }

    /// Returns `true` for blocks (macros).
    pub fn is_block(&self) -> bool {
        self.kind == InstanceKind::Block
    }

    /// Returns `true` if the cell belongs to a group.
    pub fn in_group(&self) -> bool {
        self.group.is_some()
    }

    /// Current lower-left corner.
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bounding box at the current location.
    pub fn bbox(&self) -> Rect {
        Rect::from_origin(self.location(), self.width, self.height)
    }

    /// Manhattan distance between the current and the initial location.
    pub fn displacement(&self) -> i64 {
        self.location().manhattan(self.init)
    }

    /// Snapshot of the mutable placement state.
    pub fn state(&self) -> CellState {
        CellState {
            x: self.x,
            y: self.y,
            orient: self.orient,
            placed: self.placed,
            hold: self.hold,
        }
    }

    /// Restores a snapshot taken with [`state`](Self::state).
    pub fn restore(&mut self, state: CellState) {
        self.x = state.x;
        self.y = state.y;
        self.orient = state.orient;
        self.placed = state.placed;
        self.hold = state.hold;
    }
}

/// The part of a [`Cell`] that paint and erase modify.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellState {
    /// Lower-left x.
    pub x: i32,
    /// Lower-left y.
    pub y: i32,
    /// Orientation.
    pub orient: Orient,
    /// Painted flag.
    pub placed: bool,
    /// Hold flag.
    pub hold: bool,
}

/// A placement group with its regions and member cells.
#[derive(Clone, Debug)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,
    /// Group name.
    pub name: String,
    /// Region rectangles, core-relative.
    pub regions: Vec<Rect>,
    /// Bounding box of all regions.
    pub boundary: Rect,
    /// Member cells.
    pub cells: Vec<CellId>,
    /// Member cell area divided by the valid area inside the group.
    pub util: f64,
}

impl Group {
    /// Creates a group, computing its boundary from the regions.
    pub fn new(id: GroupId, name: impl Into<String>, regions: Vec<Rect>) -> Self {
        let mut boundary = regions.first().copied().unwrap_or_default();
        for r in &regions {
            boundary.merge(r);
        }
        Self {
            id,
            name: name.into(),
            regions,
            boundary,
            cells: Vec::new(),
            util: 0.0,
        }
    }
}
