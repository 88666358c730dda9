//! The layered occupancy grid.
//!
//! Every distinct row structure in the design gets its own layer: a 2-D
//! array of [`Pixel`]s, one per (row, site) of that layer. A cell is
//! legalized on its own layer and painted, with y rescaled, onto every other
//! layer so that cells of different heights see each other.
//!
//! All coordinates handled here are relative to the core's lower-left corner.

mod build;
mod pattern;

pub use pattern::{PatternRow, RowPattern};

use crate::cell::Cell;
use crate::data::Orient;
use crate::error::{PlaceError, PlaceResult};
use crate::ids::{CellId, GroupId, SiteId};
use crate::padding::Padding;
use sitewise_common::{div_ceil, div_floor, InternalError, Point, Rect};
use std::collections::HashMap;
use std::fmt;

/// Identifies a grid layer. Keys are dense indices ordered by creation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct LayerKey(u32);

impl LayerKey {
    /// Creates a key from a raw layer index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the key as a layer index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of one grid layer.
#[derive(Clone, Debug)]
pub struct GridInfo {
    /// Key of the layer.
    pub key: LayerKey,
    /// Number of grid rows.
    pub row_count: i32,
    /// Number of sites per row.
    pub site_count: i32,
    /// Vertical offset of a hybrid parent layer from the lowest row.
    pub offset: i32,
    /// Row structure.
    pub pattern: RowPattern,
}

impl GridInfo {
    /// Returns `true` if the layer follows a hybrid row pattern.
    pub fn is_hybrid(&self) -> bool {
        self.pattern.is_hybrid()
    }
}

/// One occupancy slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Pixel {
    /// Cell occupying the slot.
    pub cell: Option<CellId>,
    /// Group whose region covers the slot.
    pub group: Option<GroupId>,
    /// Orientation of the row through this slot.
    pub orient: Orient,
    /// `false` outside rows and on partially covered region edges.
    pub valid: bool,
    /// Too far from any row to seed a search.
    pub hopeless: bool,
    /// Site of the row through this slot.
    pub site: Option<SiteId>,
}

/// A grid location found by a search.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelPt {
    /// Layer of the location.
    pub layer: LayerKey,
    /// Site column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
}

/// Occupancy change of one pixel, recorded so it can be replayed or reverted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelChange {
    /// Layer of the pixel.
    pub layer: LayerKey,
    /// Flat index within the layer.
    pub index: usize,
    /// Occupant before the change.
    pub before: Option<CellId>,
    /// Occupant after the change.
    pub after: Option<CellId>,
}

/// The layered occupancy grid.
#[derive(Clone, Debug)]
pub struct Grid {
    core: Rect,
    site_width: i32,
    row_height: i32,
    row_count: i32,
    row_site_count: i32,
    layers: Vec<GridInfo>,
    pixels: Vec<Vec<Pixel>>,
    site_to_layer: HashMap<SiteId, LayerKey>,
    hybrid_parent: HashMap<SiteId, SiteId>,
    smallest: LayerKey,
    has_hybrid_rows: bool,
    padding: Padding,
}

impl Grid {
    /// Core area in absolute coordinates.
    pub fn core(&self) -> Rect {
        self.core
    }

    /// Smallest site width, used as the horizontal grid step on all layers.
    pub fn site_width(&self) -> i32 {
        self.site_width
    }

    /// Smallest row height.
    pub fn row_height(&self) -> i32 {
        self.row_height
    }

    /// Number of smallest-height rows that fit in the core.
    pub fn row_count(&self) -> i32 {
        self.row_count
    }

    /// Number of sites that fit across the core.
    pub fn row_site_count(&self) -> i32 {
        self.row_site_count
    }

    /// Returns `true` if the rows follow hybrid patterns.
    pub fn has_hybrid_rows(&self) -> bool {
        self.has_hybrid_rows
    }

    /// Key of the reference layer (smallest non-hybrid row height).
    pub fn smallest_layer(&self) -> LayerKey {
        self.smallest
    }

    /// All layers, ordered by key.
    pub fn layers(&self) -> &[GridInfo] {
        &self.layers
    }

    /// Shape of the layer with the given key.
    pub fn info(&self, key: LayerKey) -> &GridInfo {
        &self.layers[key.index()]
    }

    /// Layer that holds cells of `site`.
    pub fn layer_of_site(&self, site: SiteId) -> Option<LayerKey> {
        self.site_to_layer.get(&site).copied()
    }

    /// Hybrid parent site of a hybrid child site.
    pub fn hybrid_parent(&self, site: SiteId) -> Option<SiteId> {
        self.hybrid_parent.get(&site).copied()
    }

    /// Padding applied to movable standard cells.
    pub fn padding(&self) -> &Padding {
        &self.padding
    }

    /// Resolves the layer a cell is legalized on.
    ///
    /// Blocks use the reference layer. Standard cells use the layer of their
    /// site; a site no row uses means the cell is taller than any row.
    pub fn resolve_layer(&self, cell: &Cell) -> PlaceResult<LayerKey> {
        if !cell.is_std_cell() {
            return Ok(self.smallest);
        }
        let site = cell.site.ok_or_else(|| PlaceError::MissingSite {
            instance: cell.name.clone(),
        })?;
        self.layer_of_site(site)
            .ok_or_else(|| PlaceError::CellTallerThanRows {
                instance: cell.name.clone(),
                height: cell.height,
            })
    }

    fn flat(&self, key: LayerKey, x: i32, y: i32) -> Option<usize> {
        let info = self.layers.get(key.index())?;
        if x < 0 || y < 0 || x >= info.site_count || y >= info.row_count {
            return None;
        }
        Some(y as usize * info.site_count as usize + x as usize)
    }

    /// Pixel at `(x, y)` of layer `key`, if inside the layer.
    pub fn pixel(&self, key: LayerKey, x: i32, y: i32) -> Option<&Pixel> {
        let index = self.flat(key, x, y)?;
        Some(&self.pixels[key.index()][index])
    }

    pub(crate) fn pixel_mut(&mut self, key: LayerKey, x: i32, y: i32) -> Option<&mut Pixel> {
        let index = self.flat(key, x, y)?;
        Some(&mut self.pixels[key.index()][index])
    }

    // Coordinate conversions.

    /// Site column containing `x`.
    pub fn grid_x(&self, x: i32) -> i32 {
        div_floor(x, self.site_width)
    }

    /// First site boundary at or right of `x`.
    pub fn grid_end_x(&self, x: i32) -> i32 {
        div_ceil(x, self.site_width)
    }

    /// Row height used to step a cell vertically on its layer.
    pub fn row_height_of(&self, cell: &Cell) -> i32 {
        if cell.is_std_cell() || cell.hybrid {
            cell.height
        } else {
            self.row_height
        }
    }

    /// Height of a cell in rows of its layer.
    pub fn grid_height(&self, cell: &Cell) -> i32 {
        div_ceil(cell.height, self.row_height_of(cell)).max(1)
    }

    /// Width of a cell including padding, in sites.
    pub fn grid_padded_width(&self, cell: &Cell) -> i32 {
        div_ceil(
            self.padding.padded_width(cell, self.site_width),
            self.site_width,
        )
    }

    /// Site column of the padded left edge.
    pub fn grid_padded_x(&self, cell: &Cell) -> i32 {
        self.grid_x(cell.x - self.padding.pad_left(cell) * self.site_width)
    }

    /// Site boundary right of the padded right edge.
    pub fn grid_padded_end_x(&self, cell: &Cell) -> i32 {
        self.grid_end_x(cell.x + cell.width + self.padding.pad_right(cell) * self.site_width)
    }

    /// Grid row containing `y` on the cell's layer.
    pub fn grid_y(&self, y: i32, cell: &Cell) -> i32 {
        if cell.hybrid {
            return self.info(cell.layer).pattern.row_at(y).0;
        }
        div_floor(y, self.row_height_of(cell))
    }

    /// Grid row boundary at or above `y` on the cell's layer.
    pub fn grid_end_y(&self, y: i32, cell: &Cell) -> i32 {
        if cell.hybrid {
            return self.info(cell.layer).pattern.row_at(y).0;
        }
        div_ceil(y, self.row_height_of(cell))
    }

    /// Grid row of the cell's current bottom edge.
    pub fn cell_grid_y(&self, cell: &Cell) -> i32 {
        self.grid_y(cell.y, cell)
    }

    /// Grid row boundary above the cell's current top edge.
    pub fn cell_grid_end_y(&self, cell: &Cell) -> i32 {
        self.grid_end_y(cell.y + cell.height, cell)
    }

    /// Bottom coordinate of row `y` on layer `key`.
    pub fn coordinate_to_height(&self, y: i32, key: LayerKey) -> i32 {
        self.info(key).pattern.row_bottom(y)
    }

    /// Bottom coordinate of grid row `y` on the cell's layer.
    pub fn row_to_y(&self, y: i32, cell: &Cell) -> i32 {
        if cell.hybrid {
            return self.info(cell.layer).pattern.row_bottom(y);
        }
        y * self.row_height_of(cell)
    }

    /// Origin the cell would have at padded grid location `(x, y)`.
    pub fn origin_at(&self, cell: &Cell, x: i32, y: i32) -> Point {
        let mut origin = Point::new(
            (x + self.padding.pad_left(cell)) * self.site_width,
            self.row_to_y(y, cell),
        );
        if cell.hybrid_parent {
            origin.y += self.info(cell.layer).offset;
        }
        origin
    }

    /// Sets the cell origin from a padded grid location.
    pub fn set_grid_padded_loc(&self, cell: &mut Cell, x: i32, y: i32) {
        let origin = self.origin_at(cell, x, y);
        cell.x = origin.x;
        cell.y = origin.y;
    }

    /// Rescales a grid row index from one layer to another.
    ///
    /// `start` rounds down (a footprint's first row); otherwise the result
    /// rounds up (a footprint's exclusive end).
    pub fn map_y(&self, row: i32, from: LayerKey, to: LayerKey, start: bool) -> i32 {
        if from == to {
            return row;
        }
        let src = &self.info(from).pattern;
        let dst = &self.info(to).pattern;
        let height = if src.is_hybrid() {
            src.row_bottom(row)
        } else {
            row * src.total_height()
        };
        if dst.is_hybrid() {
            return if start {
                dst.row_at(height).0
            } else {
                dst.row_end_at(height).0
            };
        }
        let step = dst.total_height();
        if start {
            div_floor(height, step)
        } else {
            div_ceil(height, step)
        }
    }

    /// Returns `true` if the cell fits inside the rows at some position.
    pub fn cell_fits_in_core(&self, cell: &Cell) -> bool {
        self.grid_padded_width(cell) <= self.row_site_count
            && self.grid_height(cell) <= self.row_count
    }

    /// Rows `[start, end)` a footprint covers on `to` when it covers
    /// `[y, y_end)` on `from`.
    pub(crate) fn mapped_rows(&self, y: i32, y_end: i32, from: LayerKey, to: LayerKey) -> (i32, i32) {
        let start = self.map_y(y, from, to, true);
        let mut end = self.map_y(y_end, from, to, false);
        if end == start {
            end += 1;
        }
        (start, end.min(self.info(to).row_count))
    }

    /// Returns `true` if painting `cell` at `(x, y)` would not clash on any
    /// other layer with a cell native to that layer.
    pub fn other_layers_free(&self, cells: &[Cell], cell: &Cell, x: i32, y: i32) -> bool {
        let key = cell.layer;
        let x_end = x + self.grid_padded_width(cell);
        let y_end = y + self.grid_height(cell);
        for info in &self.layers {
            if info.key == key {
                continue;
            }
            let (ly, ly_end) = self.mapped_rows(y, y_end, key, info.key);
            for gx in x..x_end {
                for gy in ly..ly_end {
                    if let Some(occupant) = self.pixel(info.key, gx, gy).and_then(|p| p.cell) {
                        if occupant != cell.id && cells[occupant.index()].layer == info.key {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Paints a cell at padded grid location `(x, y)` of its layer and moves
    /// the cell there.
    ///
    /// Pixels on other layers already held by a shorter cell are left alone.
    /// Returns the pixel changes, for the journal.
    pub fn paint_pixel(
        &mut self,
        cells: &mut [Cell],
        id: CellId,
        x: i32,
        y: i32,
    ) -> PlaceResult<Vec<PixelChange>> {
        let cell = &cells[id.index()];
        if cell.placed {
            return Err(InternalError::new(format!("{} is already painted", cell.name)).into());
        }
        let key = cell.layer;
        let x_end = x + self.grid_padded_width(cell);
        let y_end = y + self.grid_height(cell);
        let mut changes = Vec::new();

        let result = self.paint_layers(cells, id, key, (x, y, x_end, y_end), &mut changes);
        if let Err(err) = result {
            self.apply_changes(&changes, false);
            return Err(err);
        }

        let orient = self.pixel(key, x, y).map(|p| p.orient).unwrap_or_default();
        let cell = &mut cells[id.index()];
        self.set_grid_padded_loc(cell, x, y);
        cell.placed = true;
        cell.orient = orient;
        Ok(changes)
    }

    fn paint_layers(
        &mut self,
        cells: &[Cell],
        id: CellId,
        key: LayerKey,
        (x, y, x_end, y_end): (i32, i32, i32, i32),
        changes: &mut Vec<PixelChange>,
    ) -> PlaceResult<()> {
        let name = &cells[id.index()].name;
        for gx in x..x_end {
            for gy in y..y_end {
                let index = self.flat(key, gx, gy).ok_or_else(|| {
                    InternalError::new(format!("{name} painted outside layer {key}"))
                })?;
                let pixel = &mut self.pixels[key.index()][index];
                if !pixel.valid {
                    return Err(InternalError::new(format!(
                        "{name} painted on invalid site ({gx}, {gy}) of layer {key}"
                    ))
                    .into());
                }
                if let Some(other) = pixel.cell {
                    return Err(PlaceError::PaintOccupied {
                        instance: name.clone(),
                        other: cells[other.index()].name.clone(),
                    });
                }
                pixel.cell = Some(id);
                changes.push(PixelChange {
                    layer: key,
                    index,
                    before: None,
                    after: Some(id),
                });
            }
        }

        for layer in 0..self.layers.len() {
            let target = self.layers[layer].key;
            if target == key {
                continue;
            }
            let (ly, ly_end) = self.mapped_rows(y, y_end, key, target);
            for gx in x..x_end {
                for gy in ly..ly_end {
                    let Some(index) = self.flat(target, gx, gy) else {
                        continue;
                    };
                    let pixel = &mut self.pixels[target.index()][index];
                    if let Some(other) = pixel.cell {
                        if cells[other.index()].layer == target {
                            return Err(PlaceError::LayerOccupied {
                                instance: name.clone(),
                                other: cells[other.index()].name.clone(),
                                layer: target.index(),
                            });
                        }
                        continue;
                    }
                    pixel.cell = Some(id);
                    changes.push(PixelChange {
                        layer: target,
                        index,
                        before: None,
                        after: Some(id),
                    });
                }
            }
        }
        Ok(())
    }

    /// Removes a movable cell from the grid.
    ///
    /// Only pixels owned by the cell are cleared. Fixed or unplaced cells are
    /// left untouched and yield no changes.
    pub fn erase_pixel(&mut self, cells: &mut [Cell], id: CellId) -> Vec<PixelChange> {
        let cell = &cells[id.index()];
        let mut changes = Vec::new();
        if cell.fixed || !cell.placed {
            return changes;
        }
        let key = cell.layer;
        let x = self.grid_padded_x(cell);
        let x_end = self.grid_padded_end_x(cell);
        let y = self.cell_grid_y(cell);
        let y_end = self.cell_grid_end_y(cell);
        for layer in 0..self.layers.len() {
            let target = self.layers[layer].key;
            let (ly, ly_end) = if target == key {
                (y, y_end.max(y + 1))
            } else {
                self.mapped_rows(y, y_end, key, target)
            };
            for gx in x..x_end {
                for gy in ly..ly_end {
                    let Some(index) = self.flat(target, gx, gy) else {
                        continue;
                    };
                    let pixel = &mut self.pixels[target.index()][index];
                    if pixel.cell == Some(id) {
                        pixel.cell = None;
                        changes.push(PixelChange {
                            layer: target,
                            index,
                            before: Some(id),
                            after: None,
                        });
                    }
                }
            }
        }
        let cell = &mut cells[id.index()];
        cell.placed = false;
        cell.hold = false;
        changes
    }

    /// Replays (`forward`) or reverts a list of pixel changes.
    pub fn apply_changes(&mut self, changes: &[PixelChange], forward: bool) {
        if forward {
            for c in changes {
                self.pixels[c.layer.index()][c.index].cell = c.after;
            }
        } else {
            for c in changes.iter().rev() {
                self.pixels[c.layer.index()][c.index].cell = c.before;
            }
        }
    }

    /// Cells occupying each pixel of a layer, in row-major order.
    pub fn occupancy(&self, key: LayerKey) -> Vec<Option<CellId>> {
        self.pixels[key.index()].iter().map(|p| p.cell).collect()
    }
}
