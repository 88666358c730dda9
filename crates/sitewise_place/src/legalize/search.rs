//! Diamond search over scan bands.

use super::SearchWindow;
use crate::cell::Cell;
use crate::grid::{LayerKey, PixelPt};
use crate::placer::Placer;
use sitewise_common::{div_ceil, div_floor, Point, Rect};

impl Placer {
    /// Finds the closest free footprint for `cell` around padded grid
    /// location `(x, y)`.
    ///
    /// The start itself is tried first, then rings of increasing radius.
    /// The best candidate of the first ring that yields any is returned,
    /// even if a later ring holds a closer one. Candidates never lie further
    /// than the displacement caps from `(x, y)`.
    pub fn diamond_search(&self, cell: &Cell, x: i32, y: i32) -> Option<PixelPt> {
        let grid = &self.grid;
        let legalizer = &self.config.legalizer;
        let max_dx = legalizer.max_displacement_x;
        let scaled_dy = grid.map_y(
            legalizer.max_displacement_y,
            grid.smallest_layer(),
            cell.layer,
            true,
        );

        let mut lo = Point::new(x - max_dx, y - scaled_dy);
        let mut hi = Point::new(x + max_dx, y + scaled_dy);
        if let Some(group) = cell.group.and_then(|g| self.groups.get(g.index())) {
            let site_width = grid.site_width();
            let row_height = grid.row_height_of(cell);
            let b = group.boundary;
            let bounds = Rect::new(
                div_ceil(b.x_min, site_width),
                div_ceil(b.y_min, row_height),
                div_floor(b.x_max, site_width),
                div_floor(b.y_max, row_height),
            );
            lo = bounds.closest_pt_inside(lo);
            hi = bounds.closest_pt_inside(hi);
        }
        let info = grid.info(cell.layer);
        let window = SearchWindow {
            x_min: lo.x.max(0),
            x_max: hi.x.min(info.site_count),
            y_min: lo.y.max(0),
            y_max: hi.y.min(info.row_count),
        };

        if let Some(pt) = self.bin_search(x, cell, x, y, &window) {
            return Some(pt);
        }

        let origin = Point::new(x, y);
        for i in 1..scaled_dy.max(max_dx) {
            let mut best = None;
            // Left half of the ring.
            for j in 1..i * 2 {
                let x_off = -((j + 1) / 2);
                let y_off = (i * 2 - j) / 2;
                if x_off.abs() < max_dx && y_off.abs() < scaled_dy {
                    let y_off = if j % 2 == 1 { -y_off } else { y_off };
                    self.diamond_search_side(cell, origin, &window, (x_off, y_off), &mut best);
                }
            }
            // Right half.
            for j in 1..(i + 1) * 2 {
                let x_off = (j - 1) / 2;
                let y_off = ((i + 1) * 2 - j) / 2;
                if x_off.abs() < max_dx && y_off.abs() < scaled_dy {
                    let y_off = if j % 2 == 1 { -y_off } else { y_off };
                    self.diamond_search_side(cell, origin, &window, (x_off, y_off), &mut best);
                }
            }
            if let Some((pt, _)) = best {
                return Some(pt);
            }
        }
        None
    }

    fn diamond_search_side(
        &self,
        cell: &Cell,
        origin: Point,
        window: &SearchWindow,
        (x_off, y_off): (i32, i32),
        best: &mut Option<(PixelPt, i64)>,
    ) {
        let grid = &self.grid;
        let bin_width = self.config.legalizer.bin_search_width;
        let bin_x = (origin.x + x_off * bin_width)
            .max(window.x_min)
            .min(window.x_max);
        let bin_y = (origin.y + y_off).max(window.y_min).min(window.y_max);

        let Some(pt) = self.bin_search(origin.x, cell, bin_x, bin_y, window) else {
            return;
        };
        let y_dist = if cell.hybrid && !cell.hybrid_parent {
            let from = grid.coordinate_to_height(origin.y, cell.layer);
            let to = grid.coordinate_to_height(pt.y, cell.layer);
            (from - to).abs() as i64
        } else {
            (origin.y - pt.y).abs() as i64 * grid.row_height_of(cell) as i64
        };
        let dist = (origin.x - pt.x).abs() as i64 * grid.site_width() as i64 + y_dist;
        if best.map_or(true, |(_, d)| dist < d) {
            *best = Some((pt, dist));
        }
    }

    /// Probes one scan band of `bin_search_width` columns starting at
    /// `bin_x` on row `bin_y`, walking toward `x`.
    pub(crate) fn bin_search(
        &self,
        x: i32,
        cell: &Cell,
        bin_x: i32,
        bin_y: i32,
        window: &SearchWindow,
    ) -> Option<PixelPt> {
        let grid = &self.grid;
        let info = grid.info(cell.layer);
        let x_end = bin_x + grid.grid_padded_width(cell);
        if bin_y >= info.row_count {
            return None;
        }
        let y_end = bin_y + grid.grid_height(cell);
        if let Some(observer) = self.observer() {
            observer.bin_search(cell, bin_x, bin_y, x_end, y_end);
        }
        if y_end > info.row_count {
            return None;
        }

        let probe = |i: i32| {
            let col = bin_x + i;
            if !window.contains_x(col) {
                return None;
            }
            if let Some(region) = cell.region {
                let corner = Point::new(col * grid.site_width(), grid.row_to_y(bin_y, cell));
                if !region.intersects_point(corner) {
                    return None;
                }
            }
            self.check_pixels(cell, col, bin_y, x_end + i, y_end)
                .then_some(PixelPt {
                    layer: cell.layer,
                    x: col,
                    y: bin_y,
                })
        };
        let width = self.config.legalizer.bin_search_width;
        if x > bin_x {
            (0..width).rev().find_map(probe)
        } else {
            (0..width).find_map(probe)
        }
    }

    /// Returns `true` if `cell` may occupy `[x, x_end) x [y, y_end)` of its
    /// layer: inside the layer, region compatible, every pixel free and
    /// valid with matching group and site, no one-site gaps when those are
    /// disallowed, and no clash with cells native to other layers.
    pub(crate) fn check_pixels(&self, cell: &Cell, x: i32, y: i32, x_end: i32, y_end: i32) -> bool {
        let grid = &self.grid;
        let key = cell.layer;
        if x < 0 || y < 0 || x_end > grid.info(key).site_count {
            return false;
        }
        if !self.check_region_overlap(cell, x, y, x_end, y_end) {
            return false;
        }
        for y1 in y..y_end {
            for x1 in x..x_end {
                let Some(pixel) = grid.pixel(key, x1, y1) else {
                    return false;
                };
                let group_ok = match cell.group {
                    Some(group) => pixel.group == Some(group),
                    None => pixel.group.is_none(),
                };
                let site_ok = pixel.site.is_none() || pixel.site == cell.site;
                if pixel.cell.is_some() || !pixel.valid || !group_ok || !site_ok {
                    return false;
                }
            }
        }
        if self.config.legalizer.disallow_one_site_gaps
            && self.leaves_one_site_gap(cell, x, y, x_end, y_end)
        {
            return false;
        }
        grid.other_layers_free(&self.cells, cell, x, y)
    }

    /// A cell assigned to a region must be covered by exactly one region
    /// rectangle; any other cell must stay clear of all regions.
    fn check_region_overlap(&self, cell: &Cell, x: i32, y: i32, x_end: i32, y_end: i32) -> bool {
        if self.regions.is_empty() && cell.region.is_none() {
            return true;
        }
        let grid = &self.grid;
        let smallest = grid.smallest_layer();
        let bottom = grid.map_y(y, cell.layer, smallest, true);
        let top = grid.map_y(y_end, cell.layer, smallest, false);
        let area = Rect::new(
            x * grid.site_width(),
            grid.coordinate_to_height(bottom, smallest),
            x_end * grid.site_width(),
            grid.coordinate_to_height(top, smallest),
        );
        self.regions.footprint_allowed(&area, cell.region.is_some())
    }

    /// Returns `true` if the footprint would leave exactly one empty site
    /// between itself and a neighbor on any row it covers.
    fn leaves_one_site_gap(&self, cell: &Cell, x: i32, y: i32, x_end: i32, y_end: i32) -> bool {
        let grid = &self.grid;
        let other = |key: LayerKey, col: i32, row: i32| {
            grid.pixel(key, col, row)
                .map(|p| p.cell.is_some_and(|c| c != cell.id))
        };
        let gap_in_row = |key: LayerKey, row: i32| {
            let abutted = |col| other(key, col, row).unwrap_or(true);
            let occupied = |col| other(key, col, row).unwrap_or(false);
            (!abutted(x - 1) && occupied(x - 2)) || (!abutted(x_end) && occupied(x_end + 1))
        };

        if (y..y_end).any(|row| gap_in_row(cell.layer, row)) {
            return true;
        }
        let smallest = grid.smallest_layer();
        if smallest == cell.layer {
            return false;
        }
        let start = grid.map_y(y, cell.layer, smallest, true);
        let end = grid.map_y(y_end, cell.layer, smallest, false).max(start + 1);
        (start..end).any(|row| gap_in_row(smallest, row))
    }
}
