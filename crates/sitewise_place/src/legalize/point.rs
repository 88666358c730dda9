//! Legal starting points: core clamping, site/row snapping, and moving off
//! macros and hopeless pixels.

use crate::cell::Cell;
use crate::data::Design;
use crate::ids::CellId;
use crate::placer::Placer;
use sitewise_common::{div_ceil, div_floor, div_round, Point, Rect};

impl Placer {
    /// Snaps `pt` to a legal origin for `cell`: inside the core, on a site
    /// column and on a row boundary of the cell's layer.
    pub fn legal_pt(&self, cell: &Cell, pt: Point) -> Point {
        self.legal_pt_with(cell, pt, self.grid.row_height_of(cell))
    }

    fn legal_pt_with(&self, cell: &Cell, pt: Point, row_height: i32) -> Point {
        let grid = &self.grid;
        let info = grid.info(cell.layer);
        let site_width = grid.site_width();
        let core_x = pt.x.max(0).min(info.site_count * site_width - cell.width);
        let legal_x = div_round(core_x, site_width) * site_width;

        let legal_y = if cell.hybrid {
            let last = if cell.hybrid_parent {
                info.row_count * row_height - cell.height
            } else {
                info.pattern.row_bottom(info.row_count - 1)
            };
            info.pattern.row_at(pt.y.max(0).min(last)).1
        } else {
            let core_y = pt.y.max(0).min(info.row_count * row_height - cell.height);
            div_round(core_y, row_height) * row_height
        };
        Point::new(legal_x, legal_y)
    }

    /// [`legal_pt`](Self::legal_pt) converted to grid units.
    pub fn legal_grid_pt(&self, cell: &Cell, pt: Point) -> Point {
        let legal = self.legal_pt(cell, pt);
        Point::new(self.grid.grid_x(legal.x), self.grid.grid_y(legal.y, cell))
    }

    /// Legal starting point derived from the cell's initial location.
    ///
    /// Besides snapping, a start on a hopeless pixel moves to the nearest
    /// valid pixel in a straight line, and a start still overlapping a block
    /// moves to the block's nearest edge.
    pub(crate) fn initial_legal_pt(&self, cell: &Cell, padded: bool) -> Point {
        debug_assert!(!cell.fixed, "legal point requested for fixed cell {}", cell.name);
        let grid = &self.grid;
        let key = cell.layer;
        let info = grid.info(key);
        let init = self.initial_location(cell, padded);
        let row_height = grid.row_height_of(cell);
        let mut legal = self.legal_pt_with(cell, init, row_height);

        let grid_x = grid.grid_x(legal.x);
        let grid_y = info.pattern.row_at(legal.y + info.offset).0;
        let Some(mut pixel) = grid.pixel(key, grid_x, grid_y).copied() else {
            return legal;
        };

        if pixel.hopeless {
            if let Some((x, y)) = self.move_hopeless(cell, grid_x, grid_y) {
                legal = Point::new(x * grid.site_width(), grid.row_to_y(y, cell));
                if let Some(moved) = grid.pixel(key, x, y) {
                    pixel = *moved;
                }
            }
        }

        let block = pixel
            .cell
            .map(|id| &self.cells[id.index()])
            .filter(|c| c.is_block());
        if let Some(block) = block {
            let bbox = block.bbox();
            if legal.x + cell.width >= bbox.x_min
                && legal.x <= bbox.x_max
                && legal.y + cell.height >= bbox.y_min
                && legal.y <= bbox.y_max
            {
                legal = self.nearest_block_edge(cell, legal, bbox);
            }
        }
        legal
    }

    /// [`initial_legal_pt`](Self::initial_legal_pt) in grid units.
    pub(crate) fn initial_legal_grid_pt(&self, cell: &Cell, padded: bool) -> Point {
        let pt = self.initial_legal_pt(cell, padded);
        Point::new(self.grid.grid_x(pt.x), self.grid.grid_y(pt.y, cell))
    }

    /// Nearest valid pixel straight left, right, below or above
    /// `(grid_x, grid_y)`. The pixel only has to be valid, not free.
    fn move_hopeless(&self, cell: &Cell, grid_x: i32, grid_y: i32) -> Option<(i32, i32)> {
        let grid = &self.grid;
        let key = cell.layer;
        let info = grid.info(key);
        let site_width = grid.site_width();
        let valid = |x: i32, y: i32| grid.pixel(key, x, y).is_some_and(|p| p.valid);

        let mut best: Option<((i32, i32), i32)> = None;
        let mut offer = |pt: (i32, i32), dist: i32| {
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((pt, dist));
            }
        };

        if let Some(x) = (0..grid_x).rev().find(|&x| valid(x, grid_y)) {
            offer((x, grid_y), (grid_x - x - 1) * site_width);
        }
        if let Some(x) = (grid_x + 1..info.site_count).find(|&x| valid(x, grid_y)) {
            offer((x, grid_y), (x - grid_x) * site_width - cell.width);
        }
        if let Some(y) = (0..grid_y).rev().find(|&y| valid(grid_x, y)) {
            let dist = grid.row_to_y(grid_y, cell) - grid.row_to_y(y + 1, cell);
            offer((grid_x, y), dist);
        }
        if let Some(y) = (grid_y + 1..info.row_count).find(|&y| valid(grid_x, y)) {
            let dist = grid.row_to_y(y, cell) - grid.row_to_y(grid_y, cell) - cell.height;
            offer((grid_x, y), dist);
        }
        best.map(|(pt, _)| pt)
    }

    /// Moves `legal` to whichever side of `block` is closest.
    fn nearest_block_edge(&self, cell: &Cell, legal: Point, block: Rect) -> Point {
        let row_height = self.grid.row_height_of(cell);
        let x_min_dist = (legal.x - block.x_min).abs();
        let x_max_dist = (block.x_max - (legal.x + cell.width)).abs();
        let y_min_dist = (legal.y - block.y_min).abs();
        let y_max_dist = (block.y_max - (legal.y + cell.height)).abs();

        let target = if x_min_dist < x_max_dist && x_min_dist < y_min_dist && x_min_dist < y_max_dist
        {
            Point::new(block.x_min - cell.width, legal.y)
        } else if x_max_dist <= x_min_dist && x_max_dist <= y_min_dist && x_max_dist <= y_max_dist
        {
            Point::new(block.x_max, legal.y)
        } else if y_min_dist <= x_min_dist && y_min_dist <= x_max_dist && y_min_dist <= y_max_dist
        {
            let below = div_floor(block.y_min, row_height) * row_height - cell.height;
            Point::new(legal.x, below)
        } else {
            Point::new(legal.x, div_ceil(block.y_max, row_height) * row_height)
        };
        self.legal_pt_with(cell, target, row_height)
    }

    /// The initial location, moved to the nearest block edge if any corner
    /// of the cell lands on a block.
    pub(crate) fn point_off_macro(&self, cell: &Cell) -> Point {
        let grid = &self.grid;
        let init = self.initial_location(cell, false);
        let xs = [grid.grid_x(init.x), grid.grid_x(init.x + cell.width)];
        let ys = [
            grid.grid_y(init.y, cell),
            grid.grid_y(init.y + cell.height, cell),
        ];
        let mut block = None;
        for y in ys {
            for x in xs {
                let occupant = grid
                    .pixel(cell.layer, x, y)
                    .and_then(|p| p.cell)
                    .map(|id| &self.cells[id.index()])
                    .filter(|c| c.is_block());
                if occupant.is_some() {
                    block = occupant;
                }
            }
        }
        match block {
            Some(block) => self.nearest_block_edge(cell, init, block.bbox()),
            None => init,
        }
    }

    /// Legalizes the design location of one instance without painting it:
    /// off macros, inside the core, and site/row aligned.
    ///
    /// Returns `true` if the instance was moved.
    pub fn legal_cell_pos(&self, design: &mut Design, id: CellId) -> bool {
        let inst = design.instance(id);
        let site = inst.site.map(|s| design.site(s));
        let mut cell = Cell::from_instance(id, inst, site, design.core);
        cell.layer = self.cells[id.index()].layer;

        let off_macro = self.point_off_macro(&cell);
        let new_pos = self.legal_pt(&cell, off_macro);
        if new_pos == cell.init {
            return false;
        }
        let grid = &self.grid;
        let grid_x = grid.grid_x(new_pos.x);
        let grid_y = grid.grid_y(new_pos.y, &cell);
        let core = design.core.ll();
        design.instance_mut(id).location = Point::new(
            core.x + grid_x * grid.site_width(),
            core.y + grid.row_to_y(grid_y, &cell),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::data::{Design, Instance, Site};
    use crate::ids::CellId;
    use crate::placer::Placer;
    use sitewise_common::{Point, Rect};
    use sitewise_config::SitewiseConfig;

    fn design() -> Design {
        let mut d = Design::new(Rect::new(0, 0, 1000, 1000));
        let site = d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(site, 10);
        d.add_instance(Instance::std_cell("a", site, 20, 100, Point::new(510, 520)));
        d.add_instance(Instance::fixed_block("m", 100, 200, Point::new(500, 500)));
        d
    }

    #[test]
    fn legal_pt_clamps_and_rounds() {
        let placer = Placer::new(&design(), &SitewiseConfig::default()).unwrap();
        let cell = placer.cell(CellId::from_raw(0));
        assert_eq!(placer.legal_pt(cell, Point::new(-5, 1234)), Point::new(0, 900));
        assert_eq!(placer.legal_pt(cell, Point::new(996, 149)), Point::new(980, 100));
        assert_eq!(placer.legal_grid_pt(cell, Point::new(996, 149)), Point::new(98, 1));
    }

    #[test]
    fn start_on_block_moves_to_nearest_edge() {
        let placer = Placer::new(&design(), &SitewiseConfig::default()).unwrap();
        let cell = placer.cell(CellId::from_raw(0));
        assert_eq!(placer.initial_legal_pt(cell, false), Point::new(520, 400));
    }

    #[test]
    fn hopeless_start_moves_to_valid_pixel() {
        let mut d = Design::new(Rect::new(0, 0, 2000, 1000));
        let site = d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(site, 10);
        for row in &mut d.rows {
            row.site_count = 50;
        }
        d.add_instance(Instance::std_cell("a", site, 20, 100, Point::new(1500, 200)));
        let mut cfg = SitewiseConfig::default();
        cfg.legalizer.max_displacement_x = 25;
        let placer = Placer::new(&d, &cfg).unwrap();
        let cell = placer.cell(CellId::from_raw(0));
        let key = placer.grid().smallest_layer();
        assert!(placer.grid().pixel(key, 150, 2).is_some_and(|p| p.hopeless));
        assert!(!placer.grid().pixel(key, 40, 2).is_some_and(|p| p.hopeless));
        assert_eq!(placer.initial_legal_pt(cell, false), Point::new(490, 200));
    }

    #[test]
    fn legal_cell_pos_moves_off_macro() {
        let mut d = design();
        let placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        assert!(placer.legal_cell_pos(&mut d, CellId::from_raw(0)));
        assert_eq!(d.instances[0].location, Point::new(480, 500));
    }

    #[test]
    fn legal_cell_pos_keeps_aligned_instance() {
        let mut d = design();
        d.instances[0].location = Point::new(100, 200);
        let placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        assert!(!placer.legal_cell_pos(&mut d, CellId::from_raw(0)));
        assert_eq!(d.instances[0].location, Point::new(100, 200));
    }
}
