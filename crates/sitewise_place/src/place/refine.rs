//! Displacement-driven refinement inside groups.

use crate::error::PlaceResult;
use crate::grid::PixelPt;
use crate::ids::CellId;
use crate::placer::Placer;
use rand::Rng;

impl Placer {
    /// Tries to move the most displaced fraction of a group's cells closer
    /// to where they started. Returns the number of cells moved.
    pub(crate) fn group_refine(&mut self, group: usize) -> PlaceResult<usize> {
        let mut members = self.groups[group].cells.clone();
        members.sort_by(|&a, &b| self.disp(self.cell(b)).cmp(&self.disp(self.cell(a))));
        let count = (members.len() as f64 * self.config.groups.refine_percent).ceil() as usize;

        let mut moved = 0;
        for &id in members.iter().take(count) {
            if !self.cell(id).hold && self.refine_move(id)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Re-runs the site search from the cell's starting point and moves the
    /// cell there if that reduces its displacement.
    pub(crate) fn refine_move(&mut self, id: CellId) -> PlaceResult<bool> {
        let cell = self.cell(id);
        if !cell.placed {
            return Ok(false);
        }
        let start = self.initial_legal_grid_pt(cell, true);
        let Some(pt) = self.diamond_search(cell, start.x, start.y) else {
            return Ok(false);
        };

        let grid = &self.grid;
        let scaled_dy = grid.map_y(
            self.config.legalizer.max_displacement_y,
            grid.smallest_layer(),
            cell.layer,
            true,
        );
        if (start.x - pt.x).abs() > self.config.legalizer.max_displacement_x
            || (start.y - pt.y).abs() > scaled_dy
        {
            return Ok(false);
        }
        let origin = grid.origin_at(cell, pt.x, pt.y);
        if self.dist_change(cell, origin.x, origin.y) >= 0 {
            return Ok(false);
        }
        self.erase(id);
        self.paint(id, pt)?;
        Ok(true)
    }

    /// Random pairwise swapping among a group's members. Returns the number
    /// of swaps made.
    pub(crate) fn random_swap(&mut self, group: usize) -> PlaceResult<usize> {
        let members = self.groups[group].cells.clone();
        if members.is_empty() {
            return Ok(0);
        }
        let attempts = self.config.groups.swaps_per_cell as usize * members.len();
        let mut swapped = 0;
        for _ in 0..attempts {
            let a = members[self.rng.gen_range(0..members.len())];
            let b = members[self.rng.gen_range(0..members.len())];
            if self.swap_cells(a, b)? {
                swapped += 1;
            }
        }
        Ok(swapped)
    }

    /// Exchanges two placed cells of identical size if that lowers their
    /// combined displacement.
    ///
    /// Returns `false` without touching the grid when the cells are the
    /// same, held, fixed, unplaced, differently shaped, or when the swap
    /// would not help.
    pub fn swap_cells(&mut self, a: CellId, b: CellId) -> PlaceResult<bool> {
        if a == b {
            return Ok(false);
        }
        let grid = &self.grid;
        let (first, second) = (self.cell(a), self.cell(b));
        let swappable = !first.hold
            && !second.hold
            && !first.fixed
            && !second.fixed
            && first.placed
            && second.placed
            && first.width == second.width
            && first.height == second.height
            && first.layer == second.layer
            && grid.grid_padded_width(first) == grid.grid_padded_width(second);
        if !swappable {
            return Ok(false);
        }
        let change = self.dist_change(first, second.x, second.y)
            + self.dist_change(second, first.x, first.y);
        if change >= 0 {
            return Ok(false);
        }

        let to_first = PixelPt {
            layer: first.layer,
            x: grid.grid_padded_x(second),
            y: grid.cell_grid_y(second),
        };
        let to_second = PixelPt {
            layer: second.layer,
            x: grid.grid_padded_x(first),
            y: grid.cell_grid_y(first),
        };
        self.erase(a);
        self.erase(b);
        self.paint(a, to_first)?;
        self.paint(b, to_second)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::data::{Design, GroupDef, Instance, Site};
    use crate::grid::{LayerKey, PixelPt};
    use crate::ids::{CellId, SiteId};
    use crate::placer::Placer;
    use sitewise_common::{Point, Rect};
    use sitewise_config::SitewiseConfig;

    const SITE: SiteId = SiteId::from_raw(0);

    fn design() -> Design {
        let mut d = Design::new(Rect::new(0, 0, 1000, 1000));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 10);
        d
    }

    fn at(placer: &Placer, x: i32, y: i32) -> PixelPt {
        PixelPt {
            layer: placer.grid().smallest_layer(),
            x,
            y,
        }
    }

    fn snapshot(placer: &Placer) -> Vec<Vec<Option<CellId>>> {
        (0..placer.grid().layers().len())
            .map(|i| placer.grid().occupancy(LayerKey::from_raw(i as u32)))
            .collect()
    }

    /// Two cells placed at each other's starting points.
    fn crossed() -> (Placer, CellId, CellId) {
        let mut d = design();
        let a = d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(100, 0)));
        let b = d.add_instance(Instance::std_cell("b", SITE, 20, 100, Point::new(500, 0)));
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let (pa, pb) = (at(&placer, 50, 0), at(&placer, 10, 0));
        placer.paint(a, pa).unwrap();
        placer.paint(b, pb).unwrap();
        (placer, a, b)
    }

    #[test]
    fn swap_restores_both_cells() {
        let (mut placer, a, b) = crossed();
        assert!(placer.swap_cells(a, b).unwrap());
        assert_eq!(placer.cell(a).location(), Point::new(100, 0));
        assert_eq!(placer.cell(b).location(), Point::new(500, 0));
        assert!(!placer.swap_cells(a, b).unwrap());
    }

    #[test]
    fn swap_round_trip_restores_occupancy() {
        let (mut placer, a, b) = crossed();
        let before = snapshot(&placer);
        assert!(placer.swap_cells(a, b).unwrap());
        assert_ne!(snapshot(&placer), before);

        placer.cells[a.index()].init = Point::new(500, 0);
        placer.cells[b.index()].init = Point::new(100, 0);
        assert!(placer.swap_cells(b, a).unwrap());
        assert_eq!(snapshot(&placer), before);
    }

    #[test]
    fn unequal_heights_never_swap() {
        let mut d = design();
        let tall = d.add_site(Site::core("double", 10, 200));
        d.add_uniform_rows(tall, 5);
        let a = d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(100, 0)));
        let b = d.add_instance(Instance::std_cell("b", tall, 20, 200, Point::new(500, 200)));
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let pa = at(&placer, 50, 2);
        let pb = PixelPt {
            layer: placer.cell(b).layer,
            x: 10,
            y: 0,
        };
        placer.paint(a, pa).unwrap();
        placer.paint(b, pb).unwrap();

        let occupancy = snapshot(&placer);
        let states = (placer.cell(a).state(), placer.cell(b).state());
        assert!(!placer.swap_cells(a, b).unwrap());
        assert_eq!(snapshot(&placer), occupancy);
        assert_eq!((placer.cell(a).state(), placer.cell(b).state()), states);
    }

    #[test]
    fn held_cells_stay_put() {
        let (mut placer, a, b) = crossed();
        placer.cells[a.index()].hold = true;
        assert!(!placer.swap_cells(a, b).unwrap());
        assert_eq!(placer.cell(a).location(), Point::new(500, 0));
    }

    #[test]
    fn refine_move_returns_cell_toward_start() {
        let (mut placer, a, _) = crossed();
        // b sits on a's start, so the closest free site is just past it.
        assert!(placer.refine_move(a).unwrap());
        assert_eq!(placer.cell(a).location(), Point::new(120, 0));
        assert!(!placer.refine_move(a).unwrap());
    }

    #[test]
    fn random_swap_untangles_group_members() {
        let mut d = design();
        let g = d.add_group(GroupDef {
            name: "all".into(),
            regions: vec![Rect::new(0, 0, 1000, 1000)],
        });
        let mut ids = Vec::new();
        for (name, x) in [("a", 100), ("b", 500)] {
            let mut inst = Instance::std_cell(name, SITE, 20, 100, Point::new(x, 0));
            inst.group = Some(g);
            ids.push(d.add_instance(inst));
        }
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let (pa, pb) = (at(&placer, 50, 0), at(&placer, 10, 0));
        placer.paint(ids[0], pa).unwrap();
        placer.paint(ids[1], pb).unwrap();

        assert_eq!(placer.random_swap(0).unwrap(), 1);
        assert_eq!(placer.cell(ids[0]).location(), Point::new(100, 0));
        assert_eq!(placer.cell(ids[1]).location(), Point::new(500, 0));
    }
}
