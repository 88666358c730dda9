//! The placer: working state shared by the legalizer and every driver.

use crate::cell::{Cell, Group};
use crate::data::Design;
use crate::error::PlaceResult;
use crate::grid::{Grid, PixelPt};
use crate::ids::CellId;
use crate::import;
use crate::network::Network;
use crate::observer::PlacementObserver;
use crate::padding::Padding;
use crate::region::RegionIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sitewise_common::Point;
use sitewise_config::SitewiseConfig;

/// Detailed placer for one design.
///
/// Owns the cells, the occupancy grid and the run's random generator. The
/// design itself is only read on construction and written in
/// [`write_back`](Self::write_back).
pub struct Placer {
    pub(crate) cells: Vec<Cell>,
    pub(crate) groups: Vec<Group>,
    pub(crate) network: Network,
    pub(crate) grid: Grid,
    pub(crate) regions: RegionIndex,
    pub(crate) config: SitewiseConfig,
    pub(crate) rng: StdRng,
    pub(crate) failures: Vec<CellId>,
    observer: Option<Box<dyn PlacementObserver>>,
}

impl Placer {
    /// Imports the design and builds the grid.
    ///
    /// Fixed cells are painted and group regions tagged; movable cells are
    /// left unplaced.
    pub fn new(design: &Design, config: &SitewiseConfig) -> PlaceResult<Self> {
        let mut cells = import::import_cells(design);
        let groups = import::import_groups(design, &cells);
        let network = import::import_network(design);
        let padding = Padding::new(config.padding.left, config.padding.right);
        let mut grid = Grid::build(
            design,
            padding,
            config.legalizer.max_displacement_x,
            config.legalizer.max_displacement_y,
        )?;

        for cell in &mut cells {
            cell.layer = match grid.resolve_layer(cell) {
                Ok(key) => key,
                Err(_) if cell.fixed => grid.smallest_layer(),
                Err(err) => return Err(err),
            };
        }
        grid.paint_fixed(&cells);
        grid.init_group_pixels(&groups);
        let regions = RegionIndex::new(&groups);

        Ok(Self {
            cells,
            groups,
            network,
            grid,
            regions,
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.run.seed),
            failures: Vec::new(),
            observer: None,
        })
    }

    /// Installs an observer.
    pub fn set_observer(&mut self, observer: Box<dyn PlacementObserver>) {
        self.observer = Some(observer);
    }

    /// All cells, indexed by [`CellId`].
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell with the given ID.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// All groups.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The occupancy grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Net connectivity.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The effective configuration.
    pub fn config(&self) -> &SitewiseConfig {
        &self.config
    }

    /// Cells that could not be placed so far.
    pub fn failures(&self) -> &[CellId] {
        &self.failures
    }

    /// Writes final locations back to the design, returning the number of
    /// instances that moved.
    pub fn write_back(&self, design: &mut Design) -> usize {
        import::write_back(design, &self.cells)
    }

    pub(crate) fn observer(&self) -> Option<&dyn PlacementObserver> {
        self.observer.as_deref()
    }

    /// Initial location, optionally shifted left by the cell's left padding.
    pub(crate) fn initial_location(&self, cell: &Cell, padded: bool) -> Point {
        let mut init = cell.init;
        if padded {
            init.x -= self.grid.padding().pad_left(cell) * self.grid.site_width();
        }
        init
    }

    /// Manhattan distance of the current location from the initial one.
    pub(crate) fn disp(&self, cell: &Cell) -> i64 {
        cell.displacement()
    }

    /// How much a cell's displacement would change if its origin moved to
    /// `(x, y)`. Negative means closer to its initial location.
    pub(crate) fn dist_change(&self, cell: &Cell, x: i32, y: i32) -> i64 {
        let init = self.initial_location(cell, false);
        Point::new(x, y).manhattan(init) - cell.location().manhattan(init)
    }

    /// Paints a cell at a search result and notifies the observer.
    pub(crate) fn paint(&mut self, id: CellId, pt: PixelPt) -> PlaceResult<()> {
        self.grid.paint_pixel(&mut self.cells, id, pt.x, pt.y)?;
        if let Some(observer) = &self.observer {
            observer.place_instance(&self.cells[id.index()]);
        }
        Ok(())
    }

    /// Removes a cell from the grid.
    pub(crate) fn erase(&mut self, id: CellId) {
        self.grid.erase_pixel(&mut self.cells, id);
    }
}
