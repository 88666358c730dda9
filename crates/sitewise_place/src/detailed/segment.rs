//! Row segments of the reference layer.
//!
//! A segment is a maximal run of valid sites in one row that no fixed cell
//! covers and that carries a single group tag. It lists the movable cells
//! sitting on it ordered by x center.

use crate::cell::Cell;
use crate::grid::Grid;
use crate::ids::{CellId, GroupId, SegmentId};

/// One run of free sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Segment ID.
    pub id: SegmentId,
    /// Grid row on the reference layer.
    pub row: i32,
    /// First site column.
    pub x_min: i32,
    /// Site column past the last one.
    pub x_max: i32,
    /// Group owning the sites, if any.
    pub group: Option<GroupId>,
    cells: Vec<CellId>,
}

impl Segment {
    /// Cells on the segment, ordered by x center.
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Returns `true` if site column `col` belongs to the segment.
    pub fn contains_col(&self, col: i32) -> bool {
        col >= self.x_min && col < self.x_max
    }
}

/// Doubled x center, so odd widths stay integral.
fn center_key(cell: &Cell) -> (i64, CellId) {
    (2 * cell.x as i64 + cell.width as i64, cell.id)
}

/// All segments with row and cell lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    by_row: Vec<Vec<SegmentId>>,
    by_cell: Vec<Vec<SegmentId>>,
}

impl SegmentTable {
    /// Cuts the reference layer into segments and assigns every placed
    /// movable cell to each segment its footprint touches.
    pub fn build(grid: &Grid, cells: &[Cell]) -> Self {
        let key = grid.smallest_layer();
        let info = grid.info(key);
        let mut table = Self {
            segments: Vec::new(),
            by_row: vec![Vec::new(); info.row_count.max(0) as usize],
            by_cell: vec![Vec::new(); cells.len()],
        };

        let open = |x: i32, y: i32| {
            grid.pixel(key, x, y)
                .filter(|p| p.valid && !p.cell.is_some_and(|c| cells[c.index()].fixed))
                .map(|p| p.group)
        };
        for y in 0..info.row_count {
            let mut x = 0;
            while x < info.site_count {
                let Some(group) = open(x, y) else {
                    x += 1;
                    continue;
                };
                let start = x;
                while x < info.site_count && open(x, y) == Some(group) {
                    x += 1;
                }
                let id = SegmentId::from_raw(table.segments.len() as u32);
                table.segments.push(Segment {
                    id,
                    row: y,
                    x_min: start,
                    x_max: x,
                    group,
                    cells: Vec::new(),
                });
                table.by_row[y as usize].push(id);
            }
        }

        for cell in cells.iter().filter(|c| c.placed && !c.fixed) {
            let x = grid.grid_padded_x(cell);
            let x_end = grid.grid_padded_end_x(cell);
            let y = grid.cell_grid_y(cell);
            let y_end = grid.cell_grid_end_y(cell).max(y + 1);
            let (row, row_end) = grid.mapped_rows(y, y_end, cell.layer, key);
            for r in row.max(0)..row_end {
                for &seg in &table.by_row[r as usize] {
                    let s = &mut table.segments[seg.index()];
                    if s.x_min < x_end && x < s.x_max {
                        s.cells.push(cell.id);
                        table.by_cell[cell.id.index()].push(seg);
                    }
                }
            }
        }
        table.resort(cells);
        table
    }

    /// All segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The segment with the given ID.
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    /// Segments of reference-layer row `row`, left to right.
    pub fn in_row(&self, row: i32) -> &[SegmentId] {
        usize::try_from(row)
            .ok()
            .and_then(|r| self.by_row.get(r))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Segments a cell currently sits on.
    pub fn of_cell(&self, cell: CellId) -> &[SegmentId] {
        self.by_cell
            .get(cell.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Segment of `row` containing site column `col`.
    pub fn at(&self, row: i32, col: i32) -> Option<SegmentId> {
        self.in_row(row)
            .iter()
            .copied()
            .find(|&s| self.segment(s).contains_col(col))
    }

    /// Re-sorts every segment's cells by x center.
    pub fn resort(&mut self, cells: &[Cell]) {
        for segment in &mut self.segments {
            segment
                .cells
                .sort_by_key(|&id| center_key(&cells[id.index()]));
        }
    }

    /// Free sites `(left, right)` between a cell and its neighbors (or the
    /// segment ends) within `segment`.
    pub fn space_around(
        &self,
        grid: &Grid,
        cells: &[Cell],
        segment: SegmentId,
        cell: CellId,
    ) -> Option<(i32, i32)> {
        let seg = self.segment(segment);
        let index = seg.cells.iter().position(|&c| c == cell)?;
        let left_edge = match index.checked_sub(1) {
            Some(prev) => grid.grid_padded_end_x(&cells[seg.cells[prev].index()]),
            None => seg.x_min,
        };
        let right_edge = match seg.cells.get(index + 1) {
            Some(next) => grid.grid_padded_x(&cells[next.index()]),
            None => seg.x_max,
        };
        let me = &cells[cell.index()];
        Some((
            grid.grid_padded_x(me) - left_edge,
            right_edge - grid.grid_padded_end_x(me),
        ))
    }

    /// Free column span `[lo, hi)` of `segment` around doubled x center
    /// `center`, ignoring the cells in `skip`.
    pub(crate) fn gap(
        &self,
        grid: &Grid,
        cells: &[Cell],
        segment: SegmentId,
        center: i64,
        skip: &[CellId],
    ) -> (i32, i32) {
        let seg = self.segment(segment);
        let (mut lo, mut hi) = (seg.x_min, seg.x_max);
        for &id in seg.cells.iter().filter(|id| !skip.contains(id)) {
            let other = &cells[id.index()];
            if center_key(other).0 <= center {
                lo = lo.max(grid.grid_padded_end_x(other));
            } else {
                hi = hi.min(grid.grid_padded_x(other));
            }
        }
        (lo, hi)
    }

    /// Removes a cell from a segment, returning the position it held.
    pub(crate) fn remove(&mut self, cell: CellId, segment: SegmentId) -> Option<usize> {
        let cells = &mut self.segments[segment.index()].cells;
        let index = cells.iter().position(|&c| c == cell)?;
        cells.remove(index);
        let owned = &mut self.by_cell[cell.index()];
        if let Ok(at) = owned.binary_search(&segment) {
            owned.remove(at);
        }
        Some(index)
    }

    /// Puts a cell back at a known position.
    pub(crate) fn insert_at(&mut self, cell: CellId, segment: SegmentId, index: usize) {
        self.segments[segment.index()].cells.insert(index, cell);
        let owned = &mut self.by_cell[cell.index()];
        if let Err(at) = owned.binary_search(&segment) {
            owned.insert(at, segment);
        }
    }

    /// Inserts a cell in x-center order, returning its position.
    pub(crate) fn insert_sorted(&mut self, cells: &[Cell], cell: CellId, segment: SegmentId) -> usize {
        let key = center_key(&cells[cell.index()]);
        let index = self.segments[segment.index()]
            .cells
            .partition_point(|&c| center_key(&cells[c.index()]) < key);
        self.insert_at(cell, segment, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Design, GroupDef, Instance, Site};
    use crate::grid::PixelPt;
    use crate::ids::SiteId;
    use crate::placer::Placer;
    use sitewise_common::{Point, Rect};
    use sitewise_config::SitewiseConfig;

    const SITE: SiteId = SiteId::from_raw(0);

    fn design() -> Design {
        let mut d = Design::new(Rect::new(0, 0, 1000, 300));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 3);
        d
    }

    #[test]
    fn fixed_cells_and_regions_split_rows() {
        let mut d = design();
        d.add_instance(Instance::fixed_block("m", 100, 100, Point::new(400, 0)));
        d.add_group(GroupDef {
            name: "g".into(),
            regions: vec![Rect::new(0, 100, 200, 200)],
        });
        let placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let table = SegmentTable::build(placer.grid(), placer.cells());

        let spans = |row: i32| -> Vec<(i32, i32, bool)> {
            table
                .in_row(row)
                .iter()
                .map(|&s| {
                    let seg = table.segment(s);
                    (seg.x_min, seg.x_max, seg.group.is_some())
                })
                .collect()
        };
        assert_eq!(spans(0), vec![(0, 40, false), (50, 100, false)]);
        assert_eq!(spans(1), vec![(0, 20, true), (20, 100, false)]);
        assert_eq!(spans(2), vec![(0, 100, false)]);
        assert_eq!(table.at(0, 45), None);
        assert_eq!(table.at(0, 50), Some(table.in_row(0)[1]));
    }

    #[test]
    fn cells_are_ordered_and_spaced() {
        let mut d = design();
        let a = d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(0, 0)));
        let b = d.add_instance(Instance::std_cell("b", SITE, 30, 100, Point::new(0, 0)));
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let key = placer.grid().smallest_layer();
        placer.paint(b, PixelPt { layer: key, x: 10, y: 0 }).unwrap();
        placer.paint(a, PixelPt { layer: key, x: 50, y: 0 }).unwrap();

        let table = SegmentTable::build(placer.grid(), placer.cells());
        let seg = table.in_row(0)[0];
        assert_eq!(table.segment(seg).cells(), &[b, a]);
        assert_eq!(table.of_cell(a), &[seg]);
        let grid = placer.grid();
        assert_eq!(table.space_around(grid, placer.cells(), seg, b), Some((10, 37)));
        assert_eq!(table.space_around(grid, placer.cells(), seg, a), Some((37, 48)));
        assert_eq!(table.gap(grid, placer.cells(), seg, 2 * 300, &[]), (13, 50));
        assert_eq!(table.gap(grid, placer.cells(), seg, 2 * 300, &[a]), (13, 100));
    }

    #[test]
    fn remove_then_insert_at_restores_order() {
        let mut d = design();
        let ids: Vec<CellId> = (0..3)
            .map(|i| d.add_instance(Instance::std_cell(format!("c{i}"), SITE, 10, 100, Point::new(0, 0))))
            .collect();
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let key = placer.grid().smallest_layer();
        for (i, &id) in ids.iter().enumerate() {
            placer.paint(id, PixelPt { layer: key, x: 10 * i as i32, y: 0 }).unwrap();
        }
        let mut table = SegmentTable::build(placer.grid(), placer.cells());
        let before = table.clone();
        let seg = table.in_row(0)[0];

        let index = table.remove(ids[1], seg).unwrap();
        assert_eq!(index, 1);
        assert!(table.of_cell(ids[1]).is_empty());
        table.insert_at(ids[1], seg, index);
        assert_eq!(table, before);

        table.remove(ids[1], seg).unwrap();
        assert_eq!(table.insert_sorted(placer.cells(), ids[1], seg), 1);
        assert_eq!(table, before);
    }
}
