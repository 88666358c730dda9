//! Group placement: region assignment, pre-placement, the two-wave pass and
//! the brick fallbacks.

use crate::cell::Cell;
use crate::error::PlaceResult;
use crate::ids::CellId;
use crate::placer::Placer;
use sitewise_common::{Point, Rect};
use sitewise_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

impl Placer {
    /// Places every group, then alternates refinement and random swapping
    /// per group until a round yields too little.
    pub(crate) fn place_groups(&mut self, sink: &DiagnosticSink) -> PlaceResult<()> {
        self.group_assign_cell_regions();
        self.pre_place_groups()?;
        self.pre_place()?;
        self.place_groups_in_waves(sink)?;

        let rounds = self.config.groups.rounds;
        let min_refine = self.config.groups.min_refine_moves as usize;
        let min_swap = self.config.groups.min_swap_moves as usize;
        for group in 0..self.groups.len() {
            for _ in 0..rounds {
                let refined = self.group_refine(group)?;
                let swapped = self.random_swap(group)?;
                if refined < min_refine || swapped < min_swap {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Gives each member the region it starts inside (the nearest region
    /// otherwise) and computes group utilization against the valid pixels
    /// tagged with the group.
    pub(crate) fn group_assign_cell_regions(&mut self) {
        let chosen: Vec<Option<Rect>> = self
            .cells
            .iter()
            .map(|cell| {
                let regions = &self.groups.get(cell.group?.index())?.regions;
                let start = Rect::from_origin(cell.init, cell.width, cell.height);
                regions
                    .iter()
                    .find(|r| r.contains(&start))
                    .or_else(|| regions.iter().min_by_key(|r| self.dist_to_rect(cell, r)))
                    .copied()
            })
            .collect();

        let grid = &self.grid;
        let info = grid.info(grid.smallest_layer());
        let pixel_area = grid.site_width() as i64 * grid.row_height() as i64;
        for group in &mut self.groups {
            let mut count = 0i64;
            for y in 0..info.row_count {
                for x in 0..info.site_count {
                    if grid
                        .pixel(info.key, x, y)
                        .is_some_and(|p| p.valid && p.group == Some(group.id))
                    {
                        count += 1;
                    }
                }
            }

            let mut cell_area = 0i64;
            for id in &group.cells {
                let cell = &mut self.cells[id.index()];
                cell_area += cell.area();
                cell.region = chosen[id.index()];
            }
            let area = count * pixel_area;
            group.util = if area > 0 {
                cell_area as f64 / area as f64
            } else {
                0.0
            };
        }
    }

    /// Pulls members that start outside all of their group's regions to the
    /// nearest region and holds them there.
    fn pre_place_groups(&mut self) -> PlaceResult<()> {
        for group in 0..self.groups.len() {
            for k in 0..self.groups[group].cells.len() {
                let id = self.groups[group].cells[k];
                let cell = self.cell(id);
                if cell.fixed || cell.placed {
                    continue;
                }
                let regions = &self.groups[group].regions;
                let in_group = regions.iter().any(|r| self.is_inside(cell, r));
                let Some(nearest) = regions
                    .iter()
                    .min_by_key(|r| self.dist_to_rect(cell, r))
                    .copied()
                else {
                    continue;
                };
                if !in_group {
                    let target = self.nearest_pt(cell, &nearest);
                    let legal = self.legal_grid_pt(cell, target);
                    if self.map_move_to(id, legal)? {
                        self.cells[id.index()].hold = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pushes ungrouped cells that start on a region out of it and holds
    /// them there.
    fn pre_place(&mut self) -> PlaceResult<()> {
        for i in 0..self.cells.len() {
            let cell = &self.cells[i];
            if cell.in_group() || cell.placed {
                continue;
            }
            let overlapped = self
                .groups
                .iter()
                .flat_map(|g| g.regions.iter())
                .filter(|r| self.check_overlap(cell, r))
                .last()
                .copied();
            let Some(rect) = overlapped else {
                continue;
            };
            let target = self.nearest_pt(cell, &rect);
            let legal = self.legal_grid_pt(cell, target);
            let id = cell.id;
            if self.map_move_to(id, legal)? {
                self.cells[i].hold = true;
            }
        }
        Ok(())
    }

    /// Places each group's members, multi-row cells first. The first failure
    /// evicts the whole group and switches to brick placement.
    fn place_groups_in_waves(&mut self, sink: &DiagnosticSink) -> PlaceResult<()> {
        let brick_utilization = self.config.groups.brick_utilization;
        for group in 0..self.groups.len() {
            let mut members: Vec<CellId> = self.groups[group]
                .cells
                .iter()
                .copied()
                .filter(|&id| !self.cell(id).placed)
                .collect();
            self.sort_for_placement(&mut members);

            let mut placed_all = true;
            'waves: for multi in [true, false] {
                for &id in &members {
                    if self.cell(id).placed || self.is_multi_row(id) != multi {
                        continue;
                    }
                    if !self.map_move(id)? {
                        placed_all = false;
                        break 'waves;
                    }
                }
            }

            if !placed_all {
                for k in 0..self.groups[group].cells.len() {
                    let id = self.groups[group].cells[k];
                    self.erase(id);
                }
                if self.groups[group].util > brick_utilization {
                    self.brick_place_toward_boundary(group, sink)?;
                } else {
                    self.brick_place_toward_regions(group, sink)?;
                }
            }
        }
        Ok(())
    }

    /// Stacks members from the corners of the group boundary.
    fn brick_place_toward_boundary(&mut self, group: usize, sink: &DiagnosticSink) -> PlaceResult<()> {
        let boundary = self.groups[group].boundary;
        let mut members = self.groups[group].cells.clone();
        members.sort_by_key(|&id| self.rect_dist(self.cell(id), &boundary));
        for id in members {
            let cell = self.cell(id);
            let corner = self.rect_corner(cell, &boundary);
            let legal = self.legal_grid_pt(cell, corner);
            if !self.map_move_to(id, legal)? {
                self.brick_failure(id, 16, sink);
            }
        }
        Ok(())
    }

    /// Stacks members from the corners of their own regions.
    fn brick_place_toward_regions(&mut self, group: usize, sink: &DiagnosticSink) -> PlaceResult<()> {
        let boundary = self.groups[group].boundary;
        let region_of = |cell: &Cell| cell.region.unwrap_or(boundary);
        let mut members = self.groups[group].cells.clone();
        members.sort_by_key(|&id| {
            let cell = self.cell(id);
            self.rect_dist(cell, &region_of(cell))
        });
        for id in members {
            let cell = self.cell(id);
            if cell.hold {
                continue;
            }
            let corner = self.rect_corner(cell, &region_of(cell));
            let legal = self.legal_grid_pt(cell, corner);
            if !self.map_move_to(id, legal)? {
                self.brick_failure(id, 17, sink);
            }
        }
        Ok(())
    }

    fn brick_failure(&mut self, id: CellId, number: u16, sink: &DiagnosticSink) {
        let name = self.cell(id).name.clone();
        sink.emit(
            Diagnostic::warning(
                DiagnosticCode::warning(number),
                format!("cannot place instance {name}"),
            )
            .with_instance(name),
        );
        self.failures.push(id);
    }

    // Region geometry, all measured from the initial location.

    /// Interiors of the cell and `rect` overlap.
    pub(crate) fn check_overlap(&self, cell: &Cell, rect: &Rect) -> bool {
        let init = self.initial_location(cell, false);
        init.x + cell.width > rect.x_min
            && init.x < rect.x_max
            && init.y + cell.height > rect.y_min
            && init.y < rect.y_max
    }

    /// The cell lies entirely within `rect`.
    pub(crate) fn is_inside(&self, cell: &Cell, rect: &Rect) -> bool {
        let init = self.initial_location(cell, false);
        init.x >= rect.x_min
            && init.x + cell.width <= rect.x_max
            && init.y >= rect.y_min
            && init.y + cell.height <= rect.y_max
    }

    /// Where to pull a cell relative to `rect`.
    ///
    /// An overlapping cell is pushed out across the closer edge, along the
    /// axis that needs the shorter move. Any other cell is pulled inside.
    pub(crate) fn nearest_pt(&self, cell: &Cell, rect: &Rect) -> Point {
        let Point { x, y } = self.initial_location(cell, false);
        let (width, height) = (cell.width, cell.height);

        if self.check_overlap(cell, rect) {
            let (dist_x, out_x) = if (x + width - rect.x_min).abs() > (rect.x_max - x).abs() {
                ((rect.x_max - x).abs(), rect.x_max)
            } else {
                ((x - rect.x_min).abs(), rect.x_min - width)
            };
            let (dist_y, out_y) = if (y + height - rect.y_min).abs() > (rect.y_max - y).abs() {
                ((rect.y_max - y).abs(), rect.y_max)
            } else {
                ((y - rect.y_min).abs(), rect.y_min - height)
            };
            return if dist_x < dist_y {
                Point::new(out_x, y)
            } else {
                Point::new(x, out_y)
            };
        }

        let in_x = if x < rect.x_min {
            rect.x_min
        } else if x + width > rect.x_max {
            rect.x_max - width
        } else {
            x
        };
        let in_y = if y < rect.y_min {
            rect.y_min
        } else if y + height > rect.y_max {
            rect.y_max - height
        } else {
            y
        };
        Point::new(in_x, in_y)
    }

    /// How far the padded cell sticks out of `rect`.
    pub(crate) fn dist_to_rect(&self, cell: &Cell, rect: &Rect) -> i64 {
        let Point { x, y } = self.initial_location(cell, true);
        let dist_x = if x < rect.x_min {
            rect.x_min - x
        } else if x + cell.width > rect.x_max {
            x + cell.width - rect.x_max
        } else {
            0
        };
        let dist_y = if y < rect.y_min {
            rect.y_min - y
        } else if y + cell.height > rect.y_max {
            y + cell.height - rect.y_max
        } else {
            0
        };
        dist_x as i64 + dist_y as i64
    }

    /// Corner of `rect` on the cell's side of its center lines.
    pub(crate) fn rect_corner(&self, cell: &Cell, rect: &Rect) -> Point {
        let init = self.initial_location(cell, false);
        let x = if init.x > (rect.x_min + rect.x_max) / 2 {
            rect.x_max
        } else {
            rect.x_min
        };
        let y = if init.y > (rect.y_min + rect.y_max) / 2 {
            rect.y_max
        } else {
            rect.y_min
        };
        Point::new(x, y)
    }

    /// Distance from the initial location to [`rect_corner`](Self::rect_corner).
    pub(crate) fn rect_dist(&self, cell: &Cell, rect: &Rect) -> i64 {
        let init = self.initial_location(cell, false);
        init.manhattan(self.rect_corner(cell, rect))
    }
}
