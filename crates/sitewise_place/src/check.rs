//! Geometric legality checker.
//!
//! Works from cell locations alone, independent of the occupancy grid, so
//! it also catches grid bookkeeping bugs.

use crate::cell::Cell;
use crate::placer::Placer;
use serde::Serialize;
use sitewise_common::Rect;
use std::fmt;

/// One legality problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Two cells overlap.
    Overlap {
        /// First cell.
        instance: String,
        /// Second cell.
        other: String,
    },
    /// Origin not on a site boundary.
    SiteMisaligned {
        /// Offending cell.
        instance: String,
    },
    /// Origin not on a row boundary of the cell's layer.
    RowMisaligned {
        /// Offending cell.
        instance: String,
    },
    /// Footprint leaves the core.
    OutsideCore {
        /// Offending cell.
        instance: String,
    },
    /// Grouped cell not inside one of its group's regions.
    OutsideRegion {
        /// Offending cell.
        instance: String,
    },
    /// Ungrouped cell overlapping a region.
    InsideRegion {
        /// Offending cell.
        instance: String,
    },
    /// Exactly one free site between two abutting cells.
    OneSiteGap {
        /// Left cell.
        instance: String,
        /// Right cell.
        other: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Overlap { instance, other } => write!(f, "{instance} overlaps {other}"),
            Violation::SiteMisaligned { instance } => write!(f, "{instance} is not site aligned"),
            Violation::RowMisaligned { instance } => write!(f, "{instance} is not row aligned"),
            Violation::OutsideCore { instance } => write!(f, "{instance} is outside the core"),
            Violation::OutsideRegion { instance } => {
                write!(f, "{instance} is outside its group regions")
            }
            Violation::InsideRegion { instance } => {
                write!(f, "{instance} overlaps a group region")
            }
            Violation::OneSiteGap { instance, other } => {
                write!(f, "one-site gap between {instance} and {other}")
            }
        }
    }
}

impl Placer {
    /// Checks every placed movable cell and reports what is wrong.
    ///
    /// An empty result means the placement is legal.
    pub fn check_placement(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        for cell in self.cells.iter().filter(|c| c.placed && !c.fixed) {
            self.check_cell(cell, &mut violations);
        }
        self.check_pairs(&mut violations);
        violations
    }

    fn check_cell(&self, cell: &Cell, out: &mut Vec<Violation>) {
        let grid = &self.grid;
        let instance = || cell.name.clone();
        let core = Rect::new(0, 0, grid.core().dx(), grid.core().dy());
        let bbox = cell.bbox();
        if !core.contains(&bbox) {
            out.push(Violation::OutsideCore { instance: instance() });
        }
        if cell.x.rem_euclid(grid.site_width()) != 0 {
            out.push(Violation::SiteMisaligned { instance: instance() });
        }
        let row = grid.cell_grid_y(cell);
        if grid.origin_at(cell, grid.grid_padded_x(cell), row).y != cell.y {
            out.push(Violation::RowMisaligned { instance: instance() });
        }
        match cell.group.and_then(|g| self.groups.get(g.index())) {
            Some(group) => {
                if !group.regions.iter().any(|r| r.contains(&bbox)) {
                    out.push(Violation::OutsideRegion { instance: instance() });
                }
            }
            None => {
                if !self.regions.overlapping(&bbox).is_empty() {
                    out.push(Violation::InsideRegion { instance: instance() });
                }
            }
        }
    }

    /// Overlaps among all placed cells and, when disallowed, one-site gaps
    /// next to movable cells. Sweeps cells left to right.
    fn check_pairs(&self, out: &mut Vec<Violation>) {
        let site_width = self.grid.site_width();
        let gaps = self.config.legalizer.disallow_one_site_gaps;
        let mut placed: Vec<&Cell> = self.cells.iter().filter(|c| c.placed).collect();
        placed.sort_by_key(|c| (c.x, c.y, c.id));

        for (i, a) in placed.iter().enumerate() {
            let ab = a.bbox();
            for b in &placed[i + 1..] {
                let bb = b.bbox();
                if bb.x_min > ab.x_max + site_width {
                    break;
                }
                if a.fixed && b.fixed {
                    continue;
                }
                if bb.y_min >= ab.y_max || ab.y_min >= bb.y_max {
                    continue;
                }
                if ab.overlaps(&bb) {
                    out.push(Violation::Overlap {
                        instance: a.name.clone(),
                        other: b.name.clone(),
                    });
                } else if gaps && bb.x_min - ab.x_max == site_width {
                    out.push(Violation::OneSiteGap {
                        instance: a.name.clone(),
                        other: b.name.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Design, GroupDef, Instance, Site};
    use crate::ids::SiteId;
    use sitewise_common::Point;
    use sitewise_config::SitewiseConfig;

    const SITE: SiteId = SiteId::from_raw(0);

    fn design() -> Design {
        let mut d = Design::new(Rect::new(0, 0, 1000, 500));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 5);
        d
    }

    /// Marks every movable cell placed where it stands, bypassing the grid.
    fn as_placed(d: &Design, config: &SitewiseConfig) -> Placer {
        let mut placer = Placer::new(d, config).unwrap();
        for cell in &mut placer.cells {
            cell.placed = true;
        }
        placer
    }

    fn names(v: &Violation) -> String {
        v.to_string()
    }

    #[test]
    fn legal_rows_are_clean() {
        let mut d = design();
        d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(0, 0)));
        d.add_instance(Instance::std_cell("b", SITE, 20, 100, Point::new(20, 0)));
        d.add_instance(Instance::std_cell("c", SITE, 20, 100, Point::new(20, 100)));
        let placer = as_placed(&d, &SitewiseConfig::default());
        assert!(placer.check_placement().is_empty());
    }

    #[test]
    fn overlap_and_misalignment_are_reported() {
        let mut d = design();
        d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(0, 0)));
        d.add_instance(Instance::std_cell("b", SITE, 20, 100, Point::new(10, 0)));
        d.add_instance(Instance::std_cell("c", SITE, 20, 100, Point::new(505, 150)));
        d.add_instance(Instance::std_cell("d", SITE, 20, 100, Point::new(990, 400)));
        let placer = as_placed(&d, &SitewiseConfig::default());
        let found: Vec<String> = placer.check_placement().iter().map(names).collect();
        assert_eq!(
            found,
            [
                "c is not site aligned",
                "c is not row aligned",
                "d is outside the core",
                "a overlaps b",
            ]
        );
    }

    #[test]
    fn regions_bind_both_ways() {
        let mut d = design();
        let g = d.add_group(GroupDef {
            name: "g".into(),
            regions: vec![Rect::new(0, 0, 200, 100)],
        });
        let mut inside = Instance::std_cell("in", SITE, 20, 100, Point::new(300, 0));
        inside.group = Some(g);
        d.add_instance(inside);
        d.add_instance(Instance::std_cell("out", SITE, 20, 100, Point::new(100, 0)));
        let placer = as_placed(&d, &SitewiseConfig::default());
        let found = placer.check_placement();
        assert_eq!(
            found,
            vec![
                Violation::OutsideRegion { instance: "in".into() },
                Violation::InsideRegion { instance: "out".into() },
            ]
        );
    }

    #[test]
    fn one_site_gaps_only_when_disallowed() {
        let mut d = design();
        d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(0, 0)));
        d.add_instance(Instance::std_cell("b", SITE, 20, 100, Point::new(30, 0)));
        assert!(as_placed(&d, &SitewiseConfig::default()).check_placement().is_empty());

        let mut cfg = SitewiseConfig::default();
        cfg.legalizer.disallow_one_site_gaps = true;
        let found = as_placed(&d, &cfg).check_placement();
        assert_eq!(
            found,
            vec![Violation::OneSiteGap {
                instance: "a".into(),
                other: "b".into()
            }]
        );
    }

    #[test]
    fn fixed_cells_count_for_overlap() {
        let mut d = design();
        d.add_instance(Instance::fixed_block("m", 100, 100, Point::new(0, 0)));
        let a = d.add_instance(Instance::std_cell("a", SITE, 20, 100, Point::new(50, 0)));
        let placer = as_placed(&d, &SitewiseConfig::default());
        assert_eq!(placer.cell(a).name, "a");
        assert_eq!(
            placer.check_placement(),
            vec![Violation::Overlap {
                instance: "m".into(),
                other: "a".into()
            }]
        );
    }
}
