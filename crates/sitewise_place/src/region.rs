//! Spatial index over group region rectangles.

use crate::cell::Group;
use crate::ids::GroupId;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use sitewise_common::Rect;

type RegionEntry = GeomWithData<Rectangle<[i64; 2]>, (GroupId, usize)>;

/// R-tree of every region rectangle of every group.
///
/// Rectangles are stored with inclusive corners, so a query box touching a
/// region only along an edge does not overlap it once the caller shrinks its
/// own upper corner by one unit.
#[derive(Debug, Default)]
pub struct RegionIndex {
    tree: RTree<RegionEntry>,
}

/// A region found by a query.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegionHit {
    /// Owning group.
    pub group: GroupId,
    /// Index of the rectangle within the group.
    pub region: usize,
    /// The region rectangle.
    pub rect: Rect,
}

fn corners(r: &Rect) -> ([i64; 2], [i64; 2]) {
    (
        [r.x_min as i64, r.y_min as i64],
        [r.x_max as i64 - 1, r.y_max as i64 - 1],
    )
}

impl RegionIndex {
    /// Builds the index from all groups.
    pub fn new(groups: &[Group]) -> Self {
        let entries = groups
            .iter()
            .flat_map(|g| {
                g.regions.iter().enumerate().map(move |(i, r)| {
                    let (lo, hi) = corners(r);
                    GeomWithData::new(Rectangle::from_corners(lo, hi), (g.id, i))
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns `true` if no region was indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Regions whose interior overlaps `area`.
    pub fn overlapping(&self, area: &Rect) -> Vec<RegionHit> {
        let (lo, hi) = corners(area);
        let mut hits: Vec<RegionHit> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_corners(lo, hi))
            .map(|entry| {
                let (group, region) = entry.data;
                let lower = entry.geom().lower();
                let upper = entry.geom().upper();
                RegionHit {
                    group,
                    region,
                    rect: Rect::new(
                        lower[0] as i32,
                        lower[1] as i32,
                        upper[0] as i32 + 1,
                        upper[1] as i32 + 1,
                    ),
                }
            })
            .collect();
        hits.sort_by_key(|h| (h.group, h.region));
        hits
    }

    /// Checks a footprint against the regions.
    ///
    /// A cell assigned to a region must lie entirely inside exactly one
    /// region rectangle; an unassigned cell must touch none.
    pub fn footprint_allowed(&self, area: &Rect, has_region: bool) -> bool {
        let hits = self.overlapping(area);
        if has_region {
            return hits.len() == 1 && hits[0].rect.contains(area);
        }
        hits.is_empty()
    }
}
