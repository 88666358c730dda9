//! Grid construction: layer mapping, valid and hopeless pixels, fixed cells
//! and group regions.

use super::{Grid, GridInfo, LayerKey, PatternRow, Pixel, RowPattern};
use crate::cell::{Cell, Group};
use crate::data::{Design, Orient, Row};
use crate::error::{PlaceError, PlaceResult};
use crate::ids::SiteId;
use crate::padding::Padding;
use sitewise_common::{div_floor, InternalError, Rect};
use std::collections::{BTreeMap, HashMap};

/// Rows keep this many sites and rows of their displacement window out of
/// the hopeless area.
const HOPELESS_SAFETY: i32 = 20;

impl Grid {
    /// Builds the grid from the design's rows.
    ///
    /// `max_dx` and `max_dy` are the legalizer displacement caps; pixels
    /// outside every row's capped window are marked hopeless.
    pub fn build(design: &Design, padding: Padding, max_dx: i32, max_dy: i32) -> PlaceResult<Grid> {
        let rows: Vec<&Row> = design.placement_rows().collect();
        let has_hybrid_rows = examine_rows(design, &rows)?;
        let core = design.core;
        let site_width = rows.iter().map(|r| design.site(r.site).width).min();
        let row_height = rows.iter().map(|r| design.site(r.site).height).min();
        let (Some(site_width), Some(row_height)) = (site_width, row_height) else {
            return Err(PlaceError::NoRows);
        };
        if site_width <= 0 || row_height <= 0 {
            return Err(InternalError::new("sites must have a positive size").into());
        }

        let mut grid = Grid {
            core,
            site_width,
            row_height,
            row_count: div_floor(core.dy(), row_height),
            row_site_count: div_floor(core.dx(), site_width),
            layers: Vec::new(),
            pixels: Vec::new(),
            site_to_layer: HashMap::new(),
            hybrid_parent: HashMap::new(),
            smallest: LayerKey::default(),
            has_hybrid_rows,
            padding,
        };
        grid.init_layers(design, &rows)?;
        grid.init_pixels(design, &rows, max_dx, max_dy);
        Ok(grid)
    }

    fn init_layers(&mut self, design: &Design, rows: &[&Row]) -> PlaceResult<()> {
        for (i, site) in design.sites.iter().enumerate() {
            for entry in &site.pattern {
                self.hybrid_parent
                    .entry(entry.site)
                    .or_insert(SiteId::from_raw(i as u32));
            }
        }

        let min_row_y = rows.iter().map(|r| r.origin.y).min().unwrap_or(0);
        let mut next = 0;
        let mut min_site_height = i32::MAX;
        let mut smallest = None;
        for row in rows {
            if self.site_to_layer.contains_key(&row.site) {
                continue;
            }
            let site = design.site(row.site);
            if site.hybrid && site.has_row_pattern() {
                self.site_to_layer.insert(row.site, LayerKey(next));
                next += 1;
                let mut children = false;
                for entry in &site.pattern {
                    if !self.site_to_layer.contains_key(&entry.site) {
                        self.site_to_layer.insert(entry.site, LayerKey(next));
                        children = true;
                    }
                }
                if children {
                    next += 1;
                }
            } else if !site.hybrid {
                self.site_to_layer.insert(row.site, LayerKey(next));
                next += 1;
                if site.height < min_site_height {
                    min_site_height = site.height;
                    smallest = Some(LayerKey(next - 1));
                }
            }
        }

        // The lowest row decides which parent a shared child site belongs to.
        for row in rows.iter().filter(|r| r.origin.y == min_row_y) {
            for entry in &design.site(row.site).pattern {
                self.hybrid_parent.insert(entry.site, row.site);
            }
        }
        if !self.has_hybrid_rows && smallest.is_none() {
            return Err(PlaceError::NoNonHybridLayer);
        }

        let mut infos: BTreeMap<LayerKey, GridInfo> = BTreeMap::new();
        for row in rows {
            let site = design.site(row.site);
            let key = self.site_to_layer.get(&row.site).copied().ok_or_else(|| {
                InternalError::new(format!(
                    "row {} uses site {} which maps to no grid layer",
                    row.name, site.name
                ))
            })?;
            let offset = row.origin.y - min_row_y;
            if let Some(info) = infos.get_mut(&key) {
                if info.is_hybrid() {
                    info.offset = info.offset.min(offset);
                }
                continue;
            }
            let info = if site.has_row_pattern() || !site.hybrid {
                let entry = PatternRow {
                    site: row.site,
                    orient: row.orient,
                    height: site.height,
                };
                GridInfo {
                    key,
                    row_count: div_floor(self.core.dy(), site.height),
                    site_count: div_floor(self.core.dx(), site.width),
                    offset: if site.hybrid { offset } else { 0 },
                    pattern: if site.hybrid {
                        RowPattern::Hybrid(vec![entry])
                    } else {
                        RowPattern::Uniform(entry)
                    },
                }
            } else {
                let parent = self.parent_of(design, row.site)?;
                self.child_layer_info(design, key, parent, site.width, offset)
            };
            infos.insert(key, info);
        }

        // Child layers reached only through their parent's pattern.
        let mut pending: Vec<(SiteId, LayerKey)> = self
            .site_to_layer
            .iter()
            .filter(|(_, key)| !infos.contains_key(key))
            .map(|(&site, &key)| (site, key))
            .collect();
        pending.sort();
        for (site, key) in pending {
            if infos.contains_key(&key) {
                continue;
            }
            let parent = self.parent_of(design, site)?;
            let offset = self
                .site_to_layer
                .get(&parent)
                .and_then(|k| infos.get(k))
                .map_or(0, |info| info.offset);
            let width = design.site(site).width;
            let info = self.child_layer_info(design, key, parent, width, offset);
            infos.insert(key, info);
        }

        if infos.keys().enumerate().any(|(i, key)| key.index() != i) {
            return Err(InternalError::new("grid layer keys are not dense").into());
        }
        self.layers = infos.into_values().collect();

        let mut min_height = i32::MAX;
        for info in &self.layers {
            let height = info.pattern.total_height();
            if height < min_height {
                min_height = height;
                if self.has_hybrid_rows {
                    smallest = Some(info.key);
                }
            }
        }
        self.smallest = smallest.unwrap_or_default();
        Ok(())
    }

    fn parent_of(&self, design: &Design, site: SiteId) -> PlaceResult<SiteId> {
        self.hybrid_parent.get(&site).copied().ok_or_else(|| {
            InternalError::new(format!(
                "hybrid site {} has no parent pattern",
                design.site(site).name
            ))
            .into()
        })
    }

    fn child_layer_info(
        &self,
        design: &Design,
        key: LayerKey,
        parent: SiteId,
        site_width: i32,
        offset: i32,
    ) -> GridInfo {
        let parent_site = design.site(parent);
        let pattern = parent_site
            .pattern
            .iter()
            .map(|e| PatternRow {
                site: e.site,
                orient: e.orient,
                height: design.site(e.site).height,
            })
            .collect::<Vec<_>>();

        let mut row_count = div_floor(self.core.dy(), parent_site.height);
        let mut remaining = self.core.dy() - row_count * parent_site.height;
        row_count *= pattern.len() as i32;
        for entry in &pattern {
            if remaining >= entry.height {
                remaining -= entry.height;
                row_count += 1;
            }
            if remaining <= 0 {
                break;
            }
        }

        GridInfo {
            key,
            row_count,
            site_count: div_floor(self.core.dx(), site_width),
            offset,
            pattern: RowPattern::Hybrid(pattern),
        }
    }

    fn init_pixels(&mut self, design: &Design, rows: &[&Row], max_dx: i32, max_dy: i32) {
        self.pixels = self
            .layers
            .iter()
            .map(|info| {
                let mut pixels = Vec::with_capacity((info.row_count * info.site_count).max(0) as usize);
                for y in 0..info.row_count {
                    let site = info.pattern.site_at_row(y);
                    pixels.extend((0..info.site_count).map(|_| Pixel {
                        site: Some(site),
                        ..Pixel::default()
                    }));
                }
                pixels
            })
            .collect();
        let mut reachable: Vec<Vec<bool>> =
            self.pixels.iter().map(|p| vec![false; p.len()]).collect();

        // Fragmented rows: only sites covered by a row are valid.
        for row in rows {
            let Some(key) = self.layer_of_site(row.site) else {
                continue;
            };
            let site = design.site(row.site);
            let x_start = div_floor(row.origin.x - self.core.x_min, site.width);
            let x_end = x_start + row.site_count;
            let rel_y = row.origin.y - self.core.y_min;
            let y_row = self.info(key).pattern.row_at(rel_y).0;
            let span = (x_start, x_end, max_dx, max_dy);
            self.open_row(&mut reachable, key, y_row, row.orient, span);

            // A parent row also opens the child rows it is made of.
            let mut y = rel_y;
            for entry in &site.pattern {
                if let Some(child) = self.layer_of_site(entry.site).filter(|&k| k != key) {
                    let child_row = self.info(child).pattern.row_at(y).0;
                    self.open_row(&mut reachable, child, child_row, entry.orient, span);
                }
                y += design.site(entry.site).height;
            }
        }

        for (pixels, reachable) in self.pixels.iter_mut().zip(&reachable) {
            for (pixel, &ok) in pixels.iter_mut().zip(reachable) {
                pixel.hopeless = !ok;
            }
        }
    }

    fn open_row(
        &mut self,
        reachable: &mut [Vec<bool>],
        key: LayerKey,
        y_row: i32,
        orient: Orient,
        (x_start, x_end, max_dx, max_dy): (i32, i32, i32, i32),
    ) {
        for x in x_start..x_end {
            if let Some(pixel) = self.pixel_mut(key, x, y_row) {
                pixel.valid = true;
                pixel.orient = orient;
            }
        }

        let info = self.info(key);
        let (site_count, row_count) = (info.site_count, info.row_count);
        let xl = (x_start - max_dx + HOPELESS_SAFETY).max(0);
        let xh = (x_end + max_dx - HOPELESS_SAFETY).min(site_count);
        let yl = (y_row - max_dy + HOPELESS_SAFETY).max(0);
        let yh = (y_row + max_dy - HOPELESS_SAFETY).min(row_count);
        for y in yl..yh {
            for x in xl..xh {
                if let Some(index) = self.flat(key, x, y) {
                    reachable[key.index()][index] = true;
                }
            }
        }
    }

    /// Paints fixed cells on every layer. Blocks also make their pixels
    /// hopeless so searches do not start on top of them.
    pub(crate) fn paint_fixed(&mut self, cells: &[Cell]) {
        for cell in cells.iter().filter(|c| c.fixed) {
            let key = cell.layer;
            let x = self.grid_padded_x(cell);
            let x_end = self.grid_padded_end_x(cell).max(x + 1);
            let y = self.cell_grid_y(cell);
            let y_end = self.cell_grid_end_y(cell);
            for layer in 0..self.layers.len() {
                let target = self.layers[layer].key;
                let (ly, ly_end) = self.mapped_rows(y, y_end, key, target);
                for gx in x..x_end {
                    for gy in ly..ly_end {
                        if let Some(pixel) = self.pixel_mut(target, gx, gy) {
                            pixel.cell = Some(cell.id);
                            if cell.is_block() {
                                pixel.hopeless = true;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Tags pixels fully inside a group region with the group and
    /// invalidates pixels that a region only partially covers.
    pub(crate) fn init_group_pixels(&mut self, groups: &[Group]) {
        if groups.iter().all(|g| g.regions.is_empty()) {
            return;
        }
        let site_width = self.site_width;
        for layer in 0..self.layers.len() {
            let info = &self.layers[layer];
            let (key, row_count, site_count) = (info.key, info.row_count, info.site_count);
            let rows: Vec<(i32, i32)> = (0..row_count)
                .map(|y| {
                    let bottom = info.pattern.row_bottom(y);
                    (bottom, bottom + info.pattern.row_height(y))
                })
                .collect();
            for (y, &(bottom, top)) in rows.iter().enumerate() {
                for x in 0..site_count {
                    let sub = Rect::new(x * site_width, bottom, (x + 1) * site_width, top);
                    let Some(pixel) = self.pixel_mut(key, x, y as i32) else {
                        continue;
                    };
                    for group in groups {
                        for region in &group.regions {
                            if region.contains(&sub) {
                                pixel.group = Some(group.id);
                            } else if region.overlaps(&sub) {
                                pixel.valid = false;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn examine_rows(design: &Design, rows: &[&Row]) -> PlaceResult<bool> {
    if rows.is_empty() {
        return Err(PlaceError::NoRows);
    }
    let hybrid = rows.iter().any(|r| design.site(r.site).hybrid);
    let non_hybrid = rows.iter().any(|r| !design.site(r.site).hybrid);
    if hybrid && non_hybrid {
        return Err(PlaceError::MixedHybridRows);
    }
    Ok(hybrid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GroupDef, Instance, PatternEntry, Site};
    use crate::placer::Placer;
    use sitewise_common::Point;
    use sitewise_config::SitewiseConfig;

    const A: SiteId = SiteId::from_raw(0);
    const B: SiteId = SiteId::from_raw(1);
    const AB: SiteId = SiteId::from_raw(2);

    /// Rows of a 250 high parent site made of a 100 high and a 150 high row.
    fn hybrid(core_height: i32) -> Design {
        let mut d = Design::new(Rect::new(0, 0, 1000, core_height));
        for (name, height) in [("a", 100), ("b", 150)] {
            d.add_site(Site {
                hybrid: true,
                ..Site::core(name, 10, height)
            });
        }
        d.add_site(Site {
            hybrid: true,
            pattern: vec![
                PatternEntry { site: A, orient: Orient::R0 },
                PatternEntry { site: B, orient: Orient::MX },
            ],
            ..Site::core("ab", 10, 250)
        });
        for i in 0..4 {
            d.add_row(Row {
                name: format!("r{i}"),
                site: AB,
                origin: Point::new(0, 250 * i),
                site_count: 100,
                orient: Orient::R0,
            });
        }
        d
    }

    fn uniform(core: Rect, heights: &[(i32, i32)]) -> Design {
        let mut d = Design::new(core);
        for &(height, count) in heights {
            let site = d.add_site(Site::core(format!("h{height}"), 10, height));
            d.add_uniform_rows(site, count);
        }
        d
    }

    #[test]
    fn hybrid_children_share_one_layer() {
        let grid = Grid::build(&hybrid(1100), Padding::default(), 500, 500).unwrap();
        assert!(grid.has_hybrid_rows());
        assert_eq!(grid.layers().len(), 2);

        let parent = grid.layer_of_site(AB).unwrap();
        let child = grid.layer_of_site(A).unwrap();
        assert_ne!(parent, child);
        assert_eq!(grid.layer_of_site(B), Some(child));
        assert_eq!(grid.hybrid_parent(A), Some(AB));
        assert_eq!(grid.hybrid_parent(B), Some(AB));

        // Four full periods plus one "a" row in the 100 units left over.
        assert_eq!(grid.info(parent).row_count, 4);
        assert_eq!(grid.info(child).row_count, 9);
        assert_eq!(grid.info(child).pattern.site_at_row(3), B);
        assert_eq!(grid.coordinate_to_height(3, child), 350);

        let pixel = |y| *grid.pixel(child, 0, y).unwrap();
        assert!(pixel(7).valid);
        assert_eq!(pixel(0).orient, Orient::R0);
        assert_eq!(pixel(1).orient, Orient::MX);
        assert_eq!(pixel(1).site, Some(B));
        assert!(!pixel(8).valid);
    }

    #[test]
    fn hybrid_rows_map_through_the_parent() {
        let grid = Grid::build(&hybrid(1000), Padding::default(), 500, 500).unwrap();
        let parent = grid.layer_of_site(AB).unwrap();
        let child = grid.layer_of_site(A).unwrap();

        assert_eq!(grid.map_y(3, child, parent, true), 1);
        assert_eq!(grid.map_y(1, child, parent, false), 1);
        assert_eq!(grid.map_y(1, parent, child, true), 2);
        assert_eq!(grid.mapped_rows(1, 2, child, parent), (0, 1));
        assert_eq!(grid.mapped_rows(1, 2, parent, child), (2, 4));
    }

    #[test]
    fn rows_must_exist_and_not_mix() {
        let mut d = Design::new(Rect::new(0, 0, 1000, 1000));
        d.add_site(Site::core("core", 10, 100));
        let err = Grid::build(&d, Padding::default(), 500, 500).unwrap_err();
        assert!(matches!(err, PlaceError::NoRows));

        let mut d = hybrid(1000);
        let plain = d.add_site(Site::core("plain", 10, 100));
        d.add_uniform_rows(plain, 1);
        let err = Grid::build(&d, Padding::default(), 500, 500).unwrap_err();
        assert!(matches!(err, PlaceError::MixedHybridRows));
    }

    #[test]
    fn pixels_far_from_rows_are_hopeless() {
        let mut d = Design::new(Rect::new(0, 0, 1000, 4000));
        let site = d.add_site(Site::core("core", 10, 100));
        d.add_row(Row {
            name: "short".into(),
            site,
            origin: Point::new(0, 0),
            site_count: 10,
            orient: Orient::R0,
        });
        let grid = Grid::build(&d, Padding::default(), 30, 30).unwrap();
        let key = grid.smallest_layer();
        let pixel = |x, y| *grid.pixel(key, x, y).unwrap();

        assert!(pixel(9, 0).valid);
        assert!(!pixel(10, 0).valid);
        assert!(!pixel(0, 1).valid);
        assert!(!pixel(19, 9).hopeless);
        assert!(pixel(20, 0).hopeless);
        assert!(pixel(0, 10).hopeless);
    }

    #[test]
    fn fixed_blocks_cover_every_layer() {
        let mut d = uniform(Rect::new(0, 0, 1000, 1000), &[(100, 10), (200, 5)]);
        let m = d.add_instance(Instance::fixed_block("m", 100, 200, Point::new(200, 400)));
        let placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let grid = placer.grid();
        let single = grid.layer_of_site(SiteId::from_raw(0)).unwrap();
        let double = grid.layer_of_site(SiteId::from_raw(1)).unwrap();

        for (key, x, y) in [(single, 20, 4), (single, 29, 5), (double, 29, 2)] {
            let pixel = grid.pixel(key, x, y).unwrap();
            assert_eq!(pixel.cell, Some(m));
            assert!(pixel.hopeless);
        }
        assert_eq!(grid.pixel(single, 30, 4).unwrap().cell, None);
        assert_eq!(grid.pixel(single, 20, 6).unwrap().cell, None);
        assert_eq!(grid.pixel(double, 20, 3).unwrap().cell, None);
    }

    #[test]
    fn regions_tag_whole_pixels_and_invalidate_partial_ones() {
        let mut d = uniform(Rect::new(0, 0, 1000, 1000), &[(100, 10), (200, 5)]);
        let g = d.add_group(GroupDef {
            name: "g".into(),
            regions: vec![Rect::new(0, 0, 205, 300)],
        });
        let placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        let grid = placer.grid();
        let single = grid.layer_of_site(SiteId::from_raw(0)).unwrap();
        let double = grid.layer_of_site(SiteId::from_raw(1)).unwrap();
        let pixel = |key, x, y| *grid.pixel(key, x, y).unwrap();

        assert_eq!(pixel(single, 0, 0).group, Some(g));
        assert_eq!(pixel(single, 19, 2).group, Some(g));
        assert!(pixel(single, 19, 2).valid);
        assert!(!pixel(single, 20, 0).valid);
        assert_eq!(pixel(single, 20, 0).group, None);
        assert!(pixel(single, 0, 3).valid);
        assert_eq!(pixel(single, 0, 3).group, None);

        assert_eq!(pixel(double, 0, 0).group, Some(g));
        assert!(!pixel(double, 0, 1).valid);
        assert!(pixel(double, 21, 1).valid);
    }
}
