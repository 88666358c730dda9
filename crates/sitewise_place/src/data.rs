//! Database-facing design model.
//!
//! A [`Design`] is what the placer consumes and writes back to: the core
//! area, site definitions, rows, instances, groups and nets. All coordinates
//! are absolute database units. The placer converts them to core-relative
//! working state on import and only touches the design again in
//! [`Placer::write_back`](crate::Placer::write_back).

use crate::ids::{CellId, GroupId, NetId, SiteId};
use serde::{Deserialize, Serialize};
use sitewise_common::{Point, Rect};
use std::collections::HashMap;

/// Orientation of a row or instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Orient {
    /// North.
    #[default]
    R0,
    /// Flipped south.
    MX,
    /// Flipped north.
    MY,
    /// South.
    R180,
}

/// Class of a site. Pad sites are ignored by the placer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum SiteClass {
    /// Standard cell core site.
    #[default]
    Core,
    /// I/O pad site.
    Pad,
}

/// One element of a hybrid site's row pattern.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PatternEntry {
    /// The child site used by this row of the pattern.
    pub site: SiteId,
    /// Orientation of that row.
    pub orient: Orient,
}

/// A placement site definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Site {
    /// Site name.
    pub name: String,
    /// Width in database units.
    pub width: i32,
    /// Height in database units.
    pub height: i32,
    /// Site class.
    pub class: SiteClass,
    /// Whether the site takes part in a hybrid row pattern.
    pub hybrid: bool,
    /// Row pattern of a hybrid parent site; empty for other sites.
    pub pattern: Vec<PatternEntry>,
}

impl Site {
    /// Creates a plain core site.
    pub fn core(name: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            class: SiteClass::Core,
            hybrid: false,
            pattern: Vec::new(),
        }
    }

    /// Returns `true` if this site defines a row pattern.
    pub fn has_row_pattern(&self) -> bool {
        !self.pattern.is_empty()
    }
}

/// A placement row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Row {
    /// Row name.
    pub name: String,
    /// The site repeated along the row.
    pub site: SiteId,
    /// Lower-left corner of the first site.
    pub origin: Point,
    /// Number of sites in the row.
    pub site_count: i32,
    /// Row orientation.
    pub orient: Orient,
}

/// What kind of master an instance is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum InstanceKind {
    /// A standard cell that snaps to rows and sites.
    #[default]
    StdCell,
    /// A macro or other block that is not row based.
    Block,
}

/// A placed or unplaced instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name, unique within the design.
    pub name: String,
    /// Master width in database units.
    pub width: i32,
    /// Master height in database units.
    pub height: i32,
    /// Current lower-left location.
    pub location: Point,
    /// Current orientation.
    pub orient: Orient,
    /// Master kind.
    pub kind: InstanceKind,
    /// Site of the master, required for standard cells.
    pub site: Option<SiteId>,
    /// Fixed instances never move and act as blockages.
    pub fixed: bool,
    /// Optional placement group.
    pub group: Option<GroupId>,
    /// Per-instance `(left, right)` padding in sites, overriding the default.
    pub padding: Option<(i32, i32)>,
}

impl Instance {
    /// Creates a movable standard cell instance.
    pub fn std_cell(
        name: impl Into<String>,
        site: SiteId,
        width: i32,
        height: i32,
        location: Point,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            location,
            orient: Orient::R0,
            kind: InstanceKind::StdCell,
            site: Some(site),
            fixed: false,
            group: None,
            padding: None,
        }
    }

    /// Creates a fixed block instance.
    pub fn fixed_block(name: impl Into<String>, width: i32, height: i32, location: Point) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            location,
            orient: Orient::R0,
            kind: InstanceKind::Block,
            site: None,
            fixed: true,
            group: None,
            padding: None,
        }
    }

    /// Bounding box at the current location.
    pub fn bbox(&self) -> Rect {
        Rect::from_origin(self.location, self.width, self.height)
    }
}

/// A named placement group made of region rectangles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupDef {
    /// Group name.
    pub name: String,
    /// Region rectangles in absolute coordinates.
    pub regions: Vec<Rect>,
}

/// A connection of a net to an instance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NetPin {
    /// The connected instance.
    pub instance: CellId,
    /// Pin offset relative to the instance origin.
    pub offset: Point,
}

/// A net connecting instance pins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetDef {
    /// Net name.
    pub name: String,
    /// Connected pins.
    pub pins: Vec<NetPin>,
}

/// The design handed to the placer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    /// Core area; row geometry is measured relative to its lower-left corner.
    pub core: Rect,
    /// All site definitions.
    pub sites: Vec<Site>,
    /// All rows.
    pub rows: Vec<Row>,
    /// All instances.
    pub instances: Vec<Instance>,
    /// All placement groups.
    pub groups: Vec<GroupDef>,
    /// All nets.
    pub nets: Vec<NetDef>,
    /// Auxiliary index: instance name to ID (rebuilt on deserialization).
    #[serde(skip)]
    pub instance_by_name: HashMap<String, CellId>,
}

impl Design {
    /// Creates an empty design with the given core area.
    pub fn new(core: Rect) -> Self {
        Self {
            core,
            sites: Vec::new(),
            rows: Vec::new(),
            instances: Vec::new(),
            groups: Vec::new(),
            nets: Vec::new(),
            instance_by_name: HashMap::new(),
        }
    }

    /// Adds a site and returns its ID.
    pub fn add_site(&mut self, site: Site) -> SiteId {
        let id = SiteId::from_raw(self.sites.len() as u32);
        self.sites.push(site);
        id
    }

    /// Adds a row.
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Adds `count` abutting rows of `site` starting at the core's lower-left
    /// corner, each spanning the full core width.
    pub fn add_uniform_rows(&mut self, site: SiteId, count: i32) {
        let (width, height) = {
            let s = self.site(site);
            (s.width, s.height)
        };
        let site_count = self.core.dx() / width;
        for i in 0..count {
            let orient = if i % 2 == 0 { Orient::R0 } else { Orient::MX };
            self.rows.push(Row {
                name: format!("ROW_{}", self.rows.len()),
                site,
                origin: Point::new(self.core.x_min, self.core.y_min + i * height),
                site_count,
                orient,
            });
        }
    }

    /// Adds an instance and returns its ID.
    pub fn add_instance(&mut self, inst: Instance) -> CellId {
        let id = CellId::from_raw(self.instances.len() as u32);
        self.instance_by_name.insert(inst.name.clone(), id);
        self.instances.push(inst);
        id
    }

    /// Adds a group and returns its ID.
    pub fn add_group(&mut self, group: GroupDef) -> GroupId {
        let id = GroupId::from_raw(self.groups.len() as u32);
        self.groups.push(group);
        id
    }

    /// Adds a net and returns its ID.
    pub fn add_net(&mut self, net: NetDef) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(net);
        id
    }

    /// Returns the site with the given ID.
    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.index()]
    }

    /// Returns the instance with the given ID.
    pub fn instance(&self, id: CellId) -> &Instance {
        &self.instances[id.index()]
    }

    /// Returns a mutable reference to the instance with the given ID.
    pub fn instance_mut(&mut self, id: CellId) -> &mut Instance {
        &mut self.instances[id.index()]
    }

    /// Looks up an instance by name.
    pub fn find_instance(&self, name: &str) -> Option<CellId> {
        self.instance_by_name.get(name).copied()
    }

    /// Rows the placer works with: every row whose site is not a pad site.
    pub fn placement_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(move |r| self.site(r.site).class != SiteClass::Pad)
    }

    /// Rebuilds auxiliary indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.instance_by_name = self
            .instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.name.clone(), CellId::from_raw(i as u32)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_design() -> Design {
        let mut d = Design::new(Rect::new(100, 200, 1100, 1200));
        let site = d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(site, 10);
        d.add_instance(Instance::std_cell("u1", site, 20, 100, Point::new(150, 300)));
        d
    }

    #[test]
    fn uniform_rows_span_core() {
        let d = small_design();
        assert_eq!(d.rows.len(), 10);
        assert_eq!(d.rows[0].origin, Point::new(100, 200));
        assert_eq!(d.rows[3].origin, Point::new(100, 500));
        assert_eq!(d.rows[0].site_count, 100);
        assert_eq!(d.rows[1].orient, Orient::MX);
    }

    #[test]
    fn pad_rows_are_skipped() {
        let mut d = small_design();
        let mut pad = Site::core("pad", 10, 100);
        pad.class = SiteClass::Pad;
        let pad = d.add_site(pad);
        d.add_row(Row {
            name: "io".into(),
            site: pad,
            origin: Point::new(100, 200),
            site_count: 4,
            orient: Orient::R0,
        });
        assert_eq!(d.rows.len(), 11);
        assert_eq!(d.placement_rows().count(), 10);
    }

    #[test]
    fn instance_lookup() {
        let d = small_design();
        let id = d.find_instance("u1").unwrap();
        assert_eq!(d.instance(id).bbox(), Rect::new(150, 300, 170, 400));
        assert!(d.find_instance("nope").is_none());
    }

    #[test]
    fn serde_rebuilds_index() {
        let d = small_design();
        let json = serde_json::to_string(&d).unwrap();
        let mut back: Design = serde_json::from_str(&json).unwrap();
        assert!(back.find_instance("u1").is_none());
        back.rebuild_indices();
        assert_eq!(back.find_instance("u1"), Some(CellId::from_raw(0)));
    }
}
