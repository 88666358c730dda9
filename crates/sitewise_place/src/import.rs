//! Conversion between the design model and placer working state.

use crate::cell::{Cell, Group};
use crate::data::Design;
use crate::ids::{CellId, GroupId};
use crate::network::Network;
use sitewise_common::{Point, Rect};

/// Creates one cell per design instance, in instance order.
pub(crate) fn import_cells(design: &Design) -> Vec<Cell> {
    design
        .instances
        .iter()
        .enumerate()
        .map(|(i, inst)| {
            let site = inst.site.map(|s| design.site(s));
            Cell::from_instance(CellId::from_raw(i as u32), inst, site, design.core)
        })
        .collect()
}

/// Creates the groups with core-relative regions and collects their movable
/// members.
pub(crate) fn import_groups(design: &Design, cells: &[Cell]) -> Vec<Group> {
    let origin = design.core.ll();
    let mut groups: Vec<Group> = design
        .groups
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let regions = def
                .regions
                .iter()
                .map(|r| {
                    Rect::new(
                        r.x_min - origin.x,
                        r.y_min - origin.y,
                        r.x_max - origin.x,
                        r.y_max - origin.y,
                    )
                })
                .collect();
            Group::new(GroupId::from_raw(i as u32), def.name.clone(), regions)
        })
        .collect();
    for cell in cells.iter().filter(|c| !c.fixed) {
        if let Some(group) = cell.group.and_then(|g| groups.get_mut(g.index())) {
            group.cells.push(cell.id);
        }
    }
    groups
}

/// Builds the net connectivity.
pub(crate) fn import_network(design: &Design) -> Network {
    let mut network = Network::new(design.instances.len());
    for def in &design.nets {
        let net = network.add_net(def.name.clone());
        for pin in &def.pins {
            network.add_pin(net, pin.instance, pin.offset);
        }
    }
    network
}

/// Stores final origins of movable, placed cells whose location changed.
///
/// Returns the number of instances updated.
pub(crate) fn write_back(design: &mut Design, cells: &[Cell]) -> usize {
    let origin = design.core.ll();
    let mut updated = 0;
    for cell in cells.iter().filter(|c| !c.fixed && c.placed) {
        let location = Point::new(origin.x + cell.x, origin.y + cell.y);
        let inst = design.instance_mut(cell.id);
        if inst.location != location {
            inst.location = location;
            inst.orient = cell.orient;
            updated += 1;
        }
    }
    updated
}
