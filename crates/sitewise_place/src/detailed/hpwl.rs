//! Half-perimeter wirelength.

use crate::cell::Cell;
use crate::ids::{CellId, NetId, PinId};
use crate::network::Network;
use sitewise_common::{Point, Rect};
use std::collections::BTreeMap;

fn pin_position(cells: &[Cell], network: &Network, pin: PinId, at: Option<Point>) -> Point {
    let pin = network.pin(pin);
    let origin = at.unwrap_or_else(|| cells[pin.cell.index()].location());
    Point::new(origin.x + pin.offset.x, origin.y + pin.offset.y)
}

/// Bounding box of a net's pins. `moved` overrides cell origins.
fn net_box(
    cells: &[Cell],
    network: &Network,
    net: NetId,
    moved: &BTreeMap<CellId, Point>,
) -> Option<Rect> {
    let mut pins = network.net(net).pins.iter().map(|&pin| {
        let owner = network.pin(pin).cell;
        pin_position(cells, network, pin, moved.get(&owner).copied())
    });
    let first = pins.next()?;
    let mut bbox = Rect::new(first.x, first.y, first.x, first.y);
    for p in pins {
        bbox.merge(&Rect::new(p.x, p.y, p.x, p.y));
    }
    Some(bbox)
}

fn box_hpwl(bbox: Option<Rect>) -> i64 {
    bbox.map_or(0, |b| b.dx() as i64 + b.dy() as i64)
}

/// Wirelength of one net at the cells' current locations.
pub fn net_hpwl(cells: &[Cell], network: &Network, net: NetId) -> i64 {
    box_hpwl(net_box(cells, network, net, &BTreeMap::new()))
}

/// Total wirelength over all nets.
pub fn total_hpwl(cells: &[Cell], network: &Network) -> i64 {
    network
        .net_ids()
        .map(|net| net_hpwl(cells, network, net))
        .sum()
}

/// Per-net visit stamps, so a net shared by several moved cells is counted
/// once per evaluation.
#[derive(Debug, Default)]
pub(crate) struct NetStamps {
    stamps: Vec<u64>,
    traversal: u64,
}

impl NetStamps {
    pub(crate) fn new(net_count: usize) -> Self {
        Self {
            stamps: vec![0; net_count],
            traversal: 0,
        }
    }

    fn next(&mut self) {
        self.traversal += 1;
    }

    /// Marks `net` visited; returns `false` if it already was.
    fn visit(&mut self, net: NetId) -> bool {
        let stamp = &mut self.stamps[net.index()];
        if *stamp == self.traversal {
            return false;
        }
        *stamp = self.traversal;
        true
    }
}

/// Wirelength `(before, after)` of the nets touching the moved cells.
///
/// `before` evaluates the moved cells at `original`; `after` at their current
/// locations. Nets with one pin, or with `skip` pins or more, are ignored.
pub(crate) fn hpwl_delta(
    cells: &[Cell],
    network: &Network,
    stamps: &mut NetStamps,
    original: &BTreeMap<CellId, Point>,
    skip: usize,
) -> (i64, i64) {
    stamps.next();
    let current = BTreeMap::new();
    let (mut before, mut after) = (0, 0);
    for &cell in original.keys() {
        for &pin in network.cell_pins(cell) {
            let net = network.pin(pin).net;
            let npins = network.net(net).pins.len();
            if npins <= 1 || npins >= skip || !stamps.visit(net) {
                continue;
            }
            before += box_hpwl(net_box(cells, network, net, original));
            after += box_hpwl(net_box(cells, network, net, &current));
        }
    }
    (before, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Instance;
    use crate::ids::SiteId;

    fn cells() -> Vec<Cell> {
        let core = Rect::new(0, 0, 1000, 1000);
        [(0, 0), (100, 50), (300, 0)]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let inst = Instance::std_cell(format!("c{i}"), SiteId::from_raw(0), 10, 10, Point::new(x, y));
                Cell::from_instance(CellId::from_raw(i as u32), &inst, None, core)
            })
            .collect()
    }

    fn network() -> Network {
        let mut network = Network::new(3);
        let n0 = network.add_net("n0");
        network.add_pin(n0, CellId::from_raw(0), Point::new(5, 5));
        network.add_pin(n0, CellId::from_raw(1), Point::new(0, 0));
        let n1 = network.add_net("n1");
        network.add_pin(n1, CellId::from_raw(1), Point::new(0, 0));
        network.add_pin(n1, CellId::from_raw(2), Point::new(0, 0));
        let lone = network.add_net("lone");
        network.add_pin(lone, CellId::from_raw(2), Point::new(0, 0));
        network
    }

    #[test]
    fn pins_sit_at_origin_plus_offset() {
        let (cells, network) = (cells(), network());
        assert_eq!(net_hpwl(&cells, &network, NetId::from_raw(0)), 95 + 45);
        assert_eq!(net_hpwl(&cells, &network, NetId::from_raw(1)), 200 + 50);
        assert_eq!(net_hpwl(&cells, &network, NetId::from_raw(2)), 0);
        assert_eq!(total_hpwl(&cells, &network), 140 + 250);
    }

    #[test]
    fn delta_counts_each_net_once() {
        let mut cells = cells();
        let network = network();
        let mut stamps = NetStamps::new(network.net_count());
        let mut original = BTreeMap::new();
        original.insert(CellId::from_raw(1), cells[1].location());
        original.insert(CellId::from_raw(2), cells[2].location());
        cells[1].x = 200;
        cells[1].y = 0;

        let (before, after) = hpwl_delta(&cells, &network, &mut stamps, &original, 100);
        assert_eq!(before, 140 + 250);
        assert_eq!(after, 195 + 5 + 100);

        let (before, after) = hpwl_delta(&cells, &network, &mut stamps, &original, 2);
        assert_eq!((before, after), (0, 0));
    }
}
