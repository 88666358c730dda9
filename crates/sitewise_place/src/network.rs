//! Net connectivity used by wirelength evaluation.

use crate::ids::{CellId, NetId, PinId};
use sitewise_common::Point;

/// A net as seen by the placer.
#[derive(Clone, Debug)]
pub struct Net {
    /// Net name.
    pub name: String,
    /// Connected pins.
    pub pins: Vec<PinId>,
}

/// A pin: a cell, a net, and an offset from the cell origin.
#[derive(Clone, Copy, Debug)]
pub struct Pin {
    /// Owning cell.
    pub cell: CellId,
    /// Connected net.
    pub net: NetId,
    /// Offset from the cell's lower-left corner.
    pub offset: Point,
}

/// Nets, pins, and the reverse cell-to-pin index.
#[derive(Clone, Debug, Default)]
pub struct Network {
    nets: Vec<Net>,
    pins: Vec<Pin>,
    cell_pins: Vec<Vec<PinId>>,
}

impl Network {
    /// Creates an empty network for `cell_count` cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            nets: Vec::new(),
            pins: Vec::new(),
            cell_pins: vec![Vec::new(); cell_count],
        }
    }

    /// Adds an empty net and returns its ID.
    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(Net {
            name: name.into(),
            pins: Vec::new(),
        });
        id
    }

    /// Connects `cell` to `net` and returns the new pin.
    pub fn add_pin(&mut self, net: NetId, cell: CellId, offset: Point) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(Pin { cell, net, offset });
        self.nets[net.index()].pins.push(id);
        if cell.index() >= self.cell_pins.len() {
            self.cell_pins.resize(cell.index() + 1, Vec::new());
        }
        self.cell_pins[cell.index()].push(id);
        id
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.index()]
    }

    /// Pins on `cell`.
    pub fn cell_pins(&self, cell: CellId) -> &[PinId] {
        self.cell_pins
            .get(cell.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Iterates over all net IDs.
    pub fn net_ids(&self) -> impl Iterator<Item = NetId> {
        (0..self.nets.len() as u32).map(NetId::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_are_indexed_both_ways() {
        let mut nw = Network::new(3);
        let n = nw.add_net("n0");
        let p0 = nw.add_pin(n, CellId::from_raw(0), Point::new(1, 2));
        let p1 = nw.add_pin(n, CellId::from_raw(2), Point::new(0, 0));
        assert_eq!(nw.net(n).pins, vec![p0, p1]);
        assert_eq!(nw.cell_pins(CellId::from_raw(2)), &[p1]);
        assert!(nw.cell_pins(CellId::from_raw(1)).is_empty());
        assert_eq!(nw.pin(p0).offset, Point::new(1, 2));
        assert_eq!(nw.net_count(), 1);
    }

    #[test]
    fn unknown_cell_has_no_pins() {
        let nw = Network::new(0);
        assert!(nw.cell_pins(CellId::from_raw(10)).is_empty());
    }
}
