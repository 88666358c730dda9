//! Opaque ID newtypes for placer entities.
//!
//! All IDs are thin `u32` wrappers used as arena indices. They are `Copy`,
//! `Hash`, ordered, and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the ID as a `usize` arena index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// ID of an instance in the design and of the matching placer cell.
    CellId
);

define_id!(
    /// ID of a placement group (a named set of region rectangles).
    GroupId
);

define_id!(
    /// ID of a net.
    NetId
);

define_id!(
    /// ID of a pin connecting a cell to a net.
    PinId
);

define_id!(
    /// ID of a site definition.
    SiteId
);

define_id!(
    /// ID of a row segment owned by the detailed improvement engine.
    SegmentId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn roundtrip() {
        assert_eq!(CellId::from_raw(42).as_raw(), 42);
        assert_eq!(SiteId::from_raw(7).index(), 7);
    }

    #[test]
    fn equality_and_order() {
        assert_eq!(GroupId::from_raw(3), GroupId::from_raw(3));
        assert!(SegmentId::from_raw(1) < SegmentId::from_raw(2));
    }

    #[test]
    fn hash_in_set() {
        let mut set = HashSet::new();
        set.insert(NetId::from_raw(1));
        set.insert(NetId::from_raw(2));
        set.insert(NetId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let id = PinId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: PinId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", CellId::from_raw(9)), "9");
    }
}
