//! Route planning: the per-router next-hop table and the load-weighted
//! shortest-path computation that refreshes it.

mod dijkstra;

pub use self::dijkstra::{compute_all, compute_routing_table};

use crate::address::Address;
use std::collections::HashMap;

/// Maps a destination router to the neighbor a packet must be forwarded
/// to in order to make progress toward it.
///
/// Only the router part of an address matters here: a packet for terminal
/// `r.t` routes exactly like one for the router `r.0`. A destination with
/// no entry has no route, and [`RoutingTable::next_hop`] returns
/// [`Address::INVALID`].
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: HashMap<Address, Address>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The neighbor router to forward to for `dst`, or
    /// [`Address::INVALID`] when no route is known.
    pub fn next_hop(&self, dst: Address) -> Address {
        self.entries
            .get(&dst.router_part())
            .copied()
            .unwrap_or(Address::INVALID)
    }

    /// Record (or replace) the next hop toward the router of `dst`.
    pub fn set(&mut self, dst: Address, next_hop: Address) {
        self.entries.insert(dst.router_part(), next_hop.router_part());
    }

    /// Number of reachable destination routers.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_route_yields_the_invalid_sentinel() {
        let table = RoutingTable::new();
        assert_eq!(table.next_hop(Address::router(7)), Address::INVALID);
        assert!(table.is_empty());
    }

    #[test]
    fn terminal_addresses_route_like_their_router() {
        let mut table = RoutingTable::new();
        table.set(Address::router(7), Address::router(2));

        assert_eq!(table.next_hop(Address::router(7)), Address::router(2));
        assert_eq!(table.next_hop(Address::new(7, 42)), Address::router(2));
        assert_eq!(table.next_hop(Address::new(8, 42)), Address::INVALID);
    }

    #[test]
    fn set_is_an_upsert() {
        let mut table = RoutingTable::new();
        table.set(Address::router(7), Address::router(2));
        table.set(Address::new(7, 3), Address::router(4));

        assert_eq!(table.size(), 1);
        assert_eq!(table.next_hop(Address::router(7)), Address::router(4));
    }
}
