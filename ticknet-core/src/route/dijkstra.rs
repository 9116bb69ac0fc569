use crate::{address::Address, route::RoutingTable, router::Router};

const INF: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
struct DistanceInfo {
    distance: u64,
    parent: Address,
    visited: bool,
}

impl Default for DistanceInfo {
    fn default() -> Self {
        Self {
            distance: INF,
            parent: Address::INVALID,
            visited: false,
        }
    }
}

/// Compute the routing table of the router at `source` over the current
/// state of the network.
///
/// This is single-source shortest path where the weight of the edge from
/// router `u` to its neighbor `v` is the current occupancy of `u`'s
/// output buffer toward `v` — routes steer around congestion, and an
/// idle network degenerates to hop-count routing with ties broken by
/// iteration order.
///
/// Unreachable routers are omitted from the table; an unknown `source`
/// yields an empty table.
pub fn compute_routing_table(routers: &[Router], source: Address) -> RoutingTable {
    let mut table = RoutingTable::new();

    let Some(source_index) = index_of(routers, source) else {
        return table;
    };

    let mut distances = vec![DistanceInfo::default(); routers.len()];
    distances[source_index].distance = 0;
    distances[source_index].parent = source;

    for _ in 0..routers.len() {
        // unvisited router of minimum finite distance, first wins on ties
        let Some(current) = min_unvisited(&distances) else {
            break;
        };
        distances[current].visited = true;

        for neighbor in routers[current].neighbor_addrs() {
            let Some(neighbor_index) = index_of(routers, neighbor) else {
                continue;
            };
            if distances[neighbor_index].visited {
                continue;
            }

            let load = routers[current].neighbor_buffer_usage(neighbor) as u64;
            let candidate = distances[current].distance + load;
            if candidate < distances[neighbor_index].distance {
                distances[neighbor_index].distance = candidate;
                distances[neighbor_index].parent = routers[current].addr();
            }
        }
    }

    for (index, info) in distances.iter().enumerate() {
        if index == source_index || info.distance == INF {
            continue;
        }

        // walk parents back toward the source; the node right before the
        // source is the next hop for this destination
        let mut next_hop = routers[index].addr();
        let mut parent = info.parent;
        while parent != source {
            next_hop = parent;
            let Some(parent_index) = index_of(routers, parent) else {
                break;
            };
            parent = distances[parent_index].parent;
        }

        table.set(routers[index].addr(), next_hop);
    }

    table
}

/// Recompute every router's table from scratch, in router order.
pub fn compute_all(routers: &[Router]) -> Vec<RoutingTable> {
    routers
        .iter()
        .map(|router| compute_routing_table(routers, router.addr()))
        .collect()
}

fn index_of(routers: &[Router], addr: Address) -> Option<usize> {
    routers.iter().position(|router| router.addr() == addr)
}

fn min_unvisited(distances: &[DistanceInfo]) -> Option<usize> {
    let mut min = INF;
    let mut found = None;
    for (index, info) in distances.iter().enumerate() {
        if !info.visited && info.distance < min {
            min = info.distance;
            found = Some(index);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{packet::Packet, router::RouterConfig};

    fn router(id: u8) -> Router {
        Router::new(Address::router(id), RouterConfig::default()).unwrap()
    }

    fn link(routers: &mut [Router], a: usize, b: usize) {
        let addr_a = routers[a].addr();
        let addr_b = routers[b].addr();
        routers[a].connect_router(addr_b).unwrap();
        routers[b].connect_router(addr_a).unwrap();
    }

    fn preload(routers: &mut [Router], from: usize, toward: Address, count: usize) {
        let buffer = routers[from].neighbor_buffer_mut(toward).unwrap();
        for pos in 0..count {
            let filler = Packet::new(
                9_999,
                pos as u32,
                count as u32,
                Address::new(1, 1),
                Address::new(2, 1),
                1_000,
            )
            .unwrap();
            assert!(buffer.enqueue(filler));
        }
    }

    #[test]
    fn line_topology() {
        let mut routers = vec![router(1), router(2), router(3)];
        link(&mut routers, 0, 1);
        link(&mut routers, 1, 2);

        let table = compute_routing_table(&routers, Address::router(1));

        assert_eq!(table.size(), 2);
        assert_eq!(table.next_hop(Address::router(2)), Address::router(2));
        assert_eq!(table.next_hop(Address::router(3)), Address::router(2));
    }

    #[test]
    fn congestion_steers_around_the_loaded_edge() {
        // diamond R1-{R2,R3}-R4 plus the direct edge R1-R4
        let mut routers = vec![router(1), router(2), router(3), router(4)];
        link(&mut routers, 0, 1);
        link(&mut routers, 0, 2);
        link(&mut routers, 1, 3);
        link(&mut routers, 2, 3);
        link(&mut routers, 0, 3);

        preload(&mut routers, 0, Address::router(4), 20);
        preload(&mut routers, 0, Address::router(2), 5);

        let table = compute_routing_table(&routers, Address::router(1));

        assert_eq!(table.next_hop(Address::router(4)), Address::router(3));
    }

    #[test]
    fn unreachable_routers_are_omitted() {
        let mut routers = vec![router(1), router(2), router(3)];
        link(&mut routers, 0, 1);
        // router 3 has no link at all

        let table = compute_routing_table(&routers, Address::router(1));

        assert_eq!(table.size(), 1);
        assert_eq!(table.next_hop(Address::router(3)), Address::INVALID);
    }

    #[test]
    fn unknown_source_yields_an_empty_table() {
        let routers = vec![router(1)];
        let table = compute_routing_table(&routers, Address::router(9));
        assert!(table.is_empty());
    }

    /// Tracing next-hops from the source must reach every destination in
    /// at most `router_count` steps.
    #[test]
    fn routes_are_loop_free() {
        let mut routers: Vec<Router> = (1..=6).map(router).collect();
        // ring plus a chord
        for i in 0..6 {
            link(&mut routers, i, (i + 1) % 6);
        }
        link(&mut routers, 0, 3);
        preload(&mut routers, 0, Address::router(2), 7);

        let tables = compute_all(&routers);
        assert_eq!(tables.len(), routers.len());

        for source in routers.iter().map(Router::addr) {
            for destination in routers.iter().map(Router::addr) {
                if destination == source {
                    continue;
                }
                let mut current = source;
                let mut hops = 0;
                while current != destination {
                    let index = index_of(&routers, current).unwrap();
                    let next = tables[index].next_hop(destination);
                    assert!(next.is_valid(), "no route from {current} to {destination}");
                    current = next;
                    hops += 1;
                    assert!(hops <= routers.len(), "routing loop toward {destination}");
                }
            }
        }
    }
}
