use crate::{
    address::Address,
    network::{Network, NetworkConfig, NetworkError},
    router::Router,
    terminal::Terminal,
    traffic::RandomTraffic,
};
use rand::Rng as _;
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::sync::Arc;
use tracing::info;

/// Seeds a random router graph and terminal population.
///
/// The graph is built in two passes: a spanning-tree pass (every router
/// after the first links to a uniformly random earlier one, so the
/// network is always connected) and then `complexity` extra random edges
/// per router. Self-loops and duplicate links collapse into no-ops, so
/// `complexity` is an upper bound, not a promise.
///
/// Every terminal gets a [`RandomTraffic`] source. All randomness —
/// graph shape and traffic alike — derives from `config.seed`, so the
/// same configuration always produces the same simulation.
///
/// # Example
///
/// ```
/// # use ticknet_core::{NetworkConfig, TopologyBuilder};
/// let mut network = TopologyBuilder::new(NetworkConfig::default()).build()?;
/// network.simulate(100);
///
/// let stats = network.stats();
/// assert_eq!(stats.current_tick, 100);
/// assert!(stats.pages_created > 0);
/// # Ok::<(), ticknet_core::NetworkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    config: NetworkConfig,
}

impl TopologyBuilder {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Network, NetworkError> {
        let config = self.config;
        let mut rng = ChaChaRng::seed_from_u64(config.seed);

        let mut network = Network::new();
        network.set_route_refresh_interval(config.route_refresh_interval);

        // routers are numbered from 1: router id 0 would collide with the
        // reserved invalid address
        for router_id in 1..=config.router_count {
            network.add_router(Router::new(Address::router(router_id), config.router)?)?;

            for terminal_id in 1..=config.max_terminal_count {
                let mut terminal =
                    Terminal::new(Address::new(router_id, terminal_id), config.terminal)?;
                terminal.set_ttls(config.packet_ttl, config.max_assembler_ttl);
                network.connect_terminal(terminal)?;
            }
        }

        let book = network.rebuild_address_book();
        for addr in book.iter().copied() {
            let source = RandomTraffic::from_seed(
                addr,
                Arc::clone(&book),
                config.traffic_probability,
                config.max_page_len,
                rng.gen(),
            );
            if let Some(terminal) = network.terminal_mut(addr) {
                terminal.attach_source(Box::new(source));
            }
        }

        let routers: Vec<Address> = network.routers().iter().map(Router::addr).collect();

        // spanning tree: router i links to a random earlier router
        for i in 1..routers.len() {
            let j = rng.gen_range(0..i);
            network.establish_link(routers[i], routers[j])?;
        }

        // extra edges; self-loops and duplicates are no-ops
        if !routers.is_empty() {
            for i in 0..routers.len() {
                for _ in 0..config.complexity {
                    let j = rng.gen_range(0..routers.len());
                    network.establish_link(routers[i], routers[j])?;
                }
            }
        }

        network.recompute_routes();
        info!(
            routers = routers.len(),
            terminals = book.len(),
            seed = config.seed,
            "random topology built"
        );

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_requested_population() {
        let config = NetworkConfig {
            router_count: 7,
            max_terminal_count: 2,
            ..NetworkConfig::default()
        };
        let network = TopologyBuilder::new(config).build().unwrap();

        assert_eq!(network.routers().len(), 7);
        assert_eq!(network.address_book().len(), 14);
        let stats = network.stats();
        assert_eq!(stats.total_routers, 7);
        assert_eq!(stats.total_terminals, 14);
    }

    #[test]
    fn spanning_tree_makes_every_router_reachable() {
        let config = NetworkConfig {
            router_count: 12,
            max_terminal_count: 1,
            complexity: 0,
            seed: 7,
            ..NetworkConfig::default()
        };
        let network = TopologyBuilder::new(config).build().unwrap();

        // with zero load everywhere, every router has a route to every
        // other router right after construction
        for router in network.routers() {
            assert_eq!(router.routing_table().size(), 11);
        }
    }

    #[test]
    fn links_are_bidirectional() {
        let config = NetworkConfig {
            router_count: 6,
            max_terminal_count: 1,
            seed: 3,
            ..NetworkConfig::default()
        };
        let network = TopologyBuilder::new(config).build().unwrap();

        for router in network.routers() {
            for neighbor in router.neighbor_addrs() {
                let other = network.router(neighbor).unwrap();
                assert!(other.is_neighbor(router.addr()));
            }
        }
    }

    #[test]
    fn single_router_topologies_are_fine() {
        let config = NetworkConfig {
            router_count: 1,
            max_terminal_count: 2,
            ..NetworkConfig::default()
        };
        let mut network = TopologyBuilder::new(config).build().unwrap();
        network.simulate(60);

        // local traffic still flows
        assert!(network.stats().pages_completed > 0);
    }

    #[test]
    fn identical_seeds_build_identical_graphs() {
        let config = NetworkConfig {
            router_count: 9,
            seed: 11,
            ..NetworkConfig::default()
        };
        let a = TopologyBuilder::new(config).build().unwrap();
        let b = TopologyBuilder::new(config).build().unwrap();

        for (ra, rb) in a.routers().iter().zip(b.routers()) {
            assert_eq!(ra.addr(), rb.addr());
            assert_eq!(
                ra.neighbor_addrs().collect::<Vec<_>>(),
                rb.neighbor_addrs().collect::<Vec<_>>(),
            );
        }
    }
}
