//! The network arena: exclusive owner of every router (and, through
//! them, every terminal), driver of the tick loop and of the periodic
//! route refresh.

mod topology;

pub use self::topology::TopologyBuilder;

use crate::{
    address::Address,
    clock::{Clock, Tick},
    defaults,
    route,
    router::{Router, RouterConfig, RouterError},
    stats::NetworkStats,
    terminal::{Terminal, TerminalConfig, TerminalError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Global knobs of a simulation, consumed by [`TopologyBuilder`].
///
/// Capacities of `0` mean unbounded; see [`defaults`](crate::defaults)
/// for every default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    /// Number of routers in the network.
    pub router_count: u8,
    /// Terminals hosted by each router.
    pub max_terminal_count: u8,
    /// Additional random edges per router beyond the spanning tree.
    pub complexity: usize,
    /// Per-tick, per-terminal chance of emitting a new page.
    pub traffic_probability: f64,
    /// Cap for random page lengths.
    pub max_page_len: u32,
    /// Packet lifetime relative to its creation tick.
    pub packet_ttl: Tick,
    /// Reassembler lifetime relative to its creation tick.
    pub max_assembler_ttl: Tick,
    /// Recompute all routes every this many ticks (`0` = only at the end
    /// of a simulation).
    pub route_refresh_interval: u64,
    /// Seed for every random decision: topology and traffic alike.
    pub seed: u64,
    pub router: RouterConfig,
    pub terminal: TerminalConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            router_count: 6,
            max_terminal_count: 3,
            complexity: 1,
            traffic_probability: 0.2,
            max_page_len: 8,
            packet_ttl: defaults::PACKET_TTL,
            max_assembler_ttl: defaults::MAX_ASSEMBLER_TTL,
            route_refresh_interval: defaults::ROUTE_REFRESH_INTERVAL,
            seed: 42,
            router: RouterConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("a router at {0} already exists")]
    DuplicateRouter(Address),
    #[error("no router at {0}")]
    UnknownRouter(Address),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// The simulated network.
///
/// Owns the routers in a fixed order (the order they were added), which
/// is also the order they are ticked in — the whole simulation is
/// single-threaded and tick-synchronous, so this order is part of the
/// semantics: see [`Network::tick`].
pub struct Network {
    routers: Vec<Router>,
    clock: Clock,
    /// every terminal address, for traffic generation
    address_book: Arc<Vec<Address>>,
    route_refresh_interval: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network. Use [`Network::add_router`],
    /// [`Network::connect_terminal`] and [`Network::establish_link`] to
    /// populate it by hand, or [`TopologyBuilder`] for a random topology.
    pub fn new() -> Self {
        Self {
            routers: Vec::new(),
            clock: Clock::new(),
            address_book: Arc::new(Vec::new()),
            route_refresh_interval: defaults::ROUTE_REFRESH_INTERVAL,
        }
    }

    /// The tick the next [`Network::tick`] call will execute.
    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.clock.now()
    }

    pub fn set_route_refresh_interval(&mut self, interval: u64) {
        self.route_refresh_interval = interval;
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn router(&self, addr: Address) -> Option<&Router> {
        self.routers.iter().find(|r| r.addr() == addr.router_part())
    }

    pub fn router_mut(&mut self, addr: Address) -> Option<&mut Router> {
        self.routers
            .iter_mut()
            .find(|r| r.addr() == addr.router_part())
    }

    pub fn terminal(&self, addr: Address) -> Option<&Terminal> {
        self.router(addr)?.terminal(addr)
    }

    pub fn terminal_mut(&mut self, addr: Address) -> Option<&mut Terminal> {
        self.router_mut(addr)?.terminal_mut(addr)
    }

    /// Every terminal address in the network, in router order.
    pub fn address_book(&self) -> &Arc<Vec<Address>> {
        &self.address_book
    }

    /// Add a router to the arena. Routers tick in insertion order.
    pub fn add_router(&mut self, router: Router) -> Result<(), NetworkError> {
        if self.router(router.addr()).is_some() {
            return Err(NetworkError::DuplicateRouter(router.addr()));
        }
        self.routers.push(router);
        Ok(())
    }

    /// Hand a terminal to the router its address belongs to.
    pub fn connect_terminal(&mut self, terminal: Terminal) -> Result<(), NetworkError> {
        let router = self
            .router_mut(terminal.router())
            .ok_or(NetworkError::UnknownRouter(terminal.router()))?;
        router.connect_terminal(terminal)?;
        Ok(())
    }

    /// Create the bidirectional link between two routers. Linking a
    /// router to itself is a no-op, as is re-linking existing neighbors.
    pub fn establish_link(&mut self, a: Address, b: Address) -> Result<(), NetworkError> {
        if a == b {
            return Ok(());
        }
        if self.router(a).is_none() {
            return Err(NetworkError::UnknownRouter(a));
        }
        if self.router(b).is_none() {
            return Err(NetworkError::UnknownRouter(b));
        }

        self.router_mut(a)
            .expect("presence checked above")
            .connect_router(b)?;
        self.router_mut(b)
            .expect("presence checked above")
            .connect_router(a)?;
        Ok(())
    }

    /// Rebuild the global address book from the connected terminals.
    ///
    /// Called by [`TopologyBuilder`] once the population is final;
    /// hand-built networks that attach [`RandomTraffic`] sources should
    /// call it themselves.
    ///
    /// [`RandomTraffic`]: crate::traffic::RandomTraffic
    pub fn rebuild_address_book(&mut self) -> Arc<Vec<Address>> {
        let book: Vec<Address> = self
            .routers
            .iter()
            .flat_map(Router::terminal_addrs)
            .collect();
        self.address_book = Arc::new(book);
        Arc::clone(&self.address_book)
    }

    /// Recompute every router's routing table from the current buffer
    /// loads.
    pub fn recompute_routes(&mut self) {
        let tables = route::compute_all(&self.routers);
        for (router, table) in self.routers.iter_mut().zip(tables) {
            router.set_routing_table(table);
        }
        debug!(tick = self.clock.now(), "routing tables recomputed");
    }

    /// Execute one tick: every router, in ownership order, runs its four
    /// stages (emit, deliver locally, tick terminals, route input); then
    /// the clock advances.
    ///
    /// Emissions cross the arena here: a packet leaving router `u` toward
    /// neighbor `v` lands in `v`'s input buffer immediately, but `v` will
    /// only route it when its own `process_in` stage runs — in this tick
    /// if `v` ticks after `u`, otherwise in the next one. Either way it
    /// cannot be re-emitted before the next tick, so a hop costs at least
    /// one tick.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        for index in 0..self.routers.len() {
            let emissions = self.routers[index].tick(now);
            for (neighbor, packet) in emissions {
                // connect_router guarantees the neighbor is in the arena
                if let Some(router) = self.router_mut(neighbor) {
                    router.receive_packet(packet);
                }
            }
        }
        self.clock.advance();
    }

    /// Run `ticks` ticks, recomputing all routes every
    /// `route_refresh_interval` ticks and once more at the end.
    pub fn simulate(&mut self, ticks: u64) {
        for i in 0..ticks {
            self.tick();
            if self.route_refresh_interval > 0 && i % self.route_refresh_interval == 0 {
                self.recompute_routes();
            }
        }
        self.recompute_routes();
    }

    /// Aggregate every router's and terminal's counters into a report.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            current_tick: self.clock.now().saturating_sub(1),
            ..NetworkStats::default()
        };

        for router in &self.routers {
            stats.total_routers += 1;
            stats.total_terminals += router.terminal_count();

            let r = router.stats();
            stats.packets_dropped += r.packets_dropped;
            stats.packets_timed_out += r.packets_timed_out;
            stats.packets_in_flight += router.pending_packets() as u64;

            for terminal in router.terminals() {
                let t = terminal.stats();
                stats.pages_created += t.pages_created;
                stats.pages_completed += t.pages_completed;
                stats.pages_dropped += t.pages_dropped;
                stats.pages_timed_out += t.pages_timed_out;
                stats.packets_generated += t.packets_generated;
                stats.packets_sent += t.packets_sent;
                stats.packets_delivered += t.packets_succ_processed;
                stats.packets_dropped += t.packets_in_dropped + t.packets_out_dropped;
                stats.packets_timed_out += t.packets_in_timed_out + t.packets_out_timed_out;
                stats.packets_in_flight += (terminal.in_pending() + terminal.out_pending()) as u64;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(router_ids: &[u8]) -> Network {
        let mut network = Network::new();
        for &id in router_ids {
            network
                .add_router(Router::new(Address::router(id), RouterConfig::default()).unwrap())
                .unwrap();
            network
                .connect_terminal(
                    Terminal::new(Address::new(id, 1), TerminalConfig::default()).unwrap(),
                )
                .unwrap();
        }
        for pair in router_ids.windows(2) {
            network
                .establish_link(Address::router(pair[0]), Address::router(pair[1]))
                .unwrap();
        }
        network.recompute_routes();
        network
    }

    #[test]
    fn establish_link_rules() {
        let mut network = line(&[1, 2]);

        // self-links are a silent no-op
        network
            .establish_link(Address::router(1), Address::router(1))
            .unwrap();
        assert_eq!(network.router(Address::router(1)).unwrap().neighbor_count(), 1);

        // unknown endpoints are an error
        assert_eq!(
            network
                .establish_link(Address::router(1), Address::router(9))
                .unwrap_err(),
            NetworkError::UnknownRouter(Address::router(9)),
        );

        // re-linking is a no-op
        network
            .establish_link(Address::router(2), Address::router(1))
            .unwrap();
        assert_eq!(network.router(Address::router(2)).unwrap().neighbor_count(), 1);
    }

    #[test]
    fn duplicate_routers_are_rejected() {
        let mut network = line(&[1]);
        assert_eq!(
            network
                .add_router(Router::new(Address::router(1), RouterConfig::default()).unwrap())
                .unwrap_err(),
            NetworkError::DuplicateRouter(Address::router(1)),
        );
    }

    #[test]
    fn orphan_terminals_are_rejected() {
        let mut network = line(&[1]);
        assert_eq!(
            network
                .connect_terminal(
                    Terminal::new(Address::new(9, 1), TerminalConfig::default()).unwrap()
                )
                .unwrap_err(),
            NetworkError::UnknownRouter(Address::router(9)),
        );
    }

    #[test]
    fn page_crosses_a_two_router_network() {
        let mut network = line(&[1, 2]);
        let alice = Address::new(1, 1);
        let bob = Address::new(2, 1);

        let deadline = network.current_tick() + 50;
        assert!(network.terminal_mut(alice).unwrap().send_page(3, bob, deadline));
        network.simulate(10);

        let stats = network.stats();
        assert_eq!(stats.pages_created, 1);
        assert_eq!(stats.pages_completed, 1);
        assert_eq!(stats.packets_delivered, 3);
        assert_eq!(stats.packets_in_flight, 0);
        assert_eq!(stats.delivery_rate(), 1.0);
    }

    /// A packet needs at least one tick per hop: with two hops between
    /// the endpoints, the destination cannot observe it before tick 3.
    #[test]
    fn hop_latency_lower_bound() {
        let mut network = line(&[1, 2, 3]);
        let alice = Address::new(1, 1);
        let bob = Address::new(3, 1);

        assert_eq!(network.current_tick(), 1);
        assert!(network.terminal_mut(alice).unwrap().send_page(1, bob, 20));

        let mut first_observed = None;
        for _ in 0..10 {
            let executed = network.current_tick();
            network.tick();
            if first_observed.is_none()
                && network.terminal(bob).unwrap().stats().packets_received > 0
            {
                first_observed = Some(executed);
            }
        }

        assert!(first_observed.is_some(), "the packet never arrived");
        assert!(first_observed.unwrap() >= 3);
        assert_eq!(network.stats().pages_completed, 1);
    }

    /// Same-router delivery never leaves the router, so it takes fewer
    /// ticks than any forwarded path.
    #[test]
    fn local_delivery_stays_local() {
        let mut network = line(&[1]);
        network
            .connect_terminal(Terminal::new(Address::new(1, 2), TerminalConfig::default()).unwrap())
            .unwrap();

        let alice = Address::new(1, 1);
        let bob = Address::new(1, 2);
        assert!(network.terminal_mut(alice).unwrap().send_page(2, bob, 50));
        network.simulate(5);

        let stats = network.stats();
        assert_eq!(stats.pages_completed, 1);
        // nothing was ever forwarded between routers
        assert_eq!(
            network.router(Address::router(1)).unwrap().stats().packets_forwarded,
            0,
        );
    }

    #[test]
    fn ticks_advance_the_clock_and_the_report() {
        let mut network = line(&[1, 2]);
        assert_eq!(network.stats().current_tick, 0);

        network.simulate(7);

        assert_eq!(network.current_tick(), 8);
        assert_eq!(network.stats().current_tick, 7);
    }

    #[test]
    fn conservation_holds_at_every_router() {
        let config = NetworkConfig {
            router_count: 5,
            max_terminal_count: 2,
            complexity: 1,
            traffic_probability: 0.6,
            max_page_len: 6,
            seed: 1_234,
            ..NetworkConfig::default()
        };
        let mut network = TopologyBuilder::new(config).build().unwrap();
        network.simulate(120);

        for router in network.routers() {
            let stats = router.stats();
            assert_eq!(
                stats.packets_received,
                stats.packets_forwarded
                    + stats.packets_delivered
                    + stats.packets_dropped
                    + stats.packets_timed_out
                    + router.pending_packets() as u64,
                "conservation violated at {}",
                router.addr(),
            );
        }
    }

    #[test]
    fn identical_seeds_replay_identical_simulations() {
        let config = NetworkConfig {
            router_count: 4,
            max_terminal_count: 2,
            traffic_probability: 0.5,
            seed: 99,
            ..NetworkConfig::default()
        };

        let mut a = TopologyBuilder::new(config).build().unwrap();
        let mut b = TopologyBuilder::new(config).build().unwrap();
        a.simulate(80);
        b.simulate(80);

        assert_eq!(a.stats(), b.stats());
        assert!(a.stats().pages_created > 0);
    }
}
