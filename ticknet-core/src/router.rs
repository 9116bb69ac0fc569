use crate::{
    address::Address,
    buffer::Buffer,
    clock::Tick,
    defaults,
    packet::Packet,
    route::RoutingTable,
    stats::RouterStats,
    terminal::Terminal,
};
use std::fmt;
use thiserror::Error;

/// Buffer capacities and per-tick bandwidths of a [`Router`].
///
/// A capacity of `0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Capacity of the input buffer, in packets.
    pub in_buffer_cap: usize,
    /// Packets routed out of the input buffer per tick.
    pub in_proc_cap: usize,
    /// Capacity of the local-delivery buffer, in packets.
    pub local_buffer_cap: usize,
    /// Packets delivered to local terminals per tick.
    pub local_bw: usize,
    /// Capacity of each per-neighbor output buffer, in packets.
    pub out_buffer_cap: usize,
    /// Packets emitted to each neighbor per tick.
    pub out_bw: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            in_buffer_cap: defaults::ROUTER_IN_BUFFER_CAP,
            in_proc_cap: defaults::ROUTER_IN_PROC_CAP,
            local_buffer_cap: defaults::ROUTER_LOCAL_BUFFER_CAP,
            local_bw: defaults::ROUTER_LOCAL_BW,
            out_buffer_cap: defaults::ROUTER_OUT_BUFFER_CAP,
            out_bw: defaults::ROUTER_OUT_BW,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("{0} is not a valid router address")]
    NotARouter(Address),
    #[error("router {0} cannot be its own neighbor")]
    SelfLink(Address),
    #[error("terminal {terminal} does not belong to router {router}")]
    ForeignTerminal { terminal: Address, router: Address },
    #[error("a terminal at {0} is already connected")]
    DuplicateTerminal(Address),
}

/// A neighbor link: the neighbor's address and the output buffer feeding
/// it. Kept in connection order so every traversal is deterministic.
#[derive(Debug)]
struct Connection {
    neighbor: Address,
    buffer: Buffer,
}

/// A store-and-forward pipeline node.
///
/// A router owns its terminals, an input buffer fed by terminals and
/// neighbor routers alike, a local buffer for packets addressed to its
/// own terminals, and one bounded output buffer per neighbor.
///
/// Every tick runs four stages in a fixed order:
///
/// 1. [`process_out`](Router::process_out) — emit what was routed on
///    prior ticks toward each neighbor;
/// 2. [`process_local`](Router::process_local) — deliver to locally
///    hosted terminals;
/// 3. [`tick_terminals`](Router::tick_terminals) — let terminals send new
///    traffic and process their inputs;
/// 4. [`process_in`](Router::process_in) — route newly arrived traffic.
///
/// Emitting before routing is what makes a hop cost at least one tick:
/// a packet routed into an output buffer this tick cannot leave before
/// the next one, and the per-tick occupancy of those buffers becomes the
/// edge weight route planning observes.
pub struct Router {
    addr: Address,
    config: RouterConfig,

    in_buffer: Buffer,
    local_buffer: Buffer,
    connections: Vec<Connection>,
    terminals: Vec<Terminal>,
    routing_table: RoutingTable,

    stats: RouterStats,
}

impl Router {
    /// Create a router at `addr`, which must be a valid router address
    /// (terminal id `0`, router id non-zero).
    pub fn new(addr: Address, config: RouterConfig) -> Result<Self, RouterError> {
        if !addr.is_router() || !addr.is_valid() {
            return Err(RouterError::NotARouter(addr));
        }
        Ok(Self {
            addr,
            config,
            in_buffer: Buffer::with_address(addr, config.in_buffer_cap),
            local_buffer: Buffer::with_address(addr, config.local_buffer_cap),
            connections: Vec::new(),
            terminals: Vec::new(),
            routing_table: RoutingTable::new(),
            stats: RouterStats::default(),
        })
    }

    #[inline]
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Snapshot of this router's counters.
    #[inline]
    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    /// Replace the routing table, typically with a freshly computed one.
    pub fn set_routing_table(&mut self, table: RoutingTable) {
        self.routing_table = table;
    }

    // =========== connections ===========

    /// Take ownership of a terminal.
    ///
    /// The terminal's router id must match this router, and no terminal
    /// with the same address may already be connected.
    pub fn connect_terminal(&mut self, terminal: Terminal) -> Result<(), RouterError> {
        if terminal.router() != self.addr {
            return Err(RouterError::ForeignTerminal {
                terminal: terminal.addr(),
                router: self.addr,
            });
        }
        if self.terminal(terminal.addr()).is_some() {
            return Err(RouterError::DuplicateTerminal(terminal.addr()));
        }
        self.terminals.push(terminal);
        Ok(())
    }

    /// Record `neighbor` as directly reachable and create the output
    /// buffer toward it. Connecting an existing neighbor is a no-op;
    /// connecting to itself is an error.
    pub fn connect_router(&mut self, neighbor: Address) -> Result<(), RouterError> {
        if !neighbor.is_router() || !neighbor.is_valid() {
            return Err(RouterError::NotARouter(neighbor));
        }
        if neighbor == self.addr {
            return Err(RouterError::SelfLink(self.addr));
        }
        if self.connection(neighbor).is_none() {
            self.connections.push(Connection {
                neighbor,
                buffer: Buffer::with_address(neighbor, self.config.out_buffer_cap),
            });
        }
        Ok(())
    }

    /// Remove the link toward `neighbor`, discarding whatever sits in its
    /// output buffer. Returns `false` if there was no such link.
    pub fn disconnect_router(&mut self, neighbor: Address) -> bool {
        match self.connections.iter().position(|c| c.neighbor == neighbor) {
            Some(index) => {
                self.connections.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_neighbor(&self, addr: Address) -> bool {
        self.connection(addr).is_some()
    }

    /// Neighbor addresses, in connection order.
    pub fn neighbor_addrs(&self) -> impl Iterator<Item = Address> + '_ {
        self.connections.iter().map(|c| c.neighbor)
    }

    pub fn neighbor_count(&self) -> usize {
        self.connections.len()
    }

    /// Occupancy of the output buffer toward `neighbor` — the edge
    /// weight route planning uses. `0` for a non-neighbor.
    pub fn neighbor_buffer_usage(&self, neighbor: Address) -> usize {
        self.connection(neighbor)
            .map(|c| c.buffer.size())
            .unwrap_or(0)
    }

    /// Addresses of the connected terminals, in connection order.
    pub fn terminal_addrs(&self) -> impl Iterator<Item = Address> + '_ {
        self.terminals.iter().map(Terminal::addr)
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.iter()
    }

    pub fn terminal(&self, addr: Address) -> Option<&Terminal> {
        self.terminals.iter().find(|t| t.addr() == addr)
    }

    pub fn terminal_mut(&mut self, addr: Address) -> Option<&mut Terminal> {
        self.terminals.iter_mut().find(|t| t.addr() == addr)
    }

    /// Packets currently resident in this router's buffers.
    pub fn pending_packets(&self) -> usize {
        self.in_buffer.size()
            + self.local_buffer.size()
            + self
                .connections
                .iter()
                .map(|c| c.buffer.size())
                .sum::<usize>()
    }

    // =========== packet processing ===========

    /// Accept a packet from a terminal or a neighbor router into the
    /// input buffer. A full buffer drops the packet; either way it is
    /// counted as received.
    pub fn receive_packet(&mut self, packet: Packet) -> bool {
        self.stats.packets_received += 1;
        if self.in_buffer.enqueue(packet) {
            true
        } else {
            self.stats.packets_dropped += 1;
            false
        }
    }

    /// Stage 1: drain up to `out_bw` packets from each neighbor's output
    /// buffer, in connection order. Expired packets are discarded;
    /// live ones are returned as `(neighbor, packet)` emissions, already
    /// counted as forwarded, for the network arena to deliver.
    pub fn process_out(&mut self, now: Tick) -> Vec<(Address, Packet)> {
        let Self {
            connections,
            stats,
            config,
            ..
        } = self;

        let mut emissions = Vec::new();
        for connection in connections.iter_mut() {
            for _ in 0..config.out_bw {
                let Ok(packet) = connection.buffer.dequeue() else {
                    break;
                };
                if packet.expired(now) {
                    stats.packets_timed_out += 1;
                } else {
                    stats.packets_forwarded += 1;
                    emissions.push((connection.neighbor, packet));
                }
            }
        }
        emissions
    }

    /// Stage 2: drain up to `local_bw` packets from the local buffer and
    /// hand each to its destination terminal. A missing terminal (e.g. a
    /// stale destination) drops the packet.
    pub fn process_local(&mut self, now: Tick) -> usize {
        let Self {
            local_buffer,
            terminals,
            stats,
            config,
            ..
        } = self;

        let mut delivered = 0;
        for _ in 0..config.local_bw {
            let Ok(packet) = local_buffer.dequeue() else {
                break;
            };
            if packet.expired(now) {
                stats.packets_timed_out += 1;
                continue;
            }
            match terminals.iter_mut().find(|t| t.addr() == packet.dst()) {
                Some(terminal) => {
                    stats.packets_delivered += 1;
                    delivered += 1;
                    terminal.receive_packet(packet);
                }
                None => stats.packets_dropped += 1,
            }
        }
        delivered
    }

    /// Stage 3: tick every terminal and feed each one's outbound quantum
    /// through [`Router::receive_packet`], so terminal-generated traffic
    /// is routed by stage 4 in the same tick.
    pub fn tick_terminals(&mut self, now: Tick) {
        for index in 0..self.terminals.len() {
            let outbound = self.terminals[index].tick(now);
            for packet in outbound {
                self.receive_packet(packet);
            }
        }
    }

    /// Stage 4: drain up to `in_proc_cap` packets from the input buffer
    /// and route each one.
    pub fn process_in(&mut self, now: Tick) -> usize {
        let mut processed = 0;
        while processed < self.config.in_proc_cap {
            let Ok(packet) = self.in_buffer.dequeue() else {
                break;
            };
            processed += 1;
            if packet.expired(now) {
                self.stats.packets_timed_out += 1;
                continue;
            }
            self.route_packet(packet);
        }
        processed
    }

    /// One simulation step: the four stages in their fixed order.
    ///
    /// Returns this router's emissions — `(neighbor, packet)` pairs
    /// already counted as forwarded — for the owning network to deliver
    /// through the arena. Emissions never target this router itself, so
    /// delivering them after the stages is indistinguishable from the
    /// in-stage handoff.
    pub fn tick(&mut self, now: Tick) -> Vec<(Address, Packet)> {
        let emissions = self.process_out(now);
        self.process_local(now);
        self.tick_terminals(now);
        self.process_in(now);
        emissions
    }

    /// Place a packet into the local buffer or the output buffer toward
    /// its next hop. Any failure (no route, next hop not a neighbor,
    /// full buffer) drops the packet.
    pub fn route_packet(&mut self, packet: Packet) -> bool {
        if packet.dst().router_part() == self.addr {
            if self.local_buffer.enqueue(packet) {
                return true;
            }
            self.stats.packets_dropped += 1;
            return false;
        }

        let next_hop = self.routing_table.next_hop(packet.dst());
        if !next_hop.is_valid() {
            self.stats.packets_dropped += 1;
            return false;
        }

        let Self {
            connections, stats, ..
        } = self;
        let Some(connection) = connections.iter_mut().find(|c| c.neighbor == next_hop) else {
            stats.packets_dropped += 1;
            return false;
        };
        if connection.buffer.enqueue(packet) {
            true
        } else {
            stats.packets_dropped += 1;
            false
        }
    }

    pub(crate) fn neighbor_buffer_mut(&mut self, neighbor: Address) -> Option<&mut Buffer> {
        self.connections
            .iter_mut()
            .find(|c| c.neighbor == neighbor)
            .map(|c| &mut c.buffer)
    }

    fn connection(&self, neighbor: Address) -> Option<&Connection> {
        self.connections.iter().find(|c| c.neighbor == neighbor)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("addr", &self.addr)
            .field("terminals", &self.terminals.len())
            .field("neighbors", &self.connections.len())
            .field("pending", &self.pending_packets())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Router{{ip={}, terminals={}, neighbors={}, received={}}}",
            self.addr,
            self.terminals.len(),
            self.connections.len(),
            self.stats.packets_received
        )
    }
}
