use crate::clock::Tick;

/// Packet lifetime, in ticks, relative to its creation tick.
///
/// Traffic sources stamp every generated packet with the absolute
/// deadline `creation_tick + PACKET_TTL`; any stage that dequeues the
/// packet at or after that tick discards it as timed out. The quarantine
/// window after an abandoned reassembly uses the same span.
///
/// ```
/// # use ticknet_core::defaults::PACKET_TTL;
/// assert_eq!(PACKET_TTL, 100);
/// ```
pub const PACKET_TTL: Tick = 100;

/// Reassembler lifetime, in ticks, relative to its creation.
///
/// A page that has not completed within this span is abandoned: its
/// fragments are counted as timed out and its page id is quarantined for
/// [`PACKET_TTL`] ticks so stragglers cannot restart the reassembly.
///
/// ```
/// # use ticknet_core::defaults::MAX_ASSEMBLER_TTL;
/// assert_eq!(MAX_ASSEMBLER_TTL, 250);
/// ```
pub const MAX_ASSEMBLER_TTL: Tick = 250;

/// How often, in ticks, [`Network::simulate`] recomputes all routing
/// tables. `0` disables the periodic refresh (the final recompute at the
/// end of a simulation still runs).
///
/// [`Network::simulate`]: crate::network::Network::simulate
pub const ROUTE_REFRESH_INTERVAL: u64 = 5;

/// Default capacity of a router's input buffer, in packets.
pub const ROUTER_IN_BUFFER_CAP: usize = 200;

/// Default number of packets a router routes out of its input buffer per
/// tick.
pub const ROUTER_IN_PROC_CAP: usize = 10;

/// Default capacity of a router's local-delivery buffer. `0` means
/// unbounded.
pub const ROUTER_LOCAL_BUFFER_CAP: usize = 0;

/// Default number of packets a router delivers to local terminals per
/// tick.
pub const ROUTER_LOCAL_BW: usize = 10;

/// Default capacity of each per-neighbor output buffer, in packets.
///
/// This is also the figure congestion-aware routing observes: the fuller
/// an output buffer, the costlier the edge to that neighbor.
pub const ROUTER_OUT_BUFFER_CAP: usize = 50;

/// Default number of packets a router emits to each neighbor per tick.
pub const ROUTER_OUT_BW: usize = 5;

/// Default capacity of a terminal's input buffer, in packets.
pub const TERMINAL_IN_BUFFER_CAP: usize = 100;

/// Default number of packets a terminal feeds into reassembly per tick.
pub const TERMINAL_IN_PROC_CAP: usize = 8;

/// Default capacity of a terminal's output buffer, in packets.
pub const TERMINAL_OUT_BUFFER_CAP: usize = 50;

/// Default number of packets a terminal hands to its router per tick.
pub const TERMINAL_OUT_BW: usize = 4;
