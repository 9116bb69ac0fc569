use crate::{
    address::Address,
    buffer::Buffer,
    clock::Tick,
    defaults,
    packet::Packet,
    page::Page,
    reassembler::Reassembler,
    stats::TerminalStats,
    traffic::TrafficSource,
};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
};
use thiserror::Error;
use tracing::debug;

/// Buffer capacities and per-tick bandwidths of a [`Terminal`].
///
/// A capacity of `0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Capacity of the inbound buffer, in packets.
    pub in_buffer_cap: usize,
    /// Packets fed into reassembly per tick.
    pub in_proc_cap: usize,
    /// Capacity of the outbound buffer, in packets.
    pub out_buffer_cap: usize,
    /// Packets handed to the router per tick.
    pub out_bw: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            in_buffer_cap: defaults::TERMINAL_IN_BUFFER_CAP,
            in_proc_cap: defaults::TERMINAL_IN_PROC_CAP,
            out_buffer_cap: defaults::TERMINAL_OUT_BUFFER_CAP,
            out_bw: defaults::TERMINAL_OUT_BW,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerminalError {
    #[error("{0} is not a valid terminal address")]
    NotATerminal(Address),
}

/// A source/sink endpoint hosted by a router.
///
/// On the way out, a terminal fragments pages into its bounded output
/// buffer and hands a bandwidth-limited quantum to its router every tick.
/// On the way in, it drains its input buffer into per-page
/// [`Reassembler`]s, each carrying its own deadline.
///
/// When a reassembly expires before completing, the page id enters a
/// short-lived *quarantine*: stragglers bearing that id are rejected (and
/// counted as timed out) instead of restarting the reassembly, until the
/// quarantine itself expires [`PACKET_TTL`] ticks later.
///
/// All failure paths are accounted in [`TerminalStats`]; none of the
/// per-tick operations can fail.
///
/// [`PACKET_TTL`]: crate::defaults::PACKET_TTL
pub struct Terminal {
    addr: Address,
    config: TerminalConfig,

    in_buffer: Buffer,
    out_buffer: Buffer,

    /// active reassemblies, keyed by page id
    reassemblers: BTreeMap<u64, Reassembler>,
    /// page id -> tick until which its packets are rejected
    quarantine: BTreeMap<u64, Tick>,

    next_page_id: u64,
    packet_ttl: Tick,
    assembler_ttl: Tick,

    source: Option<Box<dyn TrafficSource>>,

    stats: TerminalStats,
}

impl Terminal {
    /// Create a terminal at `addr`, which must be a valid terminal
    /// address (terminal id at least `1`, router id non-zero).
    pub fn new(addr: Address, config: TerminalConfig) -> Result<Self, TerminalError> {
        if !addr.is_terminal() || !addr.router_part().is_valid() {
            return Err(TerminalError::NotATerminal(addr));
        }
        Ok(Self {
            addr,
            config,
            in_buffer: Buffer::with_address(addr, config.in_buffer_cap),
            out_buffer: Buffer::with_address(addr, config.out_buffer_cap),
            reassemblers: BTreeMap::new(),
            quarantine: BTreeMap::new(),
            next_page_id: 0,
            packet_ttl: defaults::PACKET_TTL,
            assembler_ttl: defaults::MAX_ASSEMBLER_TTL,
            source: None,
            stats: TerminalStats::default(),
        })
    }

    #[inline]
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// The address of the hosting router.
    #[inline]
    pub fn router(&self) -> Address {
        self.addr.router_part()
    }

    /// Snapshot of this terminal's counters.
    #[inline]
    pub fn stats(&self) -> TerminalStats {
        self.stats
    }

    /// Packets waiting in the inbound buffer.
    #[inline]
    pub fn in_pending(&self) -> usize {
        self.in_buffer.size()
    }

    /// Packets waiting in the outbound buffer.
    #[inline]
    pub fn out_pending(&self) -> usize {
        self.out_buffer.size()
    }

    /// Number of reassemblies currently in progress.
    pub fn active_reassemblers(&self) -> usize {
        self.reassemblers.len()
    }

    /// Fragments held by in-progress reassemblies. These packets are in
    /// no counter yet: they become `packets_succ_processed` when their
    /// page completes, or `packets_in_timed_out` when it is abandoned.
    pub fn reassembling_packets(&self) -> u64 {
        self.reassemblers
            .values()
            .map(|reassembler| u64::from(reassembler.received_count()))
            .sum()
    }

    /// `true` while packets bearing `page_id` are being rejected.
    pub fn is_quarantined(&self, page_id: u64) -> bool {
        self.quarantine.contains_key(&page_id)
    }

    /// Attach the traffic source polled once per tick.
    pub fn attach_source(&mut self, source: Box<dyn TrafficSource>) {
        self.source = Some(source);
    }

    /// Override the packet and reassembler lifetimes (both in ticks).
    pub fn set_ttls(&mut self, packet_ttl: Tick, assembler_ttl: Tick) {
        self.packet_ttl = packet_ttl;
        self.assembler_ttl = assembler_ttl;
    }

    /// Form a page of `len` packets toward `dst` and fragment it into the
    /// output buffer, every packet stamped with `deadline`.
    ///
    /// The enqueue is atomic: if the output buffer cannot take all `len`
    /// packets, the entire page is dropped and nothing is enqueued. The
    /// page id and the created-pages counter are consumed either way.
    pub fn send_page(&mut self, len: u32, dst: Address, deadline: Tick) -> bool {
        let Ok(page) = Page::new(self.next_page_id, len, self.addr, dst) else {
            return false;
        };
        self.next_page_id += 1;
        self.stats.pages_created += 1;

        let packets = page.fragment(deadline);
        if self.out_buffer.available_space() < packets.len() {
            self.stats.pages_dropped += 1;
            self.stats.packets_out_dropped += packets.len() as u64;
            return false;
        }

        for packet in packets {
            let enqueued = self.out_buffer.enqueue(packet);
            debug_assert!(enqueued, "available space was checked");
        }
        self.stats.pages_sent += 1;
        self.stats.packets_generated += u64::from(len);
        true
    }

    /// Accept a packet from the network into the inbound buffer.
    ///
    /// Quarantined page ids are rejected and counted as timed out; a full
    /// buffer rejects and counts the drop.
    pub fn receive_packet(&mut self, packet: Packet) -> bool {
        self.stats.packets_received += 1;

        if self.quarantine.contains_key(&packet.page_id()) {
            self.stats.packets_in_timed_out += 1;
            return false;
        }
        if self.in_buffer.enqueue(packet) {
            true
        } else {
            self.stats.packets_in_dropped += 1;
            false
        }
    }

    /// Drain up to `out_bw` packets from the output buffer and return the
    /// ones still alive, counted as sent. The hosting router feeds them
    /// through its own `receive_packet` during its terminal stage.
    pub fn process_out(&mut self, now: Tick) -> Vec<Packet> {
        let mut outbound = Vec::new();
        for _ in 0..self.config.out_bw {
            let Ok(packet) = self.out_buffer.dequeue() else {
                break;
            };
            if packet.expired(now) {
                self.stats.packets_out_timed_out += 1;
            } else {
                self.stats.packets_sent += 1;
                outbound.push(packet);
            }
        }
        outbound
    }

    /// Drain up to `in_proc_cap` packets from the input buffer into the
    /// per-page reassemblers. Returns the number of packets dequeued.
    pub fn process_in(&mut self, now: Tick) -> usize {
        let mut processed = 0;
        while processed < self.config.in_proc_cap {
            let Ok(packet) = self.in_buffer.dequeue() else {
                break;
            };
            processed += 1;

            if packet.expired(now) {
                self.stats.packets_in_timed_out += 1;
                continue;
            }
            if packet.dst() != self.addr {
                self.stats.packets_in_dropped += 1;
                continue;
            }

            let page_id = packet.page_id();
            let completed = {
                let reassembler = match self.reassemblers.entry(page_id) {
                    Entry::Occupied(entry) => {
                        let reassembler = entry.into_mut();
                        if reassembler.total() != packet.len() {
                            self.stats.packets_in_timed_out += 1;
                            continue;
                        }
                        reassembler
                    }
                    Entry::Vacant(entry) => {
                        let deadline = now + self.assembler_ttl;
                        // len > 0 is a packet invariant, so this cannot fail
                        let Ok(reassembler) = Reassembler::new(page_id, packet.len(), deadline)
                        else {
                            self.stats.packets_in_dropped += 1;
                            continue;
                        };
                        entry.insert(reassembler)
                    }
                };

                if !reassembler.add(packet) {
                    // page id and length already matched: a duplicate slot
                    self.stats.packets_in_dropped += 1;
                    continue;
                }
                reassembler.is_complete()
            };

            if completed {
                self.finish_page(page_id);
            }
        }
        processed
    }

    /// One simulation step: poll traffic, purge the quarantine, abandon
    /// expired reassemblies, then drain outbound and inbound quanta.
    ///
    /// Returns the outbound quantum for the hosting router (see
    /// [`Terminal::process_out`]).
    pub fn tick(&mut self, now: Tick) -> Vec<Packet> {
        if let Some(demand) = self.source.as_mut().and_then(|source| source.poll(now)) {
            let deadline = now + self.packet_ttl;
            self.send_page(demand.len, demand.dst, deadline);
        }

        self.quarantine.retain(|_, &mut until| until > now);

        let expired: Vec<u64> = self
            .reassemblers
            .iter()
            .filter(|(_, reassembler)| reassembler.expired(now))
            .map(|(&page_id, _)| page_id)
            .collect();
        for page_id in expired {
            if let Some(reassembler) = self.reassemblers.remove(&page_id) {
                self.stats.pages_timed_out += 1;
                self.stats.packets_in_timed_out += u64::from(reassembler.received_count());
                self.quarantine.insert(page_id, now + self.packet_ttl);
                debug!(terminal = %self.addr, page_id, "reassembly abandoned");
            }
        }

        let outbound = self.process_out(now);
        self.process_in(now);
        outbound
    }

    fn finish_page(&mut self, page_id: u64) {
        let Some(mut reassembler) = self.reassemblers.remove(&page_id) else {
            return;
        };
        let total = u64::from(reassembler.total());
        let packets = reassembler
            .package()
            .expect("completed reassembler failed to package");

        self.stats.packets_succ_processed += total;
        self.stats.pages_completed += 1;

        if let Ok(page) = Page::reconstruct(&packets) {
            debug!(terminal = %self.addr, %page, "page completed");
        }
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("addr", &self.addr)
            .field("in_pending", &self.in_buffer.size())
            .field("out_pending", &self.out_buffer.size())
            .field("reassemblers", &self.reassemblers.len())
            .field("quarantine", &self.quarantine.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Terminal{{ip={}, sent={}, completed={}, active={}}}",
            self.addr,
            self.stats.pages_sent,
            self.stats.pages_completed,
            self.reassemblers.len()
        )
    }
}
