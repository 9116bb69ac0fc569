//! Counter snapshots and the aggregate network report.
//!
//! Every router and terminal accounts its own packet fates; the
//! [`Network`](crate::network::Network) sums them into a [`NetworkStats`]
//! report on demand. Nothing here is maintained incrementally — a report
//! is a walk over the arena at the observation point.

use crate::clock::Tick;

/// Per-router packet accounting.
///
/// The counters satisfy the conservation law
/// `received == forwarded + delivered + dropped + timed_out + pending`,
/// where `pending` is the sum of the router's buffer sizes at the
/// observation point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Packets accepted into `receive_packet`, including ones dropped on
    /// a full input buffer.
    pub packets_received: u64,
    /// Packets lost to full buffers, missing routes or missing terminals.
    pub packets_dropped: u64,
    /// Packets discarded past their deadline.
    pub packets_timed_out: u64,
    /// Packets handed to a neighbor router.
    pub packets_forwarded: u64,
    /// Packets handed to a locally hosted terminal.
    pub packets_delivered: u64,
}

/// Per-terminal page and packet accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalStats {
    /// Pages requested, whether or not they could be enqueued.
    pub pages_created: u64,
    /// Pages whose packets were all enqueued for transmission.
    pub pages_sent: u64,
    /// Pages refused because the output buffer could not take every
    /// packet atomically.
    pub pages_dropped: u64,
    /// Pages fully reassembled at this terminal.
    pub pages_completed: u64,
    /// Reassemblies abandoned at their deadline.
    pub pages_timed_out: u64,

    /// Packets fragmented into the output buffer.
    pub packets_generated: u64,
    /// Packets handed to the connected router.
    pub packets_sent: u64,
    /// Packets of refused pages (never enqueued).
    pub packets_out_dropped: u64,
    /// Outbound packets discarded past their deadline.
    pub packets_out_timed_out: u64,

    /// Packets offered to `receive_packet`, accepted or not.
    pub packets_received: u64,
    /// Inbound packets lost to a full buffer, a stale destination or a
    /// duplicate slot.
    pub packets_in_dropped: u64,
    /// Inbound packets rejected by quarantine, expired on dequeue, part
    /// of an abandoned reassembly, or disagreeing on the page length.
    pub packets_in_timed_out: u64,
    /// Packets that ended up in a completed page.
    pub packets_succ_processed: u64,
}

/// Aggregate report over the whole network, pulled by an external
/// reporter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkStats {
    /// The last completed tick.
    pub current_tick: Tick,
    pub total_routers: usize,
    pub total_terminals: usize,

    pub packets_generated: u64,
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_dropped: u64,
    pub packets_timed_out: u64,
    /// Packets currently resident in any buffer.
    pub packets_in_flight: u64,

    pub pages_created: u64,
    pub pages_completed: u64,
    pub pages_dropped: u64,
    pub pages_timed_out: u64,
}

impl NetworkStats {
    /// Delivered packets over generated packets, `0.0` when nothing was
    /// generated.
    pub fn delivery_rate(&self) -> f64 {
        ratio(self.packets_delivered, self.packets_generated)
    }

    /// Completed pages over created pages.
    pub fn success_rate(&self) -> f64 {
        ratio(self.pages_completed, self.pages_created)
    }

    /// Dropped packets over generated packets.
    pub fn drop_rate(&self) -> f64 {
        ratio(self.packets_dropped, self.packets_generated)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_guard_against_division_by_zero() {
        let stats = NetworkStats::default();
        assert_eq!(stats.delivery_rate(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn rates() {
        let stats = NetworkStats {
            packets_generated: 200,
            packets_delivered: 150,
            packets_dropped: 30,
            pages_created: 20,
            pages_completed: 15,
            ..NetworkStats::default()
        };

        assert_eq!(stats.delivery_rate(), 0.75);
        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(stats.drop_rate(), 0.15);
    }
}
