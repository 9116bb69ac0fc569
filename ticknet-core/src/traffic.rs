use crate::{address::Address, clock::Tick};
use rand::Rng as _;
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::sync::Arc;

/// A page a traffic source wants to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    /// Page length in packets, at least `1`.
    pub len: u32,
    /// Destination terminal.
    pub dst: Address,
}

/// Decides, each tick, whether a terminal emits a new page.
///
/// The terminal polls its source once per tick, before draining its
/// output buffer, so a demand issued at tick `t` can start leaving the
/// terminal at tick `t`.
pub trait TrafficSource {
    fn poll(&mut self, now: Tick) -> Option<Demand>;
}

/// Bernoulli traffic toward a uniformly random peer.
///
/// Each tick, with probability `probability`, emits a page of uniform
/// random length in `1..=max_page_len` to a random terminal from the
/// shared address book (never to itself). Driven by a seeded
/// [`ChaChaRng`] so identical seeds replay identical traffic.
pub struct RandomTraffic {
    rng: ChaChaRng,
    probability: f64,
    max_page_len: u32,
    peers: Arc<Vec<Address>>,
    /// position of the owning terminal in `peers`, skipped when drawing
    own_index: Option<usize>,
}

impl std::fmt::Debug for RandomTraffic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomTraffic")
            .field("probability", &self.probability)
            .field("max_page_len", &self.max_page_len)
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

impl RandomTraffic {
    pub fn new(
        own: Address,
        peers: Arc<Vec<Address>>,
        probability: f64,
        max_page_len: u32,
        rng: ChaChaRng,
    ) -> Self {
        let own_index = peers.iter().position(|&peer| peer == own);
        Self {
            rng,
            probability: probability.clamp(0.0, 1.0),
            max_page_len: max_page_len.max(1),
            peers,
            own_index,
        }
    }

    /// Creates a source seeded from a `u64`.
    pub fn from_seed(
        own: Address,
        peers: Arc<Vec<Address>>,
        probability: f64,
        max_page_len: u32,
        seed: u64,
    ) -> Self {
        Self::new(own, peers, probability, max_page_len, ChaChaRng::seed_from_u64(seed))
    }
}

impl TrafficSource for RandomTraffic {
    fn poll(&mut self, _now: Tick) -> Option<Demand> {
        let candidates = self.peers.len() - usize::from(self.own_index.is_some());
        if candidates == 0 || !self.rng.gen_bool(self.probability) {
            return None;
        }

        let mut index = self.rng.gen_range(0..candidates);
        if let Some(own) = self.own_index {
            if index >= own {
                index += 1;
            }
        }

        Some(Demand {
            len: self.rng.gen_range(1..=self.max_page_len),
            dst: self.peers[index],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Arc<Vec<Address>> {
        Arc::new(vec![
            Address::new(1, 1),
            Address::new(1, 2),
            Address::new(2, 1),
        ])
    }

    #[test]
    fn never_targets_itself() {
        let own = Address::new(1, 2);
        let mut source = RandomTraffic::from_seed(own, book(), 1.0, 4, 42);

        for now in 0..500 {
            let demand = source.poll(now).expect("probability is 1.0");
            assert_ne!(demand.dst, own);
            assert!((1..=4).contains(&demand.len));
        }
    }

    #[test]
    fn zero_probability_is_silent() {
        let mut source = RandomTraffic::from_seed(Address::new(1, 1), book(), 0.0, 4, 42);
        assert_eq!(source.poll(1), None);
    }

    #[test]
    fn lonely_terminal_stays_silent() {
        let own = Address::new(1, 1);
        let peers = Arc::new(vec![own]);
        let mut source = RandomTraffic::from_seed(own, peers, 1.0, 4, 42);
        assert_eq!(source.poll(1), None);
    }

    #[test]
    fn identical_seeds_replay_identical_traffic() {
        let own = Address::new(1, 1);
        let mut a = RandomTraffic::from_seed(own, book(), 0.5, 8, 7);
        let mut b = RandomTraffic::from_seed(own, book(), 0.5, 8, 7);

        for now in 0..200 {
            assert_eq!(a.poll(now), b.poll(now));
        }
    }
}
