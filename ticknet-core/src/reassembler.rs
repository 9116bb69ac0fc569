use crate::{clock::Tick, packet::Packet};
use std::fmt;
use thiserror::Error;

/// Rebuilds one [`Page`] from its fragments.
///
/// The reassembler holds a slot per fragment position. Fragments may
/// arrive in any order; each fills its slot at most once. Duplicates and
/// fragments that do not belong are silently refused (`add` returns
/// `false` — not an error, since stragglers and replays are ordinary
/// network behavior).
///
/// Every reassembler carries its own absolute deadline: a page that has
/// not completed by then is abandoned by the owning terminal.
///
/// [`Page`]: crate::page::Page
#[derive(Debug, Clone)]
pub struct Reassembler {
    page_id: u64,
    slots: Vec<Option<Packet>>,
    received: u32,
    deadline: Tick,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReassemblerError {
    #[error("a page of zero packets cannot be reassembled")]
    EmptyPage,
    #[error("incomplete package: {received}/{total} fragments received")]
    Incomplete { received: u32, total: u32 },
}

impl Reassembler {
    /// Create a reassembler for page `page_id` expecting `total`
    /// fragments, abandoned at `deadline`.
    pub fn new(page_id: u64, total: u32, deadline: Tick) -> Result<Self, ReassemblerError> {
        if total == 0 {
            return Err(ReassemblerError::EmptyPage);
        }
        Ok(Self {
            page_id,
            slots: vec![None; total as usize],
            received: 0,
            deadline,
        })
    }

    #[inline]
    pub const fn page_id(&self) -> u64 {
        self.page_id
    }

    /// The number of fragments the page consists of.
    #[inline]
    pub fn total(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Fragments received so far.
    #[inline]
    pub const fn received_count(&self) -> u32 {
        self.received
    }

    /// Fragments still missing.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.total() - self.received
    }

    /// The absolute tick at which this reassembly is abandoned.
    #[inline]
    pub const fn deadline(&self) -> Tick {
        self.deadline
    }

    /// `true` once `now` has reached the reassembler's deadline.
    #[inline]
    pub const fn expired(&self, now: Tick) -> bool {
        now >= self.deadline
    }

    /// `true` if the slot at `pos` is already filled.
    pub fn has_at(&self, pos: u32) -> bool {
        self.slots
            .get(pos as usize)
            .is_some_and(|slot| slot.is_some())
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.received as usize == self.slots.len()
    }

    /// Accept a fragment into its slot.
    ///
    /// Returns `false` — and discards the packet — when it belongs to a
    /// different page, disagrees on the page length, falls outside the
    /// slot range, or its slot is already filled.
    pub fn add(&mut self, packet: Packet) -> bool {
        if packet.page_id() != self.page_id || packet.len() != self.total() {
            return false;
        }
        let Some(slot) = self.slots.get_mut(packet.pos() as usize) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(packet);
        self.received += 1;
        true
    }

    /// Hand out the completed fragment sequence, ordered by position,
    /// and reset the reassembler.
    ///
    /// Fails with [`ReassemblerError::Incomplete`] while fragments are
    /// missing.
    ///
    /// # Panics
    ///
    /// Panics if a complete reassembler holds an empty slot; the slot
    /// accounting makes that impossible short of an implementation bug.
    pub fn package(&mut self) -> Result<Vec<Packet>, ReassemblerError> {
        if !self.is_complete() {
            return Err(ReassemblerError::Incomplete {
                received: self.received,
                total: self.total(),
            });
        }

        let packets = self
            .slots
            .iter_mut()
            .map(|slot| slot.take().expect("complete reassembler missing a fragment"))
            .collect();
        self.received = 0;

        Ok(packets)
    }

    /// Discard every received fragment and start over. The deadline is
    /// unchanged.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.received = 0;
    }
}

impl fmt::Display for Reassembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reassembler {:06}: {}/{} fragments, deadline {}",
            self.page_id,
            self.received,
            self.total(),
            self.deadline
        )
    }
}
