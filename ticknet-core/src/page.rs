use crate::{
    address::Address,
    clock::Tick,
    packet::{Packet, PacketError},
};
use std::fmt;
use thiserror::Error;

/// A logical message: the unit terminals exchange.
///
/// A page never travels as such. The sending terminal fragments it into
/// exactly `len` packets, the network moves those independently, and the
/// receiving terminal reconstructs the page once every fragment has
/// arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page_id: u64,
    len: u32,
    src: Address,
    dst: Address,
}

/// Why a [`Page`] could not be constructed or reconstructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error(transparent)]
    Invalid(#[from] PacketError),
    #[error("cannot reconstruct a page from no packets")]
    NoPackets,
    #[error("fragment {found} does not belong to page {page_id}")]
    ForeignFragment { page_id: u64, found: u64 },
    #[error("fragments disagree on the page metadata")]
    MismatchedFragment,
    #[error("expecting position {expected}, found {found}")]
    OutOfOrder { expected: u32, found: u32 },
    #[error("{got} packets cannot form a page of length {len}")]
    WrongCount { len: u32, got: usize },
}

impl Page {
    /// Create a page of `len` packets from `src` to `dst`.
    ///
    /// Fails with the same argument checks as [`Packet::new`]: the length
    /// must be non-zero and both endpoints valid terminal addresses.
    pub fn new(page_id: u64, len: u32, src: Address, dst: Address) -> Result<Self, PageError> {
        if len == 0 {
            return Err(PacketError::EmptyPage.into());
        }
        if !src.is_valid() || !src.is_terminal() {
            return Err(PacketError::InvalidSource(src).into());
        }
        if !dst.is_valid() || !dst.is_terminal() {
            return Err(PacketError::InvalidDestination(dst).into());
        }
        Ok(Self {
            page_id,
            len,
            src,
            dst,
        })
    }

    #[inline]
    pub const fn page_id(&self) -> u64 {
        self.page_id
    }

    /// The number of packets this page fragments into.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub const fn src(&self) -> Address {
        self.src
    }

    #[inline]
    pub const fn dst(&self) -> Address {
        self.dst
    }

    /// `true` when the page is destined for `address`.
    #[inline]
    pub fn is_addressed_to(&self, address: Address) -> bool {
        self.dst == address
    }

    /// `true` when the page originated from `address`.
    #[inline]
    pub fn is_from(&self, address: Address) -> bool {
        self.src == address
    }

    /// Fragment the page into its `len` packets, every one stamped with
    /// the same absolute `deadline`.
    ///
    /// The produced packets carry positions `0..len` in order.
    pub fn fragment(&self, deadline: Tick) -> Vec<Packet> {
        (0..self.len)
            .map(|pos| {
                Packet::from_parts(self.page_id, pos, self.len, self.src, self.dst, deadline)
            })
            .collect()
    }

    /// Reconstruct a page from a completed fragment sequence.
    ///
    /// Succeeds iff the sequence is non-empty, every packet agrees on
    /// `(page_id, len, src, dst)`, and positions `0..len` appear in
    /// order. This is the inverse of [`Page::fragment`].
    pub fn reconstruct(packets: &[Packet]) -> Result<Self, PageError> {
        let first = packets.first().ok_or(PageError::NoPackets)?;
        let page = Self {
            page_id: first.page_id(),
            len: first.len(),
            src: first.src(),
            dst: first.dst(),
        };

        if packets.len() != page.len as usize {
            return Err(PageError::WrongCount {
                len: page.len,
                got: packets.len(),
            });
        }

        for (expected, packet) in packets.iter().enumerate() {
            if packet.page_id() != page.page_id {
                return Err(PageError::ForeignFragment {
                    page_id: page.page_id,
                    found: packet.page_id(),
                });
            }
            if packet.len() != page.len || packet.src() != page.src || packet.dst() != page.dst {
                return Err(PageError::MismatchedFragment);
            }
            if packet.pos() != expected as u32 {
                return Err(PageError::OutOfOrder {
                    expected: expected as u32,
                    found: packet.pos(),
                });
            }
        }

        Ok(page)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {:06}: {} -> {} ({} packets)",
            self.page_id, self.src, self.dst, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: Address = Address::new(20, 15);
    const DST: Address = Address::new(10, 5);

    #[test]
    fn construction_validates_arguments() {
        assert!(Page::new(1, 0, SRC, DST).is_err());
        assert!(Page::new(1, 3, Address::router(2), DST).is_err());
        assert!(Page::new(1, 3, SRC, Address::INVALID).is_err());
    }

    #[test]
    fn fragment_covers_every_position_once() {
        let page = Page::new(42, 5, SRC, DST).unwrap();
        let packets = page.fragment(10);

        assert_eq!(packets.len(), 5);
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.pos(), i as u32);
            assert_eq!(packet.page_id(), 42);
            assert_eq!(packet.len(), 5);
            assert_eq!(packet.src(), SRC);
            assert_eq!(packet.dst(), DST);
            assert_eq!(packet.deadline(), 10);
        }
    }

    #[test]
    fn reconstruct_inverts_fragment() {
        let page = Page::new(42, 5, SRC, DST).unwrap();
        let packets = page.fragment(10);

        assert_eq!(Page::reconstruct(&packets).unwrap(), page);
    }

    #[test]
    fn reconstruct_rejects_empty() {
        assert_eq!(Page::reconstruct(&[]).unwrap_err(), PageError::NoPackets);
    }

    #[test]
    fn reconstruct_rejects_reordered_fragments() {
        let page = Page::new(42, 3, SRC, DST).unwrap();
        let mut packets = page.fragment(10);
        packets.swap(0, 2);

        assert_eq!(
            Page::reconstruct(&packets).unwrap_err(),
            PageError::OutOfOrder {
                expected: 0,
                found: 2
            },
        );
    }

    #[test]
    fn reconstruct_rejects_foreign_fragment() {
        let page = Page::new(42, 3, SRC, DST).unwrap();
        let other = Page::new(43, 3, SRC, DST).unwrap();

        let mut packets = page.fragment(10);
        packets[1] = other.fragment(10).swap_remove(1);

        assert_eq!(
            Page::reconstruct(&packets).unwrap_err(),
            PageError::ForeignFragment {
                page_id: 42,
                found: 43
            },
        );
    }

    #[test]
    fn reconstruct_rejects_short_sequence() {
        let page = Page::new(42, 3, SRC, DST).unwrap();
        let mut packets = page.fragment(10);
        packets.pop();

        assert_eq!(
            Page::reconstruct(&packets).unwrap_err(),
            PageError::WrongCount { len: 3, got: 2 },
        );
    }

    #[test]
    fn queries() {
        let page = Page::new(42, 3, SRC, DST).unwrap();
        assert!(page.is_addressed_to(DST));
        assert!(!page.is_addressed_to(SRC));
        assert!(page.is_from(SRC));
    }

    #[test]
    fn print() {
        let page = Page::new(42, 3, SRC, DST).unwrap();
        assert_eq!(
            page.to_string(),
            "Page 000042: 020.015 -> 010.005 (3 packets)"
        );
    }
}
