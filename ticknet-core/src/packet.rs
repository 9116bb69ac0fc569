use crate::{address::Address, clock::Tick};
use std::{fmt, hash::Hash};
use thiserror::Error;

/// One fragment of a [`Page`], the unit routers actually move.
///
/// A packet is immutable once created. It carries the identity of the
/// page it belongs to, its position within that page, both endpoints and
/// an absolute deadline tick: any stage that dequeues the packet at or
/// after its deadline must discard it.
///
/// Two packets are equal iff they carry the same `(page_id, pos)` pair:
/// they denote the same logical fragment regardless of the remaining
/// fields.
///
/// [`Page`]: crate::page::Page
#[derive(Debug, Clone)]
pub struct Packet {
    page_id: u64,
    pos: u32,
    len: u32,
    src: Address,
    dst: Address,
    deadline: Tick,
}

/// Why a [`Packet`] could not be constructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("a page cannot be fragmented into zero packets")]
    EmptyPage,
    #[error("position {pos} is out of range for a page of {len} packets")]
    PositionOutOfRange { pos: u32, len: u32 },
    #[error("source ({0}) is not a valid terminal address")]
    InvalidSource(Address),
    #[error("destination ({0}) is not a valid terminal address")]
    InvalidDestination(Address),
}

impl Packet {
    /// Create a packet, validating the page-fragment invariants:
    /// `len > 0`, `pos < len`, and both endpoints valid terminal
    /// addresses.
    pub fn new(
        page_id: u64,
        pos: u32,
        len: u32,
        src: Address,
        dst: Address,
        deadline: Tick,
    ) -> Result<Self, PacketError> {
        if len == 0 {
            return Err(PacketError::EmptyPage);
        }
        if pos >= len {
            return Err(PacketError::PositionOutOfRange { pos, len });
        }
        if !src.is_valid() || !src.is_terminal() {
            return Err(PacketError::InvalidSource(src));
        }
        if !dst.is_valid() || !dst.is_terminal() {
            return Err(PacketError::InvalidDestination(dst));
        }
        Ok(Self::from_parts(page_id, pos, len, src, dst, deadline))
    }

    /// Construct without validation. The caller upholds the invariants of
    /// [`Packet::new`]; [`Page::fragment`] does so by construction.
    ///
    /// [`Page::fragment`]: crate::page::Page::fragment
    pub(crate) const fn from_parts(
        page_id: u64,
        pos: u32,
        len: u32,
        src: Address,
        dst: Address,
        deadline: Tick,
    ) -> Self {
        Self {
            page_id,
            pos,
            len,
            src,
            dst,
            deadline,
        }
    }

    /// Identity of the page this packet belongs to.
    #[inline]
    pub const fn page_id(&self) -> u64 {
        self.page_id
    }

    /// Zero-based position of this fragment within its page.
    #[inline]
    pub const fn pos(&self) -> u32 {
        self.pos
    }

    /// Total number of packets in the page.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Origin terminal.
    #[inline]
    pub const fn src(&self) -> Address {
        self.src
    }

    /// Destination terminal.
    #[inline]
    pub const fn dst(&self) -> Address {
        self.dst
    }

    /// The absolute tick at which this packet expires.
    #[inline]
    pub const fn deadline(&self) -> Tick {
        self.deadline
    }

    /// `true` once `now` has reached the packet's deadline.
    #[inline]
    pub const fn expired(&self, now: Tick) -> bool {
        now >= self.deadline
    }

    /// `true` for the fragment at position `0`.
    #[inline]
    pub const fn is_first(&self) -> bool {
        self.pos == 0
    }

    /// `true` for the fragment at position `len - 1`.
    #[inline]
    pub const fn is_last(&self) -> bool {
        self.pos == self.len - 1
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.pos == other.pos
    }
}
impl Eq for Packet {}
impl Hash for Packet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.page_id.hash(state);
        self.pos.hash(state);
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Src: {} -> Dst: {} | ID: {:06}-{}/{}",
            self.src, self.dst, self.page_id, self.pos, self.len
        )
    }
}
