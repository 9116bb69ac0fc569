use anyhow::{anyhow, ensure};
use std::{fmt, str};

/// Compact 16-bit address of a node in the simulated network.
///
/// The upper 8 bits identify the router, the lower 8 bits identify a
/// terminal hosted by that router. A terminal id of `0` designates the
/// router itself, so `005.000` is the router and `005.003` is its third
/// terminal. The all-zero address `000.000` is reserved as the invalid
/// sentinel ([`Address::INVALID`]).
///
/// # Example
///
/// ```
/// # use ticknet_core::Address;
/// let terminal = Address::new(5, 3);
///
/// assert_eq!(terminal.router_id(), 5);
/// assert_eq!(terminal.terminal_id(), 3);
/// assert_eq!(terminal.router_part(), Address::router(5));
/// assert_eq!(terminal.to_string(), "005.003");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Address(u16);

impl Address {
    /// The reserved invalid address `000.000`.
    ///
    /// Returned as a sentinel where no address applies, for example by
    /// [`RoutingTable::next_hop`] when a destination has no route.
    ///
    /// [`RoutingTable::next_hop`]: crate::route::RoutingTable::next_hop
    pub const INVALID: Self = Address(0);

    /// Build an address from a router id and a terminal id.
    pub const fn new(router_id: u8, terminal_id: u8) -> Self {
        Self((router_id as u16) << 8 | terminal_id as u16)
    }

    /// The address of a router itself (terminal id `0`).
    pub const fn router(router_id: u8) -> Self {
        Self::new(router_id, 0)
    }

    /// Reinterpret a raw 16-bit value as an address.
    ///
    /// The upper byte is the router id, the lower byte the terminal id.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw 16-bit representation.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn router_id(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn terminal_id(self) -> u8 {
        self.0 as u8
    }

    /// The address of the hosting router, i.e. this address with the
    /// terminal id zeroed out. For a router address this is the identity.
    #[inline]
    pub const fn router_part(self) -> Self {
        Self(self.0 & 0xFF00)
    }

    /// `true` when the terminal id is `0`, i.e. the address names a router.
    #[inline]
    pub const fn is_router(self) -> bool {
        self.0 & 0x00FF == 0
    }

    /// `true` when the terminal id is at least `1`, i.e. the address names
    /// a terminal hosted by a router.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !self.is_router()
    }

    /// `true` unless this is the reserved `000.000` sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}.{:03}", self.router_id(), self.terminal_id())
    }
}

impl str::FromStr for Address {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (router, terminal) = s
            .split_once('.')
            .ok_or_else(|| anyhow!("expecting `router.terminal', got `{s}'"))?;
        let router: u8 = router
            .parse()
            .map_err(|error| anyhow!("invalid router id `{router}': {error}"))?;
        let terminal: u8 = terminal
            .parse()
            .map_err(|error| anyhow!("invalid terminal id `{terminal}': {error}"))?;
        let address = Self::new(router, terminal);
        ensure!(address.is_valid(), "`000.000' is the reserved invalid address");
        Ok(address)
    }
}
