//! # IPv4 Range Model
//!
//! Continuous IPv4 address ranges and the CIDR arithmetic the subnet planner
//! needs: parsing, normalization, carving fixed-size blocks out of a parent
//! network and checking containment or overlap between blocks.

use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;
use serde::Serializer;
use tracing::debug;

use crate::error::PlanError;

/// Represents a continuous range of IPv4 addresses, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Number of addresses covered. An inverted range is empty.
    pub fn len(&self) -> u64 {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if start > end {
            0
        } else {
            u64::from(end - start) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &Ipv4Range) -> bool {
        !other.is_empty() && self.start_addr <= other.start_addr && other.end_addr <= self.end_addr
    }

    pub fn overlaps(&self, other: &Ipv4Range) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start_addr <= other.end_addr
            && other.start_addr <= self.end_addr
    }
}

impl From<Ipv4Network> for Ipv4Range {
    fn from(network: Ipv4Network) -> Self {
        Ipv4Range::new(network.network(), network.broadcast())
    }
}

/// Creates a range from an IP and a CIDR prefix (e.g., 192.168.1.0/24).
///
/// Returns the range covering the entire network block.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, PlanError> {
    let network = Ipv4Network::new(ip, prefix).map_err(|e| PlanError::InvalidTopologyInput {
        reason: format!("invalid prefix /{prefix} for {ip}: {e}"),
    })?;
    Ok(Ipv4Range::from(network))
}

/// Parses CIDR notation like "10.0.0.0/16" and clears any host bits,
/// so "10.0.3.7/16" becomes "10.0.0.0/16".
pub fn parse_cidr(s: &str) -> Result<Ipv4Network, PlanError> {
    let trimmed = s.trim();
    let Some((ip_str, prefix_str)) = trimmed.split_once('/') else {
        return Err(PlanError::InvalidTopologyInput {
            reason: format!("'{trimmed}' is not in CIDR notation (expected a.b.c.d/n)"),
        });
    };

    let ip = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| PlanError::InvalidTopologyInput {
            reason: format!("invalid IP in CIDR '{trimmed}': {e}"),
        })?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| PlanError::InvalidTopologyInput {
            reason: format!("invalid prefix in CIDR '{trimmed}': {e}"),
        })?;

    let range = cidr_range(ip, prefix)?;
    if range.start_addr != ip {
        debug!("host bits cleared: {trimmed} -> {}/{prefix}", range.start_addr);
    }
    network(range.start_addr, prefix)
}

/// Returns the `index`-th block of length `prefix` inside `parent`, or
/// `None` once the parent is exhausted.
pub fn nth_block(parent: Ipv4Network, prefix: u8, index: u64) -> Option<Ipv4Network> {
    if prefix < parent.prefix() || prefix > 32 {
        return None;
    }
    if index >= block_capacity(parent, prefix) {
        return None;
    }
    let block_size: u64 = 1u64 << (32 - prefix);
    let base: u64 = u64::from(u32::from(parent.network()));
    let start = u32::try_from(base + index * block_size).ok()?;
    Ipv4Network::new(Ipv4Addr::from(start), prefix).ok()
}

/// How many blocks of length `prefix` fit inside `parent`.
pub fn block_capacity(parent: Ipv4Network, prefix: u8) -> u64 {
    if prefix < parent.prefix() || prefix > 32 {
        return 0;
    }
    1u64 << (prefix - parent.prefix())
}

fn network(addr: Ipv4Addr, prefix: u8) -> Result<Ipv4Network, PlanError> {
    Ipv4Network::new(addr, prefix).map_err(|e| PlanError::InvalidTopologyInput {
        reason: format!("invalid network {addr}/{prefix}: {e}"),
    })
}

pub fn serialize_cidr<S: Serializer>(network: &Ipv4Network, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(network)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
