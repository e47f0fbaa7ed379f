//! Logical network roles and how their subnets reach the outside world.

use std::fmt;

use serde::Serialize;

/// Fixed address-prefix length of every subnet in a deployment.
pub const SUBNET_PREFIX_LEN: u8 = 20;

/// A named logical network role. Each tier maps to at most one subnet group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Public,
    Workstation,
    LoadBalancer,
    ReverseProxy,
    Nucleus,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Public,
        Tier::Workstation,
        Tier::LoadBalancer,
        Tier::ReverseProxy,
        Tier::Nucleus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Workstation => "workstation",
            Tier::LoadBalancer => "load-balancer",
            Tier::ReverseProxy => "reverse-proxy",
            Tier::Nucleus => "nucleus",
        }
    }

    /// Root name of the subnet group, used for selection and tagging.
    pub fn subnet_root_name(&self) -> &'static str {
        match self {
            Tier::Public => "public-subnet",
            Tier::Workstation => "private-subnet-omniverse-workstations",
            Tier::LoadBalancer => "private-subnet-load-balancer",
            Tier::ReverseProxy => "private-subnet-reverse-proxy",
            Tier::Nucleus => "private-subnet-nucleus-server",
        }
    }

    pub fn routing(&self) -> RoutingMode {
        match self {
            Tier::Public => RoutingMode::Public {
                map_public_ip_on_launch: true,
            },
            _ => RoutingMode::PrivateWithEgress,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing policy shared by all subnets of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RoutingMode {
    /// Routed through the internet gateway.
    Public {
        #[serde(rename = "mapPublicIpOnLaunch")]
        map_public_ip_on_launch: bool,
    },
    /// No inbound route from the internet; outbound through the NAT gateway.
    PrivateWithEgress,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Public { .. } => f.write_str("public (internet gateway)"),
            RoutingMode::PrivateWithEgress => f.write_str("private (nat egress)"),
        }
    }
}

const ZONE_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Zones a plan may span. Each one needs its own letter suffix.
pub const MAX_AVAILABILITY_ZONES: usize = ZONE_LETTERS.len();

/// Letter suffix of an availability zone, by index (`0 -> a`). `None` past
/// [`MAX_AVAILABILITY_ZONES`].
pub fn zone_letter(zone: usize) -> Option<char> {
    ZONE_LETTERS.get(zone).map(|b| *b as char)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
