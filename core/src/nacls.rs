//! # Network ACL Rule Builder
//!
//! Network ACLs filter packets statelessly at the subnet boundary. Unlike
//! security groups, every entry has an explicit rule number and direction,
//! and return traffic must be admitted explicitly through the ephemeral port
//! range.
//!
//! ACL entries are intentionally coarser than the security groups: they
//! admit a tier's service ports from anywhere and leave caller scoping to
//! the security-group layer. Only the public tier's SSH entries are scoped
//! to the operator's allowed ranges.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use omnivpc_common::config::AclProfile;
use omnivpc_common::error::PlanError;
use omnivpc_common::network::range::serialize_cidr;
use omnivpc_common::network::tier::Tier;
use omnivpc_common::network::traffic::{Direction, PortRange, Protocol, RuleAction};
use pnet::ipnetwork::Ipv4Network;
use serde::Serialize;
use tracing::{debug, warn};

use crate::security_groups::{DCV_PORT, HTTP_PORT, HTTPS_PORT, SSH_PORT};
use crate::subnets::SubnetLayout;
use crate::topology::{self, Layer};

/// Highest rule number the provider accepts.
pub const MAX_RULE_NUMBER: u16 = 32766;
/// First rule number of the public tier's per-range SSH entries.
pub const SSH_RULE_BASE: u16 = 50;
pub const EPHEMERAL_RULE: u16 = 1000;
pub const EGRESS_RULE: u16 = 100;
/// UDP port of the jumpbox-mediated tunnel into workstations.
pub const JUMPBOX_TUNNEL_PORT: u16 = 8888;
pub const NUCLEUS_WEB3_PORT: u16 = 8080;
pub const NUCLEUS_SERVICE_PORTS: PortRange = PortRange { from: 3009, to: 3400 };

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    pub rule_number: u16,
    pub direction: Direction,
    pub name: String,
    pub protocol: Protocol,
    pub ports: PortRange,
    #[serde(serialize_with = "serialize_cidr")]
    pub cidr: Ipv4Network,
    pub action: RuleAction,
}

impl AclEntry {
    fn is_allow_all_egress(&self) -> bool {
        self.direction == Direction::Egress
            && self.action == RuleAction::Allow
            && self.protocol == Protocol::All
            && self.cidr.prefix() == 0
    }
}

/// Ordered entries of the ACL attached to one tier's subnets.
///
/// Entries stay sorted by direction, then rule number. A rule number is
/// unique per direction: ingress 100 and egress 100 may coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAcl {
    pub tier: Tier,
    pub acl_name: String,
    pub entries: Vec<AclEntry>,
}

impl NetworkAcl {
    fn new(tier: Tier, stack_name: &str) -> Self {
        Self {
            tier,
            acl_name: format!("{stack_name}-{tier}"),
            entries: Vec::new(),
        }
    }

    /// Inserts `entry` at its rule-number position, rejecting a number that
    /// is already taken in the same direction.
    pub fn add_entry(&mut self, entry: AclEntry) -> Result<(), PlanError> {
        if entry.rule_number == 0 || entry.rule_number > MAX_RULE_NUMBER {
            return Err(PlanError::invalid_input(format!(
                "rule number {} of '{}' is outside 1..={MAX_RULE_NUMBER}",
                entry.rule_number, self.acl_name
            )));
        }

        let key = (entry.direction, entry.rule_number);
        match self
            .entries
            .binary_search_by_key(&key, |existing| (existing.direction, existing.rule_number))
        {
            Ok(_) => Err(PlanError::RuleNumberCollision {
                acl: self.acl_name.clone(),
                direction: entry.direction,
                rule_number: entry.rule_number,
            }),
            Err(position) => {
                debug!(
                    acl = %self.acl_name,
                    rule = entry.rule_number,
                    direction = %entry.direction,
                    protocol = %entry.protocol,
                    ports = %entry.ports,
                    cidr = %entry.cidr,
                    "acl entry"
                );
                self.entries.insert(position, entry);
                Ok(())
            }
        }
    }

    pub fn entry(&self, direction: Direction, rule_number: u16) -> Option<&AclEntry> {
        self.entries
            .iter()
            .find(|entry| entry.direction == direction && entry.rule_number == rule_number)
    }

    pub fn ingress(&self) -> impl Iterator<Item = &AclEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.direction == Direction::Ingress)
    }

    pub fn egress(&self) -> impl Iterator<Item = &AclEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.direction == Direction::Egress)
    }

    /// Whether traffic can flow at all: some ingress allow plus an
    /// unconditional egress allow.
    pub fn has_normal_flow(&self) -> bool {
        self.ingress().any(|entry| entry.action == RuleAction::Allow)
            && self.egress().any(AclEntry::is_allow_all_egress)
    }

    fn allow(
        &mut self,
        rule_number: u16,
        direction: Direction,
        name: impl Into<String>,
        protocol: Protocol,
        ports: PortRange,
        cidr: Ipv4Network,
    ) -> Result<(), PlanError> {
        self.add_entry(AclEntry {
            rule_number,
            direction,
            name: name.into(),
            protocol,
            ports,
            cidr,
            action: RuleAction::Allow,
        })
    }

    fn allow_ingress_tcp(
        &mut self,
        rule_number: u16,
        name: &str,
        ports: PortRange,
        cidr: Ipv4Network,
    ) -> Result<(), PlanError> {
        self.allow(rule_number, Direction::Ingress, name, Protocol::Tcp, ports, cidr)
    }

    /// Return traffic on ephemeral ports plus unrestricted egress.
    fn allow_return_and_egress(&mut self, anywhere: Ipv4Network) -> Result<(), PlanError> {
        self.allow_ingress_tcp(EPHEMERAL_RULE, "ingress-ephemeral", PortRange::EPHEMERAL, anywhere)?;
        self.allow(
            EGRESS_RULE,
            Direction::Egress,
            "egress-all",
            Protocol::All,
            PortRange::ALL,
            anywhere,
        )
    }
}

/// Every network ACL of one deployment, keyed by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetworkAclSet {
    acls: BTreeMap<Tier, NetworkAcl>,
}

impl NetworkAclSet {
    pub fn get(&self, tier: Tier) -> Option<&NetworkAcl> {
        self.acls.get(&tier)
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.acls.contains_key(&tier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkAcl> {
        self.acls.values()
    }

    pub fn len(&self) -> usize {
        self.acls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acls.is_empty()
    }

    fn create(&mut self, layout: &SubnetLayout, tier: Tier) -> Result<&mut NetworkAcl, PlanError> {
        if !layout.contains(tier) {
            return Err(PlanError::UnknownTierReference { tier });
        }
        Ok(self
            .acls
            .entry(tier)
            .or_insert_with(|| NetworkAcl::new(tier, &layout.stack_name)))
    }
}

struct AclContext<'a> {
    layout: &'a SubnetLayout,
    allowed_ranges: &'a [Ipv4Network],
    profile: AclProfile,
    anywhere: Ipv4Network,
}

type AclExtension = fn(&AclContext<'_>, &mut NetworkAclSet) -> Result<(), PlanError>;

fn extension(layer: Layer) -> AclExtension {
    match layer {
        Layer::Base => base_acls,
        Layer::Nucleus => nucleus_acls,
    }
}

/// Builds one ACL per tier present in `layout`.
pub fn build_network_acls(
    layout: &SubnetLayout,
    allowed_ranges: &[Ipv4Network],
    profile: AclProfile,
) -> Result<NetworkAclSet, PlanError> {
    let anywhere = Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0)
        .map_err(|e| PlanError::invalid_input(e.to_string()))?;
    let ctx = AclContext {
        layout,
        allowed_ranges,
        profile,
        anywhere,
    };

    if profile == AclProfile::Relaxed && layout.modules.nucleus {
        warn!("relaxed ACL profile: Nucleus tiers admit every TCP port at the subnet boundary");
    }

    let mut set = NetworkAclSet::default();
    for layer in topology::layers(layout.modules) {
        extension(layer)(&ctx, &mut set)?;
    }
    Ok(set)
}

fn base_acls(ctx: &AclContext<'_>, set: &mut NetworkAclSet) -> Result<(), PlanError> {
    let anywhere = ctx.anywhere;

    let public = set.create(ctx.layout, Tier::Public)?;
    for (index, range) in ctx.allowed_ranges.iter().enumerate() {
        let rule_number = u16::try_from(index)
            .ok()
            .and_then(|offset| SSH_RULE_BASE.checked_add(offset))
            .ok_or_else(|| {
                PlanError::invalid_input(format!(
                    "{} allowed ranges cannot be numbered in one ACL",
                    ctx.allowed_ranges.len()
                ))
            })?;
        public.allow_ingress_tcp(
            rule_number,
            &format!("ingress-ssh-range-{index}"),
            PortRange::single(SSH_PORT),
            *range,
        )?;
    }
    public.allow_ingress_tcp(200, "ingress-https", PortRange::single(HTTPS_PORT), anywhere)?;
    public.allow_ingress_tcp(300, "ingress-http", PortRange::single(HTTP_PORT), anywhere)?;
    public.allow_return_and_egress(anywhere)?;

    let workstation = set.create(ctx.layout, Tier::Workstation)?;
    workstation.allow_ingress_tcp(100, "ingress-nice-dcv-tcp", PortRange::single(DCV_PORT), anywhere)?;
    workstation.allow(
        200,
        Direction::Ingress,
        "ingress-nice-dcv-udp",
        Protocol::Udp,
        PortRange::single(DCV_PORT),
        anywhere,
    )?;
    workstation.allow(
        300,
        Direction::Ingress,
        "ingress-jumpbox-tunnel",
        Protocol::Udp,
        PortRange::single(JUMPBOX_TUNNEL_PORT),
        anywhere,
    )?;
    workstation.allow_return_and_egress(anywhere)?;

    Ok(())
}

fn nucleus_acls(ctx: &AclContext<'_>, set: &mut NetworkAclSet) -> Result<(), PlanError> {
    let anywhere = ctx.anywhere;

    // An internet-facing load balancer sits in the public subnets and is
    // covered by the public ACL.
    if ctx.layout.contains(Tier::LoadBalancer) {
        let load_balancer = set.create(ctx.layout, Tier::LoadBalancer)?;
        web_entries(load_balancer, ctx.profile, anywhere)?;
    }

    let reverse_proxy = set.create(ctx.layout, Tier::ReverseProxy)?;
    web_entries(reverse_proxy, ctx.profile, anywhere)?;

    let nucleus = set.create(ctx.layout, Tier::Nucleus)?;
    match ctx.profile {
        AclProfile::Strict => {
            nucleus.allow_ingress_tcp(100, "ingress-https", PortRange::single(HTTPS_PORT), anywhere)?;
            nucleus.allow_ingress_tcp(200, "ingress-http", PortRange::single(HTTP_PORT), anywhere)?;
            nucleus.allow_ingress_tcp(300, "ingress-nucleus-range", NUCLEUS_SERVICE_PORTS, anywhere)?;
            nucleus.allow_ingress_tcp(
                400,
                "ingress-nucleus-web3",
                PortRange::single(NUCLEUS_WEB3_PORT),
                anywhere,
            )?;
            nucleus.allow_return_and_egress(anywhere)?;
        }
        AclProfile::Relaxed => {
            nucleus.allow_ingress_tcp(EPHEMERAL_RULE, "ingress-all-tcp", PortRange::ALL, anywhere)?;
            nucleus.allow(
                EGRESS_RULE,
                Direction::Egress,
                "egress-all",
                Protocol::All,
                PortRange::ALL,
                anywhere,
            )?;
        }
    }

    Ok(())
}

/// HTTPS and HTTP for the load-balancer and reverse-proxy tiers.
fn web_entries(acl: &mut NetworkAcl, profile: AclProfile, anywhere: Ipv4Network) -> Result<(), PlanError> {
    match profile {
        AclProfile::Strict => {
            acl.allow_ingress_tcp(100, "ingress-https", PortRange::single(HTTPS_PORT), anywhere)?;
            acl.allow_ingress_tcp(200, "ingress-http", PortRange::single(HTTP_PORT), anywhere)?;
            acl.allow_return_and_egress(anywhere)
        }
        AclProfile::Relaxed => {
            acl.allow_ingress_tcp(100, "ingress-all-tcp", PortRange::ALL, anywhere)?;
            acl.allow(
                EGRESS_RULE,
                Direction::Egress,
                "egress-all",
                Protocol::All,
                PortRange::ALL,
                anywhere,
            )
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
