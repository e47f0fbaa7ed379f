//! # Security Group Rule Builder
//!
//! Derives one stateful security group per network role. Only ingress rules
//! are listed; every group allows all outbound traffic.
//!
//! A rule's source is always a tier's realized subnets, an operator-supplied
//! allowed range, or the deployment's own CIDR. There is no "any address"
//! source.

use std::collections::BTreeMap;
use std::fmt;

use omnivpc_common::error::PlanError;
use omnivpc_common::network::range::serialize_cidr;
use omnivpc_common::network::tier::Tier;
use omnivpc_common::network::traffic::{PortRange, Protocol};
use pnet::ipnetwork::Ipv4Network;
use serde::Serialize;
use tracing::{debug, warn};

use crate::subnets::SubnetLayout;
use crate::topology::{self, Layer};

pub const SSH_PORT: u16 = 22;
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;
/// NICE DCV remote desktop.
pub const DCV_PORT: u16 = 8443;

/// Ports a Nucleus server exposes to the reverse proxy.
pub const NUCLEUS_PORTS: [(u16, &str); 11] = [
    (80, "nucleus web"),
    (8080, "nucleus web3"),
    (3009, "nucleus api"),
    (3010, "nucleus metrics"),
    (3019, "nucleus api 2"),
    (3020, "nucleus tagging3"),
    (3030, "nucleus lft"),
    (3100, "nucleus auth"),
    (3180, "nucleus login"),
    (3333, "nucleus discovery"),
    (3400, "nucleus search3"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupName {
    VpcEndpoint,
    NatGateway,
    Jumpbox,
    Workstation,
    LoadBalancer,
    ReverseProxy,
    Nucleus,
}

impl GroupName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupName::VpcEndpoint => "vpc-endpoint",
            GroupName::NatGateway => "nat-gateway",
            GroupName::Jumpbox => "jumpbox",
            GroupName::Workstation => "workstation",
            GroupName::LoadBalancer => "load-balancer",
            GroupName::ReverseProxy => "reverse-proxy",
            GroupName::Nucleus => "nucleus",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GroupName::VpcEndpoint => "VPC Endpoint Security Group",
            GroupName::NatGateway => "NAT Gateway Security Group",
            GroupName::Jumpbox => "Jumpbox Security Group",
            GroupName::Workstation => "Workstation Security Group",
            GroupName::LoadBalancer => "Load Balancer Security Group",
            GroupName::ReverseProxy => "Reverse Proxy Security Group",
            GroupName::Nucleus => "Nucleus Server Security Group",
        }
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an ingress rule admits traffic from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Source {
    /// One realized subnet of a tier.
    Subnet {
        tier: Tier,
        #[serde(serialize_with = "serialize_cidr")]
        cidr: Ipv4Network,
    },
    /// A trusted external network from the operator's list.
    AllowedRange {
        #[serde(serialize_with = "serialize_cidr")]
        cidr: Ipv4Network,
    },
    /// The deployment's own top-level block.
    VpcCidr {
        #[serde(serialize_with = "serialize_cidr")]
        cidr: Ipv4Network,
    },
    /// Members of another group of the same deployment.
    SecurityGroup { group: GroupName },
}

impl Source {
    /// Address block of the source; `None` for group references.
    pub fn cidr(&self) -> Option<Ipv4Network> {
        match self {
            Source::Subnet { cidr, .. } | Source::AllowedRange { cidr } | Source::VpcCidr { cidr } => {
                Some(*cidr)
            }
            Source::SecurityGroup { .. } => None,
        }
    }

    pub fn is_allowed_range(&self) -> bool {
        matches!(self, Source::AllowedRange { .. })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Subnet { tier, cidr } => write!(f, "{cidr} ({tier})"),
            Source::AllowedRange { cidr } => write!(f, "{cidr} (allowed range)"),
            Source::VpcCidr { cidr } => write!(f, "{cidr} (vpc)"),
            Source::SecurityGroup { group } => write!(f, "sg {group}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    pub source: Source,
    pub protocol: Protocol,
    pub port: PortRange,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroup {
    pub name: GroupName,
    pub group_name: String,
    pub description: &'static str,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    fn new(name: GroupName, stack_name: &str) -> Self {
        Self {
            name,
            group_name: format!("{stack_name}-{name}"),
            description: name.description(),
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    /// Adds a TCP ingress rule. An identical rule already present is skipped.
    fn allow_tcp(&mut self, source: Source, port: u16, description: &'static str) {
        let rule = IngressRule {
            source,
            protocol: Protocol::Tcp,
            port: PortRange::single(port),
            description,
        };

        if self.ingress.iter().any(|existing| {
            existing.source == rule.source
                && existing.protocol == rule.protocol
                && existing.port == rule.port
        }) {
            warn!(group = %self.name, source = %rule.source, port, "skipping duplicate ingress rule");
            return;
        }

        debug!(group = %self.name, source = %rule.source, port, "ingress rule");
        self.ingress.push(rule);
    }

    pub fn admits(&self, protocol: Protocol, port: u16) -> impl Iterator<Item = &IngressRule> {
        self.ingress
            .iter()
            .filter(move |rule| rule.protocol == protocol && rule.port.contains(port))
    }
}

/// Every security group of one deployment, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecurityGroupSet {
    groups: BTreeMap<GroupName, SecurityGroup>,
}

impl SecurityGroupSet {
    pub fn get(&self, name: GroupName) -> Option<&SecurityGroup> {
        self.groups.get(&name)
    }

    pub fn contains(&self, name: GroupName) -> bool {
        self.groups.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecurityGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn create(&mut self, name: GroupName, stack_name: &str) -> &mut SecurityGroup {
        self.groups
            .entry(name)
            .or_insert_with(|| SecurityGroup::new(name, stack_name))
    }
}

struct RuleContext<'a> {
    layout: &'a SubnetLayout,
    allowed_ranges: &'a [Ipv4Network],
    internet_facing: bool,
}

impl RuleContext<'_> {
    /// Sources for the subnets hosting `tier`, tagged with the tier that
    /// actually owns them.
    fn subnet_sources(&self, tier: Tier) -> Result<Vec<Source>, PlanError> {
        let (owner, ranges) = self.layout.ranges_for(tier)?;
        Ok(ranges
            .into_iter()
            .map(|cidr| Source::Subnet { tier: owner, cidr })
            .collect())
    }

    fn allowed_sources(&self) -> Vec<Source> {
        self.allowed_ranges
            .iter()
            .map(|cidr| Source::AllowedRange { cidr: *cidr })
            .collect()
    }
}

type GroupExtension = fn(&RuleContext<'_>, &mut SecurityGroupSet) -> Result<(), PlanError>;

fn extension(layer: Layer) -> GroupExtension {
    match layer {
        Layer::Base => base_groups,
        Layer::Nucleus => nucleus_groups,
    }
}

/// Builds the security groups for the tiers present in `layout`.
///
/// Groups of modules that are not selected are absent from the result, not
/// empty. Referencing a tier the layout lacks fails with
/// [`PlanError::UnknownTierReference`].
pub fn build_security_groups(
    layout: &SubnetLayout,
    allowed_ranges: &[Ipv4Network],
    internet_facing: bool,
) -> Result<SecurityGroupSet, PlanError> {
    let ctx = RuleContext {
        layout,
        allowed_ranges,
        internet_facing,
    };
    let mut set = SecurityGroupSet::default();

    for layer in topology::layers(layout.modules) {
        extension(layer)(&ctx, &mut set)?;
    }

    Ok(set)
}

fn base_groups(ctx: &RuleContext<'_>, set: &mut SecurityGroupSet) -> Result<(), PlanError> {
    let stack = ctx.layout.stack_name.as_str();
    let public = ctx.subnet_sources(Tier::Public)?;
    // The workstation group is attached to this tier.
    ctx.layout.ranges(Tier::Workstation)?;
    let allowed = ctx.allowed_sources();

    let endpoint = set.create(GroupName::VpcEndpoint, stack);
    endpoint.allow_tcp(
        Source::VpcCidr {
            cidr: ctx.layout.vpc_cidr,
        },
        HTTPS_PORT,
        "https access",
    );

    set.create(GroupName::NatGateway, stack);

    let jumpbox = set.create(GroupName::Jumpbox, stack);
    for source in &allowed {
        jumpbox.allow_tcp(*source, SSH_PORT, "ssh access");
    }

    let workstation = set.create(GroupName::Workstation, stack);
    for source in public.iter().chain(&allowed) {
        workstation.allow_tcp(*source, DCV_PORT, "nice dcv tcp access");
    }

    Ok(())
}

fn nucleus_groups(ctx: &RuleContext<'_>, set: &mut SecurityGroupSet) -> Result<(), PlanError> {
    let stack = ctx.layout.stack_name.as_str();
    let workstations = ctx.subnet_sources(Tier::Workstation)?;
    let load_balancers = ctx.subnet_sources(Tier::LoadBalancer)?;
    let reverse_proxies = ctx.subnet_sources(Tier::ReverseProxy)?;
    // The nucleus group is attached to this tier.
    ctx.layout.ranges(Tier::Nucleus)?;

    if !set.contains(GroupName::NatGateway) {
        return Err(PlanError::invalid_input(
            "nucleus groups reference the nat-gateway group, which is missing",
        ));
    }
    let nat = Source::SecurityGroup {
        group: GroupName::NatGateway,
    };

    let load_balancer = set.create(GroupName::LoadBalancer, stack);
    for source in &workstations {
        load_balancer.allow_tcp(*source, HTTP_PORT, "virtual workstation access");
        load_balancer.allow_tcp(*source, HTTPS_PORT, "virtual workstation access");
    }
    if ctx.internet_facing {
        for source in ctx.allowed_sources() {
            load_balancer.allow_tcp(source, HTTP_PORT, "allowed range access");
            load_balancer.allow_tcp(source, HTTPS_PORT, "allowed range access");
        }
    }
    load_balancer.allow_tcp(nat, HTTPS_PORT, "nat access");

    let reverse_proxy = set.create(GroupName::ReverseProxy, stack);
    for source in &load_balancers {
        reverse_proxy.allow_tcp(*source, HTTPS_PORT, "load balancer access");
    }
    reverse_proxy.allow_tcp(nat, HTTPS_PORT, "nat access");

    let nucleus = set.create(GroupName::Nucleus, stack);
    for source in &reverse_proxies {
        for (port, description) in NUCLEUS_PORTS {
            nucleus.allow_tcp(*source, port, description);
        }
    }
    nucleus.allow_tcp(nat, HTTPS_PORT, "nat access");

    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
