//! # Subnet Planner
//!
//! Decides which tiers exist for a module selection and realizes them as
//! per-zone /20 blocks carved out of the deployment's top-level CIDR.

use omnivpc_common::config::{ModuleSelection, PlanConfig};
use omnivpc_common::error::PlanError;
use omnivpc_common::network::range::{self, serialize_cidr};
use omnivpc_common::network::tier::{self, MAX_AVAILABILITY_ZONES, RoutingMode, SUBNET_PREFIX_LEN, Tier};
use pnet::ipnetwork::Ipv4Network;
use serde::Serialize;
use tracing::debug;

use crate::topology::{self, Layer};

/// Planned subnet group of one tier, before any address is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSpec {
    pub tier: Tier,
    pub name: &'static str,
    pub routing: RoutingMode,
    pub prefix_len: u8,
    pub zone_count: usize,
}

impl TierSpec {
    fn new(tier: Tier, zone_count: usize) -> Self {
        Self {
            tier,
            name: tier.subnet_root_name(),
            routing: tier.routing(),
            prefix_len: SUBNET_PREFIX_LEN,
            zone_count,
        }
    }
}

/// Returns the ordered tier list for the selected modules.
///
/// `public` and `workstation` are always present. Selecting Nucleus adds
/// `load-balancer` (unless the deployment is internet facing, in which case
/// the public subnets carry the load balancer), `reverse-proxy` and `nucleus`.
pub fn plan_subnets(
    modules: ModuleSelection,
    internet_facing: bool,
    availability_zones: usize,
) -> Result<Vec<TierSpec>, PlanError> {
    if availability_zones == 0 {
        return Err(PlanError::invalid_input(
            "at least one availability zone is required",
        ));
    }
    if availability_zones > MAX_AVAILABILITY_ZONES {
        return Err(PlanError::invalid_input(format!(
            "{availability_zones} availability zones requested, at most {MAX_AVAILABILITY_ZONES} are supported"
        )));
    }
    if !modules.any() {
        return Err(PlanError::invalid_input(
            "no module selected (expected workstation and/or nucleus)",
        ));
    }

    let specs: Vec<TierSpec> = topology::layers(modules)
        .into_iter()
        .flat_map(|layer| layer_tiers(layer, internet_facing))
        .map(|tier| TierSpec::new(tier, availability_zones))
        .collect();

    debug!(
        tiers = specs.len(),
        zones = availability_zones,
        "planned subnet tiers"
    );
    Ok(specs)
}

fn layer_tiers(layer: Layer, internet_facing: bool) -> Vec<Tier> {
    match layer {
        Layer::Base => vec![Tier::Public, Tier::Workstation],
        Layer::Nucleus if internet_facing => vec![Tier::ReverseProxy, Tier::Nucleus],
        Layer::Nucleus => vec![Tier::LoadBalancer, Tier::ReverseProxy, Tier::Nucleus],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subnet {
    pub name: String,
    pub zone: usize,
    #[serde(serialize_with = "serialize_cidr")]
    pub cidr: Ipv4Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetGroup {
    #[serde(flatten)]
    pub spec: TierSpec,
    pub subnets: Vec<Subnet>,
}

impl SubnetGroup {
    pub fn ranges(&self) -> Vec<Ipv4Network> {
        self.subnets.iter().map(|subnet| subnet.cidr).collect()
    }
}

/// Realized subnets of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetLayout {
    pub stack_name: String,
    #[serde(serialize_with = "serialize_cidr")]
    pub vpc_cidr: Ipv4Network,
    pub modules: ModuleSelection,
    pub internet_facing: bool,
    pub groups: Vec<SubnetGroup>,
}

impl SubnetLayout {
    pub fn group(&self, tier: Tier) -> Option<&SubnetGroup> {
        self.groups.iter().find(|group| group.spec.tier == tier)
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.group(tier).is_some()
    }

    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.groups.iter().map(|group| group.spec.tier)
    }

    /// The tier whose subnets actually host `tier`.
    ///
    /// An internet-facing deployment has no load-balancer subnets; the
    /// public subnets stand in for them.
    pub fn resolve(&self, tier: Tier) -> Result<Tier, PlanError> {
        if self.contains(tier) {
            return Ok(tier);
        }
        if tier == Tier::LoadBalancer && self.internet_facing && self.contains(Tier::Public) {
            return Ok(Tier::Public);
        }
        Err(PlanError::UnknownTierReference { tier })
    }

    /// Resolved tier plus the address ranges a rule must use to reference
    /// `tier`.
    pub fn ranges_for(&self, tier: Tier) -> Result<(Tier, Vec<Ipv4Network>), PlanError> {
        let resolved = self.resolve(tier)?;
        let ranges = self
            .group(resolved)
            .map(SubnetGroup::ranges)
            .ok_or(PlanError::UnknownTierReference { tier })?;
        Ok((resolved, ranges))
    }

    pub fn ranges(&self, tier: Tier) -> Result<Vec<Ipv4Network>, PlanError> {
        self.ranges_for(tier).map(|(_, ranges)| ranges)
    }

    pub fn subnets(&self) -> impl Iterator<Item = (Tier, &Subnet)> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.subnets.iter().map(move |subnet| (group.spec.tier, subnet)))
    }
}

/// Assigns consecutive blocks to the planned tiers, tier by tier and zone by
/// zone, starting at the base of the plan's top-level CIDR.
pub fn allocate_subnets(specs: &[TierSpec], plan: &PlanConfig) -> Result<SubnetLayout, PlanError> {
    let vpc_cidr = plan.cidr_block;
    let required: u64 = specs
        .iter()
        .try_fold(0u64, |total, spec| {
            u64::try_from(spec.zone_count)
                .ok()
                .and_then(|zones| total.checked_add(zones))
        })
        .unwrap_or(u64::MAX);
    let available = specs
        .iter()
        .map(|spec| range::block_capacity(vpc_cidr, spec.prefix_len))
        .min()
        .unwrap_or_else(|| range::block_capacity(vpc_cidr, SUBNET_PREFIX_LEN));

    if required > available {
        return Err(PlanError::AddressSpaceExhausted {
            cidr: vpc_cidr.to_string(),
            prefix: SUBNET_PREFIX_LEN,
            required,
            available,
        });
    }

    let mut next_block: u64 = 0;
    let mut groups = Vec::with_capacity(specs.len());

    for spec in specs {
        let mut subnets = Vec::with_capacity(spec.zone_count);
        for zone in 0..spec.zone_count {
            let cidr = range::nth_block(vpc_cidr, spec.prefix_len, next_block).ok_or_else(|| {
                PlanError::AddressSpaceExhausted {
                    cidr: vpc_cidr.to_string(),
                    prefix: spec.prefix_len,
                    required,
                    available,
                }
            })?;
            next_block += 1;

            let letter = tier::zone_letter(zone).ok_or_else(|| {
                PlanError::invalid_input(format!(
                    "zone {zone} of {} has no letter suffix",
                    spec.tier
                ))
            })?;
            let name = format!("{}-{}-{letter}", plan.stack_name, spec.name);
            debug!(tier = %spec.tier, %cidr, %name, "allocated subnet");
            subnets.push(Subnet { name, zone, cidr });
        }
        groups.push(SubnetGroup {
            spec: spec.clone(),
            subnets,
        });
    }

    Ok(SubnetLayout {
        stack_name: plan.stack_name.clone(),
        vpc_cidr,
        modules: plan.modules,
        internet_facing: plan.internet_facing,
        groups,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
