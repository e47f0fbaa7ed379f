//! # Topology Composer
//!
//! Turns a [`PlanConfig`] into a complete [`TopologyPlan`].
//!
//! The rule set of a deployment is a base layer plus one extension layer per
//! optional module. Each builder walks the same ordered [`Layer`] list, so
//! "base, then Nucleus additions" stays a data decision made in one place.
//!
//! Composition is all-or-nothing: the first failing step aborts the whole
//! plan and no partial topology is ever returned.

use omnivpc_common::config::{ModuleSelection, PlanConfig};
use omnivpc_common::error::PlanError;
use serde::Serialize;
use tracing::info;

use crate::endpoints::{self, VpcEndpoint};
use crate::nacls::{self, NetworkAclSet};
use crate::security_groups::{self, SecurityGroupSet};
use crate::subnets::{self, SubnetLayout};

/// One slice of the topology contributed by a deployment module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Public and workstation tiers, always deployed.
    Base,
    /// Load balancer, reverse proxy and Nucleus server tiers.
    Nucleus,
}

/// Ordered layers for a module selection. The base layer always comes first.
pub fn layers(modules: ModuleSelection) -> Vec<Layer> {
    let mut layers = vec![Layer::Base];
    if modules.nucleus {
        layers.push(Layer::Nucleus);
    }
    layers
}

/// Immutable output of one planning pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyPlan {
    pub subnets: SubnetLayout,
    pub security_groups: SecurityGroupSet,
    pub network_acls: NetworkAclSet,
    pub endpoints: Vec<VpcEndpoint>,
}

impl TopologyPlan {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Plans subnets, then derives security groups, network ACLs and endpoint
/// placement from them.
pub fn compose(config: &PlanConfig) -> Result<TopologyPlan, PlanError> {
    config.validate()?;

    let specs = subnets::plan_subnets(
        config.modules,
        config.internet_facing,
        config.availability_zones,
    )?;
    let layout = subnets::allocate_subnets(&specs, config)?;
    let security_groups = security_groups::build_security_groups(
        &layout,
        &config.allowed_ranges,
        config.internet_facing,
    )?;
    let network_acls =
        nacls::build_network_acls(&layout, &config.allowed_ranges, config.acl_profile)?;
    let endpoints = endpoints::plan_endpoints(&layout, &security_groups)?;

    info!(
        stack = %config.stack_name,
        modules = %config.modules,
        tiers = layout.groups.len(),
        security_groups = security_groups.len(),
        network_acls = network_acls.len(),
        endpoints = endpoints.len(),
        "composed topology plan"
    );

    Ok(TopologyPlan {
        subnets: layout,
        security_groups,
        network_acls,
        endpoints,
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
