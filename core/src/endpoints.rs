//! # VPC Endpoint Placement
//!
//! Private access to AWS services without leaving the VPC. The S3 gateway
//! endpoint is attached to the route tables of the private tiers that pull
//! artifacts; the Systems Manager interface endpoints live in the Nucleus
//! subnets behind the `vpc-endpoint` group.

use std::fmt;

use omnivpc_common::error::PlanError;
use omnivpc_common::network::tier::Tier;
use serde::Serialize;
use tracing::debug;

use crate::security_groups::{GroupName, SecurityGroupSet};
use crate::subnets::SubnetLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Route-table target, no network interface.
    Gateway,
    /// Network interfaces in the chosen subnets.
    Interface,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Gateway => f.write_str("gateway"),
            EndpointKind::Interface => f.write_str("interface"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointService {
    S3,
    Ssm,
    SsmMessages,
    Ec2Messages,
}

impl EndpointService {
    pub const ALL: [EndpointService; 4] = [
        EndpointService::S3,
        EndpointService::Ssm,
        EndpointService::SsmMessages,
        EndpointService::Ec2Messages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointService::S3 => "s3",
            EndpointService::Ssm => "ssm",
            EndpointService::SsmMessages => "ssm-messages",
            EndpointService::Ec2Messages => "ec2-messages",
        }
    }

    /// Suffix of the regional service name, as in `com.amazonaws.<region>.ssmmessages`.
    pub fn service_name(&self) -> &'static str {
        match self {
            EndpointService::S3 => "s3",
            EndpointService::Ssm => "ssm",
            EndpointService::SsmMessages => "ssmmessages",
            EndpointService::Ec2Messages => "ec2messages",
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            EndpointService::S3 => EndpointKind::Gateway,
            _ => EndpointKind::Interface,
        }
    }

    /// Tiers the endpoint serves, in placement order.
    fn tiers(&self) -> &'static [Tier] {
        match self {
            EndpointService::S3 => &[Tier::ReverseProxy, Tier::Nucleus, Tier::Workstation],
            _ => &[Tier::Nucleus],
        }
    }
}

impl fmt::Display for EndpointService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcEndpoint {
    pub name: String,
    pub service: EndpointService,
    pub kind: EndpointKind,
    /// Tiers whose subnets the endpoint is placed in or routed from.
    pub tiers: Vec<Tier>,
    /// Subnet names matching `tiers`, zone by zone.
    pub subnets: Vec<String>,
    /// Groups on the endpoint's interfaces; empty for gateway endpoints.
    pub security_groups: Vec<GroupName>,
}

/// Places every endpoint whose tiers exist in `layout`. Tiers that are absent
/// are skipped, and an endpoint left without tiers is not planned at all.
pub fn plan_endpoints(
    layout: &SubnetLayout,
    groups: &SecurityGroupSet,
) -> Result<Vec<VpcEndpoint>, PlanError> {
    let mut endpoints = Vec::new();

    for service in EndpointService::ALL {
        let tiers: Vec<Tier> = service
            .tiers()
            .iter()
            .copied()
            .filter(|tier| layout.contains(*tier))
            .collect();
        if tiers.is_empty() {
            debug!(%service, "no tier to place endpoint in");
            continue;
        }

        let security_groups = match service.kind() {
            EndpointKind::Gateway => Vec::new(),
            EndpointKind::Interface => {
                if !groups.contains(GroupName::VpcEndpoint) {
                    return Err(PlanError::invalid_input(format!(
                        "{service} endpoint needs the {} group, which is missing",
                        GroupName::VpcEndpoint
                    )));
                }
                vec![GroupName::VpcEndpoint]
            }
        };

        let subnets = tiers
            .iter()
            .filter_map(|tier| layout.group(*tier))
            .flat_map(|group| group.subnets.iter().map(|subnet| subnet.name.clone()))
            .collect();

        let endpoint = VpcEndpoint {
            name: format!("{}-{service}-endpoint", layout.stack_name),
            service,
            kind: service.kind(),
            tiers,
            subnets,
            security_groups,
        };
        debug!(name = %endpoint.name, tiers = endpoint.tiers.len(), "vpc endpoint");
        endpoints.push(endpoint);
    }

    Ok(endpoints)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security_groups::build_security_groups;
    use crate::subnets::{allocate_subnets, plan_subnets};
    use omnivpc_common::config::{ModuleSelection, PlanConfig, PlanFile};

    fn plan(modules: ModuleSelection, zones: usize) -> (SubnetLayout, SecurityGroupSet) {
        let config = PlanConfig::try_from(PlanFile {
            name: "ov".to_string(),
            modules,
            availability_zones: zones,
            ..PlanFile::default()
        })
        .unwrap();
        let specs = plan_subnets(modules, false, zones).unwrap();
        let layout = allocate_subnets(&specs, &config).unwrap();
        let groups = build_security_groups(&layout, &[], false).unwrap();
        (layout, groups)
    }

    #[test]
    fn test_full_deployment_endpoints() {
        let (layout, groups) = plan(ModuleSelection::new(true, true), 2);
        let endpoints = plan_endpoints(&layout, &groups).unwrap();

        let services: Vec<EndpointService> = endpoints.iter().map(|e| e.service).collect();
        assert_eq!(services, EndpointService::ALL);

        let s3 = &endpoints[0];
        assert_eq!(s3.name, "ov-s3-endpoint");
        assert_eq!(s3.kind, EndpointKind::Gateway);
        assert_eq!(s3.tiers, [Tier::ReverseProxy, Tier::Nucleus, Tier::Workstation]);
        assert_eq!(s3.subnets.len(), 6);
        assert!(s3.security_groups.is_empty());

        for endpoint in &endpoints[1..] {
            assert_eq!(endpoint.kind, EndpointKind::Interface);
            assert_eq!(endpoint.tiers, [Tier::Nucleus]);
            assert_eq!(
                endpoint.subnets,
                ["ov-private-subnet-nucleus-server-a", "ov-private-subnet-nucleus-server-b"]
            );
            assert_eq!(endpoint.security_groups, [GroupName::VpcEndpoint]);
        }
        assert_eq!(endpoints[2].name, "ov-ssm-messages-endpoint");
    }

    #[test]
    fn test_workstation_only_skips_absent_tiers() {
        let (layout, groups) = plan(ModuleSelection::new(true, false), 1);
        let endpoints = plan_endpoints(&layout, &groups).unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].service, EndpointService::S3);
        assert_eq!(endpoints[0].tiers, [Tier::Workstation]);
        assert_eq!(
            endpoints[0].subnets,
            ["ov-private-subnet-omniverse-workstations-a"]
        );
    }

    #[test]
    fn test_interface_endpoints_need_endpoint_group() {
        let (layout, _) = plan(ModuleSelection::new(true, true), 1);
        assert!(matches!(
            plan_endpoints(&layout, &SecurityGroupSet::default()),
            Err(PlanError::InvalidTopologyInput { .. })
        ));
    }

    #[test]
    fn test_service_names() {
        let names: Vec<&str> = EndpointService::ALL.iter().map(EndpointService::service_name).collect();
        assert_eq!(names, ["s3", "ssm", "ssmmessages", "ec2messages"]);
    }
}
