use omnivpc_common::config::{AclProfile, ModuleSelection};
use omnivpc_common::error::PlanError;
use omnivpc_common::network::tier::Tier;
use omnivpc_common::network::traffic::{Direction, PortRange, Protocol};
use omnivpc_core::endpoints::EndpointService;
use omnivpc_core::security_groups::{GroupName, Source};
use omnivpc_core::topology::{self, TopologyPlan};

use super::plan_config;

fn tiers(plan: &TopologyPlan) -> Vec<Tier> {
    plan.subnets.tiers().collect()
}

fn sources_on_port(plan: &TopologyPlan, group: GroupName, port: u16) -> Vec<Source> {
    plan.security_groups
        .get(group)
        .map(|g| g.admits(Protocol::Tcp, port).map(|rule| rule.source).collect())
        .unwrap_or_default()
}

#[test]
fn nucleus_private_load_balancer() -> anyhow::Result<()> {
    let config = plan_config(ModuleSelection::new(false, true), false, &["10.0.0.0/24"], 2);
    let plan = topology::compose(&config)?;

    assert_eq!(
        tiers(&plan),
        [
            Tier::Public,
            Tier::Workstation,
            Tier::LoadBalancer,
            Tier::ReverseProxy,
            Tier::Nucleus
        ]
    );
    for group in &plan.subnets.groups {
        assert_eq!(group.subnets.len(), 2, "{} is not in two zones", group.spec.tier);
    }

    let workstation_ranges = plan.subnets.ranges(Tier::Workstation)?;
    for port in [80, 443] {
        let sources = sources_on_port(&plan, GroupName::LoadBalancer, port);
        for range in &workstation_ranges {
            assert!(sources.iter().any(|s| s.cidr() == Some(*range)), "{range} missing on {port}");
        }
        assert!(sources.iter().all(|s| !s.is_allowed_range()));
    }
    Ok(())
}

#[test]
fn nucleus_internet_facing_load_balancer() -> anyhow::Result<()> {
    let config = plan_config(ModuleSelection::new(false, true), true, &["10.0.0.0/24"], 2);
    let plan = topology::compose(&config)?;

    assert!(!tiers(&plan).contains(&Tier::LoadBalancer));
    assert!(!plan.network_acls.contains(Tier::LoadBalancer));

    let allowed = "10.0.0.0/24".parse()?;
    for port in [80, 443] {
        let sources = sources_on_port(&plan, GroupName::LoadBalancer, port);
        assert!(sources.contains(&Source::AllowedRange { cidr: allowed }));
    }

    // Folded references name the tier that owns the subnets.
    for group in plan.security_groups.iter() {
        for rule in &group.ingress {
            if let Source::Subnet { tier, .. } = rule.source {
                assert!(plan.subnets.contains(tier), "{} names absent tier {tier}", group.name);
            }
        }
    }
    let json = serde_json::to_string(&plan)?;
    assert!(!json.contains("\"tier\":\"load-balancer\""));

    // The reverse proxy now trusts the public subnets the load balancer lives in.
    let public_ranges = plan.subnets.ranges(Tier::Public)?;
    let proxy_sources = sources_on_port(&plan, GroupName::ReverseProxy, 443);
    let proxy_ranges: Vec<_> = proxy_sources.iter().filter_map(Source::cidr).collect();
    assert_eq!(proxy_ranges, public_ranges);
    Ok(())
}

#[test]
fn workstation_only_single_zone() -> anyhow::Result<()> {
    let config = plan_config(ModuleSelection::new(true, false), false, &[], 1);
    let plan = topology::compose(&config)?;

    assert_eq!(tiers(&plan), [Tier::Public, Tier::Workstation]);
    assert_eq!(plan.subnets.subnets().count(), 2);

    for group in [GroupName::LoadBalancer, GroupName::ReverseProxy, GroupName::Nucleus] {
        assert!(!plan.security_groups.contains(group), "{group} should be absent");
    }
    for tier in [Tier::LoadBalancer, Tier::ReverseProxy, Tier::Nucleus] {
        assert!(!plan.network_acls.contains(tier), "{tier} ACL should be absent");
    }

    let json = serde_json::to_value(&plan)?;
    let acls = json["networkAcls"].as_object().expect("acls serialize as a map");
    assert_eq!(acls.len(), 2);
    Ok(())
}

#[test]
fn public_acl_orders_ssh_before_web() -> anyhow::Result<()> {
    let config = plan_config(
        ModuleSelection::default(),
        false,
        &["10.0.0.0/24", "203.0.113.0/24"],
        2,
    );
    let plan = topology::compose(&config)?;
    let public = plan.network_acls.get(Tier::Public).expect("public ACL");

    let ingress: Vec<(u16, PortRange)> = public.ingress().map(|e| (e.rule_number, e.ports)).collect();
    assert_eq!(
        ingress,
        [
            (50, PortRange::single(22)),
            (51, PortRange::single(22)),
            (200, PortRange::single(443)),
            (300, PortRange::single(80)),
            (1000, PortRange::EPHEMERAL),
        ]
    );
    assert_eq!(public.egress().count(), 1);
    Ok(())
}

#[test]
fn exhausted_address_space_produces_nothing() {
    let mut config = plan_config(ModuleSelection::default(), false, &[], 3);
    config.cidr_block = "10.0.0.0/18".parse().expect("literal cidr");

    assert_eq!(
        topology::compose(&config),
        Err(PlanError::AddressSpaceExhausted {
            cidr: "10.0.0.0/18".to_string(),
            prefix: 20,
            required: 15,
            available: 4,
        })
    );
}

#[test]
fn relaxed_profile_widens_only_nucleus_acls() -> anyhow::Result<()> {
    let mut config = plan_config(ModuleSelection::default(), false, &["10.0.0.0/24"], 2);
    let strict = topology::compose(&config)?;
    config.acl_profile = AclProfile::Relaxed;
    let relaxed = topology::compose(&config)?;

    assert_eq!(strict.subnets, relaxed.subnets);
    assert_eq!(strict.security_groups, relaxed.security_groups);
    assert_eq!(
        strict.network_acls.get(Tier::Public),
        relaxed.network_acls.get(Tier::Public)
    );

    let nucleus = relaxed.network_acls.get(Tier::Nucleus).expect("nucleus ACL");
    let entry = nucleus.entry(Direction::Ingress, 1000).expect("wide entry");
    assert_eq!((entry.protocol, entry.ports), (Protocol::Tcp, PortRange::ALL));
    Ok(())
}

#[test]
fn nat_gateway_and_endpoints_follow_nucleus() -> anyhow::Result<()> {
    let full = topology::compose(&plan_config(ModuleSelection::default(), false, &[], 2))?;
    let nat = Source::SecurityGroup {
        group: GroupName::NatGateway,
    };
    for group in [GroupName::LoadBalancer, GroupName::ReverseProxy, GroupName::Nucleus] {
        assert!(sources_on_port(&full, group, 443).contains(&nat), "{group}");
    }

    let services: Vec<EndpointService> = full.endpoints.iter().map(|e| e.service).collect();
    assert_eq!(services, EndpointService::ALL);
    for endpoint in &full.endpoints {
        assert!(endpoint.tiers.iter().all(|tier| full.subnets.contains(*tier)));
    }

    let base = topology::compose(&plan_config(ModuleSelection::new(true, false), false, &[], 1))?;
    assert_eq!(base.endpoints.len(), 1);
    assert_eq!(base.endpoints[0].tiers, [Tier::Workstation]);
    Ok(())
}
