use std::net::Ipv4Addr;

use omnivpc_common::config::ModuleSelection;
use omnivpc_common::network::range::Ipv4Range;
use omnivpc_common::network::tier::Tier;
use omnivpc_common::network::traffic::{Direction, PortRange};
use omnivpc_core::security_groups::{GroupName, Source};
use omnivpc_core::subnets::plan_subnets;
use omnivpc_core::topology;
use pnet::ipnetwork::Ipv4Network;
use proptest::prelude::*;

use super::plan_config;

fn modules() -> impl Strategy<Value = ModuleSelection> {
    prop_oneof![
        Just(ModuleSelection::new(true, false)),
        Just(ModuleSelection::new(false, true)),
        Just(ModuleSelection::new(true, true)),
    ]
}

fn allowed_ranges(max: usize) -> impl Strategy<Value = Vec<Ipv4Network>> {
    prop::collection::vec((1u8..=223, any::<u8>(), 8u8..=32), 0..max).prop_map(|raw| {
        raw.into_iter()
            .map(|(a, b, prefix)| {
                let net = Ipv4Network::new(Ipv4Addr::new(a, b, 0, 0), prefix).expect("prefix <= 32");
                Ipv4Network::new(net.network(), prefix).expect("prefix <= 32")
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn tiers_follow_module_selection(modules in modules(), internet_facing in any::<bool>(), zones in 1usize..4) {
        let specs = plan_subnets(modules, internet_facing, zones).unwrap();
        let tiers: Vec<Tier> = specs.iter().map(|spec| spec.tier).collect();

        prop_assert!(tiers.contains(&Tier::Public));
        prop_assert!(tiers.contains(&Tier::Workstation));
        prop_assert_eq!(
            tiers.contains(&Tier::LoadBalancer),
            modules.nucleus && !internet_facing
        );
        prop_assert_eq!(tiers.contains(&Tier::Nucleus), modules.nucleus);
        prop_assert!(specs.iter().all(|spec| spec.zone_count == zones));
    }

    #[test]
    fn subnets_are_disjoint_and_contained(
        modules in modules(),
        internet_facing in any::<bool>(),
        zones in 1usize..4,
        second_octet in any::<u8>(),
    ) {
        let mut config = plan_config(modules, internet_facing, &[], zones);
        config.cidr_block = Ipv4Network::new(Ipv4Addr::new(10, second_octet, 0, 0), 16).unwrap();
        let plan = topology::compose(&config).unwrap();

        let vpc = Ipv4Range::from(config.cidr_block);
        let ranges: Vec<Ipv4Range> = plan
            .subnets
            .subnets()
            .map(|(_, subnet)| Ipv4Range::from(subnet.cidr))
            .collect();

        for (i, range) in ranges.iter().enumerate() {
            prop_assert!(vpc.contains(range));
            for other in &ranges[i + 1..] {
                prop_assert!(!range.overlaps(other), "{:?} overlaps {:?}", range, other);
            }
        }
    }

    #[test]
    fn ssh_entries_are_numbered_sequentially(ranges in allowed_ranges(40)) {
        let mut config = plan_config(ModuleSelection::default(), false, &[], 2);
        config.allowed_ranges = ranges.clone();
        let plan = topology::compose(&config).unwrap();
        let public = plan.network_acls.get(Tier::Public).unwrap();

        let ssh: Vec<(u16, Ipv4Network)> = public
            .ingress()
            .filter(|entry| entry.ports == PortRange::single(22))
            .map(|entry| (entry.rule_number, entry.cidr))
            .collect();
        let expected: Vec<(u16, Ipv4Network)> = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| (50 + i as u16, *range))
            .collect();
        prop_assert_eq!(ssh, expected);
        prop_assert!(public.entry(Direction::Ingress, 200).is_some());
    }

    #[test]
    fn compose_is_idempotent(
        modules in modules(),
        internet_facing in any::<bool>(),
        ranges in allowed_ranges(8),
    ) {
        let mut config = plan_config(modules, internet_facing, &[], 2);
        config.allowed_ranges = ranges;

        let first = topology::compose(&config).unwrap();
        let second = topology::compose(&config).unwrap();
        prop_assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn nucleus_never_admits_allowed_ranges(
        internet_facing in any::<bool>(),
        ranges in allowed_ranges(8),
    ) {
        let mut config = plan_config(ModuleSelection::default(), internet_facing, &[], 2);
        config.allowed_ranges = ranges;
        let plan = topology::compose(&config).unwrap();

        let nucleus = plan.security_groups.get(GroupName::Nucleus).unwrap();
        prop_assert!(!nucleus.ingress.is_empty());
        prop_assert!(nucleus.ingress.iter().all(|rule| !rule.source.is_allowed_range()));
    }

    #[test]
    fn references_only_name_present_tiers(
        modules in modules(),
        internet_facing in any::<bool>(),
        zones in 1usize..4,
    ) {
        let config = plan_config(modules, internet_facing, &["203.0.113.0/24"], zones);
        let plan = topology::compose(&config).unwrap();

        for group in plan.security_groups.iter() {
            for rule in &group.ingress {
                if let Source::Subnet { tier, .. } = rule.source {
                    prop_assert!(plan.subnets.contains(tier));
                }
            }
        }
        for endpoint in &plan.endpoints {
            prop_assert!(!endpoint.tiers.is_empty());
            prop_assert!(endpoint.tiers.iter().all(|tier| plan.subnets.contains(*tier)));
        }
        for acl in plan.network_acls.iter() {
            prop_assert!(plan.subnets.contains(acl.tier));
        }
    }
}
