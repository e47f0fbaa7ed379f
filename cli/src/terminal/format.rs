use colored::*;
use omnivpc_common::config::{Config, PlanConfig};
use omnivpc_common::network::tier::zone_letter;
use omnivpc_common::network::traffic::{Direction, RuleAction};
use omnivpc_core::endpoints::VpcEndpoint;
use omnivpc_core::nacls::{AclEntry, NetworkAcl};
use omnivpc_core::security_groups::SecurityGroup;
use omnivpc_core::subnets::SubnetGroup;
use omnivpc_core::topology::TopologyPlan;

use crate::mprint;
use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

pub fn render_plan(plan: &TopologyPlan, config: &PlanConfig, cfg: &Config) {
    print::header("subnets", cfg.quiet);
    for (idx, group) in plan.subnets.groups.iter().enumerate() {
        print::tree_head(idx, group.spec.name);
        print::as_tree_one_level(subnet_details(group));
    }

    print::header("security groups", cfg.quiet);
    for (idx, group) in plan.security_groups.iter().enumerate() {
        print::tree_head(idx, &group.group_name);
        print::as_tree_one_level(group_details(group));
    }

    print::header("network acls", cfg.quiet);
    for (idx, acl) in plan.network_acls.iter().enumerate() {
        print::tree_head(idx, &acl.acl_name);
        print::as_tree_one_level(acl_details(acl));
    }

    print::header("vpc endpoints", cfg.quiet);
    for (idx, endpoint) in plan.endpoints.iter().enumerate() {
        print::tree_head(idx, &endpoint.name);
        print::as_tree_one_level(endpoint_details(endpoint));
    }

    if cfg.quiet > 0 {
        mprint!();
    }
    print_summary(plan, config, cfg);
}

fn subnet_details(group: &SubnetGroup) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![(
        "routing".to_string(),
        group.spec.routing.to_string().color(colors::TEXT_DEFAULT),
    )];
    details.extend(group.subnets.iter().map(|subnet| {
        (
            format!("zone {}", zone_letter(subnet.zone).unwrap_or('?')),
            format!("{} {}", subnet.cidr.to_string().color(colors::CIDR), subnet.name.dimmed())
                .normal(),
        )
    }));
    details
}

fn group_details(group: &SecurityGroup) -> Vec<Detail> {
    let mut details: Vec<Detail> = Vec::new();
    if group.ingress.is_empty() {
        details.push(("ingress".to_string(), "none".dimmed()));
    }
    details.extend(group.ingress.iter().map(|rule| {
        (
            format!("{} {}", rule.protocol, rule.port),
            format!(
                "{} {}",
                rule.source.to_string().color(colors::CIDR),
                rule.description.dimmed()
            )
            .normal(),
        )
    }));
    if group.allow_all_outbound {
        details.push(("egress".to_string(), "all".color(colors::ALLOW)));
    }
    details
}

fn acl_details(acl: &NetworkAcl) -> Vec<Detail> {
    acl.entries.iter().map(acl_entry_detail).collect()
}

fn acl_entry_detail(entry: &AclEntry) -> Detail {
    let direction = match entry.direction {
        Direction::Ingress => "in",
        Direction::Egress => "out",
    };
    let action = match entry.action {
        RuleAction::Allow => entry.action.to_string().color(colors::ALLOW),
        RuleAction::Deny => entry.action.to_string().color(colors::DENY),
    };
    (
        format!("{direction} {}", entry.rule_number),
        format!(
            "{} {} {} {} {}",
            action,
            entry.protocol,
            entry.ports.to_string().color(colors::PORT),
            entry.cidr.to_string().color(colors::CIDR),
            entry.name.dimmed()
        )
        .normal(),
    )
}

fn endpoint_details(endpoint: &VpcEndpoint) -> Vec<Detail> {
    let tiers: Vec<&str> = endpoint.tiers.iter().map(|tier| tier.as_str()).collect();
    let mut details: Vec<Detail> = vec![
        (
            "service".to_string(),
            format!("{} ({})", endpoint.service.service_name(), endpoint.kind)
                .color(colors::TEXT_DEFAULT),
        ),
        ("tiers".to_string(), tiers.join(", ").color(colors::ACCENT)),
    ];
    if !endpoint.security_groups.is_empty() {
        let groups: Vec<&str> = endpoint.security_groups.iter().map(|g| g.as_str()).collect();
        details.push(("groups".to_string(), groups.join(", ").color(colors::PRIMARY)));
    }
    details
}

fn print_summary(plan: &TopologyPlan, config: &PlanConfig, cfg: &Config) {
    if cfg.quiet == 0 {
        print::fat_separator();
        print::centerln(&format!("{}", "PLAN SUMMARY".bright_green().bold()));
    }

    let subnet_count = plan.subnets.subnets().count();
    print::align_keys(&[
        "stack", "vpc cidr", "modules", "zones", "subnets", "groups", "acls", "endpoints",
    ]);
    print::aligned_line("stack", config.stack_name.as_str());
    print::aligned_line("vpc cidr", plan.subnets.vpc_cidr.to_string().color(colors::CIDR));
    print::aligned_line("modules", config.modules.to_string());
    print::aligned_line("zones", config.availability_zones.to_string());
    print::aligned_line("subnets", subnet_count.to_string().color(colors::RULE_NUMBER));
    print::aligned_line("groups", plan.security_groups.len().to_string().color(colors::RULE_NUMBER));
    print::aligned_line(
        "acls",
        format!("{} ({})", plan.network_acls.len(), config.acl_profile).color(colors::RULE_NUMBER),
    );
    print::aligned_line("endpoints", plan.endpoints.len().to_string().color(colors::RULE_NUMBER));
    print::end_of_program();
}
