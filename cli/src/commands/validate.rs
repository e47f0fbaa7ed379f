use anyhow::Context;
use colored::*;
use omnivpc_common::config::{Config, PlanConfig};
use omnivpc_core::topology;
use tracing::info;

use crate::commands::{ConfigArg, load_plan_file};
use crate::terminal::{colors, print};

pub fn validate(arg: ConfigArg, cfg: &Config) -> anyhow::Result<()> {
    let file = load_plan_file(&arg)?;
    let config = PlanConfig::try_from(file).context("invalid plan")?;
    let plan = topology::compose(&config).context("failed to compose topology")?;

    print::header("plan is valid", cfg.quiet);
    print::align_keys(&["subnets", "security groups", "network acls", "vpc endpoints"]);
    print::aligned_line("subnets", plan.subnets.subnets().count().to_string().color(colors::ACCENT));
    print::aligned_line(
        "security groups",
        plan.security_groups.len().to_string().color(colors::ACCENT),
    );
    print::aligned_line("network acls", plan.network_acls.len().to_string().color(colors::ACCENT));
    print::aligned_line("vpc endpoints", plan.endpoints.len().to_string().color(colors::ACCENT));

    info!("{} is deployable", config.stack_name);
    Ok(())
}
