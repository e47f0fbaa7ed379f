use std::fs;

use anyhow::Context;
use omnivpc_common::config::{Config, PlanConfig};
use omnivpc_core::topology;
use tracing::info;

use crate::commands::{PlanArgs, load_plan_file};
use crate::terminal::format;

pub fn plan(args: PlanArgs, cfg: &Config) -> anyhow::Result<()> {
    let mut file = load_plan_file(&args.config)?;
    args.apply_overrides(&mut file);

    let config = PlanConfig::try_from(file).context("invalid plan")?;
    let plan = topology::compose(&config).context("failed to compose topology")?;

    if args.json || args.output.is_some() {
        let json = plan.to_json_pretty().context("failed to serialize plan")?;
        if let Some(path) = &args.output {
            fs::write(path, &json)
                .with_context(|| format!("failed to write plan to {}", path.display()))?;
            info!("plan written to {}", path.display());
        }
        if args.json {
            println!("{json}");
            return Ok(());
        }
    }

    format::render_plan(&plan, &config, cfg);
    Ok(())
}
