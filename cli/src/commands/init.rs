use std::fs;

use anyhow::{Context, bail};
use omnivpc_common::config::{PlanConfig, PlanFile};
use tracing::info;

use crate::commands::InitArgs;

pub fn init(args: InitArgs) -> anyhow::Result<()> {
    let path = args.config.path();
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let file = PlanFile {
        allowed_ranges: split_ranges(args.allowed_ranges.as_deref().unwrap_or_default()),
        ..PlanFile::default()
    };
    PlanConfig::try_from(file.clone()).context("invalid plan")?;

    let json = file.to_json_pretty().context("failed to serialize plan file")?;
    fs::write(path, json + "\n")
        .with_context(|| format!("failed to write plan file {}", path.display()))?;

    info!("wrote {}", path.display());
    Ok(())
}

fn split_ranges(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .map(String::from)
        .collect()
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

    #[test]
    fn test_split_ranges_trims_and_skips_empty() {
        assert_eq!(
            split_ranges(" 10.0.0.0/24, ,192.168.1.0/24 ,"),
            ["10.0.0.0/24", "192.168.1.0/24"]
        );
        assert!(split_ranges("").is_empty());
    }
}
