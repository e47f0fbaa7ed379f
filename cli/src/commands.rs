pub mod init;
pub mod plan;
pub mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use omnivpc_common::config::{AclProfile, ModuleSelection, PlanFile};
use tracing::debug;

/// Plan file read when `--config` is not given.
pub const DEFAULT_PLAN_FILE: &str = "omnivpc.json";

#[derive(Parser)]
#[command(name = "omnivpc")]
#[command(about = "Plans subnets, security groups and network ACLs for Omniverse on AWS.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Reduce output; repeat to only show warnings and errors
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose the network topology and print it
    #[command(alias = "p")]
    Plan(PlanArgs),
    /// Write a plan file with default settings
    #[command(alias = "i")]
    Init(InitArgs),
    /// Check a plan file without printing the topology
    #[command(alias = "v")]
    Validate(ConfigArg),
}

#[derive(Args)]
pub struct ConfigArg {
    /// Path to the JSON plan file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Stacks to deploy, e.g. "workstation-ami nucleus"
    #[arg(short, long)]
    pub stacks: Option<ModuleSelection>,

    /// Place the load balancer in the public subnets; `=false` keeps it private
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub internet_facing: Option<bool>,

    /// Network ACL granularity on the Nucleus tiers
    #[arg(long, value_name = "PROFILE")]
    pub acl_profile: Option<AclProfile>,

    /// Print the plan as JSON instead of a tree
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON plan to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Comma separated CIDR ranges trusted for SSH and DCV access
    #[arg(short, long, value_name = "LIST")]
    pub allowed_ranges: Option<String>,

    /// Overwrite an existing plan file
    #[arg(short, long)]
    pub force: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl PlanArgs {
    /// Overrides the plan file with the flags given on the command line.
    pub fn apply_overrides(&self, file: &mut PlanFile) {
        if let Some(stacks) = self.stacks {
            file.modules = stacks;
        }
        if let Some(internet_facing) = self.internet_facing {
            file.internet_facing = internet_facing;
        }
        if let Some(profile) = self.acl_profile {
            file.acl_profile = profile;
        }
    }
}

impl ConfigArg {
    pub fn path(&self) -> &Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PLAN_FILE))
    }
}

/// Reads the plan file. A missing default file means defaults; a missing
/// explicit `--config` file is an error.
pub fn load_plan_file(arg: &ConfigArg) -> anyhow::Result<PlanFile> {
    let path = arg.path();
    if arg.config.is_none() && !path.exists() {
        debug!("no {} found, using defaults", DEFAULT_PLAN_FILE);
        return Ok(PlanFile::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    PlanFile::from_json(&raw).with_context(|| format!("failed to parse plan file {}", path.display()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
