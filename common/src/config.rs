//! # Configuration
//!
//! Two kinds of configuration live here:
//! * [`Config`] holds runtime switches of the command-line front end.
//! * [`PlanConfig`] is the validated input of one planning pass. It is built
//!   from a [`PlanFile`], the raw JSON document an operator edits, so the
//!   planner itself never touches the file system.

use std::fmt;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::network::range;
use crate::network::tier::MAX_AVAILABILITY_ZONES;

/// Smallest and largest VPC block the provider accepts.
pub const MIN_VPC_PREFIX: u8 = 16;
pub const MAX_VPC_PREFIX: u8 = 28;

pub struct Config {
    /// Suppresses the banner printed at startup.
    pub no_banner: bool,
    /// 0 prints everything, 1 drops decorations, 2 only prints warnings and errors.
    pub quiet: u8,
}

/// Which deployment modules take part in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleSelection {
    /// Workstation AMI or workstation fleet.
    #[serde(default)]
    pub workstation: bool,
    /// Nucleus collaboration server.
    #[serde(default)]
    pub nucleus: bool,
}

impl ModuleSelection {
    pub fn new(workstation: bool, nucleus: bool) -> Self {
        Self {
            workstation,
            nucleus,
        }
    }

    pub fn any(&self) -> bool {
        self.workstation || self.nucleus
    }
}

impl Default for ModuleSelection {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl FromStr for ModuleSelection {
    type Err = PlanError;

    /// Parses a whitespace or comma separated stack list such as
    /// `"workstation-ami workstation-fleet nucleus"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut selection = ModuleSelection::new(false, false);

        for stack in s.split(|c: char| c.is_whitespace() || c == ',') {
            match stack.trim().to_ascii_lowercase().as_str() {
                "" => continue,
                "workstation-ami" | "workstation-fleet" | "workstation" => {
                    selection.workstation = true
                }
                "nucleus" => selection.nucleus = true,
                other => {
                    return Err(PlanError::invalid_input(format!(
                        "unknown stack '{other}' (expected workstation-ami, workstation-fleet or nucleus)"
                    )));
                }
            }
        }

        Ok(selection)
    }
}

impl fmt::Display for ModuleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.workstation {
            names.push("workstation");
        }
        if self.nucleus {
            names.push("nucleus");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

/// Granularity of the network ACLs on the Nucleus tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclProfile {
    /// Per-port entries mirroring the security groups.
    #[default]
    Strict,
    /// One wide TCP allow per Nucleus tier.
    Relaxed,
}

impl FromStr for AclProfile {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(AclProfile::Strict),
            "relaxed" => Ok(AclProfile::Relaxed),
            other => Err(PlanError::invalid_input(format!(
                "unknown ACL profile '{other}' (expected strict or relaxed)"
            ))),
        }
    }
}

impl fmt::Display for AclProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AclProfile::Strict => f.write_str("strict"),
            AclProfile::Relaxed => f.write_str("relaxed"),
        }
    }
}

/// The plan file as written on disk. Nothing in here is validated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanFile {
    pub name: String,
    pub cidr_range: String,
    pub availability_zones: usize,
    pub allowed_ranges: Vec<String>,
    pub internet_facing: bool,
    pub modules: ModuleSelection,
    pub acl_profile: AclProfile,
}

impl Default for PlanFile {
    fn default() -> Self {
        Self {
            name: "omniverse".to_string(),
            cidr_range: "10.0.0.0/16".to_string(),
            availability_zones: 2,
            allowed_ranges: Vec::new(),
            internet_facing: false,
            modules: ModuleSelection::default(),
            acl_profile: AclProfile::Strict,
        }
    }
}

impl PlanFile {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Validated input of one planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    pub stack_name: String,
    pub modules: ModuleSelection,
    pub internet_facing: bool,
    /// Trusted external networks, in operator order.
    pub allowed_ranges: Vec<Ipv4Network>,
    /// The deployment's single top-level address block.
    pub cidr_block: Ipv4Network,
    pub availability_zones: usize,
    pub acl_profile: AclProfile,
}

impl PlanConfig {
    /// Checks the invariants the planner relies on. Called by `try_from`,
    /// and again by the composer for configs built by hand.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.stack_name.trim().is_empty() {
            return Err(PlanError::invalid_input("stack name must not be empty"));
        }
        if self.availability_zones == 0 {
            return Err(PlanError::invalid_input(
                "at least one availability zone is required",
            ));
        }
        if self.availability_zones > MAX_AVAILABILITY_ZONES {
            return Err(PlanError::invalid_input(format!(
                "{} availability zones requested, at most {MAX_AVAILABILITY_ZONES} are supported",
                self.availability_zones
            )));
        }
        if !self.modules.any() {
            return Err(PlanError::invalid_input(
                "no module selected (expected workstation and/or nucleus)",
            ));
        }

        let prefix = self.cidr_block.prefix();
        if !(MIN_VPC_PREFIX..=MAX_VPC_PREFIX).contains(&prefix) {
            return Err(PlanError::invalid_input(format!(
                "top-level CIDR {} must have a prefix between /{MIN_VPC_PREFIX} and /{MAX_VPC_PREFIX}",
                self.cidr_block
            )));
        }

        if let Some(open) = self.allowed_ranges.iter().find(|net| net.prefix() == 0) {
            return Err(PlanError::invalid_input(format!(
                "allowed range {open} admits every address; list trusted networks instead"
            )));
        }

        Ok(())
    }
}

impl TryFrom<PlanFile> for PlanConfig {
    type Error = PlanError;

    fn try_from(file: PlanFile) -> Result<Self, Self::Error> {
        let cidr_block = range::parse_cidr(&file.cidr_range)?;
        let allowed_ranges = file
            .allowed_ranges
            .iter()
            .map(|raw| range::parse_cidr(raw))
            .collect::<Result<Vec<Ipv4Network>, PlanError>>()?;

        let config = PlanConfig {
            stack_name: file.name.trim().to_string(),
            modules: file.modules,
            internet_facing: file.internet_facing,
            allowed_ranges,
            cidr_block,
            availability_zones: file.availability_zones,
            acl_profile: file.acl_profile,
        };
        config.validate()?;
        Ok(config)
    }
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
    fn test_module_selection_from_stacks() {
        let selection: ModuleSelection = "workstation-ami nucleus".parse().unwrap();
        assert_eq!(selection, ModuleSelection::new(true, true));

        let selection: ModuleSelection = "workstation-fleet".parse().unwrap();
        assert_eq!(selection, ModuleSelection::new(true, false));

        let selection: ModuleSelection = " Nucleus , ".parse().unwrap();
        assert_eq!(selection, ModuleSelection::new(false, true));

        let selection: ModuleSelection = "".parse().unwrap();
        assert!(!selection.any());

        assert!("nucleus farm".parse::<ModuleSelection>().is_err());
    }

    #[test]
    fn test_acl_profile_from_str() {
        assert_eq!("STRICT".parse::<AclProfile>(), Ok(AclProfile::Strict));
        assert_eq!("relaxed".parse::<AclProfile>(), Ok(AclProfile::Relaxed));
        assert!("loose".parse::<AclProfile>().is_err());
    }

    #[test]
    fn test_plan_file_defaults_fill_missing_keys() {
        let file = PlanFile::from_json(r#"{ "name": "studio", "internetFacing": true }"#).unwrap();
        assert_eq!(file.name, "studio");
        assert!(file.internet_facing);
        assert_eq!(file.cidr_range, "10.0.0.0/16");
        assert_eq!(file.availability_zones, 2);
        assert_eq!(file.modules, ModuleSelection::new(true, true));
        assert_eq!(file.acl_profile, AclProfile::Strict);
    }

    #[test]
    fn test_plan_file_camel_case_round_trip() {
        let file = PlanFile {
            allowed_ranges: vec!["10.0.0.0/24".to_string()],
            acl_profile: AclProfile::Relaxed,
            ..PlanFile::default()
        };
        let json = file.to_json_pretty().unwrap();
        assert!(json.contains("\"cidrRange\""));
        assert!(json.contains("\"allowedRanges\""));
        assert!(json.contains("\"aclProfile\": \"relaxed\""));
        assert_eq!(PlanFile::from_json(&json).unwrap(), file);
    }

    #[test]
    fn test_plan_config_parses_and_normalizes() {
        let file = PlanFile {
            cidr_range: "10.0.0.0/16".to_string(),
            allowed_ranges: vec!["192.168.7.9/24".to_string(), " 10.2.0.0/16".to_string()],
            ..PlanFile::default()
        };
        let config = PlanConfig::try_from(file).unwrap();
        let ranges: Vec<String> = config.allowed_ranges.iter().map(|r| r.to_string()).collect();
        assert_eq!(ranges, ["192.168.7.0/24", "10.2.0.0/16"]);
        assert_eq!(config.cidr_block.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn test_plan_config_rejects_bad_inputs() {
        let cases = [
            PlanFile { availability_zones: 0, ..PlanFile::default() },
            PlanFile { availability_zones: 27, ..PlanFile::default() },
            PlanFile { availability_zones: usize::MAX, ..PlanFile::default() },
            PlanFile { modules: ModuleSelection::new(false, false), ..PlanFile::default() },
            PlanFile { name: "  ".to_string(), ..PlanFile::default() },
            PlanFile { cidr_range: "10.0.0.0/8".to_string(), ..PlanFile::default() },
            PlanFile { cidr_range: "10.0.0.0/29".to_string(), ..PlanFile::default() },
            PlanFile { cidr_range: "10.0.0.0".to_string(), ..PlanFile::default() },
            PlanFile { allowed_ranges: vec!["0.0.0.0/0".to_string()], ..PlanFile::default() },
            PlanFile { allowed_ranges: vec!["office".to_string()], ..PlanFile::default() },
        ];

        for file in cases {
            let result = PlanConfig::try_from(file.clone());
            assert!(
                matches!(result, Err(PlanError::InvalidTopologyInput { .. })),
                "expected rejection for {file:?}, got {result:?}"
            );
        }
    }
}
