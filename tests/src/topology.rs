mod properties;
mod scenarios;

use omnivpc_common::config::{AclProfile, ModuleSelection, PlanConfig, PlanFile};

pub(crate) fn plan_config(
    modules: ModuleSelection,
    internet_facing: bool,
    allowed_ranges: &[&str],
    availability_zones: usize,
) -> PlanConfig {
    PlanConfig::try_from(PlanFile {
        name: "omniverse".to_string(),
        allowed_ranges: allowed_ranges.iter().map(|r| r.to_string()).collect(),
        internet_facing,
        modules,
        availability_zones,
        acl_profile: AclProfile::Strict,
        ..PlanFile::default()
    })
    .expect("fixture config is valid")
}
