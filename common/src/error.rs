//! Planning errors.
//!
//! Every failure terminates planning immediately. The computation is pure, so
//! none of them is worth retrying; each variant names the offending input.

use thiserror::Error;

use crate::network::tier::Tier;
use crate::network::traffic::Direction;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid topology input: {reason}")]
    InvalidTopologyInput { reason: String },

    #[error(
        "address space exhausted: {required} /{prefix} subnets requested but {cidr} only holds {available}"
    )]
    AddressSpaceExhausted {
        cidr: String,
        prefix: u8,
        required: u64,
        available: u64,
    },

    #[error("rule number {rule_number} ({direction}) is already taken in network ACL '{acl}'")]
    RuleNumberCollision {
        acl: String,
        direction: Direction,
        rule_number: u16,
    },

    #[error("rule references tier '{tier}' which is absent from the current topology")]
    UnknownTierReference { tier: Tier },
}

impl PlanError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        PlanError::InvalidTopologyInput {
            reason: reason.into(),
        }
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
    fn test_address_space_exhausted_message() {
        let error = PlanError::AddressSpaceExhausted {
            cidr: "10.0.0.0/18".to_string(),
            prefix: 20,
            required: 10,
            available: 4,
        };
        assert_eq!(
            error.to_string(),
            "address space exhausted: 10 /20 subnets requested but 10.0.0.0/18 only holds 4"
        );
    }

    #[test]
    fn test_rule_number_collision_message() {
        let error = PlanError::RuleNumberCollision {
            acl: "omniverse-public".to_string(),
            direction: Direction::Ingress,
            rule_number: 200,
        };
        assert_eq!(
            error.to_string(),
            "rule number 200 (ingress) is already taken in network ACL 'omniverse-public'"
        );
    }

    #[test]
    fn test_unknown_tier_message() {
        let error = PlanError::UnknownTierReference {
            tier: Tier::ReverseProxy,
        };
        assert_eq!(
            error.to_string(),
            "rule references tier 'reverse-proxy' which is absent from the current topology"
        );
    }
}
