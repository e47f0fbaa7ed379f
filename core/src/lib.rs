//! Network topology planning for Omniverse deployments.
//!
//! From a module selection, an internet-facing flag, the trusted external
//! ranges and one top-level CIDR block, the planner derives:
//! * the subnet tiers and their address ranges ([`subnets`]),
//! * one stateful security group per role ([`security_groups`]),
//! * one stateless network ACL per tier ([`nacls`]),
//! * the placement of the AWS service endpoints ([`endpoints`]),
//!
//! and [`topology::compose`] threads them into a single immutable plan.

pub mod endpoints;
pub mod nacls;
pub mod security_groups;
pub mod subnets;
pub mod topology;
