//! Address and traffic vocabulary shared by the planner and its front ends.

pub mod range;
pub mod tier;
pub mod traffic;
