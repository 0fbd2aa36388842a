//! Emberfall — Session & Progress bounded context.
//!
//! Responsible for the caller-owned game session that ties a campaign, a
//! character, the narrative and an in-progress fight together, plus the
//! versioned save record and its checkpoints.

pub mod application;
pub mod domain;
