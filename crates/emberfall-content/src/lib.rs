//! Emberfall — Content Authoring bounded context.
//!
//! Responsible for ingesting campaign documents (YAML or JSON), validating
//! their cross references, and hashing them into a content version.

pub mod application;
pub mod domain;
