//! Application layer for the Content Authoring context.

pub mod loader;
