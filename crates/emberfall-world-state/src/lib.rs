//! Emberfall — World State bounded context.
//!
//! Responsible for the persisted world record: story flags, visited nodes,
//! inventory and gold, the world map (current, unlocked and visited
//! locations, sanctuaries), explored tables, and merchant trades.

pub mod domain;
