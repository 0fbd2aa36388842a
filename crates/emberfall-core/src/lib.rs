//! Emberfall Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context depends on: injectable randomness, dice resolution, time, the
//! top-level domain error, and the key-value persistence boundary. It
//! contains no infrastructure code.

pub mod clock;
pub mod dice;
pub mod error;
pub mod rng;
pub mod storage;
