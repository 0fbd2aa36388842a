//! Shared test doubles for the Emberfall rules engine.

mod clock;
mod rng;
mod store;

pub use clock::FixedClock;
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingStore, InMemoryStore};
