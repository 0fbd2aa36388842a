//! Deterministic `DeterministicRng` doubles.

use emberfall_core::rng::DeterministicRng;

/// Always returns `min` for ranged draws and `0.0` for floats. Every d20
/// rolls a natural 1 and every damage die its minimum.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// Replays a fixed sequence of draws, ignoring the requested range.
///
/// Panics when the sequence runs out, which flags a test whose scripted
/// rolls no longer match the code under test.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Creates a sequence RNG.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.index
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, _min: u32, _max: u32) -> u32 {
        let val = self.values[self.index];
        self.index += 1;
        val
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}
