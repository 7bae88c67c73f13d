//! Randomness seam for every probabilistic decision the AI makes.
//! This module exists so simulations can run from a seeded PRNG and tests
//! can script exact rolls.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform value in `0..bound`; `0` when `bound` is `0`.
    fn next_int(&mut self, bound: u32) -> u32;

    /// True with probability `1 / n`.
    fn one_in(&mut self, n: u32) -> bool {
        self.next_int(n.max(1)) == 0
    }

    fn roll_percent(&mut self) -> u32 {
        self.next_int(100)
    }

    fn coin(&mut self) -> bool {
        self.next_int(2) == 1
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_int(&mut self, bound: u32) -> u32 {
        (**self).next_int(bound)
    }
}

/// ChaCha8-backed source; identical seeds replay identical decisions.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn next_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        // Widening multiply keeps the bias below 2^-32.
        ((u64::from(self.rng.next_u32()) * u64::from(bound)) >> 32) as u32
    }
}

/// Replays a fixed list of raw rolls (each reduced modulo the bound),
/// cycling when exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    rolls: Vec<u32>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(rolls: impl Into<Vec<u32>>) -> Self {
        Self { rolls: rolls.into(), cursor: 0 }
    }

    /// Always rolls zero: every `one_in` check succeeds.
    pub fn zeros() -> Self {
        Self::new(vec![0])
    }

    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_int(&mut self, bound: u32) -> u32 {
        if bound == 0 || self.rolls.is_empty() {
            self.cursor += 1;
            return 0;
        }
        let roll = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        roll % bound
    }
}
