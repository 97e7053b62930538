//! Uniform random draws, injectable for tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in [0, 1)
pub trait RandomSource: Send + Sync {
    fn next_unit(&mut self) -> f64;
}

/// Reproducible draws from a seed
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Draws from the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling at the end
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    pos: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, pos: 0 }
    }

    /// Same value forever
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.5;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        // keep within [0, 1)
        if v.is_nan() {
            0.0
        } else {
            v.clamp(0.0, 1.0 - f64::EPSILON)
        }
    }
}

/// Seeded when a seed is given, thread-local otherwise
pub fn random_source(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}
