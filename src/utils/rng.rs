//! Seedable random number generator for weight initialisation and dropout.
//!
//! A lightweight xorshift PRNG keeps network construction reproducible: the
//! same seed always produces the same weights and dropout masks.

/// Xorshift-based generator.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform sample in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform sample in [low, high).
    pub fn gen_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Fills `values` from the Xavier/Glorot uniform range
    /// `[-sqrt(6 / (fan_in + fan_out)), sqrt(6 / (fan_in + fan_out))]`.
    pub fn fill_xavier(&mut self, values: &mut [f64], fan_in: usize, fan_out: usize) {
        let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
        for value in values.iter_mut() {
            *value = self.gen_range(-limit, limit);
        }
    }

    /// Derives an independent generator, e.g. for a layer that keeps its own
    /// stream of dropout masks.
    pub fn fork(&mut self) -> SimpleRng {
        let high = self.next_u32() as u64;
        let low = self.next_u32() as u64;
        SimpleRng::new((high << 32) | low)
    }
}
