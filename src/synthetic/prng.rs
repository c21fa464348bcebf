//! Seedable linear-congruential generator.
//!
//! Fully determined by its seed and the number of draws; no external entropy.
//! Used wherever repeated offline runs must look identical.

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;
const MODULUS: f64 = 4_294_967_296.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prng {
    state: u32,
}

impl Prng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.state = MULTIPLIER.wrapping_mul(self.state).wrapping_add(INCREMENT);
        f64::from(self.state) / MODULUS
    }

    /// Next value linearly mapped into `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next()
    }

    /// Next integer in `[min, max]` (inclusive).
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        self.range(min as f64, (max + 1) as f64).floor() as i64
    }
}

impl Default for Prng {
    fn default() -> Self {
        Self::new(123_456_789)
    }
}
