//! Deterministic seeded PRNG.
//!
//! A 32-bit mixing generator seeded from a string. The same seed bytes produce the
//! same stream on every platform: seeding is fixed-width integer hashing and floats
//! come from a single IEEE-754 division.

/// Seeded 32-bit generator used for every stochastic decision in generation.
#[derive(Debug, Clone)]
pub struct Prng {
    state: u32,
}

impl Prng {
    /// Create a generator from a raw 32-bit state.
    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Create a generator from a seed string.
    pub fn from_seed_str(seed: &str) -> Self {
        Self::from_state(seed_state(seed))
    }

    /// Current internal state (for diagnostics and forking).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    pub fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        ((self.next_f64() * bound as f64) as usize).min(bound - 1)
    }

    /// Uniform integer in `[lo, hi]` (inclusive).
    pub fn range_inclusive(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        lo + self.next_int(hi - lo + 1)
    }

    /// Bernoulli trial with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick a random element.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.next_int(items.len()))
        }
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_int(i + 1);
            slice.swap(i, j);
        }
    }

    /// Derive an independent child generator keyed by `label`.
    pub fn fork(&mut self, label: &str) -> Prng {
        let salt = self.next_u32();
        Prng::from_state(seed_state(label) ^ salt.rotate_left(11))
    }
}

/// Hash a seed string to a 32-bit state (FNV-1a followed by a murmur3 finalizer).
pub fn seed_state(seed: &str) -> u32 {
    let mut h: u32 = 0x811C_9DC5;
    for &b in seed.as_bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}
