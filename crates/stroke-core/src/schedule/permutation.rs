//! Secret-keyed slot permutation.
//!
//! An HMAC-SHA256 counter stream feeds a Fisher-Yates shuffle of `0..slot_count`.
//! Without the secret the day→slot mapping is unpredictable; with it the mapping is
//! a pure function of `(secret, slot_count, context)`.

use super::ScheduleError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic byte stream: block `i` is `HMAC(secret, "{context}|{slot_count}|{i}")`.
pub struct HmacCounterRng {
    mac: HmacSha256,
    label: String,
    counter: u64,
    block: [u8; 32],
    offset: usize,
}

impl HmacCounterRng {
    pub fn new(secret: &[u8], context: &str, slot_count: u32) -> Result<Self, ScheduleError> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| ScheduleError::InvalidSecret)?;
        Ok(Self {
            mac,
            label: format!("{}|{}", context, slot_count),
            counter: 0,
            block: [0; 32],
            offset: 32,
        })
    }

    fn refill(&mut self) {
        let mut mac = self.mac.clone();
        mac.update(self.label.as_bytes());
        mac.update(b"|");
        mac.update(self.counter.to_string().as_bytes());
        self.block.copy_from_slice(&mac.finalize().into_bytes());
        self.counter += 1;
        self.offset = 0;
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.offset + 4 > self.block.len() {
            self.refill();
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.block[self.offset..self.offset + 4]);
        self.offset += 4;
        u32::from_be_bytes(word)
    }

    /// Uniform in `[0, bound)` by rejection sampling; 0 when `bound` is 0.
    pub fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let span = 1u64 << 32;
        let zone = span - span % bound as u64;
        loop {
            let x = self.next_u32() as u64;
            if x < zone {
                return (x % bound as u64) as u32;
            }
        }
    }
}

/// Permutation of `0..slot_count`; entry `ordinal` is the slot served on that day.
pub fn slot_permutation(
    secret: &[u8],
    slot_count: u32,
    context: &str,
) -> Result<Vec<u32>, ScheduleError> {
    let mut rng = HmacCounterRng::new(secret, context, slot_count)?;
    let mut slots: Vec<u32> = (0..slot_count).collect();
    for i in (1..slots.len()).rev() {
        let j = rng.below(i as u32 + 1) as usize;
        slots.swap(i, j);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_is_stable_and_complete() {
        let a = slot_permutation(b"secret", 100, "ctx").unwrap();
        let b = slot_permutation(b"secret", 100, "ctx").unwrap();
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_permutation_depends_on_inputs() {
        let base = slot_permutation(b"secret", 64, "ctx").unwrap();
        assert_ne!(base, slot_permutation(b"other", 64, "ctx").unwrap());
        assert_ne!(base, slot_permutation(b"secret", 64, "ctx-2").unwrap());
        assert_ne!(base, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn test_degenerate_sizes() {
        assert!(slot_permutation(b"k", 0, "c").unwrap().is_empty());
        assert_eq!(slot_permutation(b"k", 1, "c").unwrap(), vec![0]);
    }

    #[test]
    fn test_below_stays_in_range() {
        let mut rng = HmacCounterRng::new(b"k", "c", 7).unwrap();
        for bound in [1, 2, 3, 7, 1000] {
            for _ in 0..50 {
                assert!(rng.below(bound) < bound);
            }
        }
        assert_eq!(rng.below(0), 0);
    }
}
