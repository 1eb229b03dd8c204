//! Per-screen deterministic randomness
//!
//! A Borland-style linear congruential generator reseeded from the screen
//! index on every activation, so a screen always reproduces the same timer
//! jitter. The arithmetic (multiplier, 19-bit output mask, the discarded first
//! draw) is kept bit-exact.

use rand::{RngCore, SeedableRng};

const MULTIPLIER: u64 = 0x015a_4e35;
const INCREMENT: u64 = 1;
const OUTPUT_MASK: u64 = 0x7_FFFF;
const OUTPUT_RANGE: u64 = OUTPUT_MASK + 1;

/// Number of jitter bytes drawn per screen activation
pub const RANDOM_TABLE_LEN: usize = 64;

/// Linear congruential generator with the legacy output window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorlandRng {
    state: u64,
}

impl BorlandRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generator for a screen: `seed = 256 * n + n`, first value discarded
    pub fn for_screen(index: u8) -> Self {
        let n = index as u64;
        let mut rng = Self::new(256 * n + n);
        rng.rand();
        rng
    }

    /// Next raw value (19 bits)
    pub fn rand(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        ((self.state >> 16) & OUTPUT_MASK) as u32
    }

    /// Value in `0..num`
    pub fn random(&mut self, num: u32) -> u32 {
        ((self.rand() as u64 * num as u64) / OUTPUT_RANGE) as u32
    }
}

impl RngCore for BorlandRng {
    fn next_u32(&mut self) -> u32 {
        self.rand()
    }

    fn next_u64(&mut self) -> u64 {
        let high = self.next_u32() as u64;
        let low = self.next_u32() as u64;
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for byte in dst {
            *byte = self.random(256) as u8;
        }
    }
}

impl SeedableRng for BorlandRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}

/// Jitter bytes for the live screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRandom {
    bytes: [u8; RANDOM_TABLE_LEN],
}

impl ScreenRandom {
    pub fn for_screen(index: u8) -> Self {
        let mut bytes = [0u8; RANDOM_TABLE_LEN];
        BorlandRng::for_screen(index).fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Jitter byte for a key (wraps around the table)
    #[inline]
    pub fn byte(&self, key: usize) -> u8 {
        self.bytes[key % RANDOM_TABLE_LEN]
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for ScreenRandom {
    fn default() -> Self {
        Self::for_screen(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_sequence() {
        let mut rng = BorlandRng::new(1);
        // 0x015a4e35 * 1 + 1 = 0x015a4e36 → (>> 16) & 0x7ffff = 0x15a
        assert_eq!(rng.rand(), 0x15a);
        let expected_state = 0x015a_4e36u64 * MULTIPLIER + 1;
        assert_eq!(rng.rand(), ((expected_state >> 16) & OUTPUT_MASK) as u32);
    }

    #[test]
    fn test_screen_seed_discards_first_value() {
        let mut manual = BorlandRng::new(256 * 17 + 17);
        manual.rand();
        let mut seeded = BorlandRng::for_screen(17);
        assert_eq!(manual.rand(), seeded.rand());
    }

    #[test]
    fn test_random_range() {
        let mut rng = BorlandRng::for_screen(200);
        for _ in 0..1000 {
            assert!(rng.random(10) < 10);
        }
    }

    #[test]
    fn test_same_screen_same_table() {
        assert_eq!(ScreenRandom::for_screen(42), ScreenRandom::for_screen(42));
        assert_ne!(
            ScreenRandom::for_screen(42).bytes(),
            ScreenRandom::for_screen(43).bytes()
        );
    }

    #[test]
    fn test_seedable() {
        let mut a = BorlandRng::from_seed(5u64.to_le_bytes());
        let mut b = BorlandRng::new(5);
        assert_eq!(a.next_u32(), b.rand());
    }
}
