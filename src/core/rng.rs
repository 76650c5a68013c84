//! Random Source Capability
//!
//! The reward engine never touches a system random source directly; it
//! consumes the [`RandomSource`] trait so rare-pool rolls are swappable
//! for deterministic testing. [`DeterministicRng`] is the standard
//! implementation: Xorshift128+, seeded per play, identical sequence on
//! all platforms.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::data::player::PlayerId;

/// Injectable randomness for reward resolution.
///
/// Two draws exist because the rare-pool algorithm uses them differently:
/// the gate roll is quantized to two decimals (a slot with `rarity: 0.37`
/// hits on exactly 37 of the 100 possible rolls), while candidate
/// selection is a plain uniform index.
pub trait RandomSource {
    /// Uniform value in `[0, 1)` at two-decimal resolution.
    fn unit_roll(&mut self) -> f64;

    /// Uniform index in `[0, len)`. Returns 0 when `len` is 0 or 1.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// Given the same seed, this generator produces the exact same sequence
/// on any platform, which makes a battle's drop rolls replayable from its
/// play seed (see [`derive_play_seed`]).
///
/// # Example
///
/// ```
/// use emberfall::core::rng::{DeterministicRng, RandomSource};
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.unit_roll(), b.unit_roll());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new generator from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring good
    /// distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // State must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range `[0, max)`.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        (self.next_u64() % max as u64) as u32
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

impl RandomSource for DeterministicRng {
    fn unit_roll(&mut self) -> f64 {
        f64::from(self.next_int(100)) / 100.0
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            0
        } else {
            self.next_int(len as u32) as usize
        }
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a play seed from the parameters of one battle.
///
/// The seed ties a battle's drop rolls to:
/// - the player running the battle
/// - the unique play id handed out at battle start
/// - the server time the battle started
///
/// Same parameters, same seed, same drops - which is what makes a
/// settlement replayable when a client retries a dropped response.
pub fn derive_play_seed(player_id: PlayerId, play_id: &Uuid, server_time: i64) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"EMBERFALL_PLAY_SEED_V1");

    hasher.update(player_id.0.to_le_bytes());
    hasher.update(play_id.as_bytes());
    hasher.update(server_time.to_le_bytes());

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

// =============================================================================
// TESTS
// =============================================================================
