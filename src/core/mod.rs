//! Core deterministic primitives.
//!
//! The randomness capability and the server clock. Everything the engine
//! consumes from here is injectable so reward rolls and timestamps are
//! reproducible under test.

pub mod clock;
pub mod rng;

// Re-export core types
pub use clock::GameClock;
pub use rng::{derive_play_seed, DeterministicRng, RandomSource};
