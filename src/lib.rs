//! # Emberfall Reward & Progression Engine
//!
//! Reward resolution and progression tracking core for the Emberfall
//! live-service game backend. Given a player and a declarative description
//! of what was earned, the engine computes concrete state deltas and
//! applies them through injected storage collaborators.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     EMBERFALL ENGINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - RandomSource capability + Xorshift128+    │
//! │  └── clock.rs    - Server clock with override support        │
//! │                                                              │
//! │  data/           - Storage collaborators & static data       │
//! │  ├── player.rs   - Player record and update deltas           │
//! │  ├── store.rs    - Collaborator contracts                    │
//! │  ├── memory.rs   - In-memory reference store                 │
//! │  └── assets.rs   - Rare pools, quests, folder rounds         │
//! │                                                              │
//! │  reward/         - Reward resolution                         │
//! │  ├── types.rs    - Reward / ScoreReward sum types, results   │
//! │  ├── resolver.rs - Single-reward resolution                  │
//! │  ├── aggregator.rs - Ordered batch application               │
//! │  └── score.rs    - Score groups and rare-pool rolls          │
//! │                                                              │
//! │  rank/           - Rank progression state machine            │
//! │  rush/           - Rush event round ledger & rankings        │
//! │  quest/          - Battle settlement orchestration           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Reward rolls consume the [`core::rng::RandomSource`] capability; given
//! a seeded [`core::rng::DeterministicRng`], a battle's drops replay
//! identically. All aggregation maps are `BTreeMap` so iteration order
//! (and therefore drop ledgers and client payloads) is stable.
//!
//! The engine itself holds no locks: the storage collaborator is required
//! to serialize read-modify-write sequences per player (see
//! [`data::store::PlayerStore`]).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod data;
pub mod quest;
pub mod rank;
pub mod reward;
pub mod rush;

// Re-export commonly used types
pub use crate::core::clock::GameClock;
pub use crate::core::rng::{DeterministicRng, RandomSource};
pub use crate::data::player::{Balances, Player, PlayerId};
pub use crate::rank::{RankTable, RankTier};
pub use crate::reward::types::{PlayerRewardResult, Reward, ScoreGroupResult, ScoreReward};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Vmoney cost of continuing a failed battle.
pub const CONTINUE_VMONEY_COST: u64 = 50;

/// Multiplier applied to every fixed score-reward slot.
pub const SCORE_REWARD_MULTIPLIER: u32 = 10;
