//! Rush Event Tracking
//!
//! Best-effort event ledgers and their client projections.
//!
//! ## Module Structure
//!
//! - `ledger`: endless best records, folder completion, played parties
//! - `ranking`: leaderboard entries and per-mode party views

pub mod ledger;
pub mod ranking;

// Re-export key operations and types
pub use ledger::{record_battle_clear, RushClearRecord, RushError};
pub use ranking::{
    endless_battle_ranking, played_parties_by_mode, ranked_played_parties, ranking_entry_at,
    EndlessBattleRanking, PlayedPartiesByMode, RankingPartyMember,
};
