//! Quest Settlement
//!
//! Converts finished battle outcomes into reward and progression effects
//! by driving the reward, rank and rush subsystems in order.
//!
//! ## Module Structure
//!
//! - `settle`: battle settlement and continue-cost spending

pub mod settle;

use serde::{Deserialize, Serialize};

// Re-export key operations and types
pub use settle::{
    continue_battle, settle_battle, BattleOutcome, BattleSettlement, BoostSelection,
    PartyStatistics, RushSettlement, SettleError,
};

/// Quest category, part of the quest progress key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum QuestCategory {
    /// Main story quests.
    Main = 1,
    /// Limited-time event quests.
    Event = 2,
    /// Rush event quests (folder and endless rounds).
    RushEvent = 3,
}
