//! Static Game Data Tables
//!
//! Read-only tables shipped with the game build: rare-pool candidate
//! groups, battle quest definitions, and rush event folder layouts. All
//! of them deserialize from JSON assets; the engine only ever borrows
//! from them.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::data::player::{FolderId, QuestId, RewardGroupId, RushEventId};
use crate::quest::QuestCategory;
use crate::reward::types::{Reward, ScoreReward};

/// Source of rare-pool candidate groups.
///
/// A missing group is not an error; the rare slot just produces nothing.
pub trait RarePoolSource {
    /// The ordered candidate list for a group, if the group exists.
    fn rare_pool(&self, group_id: RewardGroupId) -> Option<&[Reward]>;
}

/// Rare-pool candidate groups keyed by group id.
#[derive(Clone, Debug, Default)]
pub struct RarePoolTable {
    groups: BTreeMap<RewardGroupId, Vec<Reward>>,
}

impl RarePoolTable {
    /// Load from a JSON object of `group_id → [rewards]`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let groups = serde_json::from_str(json)?;
        Ok(Self { groups })
    }

    /// Insert or replace a group.
    pub fn insert(&mut self, group_id: RewardGroupId, rewards: Vec<Reward>) {
        self.groups.insert(group_id, rewards);
    }
}

impl RarePoolSource for RarePoolTable {
    fn rare_pool(&self, group_id: RewardGroupId) -> Option<&[Reward]> {
        self.groups.get(&group_id).map(Vec::as_slice)
    }
}

/// Rush event binding of a battle quest.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RushEventQuest {
    /// Event the quest belongs to
    pub event_id: RushEventId,
    /// Folder the quest belongs to
    pub folder_id: FolderId,
    /// Round within the folder; `0` marks an endless-mode quest
    pub round: u32,
}

/// Static definition of one battle quest.
#[derive(Clone, Debug, Deserialize)]
pub struct BattleQuest {
    /// Quest ID
    pub quest_id: QuestId,
    /// Quest category
    pub category: QuestCategory,
    /// Rank points granted on finish
    pub rank_point_reward: u64,
    /// Mana granted on finish
    pub mana_reward: u64,
    /// Pooled experience granted on finish
    pub pool_exp_reward: u64,
    /// Clear time (ms) at or under which the clear is rank S+
    pub s_plus_rank_time: u64,
    /// Clear time (ms) at or under which the clear is rank S
    pub s_rank_time: u64,
    /// Clear time (ms) at or under which the clear is rank A
    pub a_rank_time: u64,
    /// Clear time (ms) at or under which the clear is rank B
    pub b_rank_time: u64,
    /// One-time reward for the first completion
    #[serde(default)]
    pub clear_reward: Option<Reward>,
    /// One-time reward for the first S+ clear
    #[serde(default)]
    pub s_plus_reward: Option<Reward>,
    /// Score reward group id, if the quest carries score rewards
    #[serde(default)]
    pub score_reward_group_id: Option<RewardGroupId>,
    /// Slots of the score reward group
    #[serde(default)]
    pub score_reward_group: Vec<ScoreReward>,
    /// Rush event binding, for rush event quests
    #[serde(default)]
    pub rush_event: Option<RushEventQuest>,
}

impl BattleQuest {
    /// Clear rank for an elapsed time: S+ (5) down to C (1).
    pub fn clear_rank_for(&self, elapsed_time_ms: u64) -> u32 {
        if self.s_plus_rank_time >= elapsed_time_ms {
            5
        } else if self.s_rank_time >= elapsed_time_ms {
            4
        } else if self.a_rank_time >= elapsed_time_ms {
            3
        } else if self.b_rank_time >= elapsed_time_ms {
            2
        } else {
            1
        }
    }
}

/// Battle quest definitions keyed by category and quest id.
#[derive(Clone, Debug, Default)]
pub struct QuestTable {
    quests: BTreeMap<(QuestCategory, QuestId), BattleQuest>,
}

impl QuestTable {
    /// Load from a JSON array of quest definitions.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let list: Vec<BattleQuest> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for quest in list {
            table.insert(quest);
        }
        Ok(table)
    }

    /// Insert or replace a quest definition.
    pub fn insert(&mut self, quest: BattleQuest) {
        self.quests.insert((quest.category, quest.quest_id), quest);
    }

    /// Look up a quest by category and id.
    pub fn get(&self, category: QuestCategory, quest_id: QuestId) -> Option<&BattleQuest> {
        self.quests.get(&(category, quest_id))
    }
}

/// Rush event folder layouts: final round numbers and clear rewards.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FolderTable {
    final_rounds: BTreeMap<FolderId, u32>,
    #[serde(default)]
    clear_rewards: BTreeMap<RushEventId, BTreeMap<FolderId, Vec<Reward>>>,
}

impl FolderTable {
    /// Set the final round of a folder.
    pub fn set_final_round(&mut self, folder_id: FolderId, final_round: u32) {
        self.final_rounds.insert(folder_id, final_round);
    }

    /// Set the clear rewards of a folder.
    pub fn set_clear_rewards(
        &mut self,
        event_id: RushEventId,
        folder_id: FolderId,
        rewards: Vec<Reward>,
    ) {
        self.clear_rewards
            .entry(event_id)
            .or_default()
            .insert(folder_id, rewards);
    }

    /// Final round of a folder, if configured.
    pub fn final_round(&self, folder_id: FolderId) -> Option<u32> {
        self.final_rounds.get(&folder_id).copied()
    }

    /// Clear rewards of a folder, empty when unconfigured.
    pub fn folder_clear_rewards(&self, event_id: RushEventId, folder_id: FolderId) -> &[Reward] {
        self.clear_rewards
            .get(&event_id)
            .and_then(|folders| folders.get(&folder_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// All static tables the settlement flow consumes.
#[derive(Clone, Debug, Default)]
pub struct GameAssets {
    /// Rare-pool candidate groups
    pub rare_pools: RarePoolTable,
    /// Battle quest definitions
    pub quests: QuestTable,
    /// Rush event folder layouts
    pub folders: FolderTable,
}
