//! Reward Type Definitions
//!
//! Closed sum types for everything the static game data can award, plus
//! the aggregated result shapes reported back to the client layer.
//! `BTreeMap` ledgers keep payload ordering deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::player::{CharacterId, EquipmentId, ItemId, RewardGroupId};
use crate::data::store::{GrantedCharacter, GrantedEquipment};

/// A single typed reward, produced by static game data, consumed once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    /// Grant `count` units of an item.
    Item {
        /// Item ID
        id: ItemId,
        /// Units to grant
        count: u32,
    },
    /// Create `count` instances of an equipment.
    Equipment {
        /// Equipment ID
        id: EquipmentId,
        /// Instances to create
        count: u32,
    },
    /// Acquire a character.
    Character {
        /// Character ID
        id: CharacterId,
    },
    /// Paid-currency grant (always lands on the free side).
    Beads {
        /// Vmoney to add
        count: u32,
    },
    /// Mana grant.
    Mana {
        /// Mana to add
        count: u32,
    },
    /// Pooled experience grant.
    Exp {
        /// Experience to add
        count: u32,
    },
}

impl Reward {
    /// The `number` a drop ledger reports for this reward.
    pub fn drop_number(&self) -> u32 {
        match self {
            Reward::Item { count, .. } | Reward::Equipment { count, .. } => *count,
            Reward::Character { .. } => 1,
            Reward::Beads { count } | Reward::Mana { count } | Reward::Exp { count } => *count,
        }
    }
}

/// One slot of a score reward group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreReward {
    /// Always resolves; amount scales with the slot multiplier and boost.
    Fixed(FixedSlot),
    /// Probabilistic slot referencing an external candidate pool.
    RarePool(RarePoolSlot),
}

/// Payload of a fixed score-reward slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reward_type", rename_all = "snake_case")]
pub enum FixedSlot {
    /// Item grant.
    Item {
        /// Item ID
        id: ItemId,
        /// Base count before multipliers
        count: u32,
    },
    /// Mana balance add.
    Mana {
        /// Base count before multipliers
        count: u32,
    },
    /// Exp-pool balance add.
    Exp {
        /// Base count before multipliers
        count: u32,
    },
}

impl FixedSlot {
    /// Base count of the slot, before the slot multiplier and boost.
    pub fn base_count(&self) -> u32 {
        match self {
            FixedSlot::Item { count, .. } | FixedSlot::Mana { count } | FixedSlot::Exp { count } => {
                *count
            }
        }
    }
}

/// A rare-pool slot: hit gate plus candidate group reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarePoolSlot {
    /// Candidate group resolved through the rare-pool table
    pub group_id: RewardGroupId,
    /// Hit probability in `[0, 1]`; gates the slot only, never weights
    /// individual candidates
    pub rarity: f64,
}

/// One resolved slot reported to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRewardId {
    /// Group the slot belongs to
    pub group_id: RewardGroupId,
    /// 1-based index (slot position for fixed slots, candidate position
    /// for rare hits)
    pub index: u32,
    /// Amount granted
    pub number: u32,
}

/// Aggregated outcome of applying a reward batch to one player.
///
/// Item and character ids are unique within one result: later grants to
/// the same id accumulate instead of duplicating entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlayerRewardResult {
    /// Mana granted by this batch
    pub mana: u64,
    /// Free vmoney granted by this batch
    pub vmoney: u64,
    /// Pooled experience granted by this batch
    pub exp_pool: u64,
    /// Characters granted, keyed by id (newly joined only)
    pub characters: BTreeMap<CharacterId, GrantedCharacter>,
    /// Ids of characters that newly joined the roster
    pub joined_character_ids: Vec<CharacterId>,
    /// Equipment granted, keyed by id (last grant per id wins)
    pub equipment: BTreeMap<EquipmentId, GrantedEquipment>,
    /// Items granted: id → total amount actually granted
    pub items: BTreeMap<ItemId, u32>,
}

impl PlayerRewardResult {
    /// True when any currency total is positive.
    pub fn has_currency(&self) -> bool {
        self.mana > 0 || self.vmoney > 0 || self.exp_pool > 0
    }

    /// Accumulate an item grant.
    pub fn add_item(&mut self, id: ItemId, granted: u32) {
        *self.items.entry(id).or_insert(0) += granted;
    }

    /// Merge another result into this one.
    ///
    /// Currencies sum, items accumulate per id, characters and equipment
    /// merge per id with the incoming entry winning.
    pub fn merge(&mut self, other: PlayerRewardResult) {
        self.mana += other.mana;
        self.vmoney += other.vmoney;
        self.exp_pool += other.exp_pool;
        for (id, granted) in other.items {
            self.add_item(id, granted);
        }
        for (id, character) in other.characters {
            self.characters.insert(id, character);
        }
        self.joined_character_ids.extend(other.joined_character_ids);
        for (id, equipment) in other.equipment {
            self.equipment.insert(id, equipment);
        }
    }
}

/// Outcome of a score reward group, extending the aggregate result with
/// the two drop ledgers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreGroupResult {
    /// Merged reward outcome across every resolved slot
    #[serde(flatten)]
    pub rewards: PlayerRewardResult,
    /// One entry per fixed slot, in slot order
    pub drop_score_reward_ids: Vec<DropRewardId>,
    /// One entry per rare-pool hit, in slot order
    pub drop_rare_reward_ids: Vec<DropRewardId>,
}
