//! Storage Collaborator Contracts
//!
//! The engine owns no persistence. Everything it reads or mutates goes
//! through the traits in this module, which mirror the narrow contracts
//! the surrounding backend exposes: player records and balances, grant
//! operations, rush event ledgers, quest progress, and the leaderboard
//! index.
//!
//! # Concurrency contract
//!
//! Player state is shared across concurrent requests for the same player
//! (two devices, a retried request). The engine does not lock; it is a
//! required contract that implementations serialize read-modify-write
//! sequences per player. [`PlayerStore::add_balances`] exists precisely
//! so the currency commit is a single atomic increment at the storage
//! layer rather than a racy get/update pair.

use serde::{Deserialize, Serialize};

use crate::data::player::{
    Balances, CharacterId, CurrencyDelta, EquipmentId, FolderId, ItemId, Player, PlayerDelta,
    PlayerId, QuestId, RushEventId,
};
use crate::quest::QuestCategory;

/// Storage-layer errors.
///
/// The engine adds no retry logic; backend failures propagate unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The referenced player record does not exist.
    #[error("Player not found")]
    PlayerNotFound,

    /// Backend failure (connection, constraint, corruption).
    #[error("storage failure: {0}")]
    Backend(String),
}

/// An equipment instance created by a grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedEquipment {
    /// Equipment ID
    pub id: EquipmentId,
    /// Number of instances created by this grant
    pub count: u32,
    /// Enhancement level of the created instances
    pub enhancement_level: u32,
}

/// A character entry as held (or just created) by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedCharacter {
    /// Character ID
    pub id: CharacterId,
    /// Character level
    pub level: u32,
    /// Evolution image level (party snapshot projections)
    pub evolution_img_level: u32,
}

/// Outcome of a character grant.
///
/// The substitution policy for already-owned characters belongs to the
/// store, not the engine; the engine only folds the substitute into the
/// item ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CharacterGrant {
    /// The character joined the player's roster.
    Joined(GrantedCharacter),
    /// Already owned; the store granted a substitute item instead.
    AlreadyOwned {
        /// Substitute item granted in place of the character
        item_id: ItemId,
        /// Amount of the substitute item granted
        count: u32,
    },
}

/// Player records, balances and grant operations.
pub trait PlayerStore {
    /// Fetch a player record.
    fn get_player(&self, id: PlayerId) -> Result<Player, StoreError>;

    /// Apply a partial update to a player record.
    fn update_player(&self, id: PlayerId, delta: &PlayerDelta) -> Result<(), StoreError>;

    /// Atomically add currency deltas to a player's balances.
    ///
    /// Returns the balances after the add. This is the only write path
    /// the Reward Aggregator uses for currencies.
    fn add_balances(&self, id: PlayerId, add: &CurrencyDelta) -> Result<Balances, StoreError>;

    /// Grant `amount` units of an item.
    ///
    /// The store may cap or reject part of the grant; the return value is
    /// the amount actually granted, which is what the reward ledgers
    /// report.
    fn grant_item(&self, id: PlayerId, item_id: ItemId, amount: u32) -> Result<u32, StoreError>;

    /// Create `count` equipment instances.
    fn grant_equipment(
        &self,
        id: PlayerId,
        equipment_id: EquipmentId,
        count: u32,
    ) -> Result<GrantedEquipment, StoreError>;

    /// Acquire a character, or a substitute item when already owned.
    fn grant_character(
        &self,
        id: PlayerId,
        character_id: CharacterId,
    ) -> Result<CharacterGrant, StoreError>;

    /// Evolution image levels for a party slot list.
    ///
    /// Parallel to the input: `None` for empty slots and unowned
    /// characters.
    fn character_evolution_levels(
        &self,
        id: PlayerId,
        character_ids: &[Option<CharacterId>],
    ) -> Result<Vec<Option<u32>>, StoreError>;
}

/// Battle mode of a rush event round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RushBattleType {
    /// Fixed round sequence inside a folder.
    Folder = 1,
    /// Endless mode, scored by deepest round and fastest time.
    Endless = 2,
}

/// Party snapshot recorded for one rush event round.
///
/// Immutable once recorded; a later attempt at the same `(battle_type,
/// round)` key replaces the whole snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedParty {
    /// Main party character slots (empty slots are `None`)
    pub character_ids: Vec<Option<CharacterId>>,
    /// Unison character slots
    pub unison_character_ids: Vec<Option<CharacterId>>,
    /// Equipped items per slot
    pub equipment_ids: Vec<Option<EquipmentId>>,
    /// Ability soul slots
    pub ability_soul_ids: Vec<Option<u32>>,
    /// Evolution image levels, parallel to `character_ids`
    pub evolution_img_levels: Vec<Option<u32>>,
    /// Evolution image levels, parallel to `unison_character_ids`
    pub unison_evolution_img_levels: Vec<Option<u32>>,
}

/// Per-player rush event state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRushEvent {
    /// Deepest endless round cleared
    pub endless_battle_max_round: Option<u32>,
    /// Clear time of the best endless round (ms)
    pub endless_battle_max_round_time: Option<u64>,
    /// Party character ids of the best endless clear
    pub endless_battle_max_round_character_ids: Option<Vec<Option<CharacterId>>>,
    /// Evolution image levels of the best endless clear
    pub endless_battle_max_round_evolution_img_levels: Option<Vec<Option<u32>>>,
    /// Next endless round the player will enter
    pub endless_battle_next_round: Option<u32>,
    /// Folder currently being played, if any
    pub active_folder_id: Option<FolderId>,
}

/// Partial rush event update. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct RushEventDelta {
    /// New deepest endless round
    pub endless_battle_max_round: Option<u32>,
    /// New best endless clear time (ms)
    pub endless_battle_max_round_time: Option<u64>,
    /// New best-clear party character ids
    pub endless_battle_max_round_character_ids: Option<Vec<Option<CharacterId>>>,
    /// New best-clear evolution image levels
    pub endless_battle_max_round_evolution_img_levels: Option<Vec<Option<u32>>>,
    /// New next endless round
    pub endless_battle_next_round: Option<u32>,
    /// New active folder pointer (outer `Some` sets, inner `None` clears)
    pub active_folder_id: Option<Option<FolderId>>,
}

/// Rush event ledgers: per-player event state, cleared folders, and
/// played-party snapshots.
pub trait RushEventStore {
    /// Per-player state for one event, if any exists yet.
    fn rush_event(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Option<PlayerRushEvent>, StoreError>;

    /// Apply a partial update, creating the record on first touch.
    fn update_rush_event(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        delta: &RushEventDelta,
    ) -> Result<(), StoreError>;

    /// Mark a folder as cleared.
    fn insert_cleared_folder(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        folder_id: FolderId,
    ) -> Result<(), StoreError>;

    /// Folders the player has cleared for an event.
    fn cleared_folders(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Vec<FolderId>, StoreError>;

    /// Every recorded played-party snapshot for an event.
    fn played_parties(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Vec<(RushBattleType, u32, PlayedParty)>, StoreError>;

    /// Write/overwrite the snapshot keyed `(battle_type, round)`.
    fn record_played_party(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        battle_type: RushBattleType,
        round: u32,
        party: &PlayedParty,
    ) -> Result<(), StoreError>;

    /// Delete every snapshot of one battle type for an event.
    fn delete_played_parties(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        battle_type: RushBattleType,
    ) -> Result<(), StoreError>;
}

/// Per-quest completion record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    /// Quest ID
    pub quest_id: QuestId,
    /// Whether the quest has been finished at least once
    pub finished: bool,
    /// Fastest clear (ms)
    pub best_elapsed_time_ms: Option<u64>,
    /// Best clear rank achieved (1-5)
    pub clear_rank: Option<u32>,
    /// Highest score achieved
    pub high_score: Option<u64>,
}

/// Quest progress records, keyed per player, category and quest.
pub trait QuestProgressStore {
    /// The stored progress record, if any.
    fn quest_progress(
        &self,
        id: PlayerId,
        category: QuestCategory,
        quest_id: QuestId,
    ) -> Result<Option<QuestProgress>, StoreError>;

    /// Insert or replace a progress record.
    fn upsert_quest_progress(
        &self,
        id: PlayerId,
        category: QuestCategory,
        progress: &QuestProgress,
    ) -> Result<(), StoreError>;
}

/// Leaderboard index for rush event endless rankings.
pub trait RankingIndex {
    /// The player currently holding a leaderboard position.
    fn player_at_rank(
        &self,
        rank: u32,
        event_id: RushEventId,
    ) -> Result<Option<PlayerId>, StoreError>;
}
