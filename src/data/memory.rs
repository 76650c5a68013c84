//! In-Memory Reference Store
//!
//! Implements every storage collaborator contract over `BTreeMap`s behind
//! a single `Mutex`, so each contract call is one serialized
//! read-modify-write. Backs the demo binary and the test suites.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::data::player::{
    Balances, CharacterId, CurrencyDelta, EquipmentId, FolderId, ItemId, Player, PlayerDelta,
    PlayerId, QuestId, RushEventId,
};
use crate::data::store::{
    CharacterGrant, GrantedCharacter, GrantedEquipment, PlayedParty, PlayerRushEvent, PlayerStore,
    QuestProgress, QuestProgressStore, RankingIndex, RushBattleType, RushEventDelta,
    RushEventStore, StoreError,
};
use crate::quest::QuestCategory;

/// Item granted in place of an already-owned character.
pub const DEFAULT_DUPLICATE_SUBSTITUTE: (ItemId, u32) = (9001, 1);

#[derive(Default)]
struct Inner {
    players: BTreeMap<PlayerId, Player>,
    items: BTreeMap<(PlayerId, ItemId), u32>,
    item_caps: BTreeMap<ItemId, u32>,
    equipment: BTreeMap<(PlayerId, EquipmentId), GrantedEquipment>,
    characters: BTreeMap<(PlayerId, CharacterId), GrantedCharacter>,
    rush_events: BTreeMap<(PlayerId, RushEventId), PlayerRushEvent>,
    cleared_folders: BTreeSet<(PlayerId, RushEventId, FolderId)>,
    played_parties: BTreeMap<(PlayerId, RushEventId, RushBattleType, u32), PlayedParty>,
    quest_progress: BTreeMap<(PlayerId, QuestCategory, QuestId), QuestProgress>,
    rankings: BTreeMap<(RushEventId, u32), PlayerId>,
}

/// In-memory store implementing all collaborator contracts.
///
/// One mutex guards the whole state: every trait call is atomic, which
/// satisfies the per-player serialization contract trivially.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    duplicate_substitute: (ItemId, u32),
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            duplicate_substitute: DEFAULT_DUPLICATE_SUBSTITUTE,
        }
    }

    /// Override the substitute item granted for duplicate characters.
    pub fn with_duplicate_substitute(mut self, item_id: ItemId, count: u32) -> Self {
        self.duplicate_substitute = (item_id, count);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens after a panic in another holder;
        // recover the data rather than cascading the panic.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or replace a player record (test/demo setup).
    pub fn insert_player(&self, player: Player) {
        self.lock().players.insert(player.id, player);
    }

    /// Set a maximum held amount for an item (grants cap at it).
    pub fn set_item_cap(&self, item_id: ItemId, cap: u32) {
        self.lock().item_caps.insert(item_id, cap);
    }

    /// Put a character on a player's roster (test/demo setup).
    pub fn insert_character(&self, id: PlayerId, character: GrantedCharacter) {
        self.lock().characters.insert((id, character.id), character);
    }

    /// Bind a leaderboard position to a player (test/demo setup).
    pub fn set_ranking(&self, event_id: RushEventId, rank: u32, id: PlayerId) {
        self.lock().rankings.insert((event_id, rank), id);
    }

    /// Current held amount of an item.
    pub fn item_count(&self, id: PlayerId, item_id: ItemId) -> u32 {
        self.lock().items.get(&(id, item_id)).copied().unwrap_or(0)
    }

    /// Whether the player owns a character.
    pub fn owns_character(&self, id: PlayerId, character_id: CharacterId) -> bool {
        self.lock().characters.contains_key(&(id, character_id))
    }
}

impl PlayerStore for MemoryStore {
    fn get_player(&self, id: PlayerId) -> Result<Player, StoreError> {
        self.lock()
            .players
            .get(&id)
            .cloned()
            .ok_or(StoreError::PlayerNotFound)
    }

    fn update_player(&self, id: PlayerId, delta: &PlayerDelta) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let player = inner.players.get_mut(&id).ok_or(StoreError::PlayerNotFound)?;
        delta.apply_to(player);
        Ok(())
    }

    fn add_balances(&self, id: PlayerId, add: &CurrencyDelta) -> Result<Balances, StoreError> {
        let mut inner = self.lock();
        let player = inner.players.get_mut(&id).ok_or(StoreError::PlayerNotFound)?;
        player.free_mana += add.mana;
        player.free_vmoney += add.vmoney;
        player.exp_pool += add.exp_pool;
        Ok(player.balances())
    }

    fn grant_item(&self, id: PlayerId, item_id: ItemId, amount: u32) -> Result<u32, StoreError> {
        let mut inner = self.lock();
        let cap = inner.item_caps.get(&item_id).copied().unwrap_or(u32::MAX);
        let held = inner.items.entry((id, item_id)).or_insert(0);
        let granted = amount.min(cap.saturating_sub(*held));
        *held += granted;
        Ok(granted)
    }

    fn grant_equipment(
        &self,
        id: PlayerId,
        equipment_id: EquipmentId,
        count: u32,
    ) -> Result<GrantedEquipment, StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .equipment
            .entry((id, equipment_id))
            .or_insert(GrantedEquipment {
                id: equipment_id,
                count: 0,
                enhancement_level: 0,
            });
        entry.count += count;
        Ok(entry.clone())
    }

    fn grant_character(
        &self,
        id: PlayerId,
        character_id: CharacterId,
    ) -> Result<CharacterGrant, StoreError> {
        let (substitute_id, substitute_count) = self.duplicate_substitute;
        let mut inner = self.lock();
        if inner.characters.contains_key(&(id, character_id)) {
            *inner.items.entry((id, substitute_id)).or_insert(0) += substitute_count;
            return Ok(CharacterGrant::AlreadyOwned {
                item_id: substitute_id,
                count: substitute_count,
            });
        }
        let character = GrantedCharacter {
            id: character_id,
            level: 1,
            evolution_img_level: 0,
        };
        inner
            .characters
            .insert((id, character_id), character.clone());
        Ok(CharacterGrant::Joined(character))
    }

    fn character_evolution_levels(
        &self,
        id: PlayerId,
        character_ids: &[Option<CharacterId>],
    ) -> Result<Vec<Option<u32>>, StoreError> {
        let inner = self.lock();
        Ok(character_ids
            .iter()
            .map(|slot| {
                slot.and_then(|cid| {
                    inner
                        .characters
                        .get(&(id, cid))
                        .map(|c| c.evolution_img_level)
                })
            })
            .collect())
    }
}

impl RushEventStore for MemoryStore {
    fn rush_event(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Option<PlayerRushEvent>, StoreError> {
        Ok(self.lock().rush_events.get(&(id, event_id)).cloned())
    }

    fn update_rush_event(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        delta: &RushEventDelta,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let state = inner.rush_events.entry((id, event_id)).or_default();
        if let Some(v) = delta.endless_battle_max_round {
            state.endless_battle_max_round = Some(v);
        }
        if let Some(v) = delta.endless_battle_max_round_time {
            state.endless_battle_max_round_time = Some(v);
        }
        if let Some(v) = &delta.endless_battle_max_round_character_ids {
            state.endless_battle_max_round_character_ids = Some(v.clone());
        }
        if let Some(v) = &delta.endless_battle_max_round_evolution_img_levels {
            state.endless_battle_max_round_evolution_img_levels = Some(v.clone());
        }
        if let Some(v) = delta.endless_battle_next_round {
            state.endless_battle_next_round = Some(v);
        }
        if let Some(v) = delta.active_folder_id {
            state.active_folder_id = v;
        }
        Ok(())
    }

    fn insert_cleared_folder(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        folder_id: FolderId,
    ) -> Result<(), StoreError> {
        self.lock().cleared_folders.insert((id, event_id, folder_id));
        Ok(())
    }

    fn cleared_folders(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Vec<FolderId>, StoreError> {
        Ok(self
            .lock()
            .cleared_folders
            .range((id, event_id, 0)..=(id, event_id, FolderId::MAX))
            .map(|&(_, _, folder)| folder)
            .collect())
    }

    fn played_parties(
        &self,
        id: PlayerId,
        event_id: RushEventId,
    ) -> Result<Vec<(RushBattleType, u32, PlayedParty)>, StoreError> {
        Ok(self
            .lock()
            .played_parties
            .iter()
            .filter(|((pid, eid, _, _), _)| *pid == id && *eid == event_id)
            .map(|((_, _, battle_type, round), party)| (*battle_type, *round, party.clone()))
            .collect())
    }

    fn record_played_party(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        battle_type: RushBattleType,
        round: u32,
        party: &PlayedParty,
    ) -> Result<(), StoreError> {
        self.lock()
            .played_parties
            .insert((id, event_id, battle_type, round), party.clone());
        Ok(())
    }

    fn delete_played_parties(
        &self,
        id: PlayerId,
        event_id: RushEventId,
        battle_type: RushBattleType,
    ) -> Result<(), StoreError> {
        self.lock()
            .played_parties
            .retain(|(pid, eid, bt, _), _| !(*pid == id && *eid == event_id && *bt == battle_type));
        Ok(())
    }
}

impl QuestProgressStore for MemoryStore {
    fn quest_progress(
        &self,
        id: PlayerId,
        category: QuestCategory,
        quest_id: QuestId,
    ) -> Result<Option<QuestProgress>, StoreError> {
        Ok(self
            .lock()
            .quest_progress
            .get(&(id, category, quest_id))
            .cloned())
    }

    fn upsert_quest_progress(
        &self,
        id: PlayerId,
        category: QuestCategory,
        progress: &QuestProgress,
    ) -> Result<(), StoreError> {
        self.lock()
            .quest_progress
            .insert((id, category, progress.quest_id), progress.clone());
        Ok(())
    }
}

impl RankingIndex for MemoryStore {
    fn player_at_rank(
        &self,
        rank: u32,
        event_id: RushEventId,
    ) -> Result<Option<PlayerId>, StoreError> {
        Ok(self.lock().rankings.get(&(event_id, rank)).copied())
    }
}
