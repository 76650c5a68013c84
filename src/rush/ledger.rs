//! Rush Event Round Ledger
//!
//! Tracks, per player per event, the best endless-mode round and time,
//! folder completion, and the played-party snapshot for every round.
//! Updates follow a strict no-regression policy: deeper rounds always
//! win, equal rounds prefer the faster-or-equal time.

use tracing::{debug, info};

use crate::data::player::{FolderId, PlayerId, RushEventId};
use crate::data::store::{PlayedParty, RushBattleType, RushEventDelta, RushEventStore, StoreError};

/// Errors from the event round ledger.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RushError {
    /// The referenced player record does not exist.
    #[error("Player not found")]
    PlayerNotFound,

    /// Storage failure, propagated unchanged.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RushError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlayerNotFound => RushError::PlayerNotFound,
            other => RushError::Store(other),
        }
    }
}

/// What one recorded battle clear did to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RushClearRecord {
    /// Mode the clear was recorded under
    pub battle_type: RushBattleType,
    /// Round the snapshot was recorded at (for endless clears this is the
    /// player's next-round counter, not the caller's round number)
    pub round: u32,
    /// Whether the endless best record was replaced
    pub best_updated: bool,
    /// Folder completed by this clear, if it was the final round
    pub folder_cleared: Option<FolderId>,
}

/// Record a qualifying battle clear for a rush event.
///
/// - Endless (`quest_round == 0`): replaces the best record when the
///   no-regression policy allows it, then advances the next-round
///   counter.
/// - Folder: when the cleared round reaches the folder's configured
///   final round, marks the folder cleared, clears the active-folder
///   pointer, and discards every FOLDER-type snapshot for the event.
///
/// Either way the played party is written under `(battle_type, round)`,
/// independent of whether the best record moved.
#[allow(clippy::too_many_arguments)]
pub fn record_battle_clear(
    store: &dyn RushEventStore,
    player_id: PlayerId,
    event_id: RushEventId,
    folder_id: FolderId,
    quest_round: u32,
    folder_final_round: Option<u32>,
    clear_time_ms: u64,
    party: &PlayedParty,
) -> Result<RushClearRecord, RushError> {
    let battle_type = if quest_round == 0 {
        RushBattleType::Endless
    } else {
        RushBattleType::Folder
    };

    let mut round = quest_round;
    let mut best_updated = false;
    let mut folder_cleared = None;

    match battle_type {
        RushBattleType::Endless => {
            let state = store.rush_event(player_id, event_id)?.unwrap_or_default();

            let next_round = state.endless_battle_next_round.unwrap_or(1);
            let max_round = state.endless_battle_max_round.unwrap_or(1);
            let best_time = state.endless_battle_max_round_time.unwrap_or(u64::MAX);
            round = next_round;

            // Deeper rounds always win; same round needs a
            // faster-or-equal time.
            if next_round > max_round || (next_round == max_round && clear_time_ms <= best_time) {
                store.update_rush_event(
                    player_id,
                    event_id,
                    &RushEventDelta {
                        endless_battle_max_round: Some(next_round),
                        endless_battle_max_round_time: Some(clear_time_ms),
                        endless_battle_max_round_character_ids: Some(party.character_ids.clone()),
                        endless_battle_max_round_evolution_img_levels: Some(
                            party.evolution_img_levels.clone(),
                        ),
                        endless_battle_next_round: Some(next_round + 1),
                        ..RushEventDelta::default()
                    },
                )?;
                best_updated = true;
                info!(
                    player = %player_id,
                    event = event_id,
                    round = next_round,
                    time_ms = clear_time_ms,
                    "endless best record updated"
                );
            } else {
                store.update_rush_event(
                    player_id,
                    event_id,
                    &RushEventDelta {
                        endless_battle_next_round: Some(next_round + 1),
                        ..RushEventDelta::default()
                    },
                )?;
            }
        }
        RushBattleType::Folder => {
            if folder_final_round.is_some_and(|last| quest_round >= last) {
                store.insert_cleared_folder(player_id, event_id, folder_id)?;
                store.update_rush_event(
                    player_id,
                    event_id,
                    &RushEventDelta {
                        active_folder_id: Some(None),
                        ..RushEventDelta::default()
                    },
                )?;
                // Party history for a finished folder is discarded
                store.delete_played_parties(player_id, event_id, RushBattleType::Folder)?;
                folder_cleared = Some(folder_id);
                info!(player = %player_id, event = event_id, folder = folder_id, "folder cleared");
            }
        }
    }

    store.record_played_party(player_id, event_id, battle_type, round, party)?;
    debug!(
        player = %player_id,
        event = event_id,
        ?battle_type,
        round,
        "played party recorded"
    );

    Ok(RushClearRecord {
        battle_type,
        round,
        best_updated,
        folder_cleared,
    })
}
