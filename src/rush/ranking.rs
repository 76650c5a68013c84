//! Rush Event Ranking Projections
//!
//! Client-facing views over the event round ledger: per-mode played
//! party lists and endless-battle leaderboard entries. Projections are
//! all-or-nothing; an incomplete best record yields no entry rather
//! than a partially filled one.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::player::{PlayerId, RushEventId};
use crate::data::store::{
    PlayedParty, PlayerStore, RankingIndex, RushBattleType, RushEventStore, StoreError,
};
use crate::rank::RankTable;
use crate::rush::ledger::RushError;

/// Played-party snapshots split by battle mode, keyed by round.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlayedPartiesByMode {
    /// Folder-mode snapshots
    pub folder: BTreeMap<u32, PlayedParty>,
    /// Endless-mode snapshots
    pub endless: BTreeMap<u32, PlayedParty>,
}

/// One party member of a ranking entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingPartyMember {
    /// Character ID
    pub character_id: u32,
    /// Evolution image level (0 when unrecorded)
    pub evolution_img_level: u32,
}

/// Client-facing endless battle leaderboard entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndlessBattleRanking {
    /// Deepest round the ranked player cleared
    pub best_round: u32,
    /// Clear time of that round (ms)
    pub elapsed_time_ms: u64,
    /// Ranked player's display name
    pub name: String,
    /// Party that achieved the best clear
    pub party_member_list: Vec<RankingPartyMember>,
    /// Leaderboard position this entry describes
    pub rank_number: u32,
    /// Ranked player's progression rank tier
    pub user_rank: u32,
}

/// Split a player's recorded parties by battle mode.
pub fn played_parties_by_mode(
    store: &dyn RushEventStore,
    player_id: PlayerId,
    event_id: RushEventId,
) -> Result<PlayedPartiesByMode, RushError> {
    let mut out = PlayedPartiesByMode::default();
    for (battle_type, round, party) in store.played_parties(player_id, event_id)? {
        match battle_type {
            RushBattleType::Folder => out.folder.insert(round, party),
            RushBattleType::Endless => out.endless.insert(round, party),
        };
    }
    Ok(out)
}

/// Project one player's best endless record into a ranking entry.
///
/// Yields `None` when the player, their event state, or any field of the
/// best record is absent.
pub fn endless_battle_ranking<S>(
    store: &S,
    rank_table: &RankTable,
    player_id: PlayerId,
    event_id: RushEventId,
    rank_number: u32,
) -> Result<Option<EndlessBattleRanking>, RushError>
where
    S: PlayerStore + RushEventStore + ?Sized,
{
    let player = match store.get_player(player_id) {
        Ok(player) => player,
        Err(StoreError::PlayerNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let Some(state) = store.rush_event(player_id, event_id)? else {
        return Ok(None);
    };

    let (Some(best_round), Some(best_time), Some(character_ids), Some(evolution_levels)) = (
        state.endless_battle_max_round,
        state.endless_battle_max_round_time,
        state.endless_battle_max_round_character_ids,
        state.endless_battle_max_round_evolution_img_levels,
    ) else {
        return Ok(None);
    };

    let party_member_list = character_ids
        .iter()
        .enumerate()
        .filter_map(|(n, slot)| {
            slot.map(|character_id| RankingPartyMember {
                character_id,
                evolution_img_level: evolution_levels.get(n).copied().flatten().unwrap_or(0),
            })
        })
        .collect();

    Ok(Some(EndlessBattleRanking {
        best_round,
        elapsed_time_ms: best_time,
        name: player.name.clone(),
        party_member_list,
        rank_number,
        user_rank: rank_table.tier_for(player.rank_point).rank,
    }))
}

/// Ranking entry for whoever holds a leaderboard position.
pub fn ranking_entry_at<S>(
    store: &S,
    index: &dyn RankingIndex,
    rank_table: &RankTable,
    rank: u32,
    event_id: RushEventId,
) -> Result<Option<EndlessBattleRanking>, RushError>
where
    S: PlayerStore + RushEventStore + ?Sized,
{
    let Some(player_id) = index.player_at_rank(rank, event_id)? else {
        return Ok(None);
    };
    endless_battle_ranking(store, rank_table, player_id, event_id, rank)
}

/// Endless played-party list of whoever holds a leaderboard position.
pub fn ranked_played_parties(
    store: &dyn RushEventStore,
    index: &dyn RankingIndex,
    rank: u32,
    event_id: RushEventId,
) -> Result<Option<BTreeMap<u32, PlayedParty>>, RushError> {
    let Some(player_id) = index.player_at_rank(rank, event_id)? else {
        return Ok(None);
    };
    Ok(Some(
        played_parties_by_mode(store, player_id, event_id)?.endless,
    ))
}
