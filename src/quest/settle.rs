//! Battle Settlement
//!
//! One entry point drives everything a finished battle changes: clear
//! rank, one-time rewards, quest progress, boost accounting, rank
//! points, score rewards and rush event ledgers. The caller (the
//! request layer) supplies the already-computed battle outcome and gets
//! back a full settlement summary for the client response.

use tracing::info;
use uuid::Uuid;

use crate::core::clock::GameClock;
use crate::core::rng::RandomSource;
use crate::data::assets::{BattleQuest, GameAssets};
use crate::data::player::{
    Balances, CharacterId, CurrencyDelta, EquipmentId, PlayerDelta, PlayerId,
};
use crate::data::store::{
    PlayedParty, PlayerStore, QuestProgress, QuestProgressStore, RushEventStore, StoreError,
};
use crate::rank::{apply_rank_point, RankTable, RankUpSink};
use crate::reward::aggregator::{give_reward, give_rewards};
use crate::reward::resolver::RewardError;
use crate::reward::score::give_score_rewards;
use crate::reward::types::{DropRewardId, PlayerRewardResult, Reward};
use crate::rush::ledger::{record_battle_clear, RushClearRecord, RushError};
use crate::rush::ranking::{played_parties_by_mode, PlayedPartiesByMode};
use crate::CONTINUE_VMONEY_COST;

/// Errors from battle settlement.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettleError {
    /// The referenced player record does not exist.
    #[error("Player not found")]
    PlayerNotFound,

    /// Neither vmoney balance covers the continue cost.
    #[error("Not enough vmoney to continue")]
    NotEnoughVmoney,

    /// Reward application failed.
    #[error("reward failure: {0}")]
    Reward(RewardError),

    /// Rush event ledger failure.
    #[error("rush event failure: {0}")]
    Rush(RushError),

    /// Storage failure, propagated unchanged.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SettleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlayerNotFound => SettleError::PlayerNotFound,
            other => SettleError::Store(other),
        }
    }
}

impl From<RewardError> for SettleError {
    fn from(err: RewardError) -> Self {
        match err {
            RewardError::PlayerNotFound => SettleError::PlayerNotFound,
            other => SettleError::Reward(other),
        }
    }
}

impl From<RushError> for SettleError {
    fn from(err: RushError) -> Self {
        match err {
            RushError::PlayerNotFound => SettleError::PlayerNotFound,
            other => SettleError::Rush(other),
        }
    }
}

/// Party composition reported by the client at battle end.
#[derive(Clone, Debug, Default)]
pub struct PartyStatistics {
    /// Main party slots (empty slots are `None`)
    pub characters: Vec<Option<CharacterId>>,
    /// Unison slots
    pub unison_characters: Vec<Option<CharacterId>>,
    /// Equipment per slot
    pub equipments: Vec<Option<EquipmentId>>,
    /// Ability soul slots
    pub ability_soul_ids: Vec<Option<u32>>,
}

/// A finished battle, as reported by the (excluded) request layer.
#[derive(Clone, Debug)]
pub struct BattleOutcome {
    /// Play id handed out at battle start
    pub play_id: Uuid,
    /// Clear time in milliseconds
    pub elapsed_time_ms: u64,
    /// Battle score
    pub score: u64,
    /// Whether the quest objective was accomplished
    pub is_accomplished: bool,
    /// Mana picked up on the field during the battle
    pub add_mana: u64,
    /// Party the battle was played with
    pub statistics: PartyStatistics,
}

/// Boost points the player chose to spend on this battle.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoostSelection {
    /// Spend a regular boost point
    pub use_boost_point: bool,
    /// Spend a boss boost point
    pub use_boss_boost_point: bool,
}

/// Rush event portion of a settlement.
#[derive(Clone, Debug)]
pub struct RushSettlement {
    /// What the clear did to the event ledger
    pub record: RushClearRecord,
    /// Folder clear rewards granted by this settlement, if any
    pub folder_clear_rewards: Vec<Reward>,
    /// The player's recorded parties after this clear
    pub played_parties: PlayedPartiesByMode,
}

/// Full settlement summary returned to the request layer.
#[derive(Clone, Debug)]
pub struct BattleSettlement {
    /// Clear rank achieved (5 = S+ down to 1 = C)
    pub clear_rank: u32,
    /// High score on record before this battle
    pub old_high_score: u64,
    /// Rank points before the grant
    pub before_rank_point: u64,
    /// Rank points after the grant
    pub rank_point: u64,
    /// Stamina after the grant (refilled on a rank-up)
    pub stamina: u32,
    /// Boost points remaining
    pub boost_point: u32,
    /// Boss boost points remaining
    pub boss_boost_point: u32,
    /// Merged rewards from every source (clear, S+, score, folder)
    pub rewards: PlayerRewardResult,
    /// Fixed-slot drop ledger
    pub drop_score_reward_ids: Vec<DropRewardId>,
    /// Rare-hit drop ledger
    pub drop_rare_reward_ids: Vec<DropRewardId>,
    /// Rush event outcome, for rush event quests
    pub rush: Option<RushSettlement>,
    /// Player balances after every commit
    pub balances: Balances,
    /// Server time of the settlement (epoch seconds)
    pub settled_at: i64,
}

/// Settle a finished battle.
///
/// Ordering matters: one-time rewards and progress first, then the rank
/// grant and the player commit, then score rewards, then the rush event
/// ledger. Currency always moves through atomic balance adds, so reward
/// grants interleaved with the player commit cannot lose updates.
#[allow(clippy::too_many_arguments)]
pub fn settle_battle<S>(
    store: &S,
    assets: &GameAssets,
    rank_table: &RankTable,
    rng: &mut dyn RandomSource,
    clock: &GameClock,
    rank_up_sink: &mut dyn RankUpSink,
    player_id: PlayerId,
    quest: &BattleQuest,
    boost: BoostSelection,
    outcome: &BattleOutcome,
) -> Result<BattleSettlement, SettleError>
where
    S: PlayerStore + QuestProgressStore + RushEventStore,
{
    let player = store.get_player(player_id)?;
    let clear_rank = quest.clear_rank_for(outcome.elapsed_time_ms);

    info!(
        player = %player_id,
        quest = quest.quest_id,
        play = %outcome.play_id,
        clear_rank,
        accomplished = outcome.is_accomplished,
        "settling battle"
    );

    // Boost accounting: the multiplier only applies when the spent point
    // actually existed.
    let boost_active = (boost.use_boost_point && player.boost_point >= 1)
        || (boost.use_boss_boost_point && player.boss_boost_point >= 1);
    let boost_point = if boost.use_boost_point {
        player.boost_point.saturating_sub(1)
    } else {
        player.boost_point
    };
    let boss_boost_point = if boost.use_boss_boost_point {
        player.boss_boost_point.saturating_sub(1)
    } else {
        player.boss_boost_point
    };

    let progress = store.quest_progress(player_id, quest.category, quest.quest_id)?;
    let previously_completed = progress.is_some();
    let old_high_score = progress.as_ref().and_then(|p| p.high_score).unwrap_or(0);

    let mut rewards = PlayerRewardResult::default();

    // One-time first-completion reward
    if !previously_completed {
        if let Some(reward) = &quest.clear_reward {
            rewards.merge(give_reward(store, player_id, reward)?);
        }
    }

    // One-time S+ reward
    let had_s_plus = progress.as_ref().and_then(|p| p.clear_rank) == Some(5);
    if clear_rank == 5 && !had_s_plus {
        if let Some(reward) = &quest.s_plus_reward {
            rewards.merge(give_reward(store, player_id, reward)?);
        }
    }

    if outcome.is_accomplished {
        let updated = match &progress {
            Some(prev) => QuestProgress {
                quest_id: quest.quest_id,
                finished: true,
                best_elapsed_time_ms: Some(
                    prev.best_elapsed_time_ms
                        .map_or(outcome.elapsed_time_ms, |best| {
                            best.min(outcome.elapsed_time_ms)
                        }),
                ),
                clear_rank: Some(prev.clear_rank.map_or(clear_rank, |r| r.max(clear_rank))),
                high_score: Some(prev.high_score.map_or(outcome.score, |s| s.max(outcome.score))),
            },
            None => QuestProgress {
                quest_id: quest.quest_id,
                finished: true,
                best_elapsed_time_ms: Some(outcome.elapsed_time_ms),
                clear_rank: Some(clear_rank),
                high_score: Some(outcome.score),
            },
        };
        store.upsert_quest_progress(player_id, quest.category, &updated)?;
    }

    // Rank points, folded into the player commit below
    let before_rank_point = player.rank_point;
    let rank_grant = apply_rank_point(rank_table, &player, quest.rank_point_reward, rank_up_sink);

    // Quest currency rewards land as one atomic add; the non-additive
    // fields (rank, stamina, boost counters) as one partial update.
    store.add_balances(
        player_id,
        &CurrencyDelta {
            mana: quest.mana_reward + outcome.add_mana,
            vmoney: 0,
            exp_pool: quest.pool_exp_reward,
        },
    )?;
    store.update_player(
        player_id,
        &PlayerDelta {
            rank_point: Some(rank_grant.rank_point),
            stamina: Some(rank_grant.stamina),
            boost_point: Some(boost_point),
            boss_boost_point: Some(boss_boost_point),
            ..PlayerDelta::default()
        },
    )?;

    // Score reward group
    let mut drop_score_reward_ids = Vec::new();
    let mut drop_rare_reward_ids = Vec::new();
    if let Some(group_id) = quest.score_reward_group_id {
        let score = give_score_rewards(
            store,
            &assets.rare_pools,
            rng,
            player_id,
            group_id,
            &quest.score_reward_group,
            boost_active,
        )?;
        rewards.merge(score.rewards);
        drop_score_reward_ids = score.drop_score_reward_ids;
        drop_rare_reward_ids = score.drop_rare_reward_ids;
    }

    // Rush event ledger
    let mut rush = None;
    if let Some(binding) = &quest.rush_event {
        let evolution_img_levels =
            store.character_evolution_levels(player_id, &outcome.statistics.characters)?;
        let unison_evolution_img_levels =
            store.character_evolution_levels(player_id, &outcome.statistics.unison_characters)?;
        let party = PlayedParty {
            character_ids: outcome.statistics.characters.clone(),
            unison_character_ids: outcome.statistics.unison_characters.clone(),
            equipment_ids: outcome.statistics.equipments.clone(),
            ability_soul_ids: outcome.statistics.ability_soul_ids.clone(),
            evolution_img_levels,
            unison_evolution_img_levels,
        };

        let record = record_battle_clear(
            store,
            player_id,
            binding.event_id,
            binding.folder_id,
            binding.round,
            assets.folders.final_round(binding.folder_id),
            outcome.elapsed_time_ms,
            &party,
        )?;

        let mut folder_clear_rewards = Vec::new();
        if record.folder_cleared.is_some() {
            let clear_rewards = assets
                .folders
                .folder_clear_rewards(binding.event_id, binding.folder_id);
            if !clear_rewards.is_empty() {
                rewards.merge(give_rewards(store, player_id, clear_rewards)?);
                folder_clear_rewards = clear_rewards.to_vec();
            }
        }

        let played_parties = played_parties_by_mode(store, player_id, binding.event_id)?;
        rush = Some(RushSettlement {
            record,
            folder_clear_rewards,
            played_parties,
        });
    }

    let settled = store.get_player(player_id)?;

    Ok(BattleSettlement {
        clear_rank,
        old_high_score,
        before_rank_point,
        rank_point: rank_grant.rank_point,
        stamina: rank_grant.stamina,
        boost_point: settled.boost_point,
        boss_boost_point: settled.boss_boost_point,
        rewards,
        drop_score_reward_ids,
        drop_rare_reward_ids,
        rush,
        balances: settled.balances(),
        settled_at: clock.server_time(),
    })
}

/// Spend the continue cost for a failed battle.
///
/// The free vmoney balance pays when it covers the whole cost; otherwise
/// the paid balance is charged. Neither balance is ever left negative:
/// if neither covers the cost the call fails and nothing changes.
pub fn continue_battle(
    store: &dyn PlayerStore,
    player_id: PlayerId,
) -> Result<Balances, SettleError> {
    let player = store.get_player(player_id)?;

    let (free_vmoney, vmoney) = if player.free_vmoney >= CONTINUE_VMONEY_COST {
        (player.free_vmoney - CONTINUE_VMONEY_COST, player.vmoney)
    } else if player.vmoney >= CONTINUE_VMONEY_COST {
        (player.free_vmoney, player.vmoney - CONTINUE_VMONEY_COST)
    } else {
        return Err(SettleError::NotEnoughVmoney);
    };

    store.update_player(
        player_id,
        &PlayerDelta {
            free_vmoney: Some(free_vmoney),
            vmoney: Some(vmoney),
            ..PlayerDelta::default()
        },
    )?;

    info!(player = %player_id, free_vmoney, vmoney, "continue cost spent");

    Ok(Balances {
        free_mana: player.free_mana,
        free_vmoney,
        vmoney,
        exp_pool: player.exp_pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::data::assets::RushEventQuest;
    use crate::data::memory::MemoryStore;
    use crate::data::player::Player;
    use crate::quest::QuestCategory;
    use crate::rank::RankTier;
    use crate::reward::types::{FixedSlot, ScoreReward};

    fn rank_table() -> RankTable {
        RankTable::new(vec![
            RankTier {
                rank: 1,
                total_rp: 0,
                stamina: 10,
            },
            RankTier {
                rank: 2,
                total_rp: 100,
                stamina: 20,
            },
        ])
        .unwrap()
    }

    fn base_quest() -> BattleQuest {
        BattleQuest {
            quest_id: 500,
            category: QuestCategory::Main,
            rank_point_reward: 15,
            mana_reward: 200,
            pool_exp_reward: 80,
            s_plus_rank_time: 30_000,
            s_rank_time: 60_000,
            a_rank_time: 120_000,
            b_rank_time: 240_000,
            clear_reward: Some(Reward::Beads { count: 30 }),
            s_plus_reward: Some(Reward::Item { id: 61, count: 1 }),
            score_reward_group_id: Some(10),
            score_reward_group: vec![ScoreReward::Fixed(FixedSlot::Item { id: 5, count: 3 })],
            rush_event: None,
        }
    }

    fn outcome(elapsed_time_ms: u64) -> BattleOutcome {
        BattleOutcome {
            play_id: Uuid::from_bytes([1u8; 16]),
            elapsed_time_ms,
            score: 5000,
            is_accomplished: true,
            add_mana: 50,
            statistics: PartyStatistics {
                characters: vec![Some(10), None],
                unison_characters: vec![None],
                equipments: vec![Some(7)],
                ability_soul_ids: vec![None],
            },
        }
    }

    fn setup() -> (MemoryStore, GameAssets, RankTable, GameClock) {
        let store = MemoryStore::new();
        let mut player = Player::new(PlayerId(1), "tester");
        player.rank_point = 90;
        player.stamina = 10;
        player.boost_point = 2;
        store.insert_player(player);
        (
            store,
            GameAssets::default(),
            rank_table(),
            GameClock::fixed_epoch(1_717_329_600),
        )
    }

    fn settle(
        store: &MemoryStore,
        assets: &GameAssets,
        table: &RankTable,
        clock: &GameClock,
        quest: &BattleQuest,
        boost: BoostSelection,
        outcome: &BattleOutcome,
    ) -> BattleSettlement {
        let mut rng = DeterministicRng::new(1);
        let mut sink = |_: PlayerId, _: u32| {};
        settle_battle(
            store,
            assets,
            table,
            &mut rng,
            clock,
            &mut sink,
            PlayerId(1),
            quest,
            boost,
            outcome,
        )
        .unwrap()
    }

    #[test]
    fn test_settlement_commits_rank_and_balances() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();

        let settlement = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );

        // 90 + 15 crosses the tier-2 floor
        assert_eq!(settlement.before_rank_point, 90);
        assert_eq!(settlement.rank_point, 105);
        assert_eq!(settlement.stamina, 20);
        assert_eq!(settlement.clear_rank, 4);
        assert_eq!(settlement.settled_at, 1_717_329_600);

        let player = store.get_player(PlayerId(1)).unwrap();
        assert_eq!(player.rank_point, 105);
        assert_eq!(player.stamina, 20);
        // quest mana + field mana, first-clear beads on the free side
        assert_eq!(player.free_mana, 250);
        assert_eq!(player.free_vmoney, 30);
        assert_eq!(player.exp_pool, 80);
    }

    #[test]
    fn test_first_clear_reward_only_once() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();

        let first = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );
        assert_eq!(first.rewards.vmoney, 30);

        let second = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );
        assert_eq!(second.rewards.vmoney, 0);
    }

    #[test]
    fn test_s_plus_reward_once_on_first_rank_five() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();

        // First clear is only rank 4: no S+ reward
        let slow = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );
        assert!(!slow.rewards.items.contains_key(&61));

        // S+ clear pays the one-time item
        let fast = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(10_000),
        );
        assert_eq!(fast.rewards.items[&61], 1);

        // Another S+ does not pay again
        let again = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(9_000),
        );
        assert!(!again.rewards.items.contains_key(&61));
    }

    #[test]
    fn test_progress_keeps_best_values() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();

        settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );
        // Worse time, worse score
        let mut worse = outcome(50_000);
        worse.score = 100;
        let second = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &worse,
        );
        assert_eq!(second.old_high_score, 5000);

        let progress = store
            .quest_progress(PlayerId(1), QuestCategory::Main, 500)
            .unwrap()
            .unwrap();
        assert_eq!(progress.best_elapsed_time_ms, Some(45_000));
        assert_eq!(progress.clear_rank, Some(4));
        assert_eq!(progress.high_score, Some(5000));
    }

    #[test]
    fn test_unaccomplished_battle_records_no_progress() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();
        let mut failed = outcome(45_000);
        failed.is_accomplished = false;

        settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &failed,
        );

        assert!(store
            .quest_progress(PlayerId(1), QuestCategory::Main, 500)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_boost_doubles_score_rewards_and_spends_point() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();

        let settlement = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection {
                use_boost_point: true,
                use_boss_boost_point: false,
            },
            &outcome(45_000),
        );

        // Fixed slot: 3 × 10 × 2
        assert_eq!(settlement.rewards.items[&5], 60);
        assert_eq!(settlement.boost_point, 1);
    }

    #[test]
    fn test_boost_without_points_does_not_double() {
        let (store, assets, table, clock) = setup();
        store
            .update_player(
                PlayerId(1),
                &PlayerDelta {
                    boost_point: Some(0),
                    ..PlayerDelta::default()
                },
            )
            .unwrap();
        let quest = base_quest();

        let settlement = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection {
                use_boost_point: true,
                use_boss_boost_point: false,
            },
            &outcome(45_000),
        );

        assert_eq!(settlement.rewards.items[&5], 30);
        assert_eq!(settlement.boost_point, 0);
    }

    #[test]
    fn test_rush_folder_clear_grants_rewards() {
        let (store, mut assets, table, clock) = setup();
        assets.folders.set_final_round(11, 1);
        assets
            .folders
            .set_clear_rewards(3000, 11, vec![Reward::Item { id: 90, count: 5 }]);

        let mut quest = base_quest();
        quest.category = QuestCategory::RushEvent;
        quest.rush_event = Some(RushEventQuest {
            event_id: 3000,
            folder_id: 11,
            round: 1,
        });

        let settlement = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );

        let rush = settlement.rush.unwrap();
        assert_eq!(rush.record.folder_cleared, Some(11));
        assert_eq!(rush.folder_clear_rewards.len(), 1);
        assert_eq!(settlement.rewards.items[&90], 5);
        assert_eq!(store.cleared_folders(PlayerId(1), 3000).unwrap(), vec![11]);
    }

    #[test]
    fn test_rush_endless_records_best() {
        let (store, mut assets, table, clock) = setup();
        assets.folders.set_final_round(11, 3);

        let mut quest = base_quest();
        quest.category = QuestCategory::RushEvent;
        quest.rush_event = Some(RushEventQuest {
            event_id: 3000,
            folder_id: 11,
            round: 0,
        });

        let settlement = settle(
            &store,
            &assets,
            &table,
            &clock,
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );

        let rush = settlement.rush.unwrap();
        assert!(rush.record.best_updated);
        assert_eq!(rush.record.round, 1);
        assert_eq!(rush.played_parties.endless.len(), 1);

        let state = store.rush_event(PlayerId(1), 3000).unwrap().unwrap();
        assert_eq!(state.endless_battle_max_round, Some(1));
        assert_eq!(state.endless_battle_max_round_time, Some(45_000));
    }

    #[test]
    fn test_missing_player_fails() {
        let (store, assets, table, clock) = setup();
        let quest = base_quest();
        let mut rng = DeterministicRng::new(1);
        let mut sink = |_: PlayerId, _: u32| {};

        let err = settle_battle(
            &store,
            &assets,
            &table,
            &mut rng,
            &clock,
            &mut sink,
            PlayerId(404),
            &quest,
            BoostSelection::default(),
            &outcome(45_000),
        );
        assert!(matches!(err, Err(SettleError::PlayerNotFound)));
    }

    #[test]
    fn test_continue_prefers_free_vmoney() {
        let store = MemoryStore::new();
        let mut player = Player::new(PlayerId(1), "tester");
        player.free_vmoney = 80;
        player.vmoney = 100;
        store.insert_player(player);

        let balances = continue_battle(&store, PlayerId(1)).unwrap();
        assert_eq!(balances.free_vmoney, 30);
        assert_eq!(balances.vmoney, 100);
    }

    #[test]
    fn test_continue_falls_back_to_paid_vmoney() {
        let store = MemoryStore::new();
        let mut player = Player::new(PlayerId(1), "tester");
        player.free_vmoney = 20;
        player.vmoney = 100;
        store.insert_player(player);

        let balances = continue_battle(&store, PlayerId(1)).unwrap();
        assert_eq!(balances.free_vmoney, 20);
        assert_eq!(balances.vmoney, 50);
    }

    #[test]
    fn test_continue_fails_when_broke() {
        let store = MemoryStore::new();
        let mut player = Player::new(PlayerId(1), "tester");
        player.free_vmoney = 20;
        player.vmoney = 30;
        store.insert_player(player);

        let err = continue_battle(&store, PlayerId(1));
        assert!(matches!(err, Err(SettleError::NotEnoughVmoney)));

        // Nothing changed
        let player = store.get_player(PlayerId(1)).unwrap();
        assert_eq!(player.free_vmoney, 20);
        assert_eq!(player.vmoney, 30);
    }
}
