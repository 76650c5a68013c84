//! Emberfall Engine Demo
//!
//! Runs a scripted battle settlement against the in-memory store and
//! verifies that a replayed settlement with the same play seed produces
//! identical drops.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use emberfall::{
    core::rng::derive_play_seed,
    data::assets::{BattleQuest, GameAssets, RushEventQuest},
    data::memory::MemoryStore,
    data::player::{Player, PlayerId},
    data::store::RushEventStore,
    quest::settle::{settle_battle, BattleOutcome, BoostSelection, PartyStatistics},
    quest::QuestCategory,
    reward::types::{FixedSlot, RarePoolSlot, Reward, ScoreReward},
    DeterministicRng, GameClock, RankTable, VERSION,
};

/// Rank tier table shipped with the build.
const PLAYER_RANK_JSON: &str = include_str!("../assets/player_rank.json");

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Emberfall Engine v{}", VERSION);

    demo_settlement()
}

/// Demo function to exercise a full settlement flow.
fn demo_settlement() -> anyhow::Result<()> {
    info!("=== Demo Battle Settlement ===");

    let rank_table = RankTable::from_json_str(PLAYER_RANK_JSON)?;
    info!("Rank table: {} tiers", rank_table.max_rank());

    // Seed the world: one player, one rush event quest, one rare pool
    let store = MemoryStore::new();
    let player_id = PlayerId(1);
    let mut player = Player::new(player_id, "Rowan");
    player.rank_point = 90;
    player.stamina = 10;
    player.boost_point = 3;
    store.insert_player(player);

    let mut assets = GameAssets::default();
    assets.rare_pools.insert(
        70001,
        vec![
            Reward::Item { id: 5, count: 3 },
            Reward::Equipment { id: 41, count: 1 },
            Reward::Character { id: 210 },
            Reward::Beads { count: 25 },
        ],
    );
    assets.folders.set_final_round(11, 3);
    assets
        .folders
        .set_clear_rewards(3000, 11, vec![Reward::Item { id: 90, count: 5 }]);

    let quest = BattleQuest {
        quest_id: 500,
        category: QuestCategory::RushEvent,
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
        score_reward_group: vec![
            ScoreReward::Fixed(FixedSlot::Item { id: 5, count: 3 }),
            ScoreReward::Fixed(FixedSlot::Mana { count: 4 }),
            ScoreReward::RarePool(RarePoolSlot {
                group_id: 70001,
                rarity: 0.5,
            }),
            ScoreReward::RarePool(RarePoolSlot {
                group_id: 70001,
                rarity: 1.0,
            }),
        ],
        rush_event: Some(RushEventQuest {
            event_id: 3000,
            folder_id: 11,
            round: 0,
        }),
    };

    let clock = GameClock::fixed_epoch(1_717_329_600);
    let play_id = Uuid::new_v4();
    let seed = derive_play_seed(player_id, &play_id, clock.server_time());
    info!("Play {} seed: {}", play_id, hex::encode(seed.to_be_bytes()));

    let outcome = BattleOutcome {
        play_id,
        elapsed_time_ms: 28_500,
        score: 125_000,
        is_accomplished: true,
        add_mana: 50,
        statistics: PartyStatistics {
            characters: vec![Some(10), Some(11), None],
            unison_characters: vec![Some(12)],
            equipments: vec![Some(41), None, None],
            ability_soul_ids: vec![None],
        },
    };

    let mut rng = DeterministicRng::new(seed);
    let mut sink = |id: PlayerId, rank: u32| {
        info!("Player {} ranked up to {}", id, rank);
    };

    let settlement = settle_battle(
        &store,
        &assets,
        &rank_table,
        &mut rng,
        &clock,
        &mut sink,
        player_id,
        &quest,
        BoostSelection {
            use_boost_point: true,
            use_boss_boost_point: false,
        },
        &outcome,
    )?;

    info!("=== Settlement ===");
    info!(
        "Clear rank {} | rank point {} -> {} | stamina {}",
        settlement.clear_rank,
        settlement.before_rank_point,
        settlement.rank_point,
        settlement.stamina
    );
    info!(
        "Currencies: mana {} / vmoney {} / exp {}",
        settlement.rewards.mana, settlement.rewards.vmoney, settlement.rewards.exp_pool
    );
    for (item_id, count) in &settlement.rewards.items {
        info!("Item {} x{}", item_id, count);
    }
    for drop in &settlement.drop_score_reward_ids {
        info!(
            "Fixed drop: group {} slot {} x{}",
            drop.group_id, drop.index, drop.number
        );
    }
    for drop in &settlement.drop_rare_reward_ids {
        info!(
            "Rare drop: group {} candidate {} x{}",
            drop.group_id, drop.index, drop.number
        );
    }
    if let Some(rush) = &settlement.rush {
        info!(
            "Rush: {:?} round {} (best updated: {})",
            rush.record.battle_type, rush.record.round, rush.record.best_updated
        );
    }
    info!(
        "Balances: mana {} / free vmoney {} / exp {}",
        settlement.balances.free_mana, settlement.balances.free_vmoney, settlement.balances.exp_pool
    );

    // Verify drop determinism by replaying the score group with the
    // same play seed against a fresh world.
    info!("=== Verifying Drop Determinism ===");
    let replay_store = MemoryStore::new();
    let mut replay_player = Player::new(player_id, "Rowan");
    replay_player.rank_point = 90;
    replay_player.stamina = 10;
    replay_player.boost_point = 3;
    replay_store.insert_player(replay_player);

    let mut replay_rng = DeterministicRng::new(seed);
    let mut replay_sink = |_: PlayerId, _: u32| {};
    let replay = settle_battle(
        &replay_store,
        &assets,
        &rank_table,
        &mut replay_rng,
        &clock,
        &mut replay_sink,
        player_id,
        &quest,
        BoostSelection {
            use_boost_point: true,
            use_boss_boost_point: false,
        },
        &outcome,
    )?;

    if replay.drop_rare_reward_ids == settlement.drop_rare_reward_ids
        && replay.drop_score_reward_ids == settlement.drop_score_reward_ids
    {
        info!("DETERMINISM VERIFIED: replayed drops match");
    } else {
        info!("DETERMINISM FAILURE: replayed drops differ");
    }

    let state = store
        .rush_event(player_id, 3000)?
        .context("rush event state missing after settlement")?;
    info!(
        "Endless best: round {:?} time {:?} next {:?}",
        state.endless_battle_max_round,
        state.endless_battle_max_round_time,
        state.endless_battle_next_round
    );

    Ok(())
}
