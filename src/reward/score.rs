//! Score/Rare-Pool Engine
//!
//! Resolves a score reward group: fixed slots always pay out (scaled by
//! the slot multiplier and the boost flag), rare-pool slots roll a hit
//! gate and, on a hit, pick one candidate uniformly and push it through
//! the Reward Aggregator. Both drop ledgers are built as the slots are
//! walked, in slot order.

use tracing::debug;

use crate::core::rng::RandomSource;
use crate::data::assets::RarePoolSource;
use crate::data::player::{CurrencyDelta, PlayerId, RewardGroupId};
use crate::data::store::PlayerStore;
use crate::reward::aggregator::give_reward;
use crate::reward::resolver::RewardError;
use crate::reward::types::{DropRewardId, FixedSlot, ScoreGroupResult, ScoreReward};
use crate::SCORE_REWARD_MULTIPLIER;

/// Apply a score reward group to a player.
///
/// Slots are processed strictly in input order with a 1-based index that
/// advances once per slot, hit or miss, so the fixed-slot ledger records
/// true slot positions even when rare slots in between produce nothing.
///
/// There is no group-level transaction: a failing slot aborts the
/// remaining slots, and slots already applied stay applied.
pub fn give_score_rewards(
    store: &dyn PlayerStore,
    pools: &dyn RarePoolSource,
    rng: &mut dyn RandomSource,
    player_id: PlayerId,
    group_id: RewardGroupId,
    score_rewards: &[ScoreReward],
    boost_active: bool,
) -> Result<ScoreGroupResult, RewardError> {
    let mut out = ScoreGroupResult::default();
    let boost = if boost_active { 2 } else { 1 };

    for (position, score_reward) in score_rewards.iter().enumerate() {
        let index = position as u32 + 1;
        match score_reward {
            ScoreReward::Fixed(fixed) => {
                let amount = fixed.base_count() * SCORE_REWARD_MULTIPLIER * boost;
                match fixed {
                    FixedSlot::Item { id, .. } => {
                        let granted = store.grant_item(player_id, *id, amount)?;
                        out.rewards.add_item(*id, granted);
                    }
                    FixedSlot::Mana { .. } => {
                        let delta = CurrencyDelta {
                            mana: u64::from(amount),
                            ..CurrencyDelta::default()
                        };
                        store.add_balances(player_id, &delta)?;
                        out.rewards.mana += u64::from(amount);
                    }
                    FixedSlot::Exp { .. } => {
                        let delta = CurrencyDelta {
                            exp_pool: u64::from(amount),
                            ..CurrencyDelta::default()
                        };
                        store.add_balances(player_id, &delta)?;
                        out.rewards.exp_pool += u64::from(amount);
                    }
                }
                out.drop_score_reward_ids.push(DropRewardId {
                    group_id,
                    index,
                    number: amount,
                });
            }
            ScoreReward::RarePool(slot) => {
                let roll = rng.unit_roll();
                if roll >= slot.rarity {
                    continue;
                }

                // Candidate selection is uniform; rarity only gated the
                // slot above.
                let Some(pool) = pools.rare_pool(slot.group_id) else {
                    continue;
                };
                if pool.is_empty() {
                    continue;
                }

                let candidate_index = rng.pick_index(pool.len());
                let reward = &pool[candidate_index];
                let number = reward.drop_number();

                let result = give_reward(store, player_id, reward)?;
                out.rewards.merge(result);

                debug!(
                    player = %player_id,
                    group = slot.group_id,
                    candidate = candidate_index + 1,
                    roll,
                    "rare pool hit"
                );
                out.drop_rare_reward_ids.push(DropRewardId {
                    group_id: slot.group_id,
                    index: candidate_index as u32 + 1,
                    number,
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::assets::RarePoolTable;
    use crate::data::player::Player;
    use crate::data::memory::MemoryStore;
    use crate::reward::types::{RarePoolSlot, Reward};

    /// Scripted random source: pops rolls and indices from fixed lists.
    struct ScriptedRng {
        rolls: Vec<f64>,
        indices: Vec<usize>,
    }

    impl ScriptedRng {
        fn new(rolls: Vec<f64>, indices: Vec<usize>) -> Self {
            Self { rolls, indices }
        }
    }

    impl RandomSource for ScriptedRng {
        fn unit_roll(&mut self) -> f64 {
            self.rolls.remove(0)
        }

        fn pick_index(&mut self, len: usize) -> usize {
            if len <= 1 {
                0
            } else {
                self.indices.remove(0)
            }
        }
    }

    fn store_with_player() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_player(Player::new(PlayerId(1), "tester"));
        store
    }

    fn fixed_item(id: u32, count: u32) -> ScoreReward {
        ScoreReward::Fixed(FixedSlot::Item { id, count })
    }

    fn rare(group_id: u32, rarity: f64) -> ScoreReward {
        ScoreReward::RarePool(RarePoolSlot { group_id, rarity })
    }

    #[test]
    fn test_fixed_amount_without_boost() {
        let store = store_with_player();
        let pools = RarePoolTable::default();
        let mut rng = ScriptedRng::new(vec![], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[fixed_item(5, 3)],
            false,
        )
        .unwrap();

        // count=3 → 30 granted
        assert_eq!(result.rewards.items[&5], 30);
        assert_eq!(
            result.drop_score_reward_ids,
            vec![DropRewardId {
                group_id: 10,
                index: 1,
                number: 30
            }]
        );
    }

    #[test]
    fn test_fixed_amount_with_boost() {
        let store = store_with_player();
        let pools = RarePoolTable::default();
        let mut rng = ScriptedRng::new(vec![], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[fixed_item(5, 3)],
            true,
        )
        .unwrap();

        // count=3, boosted → 60 granted
        assert_eq!(result.rewards.items[&5], 60);
        assert_eq!(result.drop_score_reward_ids[0].number, 60);
    }

    #[test]
    fn test_fixed_mana_slot_writes_balance() {
        let store = store_with_player();
        let pools = RarePoolTable::default();
        let mut rng = ScriptedRng::new(vec![], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[ScoreReward::Fixed(FixedSlot::Mana { count: 4 })],
            false,
        )
        .unwrap();

        assert_eq!(result.rewards.mana, 40);
        assert_eq!(store.get_player(PlayerId(1)).unwrap().free_mana, 40);
    }

    #[test]
    fn test_certain_rarity_always_hits() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70001, vec![Reward::Mana { count: 5 }]);

        // Worst possible roll still hits rarity 1.0
        let mut rng = ScriptedRng::new(vec![0.99], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[rare(70001, 1.0)],
            false,
        )
        .unwrap();

        assert_eq!(result.drop_rare_reward_ids.len(), 1);
        assert_eq!(result.rewards.mana, 5);
    }

    #[test]
    fn test_zero_rarity_never_hits() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70001, vec![Reward::Mana { count: 5 }]);

        // Best possible roll still misses rarity 0.0
        let mut rng = ScriptedRng::new(vec![0.0], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[rare(70001, 0.0)],
            false,
        )
        .unwrap();

        assert!(result.drop_rare_reward_ids.is_empty());
        assert_eq!(result.rewards.mana, 0);
    }

    #[test]
    fn test_single_candidate_reports_index_one() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70002, vec![Reward::Item { id: 8, count: 2 }]);

        let mut rng = ScriptedRng::new(vec![0.0], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[rare(70002, 0.5)],
            false,
        )
        .unwrap();

        assert_eq!(
            result.drop_rare_reward_ids,
            vec![DropRewardId {
                group_id: 70002,
                index: 1,
                number: 2
            }]
        );
    }

    #[test]
    fn test_character_hit_reports_number_one() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70003, vec![Reward::Character { id: 300 }]);

        let mut rng = ScriptedRng::new(vec![0.0], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[rare(70003, 1.0)],
            false,
        )
        .unwrap();

        assert_eq!(result.drop_rare_reward_ids[0].number, 1);
        assert_eq!(result.rewards.joined_character_ids, vec![300]);
    }

    #[test]
    fn test_missing_or_empty_pool_is_silent() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70004, vec![]);

        let mut rng = ScriptedRng::new(vec![0.0, 0.0], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[rare(70004, 1.0), rare(99999, 1.0)],
            false,
        )
        .unwrap();

        assert!(result.drop_rare_reward_ids.is_empty());
        assert_eq!(result.rewards, Default::default());
    }

    #[test]
    fn test_slot_index_advances_past_missed_rare_slots() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(70005, vec![Reward::Mana { count: 1 }]);

        // Rare slot in the middle misses
        let mut rng = ScriptedRng::new(vec![0.99], vec![]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[fixed_item(1, 1), rare(70005, 0.5), fixed_item(2, 1)],
            false,
        )
        .unwrap();

        let indices: Vec<u32> = result
            .drop_score_reward_ids
            .iter()
            .map(|d| d.index)
            .collect();
        // Fixed slots keep their true 1-based positions
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_rare_hit_merges_into_running_result() {
        let store = store_with_player();
        let mut pools = RarePoolTable::default();
        pools.insert(
            70006,
            vec![Reward::Item { id: 1, count: 4 }, Reward::Beads { count: 25 }],
        );

        // Two hits: candidate 1 (item), then candidate 2 (beads)
        let mut rng = ScriptedRng::new(vec![0.0, 0.0], vec![0, 1]);

        let result = give_score_rewards(
            &store,
            &pools,
            &mut rng,
            PlayerId(1),
            10,
            &[fixed_item(1, 1), rare(70006, 1.0), rare(70006, 1.0)],
            false,
        )
        .unwrap();

        // Fixed slot granted 10, rare candidate granted 4 more
        assert_eq!(result.rewards.items[&1], 14);
        assert_eq!(result.rewards.vmoney, 25);
        assert_eq!(result.drop_rare_reward_ids.len(), 2);
        assert_eq!(result.drop_rare_reward_ids[1].index, 2);
        assert_eq!(result.drop_rare_reward_ids[1].number, 25);
    }
}
