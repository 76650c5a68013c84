//! Reward Aggregator
//!
//! Applies an ordered reward batch to one player in one logical
//! transaction: grants happen in input order, per-entity ledgers
//! accumulate by id, and all currency lands in exactly one balance write
//! at the end.

use tracing::debug;

use crate::data::player::{CurrencyDelta, PlayerId};
use crate::data::store::PlayerStore;
use crate::reward::resolver::{resolve_reward, ResolvedEffect, RewardError};
use crate::reward::types::{PlayerRewardResult, Reward};

/// Apply an ordered list of rewards to a player.
///
/// Currency deltas sum across the batch and are committed with a single
/// atomic balance add after the loop: at most one currency write per
/// call, however many currency-bearing rewards were in the batch. A
/// missing player at commit time fails the call with
/// [`RewardError::PlayerNotFound`] and no partial result.
pub fn give_rewards(
    store: &dyn PlayerStore,
    player_id: PlayerId,
    rewards: &[Reward],
) -> Result<PlayerRewardResult, RewardError> {
    let mut result = PlayerRewardResult::default();

    for reward in rewards {
        match resolve_reward(store, player_id, reward)? {
            ResolvedEffect::Item { id, granted } => result.add_item(id, granted),
            ResolvedEffect::Equipment(equipment) => {
                // Same id granted twice keeps the latest snapshot
                result.equipment.insert(equipment.id, equipment);
            }
            ResolvedEffect::CharacterJoined(character) => {
                result.joined_character_ids.push(character.id);
                result.characters.insert(character.id, character);
            }
            ResolvedEffect::CharacterConverted { item_id, count } => {
                // Redirected acquisitions live only in the item ledger
                result.add_item(item_id, count);
            }
            ResolvedEffect::Currency(delta) => {
                result.mana += delta.mana;
                result.vmoney += delta.vmoney;
                result.exp_pool += delta.exp_pool;
            }
        }
    }

    if result.has_currency() {
        let delta = CurrencyDelta {
            mana: result.mana,
            vmoney: result.vmoney,
            exp_pool: result.exp_pool,
        };
        store.add_balances(player_id, &delta)?;
        debug!(player = %player_id, mana = delta.mana, vmoney = delta.vmoney, exp = delta.exp_pool, "batch currency committed");
    }

    Ok(result)
}

/// Apply a single reward (one-element batch).
pub fn give_reward(
    store: &dyn PlayerStore,
    player_id: PlayerId,
    reward: &Reward,
) -> Result<PlayerRewardResult, RewardError> {
    give_rewards(store, player_id, std::slice::from_ref(reward))
}
