//! Reward Resolver
//!
//! Applies one typed reward to one player. Item, equipment and character
//! grants take effect immediately through the storage collaborator;
//! currency rewards come back as pure deltas for the caller to batch into
//! a single balance write.

use tracing::debug;

use crate::data::player::{CurrencyDelta, ItemId, PlayerId};
use crate::data::store::{CharacterGrant, GrantedCharacter, GrantedEquipment, PlayerStore, StoreError};
use crate::reward::types::Reward;

/// Errors surfaced by reward application.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RewardError {
    /// The balance write target is missing; aborts the aggregation.
    #[error("Player not found")]
    PlayerNotFound,

    /// Storage failure, propagated unchanged.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RewardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlayerNotFound => RewardError::PlayerNotFound,
            other => RewardError::Store(other),
        }
    }
}

/// What resolving one reward did.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedEffect {
    /// Item granted; `granted` is the amount the store actually accepted.
    Item {
        /// Item ID
        id: ItemId,
        /// Amount actually granted (store may cap)
        granted: u32,
    },
    /// Equipment instances created.
    Equipment(GrantedEquipment),
    /// Character newly joined the roster.
    CharacterJoined(GrantedCharacter),
    /// Character was already owned; the store granted a substitute item.
    CharacterConverted {
        /// Substitute item ID
        item_id: ItemId,
        /// Substitute amount granted
        count: u32,
    },
    /// Pure currency delta; no side effect until the caller commits it.
    Currency(CurrencyDelta),
}

/// Resolve a single reward against a player.
///
/// Grant side effects are immediate and not deferred; the returned effect
/// tells the aggregator which ledger to fold the outcome into.
pub fn resolve_reward(
    store: &dyn PlayerStore,
    player_id: PlayerId,
    reward: &Reward,
) -> Result<ResolvedEffect, RewardError> {
    match reward {
        Reward::Item { id, count } => {
            let granted = store.grant_item(player_id, *id, *count)?;
            debug!(player = %player_id, item = id, requested = count, granted, "item granted");
            Ok(ResolvedEffect::Item { id: *id, granted })
        }
        Reward::Equipment { id, count } => {
            let equipment = store.grant_equipment(player_id, *id, *count)?;
            debug!(player = %player_id, equipment = id, count, "equipment granted");
            Ok(ResolvedEffect::Equipment(equipment))
        }
        Reward::Character { id } => match store.grant_character(player_id, *id)? {
            CharacterGrant::Joined(character) => {
                debug!(player = %player_id, character = id, "character joined");
                Ok(ResolvedEffect::CharacterJoined(character))
            }
            CharacterGrant::AlreadyOwned { item_id, count } => {
                debug!(player = %player_id, character = id, substitute = item_id, "duplicate character converted");
                Ok(ResolvedEffect::CharacterConverted { item_id, count })
            }
        },
        Reward::Beads { count } => Ok(ResolvedEffect::Currency(CurrencyDelta {
            vmoney: u64::from(*count),
            ..CurrencyDelta::default()
        })),
        Reward::Mana { count } => Ok(ResolvedEffect::Currency(CurrencyDelta {
            mana: u64::from(*count),
            ..CurrencyDelta::default()
        })),
        Reward::Exp { count } => Ok(ResolvedEffect::Currency(CurrencyDelta {
            exp_pool: u64::from(*count),
            ..CurrencyDelta::default()
        })),
    }
}
