//! Player Record
//!
//! The subset of persistent player state the engine reads and mutates.
//! Ownership stays with the storage collaborator; the engine only ever
//! sees snapshots and hands back deltas.

use serde::{Deserialize, Serialize};

/// Unique player identifier.
///
/// Implements `Ord` for deterministic `BTreeMap` ordering.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identifier (static game data).
pub type ItemId = u32;
/// Equipment identifier (static game data).
pub type EquipmentId = u32;
/// Character identifier (static game data).
pub type CharacterId = u32;
/// Battle quest identifier (static game data).
pub type QuestId = u32;
/// Rush event identifier (static game data).
pub type RushEventId = u32;
/// Rush event folder identifier (static game data).
pub type FolderId = u32;
/// Score/rare reward group identifier (static game data).
pub type RewardGroupId = u32;

/// Persistent player record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name (leaderboard projections)
    pub name: String,

    /// Free mana balance
    pub free_mana: u64,

    /// Free (earned) vmoney balance
    pub free_vmoney: u64,

    /// Paid vmoney balance
    pub vmoney: u64,

    /// Pooled character experience
    pub exp_pool: u64,

    /// Accumulated rank points
    pub rank_point: u64,

    /// Current stamina
    pub stamina: u32,

    /// Boost points available for regular quests
    pub boost_point: u32,

    /// Boost points available for boss quests
    pub boss_boost_point: u32,
}

impl Player {
    /// Create a fresh player with empty balances.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            free_mana: 0,
            free_vmoney: 0,
            vmoney: 0,
            exp_pool: 0,
            rank_point: 0,
            stamina: 0,
            boost_point: 0,
            boss_boost_point: 0,
        }
    }

    /// Snapshot of the currency balances.
    pub fn balances(&self) -> Balances {
        Balances {
            free_mana: self.free_mana,
            free_vmoney: self.free_vmoney,
            vmoney: self.vmoney,
            exp_pool: self.exp_pool,
        }
    }
}

/// Currency balances, as read back after a committed delta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Free mana
    pub free_mana: u64,
    /// Free vmoney
    pub free_vmoney: u64,
    /// Paid vmoney
    pub vmoney: u64,
    /// Pooled experience
    pub exp_pool: u64,
}

/// Additive currency delta, applied atomically by the store.
///
/// All fields add to the free side of the respective balance; the engine
/// never grants paid vmoney.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrencyDelta {
    /// Mana to add
    pub mana: u64,
    /// Free vmoney to add
    pub vmoney: u64,
    /// Pooled experience to add
    pub exp_pool: u64,
}

impl CurrencyDelta {
    /// True when every component is zero.
    pub fn is_zero(&self) -> bool {
        self.mana == 0 && self.vmoney == 0 && self.exp_pool == 0
    }
}

/// Partial player update. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct PlayerDelta {
    /// New free mana balance
    pub free_mana: Option<u64>,
    /// New free vmoney balance
    pub free_vmoney: Option<u64>,
    /// New paid vmoney balance
    pub vmoney: Option<u64>,
    /// New pooled experience
    pub exp_pool: Option<u64>,
    /// New rank point total
    pub rank_point: Option<u64>,
    /// New stamina value
    pub stamina: Option<u32>,
    /// New boost point count
    pub boost_point: Option<u32>,
    /// New boss boost point count
    pub boss_boost_point: Option<u32>,
}

impl PlayerDelta {
    /// Apply this delta to a player record in place.
    pub fn apply_to(&self, player: &mut Player) {
        if let Some(v) = self.free_mana {
            player.free_mana = v;
        }
        if let Some(v) = self.free_vmoney {
            player.free_vmoney = v;
        }
        if let Some(v) = self.vmoney {
            player.vmoney = v;
        }
        if let Some(v) = self.exp_pool {
            player.exp_pool = v;
        }
        if let Some(v) = self.rank_point {
            player.rank_point = v;
        }
        if let Some(v) = self.stamina {
            player.stamina = v;
        }
        if let Some(v) = self.boost_point {
            player.boost_point = v;
        }
        if let Some(v) = self.boss_boost_point {
            player.boss_boost_point = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_ordering() {
        assert!(PlayerId(1) < PlayerId(2));
        assert!(PlayerId(10) > PlayerId(9));
    }

    #[test]
    fn test_delta_applies_only_set_fields() {
        let mut player = Player::new(PlayerId(1), "tester");
        player.free_mana = 100;
        player.stamina = 30;

        let delta = PlayerDelta {
            free_mana: Some(250),
            ..PlayerDelta::default()
        };
        delta.apply_to(&mut player);

        assert_eq!(player.free_mana, 250);
        assert_eq!(player.stamina, 30);
    }

    #[test]
    fn test_currency_delta_zero() {
        assert!(CurrencyDelta::default().is_zero());
        let delta = CurrencyDelta {
            mana: 1,
            ..CurrencyDelta::default()
        };
        assert!(!delta.is_zero());
    }
}
