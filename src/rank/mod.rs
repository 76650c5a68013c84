//! Rank Progression Tracker
//!
//! A monotonic state machine over rank tiers driven by accumulated rank
//! points. The tier table is sorted by cumulative point floor; a grant
//! crosses at most one tier per call, refilling stamina and firing the
//! rank-up sink on the transition.

use serde::Deserialize;
use tracing::info;

use crate::data::player::{Player, PlayerDelta, PlayerId};
use crate::data::store::{PlayerStore, StoreError};

/// One rank tier.
///
/// `total_rp` is the cumulative rank point floor at which the tier is
/// entered; tier 1 starts at 0 and floors increase strictly by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RankTier {
    /// Tier number, 1-based
    pub rank: u32,
    /// Cumulative rank points at which this tier is entered
    pub total_rp: u64,
    /// Stamina refilled on reaching this tier
    pub stamina: u32,
}

/// Errors from rank progression.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RankError {
    /// Rank table holds no tiers.
    #[error("rank table is empty")]
    EmptyTable,

    /// Tier floors are not strictly increasing, or ranks are not 1..N.
    #[error("rank table is not monotonic")]
    NonMonotonicTable,

    /// Rank table asset failed to parse.
    #[error("invalid rank table: {0}")]
    InvalidTable(String),

    /// The player record does not exist.
    #[error("Player not found")]
    PlayerNotFound,

    /// Storage failure, propagated unchanged.
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RankError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlayerNotFound => RankError::PlayerNotFound,
            other => RankError::Store(other),
        }
    }
}

/// Sorted rank tier table.
#[derive(Clone, Debug)]
pub struct RankTable {
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// Build a table, validating tier numbering and floor monotonicity.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, RankError> {
        if tiers.is_empty() {
            return Err(RankError::EmptyTable);
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tier.rank != i as u32 + 1 {
                return Err(RankError::NonMonotonicTable);
            }
            if i > 0 && tiers[i - 1].total_rp >= tier.total_rp {
                return Err(RankError::NonMonotonicTable);
            }
        }
        Ok(Self { tiers })
    }

    /// Load from a JSON array of tiers.
    pub fn from_json_str(json: &str) -> Result<Self, RankError> {
        let tiers: Vec<RankTier> =
            serde_json::from_str(json).map_err(|e| RankError::InvalidTable(e.to_string()))?;
        Self::new(tiers)
    }

    /// Terminal tier number (N).
    pub fn max_rank(&self) -> u32 {
        self.tiers.len() as u32
    }

    /// Tier by 1-based number.
    pub fn tier(&self, rank: u32) -> Option<&RankTier> {
        if rank == 0 {
            return None;
        }
        self.tiers.get(rank as usize - 1)
    }

    /// The tier a point total falls in: the highest tier whose floor is
    /// at or under `points`, clamped to the terminal tier.
    pub fn tier_for(&self, points: u64) -> &RankTier {
        match self
            .tiers
            .binary_search_by(|tier| tier.total_rp.cmp(&points))
        {
            Ok(i) => &self.tiers[i],
            Err(0) => &self.tiers[0],
            Err(i) => &self.tiers[i - 1],
        }
    }
}

/// Sink notified when a player ranks up.
///
/// Fire-and-forget from the engine's perspective: the sink drives
/// client-visible celebration, side quests, and similar follow-ups.
pub trait RankUpSink {
    /// Called once per rank-up with the tier that was reached.
    fn on_rank_up(&mut self, player_id: PlayerId, new_rank: u32);
}

impl<F: FnMut(PlayerId, u32)> RankUpSink for F {
    fn on_rank_up(&mut self, player_id: PlayerId, new_rank: u32) {
        self(player_id, new_rank)
    }
}

/// Outcome of a rank point grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankGrant {
    /// Rank points after the grant
    pub rank_point: u64,
    /// Stamina after the grant (refilled on a rank-up)
    pub stamina: u32,
    /// Tier reached by this grant, if it caused a rank-up
    pub ranked_up_to: Option<u32>,
}

/// Apply a rank point delta to a player snapshot.
///
/// Pure apart from the sink: callers fold the returned values into their
/// own player commit. At most one tier transition is evaluated per call,
/// even when the delta would cross several tiers; the terminal tier never
/// transitions.
pub fn apply_rank_point(
    table: &RankTable,
    player: &Player,
    delta: u64,
    sink: &mut dyn RankUpSink,
) -> RankGrant {
    let current = table.tier_for(player.rank_point);
    let rank_point = player.rank_point + delta;
    let mut stamina = player.stamina;
    let mut ranked_up_to = None;

    if current.rank < table.max_rank() {
        if let Some(next) = table.tier(current.rank + 1) {
            if rank_point >= next.total_rp {
                stamina = next.stamina;
                ranked_up_to = Some(next.rank);
                info!(player = %player.id, rank = next.rank, "rank up");
                sink.on_rank_up(player.id, next.rank);
            }
        }
    }

    RankGrant {
        rank_point,
        stamina,
        ranked_up_to,
    }
}

/// Grant rank points to a stored player and persist the outcome.
///
/// Reads the record, applies the delta, and writes the new rank point
/// total (and stamina, on a rank-up) back through the store.
pub fn grant_rank_point(
    table: &RankTable,
    store: &dyn PlayerStore,
    player_id: PlayerId,
    delta: u64,
    sink: &mut dyn RankUpSink,
) -> Result<RankGrant, RankError> {
    let player = store.get_player(player_id)?;
    let grant = apply_rank_point(table, &player, delta, sink);

    store.update_player(
        player_id,
        &PlayerDelta {
            rank_point: Some(grant.rank_point),
            stamina: Some(grant.stamina),
            ..PlayerDelta::default()
        },
    )?;

    Ok(grant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;

    fn table() -> RankTable {
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
            RankTier {
                rank: 3,
                total_rp: 250,
                stamina: 30,
            },
        ])
        .unwrap()
    }

    /// Sink that records every notification.
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<(PlayerId, u32)>,
    }

    impl RankUpSink for RecordingSink {
        fn on_rank_up(&mut self, player_id: PlayerId, new_rank: u32) {
            self.calls.push((player_id, new_rank));
        }
    }

    #[test]
    fn test_tier_for_floors() {
        let table = table();
        assert_eq!(table.tier_for(0).rank, 1);
        assert_eq!(table.tier_for(99).rank, 1);
        assert_eq!(table.tier_for(100).rank, 2);
        assert_eq!(table.tier_for(249).rank, 2);
        assert_eq!(table.tier_for(250).rank, 3);
        // Clamped past the last floor
        assert_eq!(table.tier_for(1_000_000).rank, 3);
    }

    #[test]
    fn test_rank_up_fires_once_with_new_tier() {
        let table = table();
        let mut player = Player::new(PlayerId(1), "tester");
        player.rank_point = 90;
        player.stamina = 10;
        let mut sink = RecordingSink::default();

        let grant = apply_rank_point(&table, &player, 15, &mut sink);

        assert_eq!(grant.rank_point, 105);
        assert_eq!(grant.stamina, 20);
        assert_eq!(grant.ranked_up_to, Some(2));
        assert_eq!(sink.calls, vec![(PlayerId(1), 2)]);
    }

    #[test]
    fn test_no_rank_up_below_next_floor() {
        let table = table();
        let mut player = Player::new(PlayerId(1), "tester");
        player.rank_point = 50;
        player.stamina = 10;
        let mut sink = RecordingSink::default();

        let grant = apply_rank_point(&table, &player, 20, &mut sink);

        assert_eq!(grant.rank_point, 70);
        assert_eq!(grant.stamina, 10);
        assert_eq!(grant.ranked_up_to, None);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_terminal_tier_never_transitions() {
        let table = table();
        let mut player = Player::new(PlayerId(1), "tester");
        player.rank_point = 500;
        player.stamina = 30;
        let mut sink = RecordingSink::default();

        let grant = apply_rank_point(&table, &player, 10_000, &mut sink);

        assert_eq!(grant.ranked_up_to, None);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_large_delta_advances_one_tier_only() {
        let table = table();
        let mut player = Player::new(PlayerId(1), "tester");
        player.rank_point = 50;
        let mut sink = RecordingSink::default();

        // Enough points to pass both remaining floors
        let grant = apply_rank_point(&table, &player, 400, &mut sink);

        // Single-step policy: only tier 2 is reached this call
        assert_eq!(grant.ranked_up_to, Some(2));
        assert_eq!(grant.stamina, 20);
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn test_grant_persists_through_store() {
        let table = table();
        let store = MemoryStore::new();
        let mut player = Player::new(PlayerId(7), "tester");
        player.rank_point = 90;
        store.insert_player(player);
        let mut sink = RecordingSink::default();

        let grant = grant_rank_point(&table, &store, PlayerId(7), 15, &mut sink).unwrap();

        assert_eq!(grant.rank_point, 105);
        let stored = store.get_player(PlayerId(7)).unwrap();
        assert_eq!(stored.rank_point, 105);
        assert_eq!(stored.stamina, 20);
    }

    #[test]
    fn test_missing_player_errors() {
        let table = table();
        let store = MemoryStore::new();
        let mut sink = |_: PlayerId, _: u32| {};

        let err = grant_rank_point(&table, &store, PlayerId(404), 10, &mut sink);
        assert!(matches!(err, Err(RankError::PlayerNotFound)));
    }

    #[test]
    fn test_table_validation() {
        assert!(matches!(
            RankTable::new(vec![]),
            Err(RankError::EmptyTable)
        ));

        let bad_floors = vec![
            RankTier {
                rank: 1,
                total_rp: 100,
                stamina: 10,
            },
            RankTier {
                rank: 2,
                total_rp: 100,
                stamina: 20,
            },
        ];
        assert!(matches!(
            RankTable::new(bad_floors),
            Err(RankError::NonMonotonicTable)
        ));
    }

    #[test]
    fn test_table_from_json() {
        let table = RankTable::from_json_str(
            r#"[
                {"rank": 1, "total_rp": 0, "stamina": 10},
                {"rank": 2, "total_rp": 100, "stamina": 20}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.max_rank(), 2);
        assert_eq!(table.tier_for(150).rank, 2);
    }
}
