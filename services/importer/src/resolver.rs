//! Entity resolver - natural key -> surrogate id caches for one import run.
//!
//! Caches are never evicted and never persisted; a fresh `Resolver` knows
//! nothing about rows written by earlier runs.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

use crate::store::{NewEntity, Store};

/// Natural key of a match: (date, home team id, away team id)
pub type MatchKey = (NaiveDate, u64, u64);

/// Exact-match cache from a natural key to the id storage generated for it
#[derive(Debug)]
pub struct IdCache<K> {
    ids: HashMap<K, u64>,
}

impl<K> Default for IdCache<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> IdCache<K> {
    pub fn get<Q>(&self, key: &Q) -> Option<u64>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Return the cached id for `key`, or insert `entity` and remember the new id.
    /// Storage is only touched on a miss.
    pub async fn resolve_or_create<S: Store>(
        &mut self,
        key: K,
        store: &mut S,
        entity: NewEntity<'_>,
    ) -> Result<u64> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }
        let id = store.insert_entity(entity).await?;
        tracing::debug!(id, ?entity, "created");
        self.ids.insert(key, id);
        Ok(id)
    }
}

/// All lookup state shared by the import stages
#[derive(Debug, Default)]
pub struct Resolver {
    pub teams: IdCache<String>,
    pub tournaments: IdCache<String>,
    pub locations: IdCache<(String, String)>,
    pub players: IdCache<(String, u64)>,
    matches: HashMap<MatchKey, u64>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn team<S: Store>(&mut self, store: &mut S, name: &str) -> Result<u64> {
        self.teams
            .resolve_or_create(name.to_string(), store, NewEntity::Team(name))
            .await
    }

    pub async fn tournament<S: Store>(&mut self, store: &mut S, name: &str) -> Result<u64> {
        self.tournaments
            .resolve_or_create(name.to_string(), store, NewEntity::Tournament(name))
            .await
    }

    pub async fn location<S: Store>(
        &mut self,
        store: &mut S,
        city: &str,
        country: &str,
    ) -> Result<u64> {
        self.locations
            .resolve_or_create(
                (city.to_string(), country.to_string()),
                store,
                NewEntity::Location { city, country },
            )
            .await
    }

    pub async fn player<S: Store>(&mut self, store: &mut S, name: &str, team_id: u64) -> Result<u64> {
        self.players
            .resolve_or_create(
                (name.to_string(), team_id),
                store,
                NewEntity::Player { name, team_id },
            )
            .await
    }

    /// Read-only team lookup; never creates
    pub fn team_id(&self, name: &str) -> Option<u64> {
        self.teams.get(name)
    }

    /// Remember a freshly inserted match. The first id recorded for a key wins.
    pub fn record_match(&mut self, key: MatchKey, match_id: u64) {
        self.matches.entry(key).or_insert(match_id);
    }

    pub fn match_id(&self, key: &MatchKey) -> Option<u64> {
        self.matches.get(key).copied()
    }
}
