//! Storage collaborator boundary and an in-process reference store.
//!
//! The core never performs I/O itself; it produces and consumes the records
//! that cross this trait. [`InMemoryStore`] backs tests, benches and
//! single-process deployments.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::affinity::{AffinityManager, AffinityState, AffinityUpdate, RelationshipEvent};
use crate::episodes::Episode;
use crate::error::Result;
use crate::facts::{Fact, FactCategory, FactKey, FactSet};

/// Persistence for facts, episodes and relationship state.
///
/// Implementations must allow at most one concurrent writer per
/// `(user_id, personality_name)` affinity record.
pub trait Store: Send + Sync {
    /// Insert or replace a fact by `(user_id, category, key)`; returns the replaced fact.
    fn save_fact(&self, fact: Fact) -> impl Future<Output = Result<Option<Fact>>> + Send;

    /// Facts for a user, optionally limited to one category.
    fn get_facts(
        &self,
        user_id: &str,
        category: Option<FactCategory>,
    ) -> impl Future<Output = Result<Vec<Fact>>> + Send;

    /// Store an episode.
    fn save_episode(&self, episode: Episode) -> impl Future<Output = Result<()>> + Send;

    /// Episodes for a user whose current importance is at least
    /// `min_importance`, most important first.
    fn get_episodes(
        &self,
        user_id: &str,
        min_importance: Option<f64>,
    ) -> impl Future<Output = Result<Vec<Episode>>> + Send;

    /// Insert or replace relationship state.
    fn save_affinity(&self, state: AffinityState) -> impl Future<Output = Result<()>> + Send;

    /// Relationship state for a pair, if any.
    fn get_affinity(
        &self,
        user_id: &str,
        personality_name: &str,
    ) -> impl Future<Output = Result<Option<AffinityState>>> + Send;

    /// Append to a relationship's audit history.
    fn append_event(&self, event: RelationshipEvent) -> impl Future<Output = Result<()>> + Send;

    /// Audit history of a relationship, oldest first.
    fn events(
        &self,
        user_id: &str,
        personality_name: &str,
    ) -> impl Future<Output = Result<Vec<RelationshipEvent>>> + Send;
}

type PairKey = (String, String);
type AffinitySlot = Arc<Mutex<Option<AffinityState>>>;

fn pair(user_id: &str, personality_name: &str) -> PairKey {
    (user_id.to_string(), personality_name.to_string())
}

/// Thread-safe in-memory [`Store`].
///
/// Affinity records live behind one mutex per pair, so read-modify-write
/// cycles through [`InMemoryStore::update_affinity`] on the same pair are
/// serialized while different pairs proceed independently.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    facts: RwLock<FactSet>,
    episodes: RwLock<HashMap<String, Vec<Episode>>>,
    affinity: RwLock<HashMap<PairKey, AffinitySlot>>,
    events: RwLock<HashMap<PairKey, Vec<RelationshipEvent>>>,
}

impl InMemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: PairKey) -> AffinitySlot {
        if let Some(slot) = self.affinity.read().get(&key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.affinity.write().entry(key).or_default())
    }

    /// Read-modify-write one relationship record under its pair lock.
    ///
    /// `f` receives the stored state (if any) and returns the replacement
    /// plus a value handed back to the caller. If `f` fails, nothing changes.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn update_affinity<T, F>(&self, user_id: &str, personality_name: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<&AffinityState>) -> Result<(AffinityState, T)>,
    {
        let slot = self.slot(pair(user_id, personality_name));
        let mut guard = slot.lock();
        let (next, out) = f(guard.as_ref())?;
        *guard = Some(next);
        Ok(out)
    }

    /// Apply a point delta to a relationship, creating it on first contact,
    /// and append the resulting event to its history under the same pair lock.
    ///
    /// # Errors
    /// Currently infallible for the in-memory store; the `Result` mirrors
    /// [`InMemoryStore::update_affinity`].
    pub fn apply_delta(
        &self,
        manager: &AffinityManager,
        user_id: &str,
        personality_name: &str,
        points_delta: i32,
    ) -> Result<AffinityUpdate> {
        // The event is pushed while the pair lock is held, so history order
        // matches the order of state updates.
        self.update_affinity(user_id, personality_name, |current| {
            let base = match current {
                Some(state) => state.clone(),
                None => manager.initial_state(user_id, personality_name),
            };
            let update = manager.update(&base, points_delta);
            self.events
                .write()
                .entry(pair(user_id, personality_name))
                .or_default()
                .push(update.event.clone());
            Ok((update.state.clone(), update))
        })
    }

    /// Number of facts held.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.read().len()
    }
}

impl Store for InMemoryStore {
    async fn save_fact(&self, fact: Fact) -> Result<Option<Fact>> {
        let FactKey { user_id, category, key } = fact.identity();
        let replaced = self.facts.write().upsert(fact);
        if replaced.is_some() {
            debug!(user_id = %user_id, %category, key = %key, "Fact overwritten");
        }
        Ok(replaced)
    }

    async fn get_facts(&self, user_id: &str, category: Option<FactCategory>) -> Result<Vec<Fact>> {
        Ok(self
            .facts
            .read()
            .for_user(user_id, category)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn save_episode(&self, episode: Episode) -> Result<()> {
        self.episodes
            .write()
            .entry(episode.user_id.clone())
            .or_default()
            .push(episode);
        Ok(())
    }

    async fn get_episodes(&self, user_id: &str, min_importance: Option<f64>) -> Result<Vec<Episode>> {
        let floor = min_importance.unwrap_or(f64::NEG_INFINITY);
        let mut out: Vec<Episode> = self
            .episodes
            .read()
            .get(user_id)
            .map(|all| {
                all.iter()
                    .filter(|e| e.get_current_importance() >= floor)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| {
            OrderedFloat(b.get_current_importance())
                .cmp(&OrderedFloat(a.get_current_importance()))
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Ok(out)
    }

    async fn save_affinity(&self, state: AffinityState) -> Result<()> {
        let slot = self.slot(pair(&state.user_id, &state.personality_name));
        *slot.lock() = Some(state);
        Ok(())
    }

    async fn get_affinity(&self, user_id: &str, personality_name: &str) -> Result<Option<AffinityState>> {
        let Some(slot) = self.affinity.read().get(&pair(user_id, personality_name)).cloned() else {
            return Ok(None);
        };
        let state = slot.lock().clone();
        Ok(state)
    }

    async fn append_event(&self, event: RelationshipEvent) -> Result<()> {
        self.events
            .write()
            .entry(pair(&event.user_id, &event.personality_name))
            .or_default()
            .push(event);
        Ok(())
    }

    async fn events(&self, user_id: &str, personality_name: &str) -> Result<Vec<RelationshipEvent>> {
        Ok(self
            .events
            .read()
            .get(&pair(user_id, personality_name))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episodes::{EpisodeType, Sentiment};

    #[tokio::test]
    async fn facts_overwrite_by_identity() {
        let store = InMemoryStore::new();
        let first = Fact::new("u1", FactCategory::Work, "job", "nurse", 0.9).expect("valid");
        let second = Fact::new("u1", FactCategory::Work, "job", "doctor", 0.75).expect("valid");
        assert!(store.save_fact(first).await.expect("save").is_none());
        assert!(store.save_fact(second).await.expect("save").is_some());

        let facts = store.get_facts("u1", Some(FactCategory::Work)).await.expect("load");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "doctor");
        assert!((facts[0].confidence - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn episodes_filter_by_current_importance() {
        let store = InMemoryStore::new();
        for (importance, days) in [(9.0, 0.0), (6.0, 0.0), (6.0, 365.0)] {
            let mut e = Episode::new("u1", EpisodeType::Milestone, "t", "", Sentiment::Neutral, importance)
                .expect("valid");
            e.update_decay(days);
            store.save_episode(e).await.expect("save");
        }
        let all = store.get_episodes("u1", None).await.expect("load");
        assert_eq!(all.len(), 3);
        assert!((all[0].importance() - 9.0).abs() < f64::EPSILON);

        let important = store.get_episodes("u1", Some(5.0)).await.expect("load");
        assert_eq!(important.len(), 2);
        assert!(store.get_episodes("nobody", None).await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn affinity_round_trip_and_history() {
        let store = InMemoryStore::new();
        let manager = AffinityManager::default();
        assert!(store.get_affinity("u1", "aria").await.expect("load").is_none());

        let update = store.apply_delta(&manager, "u1", "aria", 45).expect("apply");
        assert_eq!(update.state.current_level, "friend");

        let stored = store.get_affinity("u1", "aria").await.expect("load").expect("present");
        assert_eq!(stored.affinity_points, 45);
        let history = store.events("u1", "aria").await.expect("load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].points_after, 45);
    }

    #[test]
    fn failed_update_leaves_state_untouched() {
        let store = InMemoryStore::new();
        let manager = AffinityManager::default();
        store.apply_delta(&manager, "u1", "aria", 10).expect("apply");
        let err = store.update_affinity("u1", "aria", |_| -> Result<(AffinityState, ())> {
            Err(crate::error::RapportError::validation("affinity_points", "rejected"))
        });
        assert!(err.is_err());
        let points = store
            .update_affinity("u1", "aria", |s| {
                let s = s.expect("present").clone();
                let points = s.affinity_points;
                Ok((s, points))
            })
            .expect("read");
        assert_eq!(points, 10);
    }
}
