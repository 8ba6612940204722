//! Time-weighted scoring and selection of memories.
//!
//! A candidate's composite score is
//! `w_sim * similarity + w_rec * exp(-decay_rate * hours) + w_imp * importance / max_importance`,
//! where `hours` is the time since the record was last accessed.

use crate::error::MemoryError;
use crate::model::MemoryRecord;
use crate::store::MemoryRecordStore;
use chrono::{DateTime, Utc};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Decay rate that halves the recency score every 100 hours.
pub const DEFAULT_DECAY_RATE: f64 = std::f64::consts::LN_2 / 100.0;
/// Default candidate overfetch multiplier.
pub const DEFAULT_OVERFETCH_FACTOR: usize = 4;

/// Relative weight of each ranking signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Weight of the index similarity.
    pub similarity: f64,
    /// Weight of the recency decay.
    pub recency: f64,
    /// Weight of the normalized importance.
    pub importance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: 1.0,
            recency: 1.0,
            importance: 1.0,
        }
    }
}

impl ScoreWeights {
    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<(), MemoryError> {
        for (name, weight) in [
            ("similarity", self.similarity),
            ("recency", self.recency),
            ("importance", self.importance),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MemoryError::invalid(format!(
                    "{name} weight must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// A ranked memory with its individual signal scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    /// The record as seen after selection.
    pub record: MemoryRecord,
    /// Similarity reported by the index, in `[0, 1]`.
    pub similarity: f64,
    /// Recency decay, in `(0, 1]`.
    pub recency: f64,
    /// Importance normalized by the store maximum.
    pub importance: f64,
    /// Weighted sum of the three signals.
    pub composite: f64,
}

/// Ranking policy combining similarity, recency decay and importance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    decay_rate: f64,
    overfetch_factor: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            overfetch_factor: DEFAULT_OVERFETCH_FACTOR,
        }
    }
}

impl ScoringPolicy {
    /// Build a policy. An overfetch factor of zero is raised to one.
    pub fn new(decay_rate: f64, overfetch_factor: usize) -> Result<Self, MemoryError> {
        if !decay_rate.is_finite() || decay_rate < 0.0 {
            return Err(MemoryError::invalid(format!(
                "decay rate must be a non-negative number, got {decay_rate}"
            )));
        }
        Ok(Self {
            decay_rate,
            overfetch_factor: overfetch_factor.max(1),
        })
    }

    /// Configured decay rate per hour.
    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Configured overfetch multiplier.
    pub fn overfetch_factor(&self) -> usize {
        self.overfetch_factor
    }

    /// Exponential decay of the time since last access.
    pub fn recency_score(&self, record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
        (-self.decay_rate * record.hours_since_access(now)).exp()
    }

    /// Score one candidate.
    pub fn score(
        &self,
        record: MemoryRecord,
        similarity: f32,
        now: DateTime<Utc>,
        max_importance: f64,
        weights: &ScoreWeights,
    ) -> ScoredMemory {
        let similarity = f64::from(similarity);
        let recency = self.recency_score(&record, now);
        let importance = record.importance / max_importance;
        let composite = weights.similarity * similarity
            + weights.recency * recency
            + weights.importance * importance;
        ScoredMemory {
            record,
            similarity,
            recency,
            importance,
            composite,
        }
    }

    /// Deduplicate candidates by id, score them and sort best first.
    ///
    /// Ties fall back to the newer `created_at`, then the lower id.
    pub fn rank(
        &self,
        candidates: Vec<(MemoryRecord, f32)>,
        now: DateTime<Utc>,
        max_importance: f64,
        weights: &ScoreWeights,
    ) -> Vec<ScoredMemory> {
        let mut unique: HashMap<_, (MemoryRecord, f32)> = HashMap::with_capacity(candidates.len());
        for (record, similarity) in candidates {
            match unique.entry(record.id) {
                Entry::Occupied(mut entry) => {
                    if similarity > entry.get().1 {
                        entry.get_mut().1 = similarity;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert((record, similarity));
                }
            }
        }
        let mut scored: Vec<ScoredMemory> = unique
            .into_values()
            .map(|(record, similarity)| self.score(record, similarity, now, max_importance, weights))
            .collect();
        scored.sort_by(compare_ranked);
        scored
    }

    /// Select the top `k` memories for a query and mark them accessed at `now`.
    pub async fn select(
        &self,
        store: &MemoryRecordStore,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        weights: &ScoreWeights,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let scored = self
            .select_scored(store, query_embedding, now, k, weights)
            .await?;
        Ok(scored.into_iter().map(|scored| scored.record).collect())
    }

    /// Like [`ScoringPolicy::select`], keeping the per-signal scores.
    ///
    /// Access times are written in one step after the index lookup, so a
    /// cancelled call leaves every record untouched.
    pub async fn select_scored(
        &self,
        store: &MemoryRecordStore,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        weights: &ScoreWeights,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        if k == 0 {
            return Err(MemoryError::invalid("k must be positive"));
        }
        weights.validate()?;
        if store.is_empty() {
            return Err(MemoryError::EmptyStore);
        }

        let limit = k.saturating_mul(self.overfetch_factor);
        let candidates = store.all_candidates(query_embedding, limit).await?;
        let candidate_count = candidates.len();
        let mut ranked = self.rank(candidates, now, store.config().max_importance, weights);
        ranked.truncate(k);

        let ids: Vec<_> = ranked.iter().map(|scored| scored.record.id).collect();
        let touched = store.touch_all(&ids, now)?;
        for (scored, record) in ranked.iter_mut().zip(touched) {
            scored.record = record;
        }
        debug!(
            "selected memories (k={}, candidates={}, selected={})",
            k,
            candidate_count,
            ranked.len()
        );
        Ok(ranked)
    }
}

fn compare_ranked(a: &ScoredMemory, b: &ScoredMemory) -> Ordering {
    b.composite
        .total_cmp(&a.composite)
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| a.record.id.cmp(&b.record.id))
}
