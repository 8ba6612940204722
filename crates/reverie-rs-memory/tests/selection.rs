//! Selection and ranking behaviour of the time-weighted memory stream.

use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use reverie_rs_memory::{
    MemoryError, MemoryId, MemoryRecordStore, ScoreWeights, ScoringPolicy, SimilarityIndex,
    StoreConfig,
};
use reverie_rs_test_utils::{DuplicatingIndex, FailingIndex, ScriptedIndex};
use std::sync::Arc;

const QUERY: [f32; 2] = [1.0, 0.0];

fn config() -> StoreConfig {
    StoreConfig {
        dimensions: 2,
        min_importance: 1.0,
        max_importance: 10.0,
    }
}

fn scripted_store(index: Arc<ScriptedIndex>) -> MemoryRecordStore {
    MemoryRecordStore::new(config(), index).expect("store")
}

/// Store with A (importance 1, 200h old), B (importance 10, 200h old) and
/// C (importance 1, created now), all at similarity 0.5.
async fn abc_store(now: DateTime<Utc>) -> (MemoryRecordStore, [MemoryId; 3]) {
    let store = scripted_store(Arc::new(ScriptedIndex::new(0.5)));
    let old = now - Duration::hours(200);
    let a = store.add("A", QUERY.to_vec(), 1.0, old).await.expect("add a");
    let b = store.add("B", QUERY.to_vec(), 10.0, old).await.expect("add b");
    let c = store.add("C", QUERY.to_vec(), 1.0, now).await.expect("add c");
    (store, [a, b, c])
}

fn ids(records: &[reverie_rs_memory::MemoryRecord]) -> Vec<MemoryId> {
    records.iter().map(|record| record.id).collect()
}

/// Importance dominates for B; recency lifts C above A.
#[tokio::test]
async fn importance_and_recency_scenario() {
    let now = Utc::now();
    let policy = ScoringPolicy::default();

    let (store, [_a, b, c]) = abc_store(now).await;
    let selected = policy
        .select(&store, &QUERY, now, 2, &ScoreWeights::default())
        .await
        .expect("select");
    assert_eq!(ids(&selected), vec![b, c]);

    let (store, [a, b, c]) = abc_store(now).await;
    let scored = policy
        .select_scored(&store, &QUERY, now, 3, &ScoreWeights::default())
        .await
        .expect("select");
    let order: Vec<MemoryId> = scored.iter().map(|scored| scored.record.id).collect();
    assert_eq!(order, vec![b, c, a]);
    assert!((scored[0].composite - 1.75).abs() < 1e-9);
    assert!((scored[1].composite - 1.6).abs() < 1e-9);
    assert!((scored[2].composite - 0.85).abs() < 1e-9);
}

/// Only selected records get the call's access time.
#[tokio::test]
async fn select_touches_only_selected_records() {
    let now = Utc::now();
    let (store, [a, b, c]) = abc_store(now).await;
    let before_a = store.get(a).expect("get a");
    let later = now + Duration::hours(1);

    let selected = ScoringPolicy::default()
        .select(&store, &QUERY, later, 2, &ScoreWeights::default())
        .await
        .expect("select");

    for record in &selected {
        assert_eq!(record.last_accessed_at, later);
    }
    assert_eq!(store.get(b).expect("get b").last_accessed_at, later);
    assert_eq!(store.get(c).expect("get c").last_accessed_at, later);
    assert_eq!(store.get(a).expect("get a"), before_a);
}

/// Added records come back exactly as supplied.
#[tokio::test]
async fn add_then_get_round_trips() {
    let index = Arc::new(ScriptedIndex::new(0.5));
    let store = scripted_store(index.clone());
    let now = Utc::now();
    let id = store
        .add("Klaus is writing a paper", vec![0.3, -0.7], 7.5, now)
        .await
        .expect("add");
    let record = store.get(id).expect("get");
    assert_eq!(record.text, "Klaus is writing a paper");
    assert_eq!(record.embedding, vec![0.3, -0.7]);
    assert_eq!(record.importance, 7.5);
    assert_eq!(record.created_at, now);
    assert_eq!(record.last_accessed_at, record.created_at);
    assert_eq!(index.inserted(), vec![id]);
}

/// Identical state, weights and `now` give identical ordering.
#[tokio::test]
async fn ranking_is_deterministic() {
    let now = Utc::now();
    let weights = ScoreWeights {
        similarity: 0.5,
        recency: 2.0,
        importance: 1.0,
    };
    let mut orders = Vec::new();
    for _ in 0..2 {
        let index = Arc::new(ScriptedIndex::new(0.5));
        let store = scripted_store(index.clone());
        for (offset, importance) in [(10, 3.0), (0, 3.0), (40, 9.0), (5, 1.0), (0, 3.0)] {
            let id = store
                .add("obs", QUERY.to_vec(), importance, now - Duration::hours(offset))
                .await
                .expect("add");
            index.set_similarity(id, 0.1 * (id.0 as f32));
        }
        let selected = ScoringPolicy::default()
            .select(&store, &QUERY, now, 4, &weights)
            .await
            .expect("select");
        orders.push(ids(&selected));
    }
    assert_eq!(orders[0], orders[1]);
}

/// Raising one record's importance never lowers its rank.
#[tokio::test]
async fn higher_importance_never_lowers_rank() {
    let now = Utc::now();
    let mut positions = Vec::new();
    for target_importance in [2.0, 6.0, 10.0] {
        let index = Arc::new(ScriptedIndex::new(0.4));
        let store = scripted_store(index.clone());
        let mut target = None;
        for (n, importance) in [5.0, target_importance, 4.0, 8.0].into_iter().enumerate() {
            let created_at = now - Duration::hours(n as i64 * 30);
            let id = store
                .add(format!("obs {n}"), QUERY.to_vec(), importance, created_at)
                .await
                .expect("add");
            if n == 1 {
                target = Some(id);
            }
        }
        let target = target.expect("target");
        let selected = ScoringPolicy::default()
            .select(&store, &QUERY, now, 4, &ScoreWeights::default())
            .await
            .expect("select");
        let position = selected
            .iter()
            .position(|record| record.id == target)
            .expect("target ranked");
        positions.push(position);
    }
    assert!(positions.windows(2).all(|pair| pair[1] <= pair[0]));
}

/// A more recently accessed record outranks an otherwise identical one.
#[tokio::test]
async fn recency_prefers_recent_access() {
    let start = Utc::now() - Duration::hours(100);
    let store = scripted_store(Arc::new(ScriptedIndex::new(0.5)));
    let stale = store.add("same", QUERY.to_vec(), 5.0, start).await.expect("add");
    let fresh = store.add("same", QUERY.to_vec(), 5.0, start).await.expect("add");
    store
        .touch(fresh, start + Duration::hours(50))
        .expect("touch");

    let weights = ScoreWeights {
        similarity: 0.0,
        recency: 1.0,
        importance: 0.0,
    };
    let selected = ScoringPolicy::default()
        .select(&store, &QUERY, start + Duration::hours(100), 2, &weights)
        .await
        .expect("select");
    assert_eq!(ids(&selected), vec![fresh, stale]);
}

/// Selecting from an empty store is reported distinctly.
#[tokio::test]
async fn empty_store_select_fails() {
    let store = scripted_store(Arc::new(ScriptedIndex::new(0.5)));
    let err = ScoringPolicy::default()
        .select(&store, &QUERY, Utc::now(), 5, &ScoreWeights::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmptyStore));
}

/// Wrong embedding length is rejected on add and on select.
#[tokio::test]
async fn wrong_dimensions_are_invalid_input() {
    let index = Arc::new(ScriptedIndex::new(0.5));
    let store = scripted_store(index.clone());
    let now = Utc::now();
    let err = store
        .add("bad", vec![1.0, 2.0, 3.0], 5.0, now)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::InvalidInput(_)));
    assert!(store.is_empty());
    assert!(index.inserted().is_empty());

    store.add("good", QUERY.to_vec(), 5.0, now).await.expect("add");
    let err = ScoringPolicy::default()
        .select(&store, &[1.0], now, 1, &ScoreWeights::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::InvalidInput(_)));
}

/// `k == 0` is invalid even when the store is empty.
#[tokio::test]
async fn zero_k_is_invalid_input() {
    let store = scripted_store(Arc::new(ScriptedIndex::new(0.5)));
    let err = ScoringPolicy::default()
        .select(&store, &QUERY, Utc::now(), 0, &ScoreWeights::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::InvalidInput(_)));
}

/// Unknown ids are reported by `get` and `touch`.
#[tokio::test]
async fn missing_records_are_not_found() {
    let store = scripted_store(Arc::new(ScriptedIndex::new(0.5)));
    assert!(matches!(
        store.get(MemoryId(42)),
        Err(MemoryError::NotFound(MemoryId(42)))
    ));
    assert!(matches!(
        store.touch(MemoryId(42), Utc::now()),
        Err(MemoryError::NotFound(MemoryId(42)))
    ));
}

/// Duplicate index hits are scored and touched once.
#[tokio::test]
async fn duplicate_candidates_are_collapsed() {
    let scripted = Arc::new(ScriptedIndex::new(0.5));
    let index: Arc<dyn SimilarityIndex> = Arc::new(DuplicatingIndex::new(scripted, 3));
    let store = MemoryRecordStore::new(config(), index).expect("store");
    let now = Utc::now();
    let first = store.add("first", QUERY.to_vec(), 2.0, now).await.expect("add");
    let second = store.add("second", QUERY.to_vec(), 3.0, now).await.expect("add");

    let selected = ScoringPolicy::default()
        .select(&store, &QUERY, now, 5, &ScoreWeights::default())
        .await
        .expect("select");
    assert_eq!(ids(&selected), vec![second, first]);
}

/// Overfetching bounds the candidate pool by `k * factor`.
#[tokio::test]
async fn overfetch_limits_candidate_pool() {
    let index = Arc::new(ScriptedIndex::new(0.0));
    let store = scripted_store(index.clone());
    let now = Utc::now();
    let mut added = Vec::new();
    for n in 0..6 {
        let importance = if n == 5 { 10.0 } else { 1.0 };
        let id = store
            .add(format!("obs {n}"), QUERY.to_vec(), importance, now)
            .await
            .expect("add");
        added.push(id);
    }
    // Only the two most similar are fetched; the important last one is not.
    index.set_similarity(added[0], 0.9);
    index.set_similarity(added[1], 0.8);
    let policy = ScoringPolicy::new(0.0, 2).expect("policy");
    let weights = ScoreWeights {
        similarity: 1.0,
        recency: 0.0,
        importance: 2.0,
    };
    let selected = policy
        .select(&store, &QUERY, now, 1, &weights)
        .await
        .expect("select");
    assert_eq!(ids(&selected), vec![added[0]]);
}

/// Index failures surface as upstream failures and store nothing.
#[tokio::test]
async fn index_failures_propagate() {
    let store = MemoryRecordStore::new(config(), Arc::new(FailingIndex::failing_inserts()))
        .expect("store");
    let err = store
        .add("lost", QUERY.to_vec(), 2.0, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::UpstreamFailure(_)));
    assert!(store.is_empty());

    let store = MemoryRecordStore::new(config(), Arc::new(FailingIndex::failing_queries()))
        .expect("store");
    let now = Utc::now();
    let id = store.add("kept", QUERY.to_vec(), 2.0, now).await.expect("add");
    let err = ScoringPolicy::default()
        .select(&store, &QUERY, now + Duration::hours(1), 1, &ScoreWeights::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::UpstreamFailure(_)));
    assert_eq!(store.get(id).expect("get").last_accessed_at, now);
}

/// Out-of-range similarities from the index are clamped.
#[tokio::test]
async fn candidate_similarity_is_clamped() {
    let index = Arc::new(ScriptedIndex::new(0.5));
    let store = scripted_store(index.clone());
    let now = Utc::now();
    let id = store.add("loud", QUERY.to_vec(), 1.0, now).await.expect("add");
    index.set_similarity(id, 3.5);
    let candidates = store.all_candidates(&QUERY, 4).await.expect("candidates");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].1, 1.0);
}
