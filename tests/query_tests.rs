//! Ranked-retrieval tests against a populated index.

use std::sync::Arc;

use mayfly::index::EventIndex;
use mayfly::query::QueryExecutor;
use mayfly::ranking::Ranker;
use mayfly::types::{EventTuple, Feature};

fn populated(postings: &[(u64, u64, f32)]) -> Arc<EventIndex> {
    let index = Arc::new(EventIndex::new(16, 1 << 20));
    let batch: Vec<EventTuple> = postings
        .iter()
        .map(|&(term_id, doc_id, weight)| EventTuple {
            doc_id,
            term_id,
            weight,
            expire_time: i64::MAX,
        })
        .collect();
    index.batch_update(&batch);
    index.apply(0);
    index
}

fn feature(term_id: u64, weight: f32) -> Feature {
    Feature { term_id, weight }
}

#[test]
fn test_top_k_with_doc_id_tie_break() {
    let index = populated(&[
        (1, 1, 1.0),
        (1, 2, 0.5),
        (1, 3, 0.1),
        (2, 2, 0.2),
        (2, 3, 0.9),
    ]);
    let executor = QueryExecutor::new(index, Ranker::Direct);

    // Linear scores: doc1 = 1.0, doc2 = 0.7, doc3 = 1.0.
    let results = executor.execute(&[feature(1, 1.0), feature(2, 1.0)], 2);
    assert_eq!(results.len(), 2);
    // The 1.0 tie breaks toward the lower doc id.
    assert_eq!(results[0].doc_id, 1);
    assert_eq!(results[1].doc_id, 3);

    let full = executor.execute(&[feature(1, 1.0), feature(2, 1.0)], 10);
    assert_eq!(full.len(), 3);
    assert_eq!(full[2].doc_id, 2);
    assert!((full[2].score - 0.7).abs() < 1e-6);
}

#[test]
fn test_no_matches_returns_empty() {
    let index = populated(&[(1, 1, 1.0)]);
    let executor = QueryExecutor::new(index, Ranker::Direct);
    assert!(executor.execute(&[feature(5, 1.0)], 10).is_empty());
}

#[test]
fn test_exactly_k_of_n_candidates() {
    let postings: Vec<(u64, u64, f32)> = (0..100).map(|doc| (9, doc, 1.0 + doc as f32)).collect();
    let index = populated(&postings);
    let executor = QueryExecutor::new(index, Ranker::Direct);

    let results = executor.execute(&[feature(9, 1.0)], 7);
    assert_eq!(results.len(), 7);
    assert!(results
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
    assert_eq!(results[0].doc_id, 99);
}

#[test]
fn test_query_does_not_observe_staged_edits() {
    let index = populated(&[(1, 1, 1.0)]);
    let executor = QueryExecutor::new(index.clone(), Ranker::Direct);

    index.update(2, 1, 5.0, i64::MAX);
    // Staged but unapplied: the query still sees one candidate.
    assert_eq!(executor.execute(&[feature(1, 1.0)], 10).len(), 1);
    index.apply(0);
    assert_eq!(executor.execute(&[feature(1, 1.0)], 10).len(), 2);
}

#[test]
fn test_wide_query_merges_across_terms() {
    // Ten terms, overlapping doc sets, exercising the cursor-heap merge.
    let mut postings = Vec::new();
    for term in 0..10u64 {
        for doc in (term..50).step_by(3) {
            postings.push((term, doc, 1.0));
        }
    }
    let index = populated(&postings);
    let executor = QueryExecutor::new(index, Ranker::Direct);

    let query: Vec<Feature> = (0..10).map(|t| feature(t, 1.0)).collect();
    let results = executor.execute(&query, 100);

    // Every result's score counts its matching terms.
    for r in &results {
        let matches = postings.iter().filter(|&&(_, d, _)| d == r.doc_id).count();
        assert!((r.score - matches as f32).abs() < 1e-6);
    }
    assert!(results.windows(2).all(|w| {
        w[0].score > w[1].score || (w[0].score == w[1].score && w[0].doc_id < w[1].doc_id)
    }));
}
