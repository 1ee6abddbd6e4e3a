//! Ranked-retrieval execution over posting lists.
//!
//! A query grabs the current posting-list version for each of its terms,
//! merges them by document, hands each candidate's accumulated contributions
//! to the ranker, and keeps a bounded heap of the best K. The merge strategy
//! follows term cardinality: hash accumulation (term-at-a-time) for short
//! queries, a cursor heap (document-at-a-time) for wide ones. Queries never
//! touch the writer lock.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::index::posting::{PostingIter, PostingList};
use crate::index::EventIndex;
use crate::ranking::Ranker;
use crate::types::{DocId, Feature, ScoredDoc, TermId};

/// Queries at or below this many matched terms accumulate term-at-a-time.
const TAAT_MAX_TERMS: usize = 4;

/// Executes ranked queries against one event index.
#[derive(Debug)]
pub struct QueryExecutor {
    index: Arc<EventIndex>,
    ranker: Ranker,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(index: Arc<EventIndex>, ranker: Ranker) -> Self {
        Self { index, ranker }
    }

    /// Run a query and return at most `limit` results, score descending with
    /// ascending-DocId tie-break.
    #[must_use]
    pub fn execute(&self, features: &[Feature], limit: usize) -> Vec<ScoredDoc> {
        if limit == 0 || features.is_empty() {
            return Vec::new();
        }

        // Immutable list versions: safe to traverse while writers publish.
        let lists: Vec<(Arc<PostingList>, Feature)> = features
            .iter()
            .filter_map(|feature| {
                self.index
                    .store()
                    .lookup(feature.term_id)
                    .filter(|list| !list.is_empty())
                    .map(|list| (list, *feature))
            })
            .collect();

        if lists.is_empty() {
            return Vec::new();
        }

        let candidates = if lists.len() <= TAAT_MAX_TERMS {
            accumulate_taat(&lists)
        } else {
            accumulate_daat(&lists)
        };
        debug!(
            terms = lists.len(),
            candidates = candidates.len(),
            "query merge complete"
        );

        top_k(candidates, &self.ranker, limit)
    }
}

/// Term-at-a-time: fold each list into a doc-keyed accumulator.
fn accumulate_taat(
    lists: &[(Arc<PostingList>, Feature)],
) -> Vec<(DocId, Vec<(TermId, f32)>)> {
    let mut acc: HashMap<DocId, Vec<(TermId, f32)>> = HashMap::new();
    for (list, feature) in lists {
        for posting in list.iter() {
            acc.entry(posting.doc_id)
                .or_default()
                .push((feature.term_id, feature.weight * posting.weight));
        }
    }
    acc.into_iter().collect()
}

/// Document-at-a-time: advance a heap of list cursors in lockstep, emitting
/// one candidate per distinct document.
fn accumulate_daat(
    lists: &[(Arc<PostingList>, Feature)],
) -> Vec<(DocId, Vec<(TermId, f32)>)> {
    let mut cursors: Vec<PostingIter<'_>> = lists.iter().map(|(list, _)| list.iter()).collect();

    // Min-heap of (current doc, cursor index).
    let mut heap: BinaryHeap<std::cmp::Reverse<(DocId, usize)>> = cursors
        .iter()
        .enumerate()
        .filter_map(|(i, cursor)| cursor.peek().map(|p| std::cmp::Reverse((p.doc_id, i))))
        .collect();

    let mut candidates = Vec::new();
    while let Some(&std::cmp::Reverse((doc_id, _))) = heap.peek() {
        let mut contributions = Vec::new();
        while let Some(&std::cmp::Reverse((next_doc, i))) = heap.peek() {
            if next_doc != doc_id {
                break;
            }
            heap.pop();
            let posting = cursors[i].next().expect("cursor behind heap entry");
            let feature = lists[i].1;
            contributions.push((feature.term_id, feature.weight * posting.weight));
            if let Some(peeked) = cursors[i].peek() {
                heap.push(std::cmp::Reverse((peeked.doc_id, i)));
            }
        }
        candidates.push((doc_id, contributions));
    }
    candidates
}

/// Candidate ordering for the bounded heap: the heap's greatest element is
/// the worst kept result (lowest score, then highest doc id).
#[derive(Debug, PartialEq)]
struct Candidate {
    doc_id: DocId,
    score: f32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

fn top_k(
    candidates: Vec<(DocId, Vec<(TermId, f32)>)>,
    ranker: &Ranker,
    limit: usize,
) -> Vec<ScoredDoc> {
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(limit + 1);
    for (doc_id, contributions) in candidates {
        let candidate = Candidate {
            doc_id,
            score: ranker.score(&contributions),
        };
        if heap.len() < limit {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate.cmp(worst) == Ordering::Less {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    let mut results: Vec<Candidate> = heap.into_vec();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results
        .into_iter()
        .map(|c| ScoredDoc {
            doc_id: c.doc_id,
            score: c.score,
        })
        .collect()
}
