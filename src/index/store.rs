//! Concurrent term-to-posting-list store.
//!
//! The mapping holds one immutable [`PostingList`] version per term behind an
//! `Arc`. Readers clone the `Arc` under a brief shard lock and then traverse
//! with no further coordination; the single writer publishes a new version by
//! swapping the entry value. A superseded version is reclaimed when the last
//! reader holding it drops its reference.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::index::posting::PostingList;
use crate::types::{DocId, TermId, TermWeight};

/// The posting index: TermId → current posting-list version.
#[derive(Debug)]
pub struct PostingStore {
    terms: DashMap<TermId, Arc<PostingList>>,
    posting_count: AtomicU64,
}

impl PostingStore {
    /// Create a store presized for roughly `initial_buckets` terms.
    #[must_use]
    pub fn with_capacity(initial_buckets: usize) -> Self {
        Self {
            terms: DashMap::with_capacity(initial_buckets),
            posting_count: AtomicU64::new(0),
        }
    }

    /// Reader-safe lookup of the current list version for a term.
    #[must_use]
    pub fn lookup(&self, term_id: TermId) -> Option<Arc<PostingList>> {
        self.terms.get(&term_id).map(|entry| entry.value().clone())
    }

    /// Insert or replace one posting, publishing the new list version.
    /// Writer-only.
    pub fn upsert(&self, term_id: TermId, doc_id: DocId, weight: TermWeight) {
        let next = match self.lookup(term_id) {
            Some(cur) => cur.with_upsert(doc_id, weight),
            None => PostingList::new().with_upsert(doc_id, weight),
        };
        self.publish(term_id, Arc::new(next));
    }

    /// Remove one posting, publishing the new list version; no-op when the
    /// term is absent. Writer-only.
    pub fn remove(&self, term_id: TermId, doc_id: DocId) {
        if let Some(cur) = self.lookup(term_id) {
            self.publish(term_id, Arc::new(cur.with_remove(doc_id)));
        }
    }

    /// Publish a new list version for a term. Writer-only.
    pub fn publish(&self, term_id: TermId, list: Arc<PostingList>) {
        let new_len = list.len() as u64;
        let old_len = match self.terms.insert(term_id, list) {
            Some(old) => old.len() as u64,
            None => 0,
        };
        if new_len >= old_len {
            self.posting_count.fetch_add(new_len - old_len, Ordering::Relaxed);
        } else {
            self.posting_count.fetch_sub(old_len - new_len, Ordering::Relaxed);
        }
    }

    /// Number of distinct terms, empty lists included.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Total postings across all lists.
    #[must_use]
    pub fn posting_count(&self) -> u64 {
        self.posting_count.load(Ordering::Relaxed)
    }

    /// Visit each term with a reference to its current list version. Each
    /// entry is visited in a consistent state; the set of terms is whatever
    /// the map holds as iteration passes each shard.
    pub fn iterate_terms(&self, mut f: impl FnMut(TermId, &PostingList)) {
        for entry in self.terms.iter() {
            f(*entry.key(), entry.value());
        }
    }

    /// Prune empty posting lists. Writer-exclusive. Returns the number of
    /// terms removed.
    pub fn compact(&self) -> usize {
        let before = self.terms.len();
        self.terms.retain(|_, list| !list.is_empty());
        before - self.terms.len()
    }
}
