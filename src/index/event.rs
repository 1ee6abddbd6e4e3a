//! Event index: the posting store and the expiration table bound under a
//! single writer-side mutex.
//!
//! Writers stage edits into the changeset and refresh deadlines; nothing is
//! reader-visible until [`EventIndex::apply`] publishes the accumulated
//! changeset and the expirations it sweeps in one pass. Readers go straight
//! to the store and never take the writer lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::index::changeset::{Changeset, Edit};
use crate::index::expire::ExpireTable;
use crate::index::posting::{Posting, PostingList};
use crate::index::store::PostingStore;
use crate::snapshot::{ExpireRecord, IndexSnapshot};
use crate::types::{DocId, EventTuple, ExpireTime, TermId, TermWeight};

/// When a term's staged edits are few relative to its list, apply them
/// incrementally (sharing untouched chunks); otherwise rebuild the list.
const REBUILD_FACTOR: usize = 8;

#[derive(Debug, Default)]
struct WriterState {
    changeset: Changeset,
    expire: ExpireTable,
}

/// The concurrent inverted index over expiring postings.
#[derive(Debug)]
pub struct EventIndex {
    store: PostingStore,
    writer: Mutex<WriterState>,
    max_size: usize,
}

impl EventIndex {
    /// Create an empty index presized for `initial_buckets` terms, capping
    /// the expiration table at `max_size` tracked pairs.
    #[must_use]
    pub fn new(initial_buckets: usize, max_size: usize) -> Self {
        Self {
            store: PostingStore::with_capacity(initial_buckets),
            writer: Mutex::new(WriterState::default()),
            max_size,
        }
    }

    /// Reader-side access to the posting store.
    #[must_use]
    pub fn store(&self) -> &PostingStore {
        &self.store
    }

    /// Stage one upsert and refresh its deadline. Returns the number of
    /// staged edits (1).
    pub fn update(
        &self,
        doc_id: DocId,
        term_id: TermId,
        weight: TermWeight,
        expire_time: ExpireTime,
    ) -> usize {
        let mut w = self.lock_writer();
        w.expire.update((term_id, doc_id), expire_time);
        w.changeset.push_upsert(term_id, doc_id, weight);
        1
    }

    /// Stage every tuple of a batch under one lock acquisition. Returns the
    /// number of staged edits.
    pub fn batch_update(&self, batch: &[EventTuple]) -> usize {
        let mut w = self.lock_writer();
        for tuple in batch {
            w.expire
                .update((tuple.term_id, tuple.doc_id), tuple.expire_time);
            w.changeset
                .push_upsert(tuple.term_id, tuple.doc_id, tuple.weight);
        }
        batch.len()
    }

    /// Stage an explicit posting removal. The deadline entry, if any, is left
    /// to pop later as a no-op.
    pub fn remove(&self, doc_id: DocId, term_id: TermId) {
        self.lock_writer().changeset.push_delete(term_id, doc_id);
    }

    /// Publish all staged edits and sweep expirations, atomically with
    /// respect to readers. Returns `(edits_applied, pairs_expired)`.
    ///
    /// Expiration deletes are ordered ahead of the staged changeset, so an
    /// upsert staged in the same window re-inserts the posting it would
    /// otherwise lose.
    pub fn apply(&self, now: ExpireTime) -> (usize, usize) {
        let mut w = self.lock_writer();
        let expired = w.expire.expire_with_limit(now, self.max_size);
        let staged = w.changeset.drain();

        let mut per_term: HashMap<TermId, Vec<TermOp>> = HashMap::new();
        for ((term_id, doc_id), _) in &expired {
            per_term.entry(*term_id).or_default().push(TermOp {
                doc_id: *doc_id,
                weight: None,
            });
        }
        for edit in &staged {
            let op = match *edit {
                Edit::Upsert {
                    doc_id, weight, ..
                } => TermOp {
                    doc_id,
                    weight: Some(weight),
                },
                Edit::Delete { doc_id, .. } => TermOp {
                    doc_id,
                    weight: None,
                },
            };
            per_term.entry(edit.term_id()).or_default().push(op);
        }

        for (term_id, ops) in per_term {
            if let [op] = ops.as_slice() {
                match op.weight {
                    Some(weight) => self.store.upsert(term_id, op.doc_id, weight),
                    None => self.store.remove(term_id, op.doc_id),
                }
                continue;
            }
            let current = self.store.lookup(term_id);
            let next = match current.as_deref() {
                Some(cur) if ops.len() * REBUILD_FACTOR < cur.len() => {
                    apply_incremental(cur, &ops)
                }
                cur => rebuild(cur, &ops),
            };
            self.store.publish(term_id, Arc::new(next));
        }

        (staged.len(), expired.len())
    }

    /// Prune empty posting lists. Held under the writer lock so no apply can
    /// interleave with the pass.
    pub fn compact(&self) -> usize {
        let _w = self.lock_writer();
        self.store.compact()
    }

    /// Tracked deadline pairs, under the writer lock.
    #[must_use]
    pub fn expire_table_size(&self) -> usize {
        self.lock_writer().expire.size()
    }

    /// Copy the published postings and the deadline table in deterministic
    /// order. Holds the writer lock for the duration, quiescing writers;
    /// staged-but-unapplied edits are not part of the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> IndexSnapshot {
        let w = self.lock_writer();

        let mut postings: Vec<(TermId, Vec<Posting>)> = Vec::new();
        self.store
            .iterate_terms(|term_id, list| postings.push((term_id, list.iter().collect())));
        postings.sort_by_key(|(term_id, _)| *term_id);

        let mut expire = Vec::with_capacity(w.expire.size());
        w.expire.for_each(|(term_id, doc_id), expire_time| {
            expire.push(ExpireRecord {
                term_id,
                doc_id,
                expire_time,
            });
        });
        expire.sort();

        IndexSnapshot { postings, expire }
    }

    /// Populate an empty index from a decoded snapshot.
    pub fn load_snapshot(&self, snapshot: IndexSnapshot) {
        let mut w = self.lock_writer();
        for (term_id, entries) in snapshot.postings {
            self.store
                .publish(term_id, Arc::new(PostingList::from_sorted(entries)));
        }
        for rec in snapshot.expire {
            w.expire.update((rec.term_id, rec.doc_id), rec.expire_time);
        }
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, WriterState> {
        // A poisoned writer lock means a writer panicked mid-stage; the
        // invariants are gone and continuing would publish torn state.
        self.writer.lock().expect("writer lock poisoned")
    }
}

/// One per-term operation in apply order: `Some(weight)` upserts, `None`
/// deletes.
struct TermOp {
    doc_id: DocId,
    weight: Option<TermWeight>,
}

fn apply_incremental(current: &PostingList, ops: &[TermOp]) -> PostingList {
    let mut next: Option<PostingList> = None;
    for op in ops {
        let base = next.as_ref().unwrap_or(current);
        next = Some(match op.weight {
            Some(weight) => base.with_upsert(op.doc_id, weight),
            None => base.with_remove(op.doc_id),
        });
    }
    next.unwrap_or_default()
}

fn rebuild(current: Option<&PostingList>, ops: &[TermOp]) -> PostingList {
    let mut entries: BTreeMap<DocId, TermWeight> = match current {
        Some(list) => list.iter().map(|p| (p.doc_id, p.weight)).collect(),
        None => BTreeMap::new(),
    };
    for op in ops {
        match op.weight {
            Some(weight) => {
                entries.insert(op.doc_id, weight);
            }
            None => {
                entries.remove(&op.doc_id);
            }
        }
    }
    PostingList::from_sorted(
        entries
            .into_iter()
            .map(|(doc_id, weight)| Posting { doc_id, weight })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_docs(index: &EventIndex, term_id: TermId) -> Vec<(DocId, TermWeight)> {
        index
            .store()
            .lookup(term_id)
            .map(|list| list.iter().map(|p| (p.doc_id, p.weight)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_update_invisible_until_apply() {
        let index = EventIndex::new(16, 1024);
        index.update(100, 10, 0.5, 1000);
        assert!(index.store().lookup(10).is_none());

        let (applied, expired) = index.apply(0);
        assert_eq!((applied, expired), (1, 0));
        assert_eq!(lookup_docs(&index, 10), vec![(100, 0.5)]);
    }

    #[test]
    fn test_reupsert_replaces_weight() {
        let index = EventIndex::new(16, 1024);
        index.update(100, 10, 0.5, 1000);
        index.apply(0);
        index.update(100, 10, 0.9, 1000);
        index.apply(0);
        assert_eq!(lookup_docs(&index, 10), vec![(100, 0.9)]);
    }

    #[test]
    fn test_expiration_evicts_posting() {
        let index = EventIndex::new(16, 1024);
        index.update(100, 10, 0.5, 60);
        index.apply(0);
        assert_eq!(lookup_docs(&index, 10).len(), 1);
        assert_eq!(index.expire_table_size(), 1);

        let (applied, expired) = index.apply(61);
        assert_eq!((applied, expired), (0, 1));
        assert!(lookup_docs(&index, 10).is_empty());
        assert_eq!(index.expire_table_size(), 0);
    }

    #[test]
    fn test_deadline_refresh_keeps_posting() {
        let index = EventIndex::new(16, 1024);
        index.update(100, 10, 0.5, 60);
        index.apply(0);

        // Refresh past the old deadline before it strikes.
        index.update(100, 10, 0.7, 200);
        let (applied, expired) = index.apply(100);
        assert_eq!((applied, expired), (1, 0));
        assert_eq!(lookup_docs(&index, 10), vec![(100, 0.7)]);
    }

    #[test]
    fn test_reinsert_wins_over_popped_expiration() {
        let index = EventIndex::new(16, 1024);
        index.update(100, 10, 0.5, 60);
        index.apply(0);

        // The staged upsert's own deadline is already past at apply time:
        // the pair is popped, but the staged upsert follows the delete and
        // the posting survives.
        index.update(100, 10, 0.9, 50);
        let (applied, expired) = index.apply(100);
        assert_eq!((applied, expired), (1, 1));
        assert_eq!(lookup_docs(&index, 10), vec![(100, 0.9)]);
    }

    #[test]
    fn test_batch_update_counts_and_orders() {
        let index = EventIndex::new(16, 1024);
        let batch = vec![
            EventTuple {
                doc_id: 1,
                term_id: 10,
                weight: 1.0,
                expire_time: 100,
            },
            EventTuple {
                doc_id: 1,
                term_id: 10,
                weight: 2.0,
                expire_time: 100,
            },
            EventTuple {
                doc_id: 2,
                term_id: 10,
                weight: 3.0,
                expire_time: 100,
            },
        ];
        assert_eq!(index.batch_update(&batch), 3);
        index.apply(0);
        // Later tuple in the batch wins for the same key.
        assert_eq!(lookup_docs(&index, 10), vec![(1, 2.0), (2, 3.0)]);
    }

    #[test]
    fn test_capacity_shedding_in_apply() {
        let index = EventIndex::new(16, 3);
        for (doc_id, exp) in [(1, 100), (2, 200), (3, 300)] {
            index.update(doc_id, 1, 1.0, exp);
        }
        index.apply(50);
        assert_eq!(index.expire_table_size(), 3);

        // A fourth pair pushes the table over capacity; the lowest-deadline
        // pair is shed even though its deadline has not struck.
        index.update(4, 1, 1.0, 400);
        let (applied, expired) = index.apply(50);
        assert_eq!((applied, expired), (1, 1));
        assert_eq!(index.expire_table_size(), 3);
        assert_eq!(lookup_docs(&index, 1), vec![(2, 1.0), (3, 1.0), (4, 1.0)]);
    }

    #[test]
    fn test_shed_pair_reinserted_by_same_window_upsert() {
        let index = EventIndex::new(16, 3);
        for (doc_id, exp) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
            index.update(doc_id, 1, 1.0, exp);
        }
        // All four upserts share the window with the capacity pop of (1, 1),
        // so doc 1's upsert follows its delete and the posting survives; only
        // the deadline entry is gone.
        let (applied, expired) = index.apply(50);
        assert_eq!((applied, expired), (4, 1));
        assert_eq!(index.expire_table_size(), 3);
        assert_eq!(
            lookup_docs(&index, 1),
            vec![(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0)]
        );
    }

    #[test]
    fn test_remove_stages_delete() {
        let index = EventIndex::new(16, 1024);
        index.update(1, 10, 1.0, 1000);
        index.apply(0);
        index.remove(1, 10);
        let (applied, _) = index.apply(0);
        assert_eq!(applied, 1);
        assert!(lookup_docs(&index, 10).is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let index = EventIndex::new(16, 1024);
        index.remove(99, 10);
        index.apply(0);
        assert!(lookup_docs(&index, 10).is_empty());
    }

    #[test]
    fn test_compact_prunes_emptied_terms() {
        let index = EventIndex::new(16, 1024);
        index.update(1, 10, 1.0, 60);
        index.update(2, 11, 1.0, 1000);
        index.apply(0);
        index.apply(61);

        assert_eq!(index.store().term_count(), 2);
        assert_eq!(index.compact(), 1);
        assert_eq!(index.store().term_count(), 1);
        assert!(index.store().lookup(11).is_some());
    }

    #[test]
    fn test_incremental_path_on_large_list() {
        let index = EventIndex::new(16, 1_000_000);
        let batch: Vec<EventTuple> = (0..1000)
            .map(|doc_id| EventTuple {
                doc_id,
                term_id: 5,
                weight: 1.0,
                expire_time: 10_000,
            })
            .collect();
        index.batch_update(&batch);
        index.apply(0);

        // A single edit against the 1000-entry list takes the incremental
        // path and must preserve order and the other entries.
        index.update(500, 5, 9.0, 10_000);
        index.apply(0);
        let docs = lookup_docs(&index, 5);
        assert_eq!(docs.len(), 1000);
        assert_eq!(docs[500], (500, 9.0));
        assert!(docs.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_snapshot_roundtrip_through_load() {
        let index = EventIndex::new(16, 1024);
        index.update(1, 10, 0.5, 100);
        index.update(2, 10, 1.5, 200);
        index.update(3, 20, 2.5, 300);
        index.apply(0);

        let snap = index.snapshot();
        assert_eq!(snap.postings.len(), 2);
        assert_eq!(snap.expire.len(), 3);

        let restored = EventIndex::new(16, 1024);
        restored.load_snapshot(snap);
        assert_eq!(lookup_docs(&restored, 10), vec![(1, 0.5), (2, 1.5)]);
        assert_eq!(lookup_docs(&restored, 20), vec![(3, 2.5)]);
        assert_eq!(restored.expire_table_size(), 3);

        // Restored deadlines still drive eviction.
        restored.apply(250);
        assert_eq!(lookup_docs(&restored, 10), vec![]);
        assert_eq!(lookup_docs(&restored, 20), vec![(3, 2.5)]);
    }

    #[test]
    fn test_snapshot_excludes_staged_edits() {
        let index = EventIndex::new(16, 1024);
        index.update(1, 10, 1.0, 100);
        index.apply(0);
        index.update(2, 10, 2.0, 100);

        let snap = index.snapshot();
        assert_eq!(snap.postings, vec![(10, vec![Posting { doc_id: 1, weight: 1.0 }])]);
        // The staged pair's deadline is tracked even though its posting is
        // not published yet.
        assert_eq!(snap.expire.len(), 2);
    }
}
