//! Immutable posting-list versions.
//!
//! A posting list is never mutated in place: every edit produces a new list
//! value that the store publishes with an atomic entry swap, so readers keep
//! traversing the version they grabbed. Lists at or below [`INLINE_MAX`]
//! entries are a single sorted vector; larger lists are split into
//! `Arc`-shared chunks so an edit copies one chunk plus the chunk table
//! instead of the whole list.

use std::sync::Arc;

use crate::types::{DocId, TermWeight};

/// Lists at or below this length stay a single sorted vector.
pub const INLINE_MAX: usize = 64;

/// A chunk that grows past this length is split in half.
pub const CHUNK_SPLIT: usize = 512;

/// A single posting: a document and its term weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: TermWeight,
}

/// A block of postings, sorted ascending by `doc_id`. Never empty. Built and
/// owned by [`PostingList`]; shared between list versions via `Arc`.
#[derive(Debug)]
pub struct Chunk {
    entries: Vec<Posting>,
}

impl Chunk {
    fn min_doc(&self) -> DocId {
        self.entries[0].doc_id
    }

    fn max_doc(&self) -> DocId {
        self.entries[self.entries.len() - 1].doc_id
    }
}

/// All postings for one term, sorted ascending by `doc_id` with unique ids.
#[derive(Debug)]
pub enum PostingList {
    /// Small list: one sorted vector.
    Inline(Vec<Posting>),
    /// Large list: ordered, disjoint, `Arc`-shared chunks.
    Chunked(Vec<Arc<Chunk>>),
}

impl Default for PostingList {
    fn default() -> Self {
        PostingList::Inline(Vec::new())
    }
}

impl PostingList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from postings already sorted ascending by unique `doc_id`.
    #[must_use]
    pub fn from_sorted(entries: Vec<Posting>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
        if entries.len() <= INLINE_MAX {
            PostingList::Inline(entries)
        } else {
            let chunks = entries
                .chunks(CHUNK_SPLIT / 2)
                .map(|c| Arc::new(Chunk {
                    entries: c.to_vec(),
                }))
                .collect();
            PostingList::Chunked(chunks)
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PostingList::Inline(entries) => entries.len(),
            PostingList::Chunked(chunks) => chunks.iter().map(|c| c.entries.len()).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            PostingList::Inline(entries) => entries.is_empty(),
            PostingList::Chunked(chunks) => chunks.is_empty(),
        }
    }

    /// Look up the weight for a document, if present.
    #[must_use]
    pub fn get(&self, doc_id: DocId) -> Option<TermWeight> {
        match self {
            PostingList::Inline(entries) => entries
                .binary_search_by_key(&doc_id, |p| p.doc_id)
                .ok()
                .map(|i| entries[i].weight),
            PostingList::Chunked(chunks) => {
                let ci = chunks.partition_point(|c| c.max_doc() < doc_id);
                let chunk = chunks.get(ci)?;
                chunk
                    .entries
                    .binary_search_by_key(&doc_id, |p| p.doc_id)
                    .ok()
                    .map(|i| chunk.entries[i].weight)
            }
        }
    }

    /// Iterate postings in ascending `doc_id` order.
    #[must_use]
    pub fn iter(&self) -> PostingIter<'_> {
        PostingIter {
            list: self,
            chunk: 0,
            entry: 0,
        }
    }

    /// New list version with `(doc_id, weight)` inserted or replaced.
    #[must_use]
    pub fn with_upsert(&self, doc_id: DocId, weight: TermWeight) -> PostingList {
        match self {
            PostingList::Inline(entries) => {
                let mut entries = entries.clone();
                match entries.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    Ok(i) => entries[i].weight = weight,
                    Err(i) => entries.insert(i, Posting { doc_id, weight }),
                }
                if entries.len() > INLINE_MAX {
                    PostingList::from_sorted(entries)
                } else {
                    PostingList::Inline(entries)
                }
            }
            PostingList::Chunked(chunks) => {
                // Target the first chunk whose max covers the doc; past-the-end
                // inserts go into the last chunk.
                let ci = chunks
                    .partition_point(|c| c.max_doc() < doc_id)
                    .min(chunks.len() - 1);
                let mut entries = chunks[ci].entries.clone();
                match entries.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    Ok(i) => entries[i].weight = weight,
                    Err(i) => entries.insert(i, Posting { doc_id, weight }),
                }

                let mut new_chunks = Vec::with_capacity(chunks.len() + 1);
                new_chunks.extend(chunks[..ci].iter().cloned());
                if entries.len() > CHUNK_SPLIT {
                    let tail = entries.split_off(entries.len() / 2);
                    new_chunks.push(Arc::new(Chunk { entries }));
                    new_chunks.push(Arc::new(Chunk { entries: tail }));
                } else {
                    new_chunks.push(Arc::new(Chunk { entries }));
                }
                new_chunks.extend(chunks[ci + 1..].iter().cloned());
                debug_assert!(new_chunks
                    .windows(2)
                    .all(|w| w[0].max_doc() < w[1].min_doc()));
                PostingList::Chunked(new_chunks)
            }
        }
    }

    /// New list version with `doc_id` removed; clones `self` when absent.
    #[must_use]
    pub fn with_remove(&self, doc_id: DocId) -> PostingList {
        match self {
            PostingList::Inline(entries) => {
                let mut entries = entries.clone();
                if let Ok(i) = entries.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    entries.remove(i);
                }
                PostingList::Inline(entries)
            }
            PostingList::Chunked(chunks) => {
                let ci = chunks.partition_point(|c| c.max_doc() < doc_id);
                let Some(chunk) = chunks.get(ci) else {
                    return self.share();
                };
                let Ok(i) = chunk.entries.binary_search_by_key(&doc_id, |p| p.doc_id) else {
                    return self.share();
                };
                let mut entries = chunk.entries.clone();
                entries.remove(i);

                let mut new_chunks = Vec::with_capacity(chunks.len());
                new_chunks.extend(chunks[..ci].iter().cloned());
                if !entries.is_empty() {
                    new_chunks.push(Arc::new(Chunk { entries }));
                }
                new_chunks.extend(chunks[ci + 1..].iter().cloned());
                if new_chunks.is_empty() {
                    PostingList::Inline(Vec::new())
                } else {
                    PostingList::Chunked(new_chunks)
                }
            }
        }
    }

    /// Cheap structural copy that shares chunks with `self`.
    fn share(&self) -> PostingList {
        match self {
            PostingList::Inline(entries) => PostingList::Inline(entries.clone()),
            PostingList::Chunked(chunks) => PostingList::Chunked(chunks.clone()),
        }
    }
}

/// Cursor over a posting list, yielding postings in ascending doc order.
#[derive(Debug)]
pub struct PostingIter<'a> {
    list: &'a PostingList,
    chunk: usize,
    entry: usize,
}

impl PostingIter<'_> {
    /// The posting the cursor currently points at, without advancing.
    #[must_use]
    pub fn peek(&self) -> Option<Posting> {
        match self.list {
            PostingList::Inline(entries) => entries.get(self.entry).copied(),
            PostingList::Chunked(chunks) => chunks
                .get(self.chunk)
                .and_then(|c| c.entries.get(self.entry))
                .copied(),
        }
    }
}

impl Iterator for PostingIter<'_> {
    type Item = Posting;

    fn next(&mut self) -> Option<Posting> {
        let next = self.peek()?;
        self.entry += 1;
        if let PostingList::Chunked(chunks) = self.list {
            if self.entry >= chunks[self.chunk].entries.len() {
                self.chunk += 1;
                self.entry = 0;
            }
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(list: &PostingList) -> Vec<(DocId, TermWeight)> {
        list.iter().map(|p| (p.doc_id, p.weight)).collect()
    }

    fn build(ids: impl IntoIterator<Item = DocId>) -> PostingList {
        let mut list = PostingList::new();
        for id in ids {
            list = list.with_upsert(id, id as f32);
        }
        list
    }

    #[test]
    fn test_upsert_inserts_sorted() {
        let list = build([30, 10, 20]);
        assert_eq!(collect(&list), vec![(10, 10.0), (20, 20.0), (30, 30.0)]);
    }

    #[test]
    fn test_upsert_replaces_weight() {
        let list = PostingList::new().with_upsert(100, 0.5).with_upsert(100, 0.9);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(100), Some(0.9));
    }

    #[test]
    fn test_remove_deletes_entry() {
        let list = build([1, 2, 3]).with_remove(2);
        assert_eq!(collect(&list), vec![(1, 1.0), (3, 3.0)]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let list = build([1, 3]);
        let after = list.with_remove(2);
        assert_eq!(collect(&after), collect(&list));
    }

    #[test]
    fn test_promotes_to_chunked_past_inline_max() {
        let list = build(0..=INLINE_MAX as u64);
        assert!(matches!(list, PostingList::Chunked(_)));
        assert_eq!(list.len(), INLINE_MAX + 1);
        let docs: Vec<DocId> = list.iter().map(|p| p.doc_id).collect();
        assert!(docs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_chunked_upsert_and_get() {
        let mut list = build(0..1000);
        list = list.with_upsert(500, 42.0);
        assert_eq!(list.get(500), Some(42.0));
        assert_eq!(list.get(999), Some(999.0));
        assert_eq!(list.get(1000), None);
        assert_eq!(list.len(), 1000);
    }

    #[test]
    fn test_chunked_insert_past_end() {
        let list = build(0..200).with_upsert(5000, 1.0);
        assert_eq!(list.get(5000), Some(1.0));
        let docs: Vec<DocId> = list.iter().map(|p| p.doc_id).collect();
        assert!(docs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_chunk_split_keeps_order() {
        // Dense inserts into one region force chunk splits.
        let mut list = PostingList::from_sorted(
            (0..600).map(|i| Posting {
                doc_id: i * 10,
                weight: 1.0,
            })
            .collect(),
        );
        for i in 0..600 {
            list = list.with_upsert(i * 10 + 5, 2.0);
        }
        assert_eq!(list.len(), 1200);
        let docs: Vec<DocId> = list.iter().map(|p| p.doc_id).collect();
        assert!(docs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_chunked_remove_drains_to_empty() {
        let mut list = build(0..100);
        for i in 0..100 {
            list = list.with_remove(i);
        }
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn test_old_version_survives_edits() {
        let v1 = build(0..300);
        let v2 = v1.with_upsert(150, 99.0);
        // The version a reader holds is unaffected by later edits.
        assert_eq!(v1.get(150), Some(150.0));
        assert_eq!(v2.get(150), Some(99.0));
    }

    #[test]
    fn test_from_sorted_roundtrip() {
        let entries: Vec<Posting> = (0..500)
            .map(|i| Posting {
                doc_id: i,
                weight: i as f32 * 0.5,
            })
            .collect();
        let list = PostingList::from_sorted(entries.clone());
        assert_eq!(list.len(), 500);
        assert_eq!(list.iter().collect::<Vec<_>>(), entries);
    }

    #[test]
    fn test_iter_peek_matches_next() {
        let list = build([1, 2, 3]);
        let mut it = list.iter();
        assert_eq!(it.peek().map(|p| p.doc_id), Some(1));
        assert_eq!(it.next().map(|p| p.doc_id), Some(1));
        assert_eq!(it.peek().map(|p| p.doc_id), Some(2));
    }
}
