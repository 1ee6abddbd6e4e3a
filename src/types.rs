use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Client-assigned identifier for an event document.
pub type DocId = u64;

/// Opaque term identifier. The high 32 bits name a feature space and the low
/// 32 bits a feature within it; the index itself only relies on equality and
/// hashing.
pub type TermId = u64;

/// Non-negative weight attached to a (doc, term) posting.
pub type TermWeight = f32;

/// Absolute expiration deadline in seconds since the Unix epoch.
pub type ExpireTime = i64;

/// Extract the feature-space id from a term (its high 32 bits).
#[must_use]
pub fn feature_space_of(term: TermId) -> u32 {
    (term >> 32) as u32
}

/// Compose a term id from a feature space and a within-space feature.
#[must_use]
pub fn term_in_space(space: u32, feature: u32) -> TermId {
    (u64::from(space) << 32) | u64::from(feature)
}

/// Current wall clock as seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> ExpireTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A single weighted feature attached to a document or a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Opaque term identifier.
    pub term_id: TermId,
    /// Weight for this term.
    pub weight: TermWeight,
}

/// Client-visible event document: id, optional TTL, weighted features.
///
/// The index stores no per-document blob, only the derived postings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Client-assigned document id.
    pub doc_id: DocId,
    /// Lifetime in seconds; the configured default applies when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<i64>,
    /// Weighted terms this document contributes postings for.
    pub features: Vec<Feature>,
}

/// One scored document from a query, ordered by score descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    /// Identifier of the matched document.
    pub doc_id: DocId,
    /// Final score assigned by the ranker.
    pub score: f32,
}

/// A single (doc, term, weight, deadline) update staged by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTuple {
    /// Target document.
    pub doc_id: DocId,
    /// Target term.
    pub term_id: TermId,
    /// New posting weight (replaces any prior weight).
    pub weight: TermWeight,
    /// Absolute deadline after which the posting is evicted.
    pub expire_time: ExpireTime,
}
