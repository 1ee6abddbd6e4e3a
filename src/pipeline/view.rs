//! Thin ingestion façade: resolves deadlines and enqueues update jobs.

use std::sync::Arc;

use crate::error::{MayflyError, Result};
use crate::pipeline::{UpdateJob, UpdatePipeline};
use crate::types::{unix_now, DocumentDescriptor, EventTuple};

/// Front door for ingestion handlers.
pub struct IndexView {
    pipeline: Arc<UpdatePipeline>,
    default_ttl_secs: i64,
    max_ttl_secs: i64,
}

impl IndexView {
    #[must_use]
    pub fn new(pipeline: Arc<UpdatePipeline>, default_ttl_secs: i64, max_ttl_secs: i64) -> Self {
        Self {
            pipeline,
            default_ttl_secs,
            max_ttl_secs,
        }
    }

    /// Validate a document, resolve its absolute deadline from `now + ttl`,
    /// and enqueue one job carrying every (term, doc) tuple.
    ///
    /// Returns the number of tuples enqueued.
    pub fn feed(&self, doc: &DocumentDescriptor) -> Result<usize> {
        if doc.features.is_empty() {
            return Err(MayflyError::Validation(
                "document has no features".into(),
            ));
        }
        for feature in &doc.features {
            if !feature.weight.is_finite() || feature.weight < 0.0 {
                return Err(MayflyError::Validation(format!(
                    "non-finite or negative weight for term {}",
                    feature.term_id
                )));
            }
        }
        let ttl = match doc.ttl_seconds {
            Some(ttl) if ttl < 0 => {
                return Err(MayflyError::Validation("negative ttl".into()));
            }
            Some(ttl) => ttl.min(self.max_ttl_secs),
            None => self.default_ttl_secs,
        };

        let expire_time = unix_now() + ttl;
        let tuples: Vec<EventTuple> = doc
            .features
            .iter()
            .map(|feature| EventTuple {
                doc_id: doc.doc_id,
                term_id: feature.term_id,
                weight: feature.weight,
                expire_time,
            })
            .collect();
        let count = tuples.len();
        self.pipeline.enqueue(UpdateJob { tuples })?;
        Ok(count)
    }

    /// Jobs currently waiting in the update queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.pipeline.queue_depth()
    }
}
