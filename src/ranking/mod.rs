//! Ranking models.
//!
//! A ranker is an opaque scorer over a candidate's accumulated per-feature
//! contributions (`query weight x posting weight` per matched term). Two
//! tagged variants cover the built-in models; the query executor treats
//! both through [`Ranker::score`].

use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::error::{MayflyError, Result};
use crate::types::{feature_space_of, TermId};

/// Scorer mapping accumulated per-feature contributions to a scalar.
#[derive(Debug, Clone)]
pub enum Ranker {
    /// Plain dot product: the sum of contributions.
    Direct,
    /// Dot product with a per-feature-space multiplier.
    FeatureMapping(FeatureMapping),
}

/// Per-feature-space multipliers; spaces without an entry weigh 1.0.
#[derive(Debug, Clone, Default)]
pub struct FeatureMapping {
    space_weights: HashMap<u32, f32>,
}

impl FeatureMapping {
    #[must_use]
    pub fn new(space_weights: impl IntoIterator<Item = (u32, f32)>) -> Self {
        Self {
            space_weights: space_weights.into_iter().collect(),
        }
    }

    fn weight_for(&self, space: u32) -> f32 {
        self.space_weights.get(&space).copied().unwrap_or(1.0)
    }
}

impl Ranker {
    /// Build the configured model.
    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        match config.model.as_str() {
            "direct" => Ok(Ranker::Direct),
            "feature_mapping" => Ok(Ranker::FeatureMapping(FeatureMapping::new(
                config.space_weights.iter().map(|sw| (sw.space, sw.weight)),
            ))),
            other => Err(MayflyError::Config(format!(
                "unknown ranking model: {other}"
            ))),
        }
    }

    /// Score one candidate from its accumulated contributions.
    #[must_use]
    pub fn score(&self, contributions: &[(TermId, f32)]) -> f32 {
        match self {
            Ranker::Direct => contributions.iter().map(|(_, c)| c).sum(),
            Ranker::FeatureMapping(mapping) => contributions
                .iter()
                .map(|(term_id, c)| mapping.weight_for(feature_space_of(*term_id)) * c)
                .sum(),
        }
    }
}
