use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::BlendConfig;
use crate::models::ContentType;
use crate::utils::normalize_score;

/// One candidate entering the blend: its batch-relative trending signal and
/// its personalization signal.
#[derive(Debug, Clone)]
pub struct BlendCandidate {
    pub content_id: String,
    pub content_type: ContentType,
    pub trending_score: f64,
    /// Stamp of the live trending record, used as the first tie-breaker.
    /// `None` when the item has never seen engagement.
    pub trending_computed_at: Option<DateTime<Utc>>,
    /// Cosine affinity in [-1, 1].
    pub affinity: f64,
}

/// A blended, ordered candidate.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub content_id: String,
    pub content_type: ContentType,
    pub final_score: f64,
    pub trending_computed_at: Option<DateTime<Utc>>,
}

/// Ranking Blender
///
/// `final = alpha * trending + (1 - alpha) * affinity`, with both inputs
/// normalized to [0, 1] first: trending min-max against the current batch,
/// affinity mapped linearly from [-1, 1]. A cold-start profile forces
/// `alpha = 1.0` so an empty profile ranks purely by trending instead of
/// dragging every candidate down with a zero-affinity penalty.
pub struct RankingBlender {
    alpha: f64,
}

impl RankingBlender {
    pub fn new(config: &BlendConfig) -> Self {
        Self {
            alpha: config.alpha.clamp(0.0, 1.0),
        }
    }

    /// Blend and order one candidate batch.
    ///
    /// Ordering is total and deterministic: final score descending, then
    /// trending `computed_at` descending (never-trended items last), then
    /// content_id ascending.
    pub fn blend(&self, cold_start: bool, candidates: Vec<BlendCandidate>) -> Vec<ScoredCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let alpha = if cold_start { 1.0 } else { self.alpha };

        let (min_trend, max_trend) = candidates.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), c| (min.min(c.trending_score), max.max(c.trending_score)),
        );

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|c| {
                let trending_norm = normalize_score(c.trending_score, min_trend, max_trend);
                let affinity_norm = (c.affinity.clamp(-1.0, 1.0) + 1.0) / 2.0;
                ScoredCandidate {
                    content_id: c.content_id,
                    content_type: c.content_type,
                    final_score: alpha * trending_norm + (1.0 - alpha) * affinity_norm,
                    trending_computed_at: c.trending_computed_at,
                }
            })
            .collect();

        // Note: NaN scores are treated as equal to any valid score
        scored.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.trending_computed_at.cmp(&a.trending_computed_at))
                .then_with(|| a.content_id.cmp(&b.content_id))
        });

        debug!(
            cold_start = cold_start,
            alpha = alpha,
            batch = scored.len(),
            top_score = scored.first().map(|c| c.final_score),
            "Candidate batch blended"
        );

        scored
    }
}
