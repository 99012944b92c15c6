use chrono::Duration;
use futures::future;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::{EngineError, Result};
use crate::models::{ContentType, FeedFailure, FeedPage, RankedItem};

use super::blending::{BlendCandidate, RankingBlender, ScoredCandidate};
use super::catalog::{ContentCatalog, RecentHistory};
use super::preferences::PreferenceAccumulator;
use super::similarity;
use super::trending::TrendingTracker;

/// Feed Assembler
///
/// Orchestrates one feed request: per requested content type it fetches a
/// bounded candidate set, drops recently-seen items, scores the rest
/// through the blender, and truncates to the requested quota. Category
/// pipelines run concurrently; the result concatenates category blocks in
/// the fixed `ContentType::ALL` order, so identical inputs always produce
/// identical output.
///
/// Assembly is read-only against the preference and trending stores. A
/// catalog failure costs only that category's contribution; an all-empty
/// catalog yields an empty feed, not an error.
pub struct FeedAssembler {
    catalog: Arc<dyn ContentCatalog>,
    history: Arc<dyn RecentHistory>,
    preferences: Arc<PreferenceAccumulator>,
    trending: Arc<TrendingTracker>,
    blender: RankingBlender,
    config: FeedConfig,
}

struct CategoryOutcome {
    content_type: ContentType,
    quota: usize,
    ranked: Vec<ScoredCandidate>,
    candidate_count: usize,
    history_filtered: usize,
    error: Option<anyhow::Error>,
}

impl FeedAssembler {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        history: Arc<dyn RecentHistory>,
        preferences: Arc<PreferenceAccumulator>,
        trending: Arc<TrendingTracker>,
        blender: RankingBlender,
        config: FeedConfig,
    ) -> Self {
        Self {
            catalog,
            history,
            preferences,
            trending,
            blender,
            config,
        }
    }

    pub async fn build_feed(
        &self,
        user_id: &str,
        mix: &[(ContentType, usize)],
    ) -> Result<FeedPage> {
        if user_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "feed request is missing user_id".to_string(),
            ));
        }

        // Fold duplicate mix entries and pin the fixed category order
        let mut quotas: HashMap<ContentType, usize> = HashMap::new();
        for (content_type, count) in mix {
            *quotas.entry(*content_type).or_insert(0) += *count;
        }
        let requested: Vec<(ContentType, usize)> = ContentType::ALL
            .iter()
            .filter_map(|ct| {
                quotas
                    .get(ct)
                    .copied()
                    .filter(|count| *count > 0)
                    .map(|count| (*ct, count))
            })
            .collect();

        if requested.is_empty() {
            return Ok(FeedPage::default());
        }

        let window = Duration::hours(self.config.history_window_hours);
        let recent = match self.history.recent_content_ids(user_id, window).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "Recent history unavailable, feed may repeat items"
                );
                HashSet::new()
            }
        };

        let outcomes = future::join_all(
            requested
                .iter()
                .map(|(ct, quota)| self.rank_category(user_id, *ct, *quota, &recent)),
        )
        .await;

        let mut page = FeedPage::default();
        let mut seen: HashSet<String> = HashSet::new();

        for outcome in outcomes {
            page.stats.candidate_count += outcome.candidate_count;
            page.stats.history_filtered += outcome.history_filtered;

            if let Some(source) = outcome.error {
                let err = EngineError::Catalog {
                    content_type: outcome.content_type,
                    source,
                };
                page.failures.push(FeedFailure {
                    content_type: outcome.content_type,
                    reason: err.to_string(),
                });
                continue;
            }

            let mut taken = 0;
            for candidate in outcome.ranked {
                if taken >= outcome.quota {
                    break;
                }
                if !seen.insert(candidate.content_id.clone()) {
                    page.stats.duplicate_filtered += 1;
                    continue;
                }
                page.items.push(RankedItem {
                    content_id: candidate.content_id,
                    content_type: outcome.content_type,
                    final_score: candidate.final_score,
                    rank: 0,
                });
                taken += 1;
            }
        }

        for (index, item) in page.items.iter_mut().enumerate() {
            item.rank = index + 1;
        }
        page.stats.returned_count = page.items.len();

        info!(
            user_id = %user_id,
            returned = page.stats.returned_count,
            candidates = page.stats.candidate_count,
            history_filtered = page.stats.history_filtered,
            failures = page.failures.len(),
            "Feed assembled"
        );

        Ok(page)
    }

    async fn rank_category(
        &self,
        user_id: &str,
        content_type: ContentType,
        quota: usize,
        recent: &HashSet<String>,
    ) -> CategoryOutcome {
        let mut outcome = CategoryOutcome {
            content_type,
            quota,
            ranked: Vec::new(),
            candidate_count: 0,
            history_filtered: 0,
            error: None,
        };

        let mut candidates = match self
            .catalog
            .fetch_candidates(content_type, self.config.max_candidates)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    content_type = content_type.as_str(),
                    error = %e,
                    "Candidate fetch failed, category dropped from feed"
                );
                outcome.error = Some(e);
                return outcome;
            }
        };

        if candidates.len() > self.config.max_candidates {
            warn!(
                content_type = content_type.as_str(),
                returned = candidates.len(),
                cap = self.config.max_candidates,
                "Catalog exceeded candidate cap, truncating"
            );
            candidates.truncate(self.config.max_candidates);
        }
        outcome.candidate_count = candidates.len();

        let profile = self.preferences.profile(user_id, content_type);
        let cold_start = profile.is_cold();

        let mut blend_inputs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.validate().is_err() {
                warn!(
                    content_type = content_type.as_str(),
                    "Catalog candidate missing content_id, skipped"
                );
                continue;
            }
            if recent.contains(&candidate.content_id) {
                outcome.history_filtered += 1;
                continue;
            }

            let record = self.trending.live_record(&candidate.content_id);
            blend_inputs.push(BlendCandidate {
                affinity: similarity::affinity(&profile, &candidate),
                trending_score: record.as_ref().map(|r| r.score).unwrap_or(0.0),
                trending_computed_at: record.map(|r| r.computed_at),
                content_id: candidate.content_id,
                content_type,
            });
        }

        debug!(
            user_id = %user_id,
            content_type = content_type.as_str(),
            cold_start = cold_start,
            scored = blend_inputs.len(),
            "Category candidates scored"
        );

        outcome.ranked = self.blender.blend(cold_start, blend_inputs);
        outcome
    }
}
