use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ContentAttributeVector, ContentType, EngagementCounters, FeedPage, InteractionEvent,
    TrendingRecord, UserPreferenceProfile,
};
use crate::services::blending::RankingBlender;
use crate::services::catalog::{ContentCatalog, RecentHistory};
use crate::services::events::InteractionLog;
use crate::services::feed::FeedAssembler;
use crate::services::preferences::PreferenceAccumulator;
use crate::services::similarity;
use crate::services::trending::TrendingTracker;

/// Recommendation Engine
///
/// The composition root: owns the interaction log, the preference
/// accumulator and the trending tracker, and wires them to the injected
/// catalog and history collaborators. Construct one per process (or per
/// test) and share it behind an `Arc`; there is no hidden global instance.
pub struct RecommendationEngine {
    log: Arc<InteractionLog>,
    preferences: Arc<PreferenceAccumulator>,
    trending: Arc<TrendingTracker>,
    assembler: FeedAssembler,
}

impl RecommendationEngine {
    pub fn new(
        config: Config,
        catalog: Arc<dyn ContentCatalog>,
        history: Arc<dyn RecentHistory>,
    ) -> Self {
        let log = Arc::new(InteractionLog::new(config.preferences.max_events_per_user));
        let preferences = Arc::new(PreferenceAccumulator::new(
            config.weights.clone(),
            config.preferences.clone(),
        ));
        let trending = Arc::new(TrendingTracker::new(config.trending.clone()));
        let assembler = FeedAssembler::new(
            catalog,
            history,
            preferences.clone(),
            trending.clone(),
            RankingBlender::new(&config.blend),
            config.feed.clone(),
        );

        Self {
            log,
            preferences,
            trending,
            assembler,
        }
    }

    /// Ingest one interaction event: validate, log, fold into the user's
    /// preference profile. Replays are tolerated (they double-count) but
    /// never leave partial state.
    pub fn record_interaction(&self, event: InteractionEvent) -> Result<()> {
        event.validate()?;

        debug!(
            user_id = %event.user_id,
            content_id = %event.content_id,
            action = event.action.as_str(),
            "Recording interaction"
        );

        self.preferences.apply(&event);
        self.log.append(event);
        Ok(())
    }

    /// Accumulate engagement counter deltas for a content item.
    pub fn record_engagement(
        &self,
        content_id: &str,
        content_type: ContentType,
        delta: &EngagementCounters,
    ) -> Result<()> {
        self.trending.record_engagement(content_id, content_type, delta)
    }

    /// Preference profile for (user, content_type); empty on cold start,
    /// never an error.
    pub fn profile(&self, user_id: &str, content_type: ContentType) -> UserPreferenceProfile {
        self.preferences.profile(user_id, content_type)
    }

    /// Strongest profile attributes for a user, score descending.
    pub fn top_attributes(
        &self,
        user_id: &str,
        content_type: ContentType,
        limit: usize,
    ) -> Vec<(String, f64)> {
        self.preferences.top_attributes(user_id, content_type, limit)
    }

    /// Current trending score for an item; 0.0 without a live record.
    pub fn trending_score(&self, content_id: &str) -> f64 {
        self.trending.trending_score(content_id)
    }

    /// Live trending record, lazily refreshed when expired.
    pub fn trending_record(&self, content_id: &str) -> Option<TrendingRecord> {
        self.trending.live_record(content_id)
    }

    /// Top trending items of one content type, for trending listings.
    pub fn top_trending(&self, content_type: ContentType, limit: usize) -> Vec<(String, f64)> {
        self.trending.top_trending(content_type, limit)
    }

    /// Personalization affinity between a user's profile and a content
    /// vector.
    pub fn affinity(&self, user_id: &str, content: &ContentAttributeVector) -> f64 {
        let profile = self.preferences.profile(user_id, content.content_type);
        similarity::affinity(&profile, content)
    }

    /// Build one ranked, deduplicated, quota-bounded feed.
    pub async fn build_feed(
        &self,
        user_id: &str,
        mix: &[(ContentType, usize)],
    ) -> Result<FeedPage> {
        self.assembler.build_feed(user_id, mix).await
    }

    /// Retained interactions for a user recorded at or after `since`.
    pub fn recent_interactions(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Vec<InteractionEvent> {
        self.log.recent_for_user(user_id, since)
    }
}
