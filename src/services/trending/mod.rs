use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

use crate::config::TrendingConfig;
use crate::error::{EngineError, Result};
use crate::models::{ContentType, EngagementCounters, TrendingRecord};

/// Trending Score Tracker
///
/// Keeps monotonic engagement counters per content item and derives a
/// decaying, TTL-bound score from them. Counters are never decayed, so a
/// recompute is always reproducible from raw counters plus elapsed time.
///
/// Records carry `expires_at = computed_at + ttl`; an expired record is
/// recomputed on read before it is ever served. Updates stripe per
/// content_id on the map shard, and a reader racing a lazy refresh sees
/// either the pre- or post-refresh record, never a torn one.
pub struct TrendingTracker {
    config: TrendingConfig,
    entries: DashMap<String, TrendingEntry>,
}

struct TrendingEntry {
    content_type: ContentType,
    counters: EngagementCounters,
    last_engaged_at: DateTime<Utc>,
    record: TrendingRecord,
}

impl TrendingTracker {
    pub fn new(config: TrendingConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Accumulate engagement deltas and refresh the record.
    pub fn record_engagement(
        &self,
        content_id: &str,
        content_type: ContentType,
        delta: &EngagementCounters,
    ) -> Result<()> {
        if content_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "engagement update is missing content_id".to_string(),
            ));
        }
        self.record_engagement_at(content_id, content_type, delta, Utc::now());
        Ok(())
    }

    fn record_engagement_at(
        &self,
        content_id: &str,
        content_type: ContentType,
        delta: &EngagementCounters,
        now: DateTime<Utc>,
    ) {
        let mut entry = self
            .entries
            .entry(content_id.to_string())
            .or_insert_with(|| TrendingEntry {
                content_type,
                counters: EngagementCounters::default(),
                last_engaged_at: now,
                record: Self::empty_record(content_id, content_type, now, self.ttl()),
            });

        entry.counters.accumulate(delta);
        if !delta.is_zero() {
            entry.last_engaged_at = now;
        }
        let refreshed = self.compute_record(
            content_id,
            entry.content_type,
            &entry.counters,
            entry.last_engaged_at,
            now,
        );
        entry.record = refreshed;

        debug!(
            content_id = content_id,
            content_type = content_type.as_str(),
            score = entry.record.score,
            views = entry.counters.views,
            likes = entry.counters.likes,
            "Trending record refreshed on write"
        );
    }

    /// Current trending score; 0.0 when the item has no record.
    pub fn trending_score(&self, content_id: &str) -> f64 {
        self.trending_score_at(content_id, Utc::now())
    }

    fn trending_score_at(&self, content_id: &str, now: DateTime<Utc>) -> f64 {
        self.live_record_at(content_id, now)
            .map(|r| r.score)
            .unwrap_or(0.0)
    }

    /// Live record for an item, lazily recomputed when expired. `None` when
    /// the item has never seen engagement.
    pub fn live_record(&self, content_id: &str) -> Option<TrendingRecord> {
        self.live_record_at(content_id, Utc::now())
    }

    fn live_record_at(&self, content_id: &str, now: DateTime<Utc>) -> Option<TrendingRecord> {
        let mut entry = self.entries.get_mut(content_id)?;

        if entry.record.expires_at <= now {
            let refreshed = self.compute_record(
                content_id,
                entry.content_type,
                &entry.counters,
                entry.last_engaged_at,
                now,
            );
            entry.record = refreshed;
            debug!(
                content_id = content_id,
                score = entry.record.score,
                "Stale trending record recomputed on read"
            );
        }

        Some(entry.record.clone())
    }

    /// Top live items of one content type, score descending; ties break by
    /// content_id ascending for stable listings.
    pub fn top_trending(&self, content_type: ContentType, limit: usize) -> Vec<(String, f64)> {
        self.top_trending_at(content_type, limit, Utc::now())
    }

    fn top_trending_at(
        &self,
        content_type: ContentType,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<(String, f64)> {
        // Collect ids first so refresh never mutates under the iterator.
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.content_type == content_type)
            .map(|e| e.key().clone())
            .collect();

        let mut scored: Vec<(String, f64)> = ids
            .into_iter()
            .filter_map(|id| {
                let score = self.trending_score_at(&id, now);
                (score > 0.0).then_some((id, score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);
        scored
    }

    fn ttl(&self) -> Duration {
        Duration::seconds((self.config.ttl_hours * 3600.0) as i64)
    }

    fn compute_record(
        &self,
        content_id: &str,
        content_type: ContentType,
        counters: &EngagementCounters,
        last_engaged_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TrendingRecord {
        let raw = self.config.view_weight * counters.views as f64
            + self.config.like_weight * counters.likes as f64
            + self.config.share_weight * counters.shares as f64
            + self.config.comment_weight * counters.comments as f64;

        let idle_hours = (now - last_engaged_at).num_seconds() as f64 / 3600.0;
        let decay = crate::utils::exponential_decay(idle_hours, self.config.half_life_hours);

        // log1p keeps runaway view counts from swamping the other signals
        let score = (1.0 + raw).ln() * decay;

        let mut factors = HashMap::new();
        factors.insert("raw_engagement".to_string(), raw);
        factors.insert("decay".to_string(), decay);

        TrendingRecord {
            content_id: content_id.to_string(),
            content_type,
            score,
            factors,
            computed_at: now,
            expires_at: now + self.ttl(),
        }
    }

    fn empty_record(
        content_id: &str,
        content_type: ContentType,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> TrendingRecord {
        TrendingRecord {
            content_id: content_id.to_string(),
            content_type,
            score: 0.0,
            factors: HashMap::new(),
            computed_at: now,
            expires_at: now + ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> TrendingTracker {
        TrendingTracker::new(TrendingConfig::default())
    }

    fn likes(n: u64) -> EngagementCounters {
        EngagementCounters {
            likes: n,
            ..EngagementCounters::default()
        }
    }

    #[test]
    fn test_missing_record_scores_zero() {
        assert_eq!(tracker().trending_score("nothing"), 0.0);
    }

    #[test]
    fn test_score_non_decreasing_without_elapsed_time() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("c1", ContentType::Music, &likes(1), now);
        let first = tracker.trending_score_at("c1", now);

        tracker.record_engagement_at("c1", ContentType::Music, &likes(5), now);
        let second = tracker.trending_score_at("c1", now);

        assert!(second >= first);
        assert!(first > 0.0);
    }

    #[test]
    fn test_ttl_invariant() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("c1", ContentType::Music, &likes(3), now);
        let record = tracker.live_record_at("c1", now).unwrap();

        assert_eq!(record.expires_at, record.computed_at + Duration::hours(24));
    }

    #[test]
    fn test_expired_record_recomputed_on_read() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("c1", ContentType::Music, &likes(10), now);
        let fresh = tracker.live_record_at("c1", now).unwrap();

        // Straddle expiry: counters stopped growing, so the recompute must
        // both re-stamp the record and decay the score toward zero.
        let later = now + Duration::hours(25);
        let refreshed = tracker.live_record_at("c1", later).unwrap();

        assert!(refreshed.computed_at > fresh.computed_at);
        assert_eq!(refreshed.expires_at, refreshed.computed_at + Duration::hours(24));
        assert!(refreshed.score < fresh.score);
    }

    #[test]
    fn test_idle_content_decays_toward_zero() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("c1", ContentType::Music, &likes(100), now);
        let fresh = tracker.trending_score_at("c1", now);

        let half_life_later = tracker.trending_score_at("c1", now + Duration::hours(36));
        assert!(half_life_later < fresh * 0.2);
        assert!(half_life_later > 0.0);
    }

    #[test]
    fn test_counters_survive_decay() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("c1", ContentType::Music, &likes(10), now);
        let decayed = tracker.trending_score_at("c1", now + Duration::hours(30));

        // New engagement resets the decay reference and the score recovers
        // above the decayed value, computed from the full counter history.
        tracker.record_engagement_at("c1", ContentType::Music, &likes(1), now + Duration::hours(30));
        let recovered = tracker.trending_score_at("c1", now + Duration::hours(30));

        assert!(recovered > decayed);
        let record = tracker.live_record_at("c1", now + Duration::hours(30)).unwrap();
        assert_eq!(record.factors["raw_engagement"], 44.0);
    }

    #[test]
    fn test_factors_exposed() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at(
            "c1",
            ContentType::Movie,
            &EngagementCounters {
                views: 10,
                likes: 2,
                shares: 1,
                comments: 1,
            },
            now,
        );

        let record = tracker.live_record_at("c1", now).unwrap();
        // 1*10 + 4*2 + 6*1 + 5*1
        assert_eq!(record.factors["raw_engagement"], 29.0);
        assert!((record.factors["decay"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_trending_sorted_and_typed() {
        let tracker = tracker();
        let now = Utc::now();

        tracker.record_engagement_at("a", ContentType::Music, &likes(10), now);
        tracker.record_engagement_at("b", ContentType::Music, &likes(5), now);
        tracker.record_engagement_at("c", ContentType::Music, &likes(8), now);
        tracker.record_engagement_at("movie", ContentType::Movie, &likes(50), now);

        let top = tracker.top_trending_at(ContentType::Music, 2, now);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "a");
        assert_eq!(top[1].0, "c");
    }

    #[test]
    fn test_rejects_missing_content_id() {
        let result = tracker().record_engagement("", ContentType::Music, &likes(1));
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }
}
