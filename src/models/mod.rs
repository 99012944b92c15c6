use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// Content categories the engine ranks. `ALL` is the fixed order in which
/// category blocks are concatenated into a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Music,
    Movie,
    Product,
    Post,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Music,
        ContentType::Movie,
        ContentType::Product,
        ContentType::Post,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Music => "music",
            ContentType::Movie => "movie",
            ContentType::Product => "product",
            ContentType::Post => "post",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User actions on content. Actions the engine does not know about
/// deserialize to `Unknown` and carry zero weight, so upstream services can
/// introduce new action types without breaking ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Like,
    Play,
    Skip,
    Complete,
    Share,
    Save,
    #[serde(other)]
    Unknown,
}

impl InteractionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::Like => "like",
            InteractionAction::Play => "play",
            InteractionAction::Skip => "skip",
            InteractionAction::Complete => "complete",
            InteractionAction::Share => "share",
            InteractionAction::Save => "save",
            InteractionAction::Unknown => "unknown",
        }
    }
}

/// A single user action on a content item, immutable once recorded.
///
/// `attributes` carries the content facets visible on the event
/// (e.g. "genre" -> "pop"); the accumulator folds them into composite
/// `name:value` keys so different values of the same facet stay distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: String,
    pub content_id: String,
    pub content_type: ContentType,
    pub action: InteractionAction,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Reject events missing required identifiers before any state changes.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "interaction event is missing user_id".to_string(),
            ));
        }
        if self.content_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "interaction event is missing content_id".to_string(),
            ));
        }
        Ok(())
    }
}

/// Composite attribute key: "genre" + "pop" -> "genre:pop".
///
/// Content catalogs must supply `ContentAttributeVector` keys in the same
/// form for affinity intersection to line up.
pub fn attribute_key(name: &str, value: &str) -> String {
    format!("{}:{}", name, value)
}

/// Per-(user, content_type) accumulated preference state.
///
/// Owned exclusively by the preference accumulator; an absent profile reads
/// back as an empty one (the cold-start signal), never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    pub user_id: String,
    pub content_type: ContentType,
    pub scores: HashMap<String, f64>,
    pub interaction_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl UserPreferenceProfile {
    pub fn empty(user_id: &str, content_type: ContentType) -> Self {
        Self {
            user_id: user_id.to_string(),
            content_type,
            scores: HashMap::new(),
            interaction_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Cold start: no accumulated preference signal for this content type.
    pub fn is_cold(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Attribute weights describing a content item, supplied by the external
/// catalog. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentAttributeVector {
    pub content_id: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub attributes: HashMap<String, f64>,
}

impl ContentAttributeVector {
    pub fn validate(&self) -> Result<()> {
        if self.content_id.is_empty() {
            return Err(EngineError::InvalidInput(
                "content attribute vector is missing content_id".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw engagement counters for one content item. Monotonic: deltas are
/// unsigned and only ever added.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub views: u64,
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
}

impl EngagementCounters {
    pub fn accumulate(&mut self, delta: &EngagementCounters) {
        self.views += delta.views;
        self.likes += delta.likes;
        self.shares += delta.shares;
        self.comments += delta.comments;
    }

    pub fn is_zero(&self) -> bool {
        self.views == 0 && self.likes == 0 && self.shares == 0 && self.comments == 0
    }
}

/// Derived, TTL-bound popularity score for one content item.
///
/// Exactly one live record exists per item; `expires_at` is always
/// `computed_at + ttl`, and an expired record is recomputed before it is
/// ever served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingRecord {
    pub content_id: String,
    pub content_type: ContentType,
    pub score: f64,
    pub factors: HashMap<String, f64>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One entry of a built feed. Produced fresh per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub content_id: String,
    pub content_type: ContentType,
    pub final_score: f64,
    pub rank: usize,
}

/// A catalog failure for one content type. The other categories of the
/// request still complete; a partial feed beats a total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedFailure {
    pub content_type: ContentType,
    pub reason: String,
}

/// Per-request assembly accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedStats {
    pub candidate_count: usize,
    pub history_filtered: usize,
    pub duplicate_filtered: usize,
    pub returned_count: usize,
}

/// The ordered, quota-bounded, deduplicated result of one feed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<RankedItem>,
    pub failures: Vec<FeedFailure>,
    pub stats: FeedStats,
}
