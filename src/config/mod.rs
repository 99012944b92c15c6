use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::EngineError;
use crate::models::InteractionAction;

/// Engine configuration. Every tunable has a default; `from_env` overrides
/// from the environment so deployments can retune without a rebuild.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub weights: WeightsConfig,
    pub preferences: PreferenceConfig,
    pub trending: TrendingConfig,
    pub blend: BlendConfig,
    pub feed: FeedConfig,
}

/// Per-action profile increments. Negative weights let disliked content
/// genuinely suppress future affinity.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    pub like: f64,
    pub play: f64,
    pub skip: f64,
    pub complete: f64,
    pub share: f64,
    pub save: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            like: 1.0,
            play: 0.8,
            skip: -0.5,
            complete: 1.5,
            share: 2.0,
            save: 1.2,
        }
    }
}

impl WeightsConfig {
    /// Unknown actions carry zero weight: recorded in history, no score
    /// movement.
    pub fn weight_for(&self, action: InteractionAction) -> f64 {
        match action {
            InteractionAction::Like => self.like,
            InteractionAction::Play => self.play,
            InteractionAction::Skip => self.skip,
            InteractionAction::Complete => self.complete,
            InteractionAction::Share => self.share,
            InteractionAction::Save => self.save,
            InteractionAction::Unknown => 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceConfig {
    /// Attribute scores never drop below this floor.
    pub score_floor: f64,
    /// Profiles keep at most this many attributes; the weakest signals
    /// (smallest magnitude) are trimmed first.
    pub max_attributes: usize,
    /// Per-user cap on the retained interaction log.
    pub max_events_per_user: usize,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            score_floor: -5.0,
            max_attributes: 64,
            max_events_per_user: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendingConfig {
    /// Record lifetime: expires_at = computed_at + ttl_hours.
    pub ttl_hours: f64,
    /// Half-life of the engagement decay curve.
    pub half_life_hours: f64,
    pub view_weight: f64,
    pub like_weight: f64,
    pub share_weight: f64,
    pub comment_weight: f64,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24.0,
            half_life_hours: 12.0,
            view_weight: 1.0,
            like_weight: 4.0,
            share_weight: 6.0,
            comment_weight: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlendConfig {
    /// Mix of trending vs personalized signal; forced to 1.0 on cold start.
    pub alpha: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self { alpha: 0.6 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Cap on candidates fetched per content type.
    pub max_candidates: usize,
    /// Recency window for history-based de-duplication.
    pub history_window_hours: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_candidates: 100,
            history_window_hours: 24,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            weights: WeightsConfig {
                like: parse_var("WEIGHT_LIKE", 1.0)?,
                play: parse_var("WEIGHT_PLAY", 0.8)?,
                skip: parse_var("WEIGHT_SKIP", -0.5)?,
                complete: parse_var("WEIGHT_COMPLETE", 1.5)?,
                share: parse_var("WEIGHT_SHARE", 2.0)?,
                save: parse_var("WEIGHT_SAVE", 1.2)?,
            },
            preferences: PreferenceConfig {
                score_floor: parse_var("PREFERENCE_SCORE_FLOOR", -5.0)?,
                max_attributes: parse_var("PREFERENCE_MAX_ATTRIBUTES", 64)?,
                max_events_per_user: parse_var("PREFERENCE_MAX_EVENTS_PER_USER", 100)?,
            },
            trending: TrendingConfig {
                ttl_hours: parse_var("TRENDING_TTL_HOURS", 24.0)?,
                half_life_hours: parse_var("TRENDING_HALF_LIFE_HOURS", 12.0)?,
                view_weight: parse_var("TRENDING_VIEW_WEIGHT", 1.0)?,
                like_weight: parse_var("TRENDING_LIKE_WEIGHT", 4.0)?,
                share_weight: parse_var("TRENDING_SHARE_WEIGHT", 6.0)?,
                comment_weight: parse_var("TRENDING_COMMENT_WEIGHT", 5.0)?,
            },
            blend: BlendConfig {
                alpha: parse_var("BLEND_ALPHA", 0.6)?,
            },
            feed: FeedConfig {
                max_candidates: parse_var("FEED_MAX_CANDIDATES", 100)?,
                history_window_hours: parse_var("FEED_HISTORY_WINDOW_HOURS", 24)?,
            },
        })
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, EngineError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EngineError::Config(format!("{} must be a valid value, got {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}
