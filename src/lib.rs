pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use engine::RecommendationEngine;
pub use error::{EngineError, Result};
pub use models::{
    ContentAttributeVector, ContentType, EngagementCounters, FeedPage, InteractionAction,
    InteractionEvent, RankedItem, TrendingRecord, UserPreferenceProfile,
};
pub use services::{
    ContentCatalog, FeedAssembler, InteractionLog, PreferenceAccumulator, RankingBlender,
    RecentHistory, TrendingTracker,
};
