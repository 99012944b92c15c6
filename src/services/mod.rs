pub mod blending;
pub mod catalog;
pub mod events;
pub mod feed;
pub mod preferences;
pub mod similarity;
pub mod trending;

pub use blending::RankingBlender;
pub use catalog::{ContentCatalog, RecentHistory};
pub use events::InteractionLog;
pub use feed::FeedAssembler;
pub use preferences::PreferenceAccumulator;
pub use trending::TrendingTracker;
