use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;

use crate::models::{ContentAttributeVector, ContentType};

#[cfg(test)]
use mockall::automock;

/// Content catalog collaborator. The catalog fetch is the one place a feed
/// request may stall; callers apply their own timeout or cancellation
/// around `build_feed`, and dropping the request future abandons in-flight
/// scoring without corrupting engine state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Candidate vectors for one content type, at most `limit` of them.
    async fn fetch_candidates(
        &self,
        content_type: ContentType,
        limit: usize,
    ) -> Result<Vec<ContentAttributeVector>>;
}

/// Recent-history collaborator backing feed de-duplication.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecentHistory: Send + Sync {
    /// Content ids the user saw within `window`, to be excluded from the
    /// feed.
    async fn recent_content_ids(&self, user_id: &str, window: Duration) -> Result<HashSet<String>>;
}
