use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use tracing::debug;

use crate::models::InteractionEvent;

/// Append-only, per-user log of recorded interactions.
///
/// Newest events sit at the front; each user's log is trimmed to a fixed
/// cap so the store stays bounded. The log is the replay source for the
/// preference accumulator and backs `recent_for_user` lookups.
pub struct InteractionLog {
    max_events_per_user: usize,
    entries: DashMap<String, VecDeque<InteractionEvent>>,
}

impl InteractionLog {
    pub fn new(max_events_per_user: usize) -> Self {
        Self {
            max_events_per_user,
            entries: DashMap::new(),
        }
    }

    /// Append one validated event. Striped per user: concurrent appends for
    /// different users do not contend.
    pub fn append(&self, event: InteractionEvent) {
        let user_id = event.user_id.clone();
        let mut log = self.entries.entry(user_id.clone()).or_default();
        log.push_front(event);
        log.truncate(self.max_events_per_user);

        debug!(
            user_id = %user_id,
            retained = log.len(),
            "Interaction appended to log"
        );
    }

    /// Events for one user recorded at or after `since`, newest first.
    pub fn recent_for_user(&self, user_id: &str, since: DateTime<Utc>) -> Vec<InteractionEvent> {
        self.entries
            .get(user_id)
            .map(|log| {
                log.iter()
                    .filter(|e| e.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full retained log for one user, newest first.
    pub fn events_for_user(&self, user_id: &str) -> Vec<InteractionEvent> {
        self.entries
            .get(user_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, InteractionAction};
    use chrono::Duration;
    use std::collections::HashMap;

    fn event(user_id: &str, content_id: &str, at: DateTime<Utc>) -> InteractionEvent {
        InteractionEvent {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            content_type: ContentType::Music,
            action: InteractionAction::Play,
            attributes: HashMap::new(),
            timestamp: at,
        }
    }

    #[test]
    fn test_append_newest_first() {
        let log = InteractionLog::new(10);
        let now = Utc::now();

        log.append(event("u1", "a", now - Duration::minutes(2)));
        log.append(event("u1", "b", now - Duration::minutes(1)));

        let events = log.events_for_user("u1");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].content_id, "b");
        assert_eq!(events[1].content_id, "a");
    }

    #[test]
    fn test_trims_to_cap() {
        let log = InteractionLog::new(3);
        let now = Utc::now();

        for i in 0..6 {
            log.append(event("u1", &format!("c{}", i), now));
        }

        let events = log.events_for_user("u1");
        assert_eq!(events.len(), 3);
        // The most recent appends survive
        assert_eq!(events[0].content_id, "c5");
    }

    #[test]
    fn test_recent_for_user_window() {
        let log = InteractionLog::new(10);
        let now = Utc::now();

        log.append(event("u1", "old", now - Duration::hours(48)));
        log.append(event("u1", "fresh", now - Duration::minutes(5)));

        let recent = log.recent_for_user("u1", now - Duration::hours(24));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content_id, "fresh");
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let log = InteractionLog::new(10);
        assert!(log.events_for_user("nobody").is_empty());
        assert!(log.recent_for_user("nobody", Utc::now()).is_empty());
    }
}
