use dashmap::DashMap;
use tracing::debug;

use crate::config::{PreferenceConfig, WeightsConfig};
use crate::models::{attribute_key, ContentType, InteractionEvent, UserPreferenceProfile};

type ProfileKey = (String, ContentType);

/// Preference Accumulator
///
/// Folds interaction events into per-(user, content_type) weighted attribute
/// scores. Writes for the same user serialize on the profile entry; writes
/// for different users proceed in parallel across map shards.
///
/// Accumulation is purely additive, so replaying an event double-counts but
/// never leaves a profile half-applied.
pub struct PreferenceAccumulator {
    weights: WeightsConfig,
    config: PreferenceConfig,
    profiles: DashMap<ProfileKey, UserPreferenceProfile>,
}

impl PreferenceAccumulator {
    pub fn new(weights: WeightsConfig, config: PreferenceConfig) -> Self {
        Self {
            weights,
            config,
            profiles: DashMap::new(),
        }
    }

    /// Apply one validated event to its profile.
    ///
    /// Unknown actions carry zero weight: the interaction still counts
    /// toward history, but no attribute score moves. Attribute-less events
    /// likewise only touch the interaction counter.
    pub fn apply(&self, event: &InteractionEvent) {
        let weight = self.weights.weight_for(event.action);

        let key = (event.user_id.clone(), event.content_type);
        let mut profile = self
            .profiles
            .entry(key)
            .or_insert_with(|| UserPreferenceProfile::empty(&event.user_id, event.content_type));

        profile.interaction_count += 1;
        profile.last_updated = event.timestamp;

        if weight != 0.0 && !event.attributes.is_empty() {
            for (name, value) in &event.attributes {
                let score = profile
                    .scores
                    .entry(attribute_key(name, value))
                    .or_insert(0.0);
                *score = (*score + weight).max(self.config.score_floor);
            }

            if profile.scores.len() > self.config.max_attributes {
                Self::trim_weakest(&mut profile, self.config.max_attributes);
            }
        }

        debug!(
            user_id = %event.user_id,
            content_type = event.content_type.as_str(),
            action = event.action.as_str(),
            weight = weight,
            attribute_count = profile.scores.len(),
            "Preference profile updated"
        );
    }

    /// Profile for (user, content_type). An absent profile reads back empty,
    /// never as an error: this is the cold-start signal.
    pub fn profile(&self, user_id: &str, content_type: ContentType) -> UserPreferenceProfile {
        self.profiles
            .get(&(user_id.to_string(), content_type))
            .map(|p| p.clone())
            .unwrap_or_else(|| UserPreferenceProfile::empty(user_id, content_type))
    }

    /// Top attributes by score, descending; ties break by key for stable
    /// output.
    pub fn top_attributes(
        &self,
        user_id: &str,
        content_type: ContentType,
        limit: usize,
    ) -> Vec<(String, f64)> {
        let profile = self.profile(user_id, content_type);
        let mut entries: Vec<(String, f64)> = profile.scores.into_iter().collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries.truncate(limit);
        entries
    }

    /// Keep the strongest signals, positive or negative; a strong skip
    /// history is as informative as a strong like history.
    fn trim_weakest(profile: &mut UserPreferenceProfile, max_attributes: usize) {
        let mut by_magnitude: Vec<(String, f64)> = profile.scores.drain().collect();
        by_magnitude.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        by_magnitude.truncate(max_attributes);
        profile.scores = by_magnitude.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionAction;
    use chrono::Utc;
    use std::collections::HashMap;

    fn accumulator() -> PreferenceAccumulator {
        PreferenceAccumulator::new(WeightsConfig::default(), PreferenceConfig::default())
    }

    fn like_event(user_id: &str, attributes: &[(&str, &str)]) -> InteractionEvent {
        event(user_id, InteractionAction::Like, attributes)
    }

    fn event(
        user_id: &str,
        action: InteractionAction,
        attributes: &[(&str, &str)],
    ) -> InteractionEvent {
        InteractionEvent {
            user_id: user_id.to_string(),
            content_id: "content-1".to_string(),
            content_type: ContentType::Music,
            action,
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_weighted_accumulation() {
        let acc = accumulator();

        for _ in 0..3 {
            acc.apply(&like_event("u1", &[("genre", "pop")]));
        }

        let profile = acc.profile("u1", ContentType::Music);
        assert_eq!(profile.scores["genre:pop"], 3.0);
        assert_eq!(profile.interaction_count, 3);
    }

    #[test]
    fn test_unknown_action_moves_no_scores() {
        let acc = accumulator();

        acc.apply(&event("u1", InteractionAction::Unknown, &[("genre", "pop")]));

        let profile = acc.profile("u1", ContentType::Music);
        assert!(profile.scores.is_empty());
        // Still recorded as an interaction
        assert_eq!(profile.interaction_count, 1);
    }

    #[test]
    fn test_negative_weight_suppresses() {
        let acc = accumulator();

        acc.apply(&like_event("u1", &[("genre", "metal")]));
        acc.apply(&event("u1", InteractionAction::Skip, &[("genre", "metal")]));
        acc.apply(&event("u1", InteractionAction::Skip, &[("genre", "metal")]));

        let profile = acc.profile("u1", ContentType::Music);
        assert!((profile.scores["genre:metal"] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_floor() {
        let acc = PreferenceAccumulator::new(
            WeightsConfig::default(),
            PreferenceConfig {
                score_floor: -1.0,
                ..PreferenceConfig::default()
            },
        );

        for _ in 0..10 {
            acc.apply(&event("u1", InteractionAction::Skip, &[("genre", "ads")]));
        }

        let profile = acc.profile("u1", ContentType::Music);
        assert_eq!(profile.scores["genre:ads"], -1.0);
    }

    #[test]
    fn test_attribute_less_event_only_counts() {
        let acc = accumulator();

        acc.apply(&like_event("u1", &[]));

        let profile = acc.profile("u1", ContentType::Music);
        assert!(profile.scores.is_empty());
        assert_eq!(profile.interaction_count, 1);
    }

    #[test]
    fn test_missing_profile_is_empty_not_error() {
        let acc = accumulator();
        let profile = acc.profile("ghost", ContentType::Movie);
        assert!(profile.is_cold());
        assert_eq!(profile.interaction_count, 0);
    }

    #[test]
    fn test_profiles_split_by_content_type() {
        let acc = accumulator();

        acc.apply(&like_event("u1", &[("genre", "pop")]));

        assert!(!acc.profile("u1", ContentType::Music).is_cold());
        assert!(acc.profile("u1", ContentType::Movie).is_cold());
    }

    #[test]
    fn test_trim_keeps_strongest_magnitude() {
        let acc = PreferenceAccumulator::new(
            WeightsConfig::default(),
            PreferenceConfig {
                max_attributes: 2,
                ..PreferenceConfig::default()
            },
        );

        // share = 2.0, like = 1.0, skip = -0.5; with a cap of 2 the strong
        // positive and the repeated negative survive over the single like.
        acc.apply(&event("u1", InteractionAction::Share, &[("genre", "pop")]));
        for _ in 0..5 {
            acc.apply(&event("u1", InteractionAction::Skip, &[("genre", "metal")]));
        }
        acc.apply(&like_event("u1", &[("genre", "jazz")]));

        let profile = acc.profile("u1", ContentType::Music);
        assert_eq!(profile.scores.len(), 2);
        assert!(profile.scores.contains_key("genre:pop"));
        assert!(profile.scores.contains_key("genre:metal"));
    }

    #[test]
    fn test_top_attributes_sorted() {
        let acc = accumulator();

        acc.apply(&event("u1", InteractionAction::Share, &[("genre", "pop")]));
        acc.apply(&like_event("u1", &[("genre", "jazz")]));

        let top = acc.top_attributes("u1", ContentType::Music, 10);
        assert_eq!(top[0].0, "genre:pop");
        assert_eq!(top[1].0, "genre:jazz");
    }

    #[tokio::test]
    async fn test_concurrent_updates_for_different_users() {
        let acc = std::sync::Arc::new(accumulator());

        let mut handles = Vec::new();
        for i in 0..8 {
            let acc = acc.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user-{}", i);
                for _ in 0..50 {
                    acc.apply(&like_event(&user, &[("genre", "pop")]));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            let profile = acc.profile(&format!("user-{}", i), ContentType::Music);
            assert_eq!(profile.scores["genre:pop"], 50.0);
            assert_eq!(profile.interaction_count, 50);
        }
    }
}
