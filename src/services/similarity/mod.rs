use crate::models::{ContentAttributeVector, UserPreferenceProfile};

/// Similarity Scorer
///
/// Cosine similarity between a user's preference profile and a content
/// attribute vector, restricted to the attribute keys present in both.
/// Pure and deterministic; returns a value in [-1, 1].
///
/// When either restricted vector has zero magnitude the result is 0.0 by
/// definition: an empty profile means no personalization signal, not an
/// error.
pub fn affinity(profile: &UserPreferenceProfile, content: &ContentAttributeVector) -> f64 {
    let mut dot = 0.0;
    let mut profile_sq = 0.0;
    let mut content_sq = 0.0;

    for (key, profile_score) in &profile.scores {
        if let Some(content_weight) = content.attributes.get(key) {
            dot += profile_score * content_weight;
            profile_sq += profile_score * profile_score;
            content_sq += content_weight * content_weight;
        }
    }

    if profile_sq == 0.0 || content_sq == 0.0 {
        return 0.0;
    }

    dot / (profile_sq.sqrt() * content_sq.sqrt())
}
