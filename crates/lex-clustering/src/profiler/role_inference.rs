//! Name patterns per role and the fuzzy matcher that applies them.

use crate::types::ColumnRole;
use crate::utils::normalize_column_name;

/// Tokens at or below this length are ignored by token matching.
const MIN_TOKEN_LEN: usize = 3;

/// Candidate column names for a role, most specific first.
pub(crate) fn role_patterns(role: ColumnRole) -> &'static [&'static str] {
    match role {
        ColumnRole::Identity => &["name", "person_name", "person", "id", "user"],
        ColumnRole::Ott => &[
            "ott",
            "ott_top1",
            "ott_platform",
            "streaming_platform",
            "platform",
        ],
        ColumnRole::Genre => &[
            "movie_genre",
            "genre",
            "movie_genre_top1",
            "series_genre",
            "series_genre_top1",
            "content_genre",
            "preferred_genre",
        ],
        ColumnRole::Language => &[
            "content_lang",
            "language",
            "content_lang_top1",
            "preferred_language",
            "lang",
        ],
        ColumnRole::GamingPlatform => &[
            "gaming_platform",
            "gaming_platform_top1",
            "game_platform",
        ],
        ColumnRole::SocialPlatform => &[
            "social_platform",
            "social_platform_top1",
            "social_media_platform",
        ],
        ColumnRole::BingeFrequency => &[
            "binge_frequency",
            "binge_freq",
            "binge frequency per week",
            "content_creation_freq",
            "content_creation_frequency",
        ],
        ColumnRole::ScreenTime => &[
            "screen_time",
            "screen time",
            "screen_time_hours",
            "daily_social_media_minutes",
            "social_media_minutes",
            "Screen Time Movies/series in hours per week",
            "movies/series",
            "hours per week",
            "screen",
        ],
        ColumnRole::GamingDays => &[
            "gaming_days",
            "gaming days per week",
            "gaming_frequency",
            "gaming_days_per_week",
        ],
    }
}

/// Find the column best matching any of `patterns`.
///
/// Patterns are tried in order; for each one an exact match is preferred over
/// substring containment, which is preferred over token overlap. Within a tier
/// the first column in scan order wins.
pub(crate) fn find_matching_column<'a>(
    patterns: &[&str],
    columns: &'a [String],
) -> Option<&'a str> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();

    for pattern in patterns {
        let pattern = normalize_column_name(pattern);

        if let Some(i) = normalized.iter().position(|n| *n == pattern) {
            return Some(&columns[i]);
        }

        if let Some(i) = normalized.iter().position(|n| {
            !n.is_empty() && (n.contains(pattern.as_str()) || pattern.contains(n.as_str()))
        }) {
            return Some(&columns[i]);
        }

        let tokens: Vec<&str> = pattern
            .split('_')
            .filter(|t| t.chars().count() > MIN_TOKEN_LEN)
            .collect();
        if tokens.is_empty() {
            continue;
        }
        if let Some(i) = normalized
            .iter()
            .position(|n| tokens.iter().all(|t| n.contains(t)))
        {
            return Some(&columns[i]);
        }
    }

    None
}
