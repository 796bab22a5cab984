use serde::Deserialize;

use super::AnimeId;

pub type UserId = u64;

/// A cleaned `(user, anime, rating)` triple from the ratings log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingEvent {
    pub user_id: UserId,
    pub anime_id: AnimeId,
    pub rating: f64,
}

/// Raw ratings row; ids may arrive as floats (`"123.0"`) and ratings as
/// sentinels such as `"?"`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RatingRecord {
    pub user_id: Option<String>,
    pub anime_id: Option<String>,
    pub rating: Option<String>,
}

impl RatingRecord {
    /// Converts the row into a [`RatingEvent`], or `None` if any field is
    /// missing or not numeric
    pub fn parse(&self) -> Option<RatingEvent> {
        let user_id = parse_id(self.user_id.as_deref()?)?;
        let anime_id = AnimeId::try_from(parse_id(self.anime_id.as_deref()?)?).ok()?;
        let rating: f64 = self.rating.as_deref()?.trim().parse().ok()?;
        if !rating.is_finite() {
            return None;
        }
        Some(RatingEvent {
            user_id,
            anime_id,
            rating,
        })
    }
}

/// Parses a non-negative integer id written either as `42` or `42.0`
pub fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id);
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
