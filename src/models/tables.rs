use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AnimeId;

/// Precomputed user-based neighbors: candidate anime -> most co-rated anime
///
/// Lists are ordered by descending co-occurrence count. Immutable once built;
/// a rebuild replaces the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoOccurrenceTable {
    pub built_at: DateTime<Utc>,
    pub neighbors: BTreeMap<AnimeId, Vec<AnimeId>>,
}

impl CoOccurrenceTable {
    pub fn new(neighbors: BTreeMap<AnimeId, Vec<AnimeId>>) -> Self {
        Self {
            built_at: Utc::now(),
            neighbors,
        }
    }

    pub fn get(&self, anime_id: AnimeId) -> Option<&[AnimeId]> {
        self.neighbors.get(&anime_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Precomputed top-scoring anime per genre tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreIndex {
    pub built_at: DateTime<Utc>,
    pub genres: BTreeMap<String, Vec<AnimeId>>,
}

impl GenreIndex {
    pub fn new(genres: BTreeMap<String, Vec<AnimeId>>) -> Self {
        Self {
            built_at: Utc::now(),
            genres,
        }
    }

    /// Looks up a genre, falling back to a case-insensitive match
    pub fn get(&self, genre: &str) -> Option<&[AnimeId]> {
        self.genres
            .get(genre)
            .or_else(|| {
                self.genres
                    .iter()
                    .find(|(g, _)| g.eq_ignore_ascii_case(genre))
                    .map(|(_, ids)| ids)
            })
            .map(Vec::as_slice)
    }
}

/// Rating statistics of one anime in a discover list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverEntry {
    pub anime_id: AnimeId,
    pub rating_count: u64,
    pub mean_rating: f64,
    /// Sample standard deviation; `None` with fewer than two ratings
    pub std_rating: Option<f64>,
}

/// Precomputed "hidden gems" and "polarizing" rankings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverLists {
    pub built_at: DateTime<Utc>,
    pub hidden_gems: Vec<DiscoverEntry>,
    pub polarizing: Vec<DiscoverEntry>,
}

impl DiscoverLists {
    pub fn empty() -> Self {
        Self {
            built_at: Utc::now(),
            hidden_gems: Vec::new(),
            polarizing: Vec::new(),
        }
    }
}
