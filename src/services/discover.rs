use chrono::Utc;
use std::collections::HashMap;

use crate::{
    models::{AnimeId, DiscoverEntry, DiscoverLists, RatingEvent},
    services::catalog::Catalog,
};

/// Thresholds for the discover rankings
#[derive(Debug, Clone)]
pub struct DiscoverCriteria {
    pub gem_min_score: f64,
    pub gem_max_ratings: u64,
    pub polarizing_min_ratings: u64,
    pub polarizing_min_std: f64,
    pub list_size: usize,
}

impl Default for DiscoverCriteria {
    fn default() -> Self {
        Self {
            gem_min_score: 8.0,
            gem_max_ratings: 5000,
            polarizing_min_ratings: 100,
            polarizing_min_std: 2.0,
            list_size: 50,
        }
    }
}

/// Running count/mean/variance (Welford)
#[derive(Debug, Clone, Copy, Default)]
struct RatingStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RatingStats {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn sample_std(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }

    fn entry(&self, anime_id: AnimeId) -> DiscoverEntry {
        DiscoverEntry {
            anime_id,
            rating_count: self.count,
            mean_rating: self.mean,
            std_rating: self.sample_std(),
        }
    }
}

/// Ranks well-scored but rarely rated titles and titles with divided ratings
pub fn build_discover(
    catalog: &Catalog,
    events: &[RatingEvent],
    criteria: &DiscoverCriteria,
) -> DiscoverLists {
    let mut stats: HashMap<AnimeId, RatingStats> = HashMap::new();
    for event in events {
        stats.entry(event.anime_id).or_default().push(event.rating);
    }

    let mut gems: Vec<(f64, DiscoverEntry)> = catalog
        .items()
        .iter()
        .filter(|anime| anime.score >= criteria.gem_min_score)
        .filter_map(|anime| {
            let s = stats.get(&anime.id)?;
            (s.count < criteria.gem_max_ratings).then(|| (anime.score, s.entry(anime.id)))
        })
        .collect();
    gems.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    let mut polarizing: Vec<(f64, DiscoverEntry)> = catalog
        .ids()
        .filter_map(|id| {
            let s = stats.get(&id)?;
            let std = s.sample_std()?;
            (s.count >= criteria.polarizing_min_ratings && std >= criteria.polarizing_min_std)
                .then(|| (std, s.entry(id)))
        })
        .collect();
    polarizing.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    let lists = DiscoverLists {
        built_at: Utc::now(),
        hidden_gems: gems
            .into_iter()
            .take(criteria.list_size)
            .map(|(_, entry)| entry)
            .collect(),
        polarizing: polarizing
            .into_iter()
            .take(criteria.list_size)
            .map(|(_, entry)| entry)
            .collect(),
    };

    tracing::info!(
        hidden_gems = lists.hidden_gems.len(),
        polarizing = lists.polarizing.len(),
        "Discover lists built"
    );

    lists
}
