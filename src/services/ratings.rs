use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{
    error::AppResult,
    models::{RatingEvent, RatingRecord},
    services::catalog::Catalog,
};

/// Counters reported after a ratings load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingLoadStats {
    pub rows: usize,
    pub malformed: usize,
    pub unknown_anime: usize,
    pub kept: usize,
}

/// Loads the ratings log, keeping only well-formed rows for catalog items
pub fn load_ratings<P: AsRef<Path>>(
    path: P,
    catalog: &Catalog,
) -> AppResult<(Vec<RatingEvent>, RatingLoadStats)> {
    tracing::info!(path = %path.as_ref().display(), "Loading ratings log");
    let file = File::open(path)?;
    read_ratings(file, catalog)
}

pub fn read_ratings<R: Read>(
    reader: R,
    catalog: &Catalog,
) -> AppResult<(Vec<RatingEvent>, RatingLoadStats)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut stats = RatingLoadStats::default();
    let mut events = Vec::new();

    for result in reader.deserialize::<RatingRecord>() {
        stats.rows += 1;
        let Some(event) = result.ok().and_then(|record| record.parse()) else {
            stats.malformed += 1;
            continue;
        };
        if !catalog.contains(event.anime_id) {
            stats.unknown_anime += 1;
            continue;
        }
        events.push(event);
    }
    stats.kept = events.len();

    tracing::info!(
        rows = stats.rows,
        kept = stats.kept,
        malformed = stats.malformed,
        unknown_anime = stats.unknown_anime,
        "Ratings log loaded"
    );

    Ok((events, stats))
}

/// Keeps ratings at or above `min_rating`, then a reproducible Bernoulli
/// sample of `fraction` of them
pub fn positive_sample(
    events: &[RatingEvent],
    min_rating: f64,
    fraction: f64,
    seed: u64,
) -> Vec<RatingEvent> {
    let positive = events.iter().filter(|e| e.rating >= min_rating);

    let sampled: Vec<RatingEvent> = if fraction >= 1.0 {
        positive.copied().collect()
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        positive
            .filter(|_| rng.gen_bool(fraction.max(0.0)))
            .copied()
            .collect()
    };

    tracing::info!(
        total = events.len(),
        kept = sampled.len(),
        min_rating,
        fraction,
        "Selected positive interactions"
    );

    sampled
}
