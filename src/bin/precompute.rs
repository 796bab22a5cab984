//! Offline build of the recommendation artifacts.
//!
//! Reads the catalog and the ratings log named in the environment config and
//! writes the co-occurrence table, the genre index and the discover lists.

use anyhow::Context;
use std::time::Instant;

use anime_recommender::{
    config::Config,
    services::{
        build_discover, build_genre_index, ratings, Artifacts, Catalog, CoOccurrenceBuilder,
        DiscoverCriteria,
    },
    telemetry,
};

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let start = Instant::now();

    let config = Config::from_env()?;

    let (catalog, _) = Catalog::load(&config.catalog_path, &config.excluded_genres)
        .with_context(|| format!("Failed to load catalog from {}", config.catalog_path.display()))?;

    let (events, _) = ratings::load_ratings(&config.ratings_path, &catalog).with_context(|| {
        format!("Failed to load ratings from {}", config.ratings_path.display())
    })?;

    let positive = ratings::positive_sample(
        &events,
        config.min_positive_rating,
        config.rating_sample_fraction,
        config.sample_seed,
    );

    let (cooccurrence, _) =
        CoOccurrenceBuilder::new(config.candidate_pool_size, config.neighbors_per_item)
            .build(&positive);
    drop(positive);

    let genre_index = build_genre_index(&catalog, config.genre_index_size);
    let discover = build_discover(&catalog, &events, &DiscoverCriteria::default());

    let artifacts = Artifacts {
        cooccurrence,
        genre_index,
        discover,
    };
    artifacts
        .save(
            &config.user_recs_path(),
            &config.genre_recs_path(),
            &config.discover_path(),
        )
        .with_context(|| format!("Failed to write artifacts to {}", config.artifacts_dir.display()))?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        artifacts_dir = %config.artifacts_dir.display(),
        "Precompute finished"
    );

    Ok(())
}
