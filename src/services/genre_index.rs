use std::collections::BTreeMap;

use crate::{
    models::{AnimeId, GenreIndex},
    services::catalog::Catalog,
};

/// Builds the per-genre top list over the `genres` tags of the catalog.
///
/// Items are ordered by descending score; equal scores keep catalog order.
pub fn build_genre_index(catalog: &Catalog, per_genre: usize) -> GenreIndex {
    let mut by_genre: BTreeMap<String, Vec<(f64, usize, AnimeId)>> = BTreeMap::new();

    for (position, anime) in catalog.items().iter().enumerate() {
        for genre in &anime.genres {
            by_genre
                .entry(genre.clone())
                .or_default()
                .push((anime.score, position, anime.id));
        }
    }

    let genres: BTreeMap<String, Vec<AnimeId>> = by_genre
        .into_iter()
        .map(|(genre, mut entries)| {
            entries.sort_by(|(score_a, pos_a, _), (score_b, pos_b, _)| {
                score_b.total_cmp(score_a).then(pos_a.cmp(pos_b))
            });
            let top = entries
                .into_iter()
                .take(per_genre)
                .map(|(_, _, id)| id)
                .collect();
            (genre, top)
        })
        .collect();

    tracing::info!(genres = genres.len(), per_genre, "Genre index built");

    GenreIndex::new(genres)
}
