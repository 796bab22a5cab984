use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Anime, AnimeId, CoOccurrenceTable},
    services::catalog::Catalog,
};

/// User-based recommendations for `seed`.
///
/// Takes the precomputed co-occurrence neighbors first and pads with a
/// uniform sample of the catalog when fewer than `n` are available. A seed
/// missing from the table is served entirely from the sample.
pub fn user_recs<R: Rng + ?Sized>(
    catalog: &Catalog,
    table: &CoOccurrenceTable,
    seed: AnimeId,
    n: usize,
    rng: &mut R,
) -> Vec<AnimeId> {
    let mut picked: Vec<AnimeId> = Vec::with_capacity(n);
    let mut seen: HashSet<AnimeId> = HashSet::from([seed]);

    if let Some(neighbors) = table.get(seed) {
        for &id in neighbors {
            if picked.len() >= n {
                break;
            }
            if catalog.contains(id) && seen.insert(id) {
                picked.push(id);
            }
        }
    }

    if picked.len() < n {
        let pool: Vec<AnimeId> = catalog.ids().filter(|id| !seen.contains(id)).collect();
        picked.extend(pool.choose_multiple(rng, n - picked.len()).copied());
    }

    picked
}

/// Genre-based recommendations for `seed`, ranked by tag overlap.
///
/// Both sides use the union of `genres` and `genres_detailed`. Equal overlap
/// keeps catalog order. Without seed tags the result is a uniform sample;
/// without any overlapping item it is the first `n` catalog items.
pub fn genre_recs<R: Rng + ?Sized>(
    catalog: &Catalog,
    seed: &Anime,
    n: usize,
    rng: &mut R,
) -> Vec<AnimeId> {
    let seed_genres = seed.all_genres();
    let seed_id = seed.id;
    let others = move || catalog.items().iter().filter(move |anime| anime.id != seed_id);

    if seed_genres.is_empty() {
        let pool: Vec<AnimeId> = others().map(|anime| anime.id).collect();
        return pool.choose_multiple(rng, n).copied().collect();
    }

    let mut scored: Vec<(usize, AnimeId)> = others()
        .filter_map(|anime| {
            let overlap = anime
                .all_genres()
                .iter()
                .filter(|genre| seed_genres.contains(*genre))
                .count();
            (overlap > 0).then_some((overlap, anime.id))
        })
        .collect();

    if scored.is_empty() {
        return others().take(n).map(|anime| anime.id).collect();
    }

    scored.sort_by(|(a, _), (b, _)| b.cmp(a));
    scored.into_iter().take(n).map(|(_, id)| id).collect()
}

/// Interleaves two ranked lists into at most `total` unique ids.
///
/// Each step draws from the user list with probability `weight` while it has
/// items left, otherwise from the genre list, otherwise from whichever list
/// remains. Duplicates are skipped without using a slot. If the result is
/// still short, a shuffled pool of both lists tops it up.
pub fn hybrid<R: Rng + ?Sized>(
    user_list: &[AnimeId],
    genre_list: &[AnimeId],
    weight: f64,
    total: usize,
    rng: &mut R,
) -> Vec<AnimeId> {
    let mut result: Vec<AnimeId> = Vec::with_capacity(total);
    let mut seen: HashSet<AnimeId> = HashSet::new();
    let (mut user_cursor, mut genre_cursor) = (0, 0);

    while result.len() < total
        && (user_cursor < user_list.len() || genre_cursor < genre_list.len())
    {
        let draw: f64 = rng.gen();
        let id = if draw < weight && user_cursor < user_list.len() {
            user_cursor += 1;
            user_list[user_cursor - 1]
        } else if genre_cursor < genre_list.len() {
            genre_cursor += 1;
            genre_list[genre_cursor - 1]
        } else {
            user_cursor += 1;
            user_list[user_cursor - 1]
        };

        if seen.insert(id) {
            result.push(id);
        }
    }

    if result.len() < total {
        let mut pool: Vec<AnimeId> = user_list.iter().chain(genre_list).copied().collect();
        pool.shuffle(rng);
        for id in pool {
            if result.len() >= total {
                break;
            }
            if seen.insert(id) {
                result.push(id);
            }
        }
    }

    result
}

/// Random source for one request: reproducible when the caller passes a
/// seed, otherwise seeded from entropy
pub fn request_rng(seed: Option<u64>, anime_id: AnimeId) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.rotate_left(32) ^ u64::from(anime_id)),
        None => StdRng::from_entropy(),
    }
}

/// Serves the three recommendation lists against immutable snapshots
#[derive(Debug, Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    cooccurrence: Arc<CoOccurrenceTable>,
}

impl Recommender {
    pub fn new(catalog: Arc<Catalog>, cooccurrence: Arc<CoOccurrenceTable>) -> Self {
        Self {
            catalog,
            cooccurrence,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn seed(&self, seed: AnimeId) -> AppResult<&Anime> {
        self.catalog
            .get(seed)
            .ok_or_else(|| AppError::NotFound(format!("Anime {} not found", seed)))
    }

    fn check_len(name: &str, n: usize) -> AppResult<()> {
        if n == 0 {
            return Err(AppError::InvalidInput(format!("{} must be at least 1", name)));
        }
        Ok(())
    }

    pub fn user_based<R: Rng + ?Sized>(&self, seed: AnimeId, n: usize, rng: &mut R) -> AppResult<Vec<AnimeId>> {
        Self::check_len("n", n)?;
        self.seed(seed)?;
        Ok(user_recs(&self.catalog, &self.cooccurrence, seed, n, rng))
    }

    pub fn genre_based<R: Rng + ?Sized>(&self, seed: AnimeId, n: usize, rng: &mut R) -> AppResult<Vec<AnimeId>> {
        Self::check_len("n", n)?;
        let anime = self.seed(seed)?;
        Ok(genre_recs(&self.catalog, anime, n, rng))
    }

    /// Merges `total`-long user and genre lists for `seed`
    pub fn hybrid<R: Rng + ?Sized>(
        &self,
        seed: AnimeId,
        weight: f64,
        total: usize,
        rng: &mut R,
    ) -> AppResult<Vec<AnimeId>> {
        Self::check_len("total", total)?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(AppError::InvalidInput(format!(
                "weight must be within [0, 1], got {}",
                weight
            )));
        }
        let anime = self.seed(seed)?;

        let user_list = user_recs(&self.catalog, &self.cooccurrence, seed, total, rng);
        let genre_list = genre_recs(&self.catalog, anime, total, rng);

        tracing::debug!(
            seed,
            user = user_list.len(),
            genre = genre_list.len(),
            weight,
            total,
            "Merging hybrid recommendations"
        );

        Ok(hybrid(&user_list, &genre_list, weight, total, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::tests::anime;
    use std::collections::BTreeMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn catalog() -> Catalog {
        Catalog::from_items(
            (1..=30)
                .map(|id| anime(id, &format!("Anime {}", id), 7.0, &[]))
                .collect(),
        )
    }

    fn table() -> CoOccurrenceTable {
        CoOccurrenceTable::new(BTreeMap::from([
            (1, vec![5, 3, 9]),
            (2, (3..=25).collect()),
        ]))
    }

    fn assert_unique(ids: &[AnimeId]) {
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicates in {:?}", ids);
    }

    #[test]
    fn test_user_recs_uses_table_order_first() {
        let recs = user_recs(&catalog(), &table(), 1, 2, &mut rng());
        assert_eq!(recs, vec![5, 3]);
    }

    #[test]
    fn test_user_recs_pads_with_sample() {
        let recs = user_recs(&catalog(), &table(), 1, 10, &mut rng());
        assert_eq!(recs.len(), 10);
        assert_eq!(&recs[..3], &[5, 3, 9]);
        assert!(!recs.contains(&1));
        assert_unique(&recs);
    }

    #[test]
    fn test_user_recs_unknown_seed_samples_catalog() {
        let recs = user_recs(&catalog(), &table(), 30, 5, &mut rng());
        assert_eq!(recs.len(), 5);
        assert!(!recs.contains(&30));
        assert_unique(&recs);
    }

    #[test]
    fn test_user_recs_caps_at_pool_size() {
        let recs = user_recs(&catalog(), &table(), 1, 100, &mut rng());
        assert_eq!(recs.len(), 29);
        assert_unique(&recs);
    }

    #[test]
    fn test_genre_recs_ranks_by_overlap() {
        let seed = anime(1, "Seed", 8.0, &["Action", "Comedy"]);
        let catalog = Catalog::from_items(vec![
            seed.clone(),
            anime(2, "X", 8.0, &["Action", "Drama"]),
            anime(3, "Y", 7.0, &["Action", "Comedy"]),
            anime(4, "Z", 9.0, &["Horror"]),
        ]);
        let recs = genre_recs(&catalog, &seed, 10, &mut rng());
        assert_eq!(recs, vec![3, 2]);
    }

    #[test]
    fn test_genre_recs_counts_detailed_tags() {
        let mut seed = anime(1, "Seed", 8.0, &["Action"]);
        seed.genres_detailed = vec!["Mecha".to_string()];
        let mut mecha = anime(3, "Mecha", 7.0, &[]);
        mecha.genres_detailed = vec!["Mecha".to_string(), "Action".to_string()];
        let catalog = Catalog::from_items(vec![
            seed.clone(),
            anime(2, "Action", 8.0, &["Action"]),
            mecha,
        ]);
        let recs = genre_recs(&catalog, &seed, 1, &mut rng());
        assert_eq!(recs, vec![3]);
    }

    #[test]
    fn test_genre_recs_without_overlap_returns_catalog_order() {
        let seed = anime(1, "Seed", 8.0, &["Space"]);
        let mut items = vec![seed.clone()];
        items.extend((2..=6).map(|id| anime(id, "Other", 7.0, &["Drama"])));
        let recs = genre_recs(&Catalog::from_items(items), &seed, 3, &mut rng());
        assert_eq!(recs, vec![2, 3, 4]);
    }

    #[test]
    fn test_genre_recs_without_seed_genres_samples() {
        let catalog = catalog();
        let seed = catalog.get(4).unwrap().clone();
        let recs = genre_recs(&catalog, &seed, 8, &mut rng());
        assert_eq!(recs.len(), 8);
        assert!(!recs.contains(&4));
        assert_unique(&recs);
    }

    #[test]
    fn test_hybrid_weight_one_fills_from_both_lists() {
        let recs = hybrid(&[10, 20, 30], &[40, 50], 1.0, 5, &mut rng());
        assert_eq!(recs, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_hybrid_weight_zero_with_empty_genre_list() {
        let recs = hybrid(&[10, 20, 30], &[], 0.0, 5, &mut rng());
        assert_eq!(recs, vec![10, 20, 30]);
    }

    #[test]
    fn test_hybrid_skips_duplicates_without_using_slots() {
        let recs = hybrid(&[1, 2, 3, 4], &[2, 3, 5, 6], 0.5, 5, &mut rng());
        assert_eq!(recs.len(), 5);
        assert_unique(&recs);
    }

    #[test]
    fn test_hybrid_length_matches_union() {
        let mut rng = rng();
        for total in [1, 3, 6, 50] {
            for weight in [0.0, 0.3, 0.7, 1.0] {
                let user: Vec<AnimeId> = vec![1, 2, 3, 4];
                let genre: Vec<AnimeId> = vec![3, 4, 5, 6, 7];
                let recs = hybrid(&user, &genre, weight, total, &mut rng);
                assert_unique(&recs);
                assert_eq!(recs.len(), total.min(7));
            }
        }
    }

    #[test]
    fn test_hybrid_preserves_relative_order_within_each_list() {
        let user: Vec<AnimeId> = (100..110).collect();
        let genre: Vec<AnimeId> = (200..210).collect();
        let recs = hybrid(&user, &genre, 0.5, 20, &mut rng());
        let from_user: Vec<AnimeId> = recs.iter().copied().filter(|id| *id < 200).collect();
        let from_genre: Vec<AnimeId> = recs.iter().copied().filter(|id| *id >= 200).collect();
        assert_eq!(from_user, user);
        assert_eq!(from_genre, genre);
    }

    #[test]
    fn test_request_rng_is_reproducible_with_seed() {
        let a: u64 = request_rng(Some(9), 1).gen();
        let b: u64 = request_rng(Some(9), 1).gen();
        let c: u64 = request_rng(Some(9), 2).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_recommender_validates_input() {
        let recommender = Recommender::new(Arc::new(catalog()), Arc::new(table()));
        let mut rng = rng();
        assert!(matches!(
            recommender.user_based(999, 5, &mut rng),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            recommender.genre_based(1, 0, &mut rng),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            recommender.hybrid(1, 1.5, 10, &mut rng),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_recommender_hybrid_never_contains_seed() {
        let recommender = Recommender::new(Arc::new(catalog()), Arc::new(table()));
        let recs = recommender.hybrid(2, 0.5, 20, &mut rng()).unwrap();
        assert_eq!(recs.len(), 20);
        assert!(!recs.contains(&2));
        assert_unique(&recs);
    }
}
