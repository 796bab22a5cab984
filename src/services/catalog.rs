use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{
    error::AppResult,
    models::{parse_genre_list, parse_id, Anime, AnimeId, AnimeRecord},
};

/// The filtered, immutable anime catalog
///
/// Keeps file order; "arbitrary" fallbacks elsewhere rely on it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Anime>,
    by_id: HashMap<AnimeId, usize>,
}

/// Counters reported after a catalog load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogLoadStats {
    pub rows: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub excluded_by_genre: usize,
    pub imputed_scores: usize,
    pub median_score: f64,
}

/// Explorer filter over the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Allowed types; empty means any
    pub types: Vec<String>,
    pub max_episodes: Option<u32>,
}

impl CatalogFilter {
    pub fn matches(&self, anime: &Anime) -> bool {
        if self.year_min.is_some() || self.year_max.is_some() {
            let Some(year) = anime.year else {
                return false;
            };
            if self.year_min.is_some_and(|min| year < min) {
                return false;
            }
            if self.year_max.is_some_and(|max| year > max) {
                return false;
            }
        }

        if !self.types.is_empty() {
            let anime_type = anime.anime_type.as_deref().unwrap_or(UNKNOWN_TYPE);
            if !self.types.iter().any(|t| t.eq_ignore_ascii_case(anime_type)) {
                return false;
            }
        }

        if let Some(max) = self.max_episodes {
            if anime.episodes.unwrap_or(0) > max {
                return false;
            }
        }

        true
    }
}

/// Facet counts over a filtered slice of the catalog
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FacetCounts {
    pub total: usize,
    pub by_year: BTreeMap<i32, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_genre: BTreeMap<String, usize>,
}

const UNKNOWN_TYPE: &str = "Unknown";

impl Catalog {
    /// Loads the catalog CSV, dropping items tagged with any `excluded_genres`
    pub fn load<P: AsRef<Path>>(path: P, excluded_genres: &[String]) -> AppResult<(Self, CatalogLoadStats)> {
        tracing::info!(path = %path.as_ref().display(), "Loading anime catalog");
        let file = File::open(path)?;
        Self::from_reader(file, excluded_genres)
    }

    pub fn from_reader<R: Read>(reader: R, excluded_genres: &[String]) -> AppResult<(Self, CatalogLoadStats)> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut stats = CatalogLoadStats::default();
        let mut records = Vec::new();

        for result in reader.deserialize::<AnimeRecord>() {
            stats.rows += 1;
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    stats.malformed += 1;
                    tracing::debug!(error = %e, "Skipping unreadable catalog row");
                }
            }
        }

        let catalog = Self::from_records(records, excluded_genres, &mut stats);

        tracing::info!(
            rows = stats.rows,
            kept = catalog.len(),
            malformed = stats.malformed,
            duplicates = stats.duplicates,
            excluded_by_genre = stats.excluded_by_genre,
            imputed_scores = stats.imputed_scores,
            median_score = stats.median_score,
            "Anime catalog loaded"
        );

        Ok((catalog, stats))
    }

    fn from_records(
        records: Vec<AnimeRecord>,
        excluded_genres: &[String],
        stats: &mut CatalogLoadStats,
    ) -> Self {
        let mut rows: Vec<(Anime, bool)> = Vec::with_capacity(records.len());
        let mut seen: HashSet<AnimeId> = HashSet::new();

        for record in records {
            let Some(row) = convert_record(&record) else {
                stats.malformed += 1;
                continue;
            };
            if !seen.insert(row.0.id) {
                stats.duplicates += 1;
                continue;
            }
            rows.push(row);
        }

        // Median over every parsed score, before any content filtering
        let mut scores: Vec<f64> = rows
            .iter()
            .filter(|(_, has_score)| *has_score)
            .map(|(anime, _)| anime.score)
            .collect();
        let median = median(&mut scores).unwrap_or(0.0);
        stats.median_score = median;

        let mut items = Vec::with_capacity(rows.len());
        for (mut anime, has_score) in rows {
            if excluded_genres
                .iter()
                .any(|genre| anime.has_genre_ignore_case(genre))
            {
                stats.excluded_by_genre += 1;
                continue;
            }
            if !has_score {
                anime.score = median;
                stats.imputed_scores += 1;
            }
            items.push(anime);
        }

        Self::from_items(items)
    }

    /// Builds a catalog from already-clean items; later duplicates are ignored
    pub fn from_items(items: Vec<Anime>) -> Self {
        let mut kept = Vec::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());
        for anime in items {
            if by_id.contains_key(&anime.id) {
                continue;
            }
            by_id.insert(anime.id, kept.len());
            kept.push(anime);
        }
        Self { items: kept, by_id }
    }

    pub fn get(&self, id: AnimeId) -> Option<&Anime> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    pub fn contains(&self, id: AnimeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn items(&self) -> &[Anime] {
        &self.items
    }

    pub fn ids(&self) -> impl Iterator<Item = AnimeId> + '_ {
        self.items.iter().map(|anime| anime.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolves ids to catalog records, skipping ids no longer in the catalog
    pub fn resolve(&self, ids: &[AnimeId]) -> Vec<Anime> {
        ids.iter().filter_map(|&id| self.get(id)).cloned().collect()
    }

    /// Case-insensitive title search; exact matches first, then catalog order
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Anime> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<(bool, &Anime)> = self
            .items
            .iter()
            .filter_map(|anime| {
                let title = anime.title.to_lowercase();
                title
                    .contains(&needle)
                    .then(|| (title == needle, anime))
            })
            .collect();
        matches.sort_by_key(|(exact, _)| !*exact);
        matches.into_iter().take(limit).map(|(_, anime)| anime).collect()
    }

    pub fn filter<'a>(&'a self, filter: &'a CatalogFilter) -> impl Iterator<Item = &'a Anime> + 'a {
        self.items.iter().filter(move |anime| filter.matches(anime))
    }

    pub fn facet_counts(&self, filter: &CatalogFilter) -> FacetCounts {
        let mut counts = FacetCounts::default();
        for anime in self.filter(filter) {
            counts.total += 1;
            if let Some(year) = anime.year {
                *counts.by_year.entry(year).or_default() += 1;
            }
            let anime_type = anime.anime_type.as_deref().unwrap_or(UNKNOWN_TYPE);
            *counts.by_type.entry(anime_type.to_string()).or_default() += 1;
            for genre in &anime.genres {
                *counts.by_genre.entry(genre.clone()).or_default() += 1;
            }
        }
        counts
    }
}

/// Converts a raw row; the bool reports whether the score parsed
fn convert_record(record: &AnimeRecord) -> Option<(Anime, bool)> {
    let id = AnimeId::try_from(parse_id(non_blank(&record.anime_id)?)?).ok()?;
    let title = non_blank(&record.title)?.trim().to_string();

    let score = non_blank(&record.score)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite());

    let anime = Anime {
        id,
        title,
        score: score.unwrap_or(0.0),
        genres: record.genres.as_deref().map(parse_genre_list).unwrap_or_default(),
        genres_detailed: record
            .genres_detailed
            .as_deref()
            .map(parse_genre_list)
            .unwrap_or_default(),
        image_url: owned_non_blank(&record.image_url),
        anime_type: owned_non_blank(&record.anime_type),
        year: non_blank(&record.year)
            .and_then(parse_id)
            .and_then(|y| i32::try_from(y).ok()),
        episodes: non_blank(&record.episodes)
            .and_then(parse_id)
            .and_then(|e| u32::try_from(e).ok()),
        sequel: owned_non_blank(&record.sequel),
        mal_url: owned_non_blank(&record.mal_url),
    };

    Some((anime, score.is_some()))
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn owned_non_blank(field: &Option<String>) -> Option<String> {
    non_blank(field).map(|s| s.trim().to_string())
}

/// Median with the mean of the two middle values for even counts
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal catalog entry for unit tests
    pub(crate) fn anime(id: AnimeId, title: &str, score: f64, genres: &[&str]) -> Anime {
        Anime {
            id,
            title: title.to_string(),
            score,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            genres_detailed: Vec::new(),
            image_url: None,
            anime_type: None,
            year: None,
            episodes: None,
            sequel: None,
            mal_url: None,
        }
    }

    const CSV: &str = "\
anime_id,title,score,genres,genres_detailed,image_url,type,year,episodes,sequel,mal_url
1,Cowboy Bebop,8.75,\"['Action', 'Sci-Fi']\",\"['Space']\",http://img/1,TV,1998,26,,https://mal/1
5,Trigun,?,\"['Action']\",[],,TV,1998,26,,
6,Bad Row,7.0,\"['Ecchi', 'Comedy']\",,,TV,2001,12,,
7,Movie,8.0,[],,,Movie,2001,1,,
,No Id,9.0,[],,,,,,,
8,,9.0,[],,,,,,,
1,Duplicate,1.0,[],,,,,,,
9,Odd Genres,6.0,Action,\"[\"\"Girls' Love\"\"]\",,OVA,,,,
";

    fn load() -> (Catalog, CatalogLoadStats) {
        let excluded = vec!["ecchi".to_string()];
        Catalog::from_reader(CSV.as_bytes(), &excluded).unwrap()
    }

    #[test]
    fn test_load_drops_invalid_rows() {
        let (catalog, stats) = load();
        let ids: Vec<AnimeId> = catalog.ids().collect();
        assert_eq!(ids, vec![1, 5, 7, 9]);
        assert_eq!(stats.rows, 8);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.excluded_by_genre, 1);
        assert_eq!(catalog.get(1).unwrap().title, "Cowboy Bebop");
    }

    #[test]
    fn test_load_imputes_median_score() {
        let (catalog, stats) = load();
        // Parsed scores: 8.75, 7.0, 8.0, 6.0 -> median 7.5
        assert_eq!(stats.median_score, 7.5);
        assert_eq!(stats.imputed_scores, 1);
        assert_eq!(catalog.get(5).unwrap().score, 7.5);
    }

    #[test]
    fn test_load_parses_genres_and_fields() {
        let (catalog, _) = load();
        let bebop = catalog.get(1).unwrap();
        assert_eq!(bebop.genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(bebop.genres_detailed, vec!["Space"]);
        assert_eq!(bebop.year, Some(1998));
        assert_eq!(bebop.episodes, Some(26));
        assert_eq!(bebop.sequel, None);

        let odd = catalog.get(9).unwrap();
        assert!(odd.genres.is_empty());
        assert_eq!(odd.genres_detailed, vec!["Girls' Love"]);
        assert_eq!(odd.year, None);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_search_prefers_exact_match() {
        let catalog = Catalog::from_items(vec![
            anime(1, "Naruto Shippuden", 8.0, &[]),
            anime(2, "Naruto", 7.9, &[]),
            anime(3, "Bleach", 7.8, &[]),
        ]);
        let hits: Vec<AnimeId> = catalog.search("naruto", 10).iter().map(|a| a.id).collect();
        assert_eq!(hits, vec![2, 1]);
        assert!(catalog.search("   ", 10).is_empty());
        assert_eq!(catalog.search("a", 1).len(), 1);
    }

    #[test]
    fn test_filter_and_facets() {
        let (catalog, _) = load();
        let filter = CatalogFilter {
            year_min: Some(1998),
            year_max: Some(2000),
            types: vec!["tv".to_string()],
            max_episodes: None,
        };
        let ids: Vec<AnimeId> = catalog.filter(&filter).map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 5]);

        let counts = catalog.facet_counts(&CatalogFilter::default());
        assert_eq!(counts.total, 4);
        assert_eq!(counts.by_year.get(&1998), Some(&2));
        assert_eq!(counts.by_type.get("Unknown"), None);
        assert_eq!(counts.by_type.get("OVA"), Some(&1));
        assert_eq!(counts.by_genre.get("Action"), Some(&2));
    }

    #[test]
    fn test_filter_max_episodes_treats_missing_as_zero() {
        let (catalog, _) = load();
        let filter = CatalogFilter {
            max_episodes: Some(1),
            ..Default::default()
        };
        let ids: Vec<AnimeId> = catalog.filter(&filter).map(|a| a.id).collect();
        assert_eq!(ids, vec![7, 9]);
    }
}
