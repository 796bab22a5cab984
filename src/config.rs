use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
///
/// Shared by the HTTP server and the `precompute` batch job. List values
/// (e.g. `EXCLUDED_GENRES`) are comma separated.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Anime metadata CSV
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// User ratings CSV (`user_id, anime_id, rating`)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// Directory holding the precomputed JSON artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Genres whose items are dropped from the catalog at load time
    #[serde(default = "default_excluded_genres")]
    pub excluded_genres: Vec<String>,

    /// Ratings below this value are not positive interactions
    #[serde(default = "default_min_positive_rating")]
    pub min_positive_rating: f64,

    /// Share of positive ratings kept for co-occurrence counting
    #[serde(default = "default_rating_sample_fraction")]
    pub rating_sample_fraction: f64,

    /// Seed for the ratings sample
    #[serde(default = "default_sample_seed")]
    pub sample_seed: u64,

    /// Number of most-rated items eligible as co-occurrence keys
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: usize,

    /// Neighbors kept per co-occurrence key
    #[serde(default = "default_neighbors_per_item")]
    pub neighbors_per_item: usize,

    /// Items kept per genre in the genre index
    #[serde(default = "default_genre_index_size")]
    pub genre_index_size: usize,

    /// Default length of the user and genre lists
    #[serde(default = "default_list_size")]
    pub default_list_size: usize,

    /// Default bias towards the user-based list in the hybrid merge
    #[serde(default = "default_hybrid_weight")]
    pub hybrid_weight: f64,

    /// Default hybrid list length
    #[serde(default = "default_hybrid_total")]
    pub hybrid_total: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/anime_metadata.csv")
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("data/ratings.csv")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_excluded_genres() -> Vec<String> {
    vec!["Hentai".to_string(), "Ecchi".to_string(), "Erotica".to_string()]
}

fn default_min_positive_rating() -> f64 {
    7.0
}

fn default_rating_sample_fraction() -> f64 {
    1.0
}

fn default_sample_seed() -> u64 {
    42
}

fn default_candidate_pool_size() -> usize {
    1000
}

fn default_neighbors_per_item() -> usize {
    20
}

fn default_genre_index_size() -> usize {
    20
}

fn default_list_size() -> usize {
    50
}

fn default_hybrid_weight() -> f64 {
    0.5
}

fn default_hybrid_total() -> usize {
    50
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.rating_sample_fraction) {
            anyhow::bail!(
                "RATING_SAMPLE_FRACTION must be within [0, 1], got {}",
                self.rating_sample_fraction
            );
        }
        if !(0.0..=1.0).contains(&self.hybrid_weight) {
            anyhow::bail!("HYBRID_WEIGHT must be within [0, 1], got {}", self.hybrid_weight);
        }
        Ok(())
    }

    pub fn user_recs_path(&self) -> PathBuf {
        self.artifacts_dir.join("user_based_recs.json")
    }

    pub fn genre_recs_path(&self) -> PathBuf {
        self.artifacts_dir.join("genre_recs.json")
    }

    pub fn discover_path(&self) -> PathBuf {
        self.artifacts_dir.join("discover.json")
    }
}
