use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Anime, AnimeId, DiscoverEntry},
    services::{recommendations::request_rng, CatalogFilter, FacetCounts},
};

use super::AppState;

const MAX_PAGE_SIZE: usize = 500;
const MAX_LIST_SIZE: usize = 1000;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct ExplorerQuery {
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Comma separated, e.g. `TV,Movie`
    pub types: Option<String>,
    pub max_episodes: Option<u32>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ExplorerQuery {
    fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            year_min: self.year_min,
            year_max: self.year_max,
            types: self
                .types
                .as_deref()
                .map(|types| {
                    types
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            max_episodes: self.max_episodes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnimePage {
    pub total: usize,
    pub offset: usize,
    pub items: Vec<Anime>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub n: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    pub weight: Option<f64>,
    pub total: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    UserBased,
    GenreBased,
    Hybrid,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub seed: AnimeId,
    pub strategy: Strategy,
    pub items: Vec<Anime>,
}

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub genre: String,
    pub items: Vec<Anime>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverItem {
    pub anime: Anime,
    #[serde(flatten)]
    pub stats: DiscoverEntry,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub built_at: DateTime<Utc>,
    pub hidden_gems: Vec<DiscoverItem>,
    pub polarizing: Vec<DiscoverItem>,
}

fn check_list_size(name: &str, n: usize) -> AppResult<usize> {
    if n > MAX_LIST_SIZE {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {}",
            name, MAX_LIST_SIZE
        )));
    }
    Ok(n)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Browse the catalog with the explorer filter
pub async fn list_anime(
    State(state): State<AppState>,
    Query(query): Query<ExplorerQuery>,
) -> Json<AnimePage> {
    let filter = query.filter();
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(50).min(MAX_PAGE_SIZE);

    let matching: Vec<&Anime> = state.catalog().filter(&filter).collect();
    let items = matching
        .iter()
        .skip(offset)
        .take(limit)
        .map(|&anime| anime.clone())
        .collect();

    Json(AnimePage {
        total: matching.len(),
        offset,
        items,
    })
}

/// Counts by year, type and genre for the explorer filter
pub async fn anime_stats(
    State(state): State<AppState>,
    Query(query): Query<ExplorerQuery>,
) -> Json<FacetCounts> {
    Json(state.catalog().facet_counts(&query.filter()))
}

/// Title search used by the anime picker
pub async fn search_anime(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<Anime>> {
    let limit = params.limit.unwrap_or(20).min(MAX_PAGE_SIZE);
    let hits = state
        .catalog()
        .search(&params.q, limit)
        .into_iter()
        .cloned()
        .collect();
    Json(hits)
}

pub async fn get_anime(
    State(state): State<AppState>,
    Path(id): Path<AnimeId>,
) -> AppResult<Json<Anime>> {
    state
        .catalog()
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Anime {} not found", id)))
}

pub async fn user_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<AnimeId>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let n = check_list_size("n", query.n.unwrap_or(state.inner.defaults.list_size))?;
    let mut rng = request_rng(query.seed, id);
    let ids = state.inner.recommender.user_based(id, n, &mut rng)?;

    tracing::info!(request_id = %request_id, seed = id, count = ids.len(), "User-based recommendations served");

    Ok(Json(RecommendationResponse {
        seed: id,
        strategy: Strategy::UserBased,
        items: state.catalog().resolve(&ids),
    }))
}

pub async fn genre_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<AnimeId>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let n = check_list_size("n", query.n.unwrap_or(state.inner.defaults.list_size))?;
    let mut rng = request_rng(query.seed, id);
    let ids = state.inner.recommender.genre_based(id, n, &mut rng)?;

    tracing::info!(request_id = %request_id, seed = id, count = ids.len(), "Genre-based recommendations served");

    Ok(Json(RecommendationResponse {
        seed: id,
        strategy: Strategy::GenreBased,
        items: state.catalog().resolve(&ids),
    }))
}

pub async fn hybrid_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<AnimeId>,
    Query(query): Query<HybridQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let defaults = state.inner.defaults;
    let total = check_list_size("total", query.total.unwrap_or(defaults.hybrid_total))?;
    let weight = query.weight.unwrap_or(defaults.hybrid_weight);
    let mut rng = request_rng(query.seed, id);
    let ids = state.inner.recommender.hybrid(id, weight, total, &mut rng)?;

    tracing::info!(
        request_id = %request_id,
        seed = id,
        weight,
        count = ids.len(),
        "Hybrid recommendations served"
    );

    Ok(Json(RecommendationResponse {
        seed: id,
        strategy: Strategy::Hybrid,
        items: state.catalog().resolve(&ids),
    }))
}

/// Top-scoring anime of one genre from the precomputed index
pub async fn genre_top(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> AppResult<Json<GenreResponse>> {
    let ids = state
        .inner
        .genre_index
        .get(&genre)
        .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", genre)))?;

    Ok(Json(GenreResponse {
        items: state.catalog().resolve(ids),
        genre,
    }))
}

pub async fn discover(State(state): State<AppState>) -> Json<DiscoverResponse> {
    let catalog = state.catalog();
    let attach = |entries: &[DiscoverEntry]| -> Vec<DiscoverItem> {
        entries
            .iter()
            .filter_map(|entry| {
                catalog.get(entry.anime_id).map(|anime| DiscoverItem {
                    anime: anime.clone(),
                    stats: entry.clone(),
                })
            })
            .collect()
    };

    let lists = &state.inner.discover;
    Json(DiscoverResponse {
        built_at: lists.built_at,
        hidden_gems: attach(&lists.hidden_gems),
        polarizing: attach(&lists.polarizing),
    })
}
