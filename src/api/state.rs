use std::sync::Arc;

use crate::config::Config;
use crate::models::{CoOccurrenceTable, DiscoverLists, GenreIndex};
use crate::services::{Catalog, Recommender};

/// Per-request defaults taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults {
    pub list_size: usize,
    pub hybrid_weight: f64,
    pub hybrid_total: usize,
}

impl From<&Config> for RequestDefaults {
    fn from(config: &Config) -> Self {
        Self {
            list_size: config.default_list_size,
            hybrid_weight: config.hybrid_weight,
            hybrid_total: config.hybrid_total,
        }
    }
}

/// Shared application state
///
/// Everything behind it is an immutable snapshot, so handlers read it
/// without locking.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub recommender: Recommender,
    pub genre_index: GenreIndex,
    pub discover: DiscoverLists,
    pub defaults: RequestDefaults,
}

impl AppState {
    pub fn new(
        catalog: Catalog,
        cooccurrence: CoOccurrenceTable,
        genre_index: GenreIndex,
        discover: DiscoverLists,
        defaults: RequestDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                recommender: Recommender::new(Arc::new(catalog), Arc::new(cooccurrence)),
                genre_index,
                discover,
                defaults,
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.inner.recommender.catalog()
    }
}
