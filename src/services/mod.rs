pub mod artifacts;
pub mod catalog;
pub mod cooccurrence;
pub mod discover;
pub mod genre_index;
pub mod ratings;
pub mod recommendations;

pub use artifacts::Artifacts;
pub use catalog::{Catalog, CatalogFilter, FacetCounts};
pub use cooccurrence::CoOccurrenceBuilder;
pub use discover::{build_discover, DiscoverCriteria};
pub use genre_index::build_genre_index;
pub use recommendations::Recommender;
