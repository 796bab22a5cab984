mod anime;
mod rating;
mod tables;

pub use anime::{parse_genre_list, Anime, AnimeId, AnimeRecord};
pub use rating::{parse_id, RatingEvent, RatingRecord, UserId};
pub use tables::{CoOccurrenceTable, DiscoverEntry, DiscoverLists, GenreIndex};
