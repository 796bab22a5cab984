use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Catalog identifier of an anime
pub type AnimeId = u32;

/// An anime in the filtered catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anime {
    pub id: AnimeId,
    pub title: String,
    /// Missing scores are imputed with the catalog median at load time
    pub score: f64,
    pub genres: Vec<String>,
    /// Richer tag set, only used for genre overlap scoring
    pub genres_detailed: Vec<String>,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub year: Option<i32>,
    pub episodes: Option<u32>,
    pub sequel: Option<String>,
    pub mal_url: Option<String>,
}

impl Anime {
    /// Union of both tag fields, used for genre overlap
    pub fn all_genres(&self) -> HashSet<&str> {
        self.genres
            .iter()
            .chain(self.genres_detailed.iter())
            .map(String::as_str)
            .collect()
    }

    /// Whether either tag field carries `genre`, ignoring case
    pub fn has_genre_ignore_case(&self, genre: &str) -> bool {
        self.genres
            .iter()
            .chain(self.genres_detailed.iter())
            .any(|g| g.eq_ignore_ascii_case(genre))
    }
}

/// Raw catalog row as it appears in the metadata CSV
///
/// Every column is read as text so that one bad cell only affects its own
/// field; conversion and validation happen in [`crate::services::catalog`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimeRecord {
    pub anime_id: Option<String>,
    pub title: Option<String>,
    pub score: Option<String>,
    pub genres: Option<String>,
    pub genres_detailed: Option<String>,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub year: Option<String>,
    pub episodes: Option<String>,
    pub sequel: Option<String>,
    pub mal_url: Option<String>,
}

/// Parses a list literal such as `['Action', "Girls' Love"]` into its tags.
///
/// Empty input, `[]` and anything that is not a well-formed list of quoted
/// strings yield an empty list. Tags are trimmed, blank tags dropped and
/// duplicates removed keeping the first occurrence.
pub fn parse_genre_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let Some(body) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Vec::new();
        }

        let mut tag = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => tag.push(escaped),
                    None => return Vec::new(),
                },
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => tag.push(c),
            }
        }
        if !closed {
            return Vec::new();
        }

        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return Vec::new(),
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_quoted_list() {
        assert_eq!(
            parse_genre_list("['Action', 'Comedy']"),
            vec!["Action", "Comedy"]
        );
    }

    #[test]
    fn test_parse_double_quotes_with_apostrophe() {
        assert_eq!(
            parse_genre_list(r#"["Girls' Love", 'Drama']"#),
            vec!["Girls' Love", "Drama"]
        );
    }

    #[test]
    fn test_parse_trims_and_dedups() {
        assert_eq!(
            parse_genre_list("[' Action ', 'Action', '', 'Sci-Fi',]"),
            vec!["Action", "Sci-Fi"]
        );
    }

    #[test]
    fn test_parse_empty_encodings() {
        assert!(parse_genre_list("").is_empty());
        assert!(parse_genre_list("[]").is_empty());
        assert!(parse_genre_list("  [ ]  ").is_empty());
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        assert!(parse_genre_list("Action, Comedy").is_empty());
        assert!(parse_genre_list("['Action', Comedy]").is_empty());
        assert!(parse_genre_list("['Action'").is_empty());
        assert!(parse_genre_list("['Action' 'Comedy']").is_empty());
        assert!(parse_genre_list("['unterminated]").is_empty());
    }

    #[test]
    fn test_all_genres_is_union() {
        let anime = Anime {
            id: 1,
            title: "A".to_string(),
            score: 7.0,
            genres: vec!["Action".to_string(), "Drama".to_string()],
            genres_detailed: vec!["Drama".to_string(), "Mecha".to_string()],
            image_url: None,
            anime_type: None,
            year: None,
            episodes: None,
            sequel: None,
            mal_url: None,
        };
        let all = anime.all_genres();
        assert_eq!(all.len(), 3);
        assert!(all.contains("Mecha"));
        assert!(anime.has_genre_ignore_case("mecha"));
        assert!(!anime.has_genre_ignore_case("Comedy"));
    }
}
