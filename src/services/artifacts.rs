use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::{
    error::AppResult,
    models::{CoOccurrenceTable, DiscoverLists, GenreIndex},
};

/// Writes `value` as JSON, creating parent directories as needed
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> AppResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), "Artifact written");
    Ok(())
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> AppResult<T> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let value = serde_json::from_reader(reader)?;
    tracing::debug!(path = %path.display(), "Artifact read");
    Ok(value)
}

/// Everything the batch job produces
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub cooccurrence: CoOccurrenceTable,
    pub genre_index: GenreIndex,
    pub discover: DiscoverLists,
}

impl Artifacts {
    pub fn save(
        &self,
        user_recs_path: &Path,
        genre_recs_path: &Path,
        discover_path: &Path,
    ) -> AppResult<()> {
        write_json(user_recs_path, &self.cooccurrence)?;
        write_json(genre_recs_path, &self.genre_index)?;
        write_json(discover_path, &self.discover)?;
        Ok(())
    }

    /// Loads the snapshots; a missing discover file yields empty lists
    pub fn load(
        user_recs_path: &Path,
        genre_recs_path: &Path,
        discover_path: &Path,
    ) -> AppResult<Self> {
        let cooccurrence: CoOccurrenceTable = read_json(user_recs_path)?;
        let genre_index: GenreIndex = read_json(genre_recs_path)?;

        let discover = if discover_path.exists() {
            read_json(discover_path)?
        } else {
            tracing::warn!(path = %discover_path.display(), "Discover artifact missing, serving empty lists");
            DiscoverLists::empty()
        };

        tracing::info!(
            cooccurrence_keys = cooccurrence.len(),
            genres = genre_index.genres.len(),
            built_at = %cooccurrence.built_at,
            "Recommendation snapshots loaded"
        );

        Ok(Self {
            cooccurrence,
            genre_index,
            discover,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;

    fn artifacts() -> Artifacts {
        Artifacts {
            cooccurrence: CoOccurrenceTable::new(BTreeMap::from([
                (1, vec![40_000, 2]),
                (40_000, vec![1]),
            ])),
            genre_index: GenreIndex::new(BTreeMap::from([("Action".to_string(), vec![40_000])])),
            discover: DiscoverLists::empty(),
        }
    }

    #[test]
    fn test_round_trip_preserves_integer_keys() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("nested/user_based_recs.json");
        let genre = dir.path().join("genre_recs.json");
        let discover = dir.path().join("discover.json");

        let original = artifacts();
        original.save(&user, &genre, &discover).unwrap();

        let loaded = Artifacts::load(&user, &genre, &discover).unwrap();
        assert_eq!(loaded.cooccurrence, original.cooccurrence);
        assert_eq!(loaded.genre_index, original.genre_index);
        assert_eq!(loaded.cooccurrence.get(40_000), Some(&[1][..]));
    }

    #[test]
    fn test_missing_discover_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.json");
        let genre = dir.path().join("genre.json");
        let original = artifacts();
        write_json(&user, &original.cooccurrence).unwrap();
        write_json(&genre, &original.genre_index).unwrap();

        let loaded = Artifacts::load(&user, &genre, &dir.path().join("none.json")).unwrap();
        assert!(loaded.discover.hidden_gems.is_empty());
    }

    #[test]
    fn test_missing_table_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let result = Artifacts::load(&missing, &missing, &missing);
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
