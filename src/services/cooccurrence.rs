use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{AnimeId, CoOccurrenceTable, RatingEvent, UserId};

/// Sparse symmetric co-occurrence matrix
///
/// Each unordered pair is stored once under `(min, max)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoCounts {
    counts: HashMap<(AnimeId, AnimeId), u32>,
}

impl CoCounts {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: AnimeId, b: AnimeId) -> (AnimeId, AnimeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Records one user having rated both `a` and `b`
    pub fn increment(&mut self, a: AnimeId, b: AnimeId) {
        debug_assert_ne!(a, b);
        *self.counts.entry(Self::key(a, b)).or_insert(0) += 1;
    }

    /// Count for the pair in either order
    pub fn get(&self, a: AnimeId, b: AnimeId) -> u32 {
        self.counts.get(&Self::key(a, b)).copied().unwrap_or(0)
    }

    /// Adds every pair of a user's distinct, sorted items; returns pairs added
    pub fn add_history(&mut self, items: &[AnimeId]) -> u64 {
        let mut added = 0;
        for (i, &a) in items.iter().enumerate() {
            for &b in &items[i + 1..] {
                self.increment(a, b);
                added += 1;
            }
        }
        added
    }

    /// Sums `other` into `self`
    pub fn merge(mut self, other: Self) -> Self {
        let (mut large, small) = if self.counts.len() >= other.counts.len() {
            (std::mem::take(&mut self.counts), other.counts)
        } else {
            (other.counts, std::mem::take(&mut self.counts))
        };
        for (pair, count) in small {
            *large.entry(pair).or_insert(0) += count;
        }
        Self { counts: large }
    }

    pub fn distinct_pairs(&self) -> usize {
        self.counts.len()
    }

    fn iter(&self) -> impl Iterator<Item = ((AnimeId, AnimeId), u32)> + '_ {
        self.counts.iter().map(|(&pair, &count)| (pair, count))
    }
}

/// Counters reported after a co-occurrence build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoOccurrenceStats {
    pub users: usize,
    pub candidates: usize,
    /// Sum over users of C(k, 2), k = distinct candidate items rated
    pub pairs_counted: u64,
    pub distinct_pairs: usize,
}

/// Builds the user-based [`CoOccurrenceTable`] from positive interactions
#[derive(Debug, Clone)]
pub struct CoOccurrenceBuilder {
    candidate_pool_size: usize,
    neighbors_per_item: usize,
}

impl Default for CoOccurrenceBuilder {
    fn default() -> Self {
        Self::new(1000, 20)
    }
}

impl CoOccurrenceBuilder {
    pub fn new(candidate_pool_size: usize, neighbors_per_item: usize) -> Self {
        Self {
            candidate_pool_size,
            neighbors_per_item,
        }
    }

    /// Runs the full build over already-cleaned rating events
    pub fn build(&self, events: &[RatingEvent]) -> (CoOccurrenceTable, CoOccurrenceStats) {
        let histories = user_histories(events);
        let candidates = self.candidate_set(&histories);
        let candidate_lookup: HashSet<AnimeId> = candidates.iter().copied().collect();

        tracing::info!(
            users = histories.len(),
            candidates = candidates.len(),
            "Counting co-occurrences"
        );

        let (counts, pairs_counted) = histories
            .par_iter()
            .fold(
                || (CoCounts::new(), 0u64),
                |(mut counts, pairs), items| {
                    let kept: Vec<AnimeId> = items
                        .iter()
                        .copied()
                        .filter(|id| candidate_lookup.contains(id))
                        .collect();
                    let added = counts.add_history(&kept);
                    (counts, pairs + added)
                },
            )
            .reduce(
                || (CoCounts::new(), 0u64),
                |(a, pairs_a), (b, pairs_b)| (a.merge(b), pairs_a + pairs_b),
            );

        let neighbors = self.top_neighbors(&candidates, &counts);

        let stats = CoOccurrenceStats {
            users: histories.len(),
            candidates: candidates.len(),
            pairs_counted,
            distinct_pairs: counts.distinct_pairs(),
        };

        tracing::info!(
            users = stats.users,
            candidates = stats.candidates,
            pairs_counted = stats.pairs_counted,
            distinct_pairs = stats.distinct_pairs,
            "Co-occurrence table built"
        );

        (CoOccurrenceTable::new(neighbors), stats)
    }

    /// Most-rated items by distinct users; ties go to the lower id
    fn candidate_set(&self, histories: &[Vec<AnimeId>]) -> Vec<AnimeId> {
        let mut popularity: HashMap<AnimeId, u64> = HashMap::new();
        for items in histories {
            for &id in items {
                *popularity.entry(id).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(AnimeId, u64)> = popularity.into_iter().collect();
        ranked.sort_unstable_by(|(id_a, n_a), (id_b, n_b)| n_b.cmp(n_a).then(id_a.cmp(id_b)));
        ranked
            .into_iter()
            .take(self.candidate_pool_size)
            .map(|(id, _)| id)
            .collect()
    }

    fn top_neighbors(
        &self,
        candidates: &[AnimeId],
        counts: &CoCounts,
    ) -> BTreeMap<AnimeId, Vec<AnimeId>> {
        let mut partners: HashMap<AnimeId, Vec<(AnimeId, u32)>> = HashMap::new();
        for ((a, b), count) in counts.iter() {
            partners.entry(a).or_default().push((b, count));
            partners.entry(b).or_default().push((a, count));
        }

        candidates
            .iter()
            .map(|&id| {
                let mut list = partners.remove(&id).unwrap_or_default();
                list.sort_unstable_by(|(id_a, n_a), (id_b, n_b)| {
                    n_b.cmp(n_a).then(id_a.cmp(id_b))
                });
                let top = list
                    .into_iter()
                    .take(self.neighbors_per_item)
                    .map(|(other, _)| other)
                    .collect();
                (id, top)
            })
            .collect()
    }
}

/// Distinct, sorted items per user
fn user_histories(events: &[RatingEvent]) -> Vec<Vec<AnimeId>> {
    let mut by_user: HashMap<UserId, Vec<AnimeId>> = HashMap::new();
    for event in events {
        by_user.entry(event.user_id).or_default().push(event.anime_id);
    }
    by_user
        .into_values()
        .map(|mut items| {
            items.sort_unstable();
            items.dedup();
            items
        })
        .collect()
}
