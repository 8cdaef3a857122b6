//! Genre affinity scoring from the user's catalog activity
//!
//! Three signal sources contribute weight to a genre:
//!   - ratings above 5 add `rating - 5` per genre of the rated content
//!   - each distinct watched content adds 1 per genre
//!   - each completed-status content adds 2 per genre
//!
//! Every content that produced a signal lands in the exclusion set, along
//! with anything carrying completed watch progress, so recommendations
//! never resurface what the user already engaged with. A rating of 5 or
//! below scores nothing but still excludes its content.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::CatalogStore;
use crate::error::AppResult;
use crate::models::{GenreTagged, RatingSignal};

const WATCHED_WEIGHT: i64 = 1;
const COMPLETED_WEIGHT: i64 = 2;

/// Per-genre weights with first-seen ordering for deterministic tie-breaks
#[derive(Debug, Clone, Default)]
pub struct GenreScores {
    weights: HashMap<String, i64>,
    order: Vec<String>,
}

impl GenreScores {
    pub fn bump(&mut self, genre: &str, weight: i64) {
        if weight <= 0 {
            return;
        }
        if !self.weights.contains_key(genre) {
            self.order.push(genre.to_string());
        }
        *self.weights.entry(genre.to_string()).or_insert(0) += weight;
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight_of(&self, genre: &str) -> i64 {
        self.weights.get(genre).copied().unwrap_or(0)
    }

    /// Highest-weighted genres; equal weights keep first-seen order
    pub fn top(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<&String> = self.order.iter().collect();
        ranked.sort_by_key(|genre| std::cmp::Reverse(self.weights[*genre]));
        ranked.into_iter().take(n).cloned().collect()
    }
}

/// Scored genres plus the content ids recommendations must skip
#[derive(Debug, Clone, Default)]
pub struct GenreAffinity {
    pub scores: GenreScores,
    pub excluded: HashSet<i64>,
}

/// Pure scoring over already-loaded signals
pub fn score_signals(
    ratings: &[RatingSignal],
    completed_progress: &[i64],
    watch_history: &[GenreTagged],
    completed_content: &[GenreTagged],
) -> GenreAffinity {
    let mut affinity = GenreAffinity::default();

    for rating in ratings {
        affinity.excluded.insert(rating.content_id);
        let weight = (i64::from(rating.value) - 5).max(0);
        for genre in &rating.genres {
            affinity.scores.bump(genre, weight);
        }
    }

    affinity.excluded.extend(completed_progress.iter().copied());

    for watched in watch_history {
        affinity.excluded.insert(watched.content_id);
        for genre in &watched.genres {
            affinity.scores.bump(genre, WATCHED_WEIGHT);
        }
    }

    for completed in completed_content {
        affinity.excluded.insert(completed.content_id);
        for genre in &completed.genres {
            affinity.scores.bump(genre, COMPLETED_WEIGHT);
        }
    }

    affinity
}

/// Loads all signal sources from the store and scores them
pub struct SignalAggregator {
    store: Arc<dyn CatalogStore>,
}

impl SignalAggregator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn aggregate(&self) -> AppResult<GenreAffinity> {
        let ratings = self.store.rating_signals().await?;
        let completed_progress = self.store.completed_progress_ids().await?;
        let watch_history = self.store.watch_history_signals().await?;
        let completed_content = self.store.completed_content_signals().await?;
        Ok(score_signals(
            &ratings,
            &completed_progress,
            &watch_history,
            &completed_content,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(content_id: i64, value: i32, genres: &[&str]) -> RatingSignal {
        RatingSignal {
            content_id,
            value,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn tagged(content_id: i64, genres: &[&str]) -> GenreTagged {
        GenreTagged {
            content_id,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn high_ratings_score_their_margin_over_five() {
        let affinity = score_signals(&[rating(1, 8, &["Action"])], &[], &[], &[]);
        assert_eq!(affinity.scores.weight_of("Action"), 3);
        assert!(affinity.excluded.contains(&1));
    }

    #[test]
    fn low_ratings_score_nothing_but_still_exclude() {
        let affinity = score_signals(
            &[rating(1, 5, &["Action"]), rating(2, 2, &["Drama"])],
            &[],
            &[],
            &[],
        );
        assert!(affinity.scores.is_empty());
        assert!(affinity.excluded.contains(&1));
        assert!(affinity.excluded.contains(&2));
    }

    #[test]
    fn watch_and_completion_weights_stack() {
        let affinity = score_signals(
            &[rating(1, 8, &["Action", "Drama"])],
            &[],
            &[tagged(2, &["Drama"])],
            &[tagged(3, &["Drama"]), tagged(4, &["Action"])],
        );
        // Action: 3 (rating) + 2 (completed) = 5
        // Drama: 3 (rating) + 1 (watched) + 2 (completed) = 6
        assert_eq!(affinity.scores.weight_of("Action"), 5);
        assert_eq!(affinity.scores.weight_of("Drama"), 6);
        assert_eq!(affinity.excluded, HashSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn exclusion_covers_completed_progress_without_scoring() {
        let affinity = score_signals(&[], &[7, 9], &[], &[]);
        assert!(affinity.scores.is_empty());
        assert_eq!(affinity.excluded, HashSet::from([7, 9]));
    }

    #[test]
    fn top_orders_by_weight_then_first_seen() {
        let mut scores = GenreScores::default();
        scores.bump("Action", 3);
        scores.bump("Drama", 5);
        scores.bump("Thriller", 3);
        scores.bump("Comedy", 1);

        // Action and Thriller tie at 3; Action was seen first
        assert_eq!(scores.top(3), vec!["Drama", "Action", "Thriller"]);
        assert_eq!(scores.top(10).len(), 4);
    }

    #[test]
    fn zero_weight_bump_does_not_register_the_genre() {
        let mut scores = GenreScores::default();
        scores.bump("Action", 0);
        assert!(scores.is_empty());
        assert!(scores.top(3).is_empty());
    }
}
