//! Fuzzy narrowing of list views.
//!
//! Scoring is skim-style subsequence matching: every query character must appear in
//! the label in order, and tighter, earlier, contiguous matches score higher. The
//! cache is never touched; a filter only produces a display order of indices.

use crate::model::Item;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashMap;

fn matcher() -> SkimMatcherV2 {
    SkimMatcherV2::default().ignore_case()
}

fn score_with(matcher: &SkimMatcherV2, query: &str, label: &str) -> Option<i64> {
    if query.is_empty() {
        return Some(0);
    }
    matcher.fuzzy_match(label, query)
}

/// `None` unless `query` is an in-order subsequence of `label` (case-insensitive).
pub fn score(query: &str, label: &str) -> Option<i64> {
    score_with(&matcher(), query, label)
}

#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub query: String,
    /// `true` while the user is typing into the `/` prompt.
    pub editing: bool,
    /// Item id -> score for the current query. Empty when no query is active.
    pub scores: HashMap<String, i64>,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.editing = false;
        self.scores.clear();
    }

    /// Recompute scores against `items` and return the display order as indices
    /// into `items`: best score first, cache order for ties, non-matches dropped.
    pub fn apply(&mut self, items: &[Item]) -> Vec<usize> {
        self.scores.clear();
        if self.query.is_empty() {
            return (0..items.len()).collect();
        }

        let matcher = matcher();
        let mut ranked: Vec<(usize, i64)> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let by_label = score_with(&matcher, &self.query, item.label());
                let by_id = score_with(&matcher, &self.query, item.id());
                by_label.max(by_id).map(|s| (i, s))
            })
            .collect();
        // Stable sort keeps cache order among equal scores.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        for &(i, s) in &ranked {
            self.scores.insert(items[i].id().to_string(), s);
        }
        ranked.into_iter().map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pipeline, Run, RunStatus};
    use proptest::prelude::*;

    fn run(id: &str, pipeline: &str) -> Item {
        Item::Run(Run {
            run_id: id.to_string(),
            pipeline_name: pipeline.to_string(),
            status: RunStatus::Success,
            started_at: None,
            ended_at: None,
        })
    }

    fn pipeline(name: &str) -> Item {
        Item::Pipeline(Pipeline {
            name: name.to_string(),
            repository: "repo".to_string(),
            location: "loc".to_string(),
            last_run_status: None,
        })
    }

    #[test]
    fn subsequence_is_order_sensitive() {
        assert!(score("ab", "cabbage").is_some());
        assert!(score("ab", "bac").is_none());
    }

    #[test]
    fn case_insensitive() {
        assert!(score("ETL", "nightly_etl").is_some());
        assert!(score("etl", "NIGHTLY_ETL").is_some());
    }

    #[test]
    fn contiguous_match_beats_scattered() {
        let tight = score("fail", "build-failure-42").unwrap();
        let loose = score("fail", "fxxaxxixxl").unwrap();
        assert!(tight > loose);
    }

    #[test]
    fn empty_query_keeps_cache_order() {
        let items = vec![pipeline("b"), pipeline("a"), pipeline("c")];
        let mut f = FilterState::default();
        assert_eq!(f.apply(&items), vec![0, 1, 2]);
        assert!(f.scores.is_empty());
    }

    #[test]
    fn best_match_first_and_non_matches_dropped() {
        let items = vec![
            pipeline("deploy"),
            pipeline("fxxaxxixxl"),
            pipeline("build-failure-42"),
        ];
        let mut f = FilterState {
            query: "fail".to_string(),
            ..FilterState::default()
        };
        assert_eq!(f.apply(&items), vec![2, 1]);
        assert!(f.scores.contains_key("build-failure-42"));
        assert!(!f.scores.contains_key("deploy"));
    }

    #[test]
    fn ties_keep_cache_order() {
        let items = vec![pipeline("etl"), pipeline("etl"), pipeline("etl")];
        let mut f = FilterState {
            query: "etl".to_string(),
            ..FilterState::default()
        };
        assert_eq!(f.apply(&items), vec![0, 1, 2]);
    }

    #[test]
    fn run_matches_on_id_or_pipeline() {
        let items = vec![run("a1b2c3", "nightly"), run("zzz", "hourly")];
        let mut f = FilterState {
            query: "b2c".to_string(),
            ..FilterState::default()
        };
        assert_eq!(f.apply(&items), vec![0]);
        f.query = "hour".to_string();
        assert_eq!(f.apply(&items), vec![1]);
    }

    proptest! {
        #[test]
        fn extending_query_never_adds_matches(
            label in "[a-z_-]{0,16}",
            query in "[a-z]{0,6}",
            extra in "[a-z]",
        ) {
            let longer = format!("{query}{extra}");
            if score(&longer, &label).is_some() {
                prop_assert!(score(&query, &label).is_some());
            }
        }

        #[test]
        fn label_always_matches_itself(label in "[a-z0-9]{1,16}") {
            prop_assert!(score(&label, &label).is_some());
        }
    }
}
