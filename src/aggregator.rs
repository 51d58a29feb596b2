//! Sampling aggregator
//!
//! Owns the live [`ActivityForest`] and applies one sample tick at a time:
//! observe the foreground window, segment its title, merge the segments
//! under the process root and credit time. Each tick either applies fully
//! or is skipped; there is nothing to roll back.

use crate::observer::{ObserverError, WindowObserver, WindowSnapshot};
use crate::persistence::{self, ForestStore};
use crate::render::format_hms;
use crate::segmenter::TitleSegmenter;
use crate::tree::{ActivityForest, NodeId};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which nodes receive the time unit of a recorded tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AttributionPolicy {
    /// Only the process root; context nodes are created with zero time
    #[default]
    Root,
    /// The process root and the deepest context node reached
    Leaf,
    /// The process root and every context node along the merged path
    Path,
}

/// Live status of the most recent recorded tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub process_name: String,
    pub window_title: String,
    /// Cumulative time of the active root as `hh:mm:ss`
    pub active_time: String,
    /// Deepest node touched by this tick
    pub node: NodeId,
}

/// Why a tick left the forest untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The observer returned no owning process
    NoProcess { window_title: String },
    /// The observer could not determine the foreground window
    Unavailable(String),
}

/// Result of one sample tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Recorded(Status),
    Skipped(SkipReason),
}

/// Single writer of the activity forest
#[derive(Debug)]
pub struct Aggregator {
    forest: ActivityForest,
    segmenter: TitleSegmenter,
    attribution: AttributionPolicy,
}

impl Aggregator {
    pub fn new(
        forest: ActivityForest,
        segmenter: TitleSegmenter,
        attribution: AttributionPolicy,
    ) -> Self {
        Self {
            forest,
            segmenter,
            attribution,
        }
    }

    pub fn forest(&self) -> &ActivityForest {
        &self.forest
    }

    pub fn attribution(&self) -> AttributionPolicy {
        self.attribution
    }

    pub fn into_forest(self) -> ActivityForest {
        self.forest
    }

    /// Run one sample tick against `observer`
    ///
    /// An unavailable window is a skipped tick, not an error. Only
    /// [`ObserverError::Exhausted`] is returned, signalling the observer is done.
    pub fn tick<O>(&mut self, observer: &mut O) -> Result<TickOutcome, ObserverError>
    where
        O: WindowObserver + ?Sized,
    {
        match observer.active_window() {
            Ok(snapshot) => Ok(self.record(&snapshot)),
            Err(ObserverError::Unavailable(reason)) => {
                Ok(TickOutcome::Skipped(SkipReason::Unavailable(reason)))
            }
            Err(ObserverError::Exhausted) => Err(ObserverError::Exhausted),
        }
    }

    /// Apply one snapshot to the forest
    pub fn record(&mut self, snapshot: &WindowSnapshot) -> TickOutcome {
        if snapshot.process_name.is_empty() {
            return TickOutcome::Skipped(SkipReason::NoProcess {
                window_title: snapshot.window_title.clone(),
            });
        }

        let segments = self
            .segmenter
            .segment(&snapshot.window_title, &snapshot.process_name);

        let root = self.forest.find_or_create_root(&snapshot.process_name);
        self.forest.increment_time(root, 1);

        let leaf = self.forest.merge_path(root, segments.as_slice());
        match self.attribution {
            AttributionPolicy::Root => {}
            AttributionPolicy::Leaf => {
                if leaf != root {
                    self.forest.increment_time(leaf, 1);
                }
            }
            AttributionPolicy::Path => {
                for id in self.forest.path_from_root(leaf).into_iter().skip(1) {
                    self.forest.increment_time(id, 1);
                }
            }
        }

        TickOutcome::Recorded(Status {
            process_name: snapshot.process_name.clone(),
            window_title: snapshot.window_title.clone(),
            active_time: format_hms(self.forest.node(root).cumulative_seconds()),
            node: leaf,
        })
    }

    /// Sort the forest for display and write it to `store`
    pub fn save(&mut self, store: &ForestStore) -> persistence::Result<()> {
        self.forest.sort_descending_by_time();
        store.save(&self.forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ReplayObserver;

    fn aggregator(policy: AttributionPolicy) -> Aggregator {
        Aggregator::new(ActivityForest::new(), TitleSegmenter::default(), policy)
    }

    fn seconds_at(agg: &Aggregator, path: &[&str]) -> u64 {
        let forest = agg.forest();
        let mut id = forest.find_root(path[0]).unwrap();
        for name in &path[1..] {
            id = forest.find_child(id, name).unwrap();
        }
        forest.node(id).cumulative_seconds()
    }

    #[test]
    fn test_single_tick_credits_root_only() {
        let mut agg = aggregator(AttributionPolicy::Root);
        let outcome = agg.record(&WindowSnapshot::new("chrome", "Example – chrome"));

        match outcome {
            TickOutcome::Recorded(status) => {
                assert_eq!(status.active_time, "00:00:01");
                assert_eq!(status.window_title, "Example – chrome");
                assert_eq!(agg.forest().node(status.node).name(), "Example");
            }
            other => panic!("expected recorded tick, got {:?}", other),
        }
        assert_eq!(seconds_at(&agg, &["chrome"]), 1);
        assert_eq!(seconds_at(&agg, &["chrome", "Example"]), 0);
        let root = agg.forest().find_root("chrome").unwrap();
        assert_eq!(agg.forest().node(root).children().len(), 1);
    }

    #[test]
    fn test_empty_process_name_skips_tick() {
        let mut agg = aggregator(AttributionPolicy::Root);
        let outcome = agg.record(&WindowSnapshot::new("", "Desktop"));

        assert_eq!(
            outcome,
            TickOutcome::Skipped(SkipReason::NoProcess {
                window_title: "Desktop".to_string()
            })
        );
        assert!(agg.forest().is_empty());
    }

    #[test]
    fn test_n_ticks_give_n_seconds() {
        let mut agg = aggregator(AttributionPolicy::Root);
        for i in 0..25 {
            agg.record(&WindowSnapshot::new("code", format!("file{} – code", i % 3)));
        }
        assert_eq!(seconds_at(&agg, &["code"]), 25);
        let root = agg.forest().find_root("code").unwrap();
        assert_eq!(agg.forest().node(root).children().len(), 3);
    }

    #[test]
    fn test_leaf_policy_credits_deepest_node() {
        let mut agg = aggregator(AttributionPolicy::Leaf);
        agg.record(&WindowSnapshot::new("firefox", "Issue #1 – GitHub – Mozilla Firefox"));
        agg.record(&WindowSnapshot::new("firefox", "Issue #1 – GitHub – Mozilla Firefox"));

        assert_eq!(seconds_at(&agg, &["firefox"]), 2);
        assert_eq!(seconds_at(&agg, &["firefox", "Issue #1"]), 0);
        assert_eq!(seconds_at(&agg, &["firefox", "Issue #1", "GitHub"]), 2);
    }

    #[test]
    fn test_leaf_policy_without_segments_credits_root_once() {
        let mut agg = aggregator(AttributionPolicy::Leaf);
        agg.record(&WindowSnapshot::new("term", ""));
        assert_eq!(seconds_at(&agg, &["term"]), 1);
    }

    #[test]
    fn test_path_policy_credits_every_level() {
        let mut agg = aggregator(AttributionPolicy::Path);
        agg.record(&WindowSnapshot::new("code", "a – b"));
        agg.record(&WindowSnapshot::new("code", "a"));

        assert_eq!(seconds_at(&agg, &["code"]), 2);
        assert_eq!(seconds_at(&agg, &["code", "a"]), 2);
        assert_eq!(seconds_at(&agg, &["code", "a", "b"]), 1);
    }

    #[test]
    fn test_tick_maps_unavailable_to_skip() {
        struct Flaky;
        impl WindowObserver for Flaky {
            fn active_window(&mut self) -> Result<WindowSnapshot, ObserverError> {
                Err(ObserverError::Unavailable("process exited".into()))
            }
        }

        let mut agg = aggregator(AttributionPolicy::Root);
        let outcome = agg.tick(&mut Flaky).unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Skipped(SkipReason::Unavailable("process exited".into()))
        );
    }

    #[test]
    fn test_tick_propagates_exhaustion() {
        let mut agg = aggregator(AttributionPolicy::Root);
        let mut observer = ReplayObserver::new(vec![WindowSnapshot::new("code", "x")]);

        assert!(matches!(agg.tick(&mut observer), Ok(TickOutcome::Recorded(_))));
        assert_eq!(agg.tick(&mut observer), Err(ObserverError::Exhausted));
    }

    #[test]
    fn test_save_sorts_before_writing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ForestStore::in_dir(dir.path());
        let mut agg = aggregator(AttributionPolicy::Root);
        agg.record(&WindowSnapshot::new("rare", ""));
        for _ in 0..3 {
            agg.record(&WindowSnapshot::new("busy", ""));
        }

        agg.save(&store).unwrap();

        let first = agg.forest().roots()[0];
        assert_eq!(agg.forest().node(first).name(), "busy");
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.find("busy").unwrap() < text.find("rare").unwrap());
    }
}
