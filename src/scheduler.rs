//! Sample / autosave scheduling
//!
//! A single task drives every mutation of the forest: the sample interval,
//! the autosave interval and the shutdown signal are multiplexed with
//! `tokio::select!`, so ticks and saves never interleave. Saves are
//! synchronous and block the loop for their duration.

use crate::aggregator::{Aggregator, TickOutcome};
use crate::config::TrackerConfig;
use crate::observer::WindowObserver;
use crate::persistence::ForestStore;
use crate::render::render_text;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Counters describing one tracking run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sample ticks executed
    pub ticks: u64,
    /// Ticks that credited time
    pub recorded: u64,
    /// Ticks skipped for lack of a foreground process
    pub skipped: u64,
    /// Successful saves, including the final one
    pub saves: u64,
    /// Saves that failed and were left for the next autosave
    pub failed_saves: u64,
    /// Whether the shutdown save reached disk
    pub final_save_ok: bool,
}

/// Drives sample ticks and autosaves until shutdown
#[derive(Debug, Clone)]
pub struct Scheduler {
    sample_interval: Duration,
    autosave_interval: Duration,
    show_tree: bool,
}

impl Scheduler {
    pub fn new(sample_interval: Duration, autosave_interval: Duration) -> Self {
        Self {
            sample_interval,
            autosave_interval,
            show_tree: false,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.sample_interval(), config.autosave_interval())
    }

    /// Print the rendered forest to stdout after every save
    pub fn with_show_tree(mut self, show_tree: bool) -> Self {
        self.show_tree = show_tree;
        self
    }

    /// Run until `shutdown` resolves or the observer is exhausted
    ///
    /// Always finishes with one final save.
    pub async fn run<O, F>(
        &self,
        aggregator: &mut Aggregator,
        observer: &mut O,
        store: &ForestStore,
        shutdown: F,
    ) -> RunSummary
    where
        O: WindowObserver + ?Sized,
        F: Future<Output = ()>,
    {
        let mut summary = RunSummary::default();

        let mut sample = time::interval(self.sample_interval);
        sample.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut autosave = time::interval_at(
            Instant::now() + self.autosave_interval,
            self.autosave_interval,
        );
        autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = autosave.tick() => {
                    self.save(aggregator, store, &mut summary);
                }
                _ = sample.tick() => {
                    let outcome = match aggregator.tick(observer) {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            tracing::info!(%err, "Observer finished");
                            break;
                        }
                    };
                    summary.ticks += 1;
                    match outcome {
                        TickOutcome::Recorded(status) => {
                            summary.recorded += 1;
                            tracing::debug!(
                                process = %status.process_name,
                                title = %status.window_title,
                                time = %status.active_time,
                                depth = aggregator.forest().depth(status.node),
                                "Tick recorded"
                            );
                        }
                        TickOutcome::Skipped(reason) => {
                            summary.skipped += 1;
                            tracing::trace!(?reason, "Tick skipped");
                        }
                    }
                }
            }
        }

        summary.final_save_ok = self.save(aggregator, store, &mut summary);
        summary
    }

    fn save(
        &self,
        aggregator: &mut Aggregator,
        store: &ForestStore,
        summary: &mut RunSummary,
    ) -> bool {
        match aggregator.save(store) {
            Ok(()) => {
                summary.saves += 1;
                tracing::info!(
                    path = %store.path().display(),
                    roots = aggregator.forest().roots().len(),
                    "Activity saved"
                );
                if self.show_tree {
                    print!("{}", render_text(aggregator.forest()));
                }
                true
            }
            Err(err) => {
                summary.failed_saves += 1;
                tracing::warn!(error = %err, "Failed to save activity; will retry at next autosave");
                false
            }
        }
    }
}
