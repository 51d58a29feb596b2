//! Sloth Tracker - foreground application time tracking
//!
//! This library samples the active window at a fixed interval, splits its
//! title into context segments, merges them into a per-process activity
//! tree and persists that tree as JSON between runs.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod observer;
pub mod persistence;
pub mod render;
pub mod scheduler;
pub mod segmenter;
pub mod tree;
