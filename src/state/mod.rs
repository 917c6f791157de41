//! State module for tracking per-page crawl signal
//!
//! # Components
//!
//! - `MatchState`: the state of one configured keyword (uninitialized, initialized, found)
//! - `KeywordMatchSet`: all configured keywords and their states for a single page

mod keyword_state;

pub use keyword_state::{KeywordError, KeywordMatchSet, MatchState};
