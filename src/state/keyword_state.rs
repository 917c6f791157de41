/// Keyword match tracking for page scoring
///
/// This module defines the per-keyword match state and the set that tracks it
/// while a page's text is scanned.
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised by keyword state transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword {0:?} was never initialized")]
    Uninitialized(String),
}

/// Represents the match state of a single configured keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchState {
    /// Keyword is not part of the configured set
    Uninitialized,

    /// Keyword is configured but has not been seen in the page yet
    Initialized,

    /// Keyword occurred at least once in the page text
    Found,
}

impl MatchState {
    /// Returns true if the keyword was seen in the page
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found)
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Found => "found",
        };
        write!(f, "{}", name)
    }
}

/// Case-normalized keyword → match state mapping
///
/// Keys are stored lowercased. States only ever move from `Initialized` to
/// `Found`; re-initializing a found keyword keeps it found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatchSet {
    states: BTreeMap<String, MatchState>,
}

impl KeywordMatchSet {
    /// Creates a set with every given keyword in the `Initialized` state
    ///
    /// Blank keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for keyword in keywords {
            set.init_keyword(keyword.as_ref());
        }
        set
    }

    /// Registers a keyword, leaving it untouched if it is already tracked
    pub fn init_keyword(&mut self, keyword: &str) {
        let key = keyword.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.states.entry(key).or_insert(MatchState::Initialized);
    }

    /// Looks up a keyword case-insensitively
    ///
    /// Returns `None` when the keyword is not part of the configured set.
    pub fn get(&self, keyword: &str) -> Option<MatchState> {
        self.states.get(&keyword.to_lowercase()).copied()
    }

    /// Returns the state of a keyword, `Uninitialized` for unknown ones
    pub fn state(&self, keyword: &str) -> MatchState {
        self.get(keyword).unwrap_or(MatchState::Uninitialized)
    }

    /// Marks a configured keyword as found
    ///
    /// Idempotent for keywords that are already found.
    pub fn set_found(&mut self, keyword: &str) -> Result<(), KeywordError> {
        match self.states.get_mut(&keyword.to_lowercase()) {
            Some(state) => {
                *state = MatchState::Found;
                Ok(())
            }
            None => Err(KeywordError::Uninitialized(keyword.to_string())),
        }
    }

    /// Feeds one token of page text; returns true if it matched a keyword
    ///
    /// Tokens that match no configured keyword are ignored.
    pub fn observe(&mut self, token: &str) -> bool {
        self.set_found(token).is_ok()
    }

    /// Number of keywords in the `Found` state
    pub fn score(&self) -> usize {
        self.states.values().filter(|s| s.is_found()).count()
    }

    /// Keywords in the `Found` state, in sorted order
    pub fn found_keywords(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|(_, state)| state.is_found())
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
