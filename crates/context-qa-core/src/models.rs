//! Core data types that flow through the retrieval pipeline.
//!
//! A [`Corpus`] is the read-only table of [`Passage`] rows produced by the
//! (external) corpus preparation pass. Ranking produces
//! [`RankedCandidate`]s; assembly produces an [`AssembledContext`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Composite identity of a passage: the document title and section heading.
///
/// Ordering is lexicographic on `(title, heading)`, which is what the ranker
/// uses to break score ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PassageKey {
    pub title: String,
    pub heading: String,
}

impl PassageKey {
    pub fn new(title: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            heading: heading.into(),
        }
    }
}

impl fmt::Display for PassageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.title, self.heading)
    }
}

/// A titled, headed unit of source text with a precomputed token count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub key: PassageKey,
    pub content: String,
    pub tokens: usize,
}

impl Passage {
    pub fn new(
        title: impl Into<String>,
        heading: impl Into<String>,
        content: impl Into<String>,
        tokens: usize,
    ) -> Self {
        Self {
            key: PassageKey::new(title, heading),
            content: content.into(),
            tokens,
        }
    }
}

/// The corpus table: passages in their original row order, indexed by key.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    passages: Vec<Passage>,
    index: HashMap<PassageKey, usize>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate `(title, heading)` keys.
    pub fn from_passages(passages: Vec<Passage>) -> Result<Self> {
        let mut index = HashMap::with_capacity(passages.len());
        for (i, p) in passages.iter().enumerate() {
            if index.insert(p.key.clone(), i).is_some() {
                return Err(Error::DuplicatePassage { key: p.key.clone() });
            }
        }
        Ok(Self { passages, index })
    }

    pub fn get(&self, key: &PassageKey) -> Option<&Passage> {
        self.index.get(key).map(|&i| &self.passages[i])
    }

    pub fn contains(&self, key: &PassageKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// A passage key scored against one query. Produced fresh per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub score: f32,
    pub key: PassageKey,
}

/// The passages selected for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledContext {
    /// Separator-prefixed, newline-flattened passage texts in rank order.
    pub fragments: Vec<String>,
    /// Sum of `tokens + separator_tokens` over the included passages.
    pub used_tokens: usize,
    /// Keys of the included passages, parallel to `fragments`.
    pub keys: Vec<PassageKey>,
}

impl AssembledContext {
    /// The fragments concatenated with no additional delimiter.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
