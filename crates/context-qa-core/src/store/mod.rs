//! The embedding store: passage key → embedding vector.
//!
//! Built once per corpus snapshot by the indexing pass, persisted with
//! [`EmbeddingStore::save`], and reopened read-only with
//! [`EmbeddingStore::load`]. All vectors share one dimensionality, which is
//! established by the first vector written (or up front with
//! [`EmbeddingStore::with_dims`]).
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`put_all`](EmbeddingStore::put_all) | Record one vector per key, all-or-nothing |
//! | [`get_all`](EmbeddingStore::get_all) | Read-only view of the full mapping |
//! | [`save`](EmbeddingStore::save) | Write the CSV file described in [`tabular`] |
//! | [`load`](EmbeddingStore::load) | Rebuild a store from such a file |

pub mod tabular;

use std::collections::BTreeMap;

use crate::embedding::is_unit_norm;
use crate::error::{Error, Result};
use crate::models::PassageKey;

/// In-memory mapping from passage key to embedding vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingStore {
    vectors: BTreeMap<PassageKey, Vec<f32>>,
    dims: Option<usize>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store that only accepts `dims`-component vectors.
    pub fn with_dims(dims: usize) -> Self {
        Self {
            vectors: BTreeMap::new(),
            dims: (dims > 0).then_some(dims),
        }
    }

    /// Record one vector per key, overwriting existing entries.
    ///
    /// Every vector is validated before anything is written: on error the
    /// store is exactly as it was before the call.
    pub fn put_all(&mut self, keys: Vec<PassageKey>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if keys.len() != vectors.len() {
            return Err(Error::CountMismatch {
                keys: keys.len(),
                vectors: vectors.len(),
            });
        }

        let mut dims = self.dims;
        for (key, vector) in keys.iter().zip(vectors.iter()) {
            if vector.is_empty() {
                return Err(Error::EmptyVector { key: key.clone() });
            }
            if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
                return Err(Error::NonFinite {
                    key: key.clone(),
                    index,
                });
            }
            match dims {
                Some(expected) if expected != vector.len() => {
                    return Err(Error::DimensionMismatch {
                        key: key.clone(),
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => dims = Some(vector.len()),
            }
        }

        self.dims = dims;
        for (key, vector) in keys.into_iter().zip(vectors) {
            self.vectors.insert(key, vector);
        }
        Ok(())
    }

    pub fn get(&self, key: &PassageKey) -> Option<&[f32]> {
        self.vectors.get(key).map(Vec::as_slice)
    }

    /// The full mapping, ordered by key.
    pub fn get_all(&self) -> &BTreeMap<PassageKey, Vec<f32>> {
        &self.vectors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PassageKey, &[f32])> {
        self.vectors.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// The established dimensionality, if any vector (or `with_dims`) set it.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn contains(&self, key: &PassageKey) -> bool {
        self.vectors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Number of stored vectors that are not unit length.
    pub fn non_unit_count(&self) -> usize {
        self.vectors.values().filter(|v| !is_unit_norm(v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(t: &str) -> PassageKey {
        PassageKey::new(t, "Summary")
    }

    #[test]
    fn test_put_all_establishes_dims() {
        let mut store = EmbeddingStore::new();
        assert_eq!(store.dims(), None);
        store
            .put_all(vec![key("a"), key("b")], vec![vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        assert_eq!(store.dims(), Some(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key("b")), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_put_all_overwrites() {
        let mut store = EmbeddingStore::new();
        store.put_all(vec![key("a")], vec![vec![1.0, 0.0]]).unwrap();
        store.put_all(vec![key("a")], vec![vec![0.0, 1.0]]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("a")), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_unchanged() {
        let mut store = EmbeddingStore::new();
        store
            .put_all(vec![key("a")], vec![vec![1.0, 0.0, 0.0]])
            .unwrap();
        let before = store.clone();

        let err = store
            .put_all(vec![key("a"), key("b")], vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0]])
            .unwrap_err();
        match err {
            Error::DimensionMismatch {
                key: k,
                expected,
                actual,
            } => {
                assert_eq!(k, key("b"));
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store, before);
        assert_eq!(store.get(&key("a")), Some(&[1.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_mismatch_within_first_batch() {
        let mut store = EmbeddingStore::new();
        let err = store
            .put_all(vec![key("a"), key("b")], vec![vec![1.0], vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(store.is_empty());
        assert_eq!(store.dims(), None);
    }

    #[test]
    fn test_with_dims_rejects_other_lengths() {
        let mut store = EmbeddingStore::with_dims(4);
        let err = store.put_all(vec![key("a")], vec![vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, .. }));
    }

    #[test]
    fn test_count_mismatch() {
        let mut store = EmbeddingStore::new();
        let err = store.put_all(vec![key("a"), key("b")], vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::CountMismatch { keys: 2, vectors: 1 }));
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut store = EmbeddingStore::new();
        let err = store.put_all(vec![key("a")], vec![vec![]]).unwrap_err();
        assert!(matches!(err, Error::EmptyVector { .. }));
    }

    #[test]
    fn test_non_finite_component_rejected() {
        let mut store = EmbeddingStore::new();
        store.put_all(vec![key("a")], vec![vec![1.0, 0.0]]).unwrap();
        let err = store
            .put_all(vec![key("b"), key("c")], vec![vec![0.0, 1.0], vec![f32::NAN, 0.0]])
            .unwrap_err();
        assert!(matches!(err, Error::NonFinite { index: 0, .. }));
        let err = store
            .put_all(vec![key("d")], vec![vec![0.5, f32::INFINITY]])
            .unwrap_err();
        assert!(matches!(err, Error::NonFinite { index: 1, .. }));
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&key("b")));
    }

    #[test]
    fn test_non_unit_count() {
        let mut store = EmbeddingStore::new();
        store
            .put_all(vec![key("a"), key("b")], vec![vec![1.0, 0.0], vec![3.0, 4.0]])
            .unwrap();
        assert_eq!(store.non_unit_count(), 1);
    }
}
