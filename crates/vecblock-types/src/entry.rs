//! Readable entries and search hits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VecBlockError;

/// Per-entry metadata: field name to scalar or array value.
pub type Metadata = serde_json::Map<String, Value>;

/// One record of a collection, in readable form.
///
/// The persisted form replaces `vector` with an encoded buffer; the two are
/// never held together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Caller-supplied key, unique within a collection
    pub index: i64,
    /// Source text the vector was derived from
    pub text: String,
    /// Vector components, `dimension` of them
    pub vector: Vec<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Entry {
    pub fn new(index: i64, text: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            index,
            text: text.into(),
            vector,
            metadata: Metadata::new(),
        }
    }

    /// Set metadata (builder pattern).
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Parse an entry from a JSON object `{index, text, vector, metadata?}`.
    pub fn from_json(value: Value) -> Result<Self, VecBlockError> {
        if !value.is_object() {
            return Err(VecBlockError::input("Entry should be a JSON object"));
        }
        serde_json::from_value(value)
            .map_err(|e| VecBlockError::input(format!("Invalid entry: {}", e)))
    }

    /// Build entries from parallel columns.
    ///
    /// An empty `metadata` column means every entry gets empty metadata.
    /// All non-empty columns must have the same length.
    pub fn zip_columns(
        indices: Vec<i64>,
        texts: Vec<String>,
        vectors: Vec<Vec<f64>>,
        metadata: Vec<Metadata>,
    ) -> Result<Vec<Entry>, VecBlockError> {
        let n = indices.len();
        let metadata = if metadata.is_empty() {
            vec![Metadata::new(); n]
        } else {
            metadata
        };
        if texts.len() != n || vectors.len() != n || metadata.len() != n {
            return Err(VecBlockError::input(format!(
                "All inputs should have the same length (indices={}, texts={}, vectors={}, metadata={})",
                n,
                texts.len(),
                vectors.len(),
                metadata.len()
            )));
        }

        Ok(indices
            .into_iter()
            .zip(texts)
            .zip(vectors)
            .zip(metadata)
            .map(|(((index, text), vector), metadata)| Entry {
                index,
                text,
                vector,
                metadata,
            })
            .collect())
    }
}

/// One slot of a search result.
///
/// `entry` is `None` for an unfilled slot, whose distance is `+inf`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub entry: Option<Entry>,
    pub distance: f64,
}

impl SearchHit {
    /// An unfilled slot.
    pub fn sentinel() -> Self {
        Self {
            entry: None,
            distance: f64::INFINITY,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.entry.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_from_json_defaults_metadata() {
        let entry = Entry::from_json(json!({"index": 3, "text": "hi", "vector": [1.0, 2.0]})).unwrap();
        assert_eq!(entry.index, 3);
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_object_metadata() {
        let err = Entry::from_json(json!({
            "index": 1, "text": "a", "vector": [1.0], "metadata": [1, 2]
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_from_json_rejects_non_integer_index() {
        let err = Entry::from_json(json!({"index": 1.5, "text": "a", "vector": [1.0]})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_zip_columns() {
        let entries = Entry::zip_columns(
            vec![1, 2],
            vec!["a".into(), "b".into()],
            vec![vec![1.0], vec![2.0]],
            vec![],
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "b");
        assert!(entries[1].metadata.is_empty());
    }

    #[test]
    fn test_zip_columns_length_mismatch() {
        let err = Entry::zip_columns(vec![1, 2], vec!["a".into()], vec![vec![1.0]], vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_sentinel_hit() {
        let hit = SearchHit::sentinel();
        assert!(hit.is_sentinel());
        assert!(hit.distance.is_infinite());
    }
}
