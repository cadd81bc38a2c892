//! Persisted form of an entry.
//!
//! Layout: `u32 BE buffer length` ‖ codec buffer ‖ JSON header
//! `{index, text, metadata}`. The decoded vector is never stored.

use serde::{Deserialize, Serialize};
use vecblock_types::{ElementType, Entry, Metadata, VecBlockError};

use crate::codec;

const LEN_PREFIX: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    index: i64,
    text: String,
    #[serde(default)]
    metadata: Metadata,
}

/// An entry as stored: the vector replaced by its encoded buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub index: i64,
    pub text: String,
    pub buffer: Vec<u8>,
    pub metadata: Metadata,
}

impl StoredRecord {
    /// Encode the vector of `entry` with `ty`.
    pub fn from_entry(entry: &Entry, ty: ElementType) -> Result<Self, VecBlockError> {
        Ok(Self {
            index: entry.index,
            text: entry.text.clone(),
            buffer: codec::encode(&entry.vector, ty)?,
            metadata: entry.metadata.clone(),
        })
    }

    /// Decode back to a readable entry, checking the stored dimension.
    pub fn into_entry(self, ty: ElementType, dimension: usize) -> Result<Entry, VecBlockError> {
        let vector = codec::decode(&self.buffer, ty)?;
        if vector.len() != dimension {
            return Err(VecBlockError::operations(format!(
                "Stored vector at index {} has {} elements, collection dimension is {}",
                self.index,
                vector.len(),
                dimension
            )));
        }
        Ok(Entry {
            index: self.index,
            text: self.text,
            vector,
            metadata: self.metadata,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VecBlockError> {
        let len = u32::try_from(self.buffer.len()).map_err(|_| {
            VecBlockError::operations(format!(
                "Vector buffer at index {} is too large: {} bytes",
                self.index,
                self.buffer.len()
            ))
        })?;
        let header = serde_json::to_vec(&HeaderRef {
            index: self.index,
            text: &self.text,
            metadata: &self.metadata,
        })
        .map_err(|e| {
            VecBlockError::operations(format!(
                "Failed to serialize entry at index {}: {}",
                self.index, e
            ))
        })?;

        let mut bytes = Vec::with_capacity(LEN_PREFIX + self.buffer.len() + header.len());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&self.buffer);
        bytes.extend_from_slice(&header);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VecBlockError> {
        let corrupt = |what: &str| VecBlockError::operations(format!("Corrupt entry record: {}", what));

        let prefix: [u8; LEN_PREFIX] = bytes
            .get(..LEN_PREFIX)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| corrupt("missing length prefix"))?;
        let len = u32::from_be_bytes(prefix) as usize;
        let buffer = bytes
            .get(LEN_PREFIX..LEN_PREFIX + len)
            .ok_or_else(|| corrupt("truncated vector buffer"))?;
        let header: Header = serde_json::from_slice(&bytes[LEN_PREFIX + len..])
            .map_err(|e| corrupt(&e.to_string()))?;

        Ok(Self {
            index: header.index,
            text: header.text,
            buffer: buffer.to_vec(),
            metadata: header.metadata,
        })
    }
}

#[derive(Serialize)]
struct HeaderRef<'a> {
    index: i64,
    text: &'a str,
    metadata: &'a Metadata,
}
