//! Key encoding and decoding for storage layer.
//!
//! Entry keys are the 8-byte big-endian form of the `i64` index with the
//! sign bit flipped, so byte order equals numeric order. Config keys are
//! the raw collection name.

use crate::error::StorageError;

/// Key of the schema version counter in the default column family
pub const SCHEMA_VERSION_KEY: &[u8] = b"meta:schema_version";

/// Key for an entry in a collection table
/// Format: 8 bytes, big-endian, sign bit flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexKey {
    pub index: i64,
}

impl IndexKey {
    pub const LEN: usize = 8;

    pub fn new(index: i64) -> Self {
        Self { index }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        ((self.index as u64) ^ (1 << 63)).to_be_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let raw: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            StorageError::Key(format!(
                "Invalid index key length: expected {}, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        let index = (u64::from_be_bytes(raw) ^ (1 << 63)) as i64;
        Ok(Self { index })
    }

    /// Inclusive lower bound of every index key
    pub fn range_start() -> Vec<u8> {
        vec![0x00; Self::LEN]
    }

    /// Exclusive upper bound of every index key (one byte longer than any key)
    pub fn range_end() -> Vec<u8> {
        vec![0xFF; Self::LEN + 1]
    }
}

/// Key for a collection configuration record
/// Format: UTF-8 collection name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    pub collection: String,
}

impl ConfigKey {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.collection.as_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_index_key_roundtrip_extremes() {
        for index in [i64::MIN, -1, 0, 1, i64::MAX] {
            let key = IndexKey::new(index);
            assert_eq!(IndexKey::from_bytes(&key.to_bytes()).unwrap(), key);
        }
    }

    #[test]
    fn test_index_key_order_matches_numeric_order() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let a: i64 = rng.random();
            let b: i64 = rng.random();
            assert_eq!(
                a.cmp(&b),
                IndexKey::new(a).to_bytes().cmp(&IndexKey::new(b).to_bytes()),
                "order differs for {} vs {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_index_key_bad_length() {
        assert!(IndexKey::from_bytes(b"short").is_err());
    }

    #[test]
    fn test_range_bounds_cover_all_keys() {
        let start = IndexKey::range_start();
        let end = IndexKey::range_end();
        for index in [i64::MIN, 0, i64::MAX] {
            let key = IndexKey::new(index).to_bytes();
            assert!(key.as_slice() >= start.as_slice());
            assert!(key.as_slice() < end.as_slice());
        }
    }

    #[test]
    fn test_config_key_roundtrip() {
        let key = ConfigKey::new("docs");
        assert_eq!(ConfigKey::from_bytes(&key.to_bytes()).unwrap(), key);
    }
}
