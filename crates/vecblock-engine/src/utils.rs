//! Helpers for callers that produce entries.

use chrono::Utc;
use rand::Rng;

/// Map each component to `1.0` when strictly positive, otherwise `0.0`.
///
/// Useful to store embeddings in a `uint8` collection searched with
/// `hamming` or `normHamming`.
pub fn binarize(vector: &[f64]) -> Vec<f64> {
    vector
        .iter()
        .map(|&x| if x > 0.0 { 1.0 } else { 0.0 })
        .collect()
}

/// A fresh entry index: current time in milliseconds followed by three
/// random decimal digits.
///
/// Unique with high probability across calls; the engine itself never
/// generates indexes.
pub fn unique_index() -> i64 {
    let millis = Utc::now().timestamp_millis();
    let salt: i64 = rand::rng().random_range(0..1000);
    millis.saturating_mul(1000).saturating_add(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binarize() {
        assert_eq!(
            binarize(&[0.3, -0.1, 0.0, 2.0]),
            vec![1.0, 0.0, 0.0, 1.0]
        );
        assert!(binarize(&[]).is_empty());
    }

    #[test]
    fn test_unique_index_is_recent_with_bounded_salt() {
        for _ in 0..50 {
            let before = Utc::now().timestamp_millis();
            let index = unique_index();
            let after = Utc::now().timestamp_millis();

            let millis = index.div_euclid(1000);
            assert!(millis >= before && millis <= after, "index {}", index);
            assert!((0..1000).contains(&index.rem_euclid(1000)));
        }
    }
}
