//! Vector distance functions.
//!
//! Every function takes two vectors of the same length and returns a
//! distance where lower means closer. Callers validate lengths first.

use vecblock_types::Metric;

/// Distance between `a` and `b` under `metric`.
pub fn distance(metric: Metric, a: &[f64], b: &[f64]) -> f64 {
    match metric {
        Metric::Cosine => cosine(a, b),
        Metric::L2 => l2(a, b),
        Metric::Hamming => hamming(a, b),
        Metric::NormHamming => norm_hamming(a, b),
    }
}

/// Cosine distance: `1 - clamp(cos(a, b), -1, 1)`, in [0, 2].
///
/// A zero-norm operand has similarity 0, so its distance to anything is 1.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Euclidean distance.
pub fn l2(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Number of positions where the components differ.
pub fn hamming(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter().zip(b).filter(|(x, y)| x != y).count() as f64
}

/// Hamming distance divided by the dimension.
pub fn norm_hamming(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    hamming(a, b) / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert_eq!(cosine(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), 1.0);
        assert_eq!(cosine(&[1.0, 0.0], &[-1.0, 0.0]), 2.0);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let d = cosine(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
        assert_eq!(cosine(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_cosine_stays_in_range() {
        // Rounding can push the raw ratio just past 1
        let v = [0.1, 0.2, 0.3, 0.4, 0.5];
        let d = cosine(&v, &v);
        assert!((0.0..=2.0).contains(&d));
    }

    #[test]
    fn test_l2() {
        assert_eq!(l2(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_hamming_family() {
        let a = [1.0, 0.0, 1.0, 1.0];
        let b = [1.0, 1.0, 0.0, 1.0];
        assert_eq!(hamming(&a, &b), 2.0);
        assert_eq!(norm_hamming(&a, &b), 0.5);
        assert_eq!(distance(Metric::NormHamming, &a, &a), 0.0);
    }

    #[test]
    fn test_dispatch() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(distance(Metric::L2, &a, &b), 5.0);
        assert_eq!(distance(Metric::Hamming, &a, &b), 2.0);
        assert_eq!(distance(Metric::Cosine, &a, &b), 1.0);
    }
}
