//! Distance metric names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VecBlockError;

/// Named distance function used by search. Lower distance = closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    /// `1 - clamp(dot(normalize(a), normalize(b)), -1, 1)`, range [0, 2]
    #[default]
    #[serde(rename = "cosine")]
    Cosine,
    /// Euclidean distance
    #[serde(rename = "l2")]
    L2,
    /// Count of differing components
    #[serde(rename = "hamming")]
    Hamming,
    /// Hamming distance divided by dimension
    #[serde(rename = "normHamming")]
    NormHamming,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Cosine, Metric::L2, Metric::Hamming, Metric::NormHamming];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::L2 => "l2",
            Metric::Hamming => "hamming",
            Metric::NormHamming => "normHamming",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = VecBlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                VecBlockError::input(format!(
                    "Invalid metric '{}'. Metric should be one of cosine, l2, hamming, normHamming",
                    s
                ))
            })
    }
}
