//! Vector element types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VecBlockError;

/// Numeric representation of every element in a collection's vectors.
///
/// Fixed once per collection. The integer family is intended for binary or
/// quantized vectors searched with `hamming`/`normHamming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Float32,
    Float64,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
}

impl ElementType {
    /// All supported element types.
    pub const ALL: [ElementType; 8] = [
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Int8,
        ElementType::Uint8,
        ElementType::Int16,
        ElementType::Uint16,
        ElementType::Int32,
        ElementType::Uint32,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::Int8 => "int8",
            ElementType::Uint8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::Uint16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::Uint32 => "uint32",
        }
    }

    /// Width of one encoded element in bytes.
    pub fn width(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Float32 | ElementType::Int32 | ElementType::Uint32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = VecBlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ElementType::ALL.iter().map(|t| t.as_str()).collect();
                VecBlockError::input(format!(
                    "Invalid element type '{}'. Element type should be one of {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}
