//! Vector codec.
//!
//! Converts numeric vectors to and from fixed-width byte buffers. Elements are
//! laid out little-endian, `ElementType::width()` bytes each, with no header.
//! This is the only module that knows the on-disk vector representation.

use vecblock_types::{ElementType, VecBlockError};

/// Whether `value` survives a conversion to `ty` and back unchanged.
pub fn is_representable(value: f64, ty: ElementType) -> bool {
    if value.is_nan() {
        return false;
    }
    match ty {
        ElementType::Float64 => true,
        ElementType::Float32 => (value as f32) as f64 == value,
        ElementType::Int8 => is_integral_in(value, i8::MIN as f64, i8::MAX as f64),
        ElementType::Uint8 => is_integral_in(value, 0.0, u8::MAX as f64),
        ElementType::Int16 => is_integral_in(value, i16::MIN as f64, i16::MAX as f64),
        ElementType::Uint16 => is_integral_in(value, 0.0, u16::MAX as f64),
        ElementType::Int32 => is_integral_in(value, i32::MIN as f64, i32::MAX as f64),
        ElementType::Uint32 => is_integral_in(value, 0.0, u32::MAX as f64),
    }
}

fn is_integral_in(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value >= min && value <= max
}

/// Check that every element of `vector` is representable in `ty`.
pub fn check_elements(vector: &[f64], ty: ElementType) -> Result<(), VecBlockError> {
    match vector
        .iter()
        .position(|&value| !is_representable(value, ty))
    {
        Some(pos) => Err(VecBlockError::operations(format!(
            "Vector element {} at position {} is not representable as {}",
            vector[pos], pos, ty
        ))),
        None => Ok(()),
    }
}

/// Encode a vector into the byte layout of `ty`.
pub fn encode(vector: &[f64], ty: ElementType) -> Result<Vec<u8>, VecBlockError> {
    check_elements(vector, ty)?;

    let mut buf = Vec::with_capacity(vector.len() * ty.width());
    for &value in vector {
        match ty {
            ElementType::Float32 => buf.extend_from_slice(&(value as f32).to_le_bytes()),
            ElementType::Float64 => buf.extend_from_slice(&value.to_le_bytes()),
            ElementType::Int8 => buf.extend_from_slice(&(value as i8).to_le_bytes()),
            ElementType::Uint8 => buf.push(value as u8),
            ElementType::Int16 => buf.extend_from_slice(&(value as i16).to_le_bytes()),
            ElementType::Uint16 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
            ElementType::Int32 => buf.extend_from_slice(&(value as i32).to_le_bytes()),
            ElementType::Uint32 => buf.extend_from_slice(&(value as u32).to_le_bytes()),
        }
    }
    Ok(buf)
}

/// Decode a buffer produced by [`encode`] with the same element type.
pub fn decode(buf: &[u8], ty: ElementType) -> Result<Vec<f64>, VecBlockError> {
    let width = ty.width();
    if buf.len() % width != 0 {
        return Err(VecBlockError::operations(format!(
            "Buffer of {} bytes is not a whole number of {} elements",
            buf.len(),
            ty
        )));
    }

    let vector = buf
        .chunks_exact(width)
        .map(|chunk| match ty {
            ElementType::Float32 => f32::from_le_bytes(fixed(chunk)) as f64,
            ElementType::Float64 => f64::from_le_bytes(fixed(chunk)),
            ElementType::Int8 => i8::from_le_bytes(fixed(chunk)) as f64,
            ElementType::Uint8 => chunk[0] as f64,
            ElementType::Int16 => i16::from_le_bytes(fixed(chunk)) as f64,
            ElementType::Uint16 => u16::from_le_bytes(fixed(chunk)) as f64,
            ElementType::Int32 => i32::from_le_bytes(fixed(chunk)) as f64,
            ElementType::Uint32 => u32::from_le_bytes(fixed(chunk)) as f64,
        })
        .collect();
    Ok(vector)
}

// `chunks_exact(width)` guarantees the slice length matches N
fn fixed<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut raw = [0u8; N];
    raw.copy_from_slice(chunk);
    raw
}
