// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary layout for persisted embeddings and vector similarity.
//!
//! A serialized vector is a 4-byte little-endian element count followed by
//! that many little-endian IEEE-754 `f32` values, in order.

use cortex_core::CortexError;
use tracing::warn;

const COUNT_BYTES: usize = 4;
const FLOAT_BYTES: usize = 4;

/// Encodes a vector into its self-describing byte form.
pub fn serialize(vector: &[f32]) -> Vec<u8> {
    let count = u32::try_from(vector.len()).unwrap_or(u32::MAX);
    let mut bytes = Vec::with_capacity(COUNT_BYTES + vector.len() * FLOAT_BYTES);
    bytes.extend_from_slice(&count.to_le_bytes());
    for value in vector.iter().take(count as usize) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes bytes produced by [`serialize`].
///
/// Truncated or padded input is rejected rather than yielding a vector of
/// the wrong length.
pub fn deserialize(bytes: &[u8]) -> Result<Vec<f32>, CortexError> {
    let Some((header, body)) = bytes.split_first_chunk::<COUNT_BYTES>() else {
        return Err(CortexError::Decode(format!(
            "embedding payload of {} bytes is shorter than its header",
            bytes.len()
        )));
    };
    let count = u32::from_le_bytes(*header) as usize;
    let expected = count
        .checked_mul(FLOAT_BYTES)
        .ok_or_else(|| CortexError::Decode(format!("element count {count} overflows")))?;
    if body.len() != expected {
        return Err(CortexError::Decode(format!(
            "embedding declares {count} elements ({expected} bytes) but carries {} bytes",
            body.len()
        )));
    }

    let vector = body
        .chunks_exact(FLOAT_BYTES)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(vector)
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns exactly `0.0` when either vector has zero magnitude or the
/// lengths differ. A length mismatch is logged as an anomaly.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!(
            left = a.len(),
            right = b.len(),
            "cosine similarity on vectors of different length"
        );
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}
