//! f32 math primitives for inference.
//!
//! Plain loops over slices, no SIMD and no data-dependent iteration counts:
//! the run time of every function is fixed by its buffer lengths. `exp` comes
//! from `libm` because `core` has no float transcendentals.

use crate::error::{NanoError, NanoResult};

// =============================================================================
// Matrix Operations
// =============================================================================

/// Fully-connected transform: `output[j] = Σ_i input[i] * weights[j][i] + bias[j]`.
///
/// `weights` yields a row-major `[output.len() × input.len()]` matrix and
/// `bias` one value per output unit. Products are summed in input order and
/// the bias is added last, the same order the exporter uses.
pub fn fully_connected_f32<W, B>(
    input: &[f32],
    mut weights: W,
    mut bias: B,
    output: &mut [f32],
) -> NanoResult<()>
where
    W: ExactSizeIterator<Item = f32>,
    B: ExactSizeIterator<Item = f32>,
{
    let expected = input.len() * output.len();
    if weights.len() != expected {
        return Err(NanoError::DimensionMismatch { expected, actual: weights.len() });
    }
    if bias.len() != output.len() {
        return Err(NanoError::DimensionMismatch { expected: output.len(), actual: bias.len() });
    }

    for out in output.iter_mut() {
        let mut acc = 0.0f32;
        for (&x, w) in input.iter().zip(weights.by_ref()) {
            acc += x * w;
        }
        *out = acc + bias.next().unwrap_or(0.0);
    }
    Ok(())
}

// =============================================================================
// Activation Functions
// =============================================================================

/// ReLU activation (in-place). `max(0, x)`; NaN passes through unchanged.
pub fn relu_f32(data: &mut [f32]) {
    for val in data.iter_mut() {
        if *val < 0.0 {
            *val = 0.0;
        }
    }
}

/// Numerically stable softmax of `logits` into `output`.
///
/// The maximum is subtracted before exponentiation so `exp` never overflows.
pub fn softmax_f32(logits: &[f32], output: &mut [f32]) -> NanoResult<()> {
    if logits.len() != output.len() {
        return Err(NanoError::DimensionMismatch {
            expected: logits.len(),
            actual: output.len(),
        });
    }
    if logits.is_empty() {
        return Ok(());
    }

    let mut max_val = logits[0];
    for &v in logits.iter().skip(1) {
        if v > max_val {
            max_val = v;
        }
    }

    let mut sum = 0.0f32;
    for (out, &v) in output.iter_mut().zip(logits) {
        *out = libm::expf(v - max_val);
        sum += *out;
    }
    for out in output.iter_mut() {
        *out /= sum;
    }
    Ok(())
}

// =============================================================================
// Classification helpers
// =============================================================================

/// Index of the largest score. Ties go to the lowest index.
///
/// Uses strict `>` so an equal later score never displaces an earlier one.
pub fn argmax_f32(data: &[f32]) -> NanoResult<usize> {
    if data.is_empty() {
        return Err(NanoError::InvalidInputLength { expected: 1, actual: 0 });
    }

    let mut max_idx = 0;
    let mut max_val = data[0];
    for (i, &val) in data.iter().enumerate().skip(1) {
        if val > max_val {
            max_val = val;
            max_idx = i;
        }
    }
    Ok(max_idx)
}

/// Standard-score normalization: `out[i] = (raw[i] - means[i]) / stds[i]`.
///
/// Pure: a zero or non-finite std yields non-finite output, it is not
/// patched up here. Use `Normalizer` for validated parameters.
pub fn normalize_f32(raw: &[f32], means: &[f32], stds: &[f32], out: &mut [f32]) -> NanoResult<()> {
    let n = out.len();
    for len in [raw.len(), means.len(), stds.len()] {
        if len != n {
            return Err(NanoError::InvalidInputLength { expected: n, actual: len });
        }
    }
    for (((o, &x), &mean), &std) in out.iter_mut().zip(raw).zip(means).zip(stds) {
        *o = (x - mean) / std;
    }
    Ok(())
}
