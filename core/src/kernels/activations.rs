//! Shape-preserving activation kernels: ReLU and Softmax.

use crate::error::{NanoError, NanoResult};
use crate::math;
use crate::model::{ModelDescriptor, OperatorDef};

use super::expect_elements;

/// Validate a one-input, shape-preserving operator and return its tensor ids.
pub fn prepare_elementwise(op: usize, def: &OperatorDef, model: &ModelDescriptor<'_>) -> NanoResult<(usize, usize)> {
    let input = def.inputs().first().copied().unwrap_or(usize::MAX);
    let x = model.tensor(input)?.shape;
    let y = model.tensor(def.output)?.shape;
    expect_elements(op, x.total(), y.total())?;
    expect_elements(op, x.last(), y.last())?;
    Ok((input, def.output))
}

pub fn eval_relu(input: &[f32], output: &mut [f32]) -> NanoResult<()> {
    if input.len() != output.len() {
        return Err(NanoError::DimensionMismatch { expected: input.len(), actual: output.len() });
    }
    output.copy_from_slice(input);
    math::relu_f32(output);
    Ok(())
}

/// Softmax over each row of `row` elements (the innermost dimension).
pub fn eval_softmax(input: &[f32], output: &mut [f32], row: usize) -> NanoResult<()> {
    if input.len() != output.len() {
        return Err(NanoError::DimensionMismatch { expected: input.len(), actual: output.len() });
    }
    if row == 0 || input.len() % row != 0 {
        return Err(NanoError::DimensionMismatch { expected: row, actual: input.len() });
    }
    for (logits, probs) in input.chunks_exact(row).zip(output.chunks_exact_mut(row)) {
        math::softmax_f32(logits, probs)?;
    }
    Ok(())
}
