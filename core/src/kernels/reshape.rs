//! Reshape kernel: a new declared shape over the same storage.
//!
//! The planner gives the output tensor the input's arena region, so there
//! is nothing to move at run time. `eval` only re-checks that invariant.

use crate::error::{NanoError, NanoResult};
use crate::model::{ModelDescriptor, OperatorDef};
use crate::tensor::TensorSlot;

use super::{expect_elements, slot, Kernel};

pub fn prepare<'m>(op: usize, def: &OperatorDef, model: &ModelDescriptor<'m>) -> NanoResult<Kernel<'m>> {
    let input = def.inputs().first().copied().unwrap_or(usize::MAX);
    let from = model.tensor(input)?.shape.total();
    let to = model.tensor(def.output)?.shape.total();
    expect_elements(op, from, to)?;
    Ok(Kernel::Reshape { input, output: def.output })
}

pub fn eval(slots: &[TensorSlot], input: usize, output: usize) -> NanoResult<()> {
    let (from, to) = (slot(slots, input)?, slot(slots, output)?);
    if from.shape.total() != to.shape.total() {
        return Err(NanoError::DimensionMismatch { expected: from.shape.total(), actual: to.shape.total() });
    }
    if from.offset.is_none() {
        return Err(NanoError::MissingStorage { tensor: input });
    }
    if from.offset != to.offset {
        return Err(NanoError::UnaliasedReshape { input, output });
    }
    Ok(())
}
