//! Fully-connected (dense) kernel.
//!
//! Weights are a constant `[units × depth]` matrix read in place from the
//! model blob; `depth` must equal the element count of the input activation.

use crate::error::{ModelFault, NanoResult};
use crate::math;
use crate::model::{ModelDescriptor, OperatorDef};
use crate::tensor::ConstTensor;

use super::{expect_elements, Kernel};

pub fn prepare<'m>(op: usize, def: &OperatorDef, model: &ModelDescriptor<'m>) -> NanoResult<Kernel<'m>> {
    let &[input, weights_index, bias_index] = def.inputs() else {
        return Err(ModelFault::BadInputCount { op, count: def.inputs().len() as u8 }.into());
    };
    let constant = |tensor: usize| -> NanoResult<ConstTensor<'m>> {
        model.tensor(tensor)?
            .constant()
            .ok_or_else(|| ModelFault::WrongTensorKind { op, tensor }.into())
    };
    let weights = constant(weights_index)?;
    let bias = constant(bias_index)?;

    let shape = weights.shape();
    expect_elements(op, 2, shape.ndim)?;
    let (units, depth) = (shape.dims[0], shape.dims[1]);

    expect_elements(op, depth, model.tensor(input)?.shape.total())?;
    expect_elements(op, units, bias.len())?;
    expect_elements(op, units, model.tensor(def.output)?.shape.total())?;

    Ok(Kernel::FullyConnected { input, output: def.output, weights, bias })
}

pub fn eval(input: &[f32], weights: ConstTensor<'_>, bias: ConstTensor<'_>, output: &mut [f32]) -> NanoResult<()> {
    math::fully_connected_f32(input, weights.values(), bias.values(), output)
}
