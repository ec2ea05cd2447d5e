//! Closed kernel set: registry, operator kinds and the executable plan.
//!
//! The model names operators by `OpKind`. At initialization each operator is
//! checked against the `KernelRegistry` and lowered into a `Kernel`, a sum type
//! that carries exactly the tensor ids and constant views its variant needs.
//! Execution is one exhaustive `match`, so adding an operator is a compile
//! error until every stage handles it.

pub mod activations;
pub mod fully_connected;
pub mod reshape;

use core::fmt;
use core::ops::Range;

use arrayvec::ArrayVec;

use crate::error::{ModelFault, NanoError, NanoResult};
use crate::model::{ModelDescriptor, OperatorDef, TensorKind};
use crate::tensor::{ConstTensor, TensorSlot};

/// Size of the closed operator set.
pub const MAX_KERNELS: usize = 4;

/// Every operator the engine can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    FullyConnected,
    Relu,
    Softmax,
    Reshape,
}

impl OpKind {
    pub const ALL: [OpKind; MAX_KERNELS] = [OpKind::FullyConnected, OpKind::Relu, OpKind::Softmax, OpKind::Reshape];

    /// Wire code used in the model blob.
    pub const fn code(self) -> u8 {
        match self {
            OpKind::FullyConnected => 1,
            OpKind::Relu => 2,
            OpKind::Softmax => 3,
            OpKind::Reshape => 4,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OpKind::FullyConnected),
            2 => Some(OpKind::Relu),
            3 => Some(OpKind::Softmax),
            4 => Some(OpKind::Reshape),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            OpKind::FullyConnected => "FULLY_CONNECTED",
            OpKind::Relu => "RELU",
            OpKind::Softmax => "SOFTMAX",
            OpKind::Reshape => "RESHAPE",
        }
    }

    /// Number of input tensors the operator takes.
    pub const fn input_count(self) -> usize {
        match self {
            // activation, weights, bias
            OpKind::FullyConnected => 3,
            OpKind::Relu | OpKind::Softmax | OpKind::Reshape => 1,
        }
    }

    /// Expected kind of input `slot`.
    pub const fn operand_kind(self, slot: usize) -> TensorKind {
        match (self, slot) {
            (OpKind::FullyConnected, 1 | 2) => TensorKind::Constant,
            _ => TensorKind::Activation,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicitly populated set of operators a model may use.
///
/// Mirrors a fixed-size op resolver: each kind may be added once, and a model
/// referencing a kind that was never added fails to initialize.
#[derive(Debug, Clone, Default)]
pub struct KernelRegistry {
    kinds: ArrayVec<OpKind, MAX_KERNELS>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self { kinds: ArrayVec::new() }
    }

    /// Registry with all four operators, as needed by the Iris MLP.
    pub fn all() -> Self {
        Self { kinds: ArrayVec::from(OpKind::ALL) }
    }

    pub fn add(&mut self, kind: OpKind) -> NanoResult<()> {
        if self.contains(kind) {
            return Err(NanoError::DuplicateOperator(kind));
        }
        self.kinds.try_push(kind).map_err(|_| NanoError::DuplicateOperator(kind))
    }

    /// Register by raw wire code; codes outside the closed set are rejected.
    pub fn add_code(&mut self, code: u8) -> NanoResult<()> {
        let kind = OpKind::from_code(code).ok_or(NanoError::UnsupportedOpcode(code))?;
        self.add(kind)
    }

    pub fn add_fully_connected(&mut self) -> NanoResult<()> {
        self.add(OpKind::FullyConnected)
    }

    pub fn add_relu(&mut self) -> NanoResult<()> {
        self.add(OpKind::Relu)
    }

    pub fn add_softmax(&mut self) -> NanoResult<()> {
        self.add(OpKind::Softmax)
    }

    pub fn add_reshape(&mut self) -> NanoResult<()> {
        self.add(OpKind::Reshape)
    }

    pub fn contains(&self, kind: OpKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Fails with `UnregisteredOperator` unless `kind` was added.
    pub fn resolve(&self, kind: OpKind) -> NanoResult<OpKind> {
        if self.contains(kind) {
            Ok(kind)
        } else {
            Err(NanoError::UnregisteredOperator(kind))
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = OpKind> + '_ {
        self.kinds.iter().copied()
    }
}

/// One step of the execution plan. Tensor fields index the interpreter's slots.
#[derive(Debug, Clone, Copy)]
pub enum Kernel<'m> {
    FullyConnected {
        input: usize,
        output: usize,
        weights: ConstTensor<'m>,
        bias: ConstTensor<'m>,
    },
    Relu { input: usize, output: usize },
    Softmax { input: usize, output: usize },
    Reshape { input: usize, output: usize },
}

impl<'m> Kernel<'m> {
    /// Lower operator `op` of `model` into a kernel, validating shapes.
    pub fn prepare(op: usize, def: &OperatorDef, model: &ModelDescriptor<'m>) -> NanoResult<Self> {
        match def.kind {
            OpKind::FullyConnected => fully_connected::prepare(op, def, model),
            OpKind::Relu => {
                let (input, output) = activations::prepare_elementwise(op, def, model)?;
                Ok(Kernel::Relu { input, output })
            }
            OpKind::Softmax => {
                let (input, output) = activations::prepare_elementwise(op, def, model)?;
                Ok(Kernel::Softmax { input, output })
            }
            OpKind::Reshape => reshape::prepare(op, def, model),
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Kernel::FullyConnected { .. } => OpKind::FullyConnected,
            Kernel::Relu { .. } => OpKind::Relu,
            Kernel::Softmax { .. } => OpKind::Softmax,
            Kernel::Reshape { .. } => OpKind::Reshape,
        }
    }

    /// Run the kernel over the interpreter's activation region.
    pub fn eval(&self, slots: &[TensorSlot], buffer: &mut [f32]) -> NanoResult<()> {
        match *self {
            Kernel::FullyConnected { input, output, weights, bias } => {
                let (x, y) = io_slices(slots, buffer, input, output)?;
                fully_connected::eval(x, weights, bias, y)
            }
            Kernel::Relu { input, output } => {
                let (x, y) = io_slices(slots, buffer, input, output)?;
                activations::eval_relu(x, y)
            }
            Kernel::Softmax { input, output } => {
                let row = slot(slots, input)?.shape.last();
                let (x, y) = io_slices(slots, buffer, input, output)?;
                activations::eval_softmax(x, y, row)
            }
            Kernel::Reshape { input, output } => reshape::eval(slots, input, output),
        }
    }
}

pub(crate) fn slot(slots: &[TensorSlot], index: usize) -> NanoResult<&TensorSlot> {
    slots.get(index).ok_or(NanoError::MissingStorage { tensor: index })
}

fn storage(slots: &[TensorSlot], index: usize) -> NanoResult<Range<usize>> {
    slot(slots, index)?
        .range()
        .ok_or(NanoError::MissingStorage { tensor: index })
}

/// Borrow the input tensor shared and the output tensor exclusively.
///
/// Non-aliasing operators always get disjoint regions from the planner; an
/// overlap here means the plan was corrupted and is reported, not executed.
fn io_slices<'b>(
    slots: &[TensorSlot],
    buffer: &'b mut [f32],
    input: usize,
    output: usize,
) -> NanoResult<(&'b [f32], &'b mut [f32])> {
    let src = storage(slots, input)?;
    let dst = storage(slots, output)?;
    let end = src.end.max(dst.end);
    if end > buffer.len() {
        return Err(NanoError::DimensionMismatch { expected: buffer.len(), actual: end });
    }

    if src.end <= dst.start {
        let (head, tail) = buffer.split_at_mut(dst.start);
        Ok((&head[src], &mut tail[..dst.len()]))
    } else if dst.end <= src.start {
        let (head, tail) = buffer.split_at_mut(src.start);
        Ok((&tail[..src.len()], &mut head[dst]))
    } else {
        Err(NanoError::OverlappingTensors { input, output })
    }
}

/// Shape check shared by all `prepare` functions.
pub(crate) fn expect_elements(op: usize, expected: usize, actual: usize) -> NanoResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelFault::ShapeMismatch { op, expected, actual }.into())
    }
}
