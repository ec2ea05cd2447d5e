//! Error types for the nano-iris-core library.
//!
//! Every fallible operation returns `NanoResult<T>` instead of panicking: on a
//! microcontroller a panic halts the device, and the evaluation harness has to
//! be able to tell a bad model apart from a bad sample.

use core::fmt;

use thiserror::Error;

use crate::kernels::OpKind;

/// Which phase of the engine lifecycle an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Model, registry, arena or configuration problem. Fatal at startup.
    Initialization,
    /// A kernel could not complete during `infer`. The engine stays usable.
    Execution,
    /// The caller handed over a buffer of the wrong length.
    Precondition,
}

/// Structural defects found while parsing or preparing a model blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFault {
    BadMagic,
    UnsupportedVersion(u16),
    /// The blob ends before the table or constant at `offset` is complete.
    Truncated { offset: usize },
    EmptyGraph,
    /// More tensors or operators than the fixed-capacity tables hold.
    TooLarge { count: usize, max: usize },
    UnknownOpcode(u8),
    /// Only 32-bit float tensors are executable.
    UnsupportedDataType { tensor: usize, code: u8 },
    UnknownTensorKind { tensor: usize, code: u8 },
    BadRank { tensor: usize, rank: u8 },
    TensorIndexOutOfRange { index: usize, count: usize },
    /// Operator `op` lists the wrong number of inputs for its kind.
    BadInputCount { op: usize, count: u8 },
    /// An activation is consumed by `op` before any operator produced it.
    NotYetProduced { op: usize, tensor: usize },
    /// A tensor is written by more than one operator, or the graph input is written.
    MultipleWriters { tensor: usize },
    /// A constant tensor is used where an activation is expected, or vice versa.
    WrongTensorKind { op: usize, tensor: usize },
    OutputNeverProduced { tensor: usize },
    /// The graph input or output is not an activation tensor.
    InvalidGraphTensor { tensor: usize },
    /// `prepare` found incompatible shapes for operator `op`.
    ShapeMismatch { op: usize, expected: usize, actual: usize },
    /// The graph input or output does not have the engine's fixed width.
    GraphWidth { tensor: usize, expected: usize, actual: usize },
}

impl fmt::Display for ModelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ModelFault::BadMagic => write!(f, "bad magic"),
            ModelFault::UnsupportedVersion(v) => write!(f, "unsupported version {v}"),
            ModelFault::Truncated { offset } => write!(f, "blob truncated at byte {offset}"),
            ModelFault::EmptyGraph => write!(f, "graph has no operators"),
            ModelFault::TooLarge { count, max } => write!(f, "{count} entries exceed capacity {max}"),
            ModelFault::UnknownOpcode(code) => write!(f, "unknown opcode {code}"),
            ModelFault::UnsupportedDataType { tensor, code } => {
                write!(f, "tensor {tensor} has unsupported data type {code}")
            }
            ModelFault::UnknownTensorKind { tensor, code } => {
                write!(f, "tensor {tensor} has unknown kind {code}")
            }
            ModelFault::BadRank { tensor, rank } => write!(f, "tensor {tensor} has rank {rank}"),
            ModelFault::TensorIndexOutOfRange { index, count } => {
                write!(f, "tensor index {index} out of range ({count} tensors)")
            }
            ModelFault::BadInputCount { op, count } => {
                write!(f, "operator {op} has {count} inputs")
            }
            ModelFault::NotYetProduced { op, tensor } => {
                write!(f, "operator {op} reads tensor {tensor} before it is produced")
            }
            ModelFault::MultipleWriters { tensor } => {
                write!(f, "tensor {tensor} is written more than once")
            }
            ModelFault::WrongTensorKind { op, tensor } => {
                write!(f, "operator {op} uses tensor {tensor} with the wrong kind")
            }
            ModelFault::OutputNeverProduced { tensor } => {
                write!(f, "output tensor {tensor} is never produced")
            }
            ModelFault::InvalidGraphTensor { tensor } => {
                write!(f, "graph input/output tensor {tensor} is not an activation")
            }
            ModelFault::ShapeMismatch { op, expected, actual } => {
                write!(f, "operator {op}: expected {expected} elements, got {actual}")
            }
            ModelFault::GraphWidth { tensor, expected, actual } => {
                write!(f, "graph tensor {tensor} has {actual} elements, engine expects {expected}")
            }
        }
    }
}

/// All possible error conditions in the nano-iris-core library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NanoError {
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    ArenaExhausted { requested: usize, remaining: usize },

    #[error("malformed model: {0}")]
    MalformedModel(ModelFault),

    #[error("operator {0} is not registered")]
    UnregisteredOperator(OpKind),

    #[error("operator {0} is already registered")]
    DuplicateOperator(OpKind),

    #[error("opcode {0} is not a supported operator")]
    UnsupportedOpcode(u8),

    #[error("feature {feature} has degenerate normalization parameters")]
    InvalidNormalization { feature: usize },

    #[error("sample {index} has label {label}, outside the class range")]
    InvalidLabel { index: usize, label: u8 },

    #[error("dataset has {features} feature rows but {labels} labels")]
    DatasetMismatch { features: usize, labels: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("tensor {input} and tensor {output} share storage")]
    OverlappingTensors { input: usize, output: usize },

    #[error("reshape output {output} does not alias input {input}")]
    UnaliasedReshape { input: usize, output: usize },

    #[error("tensor {tensor} has no activation storage")]
    MissingStorage { tensor: usize },

    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },
}

impl NanoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NanoError::ArenaExhausted { .. }
            | NanoError::MalformedModel(_)
            | NanoError::UnregisteredOperator(_)
            | NanoError::DuplicateOperator(_)
            | NanoError::UnsupportedOpcode(_)
            | NanoError::InvalidNormalization { .. }
            | NanoError::InvalidLabel { .. }
            | NanoError::DatasetMismatch { .. } => ErrorKind::Initialization,
            NanoError::DimensionMismatch { .. }
            | NanoError::OverlappingTensors { .. }
            | NanoError::UnaliasedReshape { .. }
            | NanoError::MissingStorage { .. } => ErrorKind::Execution,
            NanoError::InvalidInputLength { .. } => ErrorKind::Precondition,
        }
    }
}

impl From<ModelFault> for NanoError {
    fn from(fault: ModelFault) -> Self {
        NanoError::MalformedModel(fault)
    }
}

pub type NanoResult<T> = Result<T, NanoError>;
