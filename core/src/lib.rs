//! # nano-iris-core: fixed-memory f32 inference engine
//!
//! A `no_std` library that runs a small feed-forward classifier on a
//! microcontroller and scores it against a labelled dataset, without a heap.
//!
//! ## Architecture
//!
//! - **Model Descriptor**: zero-copy view over a build-time embedded blob
//! - **Kernel Registry**: closed set of FullyConnected, ReLU, Softmax, Reshape
//! - **Arena Allocator**: every runtime buffer carved once from `&mut [u8]`
//! - **Interpreter**: validated plan, repeated `infer` with no allocation
//! - **Evaluation**: normalize → infer → argmax → confusion matrix
//!
//! ## Usage
//!
//! ```ignore
//! use nano_iris_core::*;
//!
//! let model = ModelDescriptor::parse(MODEL_BLOB)?;
//! let registry = KernelRegistry::all();
//!
//! let mut scratch = [0u8; TENSOR_ARENA_SIZE];
//! let mut interpreter = Interpreter::initialize(&model, &registry, Arena::new(&mut scratch))?;
//!
//! let normalizer = Normalizer::new(MEANS, STDS)?;
//! let dataset = Dataset::new(&FEATURES, &LABELS)?;
//! let result = evaluate(&mut interpreter, &dataset, &normalizer)?;
//! ```

#![no_std]

pub mod arena;
pub mod error;
pub mod evaluation;
pub mod interpreter;
pub mod kernels;
pub mod math;
pub mod model;
pub mod normalization;
pub mod tensor;

/// Input features per sample.
pub const NUM_FEATURES: usize = 4;
/// Output classes.
pub const NUM_CLASSES: usize = 3;
/// Default arena size; comfortably above what the Iris MLP needs.
pub const TENSOR_ARENA_SIZE: usize = 8 * 1024;

pub use arena::{Arena, ARENA_ALIGNMENT};
pub use error::{ErrorKind, ModelFault, NanoError, NanoResult};
pub use evaluation::{evaluate, evaluate_with, ConfusionMatrix, Dataset, Evaluation, Outcome, SampleResult};
pub use interpreter::{InferenceEngine, Interpreter};
pub use kernels::{Kernel, KernelRegistry, OpKind};
pub use math::{argmax_f32, fully_connected_f32, normalize_f32, relu_f32, softmax_f32};
pub use model::{ModelDescriptor, OperatorDef, TensorDef, TensorKind};
pub use normalization::Normalizer;
pub use tensor::{ConstTensor, DataType, Shape, TensorRef, TensorSlot};
