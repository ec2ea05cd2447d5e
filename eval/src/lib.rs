//! # nano-iris-eval
//!
//! Host-side driver for `nano-iris-core`: embeds the trained Iris MLP and the
//! 150-sample dataset, runs the evaluation once and renders the report.

pub mod config;
pub mod iris_data;
pub mod report;

use log::info;
use nano_iris_core::{
    evaluate_with, Arena, Dataset, Evaluation, Interpreter, KernelRegistry, ModelDescriptor, NanoError, Normalizer,
};
use thiserror::Error;

pub use config::EvalConfig;

/// Serialized 4-8-3 network, exported by `tools/export_iris_model.py`.
pub static IRIS_MODEL: &[u8] = include_bytes!("../models/iris_mlp.nano");

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Engine(#[from] NanoError),

    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },
}

pub fn iris_normalizer() -> Result<Normalizer, NanoError> {
    Normalizer::new(iris_data::IRIS_MEANS, iris_data::IRIS_STDS)
}

pub fn iris_dataset() -> Result<Dataset<'static>, NanoError> {
    Dataset::new(&iris_data::IRIS_FEATURES, &iris_data::IRIS_LABELS)
}

/// Registry holding exactly the operators the Iris MLP uses.
pub fn iris_registry() -> Result<KernelRegistry, NanoError> {
    let mut registry = KernelRegistry::new();
    registry.add_fully_connected()?;
    registry.add_relu()?;
    registry.add_softmax()?;
    registry.add_reshape()?;
    Ok(registry)
}

/// Initialize the engine over a `config.arena_bytes` arena and evaluate the
/// whole dataset once. The first `config.preview` samples are logged.
pub fn run(config: &EvalConfig) -> Result<Evaluation, EvalError> {
    let model = ModelDescriptor::parse(IRIS_MODEL)?;
    let registry = iris_registry()?;
    let normalizer = iris_normalizer()?;
    let dataset = iris_dataset()?;

    let mut arena_buf = vec![0u8; config.arena_bytes];
    let mut interpreter = Interpreter::initialize(&model, &registry, Arena::new(&mut arena_buf))?;
    info!(
        "model ready: {} bytes, {} operators over {} kernels, input dims {:?}, output dims {:?}",
        interpreter.model().blob_len(),
        interpreter.model().operators().len(),
        interpreter.registry().len(),
        interpreter.input().shape.dims(),
        interpreter.output().shape.dims(),
    );
    info!("running inference on {} samples", dataset.len());

    let evaluation = evaluate_with(&mut interpreter, &dataset, &normalizer, |sample| {
        if sample.index < config.preview {
            info!("{}", report::sample_line(sample));
        }
    })?;
    Ok(evaluation)
}
