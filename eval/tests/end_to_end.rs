//! Full pipeline over the embedded model and dataset.

use approx::assert_abs_diff_eq;
use nano_iris_core::*;
use nano_iris_eval::iris_data::{IRIS_FEATURES, NUM_SAMPLES};
use nano_iris_eval::{iris_normalizer, iris_registry, report, run, EvalConfig, EvalError, IRIS_MODEL};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Reference run
// =============================================================================

#[test]
fn test_reference_confusion_matrix_and_accuracy() {
    init_logger();
    let evaluation = run(&EvalConfig::default()).unwrap();

    assert_eq!(evaluation.confusion.counts(), &[[50, 0, 0], [0, 49, 1], [0, 1, 49]]);
    assert_eq!(evaluation.correct, 148);
    assert_eq!(evaluation.samples, NUM_SAMPLES as u32);
    assert_eq!(evaluation.failed, 0);
    assert_eq!(evaluation.confusion.total(), evaluation.evaluated);
    assert_eq!(evaluation.confusion.diagonal(), evaluation.correct);
    assert_abs_diff_eq!(evaluation.accuracy(), 148.0 / 150.0, epsilon = 1e-6);
    assert!(report::render(&evaluation).ends_with("accuracy: 0.9867 (148 / 150)\n"));
}

#[test]
fn test_first_sample_probabilities() {
    let model = ModelDescriptor::parse(IRIS_MODEL).unwrap();
    let registry = iris_registry().unwrap();
    let normalizer = iris_normalizer().unwrap();
    let mut buf = [0u8; TENSOR_ARENA_SIZE];
    let mut interp = Interpreter::initialize(&model, &registry, Arena::new(&mut buf)).unwrap();

    assert_eq!(interp.input().shape.dims(), &[1, 4]);
    assert_eq!(interp.output().shape.dims(), &[3]);
    assert_eq!(interp.operator_count(), 5);

    let scores = interp.infer(&normalizer.normalize(&IRIS_FEATURES[0]).unwrap()).unwrap();
    assert_abs_diff_eq!(scores[0], 0.999_951, epsilon = 1e-4);
    assert_abs_diff_eq!(scores[1], 0.000_022, epsilon = 1e-4);
    assert_abs_diff_eq!(scores[2], 0.000_027, epsilon = 1e-4);
    assert_abs_diff_eq!(scores.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run(&EvalConfig::default()).unwrap();
    let second = run(&EvalConfig { preview: 0, ..EvalConfig::default() }).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_inference_is_deterministic_per_sample() {
    let model = ModelDescriptor::parse(IRIS_MODEL).unwrap();
    let registry = iris_registry().unwrap();
    let normalizer = iris_normalizer().unwrap();
    let mut buf = [0u8; TENSOR_ARENA_SIZE];
    let mut interp = Interpreter::initialize(&model, &registry, Arena::new(&mut buf)).unwrap();

    let features: Vec<_> = IRIS_FEATURES.iter().map(|raw| normalizer.normalize(raw).unwrap()).collect();
    let pass: Vec<_> = features.iter().map(|x| interp.infer(x).unwrap()).collect();
    for (x, expected) in features.iter().zip(&pass).rev() {
        assert_eq!(interp.infer(x).unwrap().map(f32::to_bits), expected.map(f32::to_bits));
    }
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn test_undersized_arena_fails_initialization() {
    init_logger();
    let err = run(&EvalConfig { arena_bytes: 128, ..EvalConfig::default() }).unwrap_err();
    match err {
        EvalError::Engine(e) => {
            assert!(matches!(e, NanoError::ArenaExhausted { .. }));
            assert_eq!(e.kind(), ErrorKind::Initialization);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_operator_fails_initialization() {
    let model = ModelDescriptor::parse(IRIS_MODEL).unwrap();
    let mut registry = KernelRegistry::new();
    registry.add_fully_connected().unwrap();
    registry.add_relu().unwrap();
    registry.add_softmax().unwrap();
    let mut buf = [0u8; TENSOR_ARENA_SIZE];
    let err = Interpreter::initialize(&model, &registry, Arena::new(&mut buf)).err().unwrap();
    assert_eq!(err, NanoError::UnregisteredOperator(OpKind::Reshape));
}

#[test]
fn test_wrong_feature_count_is_rejected() {
    let model = ModelDescriptor::parse(IRIS_MODEL).unwrap();
    let registry = iris_registry().unwrap();
    let mut buf = [0u8; TENSOR_ARENA_SIZE];
    let mut interp = Interpreter::initialize(&model, &registry, Arena::new(&mut buf)).unwrap();
    assert_eq!(interp.infer(&[0.0; 3]).unwrap_err().kind(), ErrorKind::Precondition);
    assert_eq!(interp.infer(&[0.0; 5]).unwrap_err().kind(), ErrorKind::Precondition);
}
