//! Model blob parsing and graph validation.

mod common;

use common::{tiny_classifier, BlobBuilder};
use nano_iris_core::*;

fn fault(blob: &[u8]) -> ModelFault {
    match ModelDescriptor::parse(blob) {
        Err(NanoError::MalformedModel(fault)) => fault,
        other => panic!("expected a malformed model, got {other:?}"),
    }
}

// =============================================================================
// Well-formed models
// =============================================================================

#[test]
fn test_parse_tiny_classifier() {
    let blob = tiny_classifier();
    let model = ModelDescriptor::parse(&blob).unwrap();
    assert_eq!(model.tensors().len(), 7);
    assert_eq!(model.operators().len(), 4);
    assert_eq!(model.input_shape().dims(), &[1, 4]);
    assert_eq!(model.output_shape().dims(), &[3]);
    assert_eq!(model.blob_len(), blob.len());

    let kinds: Vec<OpKind> = model.operators().iter().map(|op| op.kind).collect();
    assert_eq!(kinds, [OpKind::Reshape, OpKind::FullyConnected, OpKind::Relu, OpKind::Softmax]);
}

#[test]
fn test_constants_are_read_from_blob() {
    let blob = tiny_classifier();
    let model = ModelDescriptor::parse(&blob).unwrap();
    let bias = model.tensor(3).unwrap().constant().unwrap();
    assert_eq!(bias.values().collect::<Vec<_>>(), [0.5, 0.0, -0.5]);
    assert!(model.tensor(0).unwrap().constant().is_none());
}

// =============================================================================
// Header and table defects
// =============================================================================

#[test]
fn test_bad_magic() {
    let mut blob = tiny_classifier();
    blob[0] = b'X';
    assert_eq!(fault(&blob), ModelFault::BadMagic);
}

#[test]
fn test_unsupported_version() {
    let mut blob = tiny_classifier();
    blob[4] = 9;
    assert_eq!(fault(&blob), ModelFault::UnsupportedVersion(9));
}

#[test]
fn test_truncated_blob() {
    let blob = tiny_classifier();
    assert!(matches!(fault(&blob[..10]), ModelFault::Truncated { .. }));
    // Cutting into the constant data is caught too.
    assert!(matches!(fault(&blob[..blob.len() - 2]), ModelFault::Truncated { .. }));
}

#[test]
fn test_empty_graph() {
    let mut b = BlobBuilder::new();
    let t = b.activation(&[4]);
    b.io(t, t);
    assert_eq!(fault(&b.build()), ModelFault::EmptyGraph);
}

#[test]
fn test_too_many_tensors() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    for _ in 0..32 {
        b.activation(&[4]);
    }
    b.op(OpKind::Relu, &[x], 1).io(x, 1);
    assert_eq!(fault(&b.build()), ModelFault::TooLarge { count: 33, max: 32 });
}

#[test]
fn test_too_many_operators() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    for _ in 0..17 {
        b.op(OpKind::Relu, &[x], y);
    }
    b.io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::TooLarge { count: 17, max: 16 });
}

#[test]
fn test_unknown_opcode() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    b.op_code(42, &[x], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::UnknownOpcode(42));
}

#[test]
fn test_wrong_input_count() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[x, x], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::BadInputCount { op: 0, count: 2 });
}

// =============================================================================
// Graph defects
// =============================================================================

#[test]
fn test_tensor_index_out_of_range() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[7], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::TensorIndexOutOfRange { index: 7, count: 2 });
}

#[test]
fn test_read_before_write() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    let z = b.activation(&[4]);
    b.op(OpKind::Relu, &[y], z).op(OpKind::Relu, &[x], y).io(x, z);
    assert_eq!(fault(&b.build()), ModelFault::NotYetProduced { op: 0, tensor: y as usize });
}

#[test]
fn test_writing_the_input_is_rejected() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], x).io(x, x);
    assert_eq!(fault(&b.build()), ModelFault::MultipleWriters { tensor: x as usize });
}

#[test]
fn test_constant_as_activation_operand() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[2]);
    let c = b.constant(&[2], &[1.0, 2.0]);
    let y = b.activation(&[2]);
    b.op(OpKind::Relu, &[c], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::WrongTensorKind { op: 0, tensor: c as usize });
}

#[test]
fn test_output_never_produced() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    let z = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], y).io(x, z);
    assert_eq!(fault(&b.build()), ModelFault::OutputNeverProduced { tensor: z as usize });
}

// =============================================================================
// Tensor table defects
// =============================================================================

#[test]
fn test_unsupported_data_type() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], y).io(x, y).dtype(y, 1);
    assert_eq!(fault(&b.build()), ModelFault::UnsupportedDataType { tensor: y as usize, code: 1 });
}

#[test]
fn test_rank_zero() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::BadRank { tensor: x as usize, rank: 0 });
}

#[test]
fn test_rank_above_four() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[1, 1, 1, 4, 1]);
    b.op(OpKind::Relu, &[x], y).io(x, y);
    assert_eq!(fault(&b.build()), ModelFault::BadRank { tensor: y as usize, rank: 5 });
}

#[test]
fn test_tensor_with_too_many_elements() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[1024, 1024, 2]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], y).io(x, y);
    assert_eq!(
        fault(&b.build()),
        ModelFault::TooLarge { count: 2 * 1024 * 1024, max: 1024 * 1024 }
    );
}

#[test]
fn test_unknown_tensor_kind() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[4]);
    let y = b.activation(&[4]);
    b.op(OpKind::Relu, &[x], y).io(x, y).kind(y, 7);
    assert_eq!(fault(&b.build()), ModelFault::UnknownTensorKind { tensor: y as usize, code: 7 });
}

#[test]
fn test_constant_as_graph_input_or_output() {
    let mut b = BlobBuilder::new();
    let x = b.activation(&[2]);
    let c = b.constant(&[2], &[1.0, 2.0]);
    let y = b.activation(&[2]);
    b.op(OpKind::Relu, &[x], y).io(c, y);
    assert_eq!(fault(&b.build()), ModelFault::InvalidGraphTensor { tensor: c as usize });

    b.io(x, c);
    assert_eq!(fault(&b.build()), ModelFault::InvalidGraphTensor { tensor: c as usize });
}
