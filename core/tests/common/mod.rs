//! Builds NANO v1 blobs in memory for integration tests.

#![allow(dead_code)]

use nano_iris_core::model::{HEADER_LEN, MAGIC, NO_TENSOR, OPERATOR_ENTRY_LEN, TENSOR_ENTRY_LEN, VERSION};
use nano_iris_core::OpKind;

struct TensorEntry {
    dtype: u8,
    kind: u8,
    dims: Vec<u16>,
    data: Option<usize>,
}

#[derive(Default)]
pub struct BlobBuilder {
    tensors: Vec<TensorEntry>,
    ops: Vec<(u8, Vec<u16>, u16)>,
    data: Vec<u8>,
    input: u16,
    output: u16,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activation(&mut self, dims: &[u16]) -> u16 {
        self.tensors.push(TensorEntry { dtype: 0, kind: 0, dims: dims.to_vec(), data: None });
        (self.tensors.len() - 1) as u16
    }

    pub fn constant(&mut self, dims: &[u16], values: &[f32]) -> u16 {
        let at = self.data.len();
        for v in values {
            self.data.extend_from_slice(&v.to_le_bytes());
        }
        self.tensors.push(TensorEntry { dtype: 0, kind: 1, dims: dims.to_vec(), data: Some(at) });
        (self.tensors.len() - 1) as u16
    }

    /// Overwrite the raw dtype code of `tensor`.
    pub fn dtype(&mut self, tensor: u16, code: u8) -> &mut Self {
        self.tensors[tensor as usize].dtype = code;
        self
    }

    /// Overwrite the raw kind code of `tensor`.
    pub fn kind(&mut self, tensor: u16, code: u8) -> &mut Self {
        self.tensors[tensor as usize].kind = code;
        self
    }

    pub fn op(&mut self, kind: OpKind, inputs: &[u16], output: u16) -> &mut Self {
        self.op_code(kind.code(), inputs, output)
    }

    pub fn op_code(&mut self, code: u8, inputs: &[u16], output: u16) -> &mut Self {
        self.ops.push((code, inputs.to_vec(), output));
        self
    }

    pub fn io(&mut self, input: u16, output: u16) -> &mut Self {
        self.input = input;
        self.output = output;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let data_base = HEADER_LEN + self.tensors.len() * TENSOR_ENTRY_LEN + self.ops.len() * OPERATOR_ENTRY_LEN;
        let mut out = Vec::new();

        out.extend_from_slice(&MAGIC);
        for v in [VERSION, self.tensors.len() as u16, self.ops.len() as u16, self.input, self.output, 0] {
            out.extend_from_slice(&v.to_le_bytes());
        }

        for t in &self.tensors {
            out.extend_from_slice(&[t.dtype, t.kind, t.dims.len() as u8, 0]);
            for i in 0..4 {
                out.extend_from_slice(&t.dims.get(i).copied().unwrap_or(0).to_le_bytes());
            }
            let offset = t.data.map_or(0, |at| data_base + at) as u32;
            out.extend_from_slice(&offset.to_le_bytes());
        }

        for (code, inputs, output) in &self.ops {
            out.extend_from_slice(&[*code, inputs.len() as u8]);
            for i in 0..3 {
                out.extend_from_slice(&inputs.get(i).copied().unwrap_or(NO_TENSOR).to_le_bytes());
            }
            out.extend_from_slice(&output.to_le_bytes());
        }

        out.extend_from_slice(&self.data);
        out
    }
}

/// `[1,4] -> reshape [4] -> dense [3] -> relu -> softmax`.
///
/// Weights pick out features 0..3 so the logits are `x[0..3] + bias`.
pub fn tiny_classifier() -> Vec<u8> {
    let mut b = BlobBuilder::new();
    let input = b.activation(&[1, 4]);
    let flat = b.activation(&[4]);
    #[rustfmt::skip]
    let w = b.constant(&[3, 4], &[
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
    ]);
    let bias = b.constant(&[3], &[0.5, 0.0, -0.5]);
    let dense = b.activation(&[3]);
    let relu = b.activation(&[3]);
    let probs = b.activation(&[3]);
    b.op(OpKind::Reshape, &[input], flat)
        .op(OpKind::FullyConnected, &[flat, w, bias], dense)
        .op(OpKind::Relu, &[dense], relu)
        .op(OpKind::Softmax, &[relu], probs)
        .io(input, probs);
    b.build()
}

/// Single dense layer `[4] -> [3]` with the given weights and bias.
pub fn dense_only(weights: [f32; 12], bias: [f32; 3]) -> Vec<u8> {
    let mut b = BlobBuilder::new();
    let input = b.activation(&[4]);
    let w = b.constant(&[3, 4], &weights);
    let bias = b.constant(&[3], &bias);
    let out = b.activation(&[3]);
    b.op(OpKind::FullyConnected, &[input, w, bias], out).io(input, out);
    b.build()
}
