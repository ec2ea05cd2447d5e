//! Model descriptor: a zero-copy view over a serialized NANO v1 graph.
//!
//! ```text
//! header    "NANO" | version u16 | tensors u16 | ops u16 | input u16 | output u16 | pad u16
//! tensors   dtype u8 | kind u8 | rank u8 | pad u8 | dims u16 x 4 | data offset u32
//! ops       opcode u8 | n_inputs u8 | inputs u16 x 3 | output u16
//! data      little-endian f32 constants, referenced by absolute offset
//! ```
//!
//! All integers are little-endian. The blob is embedded at build time and
//! never copied: constant tensors are views into it. Parsing validates the
//! whole graph once, so the interpreter can trust what it gets.

use arrayvec::ArrayVec;

use crate::error::{ModelFault, NanoResult};
use crate::kernels::OpKind;
use crate::tensor::{ConstTensor, DataType, Shape, MAX_RANK};

pub const MAGIC: [u8; 4] = *b"NANO";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 16;
pub const TENSOR_ENTRY_LEN: usize = 16;
pub const OPERATOR_ENTRY_LEN: usize = 10;
/// Marks an unused operator input slot.
pub const NO_TENSOR: u16 = 0xFFFF;

pub const MAX_TENSORS: usize = 32;
pub const MAX_OPERATORS: usize = 16;
pub const MAX_OP_INPUTS: usize = 3;
/// Upper bound on elements per tensor; keeps size arithmetic overflow-free on 32-bit targets.
pub const MAX_TENSOR_ELEMENTS: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    /// Written by the graph input or by exactly one operator; lives in the arena.
    Activation,
    /// Weights or biases embedded in the blob.
    Constant,
}

#[derive(Debug, Clone, Copy)]
pub struct TensorDef<'m> {
    pub dtype: DataType,
    pub kind: TensorKind,
    pub shape: Shape,
    data: &'m [u8],
}

impl<'m> TensorDef<'m> {
    pub fn constant(&self) -> Option<ConstTensor<'m>> {
        match self.kind {
            TensorKind::Constant => Some(ConstTensor::new(self.shape, self.data)),
            TensorKind::Activation => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDef {
    pub kind: OpKind,
    inputs: [usize; MAX_OP_INPUTS],
    input_count: usize,
    pub output: usize,
}

impl OperatorDef {
    pub fn inputs(&self) -> &[usize] {
        &self.inputs[..self.input_count]
    }
}

/// Parsed, validated model graph.
#[derive(Debug, Clone)]
pub struct ModelDescriptor<'m> {
    tensors: ArrayVec<TensorDef<'m>, MAX_TENSORS>,
    operators: ArrayVec<OperatorDef, MAX_OPERATORS>,
    input: usize,
    output: usize,
    blob_len: usize,
}

impl<'m> ModelDescriptor<'m> {
    /// Parse and validate a serialized model.
    ///
    /// Fails with `MalformedModel` on any structural defect: bad header,
    /// truncated tables or constants, unknown opcodes, non-f32 tensors,
    /// dangling indices, or operators out of topological order.
    pub fn parse(blob: &'m [u8]) -> NanoResult<Self> {
        let mut r = ByteReader::new(blob);

        if r.bytes(MAGIC.len())? != MAGIC {
            return Err(ModelFault::BadMagic.into());
        }
        let version = r.u16()?;
        if version != VERSION {
            return Err(ModelFault::UnsupportedVersion(version).into());
        }
        let tensor_count = r.u16()? as usize;
        let op_count = r.u16()? as usize;
        let input = r.u16()? as usize;
        let output = r.u16()? as usize;
        let _reserved = r.u16()?;

        if tensor_count > MAX_TENSORS {
            return Err(ModelFault::TooLarge { count: tensor_count, max: MAX_TENSORS }.into());
        }
        if op_count > MAX_OPERATORS {
            return Err(ModelFault::TooLarge { count: op_count, max: MAX_OPERATORS }.into());
        }
        if op_count == 0 {
            return Err(ModelFault::EmptyGraph.into());
        }

        let mut tensors = ArrayVec::new();
        for index in 0..tensor_count {
            tensors.push(Self::parse_tensor(blob, &mut r, index)?);
        }

        let mut operators = ArrayVec::new();
        for op in 0..op_count {
            operators.push(Self::parse_operator(&mut r, op, tensor_count)?);
        }

        let model = Self { tensors, operators, input, output, blob_len: blob.len() };
        model.validate_graph()?;
        Ok(model)
    }

    fn parse_tensor(blob: &'m [u8], r: &mut ByteReader<'m>, index: usize) -> NanoResult<TensorDef<'m>> {
        let dtype = DataType::from_code(index, r.u8()?)?;
        let kind_code = r.u8()?;
        let rank = r.u8()?;
        let _reserved = r.u8()?;
        let mut dims = [0usize; MAX_RANK];
        for d in dims.iter_mut() {
            *d = r.u16()? as usize;
        }
        let offset = r.u32()? as usize;

        if rank == 0 || rank as usize > MAX_RANK {
            return Err(ModelFault::BadRank { tensor: index, rank }.into());
        }
        dims[rank as usize..].fill(0);
        let shape = Shape { dims, ndim: rank as usize };
        let elements = shape.dims().iter().fold(1usize, |acc, &d| acc.saturating_mul(d));
        if elements > MAX_TENSOR_ELEMENTS {
            return Err(ModelFault::TooLarge { count: elements, max: MAX_TENSOR_ELEMENTS }.into());
        }

        let (kind, data) = match kind_code {
            0 => (TensorKind::Activation, &blob[..0]),
            1 => {
                let len = shape.total() * dtype.size();
                let data = offset
                    .checked_add(len)
                    .and_then(|end| blob.get(offset..end))
                    .ok_or(ModelFault::Truncated { offset })?;
                (TensorKind::Constant, data)
            }
            code => return Err(ModelFault::UnknownTensorKind { tensor: index, code }.into()),
        };
        Ok(TensorDef { dtype, kind, shape, data })
    }

    fn parse_operator(r: &mut ByteReader<'m>, op: usize, tensor_count: usize) -> NanoResult<OperatorDef> {
        let code = r.u8()?;
        let count = r.u8()?;
        let mut raw = [NO_TENSOR; MAX_OP_INPUTS];
        for slot in raw.iter_mut() {
            *slot = r.u16()?;
        }
        let output = r.u16()? as usize;

        let kind = OpKind::from_code(code).ok_or(ModelFault::UnknownOpcode(code))?;
        if count as usize != kind.input_count() {
            return Err(ModelFault::BadInputCount { op, count }.into());
        }

        let mut inputs = [0usize; MAX_OP_INPUTS];
        for (dst, &src) in inputs.iter_mut().zip(&raw).take(count as usize) {
            *dst = check_index(src as usize, tensor_count)?;
        }
        check_index(output, tensor_count)?;
        Ok(OperatorDef { kind, inputs, input_count: count as usize, output })
    }

    /// Graph-level checks: every operator reads tensors that already hold a
    /// value, every activation has a single writer, and the output is reached.
    fn validate_graph(&self) -> NanoResult<()> {
        let count = self.tensors.len();
        for tensor in [self.input, self.output] {
            check_index(tensor, count)?;
            if self.tensors[tensor].kind != TensorKind::Activation {
                return Err(ModelFault::InvalidGraphTensor { tensor }.into());
            }
        }

        let mut produced: u32 = 1 << self.input;
        for (op, def) in self.operators.iter().enumerate() {
            for (slot, &tensor) in def.inputs().iter().enumerate() {
                let expected = def.kind.operand_kind(slot);
                if self.tensors[tensor].kind != expected {
                    return Err(ModelFault::WrongTensorKind { op, tensor }.into());
                }
                if expected == TensorKind::Activation && produced & (1 << tensor) == 0 {
                    return Err(ModelFault::NotYetProduced { op, tensor }.into());
                }
            }
            let out = def.output;
            if self.tensors[out].kind != TensorKind::Activation {
                return Err(ModelFault::WrongTensorKind { op, tensor: out }.into());
            }
            if produced & (1 << out) != 0 {
                return Err(ModelFault::MultipleWriters { tensor: out }.into());
            }
            produced |= 1 << out;
        }

        if produced & (1 << self.output) == 0 {
            return Err(ModelFault::OutputNeverProduced { tensor: self.output }.into());
        }
        Ok(())
    }

    pub fn tensors(&self) -> &[TensorDef<'m>] {
        &self.tensors
    }

    pub fn tensor(&self, index: usize) -> NanoResult<&TensorDef<'m>> {
        self.tensors
            .get(index)
            .ok_or_else(|| ModelFault::TensorIndexOutOfRange { index, count: self.tensors.len() }.into())
    }

    /// Operators in declared (topological) execution order.
    pub fn operators(&self) -> &[OperatorDef] {
        &self.operators
    }

    pub fn input_index(&self) -> usize {
        self.input
    }

    pub fn output_index(&self) -> usize {
        self.output
    }

    pub fn input_shape(&self) -> Shape {
        self.tensors[self.input].shape
    }

    pub fn output_shape(&self) -> Shape {
        self.tensors[self.output].shape
    }

    /// Size of the serialized blob in bytes.
    pub fn blob_len(&self) -> usize {
        self.blob_len
    }
}

fn check_index(index: usize, count: usize) -> NanoResult<usize> {
    if index < count {
        Ok(index)
    } else {
        Err(ModelFault::TensorIndexOutOfRange { index, count }.into())
    }
}

/// Little-endian cursor; running off the end reports where it happened.
struct ByteReader<'m> {
    blob: &'m [u8],
    pos: usize,
}

impl<'m> ByteReader<'m> {
    fn new(blob: &'m [u8]) -> Self {
        Self { blob, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> NanoResult<&'m [u8]> {
        let end = self.pos + len;
        let blob: &'m [u8] = self.blob;
        let out = blob.get(self.pos..end).ok_or(ModelFault::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> NanoResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> NanoResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> NanoResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
