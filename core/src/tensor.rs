//! Tensor metadata and views.
//!
//! Activation data lives in one arena-backed `f32` region owned by the
//! interpreter; a `TensorSlot` records where each activation sits in it.
//! Constants are never copied: `ConstTensor` reads little-endian `f32`s
//! straight out of the model blob (Flash on the device).

use core::ops::Range;

use crate::error::{ModelFault, NanoResult};

/// Maximum tensor rank supported by the wire format.
pub const MAX_RANK: usize = 4;

/// Element type of a tensor. Only 32-bit float is executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float32,
}

impl DataType {
    pub const fn size(self) -> usize {
        match self {
            DataType::Float32 => 4,
        }
    }

    pub(crate) fn from_code(tensor: usize, code: u8) -> NanoResult<Self> {
        match code {
            0 => Ok(DataType::Float32),
            _ => Err(ModelFault::UnsupportedDataType { tensor, code }.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub dims: [usize; MAX_RANK],
    pub ndim: usize,
}

impl Shape {
    pub const fn d1(size: usize) -> Self {
        Self { dims: [size, 0, 0, 0], ndim: 1 }
    }
    pub const fn d2(d0: usize, d1: usize) -> Self {
        Self { dims: [d0, d1, 0, 0], ndim: 2 }
    }
    pub const fn d3(d0: usize, d1: usize, d2: usize) -> Self {
        Self { dims: [d0, d1, d2, 0], ndim: 3 }
    }
    pub const fn d4(d0: usize, d1: usize, d2: usize, d3: usize) -> Self {
        Self { dims: [d0, d1, d2, d3], ndim: 4 }
    }
    pub fn total(&self) -> usize {
        self.dims().iter().product()
    }
    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.ndim]
    }
    /// Size of the innermost dimension; 1 for a scalar-like shape.
    pub fn last(&self) -> usize {
        self.dims().last().copied().unwrap_or(1)
    }
}

/// Read-only `f32` tensor backed by little-endian bytes in the model blob.
#[derive(Debug, Clone, Copy)]
pub struct ConstTensor<'m> {
    shape: Shape,
    bytes: &'m [u8],
}

impl<'m> ConstTensor<'m> {
    /// `bytes` must hold exactly `shape.total()` floats; the model parser
    /// guarantees this for every constant it hands out.
    pub(crate) fn new(shape: Shape, bytes: &'m [u8]) -> Self {
        Self { shape, bytes }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / DataType::Float32.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        let start = index.checked_mul(4)?;
        let raw = self.bytes.get(start..start.checked_add(4)?)?;
        Some(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Values in storage (row-major) order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = f32> + Clone + 'm {
        let bytes: &'m [u8] = self.bytes;
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Interpreter bookkeeping for one tensor. Lives in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorSlot {
    pub shape: Shape,
    pub dtype: DataType,
    /// Element offset into the activation region; `None` for constants.
    pub offset: Option<usize>,
}

impl TensorSlot {
    pub const EMPTY: TensorSlot = TensorSlot {
        shape: Shape::d1(0),
        dtype: DataType::Float32,
        offset: None,
    };

    /// Element range inside the activation region, if this slot has storage.
    pub fn range(&self) -> Option<Range<usize>> {
        self.offset.map(|start| start..start + self.shape.total())
    }
}

/// Borrowed view of an interpreter-owned tensor, as handed to callers.
#[derive(Debug, Clone, Copy)]
pub struct TensorRef<'t> {
    pub index: usize,
    pub shape: Shape,
    pub dtype: DataType,
    pub data: &'t [f32],
}
