//! Interpreter: binds a model, a kernel registry and an arena into a runnable unit.
//!
//! ```text
//! initialize:  registry check → kernel prepare → memory plan → arena carve
//! invoke:      copy input → run plan in declared order → copy output
//! ```
//!
//! Everything the interpreter touches at run time (tensor bookkeeping, the
//! lowered plan and all activation buffers) is carved from the arena once
//! during `initialize`. `invoke` never allocates and overwrites every
//! activation in place, so a failed call leaves nothing behind that could
//! affect the next one.

use core::ops::Range;

use arrayvec::ArrayVec;
use log::{debug, info};

use crate::arena::{padded_size_of, Arena};
use crate::error::{ModelFault, NanoError, NanoResult};
use crate::kernels::{Kernel, KernelRegistry, OpKind};
use crate::model::{ModelDescriptor, TensorKind, MAX_OPERATORS, MAX_TENSORS};
use crate::tensor::{TensorRef, TensorSlot};
use crate::{NUM_CLASSES, NUM_FEATURES};

/// The seam between the evaluation harness and whatever produces scores.
///
/// The interpreter implements it; tests substitute fakes that return canned
/// scores without touching a model.
pub trait InferenceEngine {
    /// Score one normalized feature vector.
    ///
    /// `features.len()` must be `NUM_FEATURES`; anything else is a
    /// precondition violation, reported as `InvalidInputLength`.
    fn infer(&mut self, features: &[f32]) -> NanoResult<[f32; NUM_CLASSES]>;
}

pub struct Interpreter<'a, 'm> {
    model: &'m ModelDescriptor<'m>,
    registry: &'m KernelRegistry,
    arena: Arena<'a>,
    slots: &'a [TensorSlot],
    plan: &'a [Kernel<'m>],
    buffer: &'a mut [f32],
    input: Range<usize>,
    output: Range<usize>,
}

impl<'a, 'm: 'a> Interpreter<'a, 'm> {
    /// Validate `model` against `registry`, plan its memory and claim it from `arena`.
    ///
    /// Fails with an initialization-class error when the model uses an
    /// operator the registry does not hold, when operator shapes disagree,
    /// when the graph is not `NUM_FEATURES` in and `NUM_CLASSES` out, or when
    /// the arena cannot hold the plan.
    pub fn initialize(
        model: &'m ModelDescriptor<'m>,
        registry: &'m KernelRegistry,
        mut arena: Arena<'a>,
    ) -> NanoResult<Self> {
        let mut kernels = ArrayVec::<Kernel<'m>, MAX_OPERATORS>::new();
        for (op, def) in model.operators().iter().enumerate() {
            registry.resolve(def.kind)?;
            kernels.push(Kernel::prepare(op, def, model)?);
        }
        for (tensor, expected) in [(model.input_index(), NUM_FEATURES), (model.output_index(), NUM_CLASSES)] {
            let actual = model.tensor(tensor)?.shape.total();
            if actual != expected {
                return Err(ModelFault::GraphWidth { tensor, expected, actual }.into());
            }
        }

        let (offsets, elements) = plan_offsets(model);
        let required = Self::arena_requirement(model);
        if required > arena.remaining() {
            return Err(NanoError::ArenaExhausted { requested: required, remaining: arena.remaining() });
        }

        let slots = arena.alloc_slice(model.tensors().len(), TensorSlot::EMPTY)?;
        for ((slot, def), offset) in slots.iter_mut().zip(model.tensors()).zip(&offsets) {
            *slot = TensorSlot { shape: def.shape, dtype: def.dtype, offset: *offset };
        }
        let plan = arena.alloc_copy(&kernels)?;
        let buffer = arena.alloc_f32_slice(elements)?;

        let range_of = |index: usize| {
            slots[index]
                .range()
                .ok_or(NanoError::from(ModelFault::InvalidGraphTensor { tensor: index }))
        };
        let input = range_of(model.input_index())?;
        let output = range_of(model.output_index())?;

        info!(
            "interpreter ready: input {:?}, output {:?}, {} ops ({} kernels registered), arena {}/{} bytes",
            model.input_shape().dims(),
            model.output_shape().dims(),
            plan.len(),
            registry.len(),
            arena.used(),
            arena.capacity(),
        );

        Ok(Self { model, registry, arena, slots, plan, buffer, input, output })
    }

    /// Conservative arena size for `model`: bookkeeping, plan and every
    /// activation buffer, each with worst-case alignment padding.
    pub fn arena_requirement(model: &ModelDescriptor<'_>) -> usize {
        let (_, elements) = plan_offsets(model);
        padded_size_of::<TensorSlot>(model.tensors().len())
            + padded_size_of::<Kernel<'_>>(model.operators().len())
            + padded_size_of::<f32>(elements)
    }

    /// Copy `input` into the input tensor, run every operator once in
    /// declared order and copy the output tensor into `output`.
    ///
    /// Both lengths are checked before anything runs.
    pub fn invoke(&mut self, input: &[f32], output: &mut [f32]) -> NanoResult<()> {
        if input.len() != self.input.len() {
            return Err(NanoError::InvalidInputLength { expected: self.input.len(), actual: input.len() });
        }
        if output.len() != self.output.len() {
            return Err(NanoError::InvalidInputLength { expected: self.output.len(), actual: output.len() });
        }

        self.buffer[self.input.clone()].copy_from_slice(input);
        self.run()?;
        output.copy_from_slice(&self.buffer[self.output.clone()]);
        Ok(())
    }

    /// Execute the plan over whatever the input tensor currently holds.
    pub fn run(&mut self) -> NanoResult<()> {
        for (op, kernel) in self.plan.iter().enumerate() {
            debug!("op {} {}", op, kernel.kind());
            kernel.eval(self.slots, self.buffer)?;
        }
        Ok(())
    }

    pub fn input(&self) -> TensorRef<'_> {
        self.tensor_ref(self.model.input_index(), self.input.clone())
    }

    pub fn output(&self) -> TensorRef<'_> {
        self.tensor_ref(self.model.output_index(), self.output.clone())
    }

    /// Direct access to the input tensor's storage, for callers that fill it in place.
    pub fn input_data_mut(&mut self) -> &mut [f32] {
        &mut self.buffer[self.input.clone()]
    }

    fn tensor_ref(&self, index: usize, range: Range<usize>) -> TensorRef<'_> {
        let slot = &self.slots[index];
        TensorRef { index, shape: slot.shape, dtype: slot.dtype, data: &self.buffer[range] }
    }

    pub fn model(&self) -> &'m ModelDescriptor<'m> {
        self.model
    }

    pub fn registry(&self) -> &'m KernelRegistry {
        self.registry
    }

    pub fn operator_count(&self) -> usize {
        self.plan.len()
    }

    /// Arena bytes claimed at initialization, padding included.
    pub fn arena_used(&self) -> usize {
        self.arena.used()
    }

    pub fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }
}

impl InferenceEngine for Interpreter<'_, '_> {
    fn infer(&mut self, features: &[f32]) -> NanoResult<[f32; NUM_CLASSES]> {
        if features.len() != NUM_FEATURES {
            return Err(NanoError::InvalidInputLength { expected: NUM_FEATURES, actual: features.len() });
        }
        let mut scores = [0.0f32; NUM_CLASSES];
        self.invoke(features, &mut scores)?;
        Ok(scores)
    }
}

/// Assign each activation tensor an element offset in the shared buffer.
///
/// Activations are laid out back to back in production order, starting
/// with the graph input. Reshape outputs reuse their input's offset.
/// Constants and never-written activations get no storage.
fn plan_offsets(model: &ModelDescriptor<'_>) -> (ArrayVec<Option<usize>, MAX_TENSORS>, usize) {
    let tensors = model.tensors();
    let mut offsets: ArrayVec<Option<usize>, MAX_TENSORS> = tensors.iter().map(|_| None).collect();
    let mut next = 0;

    let mut place = |offsets: &mut ArrayVec<Option<usize>, MAX_TENSORS>, index: usize| {
        if tensors[index].kind == TensorKind::Activation {
            offsets[index] = Some(next);
            next += tensors[index].shape.total();
        }
    };

    place(&mut offsets, model.input_index());
    for def in model.operators() {
        match (def.kind, def.inputs().first()) {
            (OpKind::Reshape, Some(&source)) => offsets[def.output] = offsets[source],
            _ => place(&mut offsets, def.output),
        }
    }
    (offsets, next)
}
