//! Bump arena over a caller-owned byte buffer.
//!
//! MCUs have no heap allocator we can trust after boot. The caller owns a
//! `[u8; N]` buffer (usually a `static`) and lends it to the interpreter once.
//! The arena hands out aligned, non-overlapping sub-slices in a single forward
//! pass. There is no free, no reset and no checkpoint: once initialization is
//! done the layout is fixed for the lifetime of the borrow.

use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use crate::error::{NanoError, NanoResult};

/// Every claim starts on this boundary, whatever the element type.
pub const ARENA_ALIGNMENT: usize = 16;

/// Bump allocator over a borrowed byte buffer.
///
/// Lifetime `'a` ties every allocation to the buffer, so the borrow checker
/// rules out dangling tensor slices at zero runtime cost.
pub struct Arena<'a> {
    base: NonNull<u8>,
    capacity: usize,
    offset: usize,
    _buf: PhantomData<&'a mut [u8]>,
}

impl<'a> Arena<'a> {
    /// Create a new arena from a mutable byte buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            base: NonNull::from(&mut *buf).cast(),
            capacity: buf.len(),
            offset: 0,
            _buf: PhantomData,
        }
    }

    /// Claim `len` elements of `T`, each initialised to `fill`.
    ///
    /// The region begins on a multiple of `ARENA_ALIGNMENT` (or of
    /// `align_of::<T>()` if that is larger). On failure nothing is claimed.
    pub fn alloc_slice<T: Copy>(&mut self, len: usize, fill: T) -> NanoResult<&'a mut [T]> {
        let align = align_of::<T>().max(ARENA_ALIGNMENT);
        let remaining = self.remaining();
        let exhausted = |requested| NanoError::ArenaExhausted { requested, remaining };

        let bytes = len.checked_mul(size_of::<T>()).ok_or(exhausted(usize::MAX))?;
        let addr = (self.base.as_ptr() as usize).wrapping_add(self.offset);
        let padding = addr.wrapping_neg() & (align - 1);
        let requested = padding.checked_add(bytes).ok_or(exhausted(usize::MAX))?;
        if requested > remaining {
            return Err(exhausted(requested));
        }

        let start = self.offset + padding;
        self.offset += requested;

        // SAFETY: `start..start + bytes` lies inside the borrowed buffer, is
        // aligned for `T`, and is never handed out again because `offset`
        // only moves forward.
        unsafe {
            let ptr = self.base.as_ptr().add(start).cast::<T>();
            for i in 0..len {
                ptr.add(i).write(fill);
            }
            Ok(core::slice::from_raw_parts_mut(ptr, len))
        }
    }

    /// Claim room for `src` and copy it in.
    pub fn alloc_copy<T: Copy>(&mut self, src: &[T]) -> NanoResult<&'a mut [T]> {
        match src.first() {
            Some(&first) => {
                let dst = self.alloc_slice(src.len(), first)?;
                dst.copy_from_slice(src);
                Ok(dst)
            }
            None => Ok(&mut []),
        }
    }

    /// Claim a zeroed `f32` buffer for tensor storage.
    pub fn alloc_f32_slice(&mut self, len: usize) -> NanoResult<&'a mut [f32]> {
        self.alloc_slice(len, 0.0f32)
    }

    /// Bytes remaining in the arena.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.offset)
    }

    /// Total capacity in bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes claimed so far, alignment padding included.
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.offset
    }
}

/// Worst-case footprint of `len` elements of `T`, padding included.
pub const fn padded_size_of<T>(len: usize) -> usize {
    let align = if align_of::<T>() > ARENA_ALIGNMENT { align_of::<T>() } else { ARENA_ALIGNMENT };
    len * size_of::<T>() + align - 1
}
