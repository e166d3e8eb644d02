//! Aligned sample buffers.
//!
//! The aligned entry points of the [`Registry`](crate::Registry) require every
//! buffer to start on the registry's alignment boundary. [`AlignedBuffer`]
//! provides storage that satisfies the largest boundary any machine table uses.

use bytemuck::{Pod, Zeroable};

/// Largest alignment boundary any machine table guarantees, in bytes.
pub const MAX_ALIGNMENT: usize = 64;

/// True if `ptr` is a multiple of `boundary` (`boundary` must be a power of two).
#[inline]
#[must_use]
pub fn is_aligned<T>(ptr: *const T, boundary: usize) -> bool {
    debug_assert!(boundary.is_power_of_two());
    (ptr as usize) & (boundary - 1) == 0
}

/// One cache-line sized, 64-byte aligned storage block.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct Block([u8; MAX_ALIGNMENT]);

// SAFETY: `Block` is a `repr(C)` byte array whose size equals its alignment:
// no padding bytes, and every bit pattern is a valid value.
unsafe impl Zeroable for Block {}
// SAFETY: see above.
unsafe impl Pod for Block {}

/// Heap buffer of `T` whose first element is [`MAX_ALIGNMENT`]-aligned.
///
/// `T` must be a plain-old-data type whose size divides 64 (`f32`,
/// `Complex32`, `u8`, ...).
///
/// ```
/// use lanekit_core::buffer::{is_aligned, AlignedBuffer, MAX_ALIGNMENT};
///
/// let mut buf = AlignedBuffer::<f32>::zeroed(10);
/// buf.as_mut_slice()[3] = 1.5;
/// assert_eq!(buf.len(), 10);
/// assert!(is_aligned(buf.as_slice().as_ptr(), MAX_ALIGNMENT));
/// ```
#[derive(Clone)]
pub struct AlignedBuffer<T: Pod> {
    blocks: Vec<Block>,
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> AlignedBuffer<T> {
    const ELEMENTS_PER_BLOCK: usize = {
        assert!(
            std::mem::size_of::<T>() > 0 && MAX_ALIGNMENT % std::mem::size_of::<T>() == 0,
            "element size must divide the block size"
        );
        MAX_ALIGNMENT / std::mem::size_of::<T>()
    };

    /// Allocates `len` zeroed elements.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        let blocks = len.div_ceil(Self::ELEMENTS_PER_BLOCK);
        Self {
            blocks: vec![Block::zeroed(); blocks],
            len,
            _marker: std::marker::PhantomData,
        }
    }

    /// Allocates a buffer holding a copy of `values`.
    #[must_use]
    pub fn from_slice(values: &[T]) -> Self {
        let mut buf = Self::zeroed(values.len());
        buf.as_mut_slice().copy_from_slice(values);
        buf
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the buffer holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared view of the elements.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &bytemuck::cast_slice::<Block, T>(&self.blocks)[..self.len]
    }

    /// Mutable view of the elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut bytemuck::cast_slice_mut::<Block, T>(&mut self.blocks)[..self.len]
    }
}

impl<T: Pod> std::ops::Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> std::ops::DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
