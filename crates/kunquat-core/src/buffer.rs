//! Work buffers: mono scratch blocks shared across a device graph render pass.
//!
//! Generalises a plain scratch-buffer pool with the bookkeeping a device
//! graph render pass needs beyond raw samples: whether a buffer currently
//! holds valid data, whether its content is a single repeated value (so a
//! downstream device can skip per-sample work), and whether the render pass
//! that wrote it has finished (so a device that depends on it can stop
//! polling and read once).

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A constant-region marker: either the whole buffer holds a single
/// repeated value, or no such shortcut applies and every sample must be
/// read individually.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstantRegion {
    /// No constant-value shortcut; read the buffer sample by sample.
    None,
    /// Every sample in the buffer equals this value.
    Constant(f32),
}

/// A mono scratch buffer used while rendering one block of audio.
///
/// Tracks three bits the graph processor (C7/C8) needs beyond the raw
/// samples:
///
/// - `valid`: whether the current contents reflect this render pass, or are
///   leftover data from a previous block that must not be read.
/// - constant-region: whether the whole buffer is a single repeated value
///   (set by devices that output silence or a DC value, cleared by any
///   per-sample write).
/// - `final_`: whether the device that owns this buffer has finished
///   writing for the current block (no more partial/incremental writes are
///   coming).
pub struct WorkBuffer {
    samples: Vec<f32>,
    valid: bool,
    constant: ConstantRegion,
    final_: bool,
}

impl WorkBuffer {
    /// Creates a new, invalid, zeroed buffer of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
            valid: false,
            constant: ConstantRegion::Constant(0.0),
            final_: false,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the buffer holds zero samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resizes the buffer, zeroing any newly added samples. Does not change
    /// validity or constant-region state.
    pub fn resize(&mut self, len: usize) {
        self.samples.resize(len, 0.0);
    }

    /// Marks the buffer invalid and resets it to a constant-zero region,
    /// ready for the next render pass to write into.
    pub fn reset_for_block(&mut self) {
        self.valid = false;
        self.final_ = false;
        self.constant = ConstantRegion::Constant(0.0);
    }

    /// Whether this buffer's contents belong to the current render pass.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the owning device has finished writing this block.
    pub fn is_final(&self) -> bool {
        self.final_
    }

    /// Marks the buffer as finished for this block. Only meaningful once
    /// `valid` is set; finalising an invalid buffer is a caller error we
    /// choose not to guard against at runtime (it indicates a graph bug
    /// that unit tests over `kunquat-graph` should catch).
    pub fn mark_final(&mut self) {
        self.final_ = true;
    }

    /// Returns the constant-region marker.
    pub fn constant_region(&self) -> ConstantRegion {
        self.constant
    }

    /// Fills the whole buffer with a single value and records it as a
    /// constant region, so downstream devices can skip per-sample reads.
    pub fn fill_constant(&mut self, value: f32) {
        self.samples.fill(value);
        self.constant = ConstantRegion::Constant(value);
        self.valid = true;
    }

    /// Returns the raw sample slice. Callers writing sample-by-sample
    /// should clear the constant-region marker via [`Self::mark_non_constant`]
    /// and set [`Self::mark_valid`] once done.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable access to the raw sample slice.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Clears the constant-region shortcut; call this before any
    /// per-sample write that might not fill the buffer with one value.
    pub fn mark_non_constant(&mut self) {
        self.constant = ConstantRegion::None;
    }

    /// Marks the buffer valid for the current render pass.
    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    /// Mixes another buffer's contents into this one sample-by-sample.
    pub fn accumulate_from(&mut self, other: &WorkBuffer) {
        debug_assert_eq!(self.samples.len(), other.samples.len());
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src;
        }
        self.constant = ConstantRegion::None;
        self.valid = true;
    }

    /// Copies another buffer's contents into this one verbatim, including
    /// its validity and constant-region state.
    pub fn copy_from(&mut self, other: &WorkBuffer) {
        self.samples.copy_from_slice(&other.samples);
        self.valid = other.valid;
        self.constant = other.constant;
        self.final_ = other.final_;
    }
}

/// Pool of reusable mono work buffers, sized by liveness analysis during
/// schedule compilation (see `kunquat-graph::graph`) rather than one slot
/// per edge.
pub struct BufferPool {
    buffers: Vec<WorkBuffer>,
    block_size: usize,
}

impl BufferPool {
    /// Creates a pool with `count` slots, each `block_size` samples long.
    pub fn new(count: usize, block_size: usize) -> Self {
        let buffers = (0..count).map(|_| WorkBuffer::new(block_size)).collect();
        Self {
            buffers,
            block_size,
        }
    }

    /// Number of buffer slots.
    pub fn count(&self) -> usize {
        self.buffers.len()
    }

    /// Block size of every buffer in the pool.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Reference to the buffer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= count()`.
    #[inline]
    pub fn get(&self, idx: usize) -> &WorkBuffer {
        &self.buffers[idx]
    }

    /// Mutable reference to the buffer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= count()`.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut WorkBuffer {
        &mut self.buffers[idx]
    }

    /// Mixes `source_idx`'s buffer into `dest_idx`'s (summation), the way a
    /// device graph combines every edge feeding one recv port.
    ///
    /// # Panics
    ///
    /// Panics if `source_idx == dest_idx` or either is out of range.
    pub fn accumulate(&mut self, dest_idx: usize, source_idx: usize) {
        assert_ne!(dest_idx, source_idx, "cannot accumulate a buffer into itself");
        let (lo, hi) = if dest_idx < source_idx {
            (dest_idx, source_idx)
        } else {
            (source_idx, dest_idx)
        };
        let (left, right) = self.buffers.split_at_mut(hi);
        if dest_idx < source_idx {
            left[lo].accumulate_from(&right[0]);
        } else {
            right[0].accumulate_from(&left[lo]);
        }
    }

    /// Resizes every buffer to a new block size.
    pub fn resize_all(&mut self, block_size: usize) {
        self.block_size = block_size;
        for buf in &mut self.buffers {
            buf.resize(block_size);
        }
    }

    /// Resets every buffer for a new render pass (invalid, constant-zero,
    /// not final).
    pub fn reset_all_for_block(&mut self) {
        for buf in &mut self.buffers {
            buf.reset_for_block();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_invalid_and_constant_zero() {
        let buf = WorkBuffer::new(16);
        assert!(!buf.is_valid());
        assert!(!buf.is_final());
        assert_eq!(buf.constant_region(), ConstantRegion::Constant(0.0));
    }

    #[test]
    fn fill_constant_marks_valid_and_constant() {
        let mut buf = WorkBuffer::new(8);
        buf.fill_constant(0.5);
        assert!(buf.is_valid());
        assert_eq!(buf.constant_region(), ConstantRegion::Constant(0.5));
        assert!(buf.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn accumulate_clears_constant_region() {
        let mut a = WorkBuffer::new(4);
        a.fill_constant(1.0);
        let mut b = WorkBuffer::new(4);
        b.fill_constant(2.0);
        a.accumulate_from(&b);
        assert_eq!(a.constant_region(), ConstantRegion::None);
        assert!(a.samples().iter().all(|&s| s == 3.0));
    }

    #[test]
    fn reset_for_block_invalidates() {
        let mut buf = WorkBuffer::new(4);
        buf.fill_constant(9.0);
        buf.mark_final();
        buf.reset_for_block();
        assert!(!buf.is_valid());
        assert!(!buf.is_final());
    }

    #[test]
    fn pool_accumulate_sums_source_into_dest() {
        let mut pool = BufferPool::new(2, 4);
        pool.get_mut(0).fill_constant(1.0);
        pool.get_mut(1).fill_constant(2.0);
        pool.accumulate(0, 1);
        assert!(pool.get(0).samples().iter().all(|&s| s == 3.0));
        assert!(pool.get(1).samples().iter().all(|&s| s == 2.0));
    }

    #[test]
    fn pool_get_mut_resets_independently() {
        let mut pool = BufferPool::new(3, 4);
        pool.get_mut(0).fill_constant(1.0);
        pool.get_mut(1).fill_constant(2.0);
        assert_eq!(pool.get(0).constant_region(), ConstantRegion::Constant(1.0));
        assert_eq!(pool.get(1).constant_region(), ConstantRegion::Constant(2.0));
        assert!(!pool.get(2).is_valid());
    }
}
