//! Page-aligned I/O buffers
//!
//! [`AlignedBuffer`] keeps the true allocation and the aligned view side by
//! side, so release always frees exactly what was allocated no matter how the
//! alignment was obtained. Every acquire and release is counted in an
//! [`AllocationLedger`] shared by the allocator and its buffers.

use crate::config::AllocStrategy;
use crate::error::{CatError, Result};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Acquire/release counters for buffers handed out by one allocator
#[derive(Debug, Default)]
pub struct AllocationLedger {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl AllocationLedger {
    /// Buffers acquired so far
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    /// Buffers released so far
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Buffers currently live
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// Hands out page-aligned buffers using one [`AllocStrategy`]
#[derive(Debug, Clone)]
pub struct BufferAllocator {
    strategy: AllocStrategy,
    alignment: usize,
    ledger: Arc<AllocationLedger>,
}

impl BufferAllocator {
    /// Create an allocator aligning to `alignment`, which must be a power of two
    pub fn new(strategy: AllocStrategy, alignment: usize) -> Self {
        debug_assert!(alignment.is_power_of_two());
        Self {
            strategy,
            alignment,
            ledger: Arc::new(AllocationLedger::default()),
        }
    }

    /// Strategy in use
    pub fn strategy(&self) -> AllocStrategy {
        self.strategy
    }

    /// Alignment of every buffer handed out
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Counters shared with every buffer this allocator produced
    pub fn ledger(&self) -> Arc<AllocationLedger> {
        Arc::clone(&self.ledger)
    }

    /// Acquire a zeroed buffer of exactly `size` bytes starting on an
    /// `alignment` boundary
    pub fn acquire(&self, size: usize) -> Result<AlignedBuffer> {
        if size == 0 {
            return Err(CatError::allocation(size, "buffer size must be positive"));
        }

        let (raw, layout, offset) = match self.strategy {
            AllocStrategy::Native => {
                let layout = Layout::from_size_align(size, self.alignment)
                    .map_err(|e| CatError::allocation(size, e.to_string()))?;
                (allocate(layout, size)?, layout, 0)
            }
            AllocStrategy::Offset => {
                let total = size
                    .checked_add(self.alignment)
                    .ok_or_else(|| CatError::allocation(size, "size overflow"))?;
                let layout = Layout::from_size_align(total, 1)
                    .map_err(|e| CatError::allocation(size, e.to_string()))?;
                let raw = allocate(layout, size)?;

                let offset = raw.as_ptr().align_offset(self.alignment);
                if offset >= self.alignment {
                    unsafe { dealloc(raw.as_ptr(), layout) };
                    return Err(CatError::allocation(size, "cannot align allocation"));
                }
                (raw, layout, offset)
            }
        };

        // offset < alignment, so [offset, offset + size) lies inside the allocation
        let aligned = unsafe { NonNull::new_unchecked(raw.as_ptr().add(offset)) };

        self.ledger.acquired.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Acquired {} byte buffer ({} strategy, {} byte alignment)",
            size,
            self.strategy.name(),
            self.alignment
        );

        Ok(AlignedBuffer {
            raw,
            layout,
            aligned,
            capacity: size,
            alignment: self.alignment,
            strategy: self.strategy,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

fn allocate(layout: Layout, size: usize) -> Result<NonNull<u8>> {
    // Zeroed so the region can be handed out as an initialized slice
    let ptr = unsafe { alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or_else(|| CatError::allocation(size, "out of memory"))
}

/// A page-aligned byte region
///
/// Owns its allocation. Dropping the buffer releases it, so it is released at
/// most once and never while a slice borrowed from it is alive.
pub struct AlignedBuffer {
    /// Start of the true allocation
    raw: NonNull<u8>,
    /// Layout `raw` was allocated with
    layout: Layout,
    /// Aligned view into the allocation
    aligned: NonNull<u8>,
    capacity: usize,
    alignment: usize,
    strategy: AllocStrategy,
    ledger: Arc<AllocationLedger>,
}

impl AlignedBuffer {
    /// Usable size in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Alignment the buffer start honours
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Strategy that produced this buffer
    pub fn strategy(&self) -> AllocStrategy {
        self.strategy
    }

    /// Get a pointer to the aligned start
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.aligned.as_ptr()
    }

    /// Check the alignment invariant
    pub fn is_aligned(&self) -> bool {
        (self.as_ptr() as usize) % self.alignment == 0
    }

    /// View the whole buffer
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.aligned.as_ptr(), self.capacity) }
    }

    /// View the whole buffer mutably
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.aligned.as_ptr(), self.capacity) }
    }

    /// Release the buffer now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { dealloc(self.raw.as_ptr(), self.layout) };
        self.ledger.released.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.aligned)
            .field("capacity", &self.capacity)
            .field("alignment", &self.alignment)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Release a buffer if there is one
pub fn release(buffer: Option<AlignedBuffer>) {
    if let Some(buffer) = buffer {
        buffer.release();
    }
}
