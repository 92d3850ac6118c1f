//! Arena pools with freelists and generation tags
//!
//! Each pool is a fixed array of slots living inside the slab account. A
//! handle is (slot index, generation); the generation is bumped on every
//! allocation so a handle held across a free/realloc cycle dereferences to
//! StaleHandle instead of the recycled payload.

use percolator_common::{Handle, PercolatorError};

/// Freelist pool over a fixed slot array
#[repr(C)]
pub struct Pool<T: Copy, const N: usize> {
    /// Slot array
    pub items: [T; N],
    /// Index of the first free slot
    pub free_head: u32,
    /// Number of used slots
    pub used_count: u32,
}

impl<T: Copy + PoolItem, const N: usize> Pool<T, N> {
    /// Thread the freelist through zeroed memory, in place.
    ///
    /// The pool lives inside a 10 MB account; it is never constructed by
    /// value, only initialized over the borrowed bytes.
    pub fn init(&mut self) {
        for i in 0..N {
            self.items[i].set_next_free((i + 1) as u32);
            self.items[i].set_used(false);
        }
        self.free_head = 0;
        self.used_count = 0;
    }

    /// Allocate a slot, bumping its generation
    pub fn alloc(&mut self) -> Option<Handle> {
        let idx = self.free_head;
        if idx >= N as u32 {
            return None;
        }

        self.free_head = self.items[idx as usize].next_free();
        self.used_count += 1;

        let item = &mut self.items[idx as usize];
        item.set_used(true);
        item.bump_generation();

        Some(Handle {
            idx,
            gen: item.generation(),
        })
    }

    /// Return a slot to the freelist; double-free is a no-op
    pub fn free(&mut self, idx: u32) {
        if idx >= N as u32 {
            return;
        }
        if !self.items[idx as usize].is_used() {
            return;
        }

        self.items[idx as usize].set_used(false);
        self.items[idx as usize].set_next_free(self.free_head);
        self.free_head = idx;
        self.used_count = self.used_count.saturating_sub(1);
    }

    /// Get a used slot by raw index
    pub fn get(&self, idx: u32) -> Option<&T> {
        if idx >= N as u32 || !self.items[idx as usize].is_used() {
            return None;
        }
        Some(&self.items[idx as usize])
    }

    /// Get a used slot mutably by raw index
    pub fn get_mut(&mut self, idx: u32) -> Option<&mut T> {
        if idx >= N as u32 || !self.items[idx as usize].is_used() {
            return None;
        }
        Some(&mut self.items[idx as usize])
    }

    /// Dereference a handle, checking the stored generation
    pub fn get_checked(&self, handle: Handle) -> Result<&T, PercolatorError> {
        let item = self.get(handle.idx).ok_or(PercolatorError::StaleHandle)?;
        if item.generation() != handle.gen {
            return Err(PercolatorError::StaleHandle);
        }
        Ok(item)
    }

    /// Mutably dereference a handle, checking the stored generation
    pub fn get_checked_mut(&mut self, handle: Handle) -> Result<&mut T, PercolatorError> {
        if handle.idx >= N as u32 {
            return Err(PercolatorError::StaleHandle);
        }
        let item = &mut self.items[handle.idx as usize];
        if !item.is_used() || item.generation() != handle.gen {
            return Err(PercolatorError::StaleHandle);
        }
        Ok(item)
    }

    /// Used slot count
    pub fn used(&self) -> u32 {
        self.used_count
    }

    /// Free slot count (capacity minus occupancy)
    pub fn free_len(&self) -> u32 {
        N as u32 - self.used_count
    }

    pub fn is_full(&self) -> bool {
        self.used_count >= N as u32
    }

    pub fn capacity(&self) -> u32 {
        N as u32
    }
}

/// Trait for records that can live in a pool
pub trait PoolItem: Copy {
    fn set_next_free(&mut self, next: u32);
    fn next_free(&self) -> u32;
    fn set_used(&mut self, used: bool);
    fn is_used(&self) -> bool;
    fn generation(&self) -> u32;
    fn bump_generation(&mut self);
}

macro_rules! impl_pool_item {
    ($ty:ty) => {
        impl PoolItem for $ty {
            fn set_next_free(&mut self, next: u32) {
                self.next_free = next;
            }
            fn next_free(&self) -> u32 {
                self.next_free
            }
            fn set_used(&mut self, used: bool) {
                self.used = used;
            }
            fn is_used(&self) -> bool {
                self.used
            }
            fn generation(&self) -> u32 {
                self.gen
            }
            fn bump_generation(&mut self) {
                self.gen = self.gen.wrapping_add(1);
            }
        }
    };
}

impl_pool_item!(percolator_common::Order);
impl_pool_item!(percolator_common::Position);
impl_pool_item!(percolator_common::Reservation);
impl_pool_item!(percolator_common::Slice);
impl_pool_item!(percolator_common::AggressorEntry);
