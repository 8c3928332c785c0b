use crate::fence::FenceError;
use core::{alloc::Layout, fmt::Debug, ptr::NonNull};

/// Host memory source for fence storage.
///
/// A fence records the allocator it was created with and returns its block to
/// that same allocator on destruction, possibly from another thread.
pub trait HostAllocator: Debug + Send + Sync {
    /// Allocate a block satisfying `layout`.
    ///
    /// # Errors
    /// [`FenceError::OutOfMemory`] when the block cannot be provided.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, FenceError>;

    /// Return a block previously obtained from [`HostAllocator::allocate`].
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator (or a
    /// clone sharing its backing store) with the same `layout`, and must not
    /// be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocator backed by the process-wide global allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemAllocator;

impl HostAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, FenceError> {
        // Fence layouts always include the header, so the size is non-zero.
        assert_ne!(layout.size(), 0, "SystemAllocator::allocate: [1]");
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(FenceError::OutOfMemory {
            size: layout.size(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarded from the caller's contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
