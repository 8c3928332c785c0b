use crate::{allocator::HostAllocator, semaphore::Semaphore};

/// Configuration entry-point for instantiating fences.
///
/// A concrete `Config` binds the semaphore implementation a fence joins
/// together and the host allocator its storage is carved from.
pub trait Config: Sized + 'static {
    /// The progress-counter primitive referenced by fence timepoints.
    type Semaphore: Semaphore;
    /// Allocator used for the fence's single contiguous block.
    type Allocator: HostAllocator;
}
