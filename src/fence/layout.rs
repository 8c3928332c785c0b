use crate::{config::Config, sync::AtomicUsize};
use core::alloc::Layout;
use thiserror::Error;

/// Largest number of distinct semaphores a single fence may hold.
///
/// Occupancy is tracked in a 16-bit field; `u16::MAX` itself is reserved.
pub const MAX_CAPACITY: usize = u16::MAX as usize - 1;

/// Error kind for fence construction and insertion failures.
///
/// All variants describe resource exhaustion: a capacity chosen too small, or
/// too many distinct timepoints requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FenceError {
    /// Requested capacity does not fit the 16-bit occupancy field.
    #[error("capacity {capacity} is too large for fence storage (max {max})")]
    CapacityTooLarge {
        /// Capacity that was requested.
        capacity: usize,
        /// Maximum supported capacity.
        max: usize,
    },
    /// A new distinct semaphore was inserted into a full fence.
    #[error("fence unique semaphore capacity {capacity} reached")]
    CapacityReached {
        /// Fixed capacity of the fence.
        capacity: u16,
    },
    /// The host allocator could not provide the fence block.
    #[error("failed to allocate {size} bytes for fence storage")]
    OutOfMemory {
        /// Size of the requested block in bytes.
        size: usize,
    },
}

/// Fixed-size prefix of every fence allocation.
///
/// Followed in the same block by two arrays aligned to their element types:
/// `C::Semaphore semaphores[capacity]` then `u64 values[capacity]`.
#[repr(C)]
pub(super) struct FenceHeader<C: Config> {
    pub(super) ref_count: AtomicUsize,
    pub(super) allocator: C::Allocator,
    pub(super) capacity: u16,
    pub(super) count: u16,
}

/// Placement of the header and the two tail arrays within one block.
#[derive(Debug, Clone, Copy)]
pub(super) struct FenceLayout {
    pub(super) block: Layout,
    pub(super) semaphores_offset: usize,
    pub(super) values_offset: usize,
}

impl FenceLayout {
    pub(super) fn for_capacity<C: Config>(capacity: usize) -> Result<Self, FenceError> {
        let too_large = || FenceError::CapacityTooLarge {
            capacity,
            max: MAX_CAPACITY,
        };
        if capacity > MAX_CAPACITY {
            return Err(too_large());
        }
        let header = Layout::new::<FenceHeader<C>>();
        let semaphores = Layout::array::<C::Semaphore>(capacity).map_err(|_| too_large())?;
        let values = Layout::array::<u64>(capacity).map_err(|_| too_large())?;
        let (block, semaphores_offset) = header.extend(semaphores).map_err(|_| too_large())?;
        let (block, values_offset) = block.extend(values).map_err(|_| too_large())?;
        Ok(Self {
            block: block.pad_to_align(),
            semaphores_offset,
            values_offset,
        })
    }
}
