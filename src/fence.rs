mod layout;
mod list;
mod propagate;

/// Error returned by fence construction and insertion.
///
/// Every variant is a resource-exhaustion condition that is surfaced to the
/// caller and never silently truncated.
pub use crate::fence::layout::{FenceError, MAX_CAPACITY};
pub use crate::fence::list::SemaphoreList;
pub use crate::fence::propagate::{fail, semaphore_list, signal};
use crate::{
    allocator::HostAllocator,
    config::Config,
    fence::layout::{FenceHeader, FenceLayout},
    semaphore::Semaphore,
    sync::{AtomicUsize, Ordering, fence},
    types::SemaphoreOf,
};
use core::{fmt, marker::PhantomData, ptr, ptr::NonNull, slice};
use tracing::{debug, trace_span, warn};

/// A set of `(semaphore, value)` timepoints that is reached once every
/// semaphore's counter has reached its recorded value.
///
/// The fence owns one contiguous block holding a header followed by two
/// parallel arrays sized to a capacity fixed at creation; the block is never
/// resized, so [`SemaphoreList`] views stay valid for the fence's lifetime.
///
/// A `Fence` value is one counted reference: `Clone` retains and `Drop`
/// releases. The last release drops every held semaphore handle in occupancy
/// order and returns the block to the allocator recorded at creation.
///
/// Absence of synchronization is modeled by `Option<Fence<C>>::None`; an empty
/// fence is equivalent to it everywhere a fence is accepted.
///
/// The build phase is single-writer: [`Fence::insert`] requires the handle to
/// be the only reference. Once cloned and handed off the fence is read-only.
#[must_use]
pub struct Fence<C: Config> {
    header: NonNull<FenceHeader<C>>,
    _marker: PhantomData<FenceHeader<C>>,
}

// SAFETY: Shared state is either atomic (`ref_count`) or only written while the
// handle is unique. Semaphores and the allocator are `Send + Sync` by their trait
// bounds, so readers, signalers and the final releaser may live on any thread.
unsafe impl<C: Config> Send for Fence<C> {}
// SAFETY: See `Send`; `&Fence` only exposes read access to the tail arrays.
unsafe impl<C: Config> Sync for Fence<C> {}

impl<C: Config> Fence<C> {
    /// Allocate an empty fence able to hold `capacity` distinct semaphores.
    ///
    /// No semaphores are retained by this call.
    ///
    /// # Errors
    /// - [`FenceError::CapacityTooLarge`] if `capacity` exceeds
    ///   [`MAX_CAPACITY`]; nothing is allocated.
    /// - [`FenceError::OutOfMemory`] if the allocator fails.
    pub fn create(capacity: usize, allocator: C::Allocator) -> Result<Self, FenceError> {
        let _span = trace_span!("fence.create", capacity).entered();
        let layout = FenceLayout::for_capacity::<C>(capacity).inspect_err(|error| {
            warn!(%error, "fence creation rejected");
        })?;
        let block = allocator.allocate(layout.block)?;
        let header = block.cast::<FenceHeader<C>>();
        // SAFETY: `block` is a fresh allocation of `layout.block`, which starts with a
        // correctly aligned `FenceHeader<C>`. The tail arrays stay uninitialized until
        // `count` covers them.
        unsafe {
            header.as_ptr().write(FenceHeader {
                ref_count: AtomicUsize::new(1),
                allocator,
                capacity: capacity.try_into().expect("Fence::create: [1]"),
                count: 0,
            });
        }
        Ok(Self {
            header,
            _marker: PhantomData,
        })
    }

    /// Allocate a fence holding the single timepoint `(semaphore, value)`.
    ///
    /// # Errors
    /// [`FenceError::OutOfMemory`] if the allocator fails.
    pub fn create_at(
        semaphore: &SemaphoreOf<C>,
        value: u64,
        allocator: C::Allocator,
    ) -> Result<Self, FenceError> {
        let mut fence = Self::create(1, allocator)?;
        fence.insert(semaphore, value)?;
        Ok(fence)
    }

    /// Join any number of nullable fences into a fresh fence holding the union
    /// of their timepoints.
    ///
    /// Capacity is the sum of the inputs' occupied counts; duplicates across
    /// inputs are merged by [`Fence::insert`], keeping the maximum value.
    /// Inputs are visited in order, each in its own occupancy order.
    ///
    /// Returns `Ok(None)` when every input is null or empty.
    ///
    /// # Errors
    /// Propagates [`Fence::create`] and [`Fence::insert`] failures; the partially
    /// built fence is released before the error is returned.
    pub fn join<'a, I>(fences: I, allocator: C::Allocator) -> Result<Option<Self>, FenceError>
    where
        I: IntoIterator<Item = Option<&'a Self>>,
        I::IntoIter: Clone,
    {
        let _span = trace_span!("fence.join").entered();
        let fences = fences.into_iter();
        let total_count: usize = fences.clone().flatten().map(Self::len).sum();
        if total_count == 0 {
            return Ok(None);
        }
        let mut joined = Self::create(total_count, allocator)?;
        for source in fences.flatten() {
            joined.extend(source)?;
        }
        Ok(Some(joined))
    }

    /// Record that `semaphore` must reach at least `value`.
    ///
    /// An already present semaphore keeps the maximum of its stored value and
    /// `value` and never consumes capacity. A new semaphore is appended and
    /// retained. Lookup is a linear scan: O(capacity) per insert.
    ///
    /// # Panics
    /// If the fence is shared (another handle exists); a published fence must
    /// not be mutated.
    ///
    /// # Errors
    /// [`FenceError::CapacityReached`] if `semaphore` is new and the fence is full.
    pub fn insert(&mut self, semaphore: &SemaphoreOf<C>, value: u64) -> Result<(), FenceError> {
        assert!(self.is_unique(), "Fence::insert: [1]");
        let layout = self.layout();
        let header = self.header.as_ptr();
        // SAFETY: The handle is unique, so nothing else reads or writes the header or
        // the tail arrays during this call. Indices below `count` are initialized.
        unsafe {
            let count = usize::from((*header).count);
            let capacity = (*header).capacity;
            let base = header.cast::<u8>();
            let semaphores = base.add(layout.semaphores_offset).cast::<SemaphoreOf<C>>();
            let values = base.add(layout.values_offset).cast::<u64>();

            let occupied = slice::from_raw_parts(semaphores, count);
            if let Some(idx) = occupied.iter().position(|s| s.same_as(semaphore)) {
                let slot = values.add(idx);
                *slot = (*slot).max(value);
                return Ok(());
            }

            if count >= usize::from(capacity) {
                warn!(capacity, "fence unique semaphore capacity reached");
                return Err(FenceError::CapacityReached { capacity });
            }
            semaphores.add(count).write(semaphore.clone());
            values.add(count).write(value);
            (*header).count += 1;
        }
        Ok(())
    }

    /// Insert every timepoint of `other` into this fence.
    ///
    /// # Panics
    /// If this fence is shared.
    ///
    /// # Errors
    /// [`FenceError::CapacityReached`] if the union does not fit. Timepoints
    /// inserted before the failure are kept.
    pub fn extend(&mut self, other: &Self) -> Result<(), FenceError> {
        for (semaphore, &value) in other.semaphore_list() {
            self.insert(semaphore, value)?;
        }
        Ok(())
    }

    /// Read-only view over the occupied timepoints.
    pub fn semaphore_list(&self) -> SemaphoreList<'_, SemaphoreOf<C>> {
        let layout = self.layout();
        let count = self.len();
        // SAFETY: Offsets come from the layout the block was allocated with, the first
        // `count` elements of both arrays are initialized, and the arrays are only
        // written through a unique handle, which cannot coexist with this borrow.
        unsafe {
            let base = self.header.as_ptr().cast::<u8>().cast_const();
            let semaphores = base.add(layout.semaphores_offset).cast::<SemaphoreOf<C>>();
            let values = base.add(layout.values_offset).cast::<u64>();
            SemaphoreList::new(
                slice::from_raw_parts(semaphores, count),
                slice::from_raw_parts(values, count),
            )
        }
    }

    /// Number of distinct semaphores currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.header().count)
    }

    /// `true` when the fence requires no synchronization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header().count == 0
    }

    /// Maximum number of distinct semaphores, fixed at creation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        usize::from(self.header().capacity)
    }

    /// Number of live references to this fence.
    #[must_use]
    pub fn strong_count(this: &Self) -> usize {
        this.header().ref_count.load(Ordering::Acquire)
    }

    fn is_unique(&self) -> bool {
        Self::strong_count(self) == 1
    }

    fn header(&self) -> &FenceHeader<C> {
        // SAFETY: The header is initialized at creation and lives until the last
        // handle is dropped; `self` is such a handle.
        unsafe { self.header.as_ref() }
    }

    fn layout(&self) -> FenceLayout {
        FenceLayout::for_capacity::<C>(self.capacity()).expect("Fence::layout: [1]")
    }

    /// # Safety
    ///
    /// Must be called exactly once, after the reference count dropped to zero
    /// and an Acquire fence synchronized with every prior release.
    unsafe fn destroy(&mut self) {
        assert_eq!(
            self.header().ref_count.load(Ordering::Relaxed),
            0,
            "Fence::destroy: [1]"
        );
        let layout = self.layout();
        let count = self.len();
        debug!(count, capacity = self.capacity(), "destroying fence");
        let header = self.header.as_ptr();
        // SAFETY: No other handle exists. The first `count` semaphores are initialized
        // and dropped in occupancy order; the header is moved out exactly once and the
        // block is returned to the allocator that produced it with the same layout.
        unsafe {
            let semaphores = header
                .cast::<u8>()
                .add(layout.semaphores_offset)
                .cast::<SemaphoreOf<C>>();
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(semaphores, count));
            let FenceHeader { allocator, .. } = header.read();
            allocator.deallocate(self.header.cast::<u8>(), layout.block);
        }
    }
}

impl<C: Config> Clone for Fence<C> {
    /// Retain: adds a reference to the same fence.
    fn clone(&self) -> Self {
        let previous = self.header().ref_count.fetch_add(1, Ordering::Relaxed);
        assert!(previous <= isize::MAX as usize, "Fence::clone: [1]");
        Self {
            header: self.header,
            _marker: PhantomData,
        }
    }
}

impl<C: Config> Drop for Fence<C> {
    /// Release: destroys the fence when the last reference goes away.
    fn drop(&mut self) {
        if self.header().ref_count.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        fence(Ordering::Acquire);
        // SAFETY: This handle observed the transition to zero, so it is the only one
        // left and all other handles' accesses happen-before this point.
        unsafe { self.destroy() };
    }
}

impl<C: Config> fmt::Debug for Fence<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self.semaphore_list();
        f.debug_struct("Fence")
            .field("capacity", &self.capacity())
            .field("timepoints", &list.iter().collect::<Vec<_>>())
            .finish()
    }
}
