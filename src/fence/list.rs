use core::iter::Zip;
use core::slice::Iter;

/// Non-owning, read-only view over the occupied timepoints of a fence.
///
/// Both slices have the same length and are in occupancy order: the order in
/// which each distinct semaphore was first inserted. The view borrows the
/// fence and therefore cannot outlive it.
#[derive(Debug)]
pub struct SemaphoreList<'a, S> {
    semaphores: &'a [S],
    values: &'a [u64],
}

impl<S> Clone for SemaphoreList<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SemaphoreList<'_, S> {}

impl<'a, S> SemaphoreList<'a, S> {
    /// The view of a null fence: no timepoints.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            semaphores: &[],
            values: &[],
        }
    }

    pub(super) fn new(semaphores: &'a [S], values: &'a [u64]) -> Self {
        assert_eq!(semaphores.len(), values.len(), "SemaphoreList::new: [1]");
        Self { semaphores, values }
    }

    /// Number of occupied timepoints.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.semaphores.len()
    }

    /// `true` when no synchronization is required.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.semaphores.is_empty()
    }

    /// Semaphore references in occupancy order.
    #[must_use]
    pub const fn semaphores(&self) -> &'a [S] {
        self.semaphores
    }

    /// Target values, index-aligned with [`SemaphoreList::semaphores`].
    #[must_use]
    pub const fn values(&self) -> &'a [u64] {
        self.values
    }

    /// Iterate `(semaphore, target value)` pairs in occupancy order.
    pub fn iter(&self) -> Zip<Iter<'a, S>, Iter<'a, u64>> {
        self.semaphores.iter().zip(self.values)
    }
}

impl<'a, S> IntoIterator for SemaphoreList<'a, S> {
    type Item = (&'a S, &'a u64);
    type IntoIter = Zip<Iter<'a, S>, Iter<'a, u64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
