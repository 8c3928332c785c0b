use crate::{
    config::Config,
    fence::{Fence, SemaphoreList},
    semaphore::Semaphore,
    types::{FailureStatus, SemaphoreOf, SignalError},
};
use tracing::trace_span;

impl<C: Config> Fence<C> {
    /// Signal every semaphore to its recorded value, in occupancy order.
    ///
    /// Not transactional: signaling stops at the first failure and later
    /// semaphores stay unsignaled. After an error the synchronization state
    /// must be treated as unreliable rather than retried.
    ///
    /// # Errors
    /// The error of the first semaphore that failed to signal.
    pub fn signal(&self) -> Result<(), SignalError<C>> {
        let list = self.semaphore_list();
        let _span = trace_span!("fence.signal", count = list.len()).entered();
        for (semaphore, &value) in list {
            semaphore.signal(value)?;
        }
        Ok(())
    }

    /// Deliver `status` to every semaphore in occupancy order.
    ///
    /// The status is cloned for each semaphore except the last, which receives
    /// the original: a single-timepoint fence never clones, and `N` timepoints
    /// cost `N - 1` clones. With no timepoints the status is dropped.
    pub fn fail(&self, status: FailureStatus<C>) {
        fail_list(self.semaphore_list(), status);
    }
}

fn fail_list<S: Semaphore>(list: SemaphoreList<'_, S>, status: S::Status) {
    let _span = trace_span!("fence.fail", count = list.len(), ?status).entered();
    let Some((last, rest)) = list.semaphores().split_last() else {
        // Nobody observes an empty fence; the status is consumed here.
        drop(status);
        return;
    };
    for semaphore in rest {
        semaphore.fail(status.clone());
    }
    last.fail(status);
}

/// Signal a nullable fence. A null fence succeeds trivially.
///
/// # Errors
/// See [`Fence::signal`].
pub fn signal<C: Config>(fence: Option<&Fence<C>>) -> Result<(), SignalError<C>> {
    fence.map_or(Ok(()), Fence::signal)
}

/// Fail a nullable fence. A null fence drops `status`.
pub fn fail<C: Config>(fence: Option<&Fence<C>>, status: FailureStatus<C>) {
    fail_list(semaphore_list(fence), status);
}

/// Timepoint view of a nullable fence. A null fence yields an empty view.
#[must_use]
pub fn semaphore_list<C: Config>(fence: Option<&Fence<C>>) -> SemaphoreList<'_, SemaphoreOf<C>> {
    fence.map_or_else(SemaphoreList::empty, Fence::semaphore_list)
}
