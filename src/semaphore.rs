use core::fmt::Debug;

/// Handle to a monotonically increasing 64-bit progress counter.
///
/// A handle is a counted reference: `Clone` retains the underlying semaphore
/// and dropping a handle releases it. Fences clone a handle exactly once per
/// distinct semaphore they hold and drop it when they are destroyed.
pub trait Semaphore: Clone + Debug + Send + Sync {
    /// Opaque failure status delivered through [`Semaphore::fail`].
    ///
    /// Cloning a status may be expensive; fences clone it only when more than
    /// one semaphore has to observe the same failure.
    type Status: Clone + Debug + Send;
    /// Error produced when signaling fails.
    type Error: Debug + Send;

    /// Reference equality: `true` when both handles name the same semaphore.
    fn same_as(&self, other: &Self) -> bool;

    /// Advance the counter to `value`.
    ///
    /// # Errors
    /// When the semaphore rejects the new value.
    fn signal(&self, value: u64) -> Result<(), Self::Error>;

    /// Put the semaphore into a failed state, taking ownership of `status`.
    fn fail(&self, status: Self::Status);
}
