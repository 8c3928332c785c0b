use crate::{config::Config, semaphore::Semaphore};
use indexmap::{IndexMap as _IndexMap, IndexSet as _IndexSet};
use rustc_hash::FxBuildHasher;

/// Semaphore handle type bound to a specific `Config`.
pub type SemaphoreOf<C> = <C as Config>::Semaphore;
/// Failure status carried by [`Semaphore::fail`] for a specific `Config`.
pub type FailureStatus<C> = <SemaphoreOf<C> as Semaphore>::Status;
/// Error returned when signaling one of the fence's semaphores fails.
pub type SignalError<C> = <SemaphoreOf<C> as Semaphore>::Error;

/// `IndexMap` type with fast hasher.
pub type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
pub(crate) type IndexSet<T> = _IndexSet<T, FxBuildHasher>;
