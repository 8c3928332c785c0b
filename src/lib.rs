//! Multi-timepoint synchronization fences and the graph rewrites that
//! simplify them.
//!
//! A fence joins any number of independent progress counters (semaphores) into
//! one handle meaning "all of these timepoints have been reached". This crate:
//! - Packs a fence into a single allocation: a header followed by a semaphore
//!   array and a value array, both sized once from a fixed capacity.
//! - Shares fences through an atomic reference count; the last release drops
//!   every held semaphore handle and frees the block.
//! - Merges repeated semaphores by keeping the maximum target value, whether
//!   they arrive through `insert` or `join`.
//! - Propagates completion (`signal`) and failure (`fail`) to every semaphore,
//!   cloning a failure status only for the observers beyond the last one.
//! - Provides a fence algebra: rewrite patterns that elide empty fences and
//!   deduplicate operands of create/join/await nodes in a dataflow graph
//!   without changing run-time synchronization.
//!
//! Key modules:
//! - `config`: binds a semaphore type and host allocator via the `Config`
//!   trait.
//! - `semaphore`: the `Semaphore` capability a fence builds upon.
//! - `allocator`: the `HostAllocator` trait and the global `SystemAllocator`.
//! - `fence`: the `Fence` handle, its `SemaphoreList` view and nullable-handle
//!   helpers.
//! - `graph` / `rewrite`: a small dataflow graph and a greedy fixed-point
//!   pattern driver.
//! - `algebra`: the fence rewrite patterns.
//!
//! Quick start:
//! 1. Implement `Semaphore` for your counter handle and `Config` naming it.
//! 2. Build a fence with `Fence::create` + `Fence::insert`, or `Fence::join`.
//! 3. Hand it off; consumers read `Fence::semaphore_list` to wait, producers
//!    call `Fence::signal` or `Fence::fail` once work completes.

/// Host allocator abstraction for fence storage.
pub mod allocator;
/// The fence rewrite patterns.
///
/// Exposes `fence_patterns`, the ordered rule set for fence creation, join
/// and await nodes.
pub mod algebra;
/// Public interface to configure fences.
///
/// Exposes the `Config` trait which binds the semaphore and allocator types
/// for a concrete instantiation.
pub mod config;
/// The reference-counted multi-timepoint fence.
///
/// Contains the packed layout, the monotonic insert/join merge, retain and
/// release, and signal/fail propagation.
pub mod fence;
/// Dataflow graph hosting fence operations at compile time.
pub mod graph;
/// Rewrite patterns and the greedy fixed-point driver.
pub mod rewrite;
/// The external progress-counter capability.
pub mod semaphore;
mod sync;
/// Associated-type aliases and hash collections used across the crate.
pub mod types;
