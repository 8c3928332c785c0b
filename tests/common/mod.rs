#![allow(dead_code)]

use core::{alloc::Layout, ptr::NonNull};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tpf::{allocator::HostAllocator, config::Config, fence::FenceError, semaphore::Semaphore};

#[derive(Debug, Default)]
pub struct Journal {
    /// `(semaphore id, value)` in signal order, shared by all semaphores.
    pub signals: Mutex<Vec<(u32, u64)>>,
    /// `(semaphore id, status message)` in fail order.
    pub failures: Mutex<Vec<(u32, String)>>,
}

#[derive(Debug)]
struct SemaphoreState {
    id: u32,
    journal: Arc<Journal>,
    reject_signal: AtomicBool,
}

/// Counting semaphore double. Handle clones are retains; `Arc::strong_count`
/// tracks how many references are alive.
#[derive(Debug, Clone)]
pub struct TestSemaphore(Arc<SemaphoreState>);

impl TestSemaphore {
    pub fn new(id: u32, journal: &Arc<Journal>) -> Self {
        Self(Arc::new(SemaphoreState {
            id,
            journal: journal.clone(),
            reject_signal: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn references(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn reject_signals(&self) {
        self.0.reject_signal.store(true, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRejected(pub u32);

impl Semaphore for TestSemaphore {
    type Status = TestStatus;
    type Error = SignalRejected;

    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn signal(&self, value: u64) -> Result<(), SignalRejected> {
        if self.0.reject_signal.load(Ordering::Relaxed) {
            return Err(SignalRejected(self.0.id));
        }
        self.0.journal.signals.lock().unwrap().push((self.0.id, value));
        Ok(())
    }

    fn fail(&self, status: TestStatus) {
        self.0
            .journal
            .failures
            .lock()
            .unwrap()
            .push((self.0.id, status.message.clone()));
    }
}

/// Failure status that counts its clones and drops.
#[derive(Debug)]
pub struct TestStatus {
    pub message: String,
    clones: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl TestStatus {
    pub fn new(message: &str) -> (Self, StatusCounters) {
        let counters = StatusCounters::default();
        let status = Self {
            message: message.to_owned(),
            clones: counters.clones.clone(),
            drops: counters.drops.clone(),
        };
        (status, counters)
    }
}

impl Clone for TestStatus {
    fn clone(&self) -> Self {
        self.clones.fetch_add(1, Ordering::Relaxed);
        Self {
            message: self.message.clone(),
            clones: self.clones.clone(),
            drops: self.drops.clone(),
        }
    }
}

impl Drop for TestStatus {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default, Clone)]
pub struct StatusCounters {
    clones: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl StatusCounters {
    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::Relaxed)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct AllocatorState {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    refuse: AtomicBool,
}

/// Global-allocator wrapper counting blocks handed out and returned.
#[derive(Debug, Default, Clone)]
pub struct CountingAllocator(Arc<AllocatorState>);

impl CountingAllocator {
    pub fn allocations(&self) -> usize {
        self.0.allocations.load(Ordering::Relaxed)
    }

    pub fn deallocations(&self) -> usize {
        self.0.deallocations.load(Ordering::Relaxed)
    }

    pub fn live(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    pub fn refuse_allocations(&self) {
        self.0.refuse.store(true, Ordering::Relaxed);
    }
}

impl HostAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, FenceError> {
        if self.0.refuse.load(Ordering::Relaxed) {
            return Err(FenceError::OutOfMemory {
                size: layout.size(),
            });
        }
        let ptr = unsafe { std::alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(FenceError::OutOfMemory {
            size: layout.size(),
        })?;
        self.0.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.0.deallocations.fetch_add(1, Ordering::Relaxed);
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[derive(Debug)]
pub struct TestConfig;

impl Config for TestConfig {
    type Semaphore = TestSemaphore;
    type Allocator = CountingAllocator;
}

pub type Fence = tpf::fence::Fence<TestConfig>;

/// `n` distinct semaphores with ids `1..=n` sharing one journal.
pub fn semaphores(n: u32) -> (Arc<Journal>, Vec<TestSemaphore>) {
    let journal = Arc::new(Journal::default());
    let semaphores = (1..=n).map(|id| TestSemaphore::new(id, &journal)).collect();
    (journal, semaphores)
}

/// Occupied timepoints as `(semaphore id, value)` pairs in occupancy order.
pub fn timepoints(fence: &Fence) -> Vec<(u32, u64)> {
    fence
        .semaphore_list()
        .iter()
        .map(|(semaphore, &value)| (semaphore.id(), value))
        .collect()
}
