#![allow(missing_docs)]
#![cfg(feature = "loom")]

use core::{alloc::Layout, fmt, ptr::NonNull};
use loom::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use tpf::{
    allocator::HostAllocator, config::Config, fence::Fence, fence::FenceError,
    semaphore::Semaphore,
};

struct Counter {
    signaled: Mutex<u64>,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            signaled: Mutex::new(0),
        })
    }

    fn signaled(&self) -> u64 {
        *self.signaled.lock().unwrap()
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct LoomSemaphore(Arc<Counter>);

impl Semaphore for LoomSemaphore {
    type Status = ();
    type Error = ();

    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn signal(&self, value: u64) -> Result<(), ()> {
        let mut signaled = self.0.signaled.lock().unwrap();
        *signaled = (*signaled).max(value);
        Ok(())
    }

    fn fail(&self, (): ()) {}
}

#[derive(Clone)]
struct LoomAllocator {
    frees: Arc<AtomicUsize>,
}

impl fmt::Debug for LoomAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoomAllocator").finish_non_exhaustive()
    }
}

impl HostAllocator for LoomAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, FenceError> {
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(FenceError::OutOfMemory {
            size: layout.size(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

struct LoomConfig;

impl Config for LoomConfig {
    type Semaphore = LoomSemaphore;
    type Allocator = LoomAllocator;
}

#[test]
fn loom_concurrent_release_destroys_once() {
    loom::model(|| {
        let frees = Arc::new(AtomicUsize::new(0));
        let semaphore = LoomSemaphore(Counter::new());
        let fence = Fence::<LoomConfig>::create_at(
            &semaphore,
            7,
            LoomAllocator {
                frees: frees.clone(),
            },
        )
        .expect("create must succeed");

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let fence = fence.clone();
                thread::spawn(move || drop(fence))
            })
            .collect();
        drop(fence);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frees.load(Ordering::Relaxed), 1);
        assert_eq!(Arc::strong_count(&semaphore.0), 1);
    });
}

#[test]
fn loom_signal_from_other_thread_observes_build() {
    loom::model(|| {
        let frees = Arc::new(AtomicUsize::new(0));
        let lhs = LoomSemaphore(Counter::new());
        let rhs = LoomSemaphore(Counter::new());
        let mut fence = Fence::<LoomConfig>::create(
            2,
            LoomAllocator {
                frees: frees.clone(),
            },
        )
        .expect("create must succeed");
        fence.insert(&lhs, 3).unwrap();
        fence.insert(&rhs, 5).unwrap();
        fence.insert(&lhs, 4).unwrap();

        let published = fence.clone();
        let signaler = thread::spawn(move || published.signal());
        let reader = thread::spawn(move || fence.semaphore_list().values().to_vec());
        signaler.join().unwrap().unwrap();
        assert_eq!(reader.join().unwrap(), vec![4, 5]);

        assert_eq!(lhs.0.signaled(), 4);
        assert_eq!(rhs.0.signaled(), 5);
        assert_eq!(frees.load(Ordering::Relaxed), 1);
    });
}
