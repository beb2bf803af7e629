//! Bounded single-producer/single-consumer channels.
//!
//! Lock-free ring buffer with atomic head/tail indices, split into a
//! non-`Clone` [`Producer`] and [`Consumer`] so each end has exactly one
//! owner.
//!
//! ```text
//! ┌────────────┐ try_send / send ┌───────────┐ recv / try_recv ┌────────────┐
//! │  Producer  │────────────────▶│   Ring    │────────────────▶│  Consumer  │
//! │ (ISR/task) │                 │  (FIFO)   │                 │   (task)   │
//! └────────────┘                 └───────────┘                 └────────────┘
//! ```
//!
//! `try_send` and `try_recv` never block, take no lock and allocate nothing
//! on the target, so the producer end can live in an interrupt handler.
//! A task that parks in `recv` (or in `send` on a full ring) leaves its
//! handle in a wait slot; the other end takes it with one atomic swap and
//! wakes it with a FreeRTOS task notification, which is interrupt-safe.

use core::cell::{Cell, UnsafeCell};
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use park::WaitSlot;

/// Create a channel holding at most `N` items.
pub fn spsc<T, const N: usize>() -> (Producer<T, N>, Consumer<T, N>) {
    const { assert!(N > 0, "channel capacity must be non-zero") };
    let ring = Arc::new(Ring::<T, N>::new());
    (
        Producer {
            ring: ring.clone(),
            _unsync: PhantomData,
        },
        Consumer {
            ring,
            _unsync: PhantomData,
        },
    )
}

// ── Ring buffer ───────────────────────────────────────────────
//
// Indices run modulo 2N so a full ring (len N) and an empty one (len 0)
// stay distinguishable without a spare slot.

struct Ring<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Next slot to write. Stored only by the producer.
    head: AtomicUsize,
    /// Next slot to read. Stored only by the consumer.
    tail: AtomicUsize,
    /// Consumer parked waiting for data.
    readable: WaitSlot,
    /// Producer parked waiting for space.
    writable: WaitSlot,
}

// SAFETY: a slot is written only by the producer while it is outside
// `tail..head` and read only by the consumer while inside it; the
// Release/Acquire pairs on `head` and `tail` hand each slot over.
unsafe impl<T: Send, const N: usize> Sync for Ring<T, N> {}
unsafe impl<T: Send, const N: usize> Send for Ring<T, N> {}

impl<T, const N: usize> Ring<T, N> {
    fn new() -> Self {
        Self {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            readable: WaitSlot::new(),
            writable: WaitSlot::new(),
        }
    }

    #[inline]
    fn advance(i: usize) -> usize {
        (i + 1) % (2 * N)
    }

    #[inline]
    fn occupied(head: usize, tail: usize) -> usize {
        (head + 2 * N - tail) % (2 * N)
    }

    /// Snapshot; either end may move while it is taken.
    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        Self::occupied(head, tail).min(N)
    }

    /// Producer side.
    fn push(&self, item: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if Self::occupied(head, tail) == N {
            return Err(item);
        }
        // SAFETY: the ring is not full, so slot `head` is outside
        // `tail..head` and the consumer will not touch it until `head`
        // is published below.
        unsafe { (*self.slots[head % N].get()).write(item) };
        self.head.store(Self::advance(head), Ordering::Release);
        self.readable.wake();
        Ok(())
    }

    /// Consumer side.
    fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: slot `tail` was initialised by the producer before it
        // published `head`, and the producer will not reuse it until
        // `tail` moves past it below.
        let item = unsafe { (*self.slots[tail % N].get()).assume_init_read() };
        self.tail.store(Self::advance(tail), Ordering::Release);
        self.writable.wake();
        Some(item)
    }
}

impl<T, const N: usize> Drop for Ring<T, N> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

// ── Public halves ─────────────────────────────────────────────
//
// Both halves are `Send` but not `Sync`: an end can move to another
// thread (or into an interrupt handler) but never be used from two at once.

type Unsync = PhantomData<Cell<()>>;

/// Sending half.
pub struct Producer<T, const N: usize> {
    ring: Arc<Ring<T, N>>,
    _unsync: Unsync,
}

impl<T, const N: usize> Producer<T, N> {
    /// Enqueue without blocking. A full channel hands `item` back and
    /// leaves the queued items untouched. Interrupt-safe.
    #[inline]
    pub fn try_send(&self, item: T) -> Result<(), T> {
        self.ring.push(item)
    }

    /// Enqueue, parking the caller while the channel is full. Task context only.
    pub fn send(&self, mut item: T) {
        loop {
            match self.ring.push(item) {
                Ok(()) => return,
                Err(back) => {
                    item = back;
                    self.ring.writable.park_while(|| self.ring.len() == N);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// `true` while the receiving end is parked waiting for data.
    pub fn consumer_parked(&self) -> bool {
        self.ring.readable.is_occupied()
    }
}

/// Receiving half.
pub struct Consumer<T, const N: usize> {
    ring: Arc<Ring<T, N>>,
    _unsync: Unsync,
}

impl<T, const N: usize> Consumer<T, N> {
    /// Dequeue the oldest item, parking the caller until one arrives.
    /// Task context only.
    pub fn recv(&self) -> T {
        loop {
            if let Some(item) = self.ring.pop() {
                return item;
            }
            self.ring.readable.park_while(|| self.ring.len() == 0);
        }
    }

    /// Dequeue the oldest item if there is one.
    pub fn try_recv(&self) -> Option<T> {
        self.ring.pop()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }
}

// ── Parking ───────────────────────────────────────────────────
//
// One waiter per slot. The waiter publishes its handle, re-checks the
// ring, then sleeps; the waker takes the handle with a single swap, so
// exactly one side ends up owning it. Both sides fence before touching
// the other's state so neither a push nor a park can be missed.

#[cfg(target_os = "espidf")]
mod park {
    use core::ffi::c_void;
    use core::num::NonZeroU32;
    use core::ptr;
    use core::sync::atomic::{fence, AtomicPtr, Ordering};

    use esp_idf_svc::hal::delay::BLOCK;
    use esp_idf_svc::hal::task;

    /// FreeRTOS handle of the parked task, or null.
    pub struct WaitSlot(AtomicPtr<c_void>);

    impl WaitSlot {
        pub const fn new() -> Self {
            Self(AtomicPtr::new(ptr::null_mut()))
        }

        /// Wake the parked task, if any. Interrupt-safe: one atomic swap
        /// and a `FromISR`-aware task notification.
        #[inline]
        pub fn wake(&self) {
            fence(Ordering::SeqCst);
            let parked = self.0.swap(ptr::null_mut(), Ordering::AcqRel);
            if !parked.is_null() {
                // SAFETY: the handle was stored by a live task that is
                // blocked (or about to block) on its notification.
                unsafe {
                    task::notify_and_yield(parked.cast(), NonZeroU32::MIN);
                }
            }
        }

        /// Sleep until woken, unless `blocked()` is already false once
        /// the handle is published. May return spuriously.
        pub fn park_while(&self, blocked: impl Fn() -> bool) {
            let Some(me) = task::current() else {
                return;
            };
            self.0.store(me.cast(), Ordering::Release);
            fence(Ordering::SeqCst);
            if blocked() {
                task::wait_notification(BLOCK);
            }
            self.0.store(ptr::null_mut(), Ordering::Release);
        }

        pub fn is_occupied(&self) -> bool {
            !self.0.load(Ordering::Acquire).is_null()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod park {
    use core::ptr;
    use core::sync::atomic::{fence, AtomicPtr, Ordering};
    use std::thread::{self, Thread};

    /// Boxed handle of the parked thread, or null. Whoever swaps a
    /// non-null pointer out owns (and frees) the box.
    pub struct WaitSlot(AtomicPtr<Thread>);

    impl WaitSlot {
        pub const fn new() -> Self {
            Self(AtomicPtr::new(ptr::null_mut()))
        }

        #[inline]
        pub fn wake(&self) {
            fence(Ordering::SeqCst);
            let parked = self.0.swap(ptr::null_mut(), Ordering::AcqRel);
            if !parked.is_null() {
                // SAFETY: the swap transferred ownership of the box to us.
                let thread = unsafe { Box::from_raw(parked) };
                thread.unpark();
            }
        }

        pub fn park_while(&self, blocked: impl Fn() -> bool) {
            let me = Box::into_raw(Box::new(thread::current()));
            Self::reclaim(self.0.swap(me, Ordering::AcqRel));
            fence(Ordering::SeqCst);
            if blocked() {
                thread::park();
            }
            Self::reclaim(self.0.swap(ptr::null_mut(), Ordering::AcqRel));
        }

        fn reclaim(p: *mut Thread) {
            if !p.is_null() {
                // SAFETY: the swap transferred ownership of the box to us.
                drop(unsafe { Box::from_raw(p) });
            }
        }

        pub fn is_occupied(&self) -> bool {
            !self.0.load(Ordering::Acquire).is_null()
        }
    }

    impl Drop for WaitSlot {
        fn drop(&mut self) {
            Self::reclaim(*self.0.get_mut());
        }
    }
}
