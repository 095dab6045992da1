//! Thread-unparking waker used by [`Runtime::block_on`](crate::Runtime::block_on).
//!
//! The blocked thread and every clone of its waker share one [`Unparker`]. Waking
//! records a notification before unparking, so the driving loop can tell a real
//! wakeup from a spurious return of `thread::park`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{RawWaker, RawWakerVTable, Waker};
use std::thread::{self, Thread};

/// Wake target for a thread parked inside `block_on`.
#[derive(Debug)]
pub(crate) struct Unparker {
    thread: Thread,
    notified: AtomicBool,
}

impl Unparker {
    /// Creates an unparker for the calling thread.
    ///
    /// Starts out notified so the first poll happens without parking.
    pub(crate) fn current() -> Arc<Self> {
        Arc::new(Self {
            thread: thread::current(),
            notified: AtomicBool::new(true),
        })
    }

    /// Marks the future as ready to be polled and unparks the owning thread.
    pub(crate) fn notify(&self) {
        self.notified.store(true, Ordering::Release);
        self.thread.unpark();
    }

    /// Consumes a pending notification, returning whether there was one.
    pub(crate) fn take_notification(&self) -> bool {
        self.notified.swap(false, Ordering::AcqRel)
    }
}

/// Creates a waker that notifies `unparker` when woken.
pub(crate) fn unpark_waker(unparker: Arc<Unparker>) -> Waker {
    let ptr = Arc::into_raw(unparker) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &VTABLE)) }
}

unsafe fn clone(ptr: *const ()) -> RawWaker {
    // One more owner of the same allocation.
    unsafe { Arc::increment_strong_count(ptr as *const Unparker) };
    RawWaker::new(ptr, &VTABLE)
}

unsafe fn wake(ptr: *const ()) {
    // Take ownership so the count drops at the end of this function
    let unparker = unsafe { Arc::from_raw(ptr as *const Unparker) };
    unparker.notify();
}

unsafe fn wake_by_ref(ptr: *const ()) {
    // Borrow only, the waker keeps its reference.
    let unparker = unsafe { &*(ptr as *const Unparker) };
    unparker.notify();
}

unsafe fn drop_waker(ptr: *const ()) {
    let _ = unsafe { Arc::from_raw(ptr as *const Unparker) };
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_waker);

#[cfg(test)]
mod tests {
    use super::{Unparker, unpark_waker};
    use std::sync::Arc;

    #[test]
    fn starts_notified_and_consumes_once() {
        let unparker = Unparker::current();
        assert!(unparker.take_notification());
        assert!(!unparker.take_notification());
    }

    #[test]
    fn wake_by_ref_records_notification() {
        let unparker = Unparker::current();
        unparker.take_notification();

        let waker = unpark_waker(unparker.clone());
        waker.wake_by_ref();
        assert!(unparker.take_notification());
    }

    #[test]
    fn clones_share_the_unparker_and_release_it() {
        let unparker = Unparker::current();
        unparker.take_notification();

        let waker = unpark_waker(unparker.clone());
        let second = waker.clone();
        assert_eq!(Arc::strong_count(&unparker), 3);

        second.wake();
        assert!(unparker.take_notification());
        assert_eq!(Arc::strong_count(&unparker), 2);

        drop(waker);
        assert_eq!(Arc::strong_count(&unparker), 1);
    }

    #[test]
    fn wake_from_another_thread() {
        let unparker = Unparker::current();
        unparker.take_notification();

        let waker = unpark_waker(unparker.clone());
        std::thread::spawn(move || waker.wake())
            .join()
            .expect("waker thread panicked");
        assert!(unparker.take_notification());
    }
}
