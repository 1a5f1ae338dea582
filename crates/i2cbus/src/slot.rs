use lock_api::RawReentrantMutex;
use parking_lot::{RawMutex, RawThreadId};
use portable_atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::LockError;

type RawBusMutex = RawReentrantMutex<RawMutex, RawThreadId>;

/// Lock table entry for one bus index.
///
/// `depth` and `owner_tag` are only written by the thread that owns `mutex`.
/// `owner_tag` is read by other threads to decide whether a cooperating
/// handle may skip the lock.
pub(crate) struct BusSlot {
    index: usize,
    mutex: RawBusMutex,
    depth: AtomicUsize,
    owner_tag: AtomicU64,
}

impl BusSlot {
    pub(crate) const fn new(index: usize) -> Self {
        Self {
            index,
            mutex: RawBusMutex::INIT,
            depth: AtomicUsize::new(0),
            owner_tag: AtomicU64::new(0),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Block until the calling thread owns the bus.
    pub(crate) fn lock(&self, tag: u64) {
        self.mutex.lock();
        self.enter(tag);
    }

    /// Acquire without blocking. Succeeds immediately if the calling thread
    /// already owns the bus.
    pub(crate) fn try_lock(&self, tag: u64) -> bool {
        if self.mutex.try_lock() {
            self.enter(tag);
            true
        } else {
            false
        }
    }

    /// Release one hold taken by the calling thread.
    pub(crate) fn unlock(&self) -> Result<(), LockError> {
        if !self.mutex.is_owned_by_current_thread() {
            return Err(LockError::NotOwner { bus: self.index });
        }
        // SAFETY: ownership by the calling thread was checked above.
        unsafe { self.exit() };
        Ok(())
    }

    /// Returns `true` if the outermost holder tagged the bus with `tag`.
    pub(crate) fn held_by_group(&self, tag: u64) -> bool {
        tag != 0
            && self.mutex.is_locked()
            && self.owner_tag.load(Ordering::Acquire) == tag
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    fn enter(&self, tag: u64) {
        if self.depth.fetch_add(1, Ordering::Relaxed) == 0 {
            self.owner_tag.store(tag, Ordering::Release);
        }
    }

    /// # Safety
    /// The calling thread must own `mutex`.
    pub(crate) unsafe fn exit(&self) {
        if self.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.owner_tag.store(0, Ordering::Release);
        }
        // SAFETY: guaranteed by the caller.
        unsafe { self.mutex.unlock() };
    }
}

impl core::fmt::Debug for BusSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusSlot")
            .field("index", &self.index)
            .field("locked", &self.is_locked())
            .field("depth", &self.depth.load(Ordering::Relaxed))
            .finish()
    }
}
