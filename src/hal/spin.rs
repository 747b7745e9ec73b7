use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use lock_api::RawMutex;

use super::irq::{local_irq_restore, local_irq_save};

/// Spin lock that keeps interrupts disabled on the holding core.
///
/// The console and the reclaim queues are reached from the tick interrupt,
/// so a holder must not be preempted on its own core.
pub struct SpinNoIrq {
    lock: AtomicBool,
    saved_irq: UnsafeCell<bool>,
}

unsafe impl Sync for SpinNoIrq {}
unsafe impl Send for SpinNoIrq {}

unsafe impl RawMutex for SpinNoIrq {
    type GuardMarker = lock_api::GuardSend;
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        lock: AtomicBool::new(false),
        saved_irq: UnsafeCell::new(false),
    };

    fn lock(&self) {
        let irq_enabled_before = local_irq_save();
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.lock.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        unsafe { *self.saved_irq.get() = irq_enabled_before };
    }

    fn try_lock(&self) -> bool {
        let irq_enabled_before = local_irq_save();
        if self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            unsafe { *self.saved_irq.get() = irq_enabled_before };
            true
        } else {
            local_irq_restore(irq_enabled_before);
            false
        }
    }

    unsafe fn unlock(&self) {
        let irq_enabled_before = unsafe { *self.saved_irq.get() };
        self.lock.store(false, Ordering::Release);
        local_irq_restore(irq_enabled_before);
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}

pub type Mutex<T> = lock_api::Mutex<SpinNoIrq, T>;
