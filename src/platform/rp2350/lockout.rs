//! Multicore flash lockout
//!
//! XIP is unavailable while the ROM erases or programs, so the other core
//! must not fetch from flash during that window. The handshake:
//!
//! ```text
//! core 0 (committer)             core 1 (victim)
//! acquire():  IDLE -> REQUESTED
//!                                park_if_requested(): REQUESTED -> PARKED,
//!                                  spin in RAM with interrupts off
//! sees PARKED, erase + program
//! release():  PARKED -> IDLE     leaves the spin loop
//! ```
//!
//! If no victim has registered, `acquire` succeeds immediately. The victim
//! calls `park_if_requested` from its idle loop or SIO FIFO interrupt.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use embassy_time::{Duration, Instant};

const IDLE: u8 = 0;
const REQUESTED: u8 = 1;
const PARKED: u8 = 2;

static LOCKOUT: AtomicU8 = AtomicU8::new(IDLE);
static VICTIM_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Declare that another core runs from flash and honours the lockout
///
/// Call once from the other core before it starts executing from flash.
pub fn register_victim() {
    VICTIM_REGISTERED.store(true, Ordering::Release);
}

/// Park this core in RAM while a lockout is requested
///
/// Returns immediately when no lockout is pending.
#[inline(never)]
#[link_section = ".data.ram_func"]
pub fn park_if_requested() {
    if LOCKOUT.load(Ordering::Acquire) != REQUESTED {
        return;
    }

    cortex_m::interrupt::free(|_cs| {
        LOCKOUT.store(PARKED, Ordering::Release);
        while LOCKOUT.load(Ordering::Acquire) == PARKED {
            core::hint::spin_loop();
        }
    });
}

/// Request the other core to park, waiting at most `timeout_ms`
///
/// Returns `false` if the other core did not acknowledge in time; the
/// request is withdrawn in that case.
pub(super) fn acquire(timeout_ms: u32) -> bool {
    if !VICTIM_REGISTERED.load(Ordering::Acquire) {
        return true;
    }

    if LOCKOUT
        .compare_exchange(IDLE, REQUESTED, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }

    let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
    while LOCKOUT.load(Ordering::Acquire) != PARKED {
        if Instant::now() >= deadline {
            // The victim may have parked between the check and the withdrawal
            return LOCKOUT
                .compare_exchange(REQUESTED, IDLE, Ordering::AcqRel, Ordering::Acquire)
                .is_err();
        }
        core::hint::spin_loop();
    }
    true
}

/// Let the other core resume
pub(super) fn release() {
    LOCKOUT.store(IDLE, Ordering::Release);
}
