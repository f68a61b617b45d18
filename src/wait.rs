//! Waiting on hardware.
//!
//! Every "until idle" loop in the driver goes through [`IdleWait`], so a
//! firmware can swap the pure spin for something interrupt driven without
//! touching the protocol code.

/// Blocks the caller until `ready` returns true.
///
/// Implementations must not give up: the panel protocol relies on waiting
/// rather than truncating a row.
pub trait IdleWait {
    fn wait_until<F: FnMut() -> bool>(&mut self, ready: F);
}

/// Busy spin, no yielding.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Spin;

impl IdleWait for Spin {
    #[inline(always)]
    fn wait_until<F: FnMut() -> bool>(&mut self, mut ready: F) {
        while !ready() {
            core::hint::spin_loop();
        }
    }
}
