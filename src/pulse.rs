//! CKV pulse generator.
//!
//! One high/low pulse at a time on the gate clock pin, timed by a hardware
//! pulse channel (RMT on ESP32) at 0.1us resolution.
//!
//! Completion is reported through a [`CompletionFlag`] that the firmware's
//! transmit-done interrupt sets:
//!
//! ```ignore
//! static CKV_DONE: CompletionFlag = CompletionFlag::new();
//!
//! #[interrupt]
//! fn RMT() {
//!     clear_tx_end_interrupt();
//!     CKV_DONE.signal();
//! }
//!
//! let mut ckv = PulseGenerator::new(rmt_channel, &CKV_DONE);
//! ckv.init()?;
//! ckv.emit_us(1, 1, true);
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::timing::{MAX_TICKS, TICKS_PER_US, TICK_HZ};
use crate::wait::{IdleWait, Spin};

/// Single slot completion flag shared between the generator and the
/// transmit-done interrupt.
///
/// Set (idle) on construction. The generator clears it right before starting
/// a pulse, the interrupt sets it once the pulse has been clocked out.
/// There is exactly one producer and one consumer.
#[derive(Debug)]
pub struct CompletionFlag {
    done: AtomicBool,
}

impl CompletionFlag {
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(true),
        }
    }

    /// Mark the in-flight pulse as finished. Interrupt safe.
    #[inline(always)]
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_signaled(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    // must happen before the transmit is started, or a fast completion is lost
    #[inline(always)]
    fn clear(&self) {
        self.done.store(false, Ordering::SeqCst);
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// One two-phase pulse as the channel should emit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseSymbol {
    pub level0: bool,
    pub duration0: u16,
    pub level1: bool,
    pub duration1: u16,
}

impl PulseSymbol {
    /// High for `high_ticks`, then low for `low_ticks`.
    ///
    /// A zero `high_ticks` gives a single phase pulse: high for `low_ticks`,
    /// with no second phase. `(n, 0)` therefore encodes the same waveform as
    /// `(0, n)`.
    pub const fn from_ticks(high_ticks: u16, low_ticks: u16) -> Self {
        if high_ticks == 0 {
            Self {
                level0: true,
                duration0: low_ticks,
                level1: false,
                duration1: 0,
            }
        } else {
            Self {
                level0: true,
                duration0: high_ticks,
                level1: false,
                duration1: low_ticks,
            }
        }
    }

    /// Packed RMT item: `duration0[14:0] level0[15] duration1[30:16] level1[31]`.
    ///
    /// A zero duration marks the end of transmission.
    pub const fn to_word(&self) -> u32 {
        (self.duration0 & MAX_TICKS) as u32
            | (self.level0 as u32) << 15
            | ((self.duration1 & MAX_TICKS) as u32) << 16
            | (self.level1 as u32) << 31
    }
}

/// Hardware pulse channel.
///
/// The implementation must arrange for [`CompletionFlag::signal`] to be called
/// once every transmitted symbol has finished.
pub trait PulseChannel {
    type Error;

    /// Allocate the channel and set its tick resolution.
    fn configure(&mut self, resolution_hz: u32) -> Result<(), Self::Error>;

    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Start emitting a single symbol. Must not block until completion.
    fn transmit(&mut self, symbol: PulseSymbol) -> Result<(), Self::Error>;
}

/// Pulse generator bound to the CKV pin.
///
/// Disabled until [`init`](Self::init) succeeds; while disabled every pulse
/// is dropped silently.
pub struct PulseGenerator<'a, C, W = Spin> {
    channel: C,
    done: &'a CompletionFlag,
    wait: W,
    enabled: bool,
}

impl<'a, C: PulseChannel> PulseGenerator<'a, C, Spin> {
    pub fn new(channel: C, done: &'a CompletionFlag) -> Self {
        Self::with_wait(channel, done, Spin)
    }
}

impl<'a, C: PulseChannel, W: IdleWait> PulseGenerator<'a, C, W> {
    pub fn with_wait(channel: C, done: &'a CompletionFlag, wait: W) -> Self {
        Self {
            channel,
            done,
            wait,
            enabled: false,
        }
    }

    /// Set up the channel at 0.1us per tick and enable it.
    ///
    /// On failure the generator stays disabled and the error is handed back
    /// once; later pulses are no-ops.
    pub fn init(&mut self) -> Result<(), C::Error> {
        self.enabled = false;
        match self.setup() {
            Ok(()) => {
                self.done.signal();
                self.enabled = true;
                debug!("ckv: pulse channel ready");
                Ok(())
            }
            Err(e) => {
                warn!("ckv: pulse channel unavailable, pulses disabled");
                Err(e)
            }
        }
    }

    fn setup(&mut self) -> Result<(), C::Error> {
        self.channel.configure(TICK_HZ)?;
        self.channel.enable()?;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A previously issued pulse has not finished yet.
    pub fn is_busy(&self) -> bool {
        self.enabled && !self.done.is_signaled()
    }

    pub fn wait_idle(&mut self) {
        let done = self.done;
        self.wait.wait_until(|| done.is_signaled());
    }

    /// Emit one pulse, durations in 0.1us ticks.
    ///
    /// Waits for the previous pulse first. With `wait` set, also waits for
    /// this one, otherwise it is left in flight.
    ///
    /// The channel's duration field is 15 bits wide; durations above
    /// [`MAX_TICKS`] are clamped to it.
    pub fn emit_ticks(&mut self, high_ticks: u16, low_ticks: u16, wait: bool) {
        if !self.enabled {
            return;
        }

        self.wait_idle();

        let symbol =
            PulseSymbol::from_ticks(high_ticks.min(MAX_TICKS), low_ticks.min(MAX_TICKS));
        self.done.clear();
        if self.channel.transmit(symbol).is_err() {
            // nothing is in flight, don't leave the next caller spinning
            self.done.signal();
            warn!("ckv: transmit failed");
            return;
        }

        if wait {
            self.wait_idle();
        }
    }

    /// Same as [`emit_ticks`](Self::emit_ticks), durations in microseconds.
    ///
    /// Anything from 3277us up ends up as [`MAX_TICKS`], about 3.3ms.
    pub fn emit_us(&mut self, high_us: u16, low_us: u16, wait: bool) {
        self.emit_ticks(
            high_us.saturating_mul(TICKS_PER_US),
            low_us.saturating_mul(TICKS_PER_US),
            wait,
        )
    }

    pub fn release(self) -> C {
        self.channel
    }
}
