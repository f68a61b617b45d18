//! Timing table
//!
//! Pulse widths are in CKV ticks of 0.1us, delays in microseconds.

use embedded_hal::blocking::delay::DelayUs;

/// Pulse channel resolution, 0.1us per tick.
pub const TICK_HZ: u32 = 10_000_000;
pub const TICKS_PER_US: u16 = 10;
/// Largest duration a single pulse phase can hold (15 bit field).
pub const MAX_TICKS: u16 = 0x7fff;

/// Dummy bytes appended to every row so the bus has headroom to align
/// its clock and start pulse.
pub const ROW_PADDING: u32 = 32;

// power on
pub const SUPPLY_ENABLE_DELAY_US: u32 = 100;
pub const NEG_RAIL_DELAY_US: u32 = 500;
pub const POS_RAIL_DELAY_US: u32 = 100;

// power off
pub const POS_RAIL_OFF_DELAY_US: u32 = 10;
pub const NEG_RAIL_OFF_DELAY_US: u32 = 100;

/// STV low setup time before the first gate clock of a frame.
pub const STV_SETUP_DELAY_US: u32 = 1;

/// Low phase of the CKV pulse that follows a row latch.
pub const OUTPUT_ROW_LOW_TICKS: u16 = 50;

/// High/low width of one CKV pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTiming {
    pub high_ticks: u16,
    pub low_ticks: u16,
}

impl ScanTiming {
    pub const fn new(high_ticks: u16, low_ticks: u16) -> Self {
        Self {
            high_ticks,
            low_ticks,
        }
    }
}

/// Supported panels. They differ only in how fast a row may be skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelKind {
    /// 9.7", CKV limited to 200kHz
    #[default]
    Ed097oc4,
    /// 9.7", fast gate driver
    Ed097tc2,
}

impl PanelKind {
    /// CKV pulse used to skip a row without driving it.
    pub const fn skip_timing(self) -> ScanTiming {
        match self {
            PanelKind::Ed097oc4 => ScanTiming::new(45, 5),
            PanelKind::Ed097tc2 => ScanTiming::new(2, 2),
        }
    }
}

/// Free running CPU cycle counter, e.g. `CCOUNT` on Xtensa.
pub trait CycleCounter {
    fn cycles(&self) -> u32;
}

/// Busy wait delay derived from a cycle counter and the actual CPU clock.
///
/// Counter wrap-around is handled, a single delay may not exceed
/// `u32::MAX` cycles (about 17s at 240MHz).
pub struct CycleDelay<C> {
    counter: C,
    cpu_hz: u32,
}

impl<C: CycleCounter> CycleDelay<C> {
    pub fn new(counter: C, cpu_hz: u32) -> Self {
        Self { counter, cpu_hz }
    }

    pub fn cycles_for_us(&self, us: u32) -> u32 {
        let cycles = us as u64 * self.cpu_hz as u64 / 1_000_000;
        cycles.min(u32::MAX as u64) as u32
    }

    pub fn busy_wait_cycles(&mut self, cycles: u32) {
        let start = self.counter.cycles();
        while self.counter.cycles().wrapping_sub(start) < cycles {
            core::hint::spin_loop();
        }
    }

    pub fn release(self) -> C {
        self.counter
    }
}

impl<C: CycleCounter> DelayUs<u32> for CycleDelay<C> {
    fn delay_us(&mut self, us: u32) {
        let cycles = self.cycles_for_us(us);
        self.busy_wait_cycles(cycles);
    }
}
