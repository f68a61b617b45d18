//! Panel protocol core for ED097OC4 class parallel E-Paper panels.
//!
//! Power sequencing, the configuration shift register and the CKV row scan
//! pulse train. Row pixel data is clocked out by a [`DataBus`] engine
//! provided by the firmware.
//!
//! A frame looks like:
//!
//! ```ignore
//! panel.init(960)?;
//! panel.power_on();
//! panel.start_frame();
//! for row in rows {
//!     panel.current_buffer().copy_from_slice(row);
//!     panel.output_row(15);
//! }
//! panel.end_frame();
//! panel.power_off();
//! ```
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod interface;
pub mod pulse;
pub mod register;
pub mod timing;
pub mod wait;

use embedded_hal::blocking::delay::DelayUs;

pub use interface::{ConfigInterface, DataBus, Error, ShiftRegister};
pub use pulse::{CompletionFlag, PulseChannel, PulseGenerator, PulseSymbol};
pub use register::ConfigRegister;
pub use timing::{CycleCounter, CycleDelay, PanelKind, ScanTiming};
pub use wait::{IdleWait, Spin};

use timing::*;

/// Where the panel is in its power/frame cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelState {
    Uninitialized,
    PowerOff,
    /// Transient, only held while [`Panel::power_on`] runs
    PoweringOn,
    PoweredOn,
    /// Rows may be output or skipped
    FrameActive,
    /// Transient, only held while [`Panel::power_off`] runs
    PoweringOff,
}

/// Protocol controller for one panel.
///
/// Owns the only copy of the configuration register. Every method takes
/// `&mut self`; sequences run to completion and must not be interrupted
/// halfway, or the panel is left out of sync with the shadow register.
pub struct Panel<'a, I, B, C, D, W = Spin> {
    interface: I,
    bus: B,
    ckv: PulseGenerator<'a, C, W>,
    delay: D,
    wait: W,
    config: ConfigRegister,
    skip: ScanTiming,
    state: PanelState,
}

impl<'a, I, B, C, D, W> Panel<'a, I, B, C, D, W>
where
    I: ConfigInterface,
    B: DataBus,
    C: PulseChannel,
    D: DelayUs<u32>,
    W: IdleWait + Default,
{
    pub fn new(
        interface: I,
        bus: B,
        ckv: PulseGenerator<'a, C, W>,
        delay: D,
        kind: PanelKind,
    ) -> Self {
        Self::with_wait(interface, bus, ckv, delay, kind, W::default())
    }
}

impl<'a, I, B, C, D, W> Panel<'a, I, B, C, D, W>
where
    I: ConfigInterface,
    B: DataBus,
    C: PulseChannel,
    D: DelayUs<u32>,
    W: IdleWait,
{
    /// Like [`new`](Self::new), with `wait` used for the bus and pulse idle
    /// waits at the start of a frame and of every row.
    pub fn with_wait(
        interface: I,
        bus: B,
        ckv: PulseGenerator<'a, C, W>,
        delay: D,
        kind: PanelKind,
        wait: W,
    ) -> Self {
        Self {
            interface,
            bus,
            ckv,
            delay,
            wait,
            config: ConfigRegister::cleared(),
            skip: kind.skip_timing(),
            state: PanelState::Uninitialized,
        }
    }

    /// Load the safe register baseline, then bring up the data bus for rows
    /// of `row_width` bytes and the CKV pulse channel.
    ///
    /// The bus always gets [`ROW_PADDING`] extra bytes per row. If only the
    /// pulse channel fails, the error is returned but the panel stays usable
    /// with CKV pulses dropped.
    pub fn init(&mut self, row_width: u32) -> Result<(), Error<B::Error, C::Error>> {
        self.config = ConfigRegister::baseline();
        self.push();

        self.bus
            .init(row_width.saturating_add(ROW_PADDING))
            .map_err(Error::Bus)?;
        self.state = PanelState::PowerOff;

        self.ckv.init().map_err(Error::Pulse)?;
        debug!("panel: init, row width {=u32}", row_width);
        Ok(())
    }

    /// Bring up the supply, then the negative and positive rails.
    ///
    /// Negative before positive, the other way round can damage the panel.
    pub fn power_on(&mut self) {
        debug_assert!(self.state != PanelState::Uninitialized, "power_on before init");
        self.state = PanelState::PoweringOn;

        self.config.scan_direction = true;
        self.config.power_disable = false;
        self.push();
        self.delay.delay_us(SUPPLY_ENABLE_DELAY_US);

        self.config.neg_power_enable = true;
        self.push();
        self.delay.delay_us(NEG_RAIL_DELAY_US);

        self.config.pos_power_enable = true;
        self.push();
        self.delay.delay_us(POS_RAIL_DELAY_US);

        self.config.stv = true;
        self.push();
        self.bus.set_start_pulse_high();

        self.state = PanelState::PoweredOn;
        debug!("panel: power on, cfg {=u8:#x}", self.config.to_bits());
    }

    /// Drop the rails in reverse order and cut the supply.
    ///
    /// Scan direction is left as is.
    pub fn power_off(&mut self) {
        debug_assert!(self.state != PanelState::Uninitialized, "power_off before init");
        self.state = PanelState::PoweringOff;

        self.config.pos_power_enable = false;
        self.push();
        self.delay.delay_us(POS_RAIL_OFF_DELAY_US);

        self.config.neg_power_enable = false;
        self.push();
        self.delay.delay_us(NEG_RAIL_OFF_DELAY_US);

        self.config.power_disable = true;
        self.push();

        self.config.stv = false;
        self.push();

        self.state = PanelState::PowerOff;
        debug!("panel: power off, cfg {=u8:#x}", self.config.to_bits());
    }

    /// Clear every register bit at once, no staging.
    pub fn power_off_all(&mut self) {
        self.config = ConfigRegister::cleared();
        self.push();
        self.state = PanelState::PowerOff;
        warn!("panel: hard power off");
    }

    /// Start a frame: gate mode on, STV pulse, then source outputs on.
    ///
    /// Waits for the bus and the previous CKV pulse. The stretch from
    /// clearing STV to the following pulse is hard real time; call with
    /// nothing that can preempt for more than a few microseconds.
    pub fn start_frame(&mut self) {
        debug_assert!(
            self.state == PanelState::PoweredOn,
            "start_frame needs a powered panel outside a frame"
        );
        self.wait_for_idle();

        self.config.mode = true;
        self.push();
        self.ckv.emit_us(1, 1, true);

        self.config.stv = false;
        self.push();
        self.delay.delay_us(STV_SETUP_DELAY_US);
        self.ckv.emit_us(10, 10, false);
        self.config.stv = true;
        self.push();
        self.ckv.emit_us(0, 10, true);

        self.config.output_enable = true;
        self.push();
        self.ckv.emit_us(1, 1, true);

        self.state = PanelState::FrameActive;
        trace!("panel: frame start, cfg {=u8:#x}", self.config.to_bits());
    }

    /// Advance the gate driver by one row without driving it.
    pub fn skip_row(&mut self) {
        debug_assert!(self.state == PanelState::FrameActive, "skip_row outside a frame");
        self.ckv
            .emit_ticks(self.skip.high_ticks, self.skip.low_ticks, false);
    }

    /// Latch the row that was clocked in last and start clocking in the next.
    ///
    /// `output_time` is how long the row is driven, in 0.1us ticks, clamped to
    /// [`MAX_TICKS`](timing::MAX_TICKS). Waits for
    /// the bus and the previous CKV pulse, so the caller may stage the next
    /// row in [`current_buffer`](Self::current_buffer) right after.
    pub fn output_row(&mut self, output_time: u16) {
        debug_assert!(self.state == PanelState::FrameActive, "output_row outside a frame");
        self.wait_for_idle();

        self.latch_row();
        self.ckv
            .emit_ticks(output_time, OUTPUT_ROW_LOW_TICKS, false);

        self.bus.start_line_output();
        self.bus.switch_buffer();
    }

    /// Source outputs off, gate mode off, then clock out the last row.
    pub fn end_frame(&mut self) {
        debug_assert!(self.state == PanelState::FrameActive, "end_frame outside a frame");

        self.config.output_enable = false;
        self.push();
        self.config.mode = false;
        self.push();
        self.ckv.emit_us(1, 1, true);
        self.ckv.emit_us(1, 1, true);

        self.state = PanelState::PoweredOn;
        trace!("panel: frame end");
    }

    pub fn switch_buffer(&mut self) {
        self.bus.switch_buffer();
    }

    /// Row buffer to stage the next row in.
    pub fn current_buffer(&mut self) -> &mut [u8] {
        self.bus.current_buffer()
    }

    /// Bus transfer or CKV pulse still running.
    pub fn is_busy(&self) -> bool {
        self.bus.is_busy() || self.ckv.is_busy()
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Last pushed configuration word.
    pub fn config(&self) -> &ConfigRegister {
        &self.config
    }

    pub fn skip_timing(&self) -> ScanTiming {
        self.skip
    }

    /// Consume the panel and return the hardware it drove
    pub fn release(self) -> (I, B, C, D) {
        (self.interface, self.bus, self.ckv.release(), self.delay)
    }

    // no logging here, it runs inside the STV stretch of start_frame
    fn push(&mut self) {
        self.interface.push(&self.config);
    }

    fn latch_row(&mut self) {
        self.config.latch_enable = true;
        self.push();
        self.config.latch_enable = false;
        self.push();
    }

    fn wait_for_idle(&mut self) {
        let bus = &self.bus;
        let ckv = &self.ckv;
        self.wait.wait_until(|| !bus.is_busy() && !ckv.is_busy());
    }
}
