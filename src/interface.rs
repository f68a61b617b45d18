//! Hardware interfaces of the panel: the configuration shift register and the
//! parallel data bus.

use core::fmt;

use embedded_hal::digital::v2::OutputPin;

use crate::register::ConfigRegister;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<BusError, PulseError> {
    /// The data bus could not be set up
    Bus(BusError),
    /// The CKV pulse channel could not be allocated or enabled
    Pulse(PulseError),
}

impl<B, P> fmt::Display for Error<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(_) => write!(f, "data bus init failed"),
            Error::Pulse(_) => write!(f, "pulse channel init failed"),
        }
    }
}

/// Sink for configuration words.
pub trait ConfigInterface {
    /// Serialize the whole register to the panel. Runs to completion, the
    /// panel has no partial update.
    fn push(&mut self, reg: &ConfigRegister);
}

/// 3-wire shift register (CFG_DATA, CFG_CLK, CFG_STR).
///
/// Bits are clocked on the rising edge of CLK, the word is latched by the
/// rising edge of STR. Pins should be register-level GPIO, this sits on the
/// timing path.
pub struct ShiftRegister<DATA, CLK, STR> {
    data: DATA,
    clk: CLK,
    strobe: STR,
}

impl<DATA, CLK, STR> ShiftRegister<DATA, CLK, STR>
where
    DATA: OutputPin,
    CLK: OutputPin,
    STR: OutputPin,
{
    pub fn new(data: DATA, clk: CLK, mut strobe: STR) -> Self {
        let _ = strobe.set_low();
        ShiftRegister { data, clk, strobe }
    }

    /// Consume the interface and return the pins
    pub fn release(self) -> (DATA, CLK, STR) {
        (self.data, self.clk, self.strobe)
    }

    #[inline(always)]
    fn push_bit(&mut self, bit: bool) {
        let _ = self.clk.set_low();
        if bit {
            let _ = self.data.set_high();
        } else {
            let _ = self.data.set_low();
        }
        let _ = self.clk.set_high();
    }
}

impl<DATA, CLK, STR> ConfigInterface for ShiftRegister<DATA, CLK, STR>
where
    DATA: OutputPin,
    CLK: OutputPin,
    STR: OutputPin,
{
    // GPIO errors are dropped: the register is write only and there is no
    // sensible recovery halfway through a word.
    fn push(&mut self, reg: &ConfigRegister) {
        let _ = self.strobe.set_low();
        for bit in reg.shift_order() {
            self.push_bit(bit);
        }
        let _ = self.strobe.set_high();
    }
}

/// Parallel data bus engine (I2S/LCD peripheral + DMA) that clocks row data
/// into the source drivers.
///
/// The bus owns its data, clock and start pulse (STH) pins.
pub trait DataBus {
    type Error;

    /// Set up for rows of `row_width` bytes, padding included.
    fn init(&mut self, row_width: u32) -> Result<(), Self::Error>;

    /// A row transfer is in progress.
    fn is_busy(&self) -> bool;

    /// Start clocking out the current buffer.
    fn start_line_output(&mut self);

    /// Swap the front and back row buffers.
    fn switch_buffer(&mut self);

    /// Buffer the next row is staged in.
    fn current_buffer(&mut self) -> &mut [u8];

    /// Drive STH high, the idle level before the first row.
    fn set_start_pulse_high(&mut self);
}
