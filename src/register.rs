//! Panel configuration register.
//!
//! The panel carries an 8 bit shift register that gates power rails and scan
//! control. The register is write only, so the driver keeps a shadow copy and
//! pushes the whole word after every change.
//!
//! Shift order (first bit out is bit 7):
//!
//! | bit | flag               |
//! |-----|--------------------|
//! | 7   | `output_enable`    |
//! | 6   | `mode`             |
//! | 5   | `scan_direction`   |
//! | 4   | `stv`              |
//! | 3   | `neg_power_enable` |
//! | 2   | `pos_power_enable` |
//! | 1   | `power_disable`    |
//! | 0   | `latch_enable`     |

/// Shadow of the panel configuration shift register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigRegister {
    /// Row latch (LE)
    pub latch_enable: bool,
    /// Keeps the panel power supply off while set
    pub power_disable: bool,
    /// Positive source/gate rail
    pub pos_power_enable: bool,
    /// Negative source/gate rail
    pub neg_power_enable: bool,
    /// Start of frame (STV)
    pub stv: bool,
    /// Gate scan direction
    pub scan_direction: bool,
    /// Gate output mode (GMODE)
    pub mode: bool,
    /// Source output enable (OE)
    pub output_enable: bool,
}

impl ConfigRegister {
    pub const OUTPUT_ENABLE: u8 = 1 << 7;
    pub const MODE: u8 = 1 << 6;
    pub const SCAN_DIRECTION: u8 = 1 << 5;
    pub const STV: u8 = 1 << 4;
    pub const NEG_POWER_ENABLE: u8 = 1 << 3;
    pub const POS_POWER_ENABLE: u8 = 1 << 2;
    pub const POWER_DISABLE: u8 = 1 << 1;
    pub const LATCH_ENABLE: u8 = 1 << 0;

    /// Safe state loaded at session start: supply off, scan direction forward,
    /// STV idle high, outputs off.
    pub const fn baseline() -> Self {
        Self {
            latch_enable: false,
            power_disable: true,
            pos_power_enable: false,
            neg_power_enable: false,
            stv: true,
            scan_direction: true,
            mode: false,
            output_enable: false,
        }
    }

    /// Everything off, used for a hard shutdown.
    pub const fn cleared() -> Self {
        Self::from_bits(0)
    }

    /// Word as it is shifted out, MSB first.
    pub const fn to_bits(&self) -> u8 {
        let mut bits = 0;
        if self.output_enable {
            bits |= Self::OUTPUT_ENABLE;
        }
        if self.mode {
            bits |= Self::MODE;
        }
        if self.scan_direction {
            bits |= Self::SCAN_DIRECTION;
        }
        if self.stv {
            bits |= Self::STV;
        }
        if self.neg_power_enable {
            bits |= Self::NEG_POWER_ENABLE;
        }
        if self.pos_power_enable {
            bits |= Self::POS_POWER_ENABLE;
        }
        if self.power_disable {
            bits |= Self::POWER_DISABLE;
        }
        if self.latch_enable {
            bits |= Self::LATCH_ENABLE;
        }
        bits
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            latch_enable: bits & Self::LATCH_ENABLE != 0,
            power_disable: bits & Self::POWER_DISABLE != 0,
            pos_power_enable: bits & Self::POS_POWER_ENABLE != 0,
            neg_power_enable: bits & Self::NEG_POWER_ENABLE != 0,
            stv: bits & Self::STV != 0,
            scan_direction: bits & Self::SCAN_DIRECTION != 0,
            mode: bits & Self::MODE != 0,
            output_enable: bits & Self::OUTPUT_ENABLE != 0,
        }
    }

    /// Bits in shift order.
    pub fn shift_order(&self) -> impl Iterator<Item = bool> {
        let bits = self.to_bits();
        (0..8).rev().map(move |i| bits & (1 << i) != 0)
    }

    /// True when either rail is enabled.
    pub fn rails_on(&self) -> bool {
        self.pos_power_enable || self.neg_power_enable
    }
}

impl From<ConfigRegister> for u8 {
    fn from(reg: ConfigRegister) -> u8 {
        reg.to_bits()
    }
}

impl From<u8> for ConfigRegister {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}
