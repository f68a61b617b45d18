//! Recording mocks for the panel's hardware.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use ed097oc4::{
    CompletionFlag, ConfigInterface, ConfigRegister, DataBus, IdleWait, Panel, PanelKind,
    PulseChannel, PulseGenerator, PulseSymbol,
};
use embedded_hal::blocking::delay::DelayUs;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Push(u8),
    Delay(u32),
    Pulse(PulseSymbol),
    BusInit(u32),
    StartPulseHigh,
    StartLine,
    SwitchBuffer,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn pulse(high: u16, low: u16) -> Event {
    Event::Pulse(PulseSymbol::from_ticks(high, low))
}

pub struct RecordingInterface<'a> {
    log: Log,
    bus_busy: &'a AtomicBool,
}

impl ConfigInterface for RecordingInterface<'_> {
    fn push(&mut self, reg: &ConfigRegister) {
        assert!(
            !self.bus_busy.load(Ordering::SeqCst),
            "config pushed while the bus was busy"
        );
        self.log.borrow_mut().push(Event::Push(reg.to_bits()));
    }
}

pub struct RecordingDelay {
    log: Log,
}

impl DelayUs<u32> for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.log.borrow_mut().push(Event::Delay(us));
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct BusFault;

pub struct MockBus<'a> {
    log: Log,
    busy: &'a AtomicBool,
    buffers: [[u8; 4]; 2],
    current: usize,
    pub fail_init: bool,
}

impl DataBus for MockBus<'_> {
    type Error = BusFault;

    fn init(&mut self, row_width: u32) -> Result<(), BusFault> {
        self.log.borrow_mut().push(Event::BusInit(row_width));
        if self.fail_init {
            Err(BusFault)
        } else {
            Ok(())
        }
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn start_line_output(&mut self) {
        self.log.borrow_mut().push(Event::StartLine);
    }

    fn switch_buffer(&mut self) {
        self.current ^= 1;
        self.log.borrow_mut().push(Event::SwitchBuffer);
    }

    fn current_buffer(&mut self) -> &mut [u8] {
        &mut self.buffers[self.current]
    }

    fn set_start_pulse_high(&mut self) {
        self.log.borrow_mut().push(Event::StartPulseHigh);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ChannelFault;

/// Pulse channel that completes immediately while `auto_complete` is set,
/// otherwise leaves completion to the test.
pub struct MockChannel<'a> {
    log: Log,
    done: &'a CompletionFlag,
    auto_complete: &'a AtomicBool,
    pub fail_enable: bool,
}

impl PulseChannel for MockChannel<'_> {
    type Error = ChannelFault;

    fn configure(&mut self, resolution_hz: u32) -> Result<(), ChannelFault> {
        assert_eq!(resolution_hz, 10_000_000);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), ChannelFault> {
        if self.fail_enable {
            Err(ChannelFault)
        } else {
            Ok(())
        }
    }

    fn transmit(&mut self, symbol: PulseSymbol) -> Result<(), ChannelFault> {
        assert!(!self.done.is_signaled(), "pulse started with the flag still set");
        self.log.borrow_mut().push(Event::Pulse(symbol));
        if self.auto_complete.load(Ordering::SeqCst) {
            self.done.signal();
        }
        Ok(())
    }
}

/// Shared state the mocks borrow; must outlive the panel.
pub struct Rig {
    pub log: Log,
    pub bus_busy: AtomicBool,
    pub auto_complete: AtomicBool,
    pub done: CompletionFlag,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            bus_busy: AtomicBool::new(false),
            auto_complete: AtomicBool::new(true),
            done: CompletionFlag::new(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn bus(&self) -> MockBus<'_> {
        MockBus {
            log: self.log.clone(),
            busy: &self.bus_busy,
            buffers: [[0; 4]; 2],
            current: 0,
            fail_init: false,
        }
    }

    pub fn channel(&self) -> MockChannel<'_> {
        MockChannel {
            log: self.log.clone(),
            done: &self.done,
            auto_complete: &self.auto_complete,
            fail_enable: false,
        }
    }

    pub fn panel_with<'a>(
        &'a self,
        bus: MockBus<'a>,
        channel: MockChannel<'a>,
        kind: PanelKind,
    ) -> TestPanel<'a> {
        Panel::new(
            RecordingInterface {
                log: self.log.clone(),
                bus_busy: &self.bus_busy,
            },
            bus,
            PulseGenerator::new(channel, &self.done),
            RecordingDelay {
                log: self.log.clone(),
            },
            kind,
        )
    }

    /// Panel whose generator and protocol waits both go through `wait`.
    pub fn panel_waiting_on<'a, W>(
        &'a self,
        wait: W,
    ) -> Panel<'a, RecordingInterface<'a>, MockBus<'a>, MockChannel<'a>, RecordingDelay, W>
    where
        W: IdleWait + Clone,
    {
        Panel::with_wait(
            RecordingInterface {
                log: self.log.clone(),
                bus_busy: &self.bus_busy,
            },
            self.bus(),
            PulseGenerator::with_wait(self.channel(), &self.done, wait.clone()),
            RecordingDelay {
                log: self.log.clone(),
            },
            PanelKind::Ed097oc4,
            wait,
        )
    }

    pub fn panel(&self) -> TestPanel<'_> {
        self.panel_with(self.bus(), self.channel(), PanelKind::Ed097oc4)
    }
}

pub type TestPanel<'a> =
    Panel<'a, RecordingInterface<'a>, MockBus<'a>, MockChannel<'a>, RecordingDelay>;
