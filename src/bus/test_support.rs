//! Test support utilities - only compiled in test builds.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use embedded_can::StandardId;
use heapless::{Deque, Vec};

use crate::bus::{
    AcceptanceFilter, Mailbox,
    can::{CanFrame, CanPeripheral},
    spi::{ChipSelect, SpiPeripheral},
};

/// Bus identities used across the unit tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestBus {
    Bus1,
    Bus2,
    Bus3,
}

pub fn sid(raw: u16) -> StandardId {
    StandardId::new(raw).unwrap()
}

/// Records callback invocations in order.
pub struct CallLog {
    calls: Mutex<RefCell<Vec<u8, 32>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    pub fn push(&self, tag: u8) {
        critical_section::with(|cs| self.calls.borrow_ref_mut(cs).push(tag).unwrap());
    }

    pub fn snapshot(&self) -> Vec<u8, 32> {
        critical_section::with(|cs| self.calls.borrow_ref(cs).clone())
    }
}

#[derive(Debug)]
pub struct MockError;

#[derive(Default)]
struct CanRigState {
    filter: Option<AcceptanceFilter>,
    started: bool,
    rx_interrupt: bool,
    fail_filter: bool,
    fail_start: bool,
    fail_rx_interrupt: bool,
    fail_transmit: bool,
    transmit_calls: u32,
    last_sent: Option<CanFrame>,
    fifo: Deque<CanFrame, 8>,
}

/// Observable state behind a [`MockCan`]; stays with the test after the mock is
/// moved into the driver.
pub struct CanRig {
    state: Mutex<RefCell<CanRigState>>,
}

impl CanRig {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(CanRigState::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut CanRigState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Places a frame in the receive FIFO.
    pub fn inject(&self, id: StandardId, data: &[u8]) {
        let frame = CanFrame::new_standard(id, data).unwrap();
        self.with(|s| s.fifo.push_back(frame).unwrap());
    }

    pub fn fail_filter(&self, fail: bool) {
        self.with(|s| s.fail_filter = fail);
    }

    pub fn fail_start(&self, fail: bool) {
        self.with(|s| s.fail_start = fail);
    }

    pub fn fail_rx_interrupt(&self, fail: bool) {
        self.with(|s| s.fail_rx_interrupt = fail);
    }

    pub fn fail_transmit(&self, fail: bool) {
        self.with(|s| s.fail_transmit = fail);
    }

    pub fn filter(&self) -> Option<AcceptanceFilter> {
        self.with(|s| s.filter)
    }

    pub fn started(&self) -> bool {
        self.with(|s| s.started)
    }

    pub fn rx_interrupt_enabled(&self) -> bool {
        self.with(|s| s.rx_interrupt)
    }

    pub fn transmit_calls(&self) -> u32 {
        self.with(|s| s.transmit_calls)
    }

    pub fn last_sent(&self) -> Option<CanFrame> {
        self.with(|s| s.last_sent)
    }
}

/// CAN controller double with three transmit mailboxes.
pub struct MockCan<'a> {
    instance: TestBus,
    rig: &'a CanRig,
}

impl<'a> MockCan<'a> {
    pub fn new(instance: TestBus, rig: &'a CanRig) -> Self {
        Self { instance, rig }
    }
}

impl CanPeripheral<TestBus> for MockCan<'_> {
    type Error = MockError;

    fn instance(&self) -> TestBus {
        self.instance
    }

    fn configure_filter(&mut self, filter: &AcceptanceFilter) -> Result<(), MockError> {
        self.rig.with(|s| {
            if s.fail_filter {
                return Err(MockError);
            }
            s.filter = Some(*filter);
            Ok(())
        })
    }

    fn start(&mut self) -> Result<(), MockError> {
        self.rig.with(|s| {
            if s.fail_start {
                return Err(MockError);
            }
            s.started = true;
            Ok(())
        })
    }

    fn enable_rx_interrupt(&mut self) -> Result<(), MockError> {
        self.rig.with(|s| {
            if s.fail_rx_interrupt {
                return Err(MockError);
            }
            s.rx_interrupt = true;
            Ok(())
        })
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<Mailbox, MockError> {
        self.rig.with(|s| {
            let mailbox = Mailbox(s.transmit_calls % 3);
            s.transmit_calls += 1;
            if s.fail_transmit {
                return Err(MockError);
            }
            s.last_sent = Some(*frame);
            Ok(mailbox)
        })
    }

    fn receive(&mut self) -> Result<CanFrame, MockError> {
        self.rig.with(|s| s.fifo.pop_front().ok_or(MockError))
    }
}

#[derive(Default)]
struct SpiRigState {
    fail_interrupt: bool,
    fail_start: bool,
    start_calls: u32,
    last_tx: Vec<u8, 16>,
    response: Vec<u8, 16>,
}

/// Observable state behind a [`MockSpi`].
pub struct SpiRig {
    state: Mutex<RefCell<SpiRigState>>,
}

impl SpiRig {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SpiRigState::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SpiRigState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Bytes the device clocks back on the next transfers.
    pub fn respond(&self, bytes: &[u8]) {
        self.with(|s| s.response = Vec::from_slice(bytes).unwrap());
    }

    pub fn fail_interrupt(&self, fail: bool) {
        self.with(|s| s.fail_interrupt = fail);
    }

    pub fn fail_start(&self, fail: bool) {
        self.with(|s| s.fail_start = fail);
    }

    pub fn start_calls(&self) -> u32 {
        self.with(|s| s.start_calls)
    }

    pub fn last_tx(&self) -> Vec<u8, 16> {
        self.with(|s| s.last_tx.clone())
    }
}

/// SPI controller double that fills `rx` as soon as the transfer starts.
pub struct MockSpi<'a> {
    instance: TestBus,
    rig: &'a SpiRig,
}

impl<'a> MockSpi<'a> {
    pub fn new(instance: TestBus, rig: &'a SpiRig) -> Self {
        Self { instance, rig }
    }
}

impl SpiPeripheral<TestBus> for MockSpi<'_> {
    type Error = MockError;

    fn instance(&self) -> TestBus {
        self.instance
    }

    fn enable_completion_interrupt(&mut self) -> Result<(), MockError> {
        if self.rig.with(|s| s.fail_interrupt) {
            return Err(MockError);
        }
        Ok(())
    }

    fn start_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), MockError> {
        self.rig.with(|s| {
            s.start_calls += 1;
            if s.fail_start {
                return Err(MockError);
            }
            s.last_tx = Vec::from_slice(tx).unwrap();
            let n = rx.len().min(s.response.len());
            rx[..n].copy_from_slice(&s.response[..n]);
            Ok(())
        })
    }
}

/// Chip select that remembers its level and how often it was asserted.
pub struct TestSelect {
    selected: Mutex<Cell<bool>>,
    selects: Mutex<Cell<u32>>,
}

impl TestSelect {
    pub fn new() -> Self {
        Self {
            selected: Mutex::new(Cell::new(false)),
            selects: Mutex::new(Cell::new(0)),
        }
    }

    pub fn is_selected(&self) -> bool {
        critical_section::with(|cs| self.selected.borrow(cs).get())
    }

    pub fn select_count(&self) -> u32 {
        critical_section::with(|cs| self.selects.borrow(cs).get())
    }
}

impl ChipSelect for TestSelect {
    fn select(&self) {
        critical_section::with(|cs| {
            self.selected.borrow(cs).set(true);
            let selects = self.selects.borrow(cs);
            selects.set(selects.get() + 1);
        });
    }

    fn deselect(&self) {
        critical_section::with(|cs| self.selected.borrow(cs).set(false));
    }
}
