use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

/// Chip-select line of one SPI device.
///
/// `deselect` runs in the transfer-complete interrupt, so neither method may block.
pub trait ChipSelect: Sync {
    /// Asserts the line (drives it to its active level).
    fn select(&self);

    /// Releases the line.
    fn deselect(&self);
}

/// Active-low chip select on an `embedded-hal` output pin.
///
/// Pin errors are logged and otherwise ignored; a stuck line shows up as a device
/// that never answers.
pub struct OutputPinSelect<P> {
    pin: Mutex<RefCell<P>>,
}

impl<P: OutputPin + Send> OutputPinSelect<P> {
    pub const fn new(pin: P) -> Self {
        Self {
            pin: Mutex::new(RefCell::new(pin)),
        }
    }
}

impl<P: OutputPin + Send> ChipSelect for OutputPinSelect<P> {
    fn select(&self) {
        critical_section::with(|cs| {
            if self.pin.borrow_ref_mut(cs).set_low().is_err() {
                warn!("spi: chip select could not be asserted");
            }
        });
    }

    fn deselect(&self) {
        critical_section::with(|cs| {
            if self.pin.borrow_ref_mut(cs).set_high().is_err() {
                warn!("spi: chip select could not be released");
            }
        });
    }
}

/// Receives the filled receive buffer once a transfer has completed.
///
/// Runs in the dispatcher task. The buffer is the one passed to
/// [`SpiBus::transfer`](super::SpiBus::transfer).
pub trait TransferHandler<'a>: Sync {
    fn on_transfer_complete(&self, rx: &'a mut [u8]);
}

impl<'a, F> TransferHandler<'a> for F
where
    F: Fn(&'a mut [u8]) + Sync,
{
    fn on_transfer_complete(&self, rx: &'a mut [u8]) {
        self(rx)
    }
}

/// An SPI device: the bus it sits on, its chip select and its completion handler.
///
/// One descriptor per device; it must outlive every transfer started with it.
pub struct SpiDevice<'a, I> {
    bus: I,
    chip_select: &'a dyn ChipSelect,
    handler: &'a dyn TransferHandler<'a>,
}

impl<'a, I: Copy> SpiDevice<'a, I> {
    pub const fn new(
        bus: I,
        chip_select: &'a dyn ChipSelect,
        handler: &'a dyn TransferHandler<'a>,
    ) -> Self {
        Self {
            bus,
            chip_select,
            handler,
        }
    }

    pub fn bus(&self) -> I {
        self.bus
    }

    pub fn chip_select(&self) -> &'a dyn ChipSelect {
        self.chip_select
    }

    pub fn handler(&self) -> &'a dyn TransferHandler<'a> {
        self.handler
    }
}

impl<I: core::fmt::Debug> core::fmt::Debug for SpiDevice<'_, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiDevice")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicBool, Ordering};

    struct FlagPin<'a>(&'a AtomicBool);

    impl embedded_hal::digital::ErrorType for FlagPin<'_> {
        type Error = Infallible;
    }

    impl OutputPin for FlagPin<'_> {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn output_pin_select_is_active_low() {
        let level = AtomicBool::new(true);
        let cs = OutputPinSelect::new(FlagPin(&level));

        cs.select();
        assert!(!level.load(Ordering::SeqCst));

        cs.deselect();
        assert!(level.load(Ordering::SeqCst));
    }
}
