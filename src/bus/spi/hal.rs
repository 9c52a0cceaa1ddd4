/// Hardware seam for one SPI controller.
pub trait SpiPeripheral<I> {
    type Error: core::fmt::Debug;

    /// Which physical bus this controller is.
    fn instance(&self) -> I;

    /// Enables the transfer-complete interrupt.
    fn enable_completion_interrupt(&mut self) -> Result<(), Self::Error>;

    /// Starts a full-duplex transfer of `tx.len()` bytes and returns immediately.
    ///
    /// Completion is signalled by the interrupt calling
    /// [`SpiBus::on_transfer_complete`](super::SpiBus::on_transfer_complete). The
    /// driver keeps both buffers borrowed and untouched until the dispatcher has
    /// finished the transfer, so a DMA channel may keep reading `tx` and writing `rx`
    /// after this returns. Writing `rx` must be done before signalling; the device's
    /// handler receives it next.
    fn start_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}
