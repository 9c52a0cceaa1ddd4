use crate::bus::{config::AcceptanceFilter, types::Mailbox};

use super::frame::CanFrame;

/// Hardware seam for one CAN controller.
///
/// Implemented by the board support layer on top of the vendor HAL. Every method
/// is non-blocking; `receive` is called from the receive interrupt.
pub trait CanPeripheral<I> {
    type Error: core::fmt::Debug;

    /// Which physical bus this controller is.
    fn instance(&self) -> I;

    fn configure_filter(&mut self, filter: &AcceptanceFilter) -> Result<(), Self::Error>;

    fn start(&mut self) -> Result<(), Self::Error>;

    /// Enables the "message pending in FIFO 0" interrupt.
    fn enable_rx_interrupt(&mut self) -> Result<(), Self::Error>;

    /// Queues `frame` into a free transmit mailbox.
    ///
    /// Fails when every mailbox is occupied.
    fn transmit(&mut self, frame: &CanFrame) -> Result<Mailbox, Self::Error>;

    /// Reads the oldest frame out of receive FIFO 0.
    fn receive(&mut self) -> Result<CanFrame, Self::Error>;
}
