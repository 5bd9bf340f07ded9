#![no_std]
//! SX127x IEEE 802.15.4 Radio Driver
//!
//! This crate adapts the Semtech SX1272/6/7/8 LoRa transceivers to the operation set an
//! IEEE 802.15.4 MAC expects from its radio: frame transmission and reception, clear
//! channel assessment, link-layer address filtering and automatic acknowledgements.
//! LoRa has no notion of 802.15.4 addressing, so filtering and ACK generation are done in
//! software on top of the chip's packet engine.
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Bus layer for typed register access and FIFO transfers
//! - [`registers`]: Register definitions for the LoRa mode register map
//! - [`frame`]: Minimal 802.15.4 MAC header view used by the filter
//! - [`filter`]: Link-layer address filter
//! - [`ack`]: ACK deadline scheduling on a user supplied timer
//! - [`event`]: Interrupt to task handoff and upper layer indications
//! - [`op`]: Operation requests and confirmations
//! - [`modem`]: LoRa modulation parameters
//!
//! The main entry point is [`Sx127x`], which owns the bus, the protocol state and the ACK
//! timer.
//!
//! # Usage
//! 1. Create a [`Sx127x`] with the SPI device, an [`AckTimer`] and an [`EventHandler`]
//! 2. Power up with [`Sx127x::request_on`]
//! 3. Tune with [`Sx127x::config_phy`] and set the node addresses with
//!    [`Sx127x::config_addr_filter`]
//! 4. Forward DIO0 edges and timer expiries to an [`EventQueue`] and drain it from the
//!    radio task
//!
//! # Important Notes
//! - Register I/O is synchronous and must never run in interrupt context
//! - Only one operation is tracked at a time, confirm it before requesting the next one
//! - CCA always reports a clear channel unless the chip flagged channel activity
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use sx127x::{AckTimer, Error, EventHandler, FilterMode, Op, Sx127x};
//!
//! fn listen<SPI, T, H>(radio: &mut Sx127x<SPI, T, H>) -> Result<(), Error>
//! where
//!     SPI: SpiDevice,
//!     T: AckTimer,
//!     H: EventHandler,
//! {
//!     radio.request_on()?;
//!     radio.config_phy(0, 0)?;
//!     radio.set_frame_filter_mode(FilterMode::Accept)?;
//!     radio.request_op(Op::SetReceive)?;
//!     radio.confirm_op(Op::SetReceive)?;
//!     Ok(())
//! }
//! ```

#[cfg(test)]
extern crate std;

pub mod ack;
pub mod config;
pub mod device;
pub mod event;
pub mod filter;
pub mod frame;
mod log;
pub mod modem;
pub mod op;
mod radio;
pub mod registers;

#[cfg(test)]
mod mock;

pub use ack::{AckScheduler, AckTimer};
pub use config::{Config, PaSelect};
pub use device::Device;
pub use event::{Event, EventHandler, EventQueue, Indication};
pub use filter::LinkAddresses;
pub use modem::{Bandwidth, CodingRate, ModemSettings, SpreadingFactor};
pub use op::{
    AddressFilter, Capabilities, CcaMode, Confirmation, FilterMode, Op, PendingOp, TxStatus,
};
pub use radio::{RadioState, Sx127x};
pub use registers::*;

/// Errors reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SPI transfer failed
    Bus,
    /// A register held a value its type cannot represent
    Deserialization,
    /// Channel index above the configured band plan
    ChannelOutOfRange(u8),
    /// Transmit power outside the configured range, in dBm
    PowerOutOfRange(i8),
    /// The operation is not available on this radio
    Unsupported,
    /// Spreading factor, bandwidth or coding rate not supported
    InvalidModemParameter,
    /// The received frame does not fit the caller's buffer
    BufferTooSmall { len: usize, max: usize },
    /// Frame shorter than the smallest valid frame
    MalformedFrame { len: usize },
    /// Frame longer than the PHY maximum
    FrameTooLong { len: usize },
    /// Confirmation of an operation that is not pending
    NotRequested,
    /// Confirmation before the operation completed
    NotIndicated,
    /// The chip is transmitting
    Transmitting,
    /// The version register does not identify a supported chip
    UnknownChip(u8),
    /// The event queue is full
    QueueFull,
}

impl From<regiface::errors::Error> for Error {
    fn from(err: regiface::errors::Error) -> Self {
        match err {
            regiface::errors::Error::BusError => Self::Bus,
            _ => Self::Deserialization,
        }
    }
}
