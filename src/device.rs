//! SX127x Register Interface
//!
//! This module provides the bus layer for SX127x series radios. The SX127x exposes its whole
//! configuration as a flat register file that is accessed over SPI:
//!
//! - The first byte of every transfer is the register address. Bit 7 selects the direction
//!   (`1` = write, `0` = read).
//! - Burst transfers auto-increment the address, so multi-byte registers such as the carrier
//!   frequency are written in a single transaction.
//! - Address `0x00` is the FIFO window. Bursts on it do not auto-increment the register
//!   address but instead advance the FIFO address pointer.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use sx127x::{Device, Error, Version};
//!
//! fn chip_version<SPI: SpiDevice>(spi: SPI) -> Result<u8, Error> {
//!     let mut device = Device::new(spi);
//!     let version: Version = device.read_register()?;
//!     Ok(version.value)
//! }
//! ```

use core::convert::Infallible;

use regiface::{errors::Error as RegifaceError, ByteArray, ReadableRegister, WritableRegister};

/// Address of the FIFO data window
const REG_FIFO: u8 = 0x00;

/// Direction bit set on the address byte of write transfers
const WRITE_FLAG: u8 = 0x80;

/// Main device interface for the SX127x radio.
///
/// This struct wraps an SPI interface and provides typed register access plus raw FIFO
/// transfers. It holds no radio state; the link-layer state lives in [`crate::Sx127x`].
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    ///
    /// # Arguments
    /// * `spi` - An SPI interface implementing the required embedded-hal traits
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    ///
    /// This method consumes the Device instance and returns the wrapped SPI interface.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads a register value from the device.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing ReadableRegister with u8 ID
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    /// * `RegifaceError::DeserializationError` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[R::id() & !WRITE_FLAG]),
                embedded_hal::spi::Operation::Read(raw_value.as_mut()),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Writes a value to a device register.
    ///
    /// # Type Parameters
    /// * `R` - Register type implementing WritableRegister with u8 ID
    ///
    /// # Arguments
    /// * `register` - The register value to write
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(raw) => raw,
            Err(never) => match never {},
        };

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[R::id() | WRITE_FLAG]),
                embedded_hal::spi::Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Read-modify-write of a register.
    pub fn modify_register<R, F>(&mut self, f: F) -> Result<(), RegifaceError>
    where
        R: ReadableRegister<IdType = u8> + WritableRegister<IdType = u8, Error = Infallible>,
        F: FnOnce(R) -> R,
    {
        let value = self.read_register::<R>()?;
        self.write_register(f(value))
    }

    /// Writes bytes into the FIFO at the current FIFO address pointer.
    ///
    /// The caller is responsible for programming `FifoAddrPtr` beforehand.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[REG_FIFO | WRITE_FLAG]),
                embedded_hal::spi::Operation::Write(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads bytes from the FIFO starting at the current FIFO address pointer.
    ///
    /// # Arguments
    /// * `bytes` - Buffer to store read data, its length is the number of bytes read
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn read_fifo(&mut self, bytes: &mut [u8]) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[REG_FIFO]),
                embedded_hal::spi::Operation::Read(bytes),
            ])
            .map_err(|_| RegifaceError::BusError)
    }
}
