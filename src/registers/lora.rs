//! LoRa page registers
//!
//! This module contains the registers of the LoRa register map that the link layer drives:
//! - FIFO data buffer pointers
//! - Interrupt flags and masking
//! - Received payload length
//! - Modem configuration (bandwidth, coding rate, spreading factor)
//! - Transmit payload length
//!
//! The 256 byte FIFO is shared between transmission and reception. The base address
//! registers split it, the address pointer register selects where the next SPI access to
//! `RegFifo` lands.

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

bitflags! {
    /// LoRa interrupt sources, shared layout of RegIrqFlags and RegIrqFlagsMask
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u8 {
        /// Single reception timed out
        const RX_TIMEOUT = 1 << 7;
        /// A packet has been received
        const RX_DONE = 1 << 6;
        /// The received payload failed its CRC check
        const PAYLOAD_CRC_ERROR = 1 << 5;
        /// A valid header has been received
        const VALID_HEADER = 1 << 4;
        /// The FIFO payload has been transmitted
        const TX_DONE = 1 << 3;
        /// Channel activity detection finished
        const CAD_DONE = 1 << 2;
        /// Frequency hopping channel change
        const FHSS_CHANGED_CHANNEL = 1 << 1;
        /// Channel activity detected during CAD
        const CAD_DETECTED = 1;
    }
}

/// FIFO address pointer register (address: 0x0D)
///
/// SPI accesses to `RegFifo` read or write at this address and advance it.
#[register(0x0Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoAddrPtr {
    /// FIFO offset of the next access
    pub address: u8,
}

/// FIFO transmit base address register (address: 0x0E)
///
/// Start of the transmitted payload. Set to `0x00` to use the full FIFO for transmission.
#[register(0x0Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoTxBaseAddr {
    /// FIFO offset of the first transmitted byte
    pub address: u8,
}

/// FIFO receive base address register (address: 0x0F)
///
/// Where the demodulator starts writing received payloads.
#[register(0x0Fu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct FifoRxBaseAddr {
    /// FIFO offset of the first received byte
    pub address: u8,
}

/// Start address of the last received packet (address: 0x10)
///
/// Read-only.
#[register(0x10u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct FifoRxCurrentAddr {
    /// FIFO offset of the last packet received
    pub address: u8,
}

/// Interrupt mask register (address: 0x11)
///
/// A set bit masks (disables) the corresponding interrupt source.
#[register(0x11u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqMask {
    /// Masked interrupt sources
    pub masked: IrqFlags,
}

impl IrqMask {
    /// Mask every source except `enabled`
    pub fn only(enabled: IrqFlags) -> Self {
        Self {
            masked: IrqFlags::all().difference(enabled),
        }
    }
}

/// Interrupt status register (address: 0x12)
///
/// # Important Notes
/// - Flags are cleared by writing a one to them
/// - Writing zero bits leaves the corresponding flag untouched
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqStatus {
    /// Raised interrupt sources, or sources to clear when written
    pub flags: IrqFlags,
}

impl IrqStatus {
    /// Value that clears exactly `flags` when written
    pub fn clear(flags: IrqFlags) -> Self {
        Self { flags }
    }
}

/// Number of payload bytes of the last received packet (address: 0x13)
///
/// Read-only.
#[register(0x13u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct RxNbBytes {
    /// Received payload length
    pub count: u8,
}

/// Modem configuration register 1 (address: 0x1D)
///
/// SX1276 layout. Fields are kept raw, [`crate::modem`] maps them to typed settings.
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Signal bandwidth code, bits 7:4 (`7` = 125 kHz, `8` = 250 kHz, `9` = 500 kHz)
    pub bandwidth: u8,
    /// Coding rate code, bits 3:1 (`1` = 4/5 .. `4` = 4/8)
    pub coding_rate: u8,
    /// Implicit header mode
    pub implicit_header: bool,
}

impl Default for ModemConfig1 {
    fn default() -> Self {
        Self {
            bandwidth: 0x07,
            coding_rate: 0x01,
            implicit_header: false,
        }
    }
}

/// Modem configuration register 2 (address: 0x1E)
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Spreading factor as log2 of chips per symbol, bits 7:4
    pub spreading_factor: u8,
    /// Continuous transmission of the FIFO content
    pub tx_continuous: bool,
    /// Enable payload CRC generation and checking
    pub rx_payload_crc: bool,
    /// RX timeout MSB, bits 1:0
    pub symb_timeout_msb: u8,
}

impl Default for ModemConfig2 {
    fn default() -> Self {
        Self {
            spreading_factor: 7,
            tx_continuous: false,
            rx_payload_crc: false,
            symb_timeout_msb: 0,
        }
    }
}

/// Transmit payload length register (address: 0x22)
///
/// Number of FIFO bytes to send, required in explicit header mode too.
#[register(0x22u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PayloadLength {
    /// Payload length in bytes, must not be zero
    pub length: u8,
}

macro_rules! single_byte_register {
    ($($name:ident . $field:ident),* $(,)?) => {
        $(
            impl FromByteArray for $name {
                type Error = Infallible;
                type Array = [u8; 1];

                fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
                    Ok(Self { $field: bytes[0] })
                }
            }
        )*
    };
}

single_byte_register!(
    FifoAddrPtr.address,
    FifoTxBaseAddr.address,
    FifoRxBaseAddr.address,
    FifoRxCurrentAddr.address,
    RxNbBytes.count,
    PayloadLength.length,
);

impl ToByteArray for FifoAddrPtr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl ToByteArray for FifoTxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl ToByteArray for FifoRxBaseAddr {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.address])
    }
}

impl ToByteArray for PayloadLength {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.length])
    }
}

impl FromByteArray for IrqMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            masked: IrqFlags::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.masked.bits()])
    }
}

impl FromByteArray for IrqStatus {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: IrqFlags::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqStatus {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            bandwidth: bytes[0] >> 4,
            coding_rate: (bytes[0] >> 1) & 0x07,
            implicit_header: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.bandwidth & 0x0F) << 4)
            | ((self.coding_rate & 0x07) << 1)
            | self.implicit_header as u8])
    }
}

impl FromByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            spreading_factor: bytes[0] >> 4,
            tx_continuous: bytes[0] & 0x08 != 0,
            rx_payload_crc: bytes[0] & 0x04 != 0,
            symb_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.spreading_factor & 0x0F) << 4)
            | ((self.tx_continuous as u8) << 3)
            | ((self.rx_payload_crc as u8) << 2)
            | (self.symb_timeout_msb & 0x03)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_mask_only_leaves_enabled_sources_unmasked() {
        let mask = IrqMask::only(IrqFlags::TX_DONE);
        assert_eq!(mask.to_bytes().unwrap(), [0xF7]);
    }

    #[test]
    fn modem_config_fields_round_trip_through_register_layout() {
        let cfg1 = ModemConfig1::from_bytes([0x72]).unwrap();
        assert_eq!(cfg1, ModemConfig1::default());

        let cfg2 = ModemConfig2 {
            spreading_factor: 12,
            rx_payload_crc: true,
            ..Default::default()
        };
        assert_eq!(cfg2.to_bytes().unwrap(), [0xC4]);
    }
}
