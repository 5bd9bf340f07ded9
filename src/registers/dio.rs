//! DIO mapping registers
//!
//! The SX127x routes interrupt sources to its DIO pins through fixed mapping tables.
//! The link layer only uses DIO0, which carries RxDone, TxDone or CadDone depending on the
//! mapping selected before each operation.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Source routed to DIO0 in LoRa mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dio0Mapping {
    /// `00`: RxDone
    RxDone = 0b00,
    /// `01`: TxDone
    TxDone = 0b01,
    /// `10`: CadDone
    CadDone = 0b10,
    /// `11`: no interrupt
    None = 0b11,
}

/// DIO mapping register 1 (address: 0x40)
///
/// Bits 7:6 select the DIO0 source, bits 5:0 hold the DIO1 to DIO3 mappings which are
/// carried through untouched.
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    /// DIO0 source
    pub dio0: Dio0Mapping,
    /// DIO1..DIO3 mapping bits
    pub others: u8,
}

impl DioMapping1 {
    /// Same DIO1..DIO3 mapping, new DIO0 source
    pub fn with_dio0(self, dio0: Dio0Mapping) -> Self {
        Self { dio0, ..self }
    }
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let dio0 = match bytes[0] >> 6 {
            0b00 => Dio0Mapping::RxDone,
            0b01 => Dio0Mapping::TxDone,
            0b10 => Dio0Mapping::CadDone,
            _ => Dio0Mapping::None,
        };
        Ok(Self {
            dio0,
            others: bytes[0] & 0x3F,
        })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.dio0 as u8) << 6) | (self.others & 0x3F)])
    }
}
