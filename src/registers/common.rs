//! Common registers
//!
//! This module contains registers shared by the FSK/OOK and LoRa register maps:
//! - Operating mode and modem selection
//! - Carrier frequency
//! - Power amplifier configuration
//! - Silicon version
//!
//! These registers keep their address when the chip is switched to LoRa mode.

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Crystal oscillator frequency of the reference design, in Hz
pub const FXOSC_HZ: u64 = 32_000_000;

/// Frequency synthesizer step exponent: `Fstep = FXOSC / 2^19`
const FSTEP_SHIFT: u32 = 19;

bitflags! {
    /// Mode-independent bits of the RegOpMode register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpModeFlags: u8 {
        /// LoRa modem selected. Can only be changed in sleep mode.
        const LONG_RANGE = 1 << 7;
        /// Access the FSK registers page while in LoRa mode
        const ACCESS_SHARED_REG = 1 << 6;
        /// Low frequency (band 2/3) register access, SX1276 only
        const LOW_FREQUENCY = 1 << 3;
    }
}

/// Transceiver mode, bits 2:0 of RegOpMode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Lowest power mode, only SPI and configuration registers are accessible
    Sleep = 0,
    /// Crystal oscillator and LoRa baseband blocks are on
    Standby = 1,
    /// Frequency synthesis for transmission
    FsTx = 2,
    /// Transmit the content of the FIFO
    Transmitter = 3,
    /// Frequency synthesis for reception
    FsRx = 4,
    /// Receive continuously until the host selects another mode
    RxContinuous = 5,
    /// Receive a single packet then return to standby
    RxSingle = 6,
    /// Channel activity detection
    Cad = 7,
}

impl Mode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Sleep,
            1 => Self::Standby,
            2 => Self::FsTx,
            3 => Self::Transmitter,
            4 => Self::FsRx,
            5 => Self::RxContinuous,
            6 => Self::RxSingle,
            _ => Self::Cad,
        }
    }
}

/// Operating mode register (address: 0x01)
///
/// Selects the modem (FSK/OOK or LoRa) and the transceiver mode.
///
/// # Important Notes
/// - `LONG_RANGE` may only be toggled while in [`Mode::Sleep`]
/// - Writing a new mode starts the transition immediately
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    /// Mode independent flags
    pub flags: OpModeFlags,
    /// Transceiver mode
    pub mode: Mode,
}

impl OpMode {
    /// LoRa modem in the given mode
    pub fn lora(mode: Mode) -> Self {
        Self {
            flags: OpModeFlags::LONG_RANGE,
            mode,
        }
    }

    /// Same flags, different mode
    pub fn with_mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }
}

/// Carrier frequency register (address: 0x06..0x08)
///
/// 24-bit synthesizer word, MSB first. The RF frequency is `frf * FXOSC / 2^19`,
/// giving a resolution of 61.035 Hz with a 32 MHz crystal.
///
/// # Important Notes
/// - The frequency change takes effect when the LSB (0x08) is written, the burst write
///   used by [`crate::Device::write_register`] guarantees the ordering
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct CarrierFrequency {
    /// Synthesizer word, 24 bits
    pub frf: u32,
}

impl CarrierFrequency {
    /// Synthesizer word for a frequency in Hz, rounded down to the step below
    pub fn from_hz(hz: u32) -> Self {
        Self {
            frf: (((hz as u64) << FSTEP_SHIFT) / FXOSC_HZ) as u32,
        }
    }

    /// Frequency in Hz this word tunes to
    pub fn to_hz(self) -> u32 {
        ((self.frf as u64 * FXOSC_HZ) >> FSTEP_SHIFT) as u32
    }
}

/// Power amplifier configuration register (address: 0x09)
///
/// # Output Power
/// - RFO pin: `Pout = Pmax - (15 - output_power)` with `Pmax = 10.8 + 0.6 * max_power` dBm
/// - PA_BOOST pin: `Pout = 17 - (15 - output_power)` dBm
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    /// Route the PA to the PA_BOOST pin instead of RFO
    pub pa_boost: bool,
    /// Maximum power selection, 3 bits
    pub max_power: u8,
    /// Output power, 4 bits
    pub output_power: u8,
}

impl Default for PaConfig {
    fn default() -> Self {
        Self {
            pa_boost: false,
            max_power: 0x04,
            output_power: 0x0F,
        }
    }
}

/// Silicon version register (address: 0x42)
///
/// Read-only. SX1276/77/78/79 report `0x12`, SX1272/73 report `0x22`.
/// A bus with no chip attached usually reads `0x00` or `0xFF`.
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct Version {
    /// Full revision number (bits 7:4) and metal mask revision (bits 3:0)
    pub value: u8,
}

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: OpModeFlags::from_bits_truncate(bytes[0]),
            mode: Mode::from_bits(bytes[0]),
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits() | self.mode as u8])
    }
}

impl FromByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            frf: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
        })
    }
}

impl ToByteArray for CarrierFrequency {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [_, msb, mid, lsb] = self.frf.to_be_bytes();
        Ok([msb, mid, lsb])
    }
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_boost: bytes[0] & 0x80 != 0,
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.pa_boost as u8) << 7)
            | ((self.max_power & 0x07) << 4)
            | (self.output_power & 0x0F)])
    }
}

impl FromByteArray for Version {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_word_matches_datasheet_step() {
        assert_eq!(CarrierFrequency::from_hz(435_000_000).frf, 0x6C_C000);
        assert_eq!(CarrierFrequency::from_hz(436_000_000).frf, 0x6D_0000);
        assert_eq!(CarrierFrequency { frf: 0x6C_C000 }.to_hz(), 435_000_000);
    }

    #[test]
    fn op_mode_keeps_flags_apart_from_mode() {
        let raw = OpMode::lora(Mode::RxContinuous).to_bytes().unwrap();
        assert_eq!(raw, [0x85]);

        let parsed = OpMode::from_bytes([0x8B]).unwrap();
        assert_eq!(parsed.mode, Mode::Transmitter);
        assert_eq!(parsed.flags, OpModeFlags::LONG_RANGE | OpModeFlags::LOW_FREQUENCY);
    }

    #[test]
    fn pa_config_packs_fields() {
        let pa = PaConfig {
            pa_boost: true,
            max_power: 7,
            output_power: 0x0F,
        };
        assert_eq!(pa.to_bytes().unwrap(), [0xFF]);
        assert_eq!(PaConfig::from_bytes([0x74]).unwrap().output_power, 4);
    }
}
