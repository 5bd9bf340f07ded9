//! LoRa modulation parameters
//!
//! Spreading factor, bandwidth and coding rate shape the airtime and sensitivity of every
//! frame. They are not part of the 802.15.4 operation set, the board shell uses them to
//! tune a link.
//!
//! Changing them while the chip is transmitting would corrupt the frame on air, so every
//! setter refuses with [`Error::Transmitting`] in that case.

use embedded_hal::spi::SpiDevice;

use crate::registers::{CarrierFrequency, Mode, ModemConfig1, ModemConfig2, OpMode};
use crate::{AckTimer, Error, EventHandler, Sx127x};

/// Chips per symbol, as a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpreadingFactor {
    Sf6 = 6,
    Sf7 = 7,
    Sf8 = 8,
    Sf9 = 9,
    Sf10 = 10,
    Sf11 = 11,
    Sf12 = 12,
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(Self::Sf6),
            7 => Ok(Self::Sf7),
            8 => Ok(Self::Sf8),
            9 => Ok(Self::Sf9),
            10 => Ok(Self::Sf10),
            11 => Ok(Self::Sf11),
            12 => Ok(Self::Sf12),
            _ => Err(Error::InvalidModemParameter),
        }
    }
}

/// Signal bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    Khz125,
    Khz250,
    Khz500,
}

impl Bandwidth {
    pub fn khz(self) -> u16 {
        match self {
            Self::Khz125 => 125,
            Self::Khz250 => 250,
            Self::Khz500 => 500,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Khz125 => 0x07,
            Self::Khz250 => 0x08,
            Self::Khz500 => 0x09,
        }
    }

    fn from_code(code: u8) -> Result<Self, Error> {
        match code {
            0x07 => Ok(Self::Khz125),
            0x08 => Ok(Self::Khz250),
            0x09 => Ok(Self::Khz500),
            _ => Err(Error::InvalidModemParameter),
        }
    }
}

impl TryFrom<u16> for Bandwidth {
    type Error = Error;

    fn try_from(khz: u16) -> Result<Self, Self::Error> {
        match khz {
            125 => Ok(Self::Khz125),
            250 => Ok(Self::Khz250),
            500 => Ok(Self::Khz500),
            _ => Err(Error::InvalidModemParameter),
        }
    }
}

/// Forward error correction rate, 4/5 to 4/8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingRate {
    Cr4_5 = 1,
    Cr4_6 = 2,
    Cr4_7 = 3,
    Cr4_8 = 4,
}

impl CodingRate {
    /// Rate from its denominator, `5` for 4/5 up to `8` for 4/8
    pub fn from_denominator(denominator: u8) -> Result<Self, Error> {
        match denominator {
            5 => Ok(Self::Cr4_5),
            6 => Ok(Self::Cr4_6),
            7 => Ok(Self::Cr4_7),
            8 => Ok(Self::Cr4_8),
            _ => Err(Error::InvalidModemParameter),
        }
    }

    pub fn denominator(self) -> u8 {
        self as u8 + 4
    }

    fn from_code(code: u8) -> Result<Self, Error> {
        Self::from_denominator(code + 4)
    }
}

/// Snapshot of the current modem configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemSettings {
    /// Carrier frequency read back from the synthesizer, in Hz
    pub frequency_hz: u32,
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
}

impl<SPI, T, H> Sx127x<SPI, T, H>
where
    SPI: SpiDevice,
    T: AckTimer,
    H: EventHandler,
{
    fn ensure_not_transmitting(&mut self) -> Result<(), Error> {
        let op_mode: OpMode = self.device.read_register()?;
        if op_mode.mode == Mode::Transmitter {
            return Err(Error::Transmitting);
        }
        Ok(())
    }

    /// Sets the spreading factor, other modem settings are kept.
    ///
    /// # Errors
    /// * `Error::Transmitting` - the chip is in transmitter mode
    pub fn set_spreading_factor(&mut self, sf: SpreadingFactor) -> Result<(), Error> {
        self.ensure_not_transmitting()?;
        self.device.modify_register(|cfg: ModemConfig2| ModemConfig2 {
            spreading_factor: sf as u8,
            ..cfg
        })?;
        Ok(())
    }

    /// Sets the signal bandwidth, other modem settings are kept.
    ///
    /// # Errors
    /// * `Error::Transmitting` - the chip is in transmitter mode
    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<(), Error> {
        self.ensure_not_transmitting()?;
        self.device.modify_register(|cfg: ModemConfig1| ModemConfig1 {
            bandwidth: bandwidth.code(),
            ..cfg
        })?;
        Ok(())
    }

    /// Sets the coding rate, other modem settings are kept.
    ///
    /// # Errors
    /// * `Error::Transmitting` - the chip is in transmitter mode
    pub fn set_coding_rate(&mut self, coding_rate: CodingRate) -> Result<(), Error> {
        self.ensure_not_transmitting()?;
        self.device.modify_register(|cfg: ModemConfig1| ModemConfig1 {
            coding_rate: coding_rate as u8,
            ..cfg
        })?;
        Ok(())
    }

    /// Reads the modulation parameters back from the chip
    ///
    /// # Errors
    /// * `Error::InvalidModemParameter` - a register holds a value this driver never programs
    pub fn modem_settings(&mut self) -> Result<ModemSettings, Error> {
        let frequency: CarrierFrequency = self.device.read_register()?;
        let cfg1: ModemConfig1 = self.device.read_register()?;
        let cfg2: ModemConfig2 = self.device.read_register()?;

        Ok(ModemSettings {
            frequency_hz: frequency.to_hz(),
            spreading_factor: SpreadingFactor::try_from(cfg2.spreading_factor)?,
            bandwidth: Bandwidth::from_code(cfg1.bandwidth)?,
            coding_rate: CodingRate::from_code(cfg1.coding_rate)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{radio, REG_MODEM_CONFIG1, REG_MODEM_CONFIG2, REG_OP_MODE};

    #[test]
    fn coding_rate_denominator_outside_five_to_eight_is_rejected() {
        for denominator in [0, 4, 9, 255] {
            assert_eq!(
                CodingRate::from_denominator(denominator),
                Err(Error::InvalidModemParameter)
            );
        }
        assert_eq!(CodingRate::from_denominator(7), Ok(CodingRate::Cr4_7));
        assert_eq!(CodingRate::Cr4_8.denominator(), 8);
    }

    #[test]
    fn bandwidth_accepts_only_supported_widths() {
        assert_eq!(Bandwidth::try_from(250), Ok(Bandwidth::Khz250));
        assert_eq!(Bandwidth::try_from(62), Err(Error::InvalidModemParameter));
        assert_eq!(SpreadingFactor::try_from(5), Err(Error::InvalidModemParameter));
    }

    #[test]
    fn setters_update_only_their_field() {
        let (mut radio, chip) = radio();
        radio.request_on().unwrap();

        radio.set_spreading_factor(SpreadingFactor::Sf12).unwrap();
        radio.set_bandwidth(Bandwidth::Khz500).unwrap();
        radio.set_coding_rate(CodingRate::Cr4_8).unwrap();

        assert_eq!(chip.borrow().reg(REG_MODEM_CONFIG1), 0x98);
        assert_eq!(chip.borrow().reg(REG_MODEM_CONFIG2), 0xC0);

        let settings = radio.modem_settings().unwrap();
        assert_eq!(settings.spreading_factor, SpreadingFactor::Sf12);
        assert_eq!(settings.bandwidth, Bandwidth::Khz500);
        assert_eq!(settings.coding_rate, CodingRate::Cr4_8);
    }

    #[test]
    fn settings_are_refused_while_transmitting() {
        let (mut radio, chip) = radio();
        radio.request_on().unwrap();
        chip.borrow_mut().set_reg(REG_OP_MODE, 0x83);

        assert_eq!(
            radio.set_spreading_factor(SpreadingFactor::Sf9),
            Err(Error::Transmitting)
        );
        assert_eq!(chip.borrow().reg(REG_MODEM_CONFIG2), 0x70);
    }

    #[test]
    fn settings_report_tuned_frequency() {
        let (mut radio, _chip) = radio();
        radio.request_on().unwrap();
        radio.config_phy(5, 0).unwrap();

        assert_eq!(radio.modem_settings().unwrap().frequency_hz, 436_000_000);
    }
}
