//! Driver configuration
//!
//! The defaults describe the 433 MHz band plan the driver was brought up with. Every value
//! can be overridden per radio instance.

/// Frequency of channel 0
const CHANNEL_BASE_HZ: u32 = 435_000_000;
/// Distance between two adjacent channels
const CHANNEL_SPACING_HZ: u32 = 200_000;
const CHANNEL_MAX: u8 = 8;
const POWER_MIN_DBM: i8 = -1;
const POWER_MAX_DBM: i8 = 3;
/// Turnaround between the end of a frame that requests an ACK and the ACK transmission
const ACK_REPLY_US: u32 = 1024;

/// Output pin of the power amplifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaSelect {
    /// RFO pin, up to +14 dBm
    #[default]
    Rfo,
    /// PA_BOOST pin, +2 to +17 dBm
    PaBoost,
}

/// Driver configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Carrier frequency of channel 0, in Hz
    pub channel_base_hz: u32,
    /// Channel spacing, in Hz
    pub channel_spacing_hz: u32,
    /// Highest channel index accepted by `config_phy`, channel 0 is the lowest
    pub max_channel: u8,
    /// Lowest accepted transmit power, in dBm
    pub min_power_dbm: i8,
    /// Highest accepted transmit power, in dBm
    pub max_power_dbm: i8,
    /// Delay, in microseconds, between receiving a frame that requests an acknowledgement
    /// and transmitting that acknowledgement. Must fit inside the peer's ACK wait window.
    pub ack_reply_us: u32,
    /// Acknowledge frames that request it
    pub auto_ack: bool,
    /// Power amplifier output wired on the board
    pub pa_select: PaSelect,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_base_hz: CHANNEL_BASE_HZ,
            channel_spacing_hz: CHANNEL_SPACING_HZ,
            max_channel: CHANNEL_MAX,
            min_power_dbm: POWER_MIN_DBM,
            max_power_dbm: POWER_MAX_DBM,
            ack_reply_us: ACK_REPLY_US,
            auto_ack: true,
            pa_select: PaSelect::Rfo,
        }
    }
}

impl Config {
    /// Carrier frequency of `channel`, `None` when the channel is outside the band plan
    pub fn channel_frequency(&self, channel: u8) -> Option<u32> {
        if channel > self.max_channel {
            return None;
        }
        self.channel_spacing_hz
            .checked_mul(channel as u32)?
            .checked_add(self.channel_base_hz)
    }

    pub fn power_in_range(&self, dbm: i8) -> bool {
        (self.min_power_dbm..=self.max_power_dbm).contains(&dbm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_channel_lands_on_the_grid() {
        let config = Config::default();
        for channel in 0..=config.max_channel {
            assert_eq!(
                config.channel_frequency(channel),
                Some(435_000_000 + channel as u32 * 200_000)
            );
        }
        assert_eq!(config.channel_frequency(config.max_channel + 1), None);
    }

    #[test]
    fn power_range_is_inclusive() {
        let config = Config::default();
        assert!(config.power_in_range(-1));
        assert!(config.power_in_range(3));
        assert!(!config.power_in_range(-2));
        assert!(!config.power_in_range(4));
    }
}
