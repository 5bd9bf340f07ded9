//! Operation requests and their confirmations
//!
//! Every operation follows a two-phase contract: [`crate::Sx127x::request_op`] starts it and
//! returns at once, [`crate::Sx127x::confirm_op`] collects the outcome once the matching
//! indication was raised. [`PendingOp`] tracks where the last requested operation stands so
//! that confirming too early is reported instead of returning a stale result.

use bitflags::bitflags;

use crate::Error;

/// Operations the upper layer can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Op {
    /// Send the frame previously loaded with [`crate::Sx127x::write`]
    Transmit,
    /// Listen continuously
    SetReceive,
    /// Leave RX/TX and go to standby
    SetIdle,
    /// Clear channel assessment
    Cca,
}

/// Outcome of a transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    Success,
    /// Channel activity was detected, the upper layer may retry
    MediumBusy,
}

/// Result collected by [`crate::Sx127x::confirm_op`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Confirmation {
    Transmit(TxStatus),
    SetReceive,
    SetIdle,
    /// `true` when the channel is clear
    Cca(bool),
}

/// Progress of the last requested operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingOp {
    #[default]
    None,
    /// Started, completion not signalled yet
    Requested(Op),
    /// Completion signalled, waiting for the confirm call
    Indicated(Op),
}

impl PendingOp {
    pub(crate) fn request(&mut self, op: Op) {
        *self = Self::Requested(op);
    }

    /// Marks `op` as completed. Completions for another operation are ignored.
    pub(crate) fn indicate(&mut self, op: Op) {
        if *self == Self::Requested(op) {
            *self = Self::Indicated(op);
        }
    }

    /// Consumes the completion of `op`
    pub(crate) fn confirm(&mut self, op: Op) -> Result<(), Error> {
        match *self {
            Self::Indicated(pending) if pending == op => {
                *self = Self::None;
                Ok(())
            }
            Self::Requested(pending) if pending == op => Err(Error::NotIndicated),
            _ => Err(Error::NotRequested),
        }
    }
}

bitflags! {
    /// Features advertised to the upper layer
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u16 {
        /// Operates in a sub-GHz band
        const SUB_GHZ = 1 << 0;
        /// Reports frames that failed their CRC
        const IRQ_CRC_ERROR = 1 << 1;
        /// Signals transmission completion
        const IRQ_TX_DONE = 1 << 2;
        /// Signals CCA completion
        const IRQ_CCA_DONE = 1 << 3;
        /// Advertised as a BPSK PHY to the 802.15.4 stack
        const PHY_BPSK = 1 << 4;
    }
}

/// Clear channel assessment criteria. Accepted for compatibility, the radio always reports
/// a clear channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcaMode {
    EnergyDetection,
    CarrierSense,
    EdOrCs,
    EdAndCs,
}

/// Frame filtering applied on reception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterMode {
    /// Address filtered frames, received ACKs are dropped
    #[default]
    Accept,
    /// Every frame is indicated, no ACK is ever sent
    Promiscuous,
    /// Received ACKs are indicated to the upper layer
    AckOnly,
}

/// Address filter configuration commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressFilter {
    ShortAddr(u16),
    ExtAddr(u64),
    PanId(u16),
    /// Not supported by this radio
    PanCoordinator(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_before_indication_is_detected() {
        let mut pending = PendingOp::default();
        pending.request(Op::Transmit);
        assert_eq!(pending.confirm(Op::Transmit), Err(Error::NotIndicated));

        pending.indicate(Op::Transmit);
        assert_eq!(pending.confirm(Op::Transmit), Ok(()));
        assert_eq!(pending, PendingOp::None);
    }

    #[test]
    fn confirm_of_another_operation_is_rejected() {
        let mut pending = PendingOp::default();
        assert_eq!(pending.confirm(Op::Cca), Err(Error::NotRequested));

        pending.request(Op::SetReceive);
        pending.indicate(Op::SetReceive);
        assert_eq!(pending.confirm(Op::Transmit), Err(Error::NotRequested));
        assert_eq!(pending, PendingOp::Indicated(Op::SetReceive));
    }

    #[test]
    fn stray_indication_does_not_complete_pending_request() {
        let mut pending = PendingOp::default();
        pending.request(Op::Cca);
        pending.indicate(Op::Transmit);
        assert_eq!(pending, PendingOp::Requested(Op::Cca));
    }
}
