//! Link-layer address filter
//!
//! Decides whether an inbound frame is addressed to this node. Promiscuous mode is handled
//! by the caller, it never reaches this filter.

use crate::frame::{Address, FrameType, MacHeader, BROADCAST_PAN, BROADCAST_SHORT_ADDR};

/// Addresses this node answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkAddresses {
    pub short_addr: u16,
    pub ext_addr: u64,
    pub pan_id: u16,
}

impl Default for LinkAddresses {
    fn default() -> Self {
        Self {
            short_addr: BROADCAST_SHORT_ADDR,
            ext_addr: 0,
            pan_id: BROADCAST_PAN,
        }
    }
}

impl LinkAddresses {
    /// Whether the frame starting with `mhr` is for this node.
    ///
    /// Rules, first match wins:
    /// 1. Beacons are accepted while the node has not joined a PAN.
    /// 2. A destination PAN other than broadcast or our own rejects the frame.
    /// 3. A short destination equal to ours or to the broadcast address accepts.
    /// 4. An extended destination equal to ours accepts.
    /// 5. Anything else is rejected, including frames without destination addressing.
    pub fn accepts(&self, mhr: &MacHeader<'_>) -> bool {
        if mhr.frame_type() == FrameType::Beacon && self.pan_id == BROADCAST_PAN {
            return true;
        }

        let Some(dst) = mhr.destination() else {
            return false;
        };

        if dst.pan != BROADCAST_PAN && dst.pan != self.pan_id {
            return false;
        }

        match dst.address {
            Address::Short(addr) => addr == self.short_addr || addr == BROADCAST_SHORT_ADDR,
            Address::Extended(addr) => addr == self.ext_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::data_frame;

    fn node() -> LinkAddresses {
        LinkAddresses {
            short_addr: 0x1234,
            ext_addr: 0x0011_2233_4455_6677,
            pan_id: 0xABCD,
        }
    }

    fn accepts(addrs: &LinkAddresses, frame: &[u8]) -> bool {
        addrs.accepts(&MacHeader::new(frame))
    }

    #[test]
    fn unicast_to_own_short_address_is_accepted() {
        assert!(accepts(&node(), &data_frame(1, 0xABCD, 0x1234, false)));
    }

    #[test]
    fn broadcast_short_address_is_accepted() {
        assert!(accepts(&node(), &data_frame(1, 0xABCD, 0xFFFF, false)));
        assert!(accepts(&node(), &data_frame(1, 0xFFFF, 0xFFFF, false)));
    }

    #[test]
    fn foreign_pan_is_rejected_even_for_own_address() {
        assert!(!accepts(&node(), &data_frame(1, 0x0001, 0x1234, false)));
    }

    #[test]
    fn other_short_address_is_rejected() {
        assert!(!accepts(&node(), &data_frame(1, 0xABCD, 0x4321, false)));
    }

    #[test]
    fn extended_destination_must_match_exactly() {
        let mut frame = [0u8; 13];
        frame[0] = FrameType::Data.bits();
        frame[1] = 0x0C;
        frame[3..5].copy_from_slice(&0xABCDu16.to_le_bytes());
        frame[5..13].copy_from_slice(&0x0011_2233_4455_6677u64.to_le_bytes());
        assert!(accepts(&node(), &frame));

        frame[12] ^= 0x01;
        assert!(!accepts(&node(), &frame));
    }

    #[test]
    fn beacon_without_destination_is_rejected_once_joined() {
        let beacon = [FrameType::Beacon.bits(), 0x80, 9, 0xCD, 0xAB, 0x00, 0x00];
        assert!(!accepts(&node(), &beacon));
        assert!(accepts(&LinkAddresses::default(), &beacon));
    }

    #[test]
    fn beacon_to_pan_zero_depends_on_own_pan() {
        let mut beacon = data_frame(1, 0x0000, 0xFFFF, false);
        beacon[0] = FrameType::Beacon.bits();
        assert!(accepts(&LinkAddresses::default(), &beacon));
        assert!(!accepts(&node(), &beacon));
    }

    #[test]
    fn beacon_is_accepted_before_joining_a_pan() {
        let unjoined = LinkAddresses::default();
        let mut beacon = data_frame(1, 0x0042, 0x0001, false);
        beacon[0] = FrameType::Beacon.bits();
        assert!(accepts(&unjoined, &beacon));
        assert!(!accepts(&node(), &beacon));
    }

    #[test]
    fn frame_without_destination_is_rejected() {
        let frame = [FrameType::Data.bits(), 0x00, 1];
        assert!(!accepts(&node(), &frame));
    }
}
