//! IEEE 802.15.4 MAC header decoding
//!
//! Only the fields the link layer needs are decoded: frame type, the ACK request bit, the
//! sequence number and the destination addressing fields. Multi-byte fields are little
//! endian on the wire.
//!
//! ```text
//! | FCF 2 bytes | SEQ 1 byte | DST PAN 0/2 | DST ADDR 0/2/8 | ...
//! ```

/// Maximum PSDU size in bytes, FCS included
pub const MAX_FRAME_LEN: usize = 127;

/// Length of an immediate ACK PSDU, FCS excluded
pub const ACK_FRAME_LEN: usize = 3;

/// Smallest frame the driver hands to the upper layer
pub const MIN_FRAME_LEN: usize = ACK_FRAME_LEN;

/// PAN id accepted by every device
pub const BROADCAST_PAN: u16 = 0xFFFF;

/// Short address accepted by every device
pub const BROADCAST_SHORT_ADDR: u16 = 0xFFFF;

const FCF_TYPE_MASK: u8 = 0x07;
const FCF_ACK_REQ: u8 = 0x20;
const FCF_DST_ADDR_MASK: u8 = 0x0C;
const FCF_DST_ADDR_SHORT: u8 = 0x08;
const FCF_DST_ADDR_LONG: u8 = 0x0C;

/// Frame type, bits 2:0 of the first frame control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    MacCommand,
    Reserved(u8),
}

impl From<u8> for FrameType {
    fn from(fcf0: u8) -> Self {
        match fcf0 & FCF_TYPE_MASK {
            0 => Self::Beacon,
            1 => Self::Data,
            2 => Self::Ack,
            3 => Self::MacCommand,
            other => Self::Reserved(other),
        }
    }
}

impl FrameType {
    /// Value of the frame type bits
    pub const fn bits(self) -> u8 {
        match self {
            Self::Beacon => 0,
            Self::Data => 1,
            Self::Ack => 2,
            Self::MacCommand => 3,
            Self::Reserved(other) => other & FCF_TYPE_MASK,
        }
    }
}

/// A destination address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    Short(u16),
    Extended(u64),
}

/// Destination PAN and address of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Destination {
    pub pan: u16,
    pub address: Address,
}

/// Borrowed view over the MAC header of a received frame.
///
/// Accessors never panic: a field that lies beyond the end of the buffer is reported as
/// absent.
#[derive(Debug, Clone, Copy)]
pub struct MacHeader<'a> {
    bytes: &'a [u8],
}

impl<'a> MacHeader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn fcf(&self) -> (u8, u8) {
        (
            self.bytes.first().copied().unwrap_or(0),
            self.bytes.get(1).copied().unwrap_or(0),
        )
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from(self.fcf().0)
    }

    pub fn ack_requested(&self) -> bool {
        self.fcf().0 & FCF_ACK_REQ != 0
    }

    pub fn sequence_number(&self) -> Option<u8> {
        self.bytes.get(2).copied()
    }

    /// An immediate ACK: ACK type and an all-zero second control byte
    pub fn is_imm_ack(&self) -> bool {
        let (_, fcf1) = self.fcf();
        self.bytes.len() >= ACK_FRAME_LEN && self.frame_type() == FrameType::Ack && fcf1 == 0
    }

    /// Destination fields, `None` when the frame carries no destination addressing
    pub fn destination(&self) -> Option<Destination> {
        let (_, fcf1) = self.fcf();
        let pan = u16::from_le_bytes(self.bytes.get(3..5)?.try_into().ok()?);
        match fcf1 & FCF_DST_ADDR_MASK {
            FCF_DST_ADDR_SHORT => {
                let addr = u16::from_le_bytes(self.bytes.get(5..7)?.try_into().ok()?);
                Some(Destination {
                    pan,
                    address: Address::Short(addr),
                })
            }
            FCF_DST_ADDR_LONG => {
                let addr = u64::from_le_bytes(self.bytes.get(5..13)?.try_into().ok()?);
                Some(Destination {
                    pan,
                    address: Address::Extended(addr),
                })
            }
            _ => None,
        }
    }
}

/// Immediate ACK for the frame with sequence number `seq`
pub fn imm_ack(seq: u8) -> [u8; ACK_FRAME_LEN] {
    [FrameType::Ack.bits(), 0x00, seq]
}
