/*!
    wire format of the remote I/O module

    every poll is one request byte, its most significant bit selects the kind of resource:

    ```text
    analog request     1 i i i i i i i      i: 0-based analog index
    discrete request   0 s g g g g g g      g: group, s: switcher (reserved)

    analog reply       1 1 l l l l l l   0 0 0 0 h h h h     l: 6 low bits, h: 4 high bits
    discrete reply     !group
    ```

    there is no checksum nor length, the requester knows how many bytes to expect from what it asked.
*/

use core::fmt;
use bilge::prelude::*;
use packbytes::{FromBytes, ToBytes};

use crate::{
    pack_bits,
    store::{AddressError, ANALOG_CHANNELS},
    };


/// largest reply, in bytes
pub const MAX_REPLY: usize = 2;
/// fixed value of the two top bits of an analog reply's first byte
pub const LOW_MARKER: u8 = 0b11;
/// number of discrete groups a request byte can address, more than the module has
pub const GROUP_CODES: u8 = 64;

/// 10 bit analog value, as sampled by the module
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sample(u16);
impl Sample {
    pub const BITS: u32 = 10;
    pub const MAX: Self = Self(0x3ff);

    /// keep only the 10 least significant bits of the given value
    pub const fn masked(raw: u32) -> Self {
        Self((raw & Self::MAX.0 as u32) as u16)
    }
    /// the given value if it fits in 10 bits
    pub const fn new(raw: u16) -> Option<Self> {
        if raw <= Self::MAX.0  {Some(Self(raw))}
        else {None}
    }
    pub const fn value(self) -> u16 {self.0}
    /// 6 least significant bits
    pub const fn low6(self) -> u8 {(self.0 & 0x3f) as u8}
    /// 4 most significant bits
    pub const fn high4(self) -> u8 {((self.0 >> 6) & 0x0f) as u8}
}
impl From<Sample> for u16 {
    fn from(sample: Sample) -> Self {sample.0}
}


/// request byte addressing an analog channel
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct AnalogRequest {
    /// 0-based index in the analog table
    pub index: u7,
    /// set for analog requests
    pub analog: bool,
}

/// request byte addressing a discrete group
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct DiscreteRequest {
    /// 0-based group index, only the first [crate::store::DISCRETE_GROUPS] exist in the module
    pub group: u6,
    /// reserved for selecting a switcher, decoded but not used for addressing
    pub switcher: bool,
    /// cleared for discrete requests
    pub analog: bool,
}

/// resource selected by a request byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// analog channel, by 0-based index
    Analog(u7),
    /// discrete group, by 0-based index
    Discrete {group: u6, switcher: bool},
}
impl Target {
    pub fn analog(index: u8) -> Result<Self, AddressError> {
        if usize::from(index) >= ANALOG_CHANNELS
            {return Err(AddressError::Index(index))}
        Ok(Self::Analog(u7::new(index)))
    }
    pub fn discrete(group: u8, switcher: bool) -> Result<Self, AddressError> {
        if group >= GROUP_CODES
            {return Err(AddressError::Group(group))}
        Ok(Self::Discrete {group: u6::new(group), switcher})
    }
}

/// decode a received request byte, every byte is a valid request
pub fn decode_request(byte: u8) -> Target {
    let request = DiscreteRequest::from(byte);
    if request.analog() {
        Target::Analog(AnalogRequest::from(byte).index())
    }
    else {
        Target::Discrete {
            group: request.group(),
            switcher: request.switcher(),
        }
    }
}
/// request byte to send for polling the given target
pub fn encode_request(target: Target) -> u8 {
    match target {
        Target::Analog(index) => AnalogRequest::new(index, true).into(),
        Target::Discrete {group, switcher} => DiscreteRequest::new(group, switcher, false).into(),
    }
}


/// first byte of an analog reply
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct LowByte {
    /// 6 least significant bits of the sample
    pub low: u6,
    /// always [LOW_MARKER], distinguishes this byte from the second one
    pub marker: u2,
}
pack_bits!(LowByte);

/// second byte of an analog reply
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct HighByte {
    /// 4 most significant bits of the sample
    pub high: u4,
    /// always zero
    pub unused: u4,
}
pack_bits!(HighByte);

/// the two bytes answering an analog request, in transmission order
#[derive(Copy, Clone, FromBytes, ToBytes, Debug, PartialEq)]
pub struct AnalogReply {
    pub low: LowByte,
    pub high: HighByte,
}

/// bytes answering one request
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Reply {
    Analog(AnalogReply),
    /// complemented group
    Discrete(u8),
}
impl Reply {
    /// bytes to transmit, in order
    pub fn to_bytes(&self) -> heapless::Vec<u8, MAX_REPLY> {
        let mut bytes = heapless::Vec::new();
        match *self {
            Reply::Analog(reply) => bytes.extend(reply.to_be_bytes().as_ref().iter().copied()),
            Reply::Discrete(inverted) => bytes.extend([inverted]),
        }
        bytes
    }
}

pub fn encode_analog(sample: Sample) -> AnalogReply {
    AnalogReply {
        low: LowByte::new(u6::new(sample.low6()), u2::new(LOW_MARKER)),
        high: HighByte::new(u4::new(sample.high4()), u4::new(0)),
    }
}
/// rebuild a sample from the two bytes of an analog reply, checking their framing
pub fn decode_analog(bytes: [u8; 2]) -> Result<Sample, FrameError> {
    let reply = AnalogReply::from_be_bytes(bytes);
    if reply.low.marker().value() != LOW_MARKER
        {return Err(FrameError::LowMarker(bytes[0]))}
    if reply.high.unused().value() != 0
        {return Err(FrameError::HighPadding(bytes[1]))}
    Ok(Sample::masked(
        u32::from(reply.high.high().value()) << 6
        | u32::from(reply.low.low().value())
        ))
}
/// the whole group is sent inverted, not only one bit
pub const fn encode_discrete(group: u8) -> u8 {!group}
/// raw group from a discrete reply
pub const fn decode_discrete(reply: u8) -> u8 {!reply}


/// reply bytes not matching the analog framing
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// first byte does not start with bits `1 1`
    LowMarker(u8),
    /// second byte has bits set above the 4 value bits
    HighPadding(u8),
}
impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowMarker(byte) => write!(f, "analog reply low byte {:#04x} misses its marker bits", byte),
            Self::HighPadding(byte) => write!(f, "analog reply high byte {:#04x} has non-zero padding", byte),
        }
    }
}
impl core::error::Error for FrameError {}
