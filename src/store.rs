/*!
    channel tables of the emulated module

    - analog channels are addressed from 1 to [ANALOG_CHANNELS] when set by the application, but polled by their 0-based index
    - discrete signals are addressed by a global bit number from 1 to [DISCRETE_BITS], spread over [DISCRETE_GROUPS] groups of 8 bits so that consecutive signals land in consecutive groups
*/

use core::fmt;
use bilge::prelude::*;

use crate::protocol::{self, Sample, Target, Reply};


/// number of analog channels
pub const ANALOG_CHANNELS: usize = 128;
/// number of discrete groups
pub const DISCRETE_GROUPS: usize = 48;
/// number of signals in a discrete group
pub const GROUP_BITS: usize = 8;
/// number of individually addressable discrete signals
pub const DISCRETE_BITS: usize = DISCRETE_GROUPS * GROUP_BITS;


/// all channel values of one module
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStore {
    analog: [Sample; ANALOG_CHANNELS],
    discrete: [u8; DISCRETE_GROUPS],
}
impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}
impl ChannelStore {
    /// every channel reads zero
    pub const fn new() -> Self {
        Self {
            analog: [Sample::masked(0); ANALOG_CHANNELS],
            discrete: [0; DISCRETE_GROUPS],
        }
    }

    /// set an analog channel by its 1-based address, the value is truncated to its 10 least significant bits
    pub fn set_analog(&mut self, address: u16, value: u32) -> Result<(), AddressError> {
        let slot = analog_slot(address)?;
        self.analog[slot] = Sample::masked(value);
        Ok(())
    }
    /// analog channel by its 1-based address
    pub fn analog(&self, address: u16) -> Result<Sample, AddressError> {
        Ok(self.analog[analog_slot(address)?])
    }
    /// analog channel by its 0-based index, as addressed by requests
    pub fn analog_at(&self, index: u7) -> Sample {
        self.analog[usize::from(index.value())]
    }

    /// set or clear one discrete signal by its 1-based bit number
    pub fn set_discrete_bit(&mut self, bit: u16, on: bool) -> Result<(), AddressError> {
        let slot = Slot::from_bit(bit)?;
        let group = &mut self.discrete[usize::from(slot.group)];
        if on
            {*group |= slot.mask()}
        else
            {*group &= !slot.mask()}
        Ok(())
    }
    /// one discrete signal by its 1-based bit number
    pub fn discrete_bit(&self, bit: u16) -> Result<bool, AddressError> {
        let slot = Slot::from_bit(bit)?;
        Ok(self.discrete[usize::from(slot.group)] & slot.mask() != 0)
    }
    /// raw value of a group, `None` if the module has no such group
    pub fn discrete_group(&self, group: u8) -> Option<u8> {
        self.discrete.get(usize::from(group)).copied()
    }

    /// reply to send for the given request target
    pub fn answer(&self, target: Target) -> Reply {
        match target {
            Target::Analog(index) => Reply::Analog(protocol::encode_analog(self.analog_at(index))),
            Target::Discrete {group, ..} => {
                // requests can address more groups than exist, those have no signal set
                let raw = self.discrete_group(group.value()).unwrap_or(0);
                Reply::Discrete(protocol::encode_discrete(raw))
            },
        }
    }
}

fn analog_slot(address: u16) -> Result<usize, AddressError> {
    match usize::from(address) {
        0 => Err(AddressError::Analog(address)),
        slot if slot > ANALOG_CHANNELS => Err(AddressError::Analog(address)),
        slot => Ok(slot - 1),
    }
}


/// position of a discrete signal in the group table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// 0-based group index
    pub group: u8,
    /// bit position in the group, 0 being the least significant
    pub position: u8,
}
impl Slot {
    /// slot of a 1-based discrete bit number
    pub fn from_bit(bit: u16) -> Result<Self, AddressError> {
        let offset = usize::from(bit);
        if offset == 0 || offset > DISCRETE_BITS
            {return Err(AddressError::Discrete(bit))}
        let offset = offset - 1;
        Ok(Self {
            group: (offset % DISCRETE_GROUPS) as u8,
            position: (offset / DISCRETE_GROUPS) as u8,
        })
    }
    /// 1-based discrete bit number of this slot
    pub fn bit(self) -> u16 {
        (usize::from(self.position) * DISCRETE_GROUPS + usize::from(self.group) + 1) as u16
    }
    /// mask selecting this slot in its group
    pub fn mask(self) -> u8 {
        1 << self.position
    }
}


/// address outside the tables of the module
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressError {
    /// 1-based analog address not in `1 ..= 128`
    Analog(u16),
    /// 1-based discrete bit not in `1 ..= 384`
    Discrete(u16),
    /// 0-based analog index that cannot be encoded in a request
    Index(u8),
    /// 0-based discrete group that cannot be encoded in a request
    Group(u8),
}
impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analog(address) => write!(f, "analog address {} is not in 1..={}", address, ANALOG_CHANNELS),
            Self::Discrete(bit) => write!(f, "discrete bit {} is not in 1..={}", bit, DISCRETE_BITS),
            Self::Index(index) => write!(f, "analog index {} does not fit in a request", index),
            Self::Group(group) => write!(f, "discrete group {} does not fit in a request", group),
        }
    }
}
impl core::error::Error for AddressError {}
