//! CHIPSIG doorbell
//!
//! SYSCFG0 exposes four sticky signal bits shared by the ARM host and the
//! DSP. A set bit stays set until someone writes 1 to it in `CHIPSIG_CLR`,
//! and the DSP interrupt line stays asserted for as long as CHIPINT0 is
//! set. Nobody owns the register: the host only ever clears the inbound
//! bit and only ever sets the outbound bit, and the DSP does the reverse.

use alloc::sync::Arc;
use core::fmt;
use tock_registers::fields::Field;
use tock_registers::LocalRegisterCopy;

use super::regs::{self, CHIPSIG};
use crate::arch::{wmb, MmioAccess};

/// Bits of CHIPSIG that carry channels
const CHANNEL_BITS: u32 = 0xf;

/// One CHIPSIG bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// DSP to host "data ready"
    Inbound,
    /// Unassigned
    Chip1,
    /// Host to DSP "data ready"; the DSP clears it to acknowledge
    Outbound,
    /// Unassigned
    Chip3,
}

impl Channel {
    /// All channels in bit order
    pub const ALL: [Channel; 4] = [
        Channel::Inbound,
        Channel::Chip1,
        Channel::Outbound,
        Channel::Chip3,
    ];

    fn field(self) -> Field<u32, CHIPSIG::Register> {
        match self {
            Channel::Inbound => CHIPSIG::CHIPINT0,
            Channel::Chip1 => CHIPSIG::CHIPINT1,
            Channel::Outbound => CHIPSIG::CHIPINT2,
            Channel::Chip3 => CHIPSIG::CHIPINT3,
        }
    }

    /// Register value with only this channel's bit set
    pub fn mask(self) -> u32 {
        self.field().val(1).value
    }
}

/// Snapshot of the signaled channels
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChannelSet(u32);

impl ChannelSet {
    /// Decode a raw CHIPSIG value; reserved bits are ignored
    pub fn from_raw(raw: u32) -> Self {
        Self(raw & CHANNEL_BITS)
    }

    /// Check if `channel` is signaled
    pub fn contains(&self, channel: Channel) -> bool {
        LocalRegisterCopy::<u32, CHIPSIG::Register>::new(self.0).is_set(channel.field())
    }

    /// Check if no channel is signaled
    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|&channel| !self.contains(channel))
    }

    /// Raw register value
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(Channel::ALL.iter().filter(|&&channel| self.contains(channel)))
            .finish()
    }
}

/// Doorbell and boot-address access over the SYSCFG0 block
#[derive(Clone)]
pub struct Doorbell {
    regs: Arc<dyn MmioAccess>,
}

impl Doorbell {
    /// Wrap a mapped SYSCFG0 block
    pub fn new(regs: Arc<dyn MmioAccess>) -> Self {
        Self { regs }
    }

    /// Currently signaled channels
    pub fn status(&self) -> ChannelSet {
        ChannelSet::from_raw(self.regs.read_u32(regs::CHIPSIG))
    }

    /// Check if `channel` is signaled
    pub fn is_signaled(&self, channel: Channel) -> bool {
        self.status().contains(channel)
    }

    /// Acknowledge `channel`
    pub fn clear(&self, channel: Channel) {
        self.regs.write_u32(regs::CHIPSIG_CLR, channel.mask());
        wmb();
    }

    /// Raise `channel`
    pub fn signal(&self, channel: Channel) {
        self.regs.write_u32(regs::CHIPSIG, channel.mask());
        wmb();
    }

    /// Set the address the DSP starts executing from on reset release
    pub fn program_boot_address(&self, boot_addr: u32) {
        log::debug!("HOST1CFG <- {:#010x}", boot_addr);
        self.regs.write_u32(regs::HOST1CFG, boot_addr);
        wmb();
    }
}
