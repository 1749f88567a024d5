//! Configuration management
//!
//! Static per-board data for the DSP remote processor and the runtime
//! policies of the driver. Parsing board descriptions is left to the
//! platform; this module only holds and validates the result.

use crate::core::irq::IrqNumber;
use crate::utils::Backoff;
use crate::{Error, Result};

/// Per-instance platform record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RprocPlatformData {
    /// Display name of the remote processor
    pub name: &'static str,
    /// Firmware image loaded by the framework
    pub firmware: &'static str,
    /// Name of the DSP clock
    pub clk_name: &'static str,
}

/// Register bases and lines of the SoC hosting the DSP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocConfig {
    /// Physical base of the SYSCFG0 module (boot address and CHIPSIG)
    pub syscfg0_base: usize,
    /// Physical base of the power/sleep controller owning the DSP domain
    pub psc_base: usize,
    /// Local power/sleep controller index of the DSP
    pub dsp_lpsc: u32,
    /// Interrupt line the DSP raises CHIPINT0 on
    pub irq: IrqNumber,
}

impl SocConfig {
    /// DA850 / OMAP-L138 layout
    pub const fn da850() -> Self {
        Self {
            syscfg0_base: 0x01C1_4000,
            psc_base: 0x01C1_0000,
            dsp_lpsc: 15,
            irq: 28,
        }
    }
}

impl Default for SocConfig {
    fn default() -> Self {
        Self::da850()
    }
}

/// How long `kick` waits for the DSP to acknowledge the previous doorbell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickPolicy {
    /// Give up with `TimedOut` after this many backoff polls
    Bounded {
        /// Poll budget
        max_polls: u32,
    },
    /// Wait forever
    Unbounded,
}

impl KickPolicy {
    /// Default poll budget
    ///
    /// This counts backoff polls, not time. Past the first few polls each
    /// one spins 1024 times, so the default is about 1.02e9 spin-loop
    /// hints. On a 456 MHz ARM926EJ-S that is a few seconds of busy
    /// waiting; boards that need a tighter bound should lower it.
    pub const DEFAULT_MAX_POLLS: u32 = 1_000_000;

    /// Spin-loop hints a kick may burn before timing out
    ///
    /// `None` for [`KickPolicy::Unbounded`].
    pub const fn spin_budget(&self) -> Option<u64> {
        match *self {
            KickPolicy::Bounded { max_polls } => Some(Backoff::spin_budget(max_polls)),
            KickPolicy::Unbounded => None,
        }
    }
}

impl Default for KickPolicy {
    fn default() -> Self {
        KickPolicy::Bounded {
            max_polls: Self::DEFAULT_MAX_POLLS,
        }
    }
}

/// What the doorbell interrupt handler reports when CHIPINT0 is clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrqAttribution {
    /// Report "not mine" so other users of the shared line get a say
    #[default]
    Strict,
    /// Always report handled
    AlwaysHandled,
}

/// Complete driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DavinciRprocConfig {
    /// Platform record
    pub pdata: RprocPlatformData,
    /// SoC layout
    pub soc: SocConfig,
    /// Doorbell acknowledge wait
    pub kick: KickPolicy,
    /// Shared-line attribution
    pub attribution: IrqAttribution,
}

impl DavinciRprocConfig {
    /// Configuration for `pdata` on a DA850 with default policies
    pub fn new(pdata: RprocPlatformData) -> Self {
        Self {
            pdata,
            soc: SocConfig::da850(),
            kick: KickPolicy::default(),
            attribution: IrqAttribution::default(),
        }
    }

    /// Replace the SoC layout
    pub fn with_soc(mut self, soc: SocConfig) -> Self {
        self.soc = soc;
        self
    }

    /// Replace the kick wait policy
    pub fn with_kick_policy(mut self, kick: KickPolicy) -> Self {
        self.kick = kick;
        self
    }

    /// Replace the shared-line attribution
    pub fn with_attribution(mut self, attribution: IrqAttribution) -> Self {
        self.attribution = attribution;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pdata.name.is_empty() || self.pdata.clk_name.is_empty() {
            return Err(Error::InvalidArgument);
        }
        if self.soc.syscfg0_base == 0 || self.soc.psc_base == 0 {
            return Err(Error::InvalidArgument);
        }
        // MDCTL has room for 32 modules per controller.
        if self.soc.dsp_lpsc >= 32 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}
