//! DA850 SYSCFG0 and PSC register layout used by the DSP driver

use tock_registers::register_bitfields;

/// DSP boot address register in SYSCFG0
pub const HOST1CFG: usize = 0x44;

/// Chip signal register: read returns pending bits, writing 1 sets a bit
pub const CHIPSIG: usize = 0x174;

/// Chip signal clear register: writing 1 clears a bit
pub const CHIPSIG_CLR: usize = 0x178;

/// Size of the SYSCFG0 window the driver touches
pub const SYSCFG0_SIZE: usize = 0x1000;

/// Size of a power/sleep controller window
pub const PSC_SIZE: usize = 0x1000;

/// Offset of the first module control register in a PSC
const MDCTL_BASE: usize = 0xA00;

/// Boot addresses must be aligned to this many bytes
pub const BOOT_ADDR_ALIGN: u32 = 1024;

/// Module control register of local power/sleep controller `lpsc`
pub const fn mdctl(lpsc: u32) -> usize {
    MDCTL_BASE + 4 * lpsc as usize
}

register_bitfields! [u32,
    /// CHIPSIG / CHIPSIG_CLR
    pub CHIPSIG [
        /// DSP to host: data ready
        CHIPINT0 OFFSET(0) NUMBITS(1) [],
        CHIPINT1 OFFSET(1) NUMBITS(1) [],
        /// Host to DSP: data ready, cleared by the DSP on acknowledge
        CHIPINT2 OFFSET(2) NUMBITS(1) [],
        CHIPINT3 OFFSET(3) NUMBITS(1) []
    ],

    /// PSC module control
    pub MDCTL [
        /// Next module state
        NEXT OFFSET(0) NUMBITS(2) [
            SwRstDisable = 0,
            SyncReset = 1,
            Disable = 2,
            Enable = 3
        ],
        /// Module local reset
        LRST OFFSET(3) NUMBITS(1) [
            Asserted = 0,
            Released = 1
        ]
    ]
];
