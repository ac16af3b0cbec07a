//! Hardware-generation capability description.
//!
//! Generation quirks are carried as explicit configuration and threaded
//! through the passes; nothing in the back end consults global state.

use bitflags::bitflags;

pub const GEN7: u32 = 70;
pub const GEN7_5: u32 = 75;
pub const GEN8: u32 = 80;
pub const GEN9: u32 = 90;

bitflags! {
    /// Per-generation restrictions consulted by the copy-propagation pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceQuirks: u32 {
        /// Bitwise logical opcodes cannot take source modifiers.
        const NO_LOGIC_SRC_MODIFIER = 1 << 0;
        /// A 64-bit-destination MOV cannot widen from a narrower source
        /// whose footprint differs.
        const STRICT_QWORD_MOV_REGION = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    /// Hardware generation number (`GEN7` = 70, ...).
    pub gen: u32,
    pub quirks: DeviceQuirks,
    /// Extra span slack reserved for IF/ENDIF offset fixups, in stream
    /// words. Supplied by the encoder for the concrete part; never guessed.
    pub if_endif_slack: u16,
}

impl Device {
    pub fn new(gen: u32) -> Self {
        Device {
            gen,
            quirks: DeviceQuirks::empty(),
            if_endif_slack: 0,
        }
    }

    pub fn with_quirks(mut self, quirks: DeviceQuirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_if_endif_slack(mut self, slack: u16) -> Self {
        self.if_endif_slack = slack;
        self
    }

    /// Pre-compaction generations cannot assume an inserted jump compacts;
    /// a no-op pair is reserved after it to keep fixed-size alignment.
    pub fn branch_needs_nop_pad(&self) -> bool {
        self.gen < GEN7_5
    }

    /// Minimum branch-free span length, in stream words, below which a span
    /// is never worth relocating.
    pub fn min_span_words(&self) -> u32 {
        (self.if_endif_slack as u32).max(8)
    }
}
