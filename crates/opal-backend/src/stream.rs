//! The encoded kernel stream handed over by the encoder.
//!
//! A flat word buffer plus the bookkeeping the relaxer rewrites: the label
//! table, the two branch-fixup lists (single-target jumps and dual-target
//! structured branches), and the optional per-word debug map.

use std::collections::HashMap;

use opal_isa::{InstWord, Label};
use thiserror::Error;

/// jip + uip pair awaiting a dual-target fixup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelPair {
    pub jip: Label,
    pub uip: Label,
}

/// Source location attached to one stream word. Words inserted by the
/// relaxer carry the default location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcLoc {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Default)]
pub struct KernelStream {
    pub words: Vec<InstWord>,
    /// Symbolic label -> word position.
    pub labels: HashMap<Label, u32>,
    /// Single-target branch fixups: the instruction at the position gets the
    /// label's final relative offset patched in.
    pub jmp_fixups: Vec<(Label, u32)>,
    /// Dual-target (IF/BRC-style) branch fixups.
    pub if_fixups: Vec<(LabelPair, u32)>,
    /// Empty, or one entry per stream word.
    pub debug: Vec<SrcLoc>,
}

impl KernelStream {
    /// First label index above everything the stream references.
    pub fn next_label(&self) -> Label {
        let labels = self.labels.keys().map(|label| label.0);
        let jmps = self.jmp_fixups.iter().map(|(label, _)| label.0);
        let ifs = self
            .if_fixups
            .iter()
            .flat_map(|(pair, _)| [pair.jip.0, pair.uip.0]);
        Label(
            labels
                .chain(jmps)
                .chain(ifs)
                .max()
                .map_or(0, |max| max + 1),
        )
    }

    /// Encoder-boundary check: every recorded position must lie inside the
    /// word buffer, and the debug map must be absent or parallel to it.
    pub fn validate(&self) -> Result<(), StreamError> {
        let len = self.words.len() as u32;
        for (&label, &pos) in &self.labels {
            if pos >= len {
                return Err(StreamError::LabelOutOfBounds { label, pos, len });
            }
        }
        for &(label, pos) in &self.jmp_fixups {
            if pos >= len {
                return Err(StreamError::FixupOutOfBounds { label, pos, len });
            }
        }
        for &(pair, pos) in &self.if_fixups {
            if pos >= len {
                return Err(StreamError::FixupOutOfBounds {
                    label: pair.jip,
                    pos,
                    len,
                });
            }
        }
        if !self.debug.is_empty() && self.debug.len() != self.words.len() {
            return Err(StreamError::DebugLenMismatch {
                debug: self.debug.len() as u32,
                len,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("label {label} points at word {pos}, stream has {len} words")]
    LabelOutOfBounds { label: Label, pos: u32, len: u32 },
    #[error("branch fixup for {label} sits at word {pos}, stream has {len} words")]
    FixupOutOfBounds { label: Label, pos: u32, len: u32 },
    #[error("debug map has {debug} entries for a {len}-word stream")]
    DebugLenMismatch { debug: u32, len: u32 },
}
