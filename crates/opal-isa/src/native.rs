//! Encoded instruction words, native opcodes and stream labels.
//!
//! The encoder produces a flat sequence of 64-bit words; a full-size
//! instruction occupies two words, a compacted one a single word. Only the
//! header fields the relaxer reads (opcode, compaction control) are modeled
//! here; operand fields of inserted jumps are patched downstream by fixup
//! resolution.

use std::fmt;

/// Symbolic stream position, resolved to a relative offset after layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Native opcode numbering, as encoded in header bits 6:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Mov = 0x01,
    Jmpi = 0x20,
    Brd = 0x21,
    If = 0x22,
    Brc = 0x23,
    Else = 0x24,
    Endif = 0x25,
    Do = 0x26,
    While = 0x27,
    Break = 0x28,
    Continue = 0x29,
    Halt = 0x2a,
    Call = 0x2c,
    Ret = 0x2d,
    Send = 0x31,
    Math = 0x38,
    Add = 0x40,
    Mul = 0x41,
    Nop = 0x7e,
}

impl Opcode {
    pub fn from_bits(bits: u8) -> Option<Opcode> {
        Some(match bits {
            0x01 => Opcode::Mov,
            0x20 => Opcode::Jmpi,
            0x21 => Opcode::Brd,
            0x22 => Opcode::If,
            0x23 => Opcode::Brc,
            0x24 => Opcode::Else,
            0x25 => Opcode::Endif,
            0x26 => Opcode::Do,
            0x27 => Opcode::While,
            0x28 => Opcode::Break,
            0x29 => Opcode::Continue,
            0x2a => Opcode::Halt,
            0x2c => Opcode::Call,
            0x2d => Opcode::Ret,
            0x31 => Opcode::Send,
            0x38 => Opcode::Math,
            0x40 => Opcode::Add,
            0x41 => Opcode::Mul,
            0x7e => Opcode::Nop,
            _ => return None,
        })
    }

    /// Span boundaries for branch relaxation: every instruction that can
    /// redirect control flow ends the current branch-free span. `Jmpi` is
    /// included even though its displacement field is wide; treating it as a
    /// boundary is strictly conservative.
    pub fn is_flow_control(self) -> bool {
        matches!(
            self,
            Opcode::Jmpi
                | Opcode::Brd
                | Opcode::If
                | Opcode::Brc
                | Opcode::Else
                | Opcode::Endif
                | Opcode::Do
                | Opcode::While
                | Opcode::Break
                | Opcode::Continue
                | Opcode::Halt
                | Opcode::Call
                | Opcode::Ret
        )
    }
}

/// One 64-bit word of the encoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstWord(pub u64);

const OPCODE_MASK: u64 = 0x7f;
const COMPACT_BIT: u64 = 1 << 29;

impl InstWord {
    /// Header word for `opcode`, compacted or full-size.
    pub fn header(opcode: Opcode, compact: bool) -> InstWord {
        let mut word = opcode as u64 & OPCODE_MASK;
        if compact {
            word |= COMPACT_BIT;
        }
        InstWord(word)
    }

    pub fn opcode_bits(self) -> u8 {
        (self.0 & OPCODE_MASK) as u8
    }

    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_bits(self.opcode_bits())
    }

    pub fn is_compact(self) -> bool {
        self.0 & COMPACT_BIT != 0
    }

    /// Stream words this instruction occupies.
    pub fn word_count(self) -> u32 {
        if self.is_compact() {
            1
        } else {
            2
        }
    }
}

/// Full-size unconditional jump, SIMD1 noMask; the displacement operand is
/// patched once the target label's position is final.
pub fn jmpi() -> [InstWord; 2] {
    [InstWord::header(Opcode::Jmpi, false), InstWord(0)]
}

/// Full-size no-op pair used as alignment padding on pre-compaction
/// generations.
pub fn nop() -> [InstWord; 2] {
    [InstWord::header(Opcode::Nop, false), InstWord(0)]
}
