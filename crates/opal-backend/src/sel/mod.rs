//! Selection IR: machine-shaped instructions grouped into basic blocks.
//!
//! Instructions live in an index-stable arena per block; removal tombstones
//! the slot (`live = false`) in O(1) and [`SelBlock::compact`] reclaims dead
//! slots once a pass finishes. Indices are only meaningful within one pass.

use std::collections::HashSet;

use opal_isa::{ExecState, Label, Operand, VirtReg};

mod display;

/// Selection-level opcodes. A subset of the machine ISA: everything the
/// post-selection passes inspect, plus enough arithmetic to build kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelOpcode {
    Label,
    Mov,
    Sel,
    Not,
    And,
    Or,
    Xor,
    Shr,
    Shl,
    Asr,
    Cmp,
    Add,
    Mul,
    Mad,
    Math,
    Cbit,
    Fbh,
    Fbl,
    Brc,
    Brd,
    Bfrev,
    Lzd,
    Hadd,
    Rhadd,
    Bswap,
    UntypedRead,
    UntypedWrite,
    ByteGather,
    ByteScatter,
    If,
    Else,
    Endif,
    While,
    Jmpi,
}

impl SelOpcode {
    /// Vector-wide multi-register read from memory; operands reference the
    /// physical register layout directly.
    pub fn is_send_read(self) -> bool {
        matches!(self, SelOpcode::UntypedRead | SelOpcode::ByteGather)
    }

    /// Vector-wide multi-register write to memory.
    pub fn is_send_write(self) -> bool {
        matches!(self, SelOpcode::UntypedWrite | SelOpcode::ByteScatter)
    }

    pub fn name(self) -> &'static str {
        match self {
            SelOpcode::Label => "LABEL",
            SelOpcode::Mov => "MOV",
            SelOpcode::Sel => "SEL",
            SelOpcode::Not => "NOT",
            SelOpcode::And => "AND",
            SelOpcode::Or => "OR",
            SelOpcode::Xor => "XOR",
            SelOpcode::Shr => "SHR",
            SelOpcode::Shl => "SHL",
            SelOpcode::Asr => "ASR",
            SelOpcode::Cmp => "CMP",
            SelOpcode::Add => "ADD",
            SelOpcode::Mul => "MUL",
            SelOpcode::Mad => "MAD",
            SelOpcode::Math => "MATH",
            SelOpcode::Cbit => "CBIT",
            SelOpcode::Fbh => "FBH",
            SelOpcode::Fbl => "FBL",
            SelOpcode::Brc => "BRC",
            SelOpcode::Brd => "BRD",
            SelOpcode::Bfrev => "BFREV",
            SelOpcode::Lzd => "LZD",
            SelOpcode::Hadd => "HADD",
            SelOpcode::Rhadd => "RHADD",
            SelOpcode::Bswap => "BSWAP",
            SelOpcode::UntypedRead => "UNTYPED_READ",
            SelOpcode::UntypedWrite => "UNTYPED_WRITE",
            SelOpcode::ByteGather => "BYTE_GATHER",
            SelOpcode::ByteScatter => "BYTE_SCATTER",
            SelOpcode::If => "IF",
            SelOpcode::Else => "ELSE",
            SelOpcode::Endif => "ENDIF",
            SelOpcode::While => "WHILE",
            SelOpcode::Jmpi => "JMPI",
        }
    }
}

/// Extended math function carried by `MATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFn {
    Inv,
    Log,
    Exp,
    Sqrt,
    Rsq,
    Sin,
    Cos,
    Fdiv,
    Pow,
    IntDivQuot,
    IntDivRem,
    IntDivBoth,
}

impl MathFn {
    pub fn is_int_div(self) -> bool {
        matches!(
            self,
            MathFn::IntDivQuot | MathFn::IntDivRem | MathFn::IntDivBoth
        )
    }
}

/// Compare condition carried by `CMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondFn {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Opcode-specific payload: function codes, or branch targets kept for the
/// dump (displacements are resolved after encoding, not here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extra {
    #[default]
    None,
    Math(MathFn),
    Cond(CondFn),
    /// jip, or the block label for `LABEL`.
    Target(Label),
    /// jip + uip for the dual-target structured branches.
    Targets(Label, Label),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelInst {
    pub opcode: SelOpcode,
    pub dst: Vec<Operand>,
    pub src: Vec<Operand>,
    pub state: ExecState,
    pub extra: Extra,
    /// Dump numbering, assigned by [`Selection::assign_ids`].
    pub id: u32,
    /// Arena tombstone; dead slots are skipped by every pass and reclaimed
    /// by [`SelBlock::compact`].
    pub live: bool,
}

impl SelInst {
    pub fn new(opcode: SelOpcode, dst: Vec<Operand>, src: Vec<Operand>, state: ExecState) -> Self {
        SelInst {
            opcode,
            dst,
            src,
            state,
            extra: Extra::None,
            id: 0,
            live: true,
        }
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }
}

/// One control-flow basic block of a kernel, pre-encoding.
#[derive(Debug, Clone, Default)]
pub struct SelBlock {
    pub insts: Vec<SelInst>,
    /// Virtual registers whose value must survive past the block's end.
    /// Supplied by liveness analysis; read-only to the optimizer.
    pub live_out: HashSet<VirtReg>,
}

impl SelBlock {
    pub fn new(live_out: HashSet<VirtReg>) -> Self {
        SelBlock {
            insts: Vec::new(),
            live_out,
        }
    }

    pub fn push(&mut self, inst: SelInst) -> usize {
        self.insts.push(inst);
        self.insts.len() - 1
    }

    /// Live instructions in program order.
    pub fn iter_live(&self) -> impl Iterator<Item = &SelInst> {
        self.insts.iter().filter(|inst| inst.live)
    }

    pub fn live_len(&self) -> usize {
        self.iter_live().count()
    }

    /// Tombstones the instruction at `index`.
    pub fn unlink(&mut self, index: usize) {
        self.insts[index].live = false;
    }

    /// Drops tombstoned slots. Invalidates arena indices.
    pub fn compact(&mut self) {
        self.insts.retain(|inst| inst.live);
    }
}

/// The ordered selection blocks of one kernel.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub blocks: Vec<SelBlock>,
}

impl Selection {
    /// Renumbers instructions for the dump. IDs advance by two so a later
    /// pass can slot an instruction between two existing ones without a full
    /// renumber.
    pub fn assign_ids(&mut self) {
        let mut id = 0;
        for block in &mut self.blocks {
            for inst in block.insts.iter_mut().filter(|inst| inst.live) {
                inst.id = id;
                id += 2;
            }
        }
    }
}
