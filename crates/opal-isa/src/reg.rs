//! Register files, element types and region-typed operands.

use std::fmt;

use crate::region::Region;

/// Bytes in one architectural register row.
pub const REG_BYTES: u32 = 32;

/// Architecture-file register numbers (the subset the back end addresses).
pub const ARF_NULL: u32 = 0x00;
pub const ARF_ACCUMULATOR: u32 = 0x20;
pub const ARF_FLAG: u32 = 0x30;

/// Virtual register identity, stable across the whole selection unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtReg(pub u32);

impl fmt::Display for VirtReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegFile {
    GeneralPurpose,
    Immediate,
    Architecture,
}

/// Element type of an operand access. `Packed` is the 32-bit packed-vector
/// immediate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F16,
    F32,
    F64,
    Packed,
}

impl ElemType {
    pub fn byte_size(self) -> u32 {
        match self {
            ElemType::U8 | ElemType::S8 => 1,
            ElemType::U16 | ElemType::S16 | ElemType::F16 => 2,
            ElemType::U32 | ElemType::S32 | ElemType::F32 | ElemType::Packed => 4,
            ElemType::U64 | ElemType::S64 | ElemType::F64 => 8,
        }
    }

    pub fn is_int64(self) -> bool {
        matches!(self, ElemType::U64 | ElemType::S64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, ElemType::S8 | ElemType::S16 | ElemType::S32 | ElemType::S64)
    }

    /// Short type tag used by the selection dump (`:UD`, `:D`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            ElemType::U8 => "UB",
            ElemType::S8 => "B",
            ElemType::U16 => "UW",
            ElemType::S16 => "W",
            ElemType::U32 => "UD",
            ElemType::S32 => "D",
            ElemType::U64 => "UL",
            ElemType::S64 => "L",
            ElemType::F16 => "HF",
            ElemType::F32 => "F",
            ElemType::F64 => "DF",
            ElemType::Packed => "V",
        }
    }
}

/// Immediate payload. Meaningful only when the operand file is
/// [`RegFile::Immediate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imm {
    None,
    Int(i64),
    Uint(u64),
    Float(f32),
    Double(f64),
}

/// One machine-shaped operand: register addressing plus the SIMD region
/// describing how its storage is traversed across lanes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operand {
    pub file: RegFile,
    pub ty: ElemType,
    pub reg: VirtReg,
    /// Register row index; byte address of row 0 is `nr * REG_BYTES + subnr`.
    pub nr: u32,
    /// Sub-register byte offset.
    pub subnr: u32,
    pub region: Region,
    /// Which quad of lanes an over-wide access addresses.
    pub quarter: u8,
    pub negate: bool,
    pub abs: bool,
    pub imm: Imm,
}

impl Operand {
    pub fn vreg(reg: VirtReg, ty: ElemType, region: Region) -> Self {
        Operand {
            file: RegFile::GeneralPurpose,
            ty,
            reg,
            nr: 0,
            subnr: 0,
            region,
            quarter: 0,
            negate: false,
            abs: false,
            imm: Imm::None,
        }
    }

    pub fn null() -> Self {
        Operand {
            file: RegFile::Architecture,
            nr: ARF_NULL,
            ..Operand::vreg(VirtReg(0), ElemType::U32, Region::scalar())
        }
    }

    pub fn imm_ud(value: u32) -> Self {
        Operand {
            file: RegFile::Immediate,
            imm: Imm::Uint(value as u64),
            ..Operand::vreg(VirtReg(0), ElemType::U32, Region::scalar())
        }
    }

    pub fn imm_d(value: i32) -> Self {
        Operand {
            file: RegFile::Immediate,
            ty: ElemType::S32,
            imm: Imm::Int(value as i64),
            ..Operand::vreg(VirtReg(0), ElemType::S32, Region::scalar())
        }
    }

    pub fn imm_f(value: f32) -> Self {
        Operand {
            file: RegFile::Immediate,
            ty: ElemType::F32,
            imm: Imm::Float(value),
            ..Operand::vreg(VirtReg(0), ElemType::F32, Region::scalar())
        }
    }

    pub fn with_offset(mut self, nr: u32, subnr: u32) -> Self {
        self.nr = nr;
        self.subnr = subnr;
        self
    }

    pub fn with_negate(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn with_abs(mut self) -> Self {
        self.abs = true;
        self
    }

    pub fn with_quarter(mut self, quarter: u8) -> Self {
        self.quarter = quarter;
        self
    }

    pub fn is_int64(&self) -> bool {
        self.ty.is_int64()
    }

    /// Dump form of this operand. Destinations print only the horizontal
    /// stride; sources print the full `<v,w,h>` region.
    pub fn display(&self, dst: bool) -> DisplayOperand<'_> {
        DisplayOperand { op: self, dst }
    }
}

pub struct DisplayOperand<'a> {
    op: &'a Operand,
    dst: bool,
}

impl fmt::Display for DisplayOperand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op;
        let mut s = String::new();
        match op.file {
            RegFile::Immediate => {
                match op.imm {
                    Imm::None => s.push('0'),
                    Imm::Int(v) => s.push_str(&v.to_string()),
                    Imm::Uint(v) => s.push_str(&format!("0x{v:x}")),
                    Imm::Float(v) => s.push_str(&v.to_string()),
                    Imm::Double(v) => s.push_str(&v.to_string()),
                }
                s.push(':');
                s.push_str(op.ty.short_name());
            }
            RegFile::GeneralPurpose => {
                if op.negate {
                    s.push('-');
                }
                if op.abs {
                    s.push_str("(abs)");
                }
                s.push_str(&op.reg.to_string());
                let byte = op.nr * REG_BYTES + op.subnr;
                if byte != 0 {
                    s.push_str(&format!(".{byte}"));
                }
                if self.dst {
                    s.push_str(&format!("<{}>", op.region.hstride));
                } else {
                    s.push_str(&format!(
                        "<{},{},{}>",
                        op.region.vstride, op.region.width, op.region.hstride
                    ));
                }
                s.push(':');
                s.push_str(op.ty.short_name());
            }
            RegFile::Architecture => {
                if op.nr == ARF_NULL {
                    s.push_str("null");
                } else if (op.nr & ARF_ACCUMULATOR) == ARF_ACCUMULATOR {
                    s.push_str(&format!("acc.{}", op.nr & 0xf));
                } else {
                    s.push_str(&format!("arf.{}", op.nr));
                }
            }
        }
        f.pad(&s)
    }
}
