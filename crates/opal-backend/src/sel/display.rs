//! Plain-text dump of the selection IR.
//!
//! One row per instruction: id, predicate, opcode (with function-code and
//! execution-width suffixes), destinations, `=`, sources, and branch targets
//! where the opcode carries them. Column widths match the dumps the rest of
//! the toolchain greps.

use std::fmt;

use opal_isa::PredCtrl;

use super::{CondFn, Extra, MathFn, SelBlock, SelInst, SelOpcode, Selection};

impl CondFn {
    fn suffix(self) -> &'static str {
        match self {
            CondFn::Eq => ".eq",
            CondFn::Ne => ".ne",
            CondFn::Lt => ".lt",
            CondFn::Le => ".le",
            CondFn::Gt => ".gt",
            CondFn::Ge => ".ge",
        }
    }
}

impl MathFn {
    fn suffix(self) -> &'static str {
        match self {
            MathFn::Inv => ".inv",
            MathFn::Log => ".log",
            MathFn::Exp => ".exp",
            MathFn::Sqrt => ".sqrt",
            MathFn::Rsq => ".rsq",
            MathFn::Sin => ".sin",
            MathFn::Cos => ".cos",
            MathFn::Fdiv => ".fdiv",
            MathFn::Pow => ".pow",
            MathFn::IntDivQuot => ".idiv",
            MathFn::IntDivRem => ".mod",
            MathFn::IntDivBoth => ".divmod",
        }
    }
}

impl fmt::Display for SelInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]\t", self.id)?;

        if self.opcode == SelOpcode::Label {
            return match self.extra {
                Extra::Target(label) => write!(f, "{label}:"),
                _ => write!(f, "L?:"),
            };
        }

        if self.state.predicate != PredCtrl::None {
            write!(f, "({}.{})", self.state.flag.nr, self.state.flag.sub)?;
        }
        write!(f, "\t")?;

        let mut name = String::from(self.opcode.name());
        match (self.opcode, self.extra) {
            (SelOpcode::Cmp, Extra::Cond(cond)) => name.push_str(cond.suffix()),
            (SelOpcode::Math, Extra::Math(func)) => name.push_str(func.suffix()),
            _ => {}
        }
        name.push_str(&format!("({})", self.state.exec_width));
        if self.opcode == SelOpcode::Cmp {
            name.push_str(&format!("[{}.{}]", self.state.flag.nr, self.state.flag.sub));
        }
        write!(f, "{name:<24}")?;

        for dst in &self.dst {
            write!(f, "{:>15} ", dst.display(true).to_string())?;
        }
        if self.dst.is_empty() {
            write!(f, "{:>15} ", "")?;
        }
        write!(f, "= ")?;
        for src in &self.src {
            write!(f, "{:>23} ", src.display(false).to_string())?;
        }

        match (self.opcode, self.extra) {
            (SelOpcode::If | SelOpcode::Brc, Extra::Targets(jip, uip)) => {
                write!(f, "; jip={jip} uip={uip}")?;
            }
            (
                SelOpcode::Else
                | SelOpcode::Endif
                | SelOpcode::Brd
                | SelOpcode::While
                | SelOpcode::Jmpi,
                Extra::Target(jip),
            ) => {
                write!(f, "; jip={jip}")?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for SelBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in self.iter_live() {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
