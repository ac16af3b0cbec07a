//! Region descriptors and the element-footprint calculation.
//!
//! The footprint is the single primitive both passes use to prove that two
//! operands referencing the same register really touch the same element
//! slots: identical base addressing with different strides or widths can
//! occupy disjoint, overlapping or equal element sets, and only full set
//! equality is a safe "definitely same value" proof.

use crate::reg::{Operand, RegFile, REG_BYTES};

/// SIMD access pattern of an operand, in element-count units: `height =
/// exec_width / width` rows of `width` elements spaced `hstride` apart, with
/// consecutive rows `vstride` elements apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub vstride: u32,
    pub width: u32,
    pub hstride: u32,
}

impl Region {
    pub fn new(vstride: u32, width: u32, hstride: u32) -> Self {
        Region {
            vstride,
            width,
            hstride,
        }
    }

    /// The `<0,1,0>` broadcast region: one element replicated to every lane.
    pub fn scalar() -> Self {
        Region::new(0, 1, 0)
    }

    /// The `<w,w,1>` packed region.
    pub fn contiguous(width: u32) -> Self {
        Region::new(width, width, 1)
    }

    /// The footprint calculation assumes rows tile the register uniformly;
    /// regions violating this are never subject to the analysis.
    pub fn is_normalized(self) -> bool {
        self.vstride == self.width * self.hstride
    }

    pub fn is_scalar_broadcast(self) -> bool {
        self.hstride == 0 && self.width == 1
    }
}

/// Set of touched type-sized element slots.
///
/// Indices are folded modulo [`ElementSet::BITS`]: under the normalized-region
/// precondition an access that spans several registers repeats the first
/// register's pattern, so the fold preserves set equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementSet(u64);

impl ElementSet {
    pub const BITS: u32 = 64;
    pub const EMPTY: ElementSet = ElementSet(0);

    pub fn insert(&mut self, index: u32) {
        self.0 |= 1u64 << (index % Self::BITS);
    }

    pub fn contains(self, index: u32) -> bool {
        self.0 & (1u64 << (index % Self::BITS)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

/// Computes which element slots `op` touches when executed `exec_width` wide.
///
/// Each of the `exec_width / width` rows marks `width` elements spaced
/// `hstride * elem_size` bytes apart, starting at `nr * REG_BYTES + subnr`
/// and advancing `vstride * elem_size` bytes per row; touched byte offsets
/// are converted to element indices by dividing by the element size.
///
/// An execution width narrower than the region width yields the empty set;
/// callers must never admit empty footprints as equality evidence.
///
/// # Panics
///
/// Panics when `op` is an immediate, has a zero-width region, or violates
/// the `vstride == width * hstride` precondition. Such operands are
/// contract violations here; passes pre-filter them and treat them as
/// never-propagatable.
pub fn footprint(op: &Operand, exec_width: u32) -> ElementSet {
    assert!(
        op.file != RegFile::Immediate,
        "footprint of an immediate operand"
    );
    let region = op.region;
    assert!(region.width > 0, "zero-width region");
    assert!(
        region.is_normalized(),
        "non-normalized region <{},{},{}>",
        region.vstride,
        region.width,
        region.hstride
    );

    let elem_size = op.ty.byte_size();
    let height = exec_width / region.width;
    let mut set = ElementSet::EMPTY;
    let mut row_base = op.nr * REG_BYTES + op.subnr;
    for _ in 0..height {
        let mut offset = row_base;
        for _ in 0..region.width {
            set.insert(offset / elem_size);
            offset += region.hstride * elem_size;
        }
        row_base += region.vstride * elem_size;
    }
    set
}
