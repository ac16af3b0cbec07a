//! Per-instruction execution state.

/// Predicate control: which per-lane condition gates an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PredCtrl {
    #[default]
    None,
    /// Per-lane predication from the referenced flag.
    Normal,
    /// Any lane of the group set.
    AnyH,
    /// All lanes of the group set.
    AllH,
}

/// Flag register reference: register number plus sub-flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagRef {
    pub nr: u8,
    pub sub: u8,
}

/// Execution-state metadata attached to every selection instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecState {
    /// SIMD execution width, 1..=32.
    pub exec_width: u32,
    /// Which quad of lanes an over-wide op addresses on narrower hardware.
    pub quarter_ctrl: u8,
    pub predicate: PredCtrl,
    pub invert_predicate: bool,
    /// Execution-mask bypass: the instruction runs on every lane.
    pub no_mask: bool,
    pub saturate: bool,
    pub acc_write: bool,
    pub flag: FlagRef,
}

impl ExecState {
    pub fn new(exec_width: u32) -> Self {
        debug_assert!((1..=32).contains(&exec_width));
        ExecState {
            exec_width,
            quarter_ctrl: 0,
            predicate: PredCtrl::None,
            invert_predicate: false,
            no_mask: false,
            saturate: false,
            acc_write: false,
            flag: FlagRef::default(),
        }
    }

    pub fn with_predicate(mut self, flag: FlagRef, invert: bool) -> Self {
        self.predicate = PredCtrl::Normal;
        self.flag = flag;
        self.invert_predicate = invert;
        self
    }

    pub fn with_no_mask(mut self) -> Self {
        self.no_mask = true;
        self
    }
}
