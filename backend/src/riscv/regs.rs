//! The RV32 register bank.
//!
//! All general-purpose registers are treated as caller-saved, which is
//! stricter than the RISC-V convention but keeps the call protocol
//! uniform: the caller preserves everything it still needs, and the
//! callee may clobber freely.

use derive_more::Display;

use mind_core::TempIdx;

/// A machine register, in register-file order.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    #[display("zero")]
    Zero,
    #[display("ra")]
    Ra,
    #[display("sp")]
    Sp,
    #[display("gp")]
    Gp,
    #[display("tp")]
    Tp,
    #[display("t0")]
    T0,
    #[display("t1")]
    T1,
    #[display("t2")]
    T2,
    #[display("t3")]
    T3,
    #[display("t4")]
    T4,
    #[display("t5")]
    T5,
    #[display("t6")]
    T6,
    #[display("fp")]
    Fp,
    #[display("s1")]
    S1,
    #[display("s2")]
    S2,
    #[display("s3")]
    S3,
    #[display("s4")]
    S4,
    #[display("s5")]
    S5,
    #[display("s6")]
    S6,
    #[display("s7")]
    S7,
    #[display("s8")]
    S8,
    #[display("s9")]
    S9,
    #[display("s10")]
    S10,
    #[display("s11")]
    S11,
    #[display("a0")]
    A0,
    #[display("a1")]
    A1,
    #[display("a2")]
    A2,
    #[display("a3")]
    A3,
    #[display("a4")]
    A4,
    #[display("a5")]
    A5,
    #[display("a6")]
    A6,
    #[display("a7")]
    A7,
}

pub const NUM_REGS: usize = 32;

use Reg::*;

impl Reg {
    pub const ALL: [Reg; NUM_REGS] = [
        Zero, Ra, Sp, Gp, Tp, T0, T1, T2, T3, T4, T5, T6, Fp, S1, S2, S3, S4, S5,
        S6, S7, S8, S9, S10, S11, A0, A1, A2, A3, A4, A5, A6, A7,
    ];

    /// Whether this register participates in allocation. `zero`, `ra`,
    /// `sp`, `gp`, `tp`, `fp` and the argument registers never do.
    pub const fn is_general(self) -> bool {
        matches!(
            self,
            T0 | T1
                | T2
                | T3
                | T4
                | T5
                | T6
                | S1
                | S2
                | S3
                | S4
                | S5
                | S6
                | S7
                | S8
                | S9
                | S10
                | S11
        )
    }
}

/// Bank index of the `zero` register.
pub const ZERO: usize = 0;

/// One register's allocator state.
#[derive(Debug, Clone)]
pub struct RegEntry {
    pub reg: Reg,
    /// Temp currently held, if any. At most one register holds a given
    /// temp at a time.
    pub var: Option<TempIdx>,
    /// True iff the held temp is newer than its backing frame slot.
    pub dirty: bool,
}

/// The register bank state used by the on-the-fly allocator.
#[derive(Debug)]
pub struct RegFile {
    entries: Vec<RegEntry>,
}

impl RegFile {
    pub fn new() -> Self {
        Self {
            entries: Reg::ALL
                .iter()
                .map(|&reg| RegEntry {
                    reg,
                    var: None,
                    dirty: false,
                })
                .collect(),
        }
    }

    /// Drop every binding. Done at the start of each basic block.
    pub fn reset(&mut self) {
        for e in &mut self.entries {
            e.var = None;
            e.dirty = false;
        }
    }

    pub fn entry(&self, i: usize) -> &RegEntry {
        &self.entries[i]
    }

    pub fn entry_mut(&mut self, i: usize) -> &mut RegEntry {
        &mut self.entries[i]
    }

    pub fn reg(&self, i: usize) -> Reg {
        self.entries[i].reg
    }

    /// Bank index of the general register holding `v`, if any.
    pub fn lookup(&self, v: TempIdx) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.reg.is_general() && e.var == Some(v))
    }

    /// Bank index of an unbound general register, if any.
    pub fn lookup_free(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.reg.is_general() && e.var.is_none())
    }
}

impl Default for RegFile {
    fn default() -> Self {
        Self::new()
    }
}
