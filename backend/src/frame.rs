//! The per-function stack frame.
//!
//! Slot layout below the frame pointer:
//!
//! ```text
//!   fp - 4    saved ra
//!   fp - 8    saved caller fp
//!   fp - 12   first user slot          <- cursor starts here
//!   fp - 16   second user slot, ...
//! ```
//!
//! Parameters sit at non-negative offsets (`fp + 4*i`) and are fixed by
//! the translator; this manager only hands out the negative slots.

use mind_core::{TempIdx, TempPool, TempSet, WORD_SIZE};

/// First user slot, below the two reserved words.
const FIRST_SLOT: i32 = -3 * WORD_SIZE;

#[derive(Debug)]
pub struct StackFrame {
    cursor: i32,
}

impl StackFrame {
    pub fn new() -> Self {
        Self { cursor: FIRST_SLOT }
    }

    /// Give `t` a fixed slot if it does not have one yet.
    pub fn reserve(&mut self, pool: &mut TempPool, t: TempIdx) {
        if !pool.temp(t).is_offset_fixed {
            pool.fix_offset(t, self.cursor);
            self.cursor -= WORD_SIZE;
        }
    }

    /// Slot for spilling `t`. The always-allocate variant: slots of
    /// dead temps are not reused.
    pub fn slot_to_write(&mut self, pool: &mut TempPool, t: TempIdx, _live: &TempSet) {
        self.reserve(pool, t);
    }

    /// User bytes allocated so far, excluding the two reserved words.
    pub fn stack_frame_size(&self) -> i32 {
        FIRST_SLOT - self.cursor
    }
}

impl Default for StackFrame {
    fn default() -> Self {
        Self::new()
    }
}
