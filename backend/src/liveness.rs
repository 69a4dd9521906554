//! Live-variable analysis.
//!
//! Classic backward dataflow over the CFG:
//!
//! ```text
//! LiveIn[b]  = LiveUse[b] ∪ (LiveOut[b] \ LiveDef[b])
//! LiveOut[b] = ⋃ LiveIn[s]   for every successor s
//! ```
//!
//! iterated to a fixed point, followed by one backward sweep per block
//! attaching a `live_out` set to every instruction. The terminator's
//! tested or returned temp counts as a use at the end of its block.

use log::debug;

use mind_core::TempSet;

use crate::flow::{BasicBlock, FlowGraph};

/// Compute per-block `live_use`/`live_def`, then solve for
/// `live_in`/`live_out`.
pub fn analyze(g: &mut FlowGraph) {
    for b in &mut g.blocks {
        compute_use_def(b);
    }

    let n = g.blocks.len();
    let mut changed = true;
    let mut rounds = 0;
    while changed {
        changed = false;
        rounds += 1;
        // backward visit order converges fastest on reducible graphs
        for id in (0..n).rev() {
            let mut out = TempSet::new();
            for s in g.blocks[id].next.iter().flatten() {
                out.extend(g.blocks[*s].live_in.iter().copied());
            }
            let b = &mut g.blocks[id];
            let mut inn = b.live_use.clone();
            for t in out.iter() {
                if !b.live_def.contains(t) {
                    inn.insert(*t);
                }
            }
            if out != b.live_out || inn != b.live_in {
                b.live_out = out;
                b.live_in = inn;
                changed = true;
            }
        }
    }
    debug!("liveness converged after {rounds} round(s) over {n} block(s)");
}

fn compute_use_def(b: &mut BasicBlock) {
    let mut live_use = TempSet::new();
    let mut live_def = TempSet::new();
    for t in &b.tac {
        for u in t.uses() {
            if !live_def.contains(&u) {
                live_use.insert(u);
            }
        }
        for d in t.defs() {
            live_def.insert(d);
        }
    }
    // the terminator reads `var` at the very end of the block
    if let Some(v) = b.var {
        if !live_def.contains(&v) {
            live_use.insert(v);
        }
    }
    b.live_use = live_use;
    b.live_def = live_def;
}

/// Attach a per-instruction `live_out` to every TAC of `b`, walking
/// backward from the block-level solution.
pub fn attach_instr_liveness(b: &mut BasicBlock) {
    let mut live = b.live_out.clone();
    if let Some(v) = b.var {
        live.insert(v);
    }
    for t in b.tac.iter_mut().rev() {
        t.live_out = live.clone();
        for d in t.defs() {
            live.remove(&d);
        }
        for u in t.uses() {
            live.insert(u);
        }
    }
}
