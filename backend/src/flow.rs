//! Control-flow graph construction.
//!
//! A function's linear TAC stream is cut into basic blocks: every label
//! starts a block, every jump/branch/return ends one, and a block that
//! would fall into a label gets a synthetic jump so that every block
//! ends with an explicit terminator. Successors are resolved by label;
//! an unresolved target is a malformed stream and panics.

use std::collections::HashMap;
use std::io::{self, Write};

use mind_core::dump::format_tac;
use mind_core::{LabelIdx, LabelTable, Tac, TacFunc, TacKind, TempIdx, TempSet};

/// How a block ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndKind {
    ByJump,
    ByJZero,
    ByReturn,
}

/// A basic block. `tac` excludes the terminator, which is summarized by
/// `end` and `var` (the tested temp for `ByJZero`, the returned temp
/// for `ByReturn`).
#[derive(Debug)]
pub struct BasicBlock {
    pub id: usize,
    /// Assembly entry label, assigned by the code generator.
    pub entry_label: String,
    pub tac: Vec<Tac>,
    pub end: EndKind,
    pub var: Option<TempIdx>,
    /// Successor block ids. `ByJump` uses slot 0; `ByJZero` uses slot 0
    /// for the taken-when-zero target and slot 1 for the fall-through;
    /// `ByReturn` uses neither.
    pub next: [Option<usize>; 2],
    pub live_use: TempSet,
    pub live_def: TempSet,
    pub live_in: TempSet,
    pub live_out: TempSet,
}

impl BasicBlock {
    fn new(id: usize) -> Self {
        Self {
            id,
            entry_label: String::new(),
            tac: Vec::new(),
            end: EndKind::ByReturn,
            var: None,
            next: [None, None],
            live_use: TempSet::new(),
            live_def: TempSet::new(),
            live_in: TempSet::new(),
            live_out: TempSet::new(),
        }
    }
}

enum Terminator {
    Jump(LabelIdx),
    JZero(TempIdx, LabelIdx),
    Return(TempIdx),
}

struct ProtoBlock {
    label: Option<LabelIdx>,
    tac: Vec<Tac>,
    term: Terminator,
}

/// The control-flow graph of one function. Block 0 is the entry.
#[derive(Debug)]
pub struct FlowGraph {
    pub blocks: Vec<BasicBlock>,
}

impl FlowGraph {
    /// Partition a function's TAC stream into basic blocks and resolve
    /// successors.
    pub fn build(func: &TacFunc) -> FlowGraph {
        let mut protos: Vec<ProtoBlock> = Vec::new();
        let mut cur_label: Option<LabelIdx> = None;
        let mut cur_tac: Vec<Tac> = Vec::new();
        // false while skipping unreachable code after jump/return
        let mut open = true;

        for t in &func.body {
            match t.kind {
                TacKind::Mark { label } => {
                    if open && (cur_label.is_some() || !cur_tac.is_empty()) {
                        // falling into the label: synthesize a jump
                        protos.push(ProtoBlock {
                            label: cur_label,
                            tac: std::mem::take(&mut cur_tac),
                            term: Terminator::Jump(label),
                        });
                    }
                    cur_label = Some(label);
                    cur_tac = Vec::new();
                    open = true;
                }
                TacKind::Jump { target } => {
                    if open {
                        protos.push(ProtoBlock {
                            label: cur_label.take(),
                            tac: std::mem::take(&mut cur_tac),
                            term: Terminator::Jump(target),
                        });
                        open = false;
                    }
                }
                TacKind::JZero { cond, target } => {
                    if open {
                        protos.push(ProtoBlock {
                            label: cur_label.take(),
                            tac: std::mem::take(&mut cur_tac),
                            term: Terminator::JZero(cond, target),
                        });
                        // execution falls through into a new block
                    }
                }
                TacKind::Return { value } => {
                    if open {
                        protos.push(ProtoBlock {
                            label: cur_label.take(),
                            tac: std::mem::take(&mut cur_tac),
                            term: Terminator::Return(value),
                        });
                        open = false;
                    }
                }
                _ => {
                    if open {
                        cur_tac.push(t.clone());
                    }
                }
            }
        }
        assert!(
            !open || (cur_label.is_none() && cur_tac.is_empty()),
            "function body does not end with a terminator"
        );

        // resolve labels to block ids
        let mut label_block: HashMap<LabelIdx, usize> = HashMap::new();
        for (id, p) in protos.iter().enumerate() {
            if let Some(l) = p.label {
                label_block.insert(l, id);
            }
        }
        let resolve = |l: LabelIdx| -> usize {
            *label_block
                .get(&l)
                .unwrap_or_else(|| panic!("jump to a label outside the function"))
        };

        let num = protos.len();
        let blocks = protos
            .into_iter()
            .enumerate()
            .map(|(id, p)| {
                let mut b = BasicBlock::new(id);
                b.tac = p.tac;
                match p.term {
                    Terminator::Jump(l) => {
                        b.end = EndKind::ByJump;
                        b.next[0] = Some(resolve(l));
                    }
                    Terminator::JZero(v, l) => {
                        b.end = EndKind::ByJZero;
                        b.var = Some(v);
                        b.next[0] = Some(resolve(l));
                        assert!(id + 1 < num, "branch falls off the function");
                        b.next[1] = Some(id + 1);
                    }
                    Terminator::Return(v) => {
                        b.end = EndKind::ByReturn;
                        b.var = Some(v);
                    }
                }
                b
            })
            .collect();
        FlowGraph { blocks }
    }

    pub fn block(&self, id: usize) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Drop blocks unreachable from the entry and renumber.
    pub fn simplify(&mut self) {
        let n = self.blocks.len();
        let mut reachable = vec![false; n];
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            if reachable[id] {
                continue;
            }
            reachable[id] = true;
            for s in self.blocks[id].next.iter().flatten() {
                stack.push(*s);
            }
        }

        let mut new_id = vec![usize::MAX; n];
        let mut next_id = 0;
        for i in 0..n {
            if reachable[i] {
                new_id[i] = next_id;
                next_id += 1;
            }
        }

        let old = std::mem::take(&mut self.blocks);
        self.blocks = old
            .into_iter()
            .enumerate()
            .filter(|(i, _)| reachable[*i])
            .map(|(i, mut b)| {
                b.id = new_id[i];
                for s in b.next.iter_mut() {
                    *s = s.map(|t| new_id[t]);
                }
                b
            })
            .collect();
    }

    /// Human-readable dump of the graph with its liveness sets.
    pub fn dump(&self, labels: &LabelTable, w: &mut impl Write) -> io::Result<()> {
        fn set(s: &TempSet) -> String {
            let items: Vec<String> = s.iter().map(|t| t.to_string()).collect();
            format!("{{{}}}", items.join(", "))
        }
        for b in &self.blocks {
            writeln!(w, "block {}:", b.id)?;
            for t in &b.tac {
                writeln!(w, "    {}", format_tac(labels, t))?;
            }
            match b.end {
                EndKind::ByJump => {
                    writeln!(w, "  ends: jump -> block {}", b.next[0].unwrap())?
                }
                EndKind::ByJZero => writeln!(
                    w,
                    "  ends: if ({} == 0) -> block {}, else -> block {}",
                    b.var.unwrap(),
                    b.next[0].unwrap(),
                    b.next[1].unwrap()
                )?,
                EndKind::ByReturn => {
                    writeln!(w, "  ends: return {}", b.var.unwrap())?
                }
            }
            writeln!(
                w,
                "  live_use: {}  live_def: {}",
                set(&b.live_use),
                set(&b.live_def)
            )?;
            writeln!(
                w,
                "  live_in:  {}  live_out: {}",
                set(&b.live_in),
                set(&b.live_out)
            )?;
        }
        Ok(())
    }
}
