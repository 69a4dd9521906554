use mind_backend::flow::FlowGraph;
use mind_backend::liveness;
use mind_core::{Piece, TacBuilder, TacProgram, TempIdx, TempSet};

fn build(f: impl FnOnce(&mut TacBuilder)) -> TacProgram {
    let mut b = TacBuilder::new();
    f(&mut b);
    b.finish()
}

fn analyzed(prog: &TacProgram) -> FlowGraph {
    let Piece::Function(f) = &prog.pieces[0] else {
        panic!("expected a function piece");
    };
    let mut g = FlowGraph::build(f);
    g.simplify();
    liveness::analyze(&mut g);
    g
}

fn set(temps: &[TempIdx]) -> TempSet {
    temps.iter().copied().collect()
}

#[test]
fn branch_liveness_flows_backward() {
    // b0: t0 = 1; t1 = 2; if (t0 == 0) goto b2
    // b1: t2 = t1 + t1; return t2
    // b2: t3 = 5; return t3
    let mut t = (TempIdx(0), TempIdx(0), TempIdx(0), TempIdx(0));
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let (t0, t1, t2, t3) =
            (b.new_temp(), b.new_temp(), b.new_temp(), b.new_temp());
        t = (t0, t1, t2, t3);
        let l = b.new_label();
        b.gen_load_imm4(t0, 1);
        b.gen_load_imm4(t1, 2);
        b.gen_jzero(t0, l);
        b.gen_add(t2, t1, t1);
        b.gen_return(t2);
        b.gen_mark(l);
        b.gen_load_imm4(t3, 5);
        b.gen_return(t3);
        b.end_func();
    });
    let (t0, t1, t2, t3) = t;
    let g = analyzed(&prog);
    assert_eq!(g.len(), 3);

    let b0 = g.block(0);
    assert_eq!(b0.live_def, set(&[t0, t1]));
    assert_eq!(b0.live_use, set(&[]), "the tested temp is defined locally");
    assert_eq!(b0.live_in, set(&[]));
    // only t1 is needed by a successor
    assert_eq!(b0.live_out, set(&[t1]));

    let b1 = g.block(1);
    assert_eq!(b1.live_use, set(&[t1]));
    assert_eq!(b1.live_def, set(&[t2]));
    assert_eq!(b1.live_in, set(&[t1]));
    assert_eq!(b1.live_out, set(&[]));

    let b2 = g.block(2);
    assert_eq!(b2.live_use, set(&[]));
    assert_eq!(b2.live_def, set(&[t3]));
    assert_eq!(b2.live_out, set(&[]));
}

#[test]
fn loop_liveness_reaches_a_fixed_point() {
    // b0: if (t0 == 0) goto b2   (t0 is a parameter)
    // b1: jump b0
    // b2: return t0
    let mut param = TempIdx(0);
    let prog = build(|b| {
        let e = b.entry_label("f");
        let p = b.new_temp();
        param = p;
        b.start_func(e, &[p]);
        let l_head = b.new_label();
        let l_exit = b.new_label();
        b.gen_mark(l_head);
        b.gen_jzero(p, l_exit);
        b.gen_jump(l_head);
        b.gen_mark(l_exit);
        b.gen_return(p);
        b.end_func();
    });
    let g = analyzed(&prog);
    // the parameter stays live around the cycle; the entry block
    // defines it, so it appears in the entry's live-out instead
    assert!(g.block(0).live_out.contains(&param));
    for b in g.blocks.iter().skip(1) {
        assert!(
            b.live_in.contains(&param),
            "block {} must keep the parameter live",
            b.id
        );
    }
}

#[test]
fn per_instruction_live_out_is_attached_backward() {
    let mut t = (TempIdx(0), TempIdx(0), TempIdx(0));
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let (t0, t1, t2) = (b.new_temp(), b.new_temp(), b.new_temp());
        t = (t0, t1, t2);
        b.gen_load_imm4(t0, 1);
        b.gen_load_imm4(t1, 2);
        b.gen_add(t2, t0, t1);
        b.gen_return(t2);
        b.end_func();
    });
    let (t0, t1, t2) = t;
    let mut g = analyzed(&prog);
    liveness::attach_instr_liveness(&mut g.blocks[0]);
    let tac = &g.block(0).tac;
    // body: MarkParams; t0 = 1; t1 = 2; t2 = t0 + t1
    assert_eq!(tac[1].live_out, set(&[t0]));
    assert_eq!(tac[2].live_out, set(&[t0, t1]));
    // after the add, only the returned temp is needed
    assert_eq!(tac[3].live_out, set(&[t2]));
}

#[test]
fn dead_definitions_have_empty_live_out() {
    let mut dead = TempIdx(0);
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let d = b.new_temp();
        dead = d;
        let r = b.new_temp();
        b.gen_load_imm4(d, 9); // never used
        b.gen_load_imm4(r, 1);
        b.gen_return(r);
        b.end_func();
    });
    let mut g = analyzed(&prog);
    liveness::attach_instr_liveness(&mut g.blocks[0]);
    let tac = &g.block(0).tac;
    assert!(
        !tac[1].live_out.contains(&dead),
        "a never-read temp is dead right after its definition"
    );
}

#[test]
fn solution_satisfies_the_dataflow_equations() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        let p = b.new_temp();
        b.start_func(e, &[p]);
        let l_head = b.new_label();
        let l_body = b.new_label();
        let l_exit = b.new_label();
        let i = b.new_temp();
        let s = b.new_temp();
        b.gen_load_imm4(i, 0);
        b.gen_load_imm4(s, 0);
        b.gen_mark(l_head);
        let c = b.new_temp();
        b.gen_les(c, i, p);
        b.gen_jzero(c, l_exit);
        b.gen_mark(l_body);
        let one = b.new_temp();
        b.gen_load_imm4(one, 1);
        b.gen_add(i, i, one);
        b.gen_add(s, s, i);
        b.gen_jump(l_head);
        b.gen_mark(l_exit);
        b.gen_return(s);
        b.end_func();
    });
    let g = analyzed(&prog);
    for b in &g.blocks {
        // LiveIn = LiveUse ∪ (LiveOut \ LiveDef)
        let mut expect_in = b.live_use.clone();
        for t in &b.live_out {
            if !b.live_def.contains(t) {
                expect_in.insert(*t);
            }
        }
        assert_eq!(b.live_in, expect_in, "live-in equation of block {}", b.id);

        // LiveOut = ⋃ LiveIn[succ]
        let mut expect_out = TempSet::new();
        for s in b.next.iter().flatten() {
            expect_out.extend(g.block(*s).live_in.iter().copied());
        }
        assert_eq!(b.live_out, expect_out, "live-out equation of block {}", b.id);
    }
}
