use mind_backend::flow::{EndKind, FlowGraph};
use mind_core::{Piece, TacBuilder, TacProgram};

/// Build a one-function program and hand back its TAC.
fn build(f: impl FnOnce(&mut TacBuilder)) -> TacProgram {
    let mut b = TacBuilder::new();
    f(&mut b);
    b.finish()
}

fn graph_of(prog: &TacProgram) -> FlowGraph {
    let Piece::Function(f) = &prog.pieces[0] else {
        panic!("expected a function piece");
    };
    FlowGraph::build(f)
}

#[test]
fn a_straight_line_function_is_one_block() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        b.gen_load_imm4(t, 1);
        b.gen_return(t);
        b.end_func();
    });
    let g = graph_of(&prog);
    assert_eq!(g.len(), 1);
    let b0 = g.block(0);
    assert_eq!(b0.end, EndKind::ByReturn);
    assert_eq!(b0.next, [None, None]);
    assert!(b0.var.is_some());
    // MarkParams + LoadImm4; the Return lives in the terminator
    assert_eq!(b0.tac.len(), 2);
}

#[test]
fn a_branch_splits_into_three_blocks() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        let l = b.new_label();
        b.gen_load_imm4(t, 1);
        b.gen_jzero(t, l);
        let t1 = b.new_temp();
        b.gen_load_imm4(t1, 2);
        b.gen_return(t1);
        b.gen_mark(l);
        let t2 = b.new_temp();
        b.gen_load_imm4(t2, 3);
        b.gen_return(t2);
        b.end_func();
    });
    let g = graph_of(&prog);
    assert_eq!(g.len(), 3);

    let b0 = g.block(0);
    assert_eq!(b0.end, EndKind::ByJZero);
    // slot 0 is taken-when-zero, slot 1 the fall-through
    assert_eq!(b0.next, [Some(2), Some(1)]);

    assert_eq!(g.block(1).end, EndKind::ByReturn);
    assert_eq!(g.block(2).end, EndKind::ByReturn);
}

#[test]
fn falling_into_a_label_synthesizes_a_jump() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        b.gen_load_imm4(t, 1);
        let l = b.new_label();
        // no jump here: control falls into the label
        b.gen_mark(l);
        b.gen_return(t);
        b.end_func();
    });
    let g = graph_of(&prog);
    assert_eq!(g.len(), 2);
    let b0 = g.block(0);
    assert_eq!(b0.end, EndKind::ByJump, "synthetic terminator expected");
    assert_eq!(b0.next[0], Some(1));
}

#[test]
fn code_after_a_jump_is_unreachable_and_skipped() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        let l = b.new_label();
        b.gen_load_imm4(t, 1);
        b.gen_jump(l);
        // dead: no label starts a block here
        let dead = b.new_temp();
        b.gen_load_imm4(dead, 9);
        b.gen_mark(l);
        b.gen_return(t);
        b.end_func();
    });
    let g = graph_of(&prog);
    assert_eq!(g.len(), 2);
    assert!(g
        .block(1)
        .tac
        .iter()
        .all(|t| !matches!(t.kind, mind_core::TacKind::LoadImm4 { value: 9, .. })));
}

#[test]
fn simplify_drops_unreachable_blocks_and_renumbers() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        let l_dead = b.new_label();
        let l_live = b.new_label();
        b.gen_load_imm4(t, 1);
        b.gen_jump(l_live);
        b.gen_mark(l_dead);
        b.gen_return(t);
        b.gen_mark(l_live);
        b.gen_return(t);
        b.end_func();
    });
    let mut g = graph_of(&prog);
    assert_eq!(g.len(), 3);
    g.simplify();
    assert_eq!(g.len(), 2);
    // the jump's successor was renumbered
    let b0 = g.block(0);
    assert_eq!(b0.end, EndKind::ByJump);
    assert_eq!(b0.next[0], Some(1));
    assert_eq!(g.block(1).id, 1);
    assert_eq!(g.block(1).end, EndKind::ByReturn);
}

#[test]
#[should_panic(expected = "does not end with a terminator")]
fn a_body_without_a_terminator_is_rejected() {
    let prog = build(|b| {
        let e = b.entry_label("f");
        b.start_func(e, &[]);
        let t = b.new_temp();
        b.gen_load_imm4(t, 1);
        b.end_func();
    });
    graph_of(&prog);
}
