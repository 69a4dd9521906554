use mind_core::{Piece, TacFunc, TacKind, TacProgram};
use mind_frontend::compile_to_tac;

fn tac(src: &str) -> TacProgram {
    compile_to_tac(src).unwrap()
}

fn func<'p>(prog: &'p TacProgram, name: &str) -> &'p TacFunc {
    prog.funcs()
        .find(|f| {
            let rendered = prog.labels.render(f.entry);
            rendered == name || rendered == format!("_{name}")
        })
        .unwrap_or_else(|| panic!("no function `{name}`"))
}

fn position(f: &TacFunc, pred: impl Fn(&TacKind) -> bool) -> usize {
    f.body
        .iter()
        .position(|t| pred(&t.kind))
        .expect("instruction not found")
}

#[test]
fn a_function_always_ends_with_a_return() {
    let prog = tac("int main() { int x = 1; }");
    let main = func(&prog, "main");
    assert!(matches!(
        main.body.last().unwrap().kind,
        TacKind::Return { .. }
    ));
}

#[test]
fn an_explicit_trailing_return_is_not_duplicated() {
    let prog = tac("int main() { return 7; }");
    let main = func(&prog, "main");
    let returns = main
        .body
        .iter()
        .filter(|t| matches!(t.kind, TacKind::Return { .. }))
        .count();
    assert_eq!(returns, 1);
}

#[test]
fn short_circuit_and_branches_around_the_right_operand() {
    let prog = tac(
        "int f() { return 1; }\n\
         int main() { return 0 && f(); }",
    );
    let main = func(&prog, "main");
    let jz = position(main, |k| matches!(k, TacKind::JZero { .. }));
    let call = position(main, |k| matches!(k, TacKind::Call { .. }));
    assert!(
        jz < call,
        "the branch must be emitted before the right operand's call"
    );
    // the skip path loads the constant 0 result
    let zero_after_branch = main.body[jz..]
        .iter()
        .any(|t| matches!(t.kind, TacKind::LoadImm4 { value: 0, .. }));
    assert!(zero_after_branch);
}

#[test]
fn logical_results_are_normalized() {
    let prog = tac(
        "int f() { return 5; }\n\
         int main() { return 1 && f(); }",
    );
    let main = func(&prog, "main");
    // double logical-not squeezes the right operand to 0/1
    let lnots = main
        .body
        .iter()
        .filter(|t| {
            matches!(
                t.kind,
                TacKind::Unary {
                    op: mind_core::UnaryOp::LNot,
                    ..
                }
            )
        })
        .count();
    assert_eq!(lnots, 2);
}

#[test]
fn arguments_stage_as_a_contiguous_param_run() {
    let prog = tac(
        "int f(int a, int b, int c) { return a + b + c; }\n\
         int main() { return f(1, 2, 3); }",
    );
    let main = func(&prog, "main");
    let call = position(main, |k| matches!(k, TacKind::Call { .. }));
    for i in (call - 3)..call {
        assert!(
            matches!(main.body[i].kind, TacKind::Param { .. }),
            "expected Param immediately before the call at {i}"
        );
    }
}

#[test]
fn globals_lower_to_symbol_addressing() {
    let prog = tac("int g; int main() { g = 7; return g * 6; }");
    assert!(prog
        .pieces
        .iter()
        .any(|p| matches!(p, Piece::Global { name, value } if name == "g" && *value == 0)));
    let main = func(&prog, "main");
    let store = position(main, |k| matches!(k, TacKind::Store { .. }));
    let load = position(main, |k| matches!(k, TacKind::Load { .. }));
    assert!(store < load);
    assert!(main
        .body
        .iter()
        .filter(|t| matches!(&t.kind, TacKind::LoadSymbol { symbol, .. } if symbol == "g"))
        .count()
        >= 2);
}

#[test]
fn global_initializers_become_piece_values() {
    let prog = tac("int g = -5; int main() { return g; }");
    assert!(prog
        .pieces
        .iter()
        .any(|p| matches!(p, Piece::Global { name, value } if name == "g" && *value == -5)));
}

#[test]
fn while_lowers_to_the_standard_loop_shape() {
    let prog = tac("int main() { int i = 0; while (i < 3) i = i + 1; return i; }");
    let main = func(&prog, "main");
    let cond_mark = position(main, |k| matches!(k, TacKind::Mark { .. }));
    let jz = position(main, |k| matches!(k, TacKind::JZero { .. }));
    let jump = position(main, |k| matches!(k, TacKind::Jump { .. }));
    assert!(cond_mark < jz && jz < jump, "Lcond … JZero … body … Jump");
    // the back edge targets the condition label
    let TacKind::Mark { label } = main.body[cond_mark].kind else {
        unreachable!();
    };
    let TacKind::Jump { target } = main.body[jump].kind else {
        unreachable!();
    };
    assert_eq!(label, target);
}

#[test]
fn continue_in_a_for_loop_targets_the_update_block() {
    let prog = tac(
        "int main() { int s = 0; \
         for (int i = 0; i < 9; i = i + 1) { if (i == 5) continue; s = s + i; } \
         return s; }",
    );
    let main = func(&prog, "main");
    // the continue jump targets a label placed before the update code,
    // which itself jumps back to the condition: so there must be a
    // jump to a label that is marked *later* in the stream
    let forward_jump = main.body.iter().enumerate().any(|(i, t)| {
        if let TacKind::Jump { target } = t.kind {
            main.body[i..]
                .iter()
                .any(|u| matches!(u.kind, TacKind::Mark { label } if label == target))
        } else {
            false
        }
    });
    assert!(forward_jump, "continue must jump forward to the update");
}

#[test]
fn parameters_are_bound_and_marked() {
    let prog = tac(
        "int sub(int a, int b) { return a - b; }\n\
         int main() { return sub(5, 3); }",
    );
    let sub = func(&prog, "sub");
    assert_eq!(sub.params.len(), 2);
    assert!(matches!(
        &sub.body[0].kind,
        TacKind::MarkParams { params } if params.len() == 2
    ));
    for (i, &p) in sub.params.iter().enumerate() {
        assert_eq!(prog.temps.temp(p).offset, 4 * i as i32);
        assert!(prog.temps.temp(p).is_offset_fixed);
    }
    // the body subtracts the two parameter temps
    assert!(sub.body.iter().any(|t| matches!(
        t.kind,
        TacKind::Binary {
            op: mind_core::BinaryOp::Sub,
            lhs,
            rhs,
            ..
        } if lhs == sub.params[0] && rhs == sub.params[1]
    )));
}

#[test]
fn conditional_expression_writes_one_destination() {
    let prog = tac("int main() { int a = 1; return a ? 10 : 20; }");
    let main = func(&prog, "main");
    // both arms assign into the same temp
    let assigns: Vec<_> = main
        .body
        .iter()
        .filter_map(|t| match t.kind {
            TacKind::Assign { dst, .. } => Some(dst),
            _ => None,
        })
        .collect();
    let last_two: Vec<_> = assigns.iter().rev().take(2).collect();
    assert_eq!(last_two[0], last_two[1], "both arms share the destination");
}
