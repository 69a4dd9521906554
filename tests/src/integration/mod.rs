//! End-to-end scenarios: Mind source in, assembly text out.
//!
//! The repo does not ship a RISC-V simulator, so these check the
//! structure of the emitted code rather than run it.

use mind_backend::emit_assembly;
use mind_frontend::compile_to_tac;

fn compile(src: &str) -> String {
    let mut prog = compile_to_tac(src).unwrap();
    let mut out = Vec::new();
    emit_assembly(&mut prog, &mut out, false).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn constant_return() {
    let text = compile("int main() { return 42; }");
    assert!(text.contains("li    t0, 42"), "{text}");
    assert!(text.contains("mv    a0, t0"), "{text}");
    assert!(text.contains("          ret"), "{text}");
}

#[test]
fn arithmetic_precedence() {
    let text = compile("int main() { return 2+3*4-5; }");
    // mul before add before sub, in emission order
    let mul = text.find("mul   ").expect("mul expected");
    let add = text.find("add   ").expect("add expected");
    let sub = text.find("sub   ").expect("sub expected");
    assert!(mul < add && add < sub, "{text}");
}

#[test]
fn short_circuit_or_skips_the_right_operand() {
    let text = compile("int main() { int x = 0; return (1 || (x = 1)) + x; }");
    // the left operand decides at a branch before the assignment runs
    assert!(text.contains("beqz  "), "{text}");
    // result of the skipped path is the constant 1
    assert!(text.contains("li    "), "{text}");
    assert!(text.contains("          ret"), "{text}");
}

#[test]
fn nested_if_with_locals() {
    let text = compile(
        "int main() { int a = 3; int b = 4; \
         if (a < b) return b - a; else return a - b; }",
    );
    assert!(text.contains("slt   "), "{text}");
    assert!(text.contains("beqz  "), "{text}");
    assert!(text.contains("sub   "), "{text}");
    // both returns epilogue through the frame teardown
    assert!(text.matches("          ret").count() >= 2, "{text}");
}

#[test]
fn while_loop_with_break_and_continue() {
    let text = compile(
        "int main() { int i = 0; int s = 0; \
         while (i < 10) { i = i + 1; \
           if (i == 5) continue; \
           if (i == 8) break; \
           s = s + i; } \
         return s; }",
    );
    assert!(text.contains("beqz  "), "{text}");
    assert!(text.contains("j     __LL"), "{text}");
    // loop state crosses block boundaries, so it spills and reloads
    assert!(text.contains("spill tmp"), "{text}");
    assert!(text.contains("load tmp"), "{text}");
    // comparison against the break/continue pivots
    assert!(text.contains("li    "), "{text}");
}

#[test]
fn recursive_factorial_compiles_with_calls_and_saves() {
    let text = compile(
        "int factorial(int n) { \
           if (n < 2) return 1; \
           return n * factorial(n - 1); } \
         int main() { return factorial(10); }",
    );
    assert!(text.lines().any(|l| l.starts_with("_factorial:")), "{text}");
    assert!(text.contains("call  _factorial"), "{text}");
    // the parameter arrives on the stack
    assert!(text.contains("(fp+0)"), "{text}");
    // live values are saved below sp around the recursive call
    assert!(text.contains("(sp)"), "{text}");
    assert!(text.contains("mul   "), "{text}");
}

#[test]
fn forward_calls_and_mutual_recursion_compile() {
    let text = compile(
        "int even(int n) { if (n == 0) return 1; return odd(n - 1); }\n\
         int odd(int n) { if (n == 0) return 0; return even(n - 1); }\n\
         int main() { return even(10); }",
    );
    assert!(text.lines().any(|l| l.starts_with("_even:")), "{text}");
    assert!(text.lines().any(|l| l.starts_with("_odd:")), "{text}");
    // even calls forward into odd, odd calls back into even
    assert!(text.contains("call  _odd"), "{text}");
    assert!(text.contains("call  _even"), "{text}");
}

#[test]
fn global_read_write() {
    let text = compile("int g; int main() { g = 7; return g * 6; }");
    assert!(text.contains("          .data"), "{text}");
    assert!(text.contains("          .global g"), "{text}");
    assert!(text.lines().any(|l| l.starts_with("g:")), "{text}");
    assert!(text.contains("          .word 0"), "{text}");
    assert!(text.contains("la    "), "{text}");
    assert!(text.contains("mul   "), "{text}");
}

#[test]
fn every_branch_target_is_a_defined_label() {
    let text = compile(
        "int main() { int i = 0; int s = 0; \
         for (int j = 0; j < 4; j = j + 1) { \
           if (j == 2) continue; s = s + j; } \
         while (i < 3) { i = i + 1; } \
         return s + i; }",
    );
    for line in text.lines() {
        let l = line.trim_start();
        let target = l
            .strip_prefix("beqz  ")
            .and_then(|r| r.split(", ").nth(1))
            .or_else(|| l.strip_prefix("j     "));
        if let Some(t) = target {
            let t = t.split_whitespace().next().unwrap();
            assert!(
                text.lines().any(|d| d.starts_with(&format!("{t}:"))),
                "branch to undefined label {t}"
            );
        }
    }
}

#[test]
fn deep_expressions_compile() {
    // plenty of temporaries in one expression
    let text = compile(
        "int main() { return ((1+2)*(3+4) - (5-6)*(7+8)) % ((9+10) / 3); }",
    );
    assert!(text.contains("rem   "), "{text}");
    assert!(text.contains("div   "), "{text}");
    assert!(text.contains("          ret"), "{text}");
}
