use mind_backend::frame::StackFrame;
use mind_core::{TempPool, TempSet};

#[test]
fn slots_start_below_the_saved_words_and_grow_down() {
    let mut pool = TempPool::new();
    let mut frame = StackFrame::new();
    let a = pool.new_temp_i4();
    let b = pool.new_temp_i4();
    frame.reserve(&mut pool, a);
    frame.reserve(&mut pool, b);
    assert_eq!(pool.temp(a).offset, -12);
    assert_eq!(pool.temp(b).offset, -16);
    assert_eq!(frame.stack_frame_size(), 8);
}

#[test]
fn reserving_twice_is_a_no_op() {
    let mut pool = TempPool::new();
    let mut frame = StackFrame::new();
    let a = pool.new_temp_i4();
    frame.reserve(&mut pool, a);
    frame.reserve(&mut pool, a);
    assert_eq!(pool.temp(a).offset, -12);
    assert_eq!(frame.stack_frame_size(), 4);
}

#[test]
fn an_empty_frame_has_size_zero() {
    let frame = StackFrame::new();
    assert_eq!(frame.stack_frame_size(), 0);
}

#[test]
fn parameters_keep_their_positive_offsets() {
    let mut pool = TempPool::new();
    let mut frame = StackFrame::new();
    let p = pool.new_temp_i4();
    pool.fix_offset(p, 4); // second parameter
    frame.reserve(&mut pool, p);
    assert_eq!(pool.temp(p).offset, 4, "a fixed offset never moves");
    assert_eq!(frame.stack_frame_size(), 0);
}

#[test]
fn slot_to_write_allocates_like_reserve() {
    let mut pool = TempPool::new();
    let mut frame = StackFrame::new();
    let a = pool.new_temp_i4();
    frame.slot_to_write(&mut pool, a, &TempSet::new());
    assert!(pool.temp(a).is_offset_fixed);
    assert_eq!(pool.temp(a).offset, -12);
}
