use mind_core::temp::TempPool;

#[test]
fn pool_allocates_sequential_ids() {
    let mut pool = TempPool::new();
    let t0 = pool.new_temp_i4();
    let t1 = pool.new_temp_i4();
    assert_eq!(t0.0, 0);
    assert_eq!(t1.0, 1);
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.temp(t0).size, 4);
    assert_eq!(t1.to_string(), "tmp1");
}

#[test]
fn temp_binds_symbol_name() {
    let mut pool = TempPool::new();
    let t = pool.new_temp_for("x");
    assert_eq!(pool.temp(t).name.as_deref(), Some("x"));
    let anon = pool.new_temp_i4();
    assert_eq!(pool.temp(anon).name, None);
}

#[test]
fn fix_offset_sets_the_slot() {
    let mut pool = TempPool::new();
    let t = pool.new_temp_i4();
    assert!(!pool.temp(t).is_offset_fixed);
    pool.fix_offset(t, -12);
    assert!(pool.temp(t).is_offset_fixed);
    assert_eq!(pool.temp(t).offset, -12);
}

#[test]
#[should_panic(expected = "already fixed")]
fn fixing_an_offset_twice_panics() {
    let mut pool = TempPool::new();
    let t = pool.new_temp_i4();
    pool.fix_offset(t, -12);
    pool.fix_offset(t, -16);
}
