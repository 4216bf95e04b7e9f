//! Analysis integration tests.
//!
//! These tests exercise the domains and rewriting primitives through the
//! public API:
//! 1. Lattice laws of the effect and points-to domains
//! 2. Usage composition along sequential and alternative paths
//! 3. Logic variable unification
//! 4. Call context legality and simplifier context scoping

use ilopt::prelude::*;

fn int() -> TypeRef {
    TypeRef::new("mscorlib", "System.Int32")
}

fn effect_samples(frame: Frame) -> Vec<Effects> {
    vec![
        Effects::bottom(frame),
        Effects::top(frame),
        Effects::arg(frame, 0, ReadWrite::Read),
        Effects::arg(frame, 1, ReadWrite::Write),
        Effects::local(frame, 0, ReadWrite::Write),
        Effects::make_heap(frame, ReadWrite::Read, false),
        Effects::make_heap(frame, ReadWrite::Write, true),
        Effects::make_throws(frame),
    ]
}

#[test]
fn test_effects_join_is_least_upper_bound() {
    let samples = effect_samples(Frame::new(2, 1));
    for a in &samples {
        assert!(a.lte(a));
        for b in &samples {
            let join = a.lub(b).unwrap();
            assert!(a.lte(&join) && b.lte(&join));
            for c in &samples {
                if a.lte(c) && b.lte(c) {
                    assert!(join.lte(c));
                }
            }
            if a.lte(b) && b.lte(a) {
                assert_eq!(a, b);
            }
        }
    }
}

#[test]
fn test_all_commutable() -> Result<()> {
    let frame = Frame::new(1, 1);
    assert!(Effects::all_commutable(&[]));
    let reads = [
        Effects::arg(frame, 0, ReadWrite::Read),
        Effects::make_heap(frame, ReadWrite::Read, false),
    ];
    assert!(Effects::all_commutable(&reads));
    let throwing = [
        Effects::arg(frame, 0, ReadWrite::Read),
        Effects::make_throws(frame),
    ];
    assert!(!Effects::all_commutable(&throwing));

    // Fixed point over the boolean lattice is immediate.
    assert!(lfp(false, |_| true)?);
    Ok(())
}

#[test]
fn test_points_to_effects_match_targets() {
    let frame = Frame::new(2, 2);
    let mut target = PointsTo::arg(frame, 1);
    let mut changed = false;
    target
        .lub_changed(&PointsTo::heap(frame), &mut changed)
        .unwrap();
    assert!(changed);

    let read = target.read_effect();
    assert_eq!(read.args().get(1), ReadWrite::Read);
    assert_eq!(read.args().get(0), ReadWrite::None);
    assert_eq!(read.locals().get(0), ReadWrite::None);
    assert_eq!(read.heap(), ReadWrite::Read);
    assert!(!read.may_throw());

    let write = target.write_effect();
    assert_eq!(write.args().get(1), ReadWrite::Write);
    assert_eq!(write.heap(), ReadWrite::Write);
    assert!(!write.may_throw());
}

#[test]
fn test_usage_alternatives() {
    let x = AssemblyName::new("X");
    let mut u1 = Usage::new();
    u1.add_assembly(x.clone(), 2, true);
    let u2 = Usage::new();
    assert_eq!(Usage::merge_alternatives(&[u1.clone(), u2]).assembly(&x), Some(POSSIBLE));

    let mut u3 = Usage::new();
    u3.add_assembly(x.clone(), 3, true);
    assert_eq!(Usage::merge_alternatives(&[u1.clone(), u3]).assembly(&x), Some(2));

    // Definite absorbs possible; a definite contribution upgrades a possible one.
    let mut seq = Usage::new();
    seq.add_assembly(x.clone(), 1, false);
    assert_eq!(seq.assembly(&x), Some(POSSIBLE));
    seq.merge(&u1, true);
    assert_eq!(seq.assembly(&x), Some(2));
    seq.add_assembly(x.clone(), 5, false);
    assert_eq!(seq.assembly(&x), Some(2));
}

#[test]
fn test_logic_variables_unify() -> Result<()> {
    let mut arena: LogicArena<Vec<u32>> = LogicArena::new();
    let a = arena.fresh();
    let b = arena.bound(vec![1]);
    let c = arena.bound(vec![2]);

    let mut changed = false;
    arena.unify(a, b, |_, _, _| Ok(()), &mut changed)?;
    assert!(changed);
    assert_eq!(arena.follow(a), arena.follow(b));
    assert_eq!(arena.value(a), Some(&vec![1]));

    let mut calls = 0;
    arena.unify(
        a,
        c,
        |mine, theirs, changed| {
            calls += 1;
            mine.extend_from_slice(theirs);
            *changed = true;
            Ok(())
        },
        &mut changed,
    )?;
    assert_eq!(calls, 1);
    assert_eq!(arena.follow(c), arena.follow(b));
    assert_eq!(arena.value(c), Some(&vec![1, 2]));

    assert!(matches!(arena.bind(a, vec![3]), Err(Error::LogicVarBound)));
    Ok(())
}

#[test]
fn test_call_context_duplicate_effectful_argument() -> Result<()> {
    let mut vars = VariableTable::new();
    vars.declare_named_local("v", int(), VariableFlags::empty());
    let x = Expr::call(MethodRef::new_static(TypeRef::new("app", "P"), "g", 0), vec![]);
    let (p0, p1) = (Id::new(10), Id::new(11));
    let nothing = Effects::bottom(vars.frame());

    let ctx = CallContext::new(&vars, &[p0, p1], &[x.clone(), x])?;
    assert!(!ctx.all_read_only());

    let mut once_each = ctx.clone();
    once_each.visit_parameter(0, &nothing, true);
    once_each.visit_parameter(1, &nothing, true);
    assert!(once_each.finish());

    let mut twice = ctx.clone();
    twice.visit_parameter(1, &nothing, true);
    twice.visit_parameter(1, &nothing, true);
    assert!(!twice.finish());

    let mut reordered = ctx;
    reordered.visit_parameter(1, &nothing, true);
    reordered.visit_parameter(0, &nothing, true);
    assert!(!reordered.finish());
    Ok(())
}

#[test]
fn test_simplifier_context_scoping() -> Result<()> {
    let mut vars = VariableTable::new();
    let a = vars.declare_argument("a", int());
    let x = vars.declare_named_local("x", int(), VariableFlags::empty());
    let method = MethodRef::new_static(TypeRef::new("app", "P"), "m", 1);
    let policy = DefaultPolicy::new();
    let events = EventLog::new();

    let mut root = SimplifierContext::root(&mut vars, &policy, &events, &method);
    {
        let mut child = root.in_sub_method();
        child.bind(a, Expr::int(1));
        assert_eq!(child.apply_read_from(a), Expr::int(1));
    }
    assert_eq!(root.apply_read_from(a), Expr::read(a));

    let mut none = root.in_no_statements();
    assert!(matches!(
        none.add(Stmt::assign(x, Expr::int(0))),
        Err(Error::NoStatementBuffer)
    ));

    let mut fresh = root.in_fresh_statements();
    fresh.emit(Stmt::assign(x, Expr::int(0)))?;
    assert_eq!(fresh.effects().locals().get(0), ReadWrite::Write);
    assert_eq!(fresh.take_statements(), vec![Stmt::assign(x, Expr::int(0))]);
    Ok(())
}
