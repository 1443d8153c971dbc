// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! End-to-end checks on a two-thread litmus-style trace: thread 0 writes `z`
//! then `x`, thread 1 writes `x` then reads `y` and `z`, fences in between,
//! both threads bump a shared counter and assume it reached 2.

use symex_equation::{
    analysis, convert, AddressMap, AssignmentKind, BarrierKind, BinOp, Constant, Env, Equation,
    Expr, Ident, RecordingProcedure, SourceLoc, Symbol,
};

fn sym(name: &str, version: u32) -> Expr {
    Expr::symbol(Symbol::new(format!("{}#{}", name, version), name))
}

fn t0(pc: usize) -> SourceLoc {
    SourceLoc::new(0, pc)
}

fn t1(pc: usize) -> SourceLoc {
    SourceLoc::new(1, pc)
}

fn mix_trace() -> Equation {
    let mut eq = Equation::new();
    let t = Expr::truth;

    // main thread: unused auxiliary, initialization, spawn
    eq.decl(t(), &sym("aux", 0), t0(0)).unwrap();
    eq.assignment(t(), &sym("y", 1), Expr::int(1), AssignmentKind::Visible, t0(1)).unwrap();
    eq.shared_write(t(), &sym("y", 1), 0, t0(2)).unwrap();
    eq.assignment(t(), &sym("c", 1), Expr::int(0), AssignmentKind::Visible, t0(3)).unwrap();
    eq.shared_write(t(), &sym("c", 1), 0, t0(4)).unwrap();
    eq.spawn(t(), t0(5));

    // thread 0: write z, fence, write x, fence, bump counter
    eq.assignment(t(), &sym("z", 1), Expr::int(1), AssignmentKind::Visible, t0(6)).unwrap();
    eq.shared_write(t(), &sym("z", 1), 0, t0(7)).unwrap();
    eq.memory_barrier(t(), BarrierKind::Full, t0(8));
    eq.assignment(t(), &sym("x", 1), Expr::int(2), AssignmentKind::Visible, t0(9)).unwrap();
    eq.shared_write(t(), &sym("x", 1), 0, t0(10)).unwrap();
    eq.memory_barrier(t(), BarrierKind::Full, t0(11));
    eq.shared_read(t(), &sym("c", 2), 0, t0(12)).unwrap();
    eq.assignment(
        t(),
        &sym("c", 3),
        Expr::binop(BinOp::Add, sym("c", 2), Expr::int(1)),
        AssignmentKind::Visible,
        t0(13),
    )
    .unwrap();
    eq.shared_write(t(), &sym("c", 3), 0, t0(14)).unwrap();

    // thread 1: write x, fence, read y and z, fence, bump counter
    eq.assignment(t(), &sym("x", 2), Expr::int(1), AssignmentKind::Visible, t1(0)).unwrap();
    eq.shared_write(t(), &sym("x", 2), 0, t1(1)).unwrap();
    eq.memory_barrier(t(), BarrierKind::Full, t1(2));
    eq.shared_read(t(), &sym("y", 2), 0, t1(3)).unwrap();
    eq.assignment(t(), &sym("ry", 1), sym("y", 2), AssignmentKind::Visible, t1(4)).unwrap();
    eq.shared_read(t(), &sym("z", 2), 0, t1(5)).unwrap();
    eq.assignment(t(), &sym("rz", 1), sym("z", 2), AssignmentKind::Visible, t1(6)).unwrap();
    eq.memory_barrier(t(), BarrierKind::Full, t1(7));
    eq.shared_read(t(), &sym("c", 4), 0, t1(8)).unwrap();
    eq.assignment(
        t(),
        &sym("c", 5),
        Expr::binop(BinOp::Add, sym("c", 4), Expr::int(1)),
        AssignmentKind::Visible,
        t1(9),
    )
    .unwrap();
    eq.shared_write(t(), &sym("c", 5), 0, t1(10)).unwrap();

    // both threads assume the counter reached 2
    eq.assumption(t(), Expr::eq(sym("c", 5), Expr::int(2)), t0(15));
    eq.assumption(t(), Expr::eq(sym("c", 5), Expr::int(2)), t1(11));

    // not (x == 2 && ry == 1 && rz == 0)
    let bad = Expr::and(
        Expr::eq(sym("x", 2), Expr::int(2)),
        Expr::and(
            Expr::eq(sym("ry", 1), Expr::int(1)),
            Expr::eq(sym("rz", 1), Expr::int(0)),
        ),
    );
    eq.assertion(t(), Expr::not(bad), "mix041 forbidden outcome", t0(16));
    eq
}

#[test]
fn trace_is_multi_threaded_and_well_formed() {
    let eq = mix_trace();
    assert!(eq.has_threads());
    assert_eq!(eq.count_assertions(), 1);
    assert!(eq.validate_atomic_sections().is_ok());
}

#[test]
fn address_map_groups_accesses_per_location() {
    let eq = mix_trace();
    let map = AddressMap::build(&eq);

    assert_eq!(map.writes(&Ident::new("x")).len(), 2);
    assert!(map.reads(&Ident::new("x")).is_empty());
    assert_eq!(map.writes(&Ident::new("z")).len(), 1);
    assert_eq!(map.reads(&Ident::new("z")).len(), 1);
    assert_eq!(map.writes(&Ident::new("y")).len(), 1);
    assert_eq!(map.reads(&Ident::new("y")).len(), 1);

    // completeness: every shared access lands in exactly one list
    let listed: usize = map.iter().map(|(_, a)| a.reads.len() + a.writes.len()).sum();
    let shared = eq.iter().filter(|s| s.is_shared_read() || s.is_shared_write()).count();
    assert_eq!(listed, shared);

    // within a location, list order is log order
    for (_, accesses) in map.iter() {
        assert!(accesses.writes.windows(2).all(|w| w[0] < w[1]));
        assert!(accesses.reads.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn slicing_keeps_the_assertion_and_drops_the_aux_decl() {
    let mut eq = mix_trace();
    let rely = analysis::reduce(&mut eq).unwrap();

    for step in eq.iter() {
        if step.is_assert() {
            assert!(!step.ignore, "assert is the rely seed and must survive");
        }
        if let Some(original) = step.defined_original() {
            if original.as_str() == "aux" {
                assert!(step.ignore, "unused auxiliary decl must be flagged");
            }
        }
        if step.is_memory_barrier() {
            assert!(!step.ignore, "fences stay for the memory-model encoder");
        }
    }
    for name in ["x", "y", "z", "c", "ry", "rz"] {
        assert!(rely.contains(&Ident::new(name)), "{} feeds the assertion", name);
    }
    assert!(!rely.contains(&Ident::new("aux")));
}

#[test]
fn sliced_trace_converts_cleanly() {
    let mut eq = mix_trace();
    analysis::reduce(&mut eq).unwrap();
    let mut dp = RecordingProcedure::new();
    convert(&mut eq, &mut dp).unwrap();

    assert_eq!(dp.assertion_tags.len(), 1);
    assert_eq!(dp.assertion_tags[0].1, "mix041 forbidden outcome");
    assert_eq!(dp.clauses.len(), 1);
    // every surviving step got exactly one guard literal
    for step in eq.iter().filter(|s| !s.ignore) {
        assert!(step.guard_literal.is_some());
    }
}

// Satisfiability of (guards && assumes && !asserts) must be identical for the
// full and the sliced log. Checked by enumerating all environments over a
// small domain and asking the recording procedure whether any model both
// satisfies the constraints and triggers the violation clause.

fn soundness_trace(assert_holds: bool) -> Equation {
    let mut eq = Equation::new();
    let t = Expr::truth;
    // junk is irrelevant to the property and will be sliced away
    eq.assignment(t(), &sym("junk", 1), Expr::int(2), AssignmentKind::Visible, t0(0)).unwrap();
    eq.assignment(t(), &sym("a", 1), Expr::int(1), AssignmentKind::Visible, t0(1)).unwrap();
    eq.assignment(
        t(),
        &sym("b", 1),
        Expr::binop(BinOp::Add, sym("a", 1), Expr::int(1)),
        AssignmentKind::Visible,
        t0(2),
    )
    .unwrap();
    eq.assumption(t(), Expr::binop(BinOp::Le, sym("b", 1), Expr::int(2)), t0(3));
    let expected = if assert_holds { 2 } else { 0 };
    eq.assertion(t(), Expr::eq(sym("b", 1), Expr::int(expected)), "b check", t0(4));
    eq
}

fn enumerate_violation(dp: &RecordingProcedure) -> bool {
    let idents = ["junk#1", "a#1", "b#1"];
    let domain = [0i64, 1, 2];
    for &j in &domain {
        for &a in &domain {
            for &b in &domain {
                let mut env = Env::new();
                for (ident, value) in idents.iter().zip([j, a, b]) {
                    env.insert(Ident::new(*ident), Constant::Int(value.into()));
                }
                if dp.holds_under(&env) == Some(true) {
                    return true;
                }
            }
        }
    }
    false
}

#[test]
fn slicing_never_changes_the_verdict() {
    for assert_holds in [true, false] {
        let mut full = soundness_trace(assert_holds);
        let mut dp_full = RecordingProcedure::new();
        convert(&mut full, &mut dp_full).unwrap();

        let mut sliced = soundness_trace(assert_holds);
        analysis::reduce(&mut sliced).unwrap();
        assert!(sliced.count_ignored() > 0, "junk must actually be sliced");
        let mut dp_sliced = RecordingProcedure::new();
        convert(&mut sliced, &mut dp_sliced).unwrap();

        let full_sat = enumerate_violation(&dp_full);
        let sliced_sat = enumerate_violation(&dp_sliced);
        assert_eq!(full_sat, sliced_sat, "slicing changed satisfiability");
        // a holding assertion admits no violation; a failing one does
        assert_eq!(full_sat, !assert_holds);
    }
}
