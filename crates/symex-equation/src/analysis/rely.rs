// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Backward dependency analysis from the checked properties.
//!
//! Computes the set of pre-renaming identifiers whose defining steps can
//! influence any assertion, assumption or global constraint in the log. The
//! set grows monotonically and is bounded by the finite identifier universe of
//! the log, so the fixpoint terminates.

use crate::data::expressions::Ident;
use crate::data::steps::StepKind;
use crate::equation::{DefinitionMaps, Equation};
use crate::error::{EquationError, Result};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::BTreeSet;

/// Identifiers whose defining steps must be kept for slicing to be sound.
#[derive(Debug, Default)]
pub struct RelySet {
    originals: BTreeSet<Ident>,
}

impl RelySet {
    /// Seed from the property conditions, then iterate to a fixpoint. Marks
    /// `rely` on every step defining a member of the final set.
    ///
    /// Fails with [`EquationError::UnresolvedDependency`] if an assertion
    /// condition references an identifier no step defines; that trace is
    /// inconsistent and the check must abort.
    pub fn compute(equation: &mut Equation, maps: &DefinitionMaps) -> Result<RelySet> {
        let mut originals = Self::seed(equation, maps)?;

        // Fixpoint: a step defining a relied-on identifier pulls the
        // identifiers of its right-hand side and guard into the set. Shared
        // accesses to the thread-lifecycle counters never trigger growth;
        // they carry scheduling metadata, not program data.
        loop {
            let before = originals.len();
            for step in equation.iter() {
                if step.is_thread_bookkeeping() {
                    continue;
                }
                let Some(original) = step.defined_original() else {
                    continue;
                };
                if !originals.contains(original) {
                    continue;
                }
                if let StepKind::Assignment { rhs, .. } = &step.kind {
                    rhs.collect_originals(&mut originals);
                }
                step.guard.collect_originals(&mut originals);
            }
            if originals.len() == before {
                break;
            }
            trace!("rely fixpoint grew to {} identifiers", originals.len());
        }

        for step in equation.iter_mut() {
            if let Some(original) = step.defined_original() {
                if originals.contains(original) {
                    step.rely = true;
                }
            }
        }

        debug!(
            "rely set closed with {} identifiers over {} steps",
            originals.len(),
            equation.len()
        );
        Ok(RelySet { originals })
    }

    /// Seed the set with every identifier occurring in a property condition
    /// or its guard. Assumptions and global constraints are seeds alongside
    /// assertions: they are emitted for the sliced log too, so the steps
    /// defining their symbols must survive or slicing could change
    /// satisfiability.
    fn seed(equation: &Equation, maps: &DefinitionMaps) -> Result<BTreeSet<Ident>> {
        let mut originals = BTreeSet::new();
        for step in equation.iter() {
            let Some(cond) = step.condition() else {
                continue;
            };
            if step.is_assert() {
                // an assertion over an undefined identifier is a trace bug
                let mut asserted = BTreeSet::new();
                cond.collect_originals(&mut asserted);
                for ident in &asserted {
                    if !maps.defines_original(ident) {
                        return Err(EquationError::UnresolvedDependency {
                            ident: ident.clone(),
                        });
                    }
                }
                originals.extend(asserted);
            } else {
                cond.collect_originals(&mut originals);
            }
            step.guard.collect_originals(&mut originals);
        }
        trace!(
            "rely seeds: {}",
            originals.iter().map(|i| i.as_str()).join(", ")
        );
        Ok(originals)
    }

    pub fn contains(&self, original: &Ident) -> bool {
        self.originals.contains(original)
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ident> {
        self.originals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::expressions::{BinOp, Expr, Symbol};
    use crate::data::steps::{AssignmentKind, SourceLoc, NEXT_THREAD_ID};

    fn loc(pc: usize) -> SourceLoc {
        SourceLoc::new(0, pc)
    }

    fn sym(name: &str, version: u32) -> Expr {
        Expr::symbol(Symbol::new(format!("{}#{}", name, version), name))
    }

    #[test]
    fn transitive_dependencies_are_pulled_in() {
        let mut eq = Equation::new();
        // a := 1; b := a + 1; assert(b == 2); c := 7 (unrelated)
        eq.assignment(Expr::truth(), &sym("a", 1), Expr::int(1), AssignmentKind::Visible, loc(0))
            .unwrap();
        eq.assignment(
            Expr::truth(),
            &sym("b", 1),
            Expr::binop(BinOp::Add, sym("a", 1), Expr::int(1)),
            AssignmentKind::Visible,
            loc(1),
        )
        .unwrap();
        eq.assertion(Expr::truth(), Expr::eq(sym("b", 1), Expr::int(2)), "b is 2", loc(2));
        eq.assignment(Expr::truth(), &sym("c", 1), Expr::int(7), AssignmentKind::Visible, loc(3))
            .unwrap();

        let maps = eq.compute_maps();
        let rely = RelySet::compute(&mut eq, &maps).unwrap();
        assert!(rely.contains(&Ident::new("b")));
        assert!(rely.contains(&Ident::new("a")), "reached through b's rhs");
        assert!(!rely.contains(&Ident::new("c")));
        assert!(eq.step(0).unwrap().rely);
        assert!(!eq.step(3).unwrap().rely);
    }

    #[test]
    fn guards_of_relied_steps_grow_the_set() {
        let mut eq = Equation::new();
        // g := cond; [g] x := 1; assert(x == 1)
        eq.assignment(Expr::truth(), &sym("g", 1), sym("cond", 1), AssignmentKind::Hidden, loc(0))
            .unwrap();
        eq.assignment(sym("g", 1), &sym("x", 1), Expr::int(1), AssignmentKind::Visible, loc(1))
            .unwrap();
        eq.assignment(Expr::truth(), &sym("cond", 1), Expr::truth(), AssignmentKind::Hidden, loc(2))
            .unwrap();
        eq.assertion(Expr::truth(), Expr::eq(sym("x", 1), Expr::int(1)), "x", loc(3));

        let maps = eq.compute_maps();
        let rely = RelySet::compute(&mut eq, &maps).unwrap();
        assert!(rely.contains(&Ident::new("g")), "guard of x's definition");
        assert!(rely.contains(&Ident::new("cond")), "reached through g");
    }

    #[test]
    fn undefined_assert_identifier_is_fatal() {
        let mut eq = Equation::new();
        eq.assertion(Expr::truth(), Expr::eq(sym("ghost", 1), Expr::int(0)), "ghost", loc(0));
        let maps = eq.compute_maps();
        let err = RelySet::compute(&mut eq, &maps).unwrap_err();
        assert_eq!(err, EquationError::UnresolvedDependency { ident: Ident::new("ghost") });
    }

    #[test]
    fn thread_bookkeeping_accesses_do_not_spread() {
        let mut eq = Equation::new();
        // The scheduling counter is written under the thread skeleton's
        // guard. Even when the counter itself lands in the rely set, the
        // shared access must not pull the skeleton in after it.
        let counter = Expr::symbol(Symbol::new(format!("{}#1", NEXT_THREAD_ID), NEXT_THREAD_ID));
        eq.assignment(Expr::truth(), &sym("skel", 1), Expr::int(9), AssignmentKind::Hidden, loc(0))
            .unwrap();
        eq.shared_write(sym("skel", 1), &counter, 0, loc(1)).unwrap();
        eq.assumption(Expr::truth(), Expr::eq(counter.clone(), Expr::int(1)), loc(2));
        eq.assignment(Expr::truth(), &sym("x", 1), Expr::int(1), AssignmentKind::Visible, loc(3))
            .unwrap();
        eq.assertion(Expr::truth(), Expr::eq(sym("x", 1), Expr::int(1)), "x", loc(4));

        let maps = eq.compute_maps();
        let rely = RelySet::compute(&mut eq, &maps).unwrap();
        assert!(rely.contains(&Ident::new(NEXT_THREAD_ID)), "seeded by the assumption");
        assert!(
            !rely.contains(&Ident::new("skel")),
            "the bookkeeping write's guard must not retain the thread skeleton"
        );
    }

    #[test]
    fn assume_conditions_are_seeds() {
        let mut eq = Equation::new();
        eq.assignment(Expr::truth(), &sym("n", 1), Expr::int(5), AssignmentKind::Visible, loc(0))
            .unwrap();
        eq.assumption(Expr::truth(), Expr::eq(sym("n", 1), Expr::int(6)), loc(1));
        eq.assignment(Expr::truth(), &sym("x", 1), Expr::int(1), AssignmentKind::Visible, loc(2))
            .unwrap();
        eq.assertion(Expr::truth(), Expr::eq(sym("x", 1), Expr::int(1)), "x", loc(3));

        let maps = eq.compute_maps();
        let rely = RelySet::compute(&mut eq, &maps).unwrap();
        assert!(
            rely.contains(&Ident::new("n")),
            "the unsatisfiable assumption must keep n's definition"
        );
    }
}
