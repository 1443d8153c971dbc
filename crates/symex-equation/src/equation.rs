// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The step log: an append-only record of one explored interleaving.
//!
//! The symbolic-execution driver appends one step per executed event. After
//! execution completes the log is read by the analyses (address map, rely,
//! slicing) and finally by the converter. Nothing is ever removed; slicing
//! only flags steps as ignorable so sequence ids stay stable for trace
//! reconstruction.

use crate::data::expressions::{Expr, Ident, Symbol};
use crate::data::steps::{AssignmentKind, BarrierKind, SourceLoc, Step, StepKind, SyncKind};
use crate::error::{EquationError, Result};
use std::collections::BTreeMap;

/// The equation under construction: the ordered step log.
#[derive(Debug, Default)]
pub struct Equation {
    steps: Vec<Step>,
    next_id: u64,
}

impl Equation {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, source: SourceLoc, guard: Expr, kind: StepKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.steps.push(Step::new(id, source, guard, kind));
        id
    }

    /// The left-hand side of a definition must be a plain symbol reference.
    fn require_symbol(lhs: &Expr, source: SourceLoc, what: &str) -> Result<Symbol> {
        lhs.as_symbol().cloned().ok_or_else(|| EquationError::MalformedStep {
            at: source,
            reason: format!("{} left-hand side `{}` is not a symbol", what, lhs),
        })
    }

    /// Record an assignment. `lhs` must be a symbol reference.
    pub fn assignment(
        &mut self,
        guard: Expr,
        lhs: &Expr,
        rhs: Expr,
        kind: AssignmentKind,
        source: SourceLoc,
    ) -> Result<u64> {
        let lhs = Self::require_symbol(lhs, source, "assignment")?;
        Ok(self.push(source, guard, StepKind::Assignment { lhs, rhs, kind }))
    }

    /// Record the declaration of a fresh variable.
    pub fn decl(&mut self, guard: Expr, lhs: &Expr, source: SourceLoc) -> Result<u64> {
        let lhs = Self::require_symbol(lhs, source, "decl")?;
        Ok(self.push(source, guard, StepKind::Decl { lhs }))
    }

    /// Record the death of a variable.
    pub fn dead(&mut self, guard: Expr, lhs: &Expr, source: SourceLoc) -> Result<u64> {
        let lhs = Self::require_symbol(lhs, source, "dead")?;
        Ok(self.push(source, guard, StepKind::Dead { lhs }))
    }

    /// Record a read of a shared memory location.
    pub fn shared_read(
        &mut self,
        guard: Expr,
        lhs: &Expr,
        atomic_section: u32,
        source: SourceLoc,
    ) -> Result<u64> {
        let lhs = Self::require_symbol(lhs, source, "shared read")?;
        Ok(self.push(source, guard, StepKind::SharedRead { lhs, atomic_section }))
    }

    /// Record a write of a shared memory location.
    pub fn shared_write(
        &mut self,
        guard: Expr,
        lhs: &Expr,
        atomic_section: u32,
        source: SourceLoc,
    ) -> Result<u64> {
        let lhs = Self::require_symbol(lhs, source, "shared write")?;
        Ok(self.push(source, guard, StepKind::SharedWrite { lhs, atomic_section }))
    }

    /// Record a function call. The callee is classified against the closed
    /// set of recognized synchronization primitives here, once.
    pub fn function_call(
        &mut self,
        guard: Expr,
        callee: Ident,
        joined_thread: Option<Ident>,
        source: SourceLoc,
    ) -> u64 {
        let sync = SyncKind::classify(callee.as_str());
        self.push(
            source,
            guard,
            StepKind::FunctionCall { callee, sync, joined_thread },
        )
    }

    /// Record a return from a function.
    pub fn function_return(&mut self, guard: Expr, callee: Ident, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::FunctionReturn { callee })
    }

    /// Record a program point with no effect.
    pub fn location(&mut self, guard: Expr, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::Location)
    }

    /// Record an output event.
    pub fn output(
        &mut self,
        guard: Expr,
        format: impl Into<String>,
        args: Vec<Expr>,
        source: SourceLoc,
    ) -> u64 {
        self.push(source, guard, StepKind::Output { format: format.into(), args })
    }

    /// Record an input event.
    pub fn input(
        &mut self,
        guard: Expr,
        format: impl Into<String>,
        args: Vec<Expr>,
        source: SourceLoc,
    ) -> u64 {
        self.push(source, guard, StepKind::Input { format: format.into(), args })
    }

    /// Record an assumption.
    pub fn assumption(&mut self, guard: Expr, cond: Expr, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::Assume { cond })
    }

    /// Record an assertion.
    pub fn assertion(
        &mut self,
        guard: Expr,
        cond: Expr,
        message: impl Into<String>,
        source: SourceLoc,
    ) -> u64 {
        self.push(
            source,
            guard,
            StepKind::Assert { cond, message: message.into() },
        )
    }

    /// Record a global constraint, enforced without a guard.
    pub fn constraint(&mut self, cond: Expr, message: impl Into<String>, source: SourceLoc) -> u64 {
        self.push(
            source,
            Expr::truth(),
            StepKind::Constraint { cond, message: message.into() },
        )
    }

    /// Record a thread spawn.
    pub fn spawn(&mut self, guard: Expr, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::Spawn)
    }

    /// Record a memory barrier.
    pub fn memory_barrier(&mut self, guard: Expr, barrier: BarrierKind, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::MemoryBarrier { barrier })
    }

    /// Open an atomic section.
    pub fn atomic_begin(&mut self, guard: Expr, atomic_section: u32, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::AtomicBegin { atomic_section })
    }

    /// Close an atomic section.
    pub fn atomic_end(&mut self, guard: Expr, atomic_section: u32, source: SourceLoc) -> u64 {
        self.push(source, guard, StepKind::AtomicEnd { atomic_section })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Random access by sequence position.
    pub fn step(&self, index: usize) -> Result<&Step> {
        self.steps.get(index).ok_or(EquationError::OutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Step> {
        self.steps.iter_mut()
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> &mut Step {
        &mut self.steps[index]
    }

    pub fn count_assertions(&self) -> usize {
        self.steps.iter().filter(|s| s.is_assert()).count()
    }

    pub fn count_ignored(&self) -> usize {
        self.steps.iter().filter(|s| s.ignore).count()
    }

    /// Whether any step originated from a thread other than the main one.
    pub fn has_threads(&self) -> bool {
        self.steps.iter().any(|s| s.source.thread != 0)
    }

    /// Check that every atomic section opens and closes exactly once, on the
    /// same thread, properly nested. Run before conversion.
    pub fn validate_atomic_sections(&self) -> Result<()> {
        let mut open: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        for step in &self.steps {
            match step.kind {
                StepKind::AtomicBegin { atomic_section } => {
                    open.entry(step.source.thread).or_default().push(atomic_section);
                }
                StepKind::AtomicEnd { atomic_section } => {
                    let stack = open.entry(step.source.thread).or_default();
                    match stack.pop() {
                        Some(section) if section == atomic_section => {}
                        _ => {
                            return Err(EquationError::AtomicSectionMismatch {
                                section: atomic_section,
                                thread: step.source.thread,
                            })
                        }
                    }
                }
                _ => {}
            }
        }
        for (thread, stack) in open {
            if let Some(section) = stack.last() {
                return Err(EquationError::AtomicSectionMismatch {
                    section: *section,
                    thread,
                });
            }
        }
        Ok(())
    }

    /// Rebuild the identifier-to-step lookup caches from the completed log.
    pub fn compute_maps(&self) -> DefinitionMaps {
        DefinitionMaps::build(self)
    }
}

impl<'a> IntoIterator for &'a Equation {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Identifier-to-step lookup caches over a completed log.
///
/// These are derived structures, rebuilt from scratch rather than maintained
/// during append; they go stale if the log is mutated after being built. Step
/// references are stored as log indices.
#[derive(Debug, Default)]
pub struct DefinitionMaps {
    /// Renamed identifier of a shared read -> step index.
    pub shared_reads: BTreeMap<Ident, usize>,
    /// Renamed identifier of a shared write -> step index.
    pub shared_writes: BTreeMap<Ident, usize>,
    /// Renamed identifier of an assignment target -> step index.
    pub assignments: BTreeMap<Ident, usize>,
    /// Pre-renaming identifier -> every step index defining it.
    pub by_original: BTreeMap<Ident, Vec<usize>>,
}

impl DefinitionMaps {
    fn build(equation: &Equation) -> Self {
        let mut maps = DefinitionMaps::default();
        for (index, step) in equation.iter().enumerate() {
            match &step.kind {
                StepKind::SharedRead { lhs, .. } => {
                    maps.shared_reads.insert(lhs.ident.clone(), index);
                }
                StepKind::SharedWrite { lhs, .. } => {
                    maps.shared_writes.insert(lhs.ident.clone(), index);
                }
                StepKind::Assignment { lhs, .. } => {
                    maps.assignments.insert(lhs.ident.clone(), index);
                }
                _ => {}
            }
            // Decl counts as a definition for dependency resolution even
            // though it carries no value.
            if matches!(
                step.kind,
                StepKind::Assignment { .. }
                    | StepKind::Decl { .. }
                    | StepKind::SharedRead { .. }
                    | StepKind::SharedWrite { .. }
            ) {
                if let Some(original) = step.defined_original() {
                    maps.by_original.entry(original.clone()).or_default().push(index);
                }
            }
        }
        maps
    }

    /// Whether any step defines this pre-renaming identifier.
    pub fn defines_original(&self, original: &Ident) -> bool {
        self.by_original.contains_key(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::expressions::Symbol;

    fn loc(thread: usize, pc: usize) -> SourceLoc {
        SourceLoc::new(thread, pc)
    }

    fn sym(name: &str, version: u32) -> Expr {
        Expr::symbol(Symbol::new(format!("{}#{}", name, version), name))
    }

    #[test]
    fn append_round_trip_preserves_order_and_ids() {
        let mut eq = Equation::new();
        for pc in 0..10 {
            eq.assignment(
                Expr::truth(),
                &sym("x", pc as u32),
                Expr::int(pc),
                AssignmentKind::Visible,
                loc(0, pc),
            )
            .unwrap();
        }
        assert_eq!(eq.len(), 10);
        let mut last_id = None;
        for (pc, step) in eq.iter().enumerate() {
            assert_eq!(step.source.pc, pc);
            if let Some(prev) = last_id {
                assert!(step.id > prev, "ids must be strictly increasing");
            }
            last_id = Some(step.id);
        }
    }

    #[test]
    fn count_assertions_matches_direct_filter() {
        let mut eq = Equation::new();
        eq.assertion(Expr::truth(), Expr::falsity(), "first", loc(0, 0));
        eq.assumption(Expr::truth(), Expr::truth(), loc(0, 1));
        eq.assertion(Expr::truth(), Expr::truth(), "second", loc(0, 2));
        eq.location(Expr::truth(), loc(0, 3));
        let direct = eq.iter().filter(|s| s.is_assert()).count();
        assert_eq!(eq.count_assertions(), direct);
        assert_eq!(direct, 2);
    }

    #[test]
    fn compound_lhs_is_malformed() {
        let mut eq = Equation::new();
        let compound = Expr::binop(crate::data::BinOp::Add, sym("x", 1), Expr::int(1));
        let err = eq
            .assignment(Expr::truth(), &compound, Expr::int(0), AssignmentKind::Visible, loc(0, 0))
            .unwrap_err();
        assert!(matches!(err, EquationError::MalformedStep { .. }));
        assert!(eq.is_empty(), "malformed appends must not land in the log");
    }

    #[test]
    fn step_access_is_range_checked() {
        let mut eq = Equation::new();
        eq.location(Expr::truth(), loc(0, 0));
        assert!(eq.step(0).is_ok());
        assert_eq!(
            eq.step(3).unwrap_err(),
            EquationError::OutOfRange { index: 3, len: 1 }
        );
    }

    #[test]
    fn has_threads_reports_nonzero_thread_tags() {
        let mut eq = Equation::new();
        eq.location(Expr::truth(), loc(0, 0));
        assert!(!eq.has_threads());
        eq.spawn(Expr::truth(), loc(0, 1));
        eq.location(Expr::truth(), loc(1, 0));
        assert!(eq.has_threads());
    }

    #[test]
    fn balanced_atomic_sections_validate() {
        let mut eq = Equation::new();
        eq.atomic_begin(Expr::truth(), 1, loc(0, 0));
        eq.atomic_begin(Expr::truth(), 2, loc(0, 1));
        eq.atomic_end(Expr::truth(), 2, loc(0, 2));
        eq.atomic_end(Expr::truth(), 1, loc(0, 3));
        // a different thread's sections are tracked independently
        eq.atomic_begin(Expr::truth(), 3, loc(1, 0));
        eq.atomic_end(Expr::truth(), 3, loc(1, 1));
        assert!(eq.validate_atomic_sections().is_ok());
    }

    #[test]
    fn unmatched_atomic_sections_are_fatal() {
        let mut eq = Equation::new();
        eq.atomic_begin(Expr::truth(), 7, loc(0, 0));
        assert_eq!(
            eq.validate_atomic_sections().unwrap_err(),
            EquationError::AtomicSectionMismatch { section: 7, thread: 0 }
        );

        let mut crossed = Equation::new();
        crossed.atomic_begin(Expr::truth(), 1, loc(0, 0));
        crossed.atomic_begin(Expr::truth(), 2, loc(0, 1));
        crossed.atomic_end(Expr::truth(), 1, loc(0, 2));
        assert!(crossed.validate_atomic_sections().is_err());
    }

    #[test]
    fn definition_maps_key_renamed_and_original_idents() {
        let mut eq = Equation::new();
        eq.decl(Expr::truth(), &sym("x", 0), loc(0, 0)).unwrap();
        eq.assignment(Expr::truth(), &sym("x", 1), Expr::int(1), AssignmentKind::Visible, loc(0, 1))
            .unwrap();
        eq.shared_write(Expr::truth(), &sym("g", 1), 0, loc(0, 2)).unwrap();
        eq.shared_read(Expr::truth(), &sym("g", 2), 0, loc(1, 0)).unwrap();

        let maps = eq.compute_maps();
        assert_eq!(maps.assignments.get(&Ident::new("x#1")), Some(&1));
        assert_eq!(maps.shared_writes.get(&Ident::new("g#1")), Some(&2));
        assert_eq!(maps.shared_reads.get(&Ident::new("g#2")), Some(&3));
        assert!(maps.defines_original(&Ident::new("x")));
        assert!(maps.defines_original(&Ident::new("g")));
        assert!(!maps.defines_original(&Ident::new("y")));
        assert_eq!(maps.by_original.get(&Ident::new("g")).unwrap(), &vec![2, 3]);
    }
}
