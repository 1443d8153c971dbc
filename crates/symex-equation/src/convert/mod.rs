// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation of the (sliced) step log into decision-procedure state.
//!
//! The conversion is a fixed sequence of passes, each a single deterministic
//! left-to-right walk that skips ignored steps: declarations, assignments,
//! guards, assumptions, assertions, global constraints, io. Order matters:
//! guard literals are memoized by interned expression handle, and later steps
//! reference earlier guards by literal identity.

mod recording;

pub use recording::RecordingProcedure;

use crate::data::expressions::{Expr, ExprData, Symbol};
use crate::data::steps::StepKind;
use crate::equation::Equation;
use crate::error::Result;
use log::debug;
use std::collections::HashMap;
use symex_prop::{Literal, SolveResult};

/// The external decision procedure as seen by the converter.
///
/// Backends compile expressions to literals, accumulate constraints, and
/// answer one final satisfiability query. `compile` must be deterministic:
/// the same expression submitted twice yields the same literal.
pub trait DecisionProcedure {
    /// Declare a fresh solver variable for a declared program symbol.
    fn declare(&mut self, symbol: &Symbol);

    /// Compile a boolean expression into a literal.
    fn compile(&mut self, expr: &Expr) -> Literal;

    /// Assert an expression as a constraint.
    fn assert_expr(&mut self, expr: &Expr);

    /// Assert a clause (disjunction of literals).
    fn assert_clause(&mut self, clause: &[Literal]);

    /// Tag a violation literal with its assertion message so a failed check
    /// can be attributed.
    fn record_assertion(&mut self, violation: Literal, message: &str);

    /// Record io argument expressions for post-hoc trace reporting. Nothing
    /// is asserted.
    fn record_io(&mut self, step_id: u64, format: &str, args: &[Expr]);

    /// Final satisfiability query.
    fn solve(&mut self) -> SolveResult;
}

/// Convert the log into the decision procedure's accumulated state.
///
/// Validates atomic-section pairing first; a mismatch is fatal and surfaces
/// before any constraint is emitted. Stores compiled guard and condition
/// literals back onto the steps (each guard gets exactly one literal).
pub fn convert(equation: &mut Equation, dp: &mut dyn DecisionProcedure) -> Result<()> {
    equation.validate_atomic_sections()?;

    let mut converter = Converter {
        dp,
        compiled: HashMap::new(),
        io_counter: 0,
    };
    converter.convert_decls(equation);
    converter.convert_assignments(equation);
    converter.convert_guards(equation);
    converter.convert_assumptions(equation);
    converter.convert_assertions(equation);
    converter.convert_constraints(equation);
    converter.convert_io(equation);
    debug!(
        "converted {} steps ({} ignored)",
        equation.len(),
        equation.count_ignored()
    );
    Ok(())
}

struct Converter<'a> {
    dp: &'a mut dyn DecisionProcedure,
    /// Expression handle -> literal. Interning makes structurally equal
    /// guards share a handle, so the memo also deduplicates compilation.
    compiled: HashMap<Expr, Literal>,
    io_counter: usize,
}

impl Converter<'_> {
    fn compile(&mut self, expr: &Expr) -> Literal {
        if let Some(lit) = self.compiled.get(expr) {
            return *lit;
        }
        let lit = self.dp.compile(expr);
        self.compiled.insert(expr.clone(), lit);
        lit
    }

    /// Pass 1: declare fresh solver variables for every DECL.
    fn convert_decls(&mut self, equation: &Equation) {
        for step in equation.iter().filter(|s| !s.ignore) {
            if let StepKind::Decl { lhs } = &step.kind {
                self.dp.declare(lhs);
            }
        }
    }

    /// Pass 2: one implication `guard => lhs = rhs` per assignment. The
    /// left-hand symbols arrive SSA-renamed from the driver, so every write
    /// constrains a fresh version.
    fn convert_assignments(&mut self, equation: &Equation) {
        for step in equation.iter().filter(|s| !s.ignore) {
            if let StepKind::Assignment { lhs, rhs, .. } = &step.kind {
                let equality = Expr::eq(Expr::symbol(lhs.clone()), rhs.clone());
                self.dp.assert_expr(&Expr::implies(step.guard.clone(), equality));
            }
        }
    }

    /// Pass 3: compile every surviving step's guard, memoized.
    fn convert_guards(&mut self, equation: &mut Equation) {
        for index in 0..equation.len() {
            if equation.step(index).map(|s| s.ignore).unwrap_or(true) {
                continue;
            }
            let guard = equation.step(index).expect("index in range").guard.clone();
            let literal = self.compile(&guard);
            equation.step_mut(index).guard_literal = Some(literal);
        }
    }

    /// Pass 4: `guard => cond` per assumption.
    fn convert_assumptions(&mut self, equation: &mut Equation) {
        for index in 0..equation.len() {
            let step = equation.step(index).expect("index in range");
            if step.ignore {
                continue;
            }
            let StepKind::Assume { cond } = &step.kind else {
                continue;
            };
            let guard = step.guard.clone();
            let cond = cond.clone();
            let literal = self.compile(&cond);
            self.dp.assert_expr(&Expr::implies(guard, cond));
            equation.step_mut(index).cond_literal = Some(literal);
        }
    }

    /// Pass 5: refutation-style assertions. Each assertion contributes a
    /// violation literal `guard && !cond`, tagged with its message; the final
    /// clause demands at least one violation, so satisfiable means "an
    /// assertion can fail".
    fn convert_assertions(&mut self, equation: &mut Equation) {
        let mut violations = Vec::new();
        for index in 0..equation.len() {
            let step = equation.step(index).expect("index in range");
            if step.ignore {
                continue;
            }
            let StepKind::Assert { cond, message } = &step.kind else {
                continue;
            };
            let violation = Expr::and(step.guard.clone(), Expr::not(cond.clone()));
            let message = message.clone();
            let literal = self.compile(&violation);
            self.dp.record_assertion(literal, &message);
            violations.push(literal);
            equation.step_mut(index).cond_literal = Some(literal);
        }
        if !violations.is_empty() {
            self.dp.assert_clause(&violations);
        }
    }

    /// Pass 6: global constraints, unguarded.
    fn convert_constraints(&mut self, equation: &Equation) {
        for step in equation.iter().filter(|s| !s.ignore) {
            if let StepKind::Constraint { cond, .. } = &step.kind {
                self.dp.assert_expr(cond);
            }
        }
    }

    /// Pass 7: record io arguments. Constant arguments pass through;
    /// everything else is bound to a fresh io symbol by an emitted equality
    /// so the reported value is pinned by the model.
    fn convert_io(&mut self, equation: &mut Equation) {
        for index in 0..equation.len() {
            let step = equation.step(index).expect("index in range");
            if step.ignore {
                continue;
            }
            let (format, args) = match &step.kind {
                StepKind::Output { format, args } | StepKind::Input { format, args } => {
                    (format.clone(), args.clone())
                }
                _ => continue,
            };
            let step_id = step.id;
            let mut converted = Vec::with_capacity(args.len());
            for arg in &args {
                if matches!(arg.data(), ExprData::Constant(_)) {
                    converted.push(arg.clone());
                } else {
                    let name = format!("symex::io::{}", self.io_counter);
                    self.io_counter += 1;
                    let fresh = Expr::symbol(Symbol::new(name.clone(), name));
                    self.dp.assert_expr(&Expr::eq(fresh.clone(), arg.clone()));
                    converted.push(fresh);
                }
            }
            self.dp.record_io(step_id, &format, &converted);
            equation.step_mut(index).converted_io_args = converted;
        }
    }
}
