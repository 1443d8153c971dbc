// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! In-memory decision procedure for tests and debugging.
//!
//! Records everything the converter emits without deciding anything:
//! `solve` answers `Unknown`, the honest result for a backend that does no
//! search. [`RecordingProcedure::holds_under`] evaluates the accumulated
//! state under a concrete environment, which lets tests check satisfiability
//! questions by model enumeration.

use crate::convert::DecisionProcedure;
use crate::data::expressions::{Constant, Env, Expr, Symbol};
use std::collections::HashMap;
use symex_prop::{Literal, SolveResult, VariableAllocator};

#[derive(Debug, Default)]
pub struct RecordingProcedure {
    alloc: VariableAllocator,
    /// Expression -> literal, so repeated compilation is stable.
    compiled: HashMap<Expr, Literal>,
    /// Literal variable -> the expression it stands for.
    literal_exprs: HashMap<u32, Expr>,
    pub declarations: Vec<Symbol>,
    pub constraints: Vec<Expr>,
    pub clauses: Vec<Vec<Literal>>,
    pub assertion_tags: Vec<(Literal, String)>,
    pub io_records: Vec<(u64, String, Vec<Expr>)>,
}

impl RecordingProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    /// The expression a compiled literal stands for.
    pub fn expr_of(&self, literal: Literal) -> Option<&Expr> {
        self.literal_exprs.get(&literal.var())
    }

    /// Evaluate the accumulated constraints and clauses under a concrete
    /// environment. `None` if some expression cannot be evaluated (unbound
    /// symbol, type mismatch).
    pub fn holds_under(&self, env: &Env) -> Option<bool> {
        for constraint in &self.constraints {
            match constraint.eval(env)? {
                Constant::Bool(true) => {}
                Constant::Bool(false) => return Some(false),
                Constant::Int(_) => return None,
            }
        }
        for clause in &self.clauses {
            let mut satisfied = false;
            for literal in clause {
                let value = if literal.is_constant() {
                    literal.is_true()
                } else {
                    let expr = self.literal_exprs.get(&literal.var())?;
                    let b = expr.eval(env)?.as_bool()?;
                    if literal.is_positive() { b } else { !b }
                };
                if value {
                    satisfied = true;
                    break;
                }
            }
            if !satisfied {
                return Some(false);
            }
        }
        Some(true)
    }

    /// Messages of assertions whose violation literal holds under `env`.
    pub fn violated_assertions(&self, env: &Env) -> Vec<&str> {
        self.assertion_tags
            .iter()
            .filter(|(literal, _)| {
                self.expr_of(*literal)
                    .and_then(|e| e.eval(env))
                    .and_then(|c| c.as_bool())
                    .unwrap_or(false)
            })
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl DecisionProcedure for RecordingProcedure {
    fn declare(&mut self, symbol: &Symbol) {
        self.declarations.push(symbol.clone());
    }

    fn compile(&mut self, expr: &Expr) -> Literal {
        if let Some(b) = expr.as_bool_constant() {
            return if b { Literal::TRUE } else { Literal::FALSE };
        }
        if let Some(lit) = self.compiled.get(expr) {
            return *lit;
        }
        let lit = self.alloc.fresh();
        self.compiled.insert(expr.clone(), lit);
        self.literal_exprs.insert(lit.var(), expr.clone());
        lit
    }

    fn assert_expr(&mut self, expr: &Expr) {
        self.constraints.push(expr.clone());
    }

    fn assert_clause(&mut self, clause: &[Literal]) {
        self.clauses.push(clause.to_vec());
    }

    fn record_assertion(&mut self, violation: Literal, message: &str) {
        self.assertion_tags.push((violation, message.to_string()));
    }

    fn record_io(&mut self, step_id: u64, format: &str, args: &[Expr]) {
        self.io_records.push((step_id, format.to_string(), args.to_vec()));
    }

    fn solve(&mut self) -> SolveResult {
        // no search happens here; anything else would misreport
        SolveResult::Unknown
    }
}
