// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Propositional layer of the decision-procedure boundary.
//!
//! The equation core talks to an external solver in terms of [`Literal`]s:
//! opaque handles to solver variables with a sign. The solver itself lives
//! outside this workspace; this crate only fixes the vocabulary shared by the
//! converter and any backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// A propositional literal: a solver variable number plus a sign.
///
/// Variable 0 is reserved for the constant literal, so `TRUE` and `FALSE`
/// never collide with a variable handed out by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    var: u32,
    positive: bool,
}

impl Literal {
    /// The constant-true literal.
    pub const TRUE: Literal = Literal { var: 0, positive: true };
    /// The constant-false literal.
    pub const FALSE: Literal = Literal { var: 0, positive: false };

    /// A positive literal for solver variable `var`. `var` must be nonzero.
    pub fn positive(var: u32) -> Self {
        debug_assert!(var != 0, "variable 0 is reserved for constants");
        Literal { var, positive: true }
    }

    /// A negative literal for solver variable `var`. `var` must be nonzero.
    pub fn negative(var: u32) -> Self {
        debug_assert!(var != 0, "variable 0 is reserved for constants");
        Literal { var, positive: false }
    }

    pub fn var(self) -> u32 {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }

    pub fn is_constant(self) -> bool {
        self.var == 0
    }

    pub fn is_true(self) -> bool {
        self == Literal::TRUE
    }

    pub fn is_false(self) -> bool {
        self == Literal::FALSE
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            positive: !self.positive,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            return write!(f, "{}", self.positive);
        }
        if !self.positive {
            write!(f, "!")?;
        }
        write!(f, "l{}", self.var)
    }
}

/// Outcome of a satisfiability query.
///
/// `Unknown` covers backend resource exhaustion; callers must report it as
/// such and never fold it into `Unsatisfiable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveResult {
    Satisfiable,
    Unsatisfiable,
    Unknown,
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveResult::Satisfiable => "sat",
            SolveResult::Unsatisfiable => "unsat",
            SolveResult::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Hands out fresh solver variable numbers, starting above the reserved
/// constant variable.
#[derive(Debug, Default)]
pub struct VariableAllocator {
    next: u32,
}

impl VariableAllocator {
    pub fn new() -> Self {
        VariableAllocator { next: 0 }
    }

    /// Allocate a fresh positive literal.
    pub fn fresh(&mut self) -> Literal {
        self.next += 1;
        Literal::positive(self.next)
    }

    /// Number of variables allocated so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}
