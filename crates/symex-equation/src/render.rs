// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Per-step textual rendering for counterexample reporting.
//!
//! Read-only: consumers iterate the full log, ignored steps included, and
//! render each step against a naming context.

use crate::data::expressions::Symbol;
use crate::data::naming::NamingContext;
use crate::data::steps::{Step, StepKind};
use crate::equation::Equation;
use itertools::Itertools;
use std::fmt::Write;

impl Step {
    /// One-line rendering of this step.
    pub fn render(&self, names: &NamingContext) -> String {
        let name = |s: &Symbol| names.name_of(&s.original).to_string();
        let body = match &self.kind {
            StepKind::Assignment { lhs, rhs, .. } => {
                format!("ASSIGNMENT {} := {}", name(lhs), rhs)
            }
            StepKind::Decl { lhs } => format!("DECL {}", name(lhs)),
            StepKind::Dead { lhs } => format!("DEAD {}", name(lhs)),
            StepKind::SharedRead { lhs, atomic_section } => {
                format!("SHARED_READ {} (section {})", name(lhs), atomic_section)
            }
            StepKind::SharedWrite { lhs, atomic_section } => {
                format!("SHARED_WRITE {} (section {})", name(lhs), atomic_section)
            }
            StepKind::FunctionCall { callee, joined_thread, .. } => match joined_thread {
                Some(joined) => format!("FUNCTION_CALL {} (joins {})", callee, joined),
                None => format!("FUNCTION_CALL {}", callee),
            },
            StepKind::FunctionReturn { callee } => format!("FUNCTION_RETURN {}", callee),
            StepKind::Location => "LOCATION".to_string(),
            StepKind::Output { format, args } => {
                format!("OUTPUT \"{}\" {}", format, args.iter().join(", "))
            }
            StepKind::Input { format, args } => {
                format!("INPUT \"{}\" {}", format, args.iter().join(", "))
            }
            StepKind::Assume { cond } => format!("ASSUME {}", cond),
            StepKind::Assert { cond, message } => format!("ASSERT {} // {}", cond, message),
            StepKind::Constraint { cond, message } => {
                format!("CONSTRAINT {} // {}", cond, message)
            }
            StepKind::Spawn => "SPAWN".to_string(),
            StepKind::MemoryBarrier { barrier } => format!("MEMORY_BARRIER {:?}", barrier),
            StepKind::AtomicBegin { atomic_section } => {
                format!("ATOMIC_BEGIN {}", atomic_section)
            }
            StepKind::AtomicEnd { atomic_section } => format!("ATOMIC_END {}", atomic_section),
        };
        let flag = if self.ignore { " [ignored]" } else { "" };
        format!("#{} [{}] guard {} {}{}", self.id, self.source, self.guard, body, flag)
    }
}

impl Equation {
    /// Full-trace dump, ignored steps included.
    pub fn render_trace(&self, names: &NamingContext) -> String {
        let mut out = String::new();
        for step in self.iter() {
            let _ = writeln!(out, "{}", step.render(names));
        }
        out
    }
}
