// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Trace slicing.
//!
//! Flags steps the rely analysis proved irrelevant to the checked properties.
//! Steps are never removed; sequence ids and log order stay stable so the
//! full trace can still be reconstructed for reporting. The converter skips
//! flagged steps.

use crate::analysis::rely::RelySet;
use crate::data::steps::StepKind;
use crate::equation::Equation;
use log::debug;

/// Mark every step outside the rely-reachable set as ignorable.
///
/// Definition-bearing steps survive iff their pre-renaming identifier is in
/// the rely set. Location steps carry no effect and are always ignorable.
/// Property steps and the concurrency skeleton (calls, returns, spawns,
/// barriers, atomic brackets) are never flagged. Idempotent: a second run
/// over the same rely set computes the same flags.
pub fn slice(equation: &mut Equation, rely: &RelySet) {
    let mut ignored = 0usize;
    for step in equation.iter_mut() {
        let ignore = match &step.kind {
            StepKind::Assignment { lhs, .. }
            | StepKind::Decl { lhs }
            | StepKind::Dead { lhs }
            | StepKind::SharedRead { lhs, .. }
            | StepKind::SharedWrite { lhs, .. } => !rely.contains(&lhs.original),
            StepKind::Location => true,
            _ => false,
        };
        step.ignore = ignore;
        if ignore {
            ignored += 1;
        }
    }
    debug!(
        "slicing ignored {} of {} steps",
        ignored,
        equation.len()
    );
}
