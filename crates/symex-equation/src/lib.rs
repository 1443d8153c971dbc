// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Trace/equation construction core of a bounded model checker.
//!
//! The symbolic-execution driver appends typed events to an [`Equation`];
//! once execution completes, the analyses group shared accesses per location
//! ([`AddressMap`]), close the rely set ([`RelySet`]), flag irrelevant steps
//! ([`analysis::slice`]), and [`convert`] emits guarded constraints to an
//! external [`DecisionProcedure`]. This crate does NOT implement a solver,
//! parse source programs, or encode memory-model axioms - those belong to
//! external collaborators.

pub mod analysis;
pub mod convert;
mod data;
mod equation;
mod error;
mod render;

// Expression layer
pub use data::expressions::{BinOp, Constant, Env, Expr, ExprData, Ident, Symbol, UnOp};

// Step model
pub use data::steps::{
    AssignmentKind, BarrierKind, SourceLoc, Step, StepKind, SyncKind, NEXT_THREAD_ID,
    THREADS_EXITED,
};

// Naming for trace rendering
pub use data::naming::NamingContext;

// Step log and derived lookup caches
pub use equation::{DefinitionMaps, Equation};

// Analyses
pub use analysis::{AddressMap, LocationAccesses, RelySet};

// Conversion boundary
pub use convert::{convert, DecisionProcedure, RecordingProcedure};

// Errors
pub use error::{EquationError, Result};
