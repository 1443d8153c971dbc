// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

pub mod expressions;
pub mod naming;
pub mod steps;

pub use expressions::{BinOp, Constant, Env, Expr, ExprData, Ident, Symbol, UnOp};
pub use naming::NamingContext;
pub use steps::{
    AssignmentKind, BarrierKind, SourceLoc, Step, StepKind, SyncKind, NEXT_THREAD_ID,
    THREADS_EXITED,
};
