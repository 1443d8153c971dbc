// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the equation core.
//!
//! `MalformedStep`, `UnresolvedDependency` and `AtomicSectionMismatch` signal
//! bugs in trace construction upstream and abort the check; `OutOfRange` is a
//! checked precondition the caller may recover from.

use crate::data::{Ident, SourceLoc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EquationError {
    /// A precondition on an append operation was violated, e.g. an assignment
    /// whose left-hand side is not a plain symbol reference.
    #[error("malformed step at {at}: {reason}")]
    MalformedStep { at: SourceLoc, reason: String },

    /// Step index past the end of the log.
    #[error("step index {index} out of range, log has {len} steps")]
    OutOfRange { index: usize, len: usize },

    /// An assertion condition references an identifier with no defining step
    /// anywhere in the log. The trace is inconsistent.
    #[error("assertion depends on `{ident}` which no step defines")]
    UnresolvedDependency { ident: Ident },

    /// An ATOMIC_BEGIN without its matching ATOMIC_END, or vice versa.
    #[error("atomic section {section} mismatched on thread {thread}")]
    AtomicSectionMismatch { section: u32, thread: usize },
}

pub type Result<T> = std::result::Result<T, EquationError>;
