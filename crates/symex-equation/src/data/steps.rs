// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Typed trace steps.
//!
//! One step records one semantically atomic event of the subject program's
//! execution, tagged with the thread and program point it originated from and
//! the path condition (guard) under which it executes. The converter matches
//! exhaustively on [`StepKind`], so adding a backend pass means one new match,
//! not a method on every variant.

use crate::data::expressions::{Expr, Ident, Symbol};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use symex_prop::Literal;

/// Identifier of the subject program's thread-scheduling counter. Shared
/// accesses to it encode scheduling metadata, not program data, and never
/// grow the rely set.
pub const NEXT_THREAD_ID: &str = "__symex::next_thread_id";

/// Identifier of the subject program's exited-threads counter. Same standing
/// as [`NEXT_THREAD_ID`].
pub const THREADS_EXITED: &str = "__symex::threads_exited";

/// Where a step originated: thread index and program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    pub thread: usize,
    pub pc: usize,
}

impl SourceLoc {
    pub fn new(thread: usize, pc: usize) -> Self {
        SourceLoc { thread, pc }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread {} pc {}", self.thread, self.pc)
    }
}

/// How an assignment arose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentKind {
    /// Programmer-visible state update.
    Visible,
    /// Internal bookkeeping introduced by the driver.
    Hidden,
    /// Phi node merging control-flow branches.
    Phi,
}

/// Which fence the memory-barrier event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarrierKind {
    /// Full fence: orders all preceding accesses before all subsequent ones.
    Full,
    /// Lightweight fence (lwfence).
    LightWeight,
    /// Instruction-synchronization fence (isync).
    InstructionSync,
}

/// Recognized synchronization calls, resolved once when the call step is
/// appended. Replaces per-query string comparison against callee names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    None,
    MutexLock,
    MutexUnlock,
    AtomicAcquire,
    AtomicRelease,
    ThreadCreate,
    ThreadJoin,
}

static SYNC_CALLS: Lazy<BTreeMap<&'static str, SyncKind>> = Lazy::new(|| {
    BTreeMap::from([
        ("pthread_mutex_lock", SyncKind::MutexLock),
        ("pthread_mutex_unlock", SyncKind::MutexUnlock),
        ("pthread_create", SyncKind::ThreadCreate),
        ("pthread_join", SyncKind::ThreadJoin),
        ("__VERIFIER_atomic_begin", SyncKind::MutexLock),
        ("__VERIFIER_atomic_end", SyncKind::MutexUnlock),
        ("__VERIFIER_atomic_acquire", SyncKind::AtomicAcquire),
        ("__VERIFIER_atomic_release", SyncKind::AtomicRelease),
    ])
});

impl SyncKind {
    /// Classify a callee name. Language prefixes such as `c::` are ignored.
    pub fn classify(callee: &str) -> SyncKind {
        let bare = callee.rsplit("::").next().unwrap_or(callee);
        SYNC_CALLS.get(bare).copied().unwrap_or(SyncKind::None)
    }

    /// Whether this call acquires exclusive access (lock or atomic acquire).
    pub fn is_acquire(self) -> bool {
        matches!(self, SyncKind::MutexLock | SyncKind::AtomicAcquire)
    }

    /// Whether this call releases exclusive access.
    pub fn is_release(self) -> bool {
        matches!(self, SyncKind::MutexUnlock | SyncKind::AtomicRelease)
    }
}

/// Variant payloads of a trace step.
#[derive(Debug, Clone)]
pub enum StepKind {
    Assignment {
        lhs: Symbol,
        rhs: Expr,
        kind: AssignmentKind,
    },
    Decl {
        lhs: Symbol,
    },
    Dead {
        lhs: Symbol,
    },
    SharedRead {
        lhs: Symbol,
        atomic_section: u32,
    },
    SharedWrite {
        lhs: Symbol,
        atomic_section: u32,
    },
    FunctionCall {
        callee: Ident,
        sync: SyncKind,
        /// For thread join: which thread is being joined.
        joined_thread: Option<Ident>,
    },
    FunctionReturn {
        callee: Ident,
    },
    Location,
    Output {
        format: String,
        args: Vec<Expr>,
    },
    Input {
        format: String,
        args: Vec<Expr>,
    },
    Assume {
        cond: Expr,
    },
    Assert {
        cond: Expr,
        message: String,
    },
    Constraint {
        cond: Expr,
        message: String,
    },
    Spawn,
    MemoryBarrier {
        barrier: BarrierKind,
    },
    AtomicBegin {
        atomic_section: u32,
    },
    AtomicEnd {
        atomic_section: u32,
    },
}

/// One recorded event of the symbolic execution.
///
/// Steps are appended once and never removed; slicing only sets `ignore`.
/// `guard_literal` and `cond_literal` are filled by the converter (each
/// compiled guard has exactly one literal), `converted_io_args` by the io
/// pass.
#[derive(Debug, Clone)]
pub struct Step {
    /// Strictly increasing, unique within one equation.
    pub id: u64,
    pub source: SourceLoc,
    pub guard: Expr,
    pub guard_literal: Option<Literal>,
    pub cond_literal: Option<Literal>,
    pub converted_io_args: Vec<Expr>,
    pub ignore: bool,
    pub rely: bool,
    pub kind: StepKind,
}

impl Step {
    pub(crate) fn new(id: u64, source: SourceLoc, guard: Expr, kind: StepKind) -> Self {
        Step {
            id,
            source,
            guard,
            guard_literal: None,
            cond_literal: None,
            converted_io_args: Vec::new(),
            ignore: false,
            rely: false,
            kind,
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, StepKind::Assignment { .. })
    }

    pub fn is_decl(&self) -> bool {
        matches!(self.kind, StepKind::Decl { .. })
    }

    pub fn is_shared_read(&self) -> bool {
        matches!(self.kind, StepKind::SharedRead { .. })
    }

    pub fn is_shared_write(&self) -> bool {
        matches!(self.kind, StepKind::SharedWrite { .. })
    }

    pub fn is_assume(&self) -> bool {
        matches!(self.kind, StepKind::Assume { .. })
    }

    pub fn is_assert(&self) -> bool {
        matches!(self.kind, StepKind::Assert { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self.kind, StepKind::Constraint { .. })
    }

    pub fn is_location(&self) -> bool {
        matches!(self.kind, StepKind::Location)
    }

    pub fn is_memory_barrier(&self) -> bool {
        matches!(self.kind, StepKind::MemoryBarrier { .. })
    }

    pub fn is_thread_create(&self) -> bool {
        matches!(
            self.kind,
            StepKind::FunctionCall { sync: SyncKind::ThreadCreate, .. }
        )
    }

    pub fn is_thread_join(&self) -> bool {
        matches!(
            self.kind,
            StepKind::FunctionCall { sync: SyncKind::ThreadJoin, .. }
        )
    }

    pub fn is_atomic_acquire(&self) -> bool {
        match &self.kind {
            StepKind::FunctionCall { sync, .. } => sync.is_acquire(),
            _ => false,
        }
    }

    pub fn is_atomic_release(&self) -> bool {
        match &self.kind {
            StepKind::FunctionCall { sync, .. } => sync.is_release(),
            _ => false,
        }
    }

    /// The symbol this step defines (assignment target, declared variable, or
    /// accessed shared location), if any.
    pub fn defined_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            StepKind::Assignment { lhs, .. }
            | StepKind::Decl { lhs }
            | StepKind::Dead { lhs }
            | StepKind::SharedRead { lhs, .. }
            | StepKind::SharedWrite { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    /// Pre-renaming identity of the defined symbol, if any.
    pub fn defined_original(&self) -> Option<&Ident> {
        self.defined_symbol().map(|s| &s.original)
    }

    /// The boolean condition carried by Assume/Assert/Constraint steps.
    pub fn condition(&self) -> Option<&Expr> {
        match &self.kind {
            StepKind::Assume { cond }
            | StepKind::Assert { cond, .. }
            | StepKind::Constraint { cond, .. } => Some(cond),
            _ => None,
        }
    }

    /// Whether this is a shared access to one of the thread-lifecycle
    /// counters (scheduling metadata, not program data).
    pub fn is_thread_bookkeeping(&self) -> bool {
        match &self.kind {
            StepKind::SharedRead { lhs, .. } | StepKind::SharedWrite { lhs, .. } => {
                let name = lhs.original.as_str();
                name == NEXT_THREAD_ID || name == THREADS_EXITED
            }
            _ => false,
        }
    }
}
