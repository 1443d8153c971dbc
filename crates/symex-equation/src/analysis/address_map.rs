// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Per-location grouping of shared memory accesses.
//!
//! A memory-model encoder consumes this structure: coherence and fence axioms
//! are keyed on the reads and writes of each location in program order. The
//! builder is a single linear pass; within each list, log order is preserved.

use crate::data::expressions::Ident;
use crate::data::steps::StepKind;
use crate::equation::Equation;
use log::debug;
use std::collections::BTreeMap;

/// Ordered read and write step indices of one shared location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationAccesses {
    pub reads: Vec<usize>,
    pub writes: Vec<usize>,
}

/// Shared-location identifier (pre-renaming) -> ordered accesses.
///
/// Holds indices into the log it was built from; stale after any mutation.
#[derive(Debug, Default)]
pub struct AddressMap {
    entries: BTreeMap<Ident, LocationAccesses>,
}

impl AddressMap {
    /// Group every shared read and write in the completed log by location.
    pub fn build(equation: &Equation) -> Self {
        let mut entries: BTreeMap<Ident, LocationAccesses> = BTreeMap::new();
        for (index, step) in equation.iter().enumerate() {
            match &step.kind {
                StepKind::SharedRead { lhs, .. } => {
                    entries.entry(lhs.original.clone()).or_default().reads.push(index);
                }
                StepKind::SharedWrite { lhs, .. } => {
                    entries.entry(lhs.original.clone()).or_default().writes.push(index);
                }
                _ => {}
            }
        }
        debug!("address map built for {} shared locations", entries.len());
        AddressMap { entries }
    }

    /// Accesses of one location. A location with reads but no writes yields
    /// an empty write list, not an error.
    pub fn accesses(&self, location: &Ident) -> Option<&LocationAccesses> {
        self.entries.get(location)
    }

    pub fn reads(&self, location: &Ident) -> &[usize] {
        self.entries.get(location).map(|a| a.reads.as_slice()).unwrap_or(&[])
    }

    pub fn writes(&self, location: &Ident) -> &[usize] {
        self.entries.get(location).map(|a| a.writes.as_slice()).unwrap_or(&[])
    }

    /// Iterate locations in deterministic (identifier) order.
    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &LocationAccesses)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
