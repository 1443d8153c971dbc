// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Naming context for trace rendering.
//!
//! Counterexample reporting wants source-level names where they are known;
//! everything else falls back to the raw identifier.

use crate::data::expressions::Ident;
use std::collections::BTreeMap;

/// Maps identifiers to display names for per-step rendering.
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    display_names: BTreeMap<Ident, String>,
}

impl NamingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name for an identifier.
    pub fn register(&mut self, ident: Ident, display: impl Into<String>) {
        self.display_names.insert(ident, display.into());
    }

    /// Display name for an identifier, falling back to the identifier itself.
    pub fn name_of<'a>(&'a self, ident: &'a Ident) -> &'a str {
        self.display_names
            .get(ident)
            .map(String::as_str)
            .unwrap_or_else(|| ident.as_str())
    }
}
