// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Analyses over a completed step log.
//!
//! All of these are rebuildable derived views; none is maintained
//! incrementally during append.

mod address_map;
mod rely;
mod slice;

pub use address_map::{AddressMap, LocationAccesses};
pub use rely::RelySet;
pub use slice::slice;

use crate::equation::Equation;
use crate::error::Result;

/// Run the full reduction pipeline on a completed log: rebuild the lookup
/// maps, close the rely set, and flag ignorable steps.
pub fn reduce(equation: &mut Equation) -> Result<RelySet> {
    let maps = equation.compute_maps();
    let rely = RelySet::compute(equation, &maps)?;
    slice(equation, &rely);
    Ok(rely)
}
