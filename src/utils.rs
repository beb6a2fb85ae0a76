// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Utility Functions** - *Shared output builders and argument checks*

use std::marker::PhantomData;

use minarrow::{Bitmask, BooleanArray};

use crate::errors::KernelError;

/// Packs a dense `bool` slice into a `BooleanArray` with no null mask.
#[inline]
pub fn boolean_array(bools: &[bool]) -> BooleanArray<()> {
    BooleanArray {
        data: Bitmask::from_bools(bools),
        null_mask: None,
        len: bools.len(),
        _phantom: PhantomData,
    }
}

/// Checks two lengths are equal.
///
/// # Returns
/// `Ok(())` if lengths are equal, otherwise `KernelError::LengthMismatch` with diagnostic details.
#[inline(always)]
pub fn confirm_equal_len(label: &str, a: usize, b: usize) -> Result<(), KernelError> {
    if a != b {
        return Err(KernelError::LengthMismatch(format!(
            "{}: length mismatch (lhs: {}, rhs: {})",
            label, a, b
        )));
    }
    Ok(())
}
