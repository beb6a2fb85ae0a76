// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Checked Arithmetic** - *Overflow-detecting int64 addition*
//!
//! Adds an int64 array and a broadcast scalar or array, failing with
//! [`KernelError::Overflow`] if any non-missing pair would leave the int64
//! range. The check is exact and is made before any output is written.
//! Missing positions are never checked; they add with wrapping semantics
//! because their values are never observed.

use minarrow::Vec64;
use num_traits::WrappingAdd;

use crate::errors::{KernelError, log_length_mismatch};

/// Right-hand operand of [`checked_add_with_arr`].
#[derive(Debug, Clone, Copy)]
pub enum Addend<'a> {
    Scalar(i64),
    Array(&'a [i64]),
}

/// Missing-value mask for the right-hand operand. `true` marks a missing slot.
#[derive(Debug, Clone, Copy)]
pub enum MaskArg<'a> {
    Scalar(bool),
    Array(&'a [bool]),
}

impl Addend<'_> {
    #[inline(always)]
    fn at(&self, i: usize) -> i64 {
        match self {
            Addend::Scalar(v) => *v,
            Addend::Array(a) => a[i],
        }
    }
}

impl MaskArg<'_> {
    #[inline(always)]
    fn at(&self, i: usize) -> bool {
        match self {
            MaskArg::Scalar(v) => *v,
            MaskArg::Array(a) => a[i],
        }
    }
}

#[inline(always)]
fn overflows(a: i64, b: i64) -> bool {
    (b > 0 && a > i64::MAX - b) || (b < 0 && a < i64::MIN - b)
}

/// `arr + b` with exact overflow detection over non-missing positions.
///
/// `arr_mask` and `b_mask` mark missing slots with `true`; absent masks mean
/// nothing is missing. Array operands and masks must match `arr`'s length.
pub fn checked_add_with_arr(
    arr: &[i64],
    b: Addend<'_>,
    arr_mask: Option<&[bool]>,
    b_mask: Option<MaskArg<'_>>,
) -> Result<Vec64<i64>, KernelError> {
    let n = arr.len();
    if let Addend::Array(bs) = b {
        if bs.len() != n {
            return Err(KernelError::LengthMismatch(log_length_mismatch(
                "checked_add_with_arr".to_string(),
                n,
                bs.len(),
            )));
        }
    }
    if let Some(m) = arr_mask {
        if m.len() != n {
            return Err(KernelError::LengthMismatch(log_length_mismatch(
                "checked_add_with_arr (arr_mask)".to_string(),
                n,
                m.len(),
            )));
        }
    }
    if let Some(MaskArg::Array(m)) = b_mask {
        if m.len() != n {
            return Err(KernelError::LengthMismatch(log_length_mismatch(
                "checked_add_with_arr (b_mask)".to_string(),
                n,
                m.len(),
            )));
        }
    }

    let is_na = |i: usize| arr_mask.is_some_and(|m| m[i]) || b_mask.is_some_and(|m| m.at(i));

    if let Some(i) = (0..n).find(|&i| !is_na(i) && overflows(arr[i], b.at(i))) {
        return Err(KernelError::Overflow(format!(
            "Overflow in int64 addition at position {}: {} + {}",
            i,
            arr[i],
            b.at(i)
        )));
    }

    Ok((0..n).map(|i| WrappingAdd::wrapping_add(&arr[i], &b.at(i))).collect())
}
