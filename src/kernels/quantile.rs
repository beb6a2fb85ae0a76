// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Quantile Kernels** - *Scores at fractional positions of sorted data*

use minarrow::Vec64;

use crate::errors::KernelError;
use crate::kernels::normalize::{Canonical, ensure_data};
use crate::kernels::sort::sort_float;
use crate::operators::Interpolation;
use crate::traits::dense_iter::{collect_valid_as_f64, collect_valid_f64};
use crate::values::Values;

/// Non-missing values of `x` as sorted `f64`. Datelike values use their
/// integer representation.
fn sorted_valid(x: &Values) -> Result<Vec64<f64>, KernelError> {
    if !(x.is_numeric() || x.is_datelike()) {
        return Err(KernelError::UnsupportedType(format!(
            "quantile: unsupported dtype {}",
            x.kind_name()
        )));
    }
    let mut v: Vec64<f64> = match ensure_data(x).canonical {
        Canonical::Int64(c) => collect_valid_as_f64(&c.data[..], c.null_mask.as_ref()),
        Canonical::UInt64(c) => collect_valid_as_f64(&c.data[..], c.null_mask.as_ref()),
        Canonical::Float64(c) => collect_valid_f64(&c.data, c.null_mask.as_ref()),
        _ => {
            return Err(KernelError::UnsupportedType(format!(
                "quantile: unsupported dtype {}",
                x.kind_name()
            )));
        }
    };
    sort_float(&mut v);
    Ok(v)
}

fn check_q(q: f64) -> Result<(), KernelError> {
    if (0.0..=1.0).contains(&q) {
        Ok(())
    } else {
        Err(KernelError::InvalidArguments(format!(
            "quantile: q must lie in [0, 1], got {}",
            q
        )))
    }
}

/// Score at fractional index `q * (n - 1)` of `sorted`.
fn score_at(sorted: &[f64], q: f64, interpolation: Interpolation) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let idx = q * (n - 1) as f64;
    let lo = idx.floor() as usize;
    let frac = idx - idx.floor();
    if frac == 0.0 {
        return sorted[lo];
    }
    let hi = (lo + 1).min(n - 1);
    match interpolation {
        Interpolation::Fraction => sorted[lo] + (sorted[hi] - sorted[lo]) * frac,
        Interpolation::Lower => sorted[lo],
        Interpolation::Higher => sorted[hi],
    }
}

/// Quantile `q` in `[0, 1]` of the non-missing values of `x`. Empty input
/// gives NaN.
pub fn quantile(x: &Values, q: f64, interpolation: Interpolation) -> Result<f64, KernelError> {
    check_q(q)?;
    let sorted = sorted_valid(x)?;
    Ok(score_at(&sorted, q, interpolation))
}

/// [`quantile`] for several `q`, sorting once.
pub fn quantiles(
    x: &Values,
    qs: &[f64],
    interpolation: Interpolation,
) -> Result<Vec64<f64>, KernelError> {
    for &q in qs {
        check_q(q)?;
    }
    let sorted = sorted_valid(x)?;
    Ok(qs.iter().map(|&q| score_at(&sorted, q, interpolation)).collect())
}
