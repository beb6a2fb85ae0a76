// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Diff Kernels** - *Lagged first differences along an axis*
//!
//! `out[i] = arr[i] - arr[i - n]` along `axis`. The `|n|` positions at the
//! leading edge (`n > 0`) or trailing edge (`n < 0`) have no partner and are
//! missing. Output dtypes widen so missing is representable:
//!
//! | input      | output          |
//! |------------|-----------------|
//! | bool       | object (ints, NaN) |
//! | int*       | float64         |
//! | float32/64 | same width      |
//! | datetime   | timedelta, NaT  |
//! | timedelta  | timedelta, NaT  |
//! | object     | object          |

use crate::config::INT64_NAT;
use crate::errors::KernelError;
use crate::ndarray::{NdArray, NdValues, indices};
use crate::values::Scalar;

/// Shared body. `sub(current, lagged)` produces one output element.
fn diff_axis<T, U: Clone>(
    arr: &NdArray<T>,
    n: isize,
    axis: usize,
    na: U,
    sub: impl Fn(&T, &T) -> Result<U, KernelError>,
) -> Result<NdArray<U>, KernelError> {
    let len = arr.axis_len(axis)?;
    let mut out = NdArray::filled(arr.shape().to_vec(), arr.order(), na);
    if n.unsigned_abs() >= len {
        return Ok(out);
    }
    let lag = |j: usize| -> Option<usize> {
        let k = j as isize - n;
        (k >= 0 && (k as usize) < len).then_some(k as usize)
    };

    // Contiguous rows: 1-D, or row-major 2-D along the last axis.
    if arr.ndim() == 1 || (arr.ndim() == 2 && arr.is_row_major() && axis == 1) {
        let src = arr.as_slice();
        let dst = out.as_mut_slice();
        for (row_src, row_dst) in src.chunks(len).zip(dst.chunks_mut(len)) {
            for j in 0..len {
                if let Some(k) = lag(j) {
                    row_dst[j] = sub(&row_src[j], &row_src[k])?;
                }
            }
        }
        return Ok(out);
    }

    let mut lag_index = vec![0usize; arr.ndim()];
    for idx in indices(arr.shape()) {
        if let Some(k) = lag(idx[axis]) {
            lag_index.copy_from_slice(&idx);
            lag_index[axis] = k;
            *out.get_mut(&idx) = sub(arr.get(&idx), arr.get(&lag_index))?;
        }
    }
    Ok(out)
}

#[inline]
fn int_sub<T: Copy + Into<i128>>(a: &T, b: &T) -> Result<f64, KernelError> {
    Ok(((*a).into() - (*b).into()) as f64)
}

#[inline]
fn nat_sub(a: &i64, b: &i64) -> Result<i64, KernelError> {
    Ok(if *a == INT64_NAT || *b == INT64_NAT {
        INT64_NAT
    } else {
        a.wrapping_sub(*b)
    })
}

/// Difference of two object elements.
fn scalar_sub(a: &Scalar, b: &Scalar) -> Result<Scalar, KernelError> {
    if a.is_na() || b.is_na() {
        return Ok(Scalar::Float(f64::NAN));
    }
    let numeric = |s: &Scalar| match s {
        Scalar::Bool(v) => Some(Scalar::Int(*v as i64)),
        Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => Some(s.clone()),
        _ => None,
    };
    match (a, b) {
        (Scalar::Timestamp(x), Scalar::Timestamp(y)) => Ok(Scalar::Timedelta(x.wrapping_sub(*y))),
        (Scalar::Timestamp(x), Scalar::Timedelta(y)) => Ok(Scalar::Timestamp(x.wrapping_sub(*y))),
        (Scalar::Timedelta(x), Scalar::Timedelta(y)) => Ok(Scalar::Timedelta(x.wrapping_sub(*y))),
        _ => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => Ok(match (x.as_i128(), y.as_i128(), &x, &y) {
                (_, _, Scalar::Float(_), _) | (_, _, _, Scalar::Float(_)) => {
                    Scalar::Float(x.as_f64().unwrap_or(f64::NAN) - y.as_f64().unwrap_or(f64::NAN))
                }
                (Some(p), Some(q), _, _) => match i64::try_from(p - q) {
                    Ok(v) => Scalar::Int(v),
                    Err(_) => Scalar::Float((p - q) as f64),
                },
                _ => Scalar::Float(f64::NAN),
            }),
            _ => Err(KernelError::TypeMismatch(format!(
                "diff: unsupported operand types for -: {} and {}",
                a, b
            ))),
        },
    }
}

/// First discrete difference of `arr` with lag `n` along `axis`.
pub fn diff(arr: &NdValues, n: isize, axis: usize) -> Result<NdValues, KernelError> {
    Ok(match arr {
        NdValues::Bool(a) => NdValues::Object(diff_axis(a, n, axis, Scalar::Float(f64::NAN), |x, y| {
            Ok(Scalar::Int(*x as i64 - *y as i64))
        })?),
        NdValues::Int8(a) => NdValues::Float64(diff_axis(a, n, axis, f64::NAN, int_sub)?),
        NdValues::Int16(a) => NdValues::Float64(diff_axis(a, n, axis, f64::NAN, int_sub)?),
        NdValues::Int32(a) => NdValues::Float64(diff_axis(a, n, axis, f64::NAN, int_sub)?),
        NdValues::Int64(a) => NdValues::Float64(diff_axis(a, n, axis, f64::NAN, int_sub)?),
        NdValues::UInt64(a) => NdValues::Float64(diff_axis(a, n, axis, f64::NAN, int_sub)?),
        NdValues::Float32(a) => {
            NdValues::Float32(diff_axis(a, n, axis, f32::NAN, |x, y| Ok(x - y))?)
        }
        NdValues::Float64(a) => {
            NdValues::Float64(diff_axis(a, n, axis, f64::NAN, |x, y| Ok(x - y))?)
        }
        NdValues::Datetime(a) | NdValues::Timedelta(a) => {
            NdValues::Timedelta(diff_axis(a, n, axis, INT64_NAT, nat_sub)?)
        }
        NdValues::Object(a) => {
            NdValues::Object(diff_axis(a, n, axis, Scalar::Float(f64::NAN), scalar_sub)?)
        }
    })
}
