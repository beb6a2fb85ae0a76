// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Take Kernels** - *Indexer-driven gather along an axis*
//!
//! Gathers positions of an N-D buffer along one axis, writing a fill value
//! wherever the indexer holds `-1`.
//!
//! ## Promotion
//! When at least one `-1` is present, [`maybe_promote`] picks an output dtype
//! that can represent the fill value (int + NA becomes float64, bool + anything
//! else becomes object, datelike + NA keeps the dtype with NaT). Without `-1`
//! entries the input dtype is kept and the fill value is never inspected.
//!
//! ## Dispatch
//! Kernels are looked up by `(input dtype, output dtype)` in a static table.
//! Each kernel has contiguous 1-D and 2-D paths and a strided N-D fallback.
//! Pairs missing from the table are cast to the output dtype first and then
//! run through the `(out, out)` kernel.

use std::borrow::Cow;

use log::debug;

use crate::config::INT64_NAT;
use crate::errors::KernelError;
use crate::ndarray::{MemoryOrder, NdArray, NdDtype, NdValues, indices};
use crate::traits::element::FromScalar;
use crate::values::Scalar;

/// Output dtype and converted fill value for writing `fill` into a `dtype` buffer.
pub fn maybe_promote(dtype: NdDtype, fill: &Scalar) -> (NdDtype, Scalar) {
    use NdDtype::*;

    if fill.is_na() {
        return match dtype {
            Int8 | Int16 | Int32 | Int64 | UInt64 => (Float64, Scalar::Float(f64::NAN)),
            Float32 | Float64 => (dtype, Scalar::Float(f64::NAN)),
            Datetime => (Datetime, Scalar::Timestamp(INT64_NAT)),
            Timedelta => (Timedelta, Scalar::Timedelta(INT64_NAT)),
            Bool | Object => (Object, fill.clone()),
        };
    }

    match fill {
        Scalar::Bool(_) => match dtype {
            Bool => (Bool, fill.clone()),
            _ => (Object, fill.clone()),
        },
        Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => match dtype {
            Float32 | Float64 => (dtype, fill.clone()),
            Int8 | Int16 | Int32 | Int64 | UInt64 => promote_int(dtype, fill),
            _ => (Object, fill.clone()),
        },
        Scalar::Timestamp(_) if dtype == Datetime => (Datetime, fill.clone()),
        Scalar::Timedelta(_) if dtype == Timedelta => (Timedelta, fill.clone()),
        _ => (Object, fill.clone()),
    }
}

fn promote_int(dtype: NdDtype, fill: &Scalar) -> (NdDtype, Scalar) {
    let Some(v) = fill.as_i128() else {
        // Non-integral float.
        return (NdDtype::Float64, Scalar::Float(fill.as_f64().unwrap_or(f64::NAN)));
    };
    let fits = match dtype {
        NdDtype::Int8 => i8::try_from(v).is_ok(),
        NdDtype::Int16 => i16::try_from(v).is_ok(),
        NdDtype::Int32 => i32::try_from(v).is_ok(),
        NdDtype::Int64 => i64::try_from(v).is_ok(),
        NdDtype::UInt64 => u64::try_from(v).is_ok(),
        _ => false,
    };
    if fits {
        let s = match u64::try_from(v) {
            Ok(u) if dtype == NdDtype::UInt64 => Scalar::UInt(u),
            _ => Scalar::Int(v as i64),
        };
        return (dtype, s);
    }
    match i64::try_from(v) {
        Ok(i) if dtype != NdDtype::UInt64 => (NdDtype::Int64, Scalar::Int(i)),
        _ => (NdDtype::Float64, Scalar::Float(v as f64)),
    }
}

type TakeFn = fn(&NdValues, &[i64], usize, &Scalar, &mut NdValues) -> Result<(), KernelError>;

fn fill_element<U: FromScalar>(indexer: &[i64], fill: &Scalar) -> Result<Option<U>, KernelError> {
    if !indexer.iter().any(|&i| i < 0) {
        return Ok(None);
    }
    U::from_scalar(fill)
        .map(Some)
        .ok_or_else(|| KernelError::TypeMismatch("Incompatible type for fill_value".into()))
}

/// Writes `arr` gathered along `axis` into `out`. `out` already has the
/// output shape; `-1` entries take `fill`.
fn take_axis<T, U: Clone>(
    arr: &NdArray<T>,
    indexer: &[i64],
    axis: usize,
    fill: Option<&U>,
    out: &mut NdArray<U>,
    conv: impl Fn(&T) -> U,
) -> Result<(), KernelError> {
    let missing = || {
        fill.cloned()
            .ok_or_else(|| KernelError::TypeMismatch("Incompatible type for fill_value".into()))
    };

    if arr.ndim() == 1 {
        let src = arr.as_slice();
        let dst = out.as_mut_slice();
        for (o, &i) in indexer.iter().enumerate() {
            dst[o] = if i < 0 { missing()? } else { conv(&src[i as usize]) };
        }
        return Ok(());
    }

    if arr.ndim() == 2 && arr.is_row_major() && out.is_row_major() {
        let src_cols = arr.shape()[1];
        let (out_rows, out_cols) = (out.shape()[0], out.shape()[1]);
        let src = arr.as_slice();
        let dst = out.as_mut_slice();
        if axis == 0 {
            for (r, &i) in indexer.iter().enumerate() {
                let row = &mut dst[r * out_cols..(r + 1) * out_cols];
                if i < 0 {
                    let f = missing()?;
                    row.iter_mut().for_each(|d| *d = f.clone());
                } else {
                    let p = i as usize;
                    let s = &src[p * src_cols..(p + 1) * src_cols];
                    for (d, v) in row.iter_mut().zip(s) {
                        *d = conv(v);
                    }
                }
            }
        } else {
            for r in 0..out_rows {
                let s = &src[r * src_cols..(r + 1) * src_cols];
                let row = &mut dst[r * out_cols..(r + 1) * out_cols];
                for (d, &i) in row.iter_mut().zip(indexer) {
                    *d = if i < 0 { missing()? } else { conv(&s[i as usize]) };
                }
            }
        }
        return Ok(());
    }

    let mut src_index = vec![0usize; arr.ndim()];
    for out_index in indices(&out.shape().to_vec()) {
        let i = indexer[out_index[axis]];
        let v = if i < 0 {
            missing()?
        } else {
            src_index.copy_from_slice(&out_index);
            src_index[axis] = i as usize;
            conv(arr.get(&src_index))
        };
        *out.get_mut(&out_index) = v;
    }
    Ok(())
}

macro_rules! take_kernels {
    ($($fname:ident: $src:ident => $dst:ident as $elem:ty, |$v:ident| $conv:expr;)*) => {
        $(
            fn $fname(
                arr: &NdValues,
                indexer: &[i64],
                axis: usize,
                fill: &Scalar,
                out: &mut NdValues,
            ) -> Result<(), KernelError> {
                let (from, to) = (arr.dtype(), out.dtype());
                match (arr, out) {
                    (NdValues::$src(a), NdValues::$dst(o)) => {
                        let fill = fill_element::<$elem>(indexer, fill)?;
                        take_axis(a, indexer, axis, fill.as_ref(), o, |$v| $conv)
                    }
                    _ => Err(KernelError::TypeMismatch(format!(
                        "take kernel {} called with {} -> {}",
                        stringify!($fname),
                        from,
                        to
                    ))),
                }
            }
        )*
    };
}

take_kernels! {
    take_bool_bool: Bool => Bool as bool, |v| *v;
    take_bool_object: Bool => Object as Scalar, |v| Scalar::Bool(*v);
    take_int8_int8: Int8 => Int8 as i8, |v| *v;
    take_int8_int32: Int8 => Int32 as i32, |v| *v as i32;
    take_int8_int64: Int8 => Int64 as i64, |v| *v as i64;
    take_int8_float64: Int8 => Float64 as f64, |v| *v as f64;
    take_int16_int16: Int16 => Int16 as i16, |v| *v;
    take_int16_int32: Int16 => Int32 as i32, |v| *v as i32;
    take_int16_int64: Int16 => Int64 as i64, |v| *v as i64;
    take_int16_float64: Int16 => Float64 as f64, |v| *v as f64;
    take_int32_int32: Int32 => Int32 as i32, |v| *v;
    take_int32_int64: Int32 => Int64 as i64, |v| *v as i64;
    take_int32_float64: Int32 => Float64 as f64, |v| *v as f64;
    take_int64_int64: Int64 => Int64 as i64, |v| *v;
    take_int64_float64: Int64 => Float64 as f64, |v| *v as f64;
    take_uint64_uint64: UInt64 => UInt64 as u64, |v| *v;
    take_uint64_float64: UInt64 => Float64 as f64, |v| *v as f64;
    take_float32_float32: Float32 => Float32 as f32, |v| *v;
    take_float32_float64: Float32 => Float64 as f64, |v| *v as f64;
    take_float64_float64: Float64 => Float64 as f64, |v| *v;
    take_datetime_datetime: Datetime => Datetime as i64, |v| *v;
    take_timedelta_timedelta: Timedelta => Timedelta as i64, |v| *v;
    take_object_object: Object => Object as Scalar, |v| v.clone();
}

static TAKE_DISPATCH: &[(NdDtype, NdDtype, TakeFn)] = &[
    (NdDtype::Bool, NdDtype::Bool, take_bool_bool),
    (NdDtype::Bool, NdDtype::Object, take_bool_object),
    (NdDtype::Int8, NdDtype::Int8, take_int8_int8),
    (NdDtype::Int8, NdDtype::Int32, take_int8_int32),
    (NdDtype::Int8, NdDtype::Int64, take_int8_int64),
    (NdDtype::Int8, NdDtype::Float64, take_int8_float64),
    (NdDtype::Int16, NdDtype::Int16, take_int16_int16),
    (NdDtype::Int16, NdDtype::Int32, take_int16_int32),
    (NdDtype::Int16, NdDtype::Int64, take_int16_int64),
    (NdDtype::Int16, NdDtype::Float64, take_int16_float64),
    (NdDtype::Int32, NdDtype::Int32, take_int32_int32),
    (NdDtype::Int32, NdDtype::Int64, take_int32_int64),
    (NdDtype::Int32, NdDtype::Float64, take_int32_float64),
    (NdDtype::Int64, NdDtype::Int64, take_int64_int64),
    (NdDtype::Int64, NdDtype::Float64, take_int64_float64),
    (NdDtype::UInt64, NdDtype::UInt64, take_uint64_uint64),
    (NdDtype::UInt64, NdDtype::Float64, take_uint64_float64),
    (NdDtype::Float32, NdDtype::Float32, take_float32_float32),
    (NdDtype::Float32, NdDtype::Float64, take_float32_float64),
    (NdDtype::Float64, NdDtype::Float64, take_float64_float64),
    (NdDtype::Datetime, NdDtype::Datetime, take_datetime_datetime),
    (NdDtype::Timedelta, NdDtype::Timedelta, take_timedelta_timedelta),
    (NdDtype::Object, NdDtype::Object, take_object_object),
];

fn lookup_kernel(from: NdDtype, to: NdDtype) -> Option<TakeFn> {
    TAKE_DISPATCH
        .iter()
        .find(|(a, b, _)| *a == from && *b == to)
        .map(|&(_, _, f)| f)
}

fn run_take(
    arr: &NdValues,
    indexer: &[i64],
    axis: usize,
    fill: &Scalar,
    out: &mut NdValues,
) -> Result<(), KernelError> {
    let (from, to) = (arr.dtype(), out.dtype());
    if let Some(kernel) = lookup_kernel(from, to) {
        return kernel(arr, indexer, axis, fill, out);
    }
    debug!("take_nd: no {} -> {} kernel, casting first", from, to);
    let cast = arr.astype(to)?;
    let kernel = lookup_kernel(to, to).ok_or_else(|| {
        KernelError::UnsupportedType(format!("take_nd: no kernel for {}", to))
    })?;
    kernel(&cast, indexer, axis, fill, out)
}

/// Resolved indexer plus whether any `-1` needs filling.
fn prepare_indexer<'a>(
    indexer: Option<&'a [i64]>,
    axis_len: usize,
    allow_fill: bool,
) -> Result<(Cow<'a, [i64]>, bool), KernelError> {
    let idx: Cow<'a, [i64]> = match indexer {
        Some(i) => Cow::Borrowed(i),
        None => Cow::Owned((0..axis_len as i64).collect()),
    };
    let mut needs_fill = false;
    for &i in idx.iter() {
        if i >= axis_len as i64 || i < -1 || (i == -1 && !allow_fill) {
            return Err(KernelError::OutOfBounds(format!(
                "take_nd: index {} is out of bounds for axis with size {}",
                i, axis_len
            )));
        }
        needs_fill |= i == -1;
    }
    Ok((idx, needs_fill))
}

fn check_axis(arr: &NdValues, axis: usize) -> Result<usize, KernelError> {
    arr.shape().get(axis).copied().ok_or_else(|| {
        KernelError::OutOfBounds(format!(
            "axis {} is out of bounds for array of dimension {}",
            axis,
            arr.ndim()
        ))
    })
}

/// Gathers `arr` along `axis` by `indexer` (`None` = identity), writing
/// `fill_value` at `-1` entries. With `allow_fill = false`, `-1` is rejected
/// as out of bounds.
pub fn take_nd(
    arr: &NdValues,
    indexer: Option<&[i64]>,
    axis: usize,
    fill_value: &Scalar,
    allow_fill: bool,
) -> Result<NdValues, KernelError> {
    let axis_len = check_axis(arr, axis)?;
    let (idx, needs_fill) = prepare_indexer(indexer, axis_len, allow_fill)?;
    let (dtype, fill) = if needs_fill {
        maybe_promote(arr.dtype(), fill_value)
    } else {
        (arr.dtype(), Scalar::Null)
    };

    let mut shape = arr.shape().to_vec();
    shape[axis] = idx.len();
    let order = if arr.ndim() > 1 && arr.order() == MemoryOrder::ColumnMajor && axis + 1 == arr.ndim() {
        MemoryOrder::ColumnMajor
    } else {
        MemoryOrder::RowMajor
    };
    let mut out = NdValues::empty(dtype, shape, order);
    run_take(arr, &idx, axis, &fill, &mut out)?;
    Ok(out)
}

/// [`take_nd`] into a caller buffer. `out` must have the output shape. When
/// filling is needed its dtype must equal the promoted dtype.
pub fn take_nd_into(
    arr: &NdValues,
    indexer: Option<&[i64]>,
    axis: usize,
    out: &mut NdValues,
    fill_value: &Scalar,
    allow_fill: bool,
) -> Result<(), KernelError> {
    let axis_len = check_axis(arr, axis)?;
    let (idx, needs_fill) = prepare_indexer(indexer, axis_len, allow_fill)?;

    let mut shape = arr.shape().to_vec();
    shape[axis] = idx.len();
    if out.shape() != shape.as_slice() {
        return Err(KernelError::LengthMismatch(format!(
            "take_nd: out has shape {:?}, expected {:?}",
            out.shape(),
            shape
        )));
    }

    let fill = if needs_fill {
        let (dtype, fill) = maybe_promote(arr.dtype(), fill_value);
        if dtype != out.dtype() {
            return Err(KernelError::TypeMismatch("Incompatible type for fill_value".into()));
        }
        fill
    } else {
        Scalar::Null
    };
    run_take(arr, &idx, axis, &fill, out)
}

/// 2-D gather by independent row and column indexers. `-1` on either axis
/// writes `fill_value`.
pub fn take_2d_multi(
    arr: &NdValues,
    row_idx: Option<&[i64]>,
    col_idx: Option<&[i64]>,
    fill_value: &Scalar,
) -> Result<NdValues, KernelError> {
    if arr.ndim() != 2 {
        return Err(KernelError::UnsupportedDimension(format!(
            "take_2d_multi: expected a 2-D array, got {} dimensions",
            arr.ndim()
        )));
    }
    let (rows, row_fill) = prepare_indexer(row_idx, arr.shape()[0], true)?;
    let (cols, col_fill) = prepare_indexer(col_idx, arr.shape()[1], true)?;
    let (dtype, fill) = if row_fill || col_fill {
        maybe_promote(arr.dtype(), fill_value)
    } else {
        (arr.dtype(), Scalar::Null)
    };

    let mut by_row = NdValues::empty(dtype, vec![rows.len(), arr.shape()[1]], MemoryOrder::RowMajor);
    run_take(arr, &rows, 0, &fill, &mut by_row)?;
    let mut out = NdValues::empty(dtype, vec![rows.len(), cols.len()], MemoryOrder::RowMajor);
    run_take(&by_row, &cols, 1, &fill, &mut out)?;
    Ok(out)
}
