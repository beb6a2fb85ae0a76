// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Rank Kernels** - *Tie-aware ranking of 1-D and 2-D buffers*
//!
//! Ranks are 1-based `f64`. Positions are sorted stably, then each run of
//! equal values is assigned a rank according to [`RankMethod`]:
//!
//! - `Average`: mean of the run's positions
//! - `Min` / `Max`: lowest / highest position in the run
//! - `First`: position itself, so ties break by original order
//! - `Dense`: run number, with no gaps between runs
//!
//! Missing values (NaN, NaT, `Null`) get a NaN rank under `NaOption::Keep`.
//! Under `Top` or `Bottom` they form one tied run ranked before or after
//! every other value, whatever the sort direction.

use std::cmp::Ordering;

use crate::config::INT64_NAT;
use crate::errors::KernelError;
use crate::kernels::sort::{nan_last_cmp, object_order};
use crate::ndarray::{NdArray, NdValues};
use crate::operators::{NaOption, RankMethod};
use crate::values::Scalar;

#[derive(Debug, Clone, Copy)]
struct RankOptions {
    method: RankMethod,
    na_option: NaOption,
    ascending: bool,
    pct: bool,
}

/// Ranks one lane. Missing positions under `Keep` come back as NaN.
fn rank_lane<K>(
    keys: &[K],
    is_na: &impl Fn(&K) -> bool,
    cmp: &impl Fn(&K, &K) -> Ordering,
    opts: RankOptions,
) -> Vec<f64> {
    let n = keys.len();
    let mut valid: Vec<usize> = (0..n).filter(|&i| !is_na(&keys[i])).collect();
    let missing: Vec<usize> = (0..n).filter(|&i| is_na(&keys[i])).collect();

    if opts.ascending {
        valid.sort_by(|&a, &b| cmp(&keys[a], &keys[b]));
    } else {
        valid.sort_by(|&a, &b| cmp(&keys[b], &keys[a]));
    }

    let order: Vec<usize> = match opts.na_option {
        NaOption::Keep => valid,
        NaOption::Top => missing.iter().copied().chain(valid).collect(),
        NaOption::Bottom => valid.into_iter().chain(missing.iter().copied()).collect(),
    };

    let same_group = |a: usize, b: usize| match (is_na(&keys[a]), is_na(&keys[b])) {
        (true, true) => true,
        (false, false) => cmp(&keys[a], &keys[b]) == Ordering::Equal,
        _ => false,
    };

    let mut out = vec![f64::NAN; n];
    let mut groups = 0usize;
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && same_group(order[start], order[end]) {
            end += 1;
        }
        groups += 1;
        for (k, &pos) in order[start..end].iter().enumerate() {
            out[pos] = match opts.method {
                RankMethod::Average => (start + end + 1) as f64 / 2.0,
                RankMethod::Min => (start + 1) as f64,
                RankMethod::Max => end as f64,
                RankMethod::First => (start + k + 1) as f64,
                RankMethod::Dense => groups as f64,
            };
        }
        start = end;
    }

    if opts.pct {
        let denom = match opts.method {
            RankMethod::Dense => groups,
            _ => order.len(),
        } as f64;
        for r in out.iter_mut() {
            *r /= denom;
        }
    }
    out
}

fn rank_array<T: Clone>(
    arr: &NdArray<T>,
    axis: usize,
    opts: RankOptions,
    is_na: impl Fn(&T) -> bool,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Result<NdArray<f64>, KernelError> {
    let ndim = arr.ndim();
    if ndim > 2 || ndim == 0 {
        return Err(KernelError::UnsupportedDimension(format!(
            "rank: arrays of dimension {} are not supported",
            ndim
        )));
    }
    let len = arr.axis_len(axis)?;
    let lanes = if ndim == 2 { arr.shape()[1 - axis] } else { 1 };
    let mut out = NdArray::filled(arr.shape().to_vec(), arr.order(), f64::NAN);

    let at = |lane: usize, j: usize| -> Vec<usize> {
        match (ndim, axis) {
            (1, _) => vec![j],
            (_, 0) => vec![j, lane],
            _ => vec![lane, j],
        }
    };
    for lane in 0..lanes {
        let keys: Vec<T> = (0..len).map(|j| arr.get(&at(lane, j)).clone()).collect();
        let ranks = rank_lane(&keys, &is_na, &cmp, opts);
        for (j, r) in ranks.into_iter().enumerate() {
            *out.get_mut(&at(lane, j)) = r;
        }
    }
    Ok(out)
}

#[inline(always)]
fn never<T>(_: &T) -> bool {
    false
}

/// Mixed-class object ordering. Classes that cannot be compared order by
/// class, which only arises for the numeric/string split.
fn object_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    a.class_cmp(b).unwrap_or_else(|| a.class().cmp(&b.class()))
}

/// Ranks `values` along `axis`. 1-D input takes `axis = 0`; 2-D input ranks
/// each lane that runs along `axis` independently. Output has the input's
/// shape and memory order.
pub fn rank(
    values: &NdValues,
    axis: usize,
    method: RankMethod,
    na_option: NaOption,
    ascending: bool,
    pct: bool,
) -> Result<NdArray<f64>, KernelError> {
    let opts = RankOptions {
        method,
        na_option,
        ascending,
        pct,
    };
    match values {
        NdValues::Bool(a) => rank_array(a, axis, opts, never, |x: &bool, y: &bool| x.cmp(y)),
        NdValues::Int8(a) => rank_array(a, axis, opts, never, |x: &i8, y: &i8| x.cmp(y)),
        NdValues::Int16(a) => rank_array(a, axis, opts, never, |x: &i16, y: &i16| x.cmp(y)),
        NdValues::Int32(a) => rank_array(a, axis, opts, never, |x: &i32, y: &i32| x.cmp(y)),
        NdValues::Int64(a) => rank_array(a, axis, opts, never, |x: &i64, y: &i64| x.cmp(y)),
        NdValues::UInt64(a) => rank_array(a, axis, opts, never, |x: &u64, y: &u64| x.cmp(y)),
        NdValues::Float32(a) => rank_array(
            a,
            axis,
            opts,
            |x: &f32| x.is_nan(),
            |x: &f32, y: &f32| nan_last_cmp(&(*x as f64), &(*y as f64)),
        ),
        NdValues::Float64(a) => rank_array(a, axis, opts, |x: &f64| x.is_nan(), nan_last_cmp),
        NdValues::Datetime(a) | NdValues::Timedelta(a) => rank_array(
            a,
            axis,
            opts,
            |x: &i64| *x == INT64_NAT,
            |x: &i64, y: &i64| x.cmp(y),
        ),
        NdValues::Object(a) => {
            let present: Vec<Scalar> = a.as_slice().iter().filter(|s| !s.is_na()).cloned().collect();
            object_order(&present)?;
            rank_array(a, axis, opts, |x: &Scalar| x.is_na(), object_cmp)
        }
    }
}

#[cfg(test)]
mod tests {
    use minarrow::vec64;

    use super::*;
    use crate::ndarray::MemoryOrder;

    fn f64_1d(v: &[f64]) -> NdValues {
        NdValues::Float64(NdArray::from_vec64(v.iter().copied().collect()))
    }

    fn ranks(values: &NdValues, method: RankMethod, na: NaOption, asc: bool, pct: bool) -> Vec<f64> {
        rank(values, 0, method, na, asc, pct).unwrap().as_slice().to_vec()
    }

    fn assert_ranks(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            if w.is_nan() {
                assert!(g.is_nan(), "expected NaN, got {}", g);
            } else {
                assert!((g - w).abs() < 1e-12, "expected {}, got {}", w, g);
            }
        }
    }

    #[test]
    fn test_methods_on_ties() {
        let v = f64_1d(&[3.0, 1.0, 3.0, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Keep, true, false), &[3.5, 1.0, 3.5, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::Min, NaOption::Keep, true, false), &[3.0, 1.0, 3.0, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::Max, NaOption::Keep, true, false), &[4.0, 1.0, 4.0, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::First, NaOption::Keep, true, false), &[3.0, 1.0, 4.0, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::Dense, NaOption::Keep, true, false), &[3.0, 1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_descending_first_keeps_original_order() {
        let v = f64_1d(&[3.0, 1.0, 3.0, 2.0]);
        assert_ranks(&ranks(&v, RankMethod::First, NaOption::Keep, false, false), &[1.0, 4.0, 2.0, 3.0]);
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Keep, false, false), &[1.5, 4.0, 1.5, 3.0]);
    }

    #[test]
    fn test_na_options() {
        let v = f64_1d(&[2.0, f64::NAN, 1.0, f64::NAN]);
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Keep, true, false), &[2.0, f64::NAN, 1.0, f64::NAN]);
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Top, true, false), &[4.0, 1.5, 3.0, 1.5]);
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Bottom, true, false), &[2.0, 3.5, 1.0, 3.5]);
        assert_ranks(&ranks(&v, RankMethod::Min, NaOption::Top, false, false), &[3.0, 1.0, 4.0, 1.0]);
    }

    #[test]
    fn test_pct_divides_by_ranked_count() {
        let v = f64_1d(&[10.0, f64::NAN, 30.0, 20.0]);
        assert_ranks(
            &ranks(&v, RankMethod::Average, NaOption::Keep, true, true),
            &[1.0 / 3.0, f64::NAN, 1.0, 2.0 / 3.0],
        );
        let d = f64_1d(&[5.0, 5.0, 7.0]);
        assert_ranks(&ranks(&d, RankMethod::Dense, NaOption::Keep, true, true), &[0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_permutation_without_ties() {
        let v = NdValues::Int64(NdArray::from_vec64(vec64![4, 1, 3, 5, 2]));
        assert_ranks(&ranks(&v, RankMethod::Average, NaOption::Keep, true, false), &[4.0, 1.0, 3.0, 5.0, 2.0]);
    }

    #[test]
    fn test_2d_axes() {
        let a = NdValues::Int32(NdArray::new(vec64![3, 1, 2, 1, 5, 0], vec![2, 3], MemoryOrder::RowMajor).unwrap());
        let by_row = rank(&a, 1, RankMethod::Average, NaOption::Keep, true, false).unwrap();
        assert_ranks(by_row.as_slice(), &[3.0, 1.0, 2.0, 2.0, 3.0, 1.0]);
        let by_col = rank(&a, 0, RankMethod::Average, NaOption::Keep, true, false).unwrap();
        assert_ranks(by_col.as_slice(), &[2.0, 1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_rejects_three_dims_and_unorderable() {
        let a = NdValues::Int64(NdArray::new(vec64![1, 2], vec![1, 1, 2], MemoryOrder::RowMajor).unwrap());
        assert!(matches!(
            rank(&a, 0, RankMethod::Average, NaOption::Keep, true, false),
            Err(KernelError::UnsupportedDimension(_))
        ));
        let o = NdValues::Object(NdArray::from_vec64(vec64![Scalar::Bool(true), Scalar::Str("a".into())]));
        assert!(matches!(
            rank(&o, 0, RankMethod::Average, NaOption::Keep, true, false),
            Err(KernelError::Unorderable(_))
        ));
    }

    #[test]
    fn test_datetime_and_object() {
        let d = NdValues::Datetime(NdArray::from_vec64(vec64![30, INT64_NAT, 10]));
        assert_ranks(&ranks(&d, RankMethod::Average, NaOption::Keep, true, false), &[2.0, f64::NAN, 1.0]);
        let o = NdValues::Object(NdArray::from_vec64(vec64![
            Scalar::Str("b".into()),
            Scalar::Int(2),
            Scalar::Null,
            Scalar::Float(1.5)
        ]));
        assert_ranks(&ranks(&o, RankMethod::Average, NaOption::Keep, true, false), &[3.0, 2.0, f64::NAN, 1.0]);
    }
}
