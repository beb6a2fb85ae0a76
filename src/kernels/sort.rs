// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Sorting Algorithms Kernels Module** - *Stable ordering over canonical buffers*
//!
//! Stable argsorts for every canonical width, the mixed-kind ordering rule for
//! opaque buffers, and the `safe_sort` label remapping.
//!
//! Regular sorts here alter the actual data.
//! The argsort variants return the indices and are always stable, so ties keep
//! their input order.
//!
//! ## Ordering rules
//! - Integers: natural order. Long inputs use LSD radix passes.
//! - Floats: IEEE 754 total order with NaN last.
//! - Strings: byte-wise lexical.
//! - Opaque scalars: one class sorts within itself; numerics mixed with strings
//!   sort numerics first, then strings. Any other mix is unorderable.

use std::cmp::Ordering;

use minarrow::Vec64;

#[cfg(feature = "parallel_sort")]
use crate::config::PARALLEL_SORT_THRESHOLD;
use crate::config::RADIX_SORT_THRESHOLD;
use crate::errors::KernelError;
use crate::kernels::normalize::Canonical;
use crate::values::{Scalar, ScalarClass};

/// In-place sort of `f64` under IEEE 754 total order.
///
/// - Positive NaN sorts greater than all numbers, including +inf.
/// - -0.0 sorts before +0.0.
#[inline]
pub fn sort_float(slice: &mut [f64]) {
    slice.sort_unstable_by(total_cmp_f);
}

/// IEEE 754 total order comparator, usable as a `sort_by` callback.
#[inline(always)]
pub fn total_cmp_f(a: &f64, b: &f64) -> Ordering {
    a.total_cmp(b)
}

/// Total order used for sorting `f64` keys: NaN of any sign sorts last and
/// signed zeros tie.
#[inline(always)]
pub fn nan_last_cmp(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

// Argsort - Returns sorted indices (stable)

/// Stable comparison argsort driven by a comparator over positions.
#[inline]
pub fn argsort_by<F>(n: usize, mut cmp: F) -> Vec<usize>
where
    F: FnMut(usize, usize) -> Ordering,
{
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| cmp(i, j));
    indices
}

/// Stable comparison argsort for any Ord type
#[inline]
pub fn argsort<T: Ord>(data: &[T], descending: bool) -> Vec<usize> {
    if descending {
        argsort_by(data.len(), |i, j| data[j].cmp(&data[i]))
    } else {
        argsort_by(data.len(), |i, j| data[i].cmp(&data[j]))
    }
}

// Radix Sort Argsort - O(n·k) for integers

/// LSD Radix argsort for u64 - O(n·k) where k=8 (bytes)
///
/// Each pass is a stable counting sort, so equal keys keep input order.
pub fn argsort_radix_u64(data: &[u64], descending: bool) -> Vec<usize> {
    let n = data.len();
    if n == 0 {
        return vec![];
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut temp_indices = vec![0usize; n];

    for shift in (0..64).step_by(8) {
        let mut counts = [0usize; 256];
        for &idx in &indices {
            let byte = ((data[idx] >> shift) & 0xFF) as usize;
            counts[byte] += 1;
        }
        // A pass where every key shares the byte leaves the order unchanged.
        if counts.iter().any(|&c| c == n) {
            continue;
        }

        let mut positions = [0usize; 256];
        if descending {
            let mut sum = 0;
            for i in (0..256).rev() {
                positions[i] = sum;
                sum += counts[i];
            }
        } else {
            let mut sum = 0;
            for i in 0..256 {
                positions[i] = sum;
                sum += counts[i];
            }
        }

        for &idx in &indices {
            let byte = ((data[idx] >> shift) & 0xFF) as usize;
            temp_indices[positions[byte]] = idx;
            positions[byte] += 1;
        }

        std::mem::swap(&mut indices, &mut temp_indices);
    }

    indices
}

/// LSD Radix argsort for i64 - uses sign-bit flipping for proper signed ordering
pub fn argsort_radix_i64(data: &[i64], descending: bool) -> Vec<usize> {
    let unsigned: Vec<u64> = data
        .iter()
        .map(|&x| (x as u64) ^ 0x8000_0000_0000_0000)
        .collect();
    argsort_radix_u64(&unsigned, descending)
}

#[cfg(feature = "parallel_sort")]
pub mod parallel_argsort {
    use std::cmp::Ordering;

    use rayon::prelude::*;

    /// Parallel stable argsort driven by a comparator over positions.
    pub fn argsort_by_parallel<F>(n: usize, cmp: F) -> Vec<usize>
    where
        F: Fn(usize, usize) -> Ordering + Sync,
    {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.par_sort_by(|&i, &j| cmp(i, j));
        indices
    }
}

/// Stable argsort for comparison-only keys, split across threads when the
/// `parallel_sort` feature is enabled and the input is long.
#[inline]
fn argsort_by_auto<F>(n: usize, cmp: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering + Sync,
{
    #[cfg(feature = "parallel_sort")]
    {
        if n >= PARALLEL_SORT_THRESHOLD {
            return parallel_argsort::argsort_by_parallel(n, cmp);
        }
    }
    argsort_by(n, cmp)
}

/// Stable argsort for i64: radix above `RADIX_SORT_THRESHOLD`, comparison below.
pub fn argsort_auto_i64(data: &[i64], descending: bool) -> Vec<usize> {
    if data.len() > RADIX_SORT_THRESHOLD {
        argsort_radix_i64(data, descending)
    } else {
        argsort(data, descending)
    }
}

/// Stable argsort for u64: radix above `RADIX_SORT_THRESHOLD`, comparison below.
pub fn argsort_auto_u64(data: &[u64], descending: bool) -> Vec<usize> {
    if data.len() > RADIX_SORT_THRESHOLD {
        argsort_radix_u64(data, descending)
    } else {
        argsort(data, descending)
    }
}

/// How an opaque buffer can be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOrder {
    /// A single class with its own total order.
    Homogeneous,
    /// Numerics then strings.
    NumericThenStr,
}

/// Decides whether an opaque buffer is orderable and under which rule.
pub fn object_order(values: &[Scalar]) -> Result<ObjectOrder, KernelError> {
    let mut classes: Vec<ScalarClass> = Vec::with_capacity(2);
    for v in values {
        let c = v.class();
        if !classes.contains(&c) {
            classes.push(c);
            if classes.len() > 2 {
                break;
            }
        }
    }
    classes.sort();
    match classes.as_slice() {
        [] | [_] => Ok(ObjectOrder::Homogeneous),
        [ScalarClass::Numeric, ScalarClass::Str] => Ok(ObjectOrder::NumericThenStr),
        other => Err(KernelError::Unorderable(format!(
            "cannot order elements of kinds {:?}",
            other
        ))),
    }
}

/// Stable argsort of opaque scalars under the mixed-kind rule.
pub fn argsort_object(values: &[Scalar]) -> Result<Vec<usize>, KernelError> {
    let rule = object_order(values)?;
    let cmp = |i: usize, j: usize| -> Ordering {
        let (a, b) = (&values[i], &values[j]);
        match rule {
            ObjectOrder::Homogeneous => a.class_cmp(b).unwrap_or(Ordering::Equal),
            ObjectOrder::NumericThenStr => match (a.class(), b.class()) {
                (ScalarClass::Numeric, ScalarClass::Str) => Ordering::Less,
                (ScalarClass::Str, ScalarClass::Numeric) => Ordering::Greater,
                _ => a.class_cmp(b).unwrap_or(Ordering::Equal),
            },
        }
    };
    Ok(argsort_by_auto(values.len(), cmp))
}

/// Stable ascending argsort of any canonical buffer. Invalid slots sort last
/// in input order.
pub fn argsort_canonical(values: &Canonical) -> Result<Vec<usize>, KernelError> {
    let order = match values {
        Canonical::Int64(c) => argsort_auto_i64(&c.data, false),
        Canonical::UInt64(c) => argsort_auto_u64(&c.data, false),
        Canonical::Float64(c) => {
            let d = &c.data;
            argsort_by_auto(d.len(), |i, j| nan_last_cmp(&d[i], &d[j]))
        }
        Canonical::Bytes(c) => {
            let d = &c.data;
            argsort_by_auto(d.len(), |i, j| d[i].cmp(&d[j]))
        }
        Canonical::Object(c) => argsort_object(&c.data)?,
    };
    let mask = match values {
        Canonical::Int64(c) => c.null_mask.as_ref(),
        Canonical::UInt64(c) => c.null_mask.as_ref(),
        Canonical::Float64(c) => c.null_mask.as_ref(),
        Canonical::Bytes(c) => c.null_mask.as_ref(),
        Canonical::Object(c) => c.null_mask.as_ref(),
    };
    Ok(match mask {
        None => order,
        Some(m) => {
            let (mut valid, invalid): (Vec<usize>, Vec<usize>) =
                order.into_iter().partition(|&i| m.get(i));
            let mut invalid = invalid;
            invalid.sort_unstable();
            valid.extend(invalid);
            valid
        }
    })
}

/// Remaps labels through a sort permutation.
///
/// `sorter[k]` is the original position of the k-th sorted value. Labels below
/// `-len`, at or above `len`, or equal to `na_sentinel` become `na_sentinel`;
/// other negative labels wrap from the end.
pub fn remap_labels(sorter: &[usize], labels: &[i64], na_sentinel: i64) -> Vec64<i64> {
    let len = sorter.len() as i64;
    let mut reverse = vec![0i64; sorter.len()];
    for (k, &orig) in sorter.iter().enumerate() {
        reverse[orig] = k as i64;
    }
    labels
        .iter()
        .map(|&l| {
            if l == na_sentinel || l < -len || l >= len {
                na_sentinel
            } else {
                let idx = if l < 0 { l + len } else { l };
                reverse[idx as usize]
            }
        })
        .collect()
}

/// Ordering used by the sort-and-search membership path.
pub trait SortKey: Clone {
    fn sort_cmp(&self, other: &Self) -> Ordering;
}

impl SortKey for i64 {
    #[inline(always)]
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl SortKey for u64 {
    #[inline(always)]
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl SortKey for f64 {
    #[inline(always)]
    fn sort_cmp(&self, other: &Self) -> Ordering {
        nan_last_cmp(self, other)
    }
}

impl SortKey for String {
    #[inline(always)]
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Membership via a sorted copy of `haystack` and binary search. Produces the
/// same answers as the hash path, including missing-matches-missing.
pub fn sorted_membership<K: SortKey>(
    data: &[K],
    data_na: impl Fn(usize) -> bool,
    haystack: &[K],
    haystack_na: impl Fn(usize) -> bool,
) -> Vec64<bool> {
    let mut sorted: Vec<K> = Vec::with_capacity(haystack.len());
    let mut na_present = false;
    for (i, k) in haystack.iter().enumerate() {
        if haystack_na(i) {
            na_present = true;
        } else {
            sorted.push(k.clone());
        }
    }
    sorted.sort_unstable_by(|a, b| a.sort_cmp(b));
    data.iter()
        .enumerate()
        .map(|(i, k)| {
            if data_na(i) {
                na_present
            } else {
                sorted.binary_search_by(|probe| probe.sort_cmp(k)).is_ok()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use minarrow::{Bitmask, vec64};

    use super::*;
    use crate::values::Column;

    #[test]
    fn test_total_cmp_f64_ordering_basic() {
        let a = 1.0f64;
        let b = 2.0f64;
        assert_eq!(total_cmp_f(&a, &b), Ordering::Less);
        assert_eq!(total_cmp_f(&b, &a), Ordering::Greater);
        assert_eq!(total_cmp_f(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_total_cmp_nan_ordering_f64() {
        let nan = f64::NAN;
        assert_eq!(total_cmp_f(&nan, &f64::INFINITY), Ordering::Greater);
        assert_eq!(total_cmp_f(&nan, &f64::NEG_INFINITY), Ordering::Greater);
        assert_eq!(total_cmp_f(&nan, &nan), Ordering::Equal);
    }

    #[test]
    fn test_sort_float_places_nan_last() {
        let mut v = [3.0, f64::NAN, -1.0, 2.0];
        sort_float(&mut v);
        assert_eq!(&v[..3], &[-1.0, 2.0, 3.0]);
        assert!(v[3].is_nan());
    }

    #[test]
    fn test_argsort_is_stable() {
        let data = [2, 1, 2, 1, 0];
        assert_eq!(argsort(&data, false), vec![4, 1, 3, 0, 2]);
        assert_eq!(argsort(&data, true), vec![0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_radix_matches_comparison_and_is_stable() {
        let data: Vec<i64> = (0..600).map(|i| ((i * 7919) % 113) as i64 - 56).collect();
        let radix = argsort_radix_i64(&data, false);
        let cmp = argsort(&data, false);
        assert_eq!(radix, cmp);
        let radix_desc = argsort_radix_i64(&data, true);
        assert_eq!(radix_desc, argsort(&data, true));
    }

    #[test]
    fn test_radix_u64_high_bit() {
        let data = [1u64 << 63, 5, u64::MAX, 0];
        assert_eq!(argsort_radix_u64(&data, false), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_total_cmp_signed_zero() {
        assert_eq!(total_cmp_f(&-0.0, &0.0), Ordering::Less);
        assert_eq!(nan_last_cmp(&-0.0, &0.0), Ordering::Equal);
    }

    #[test]
    fn test_auto_argsort_switches_to_radix_stably() {
        let data: Vec<i64> = (0..RADIX_SORT_THRESHOLD as i64 * 3).map(|i| (i * 31) % 17 - 8).collect();
        assert_eq!(argsort_auto_i64(&data, false), argsort(&data, false));
        assert_eq!(argsort_auto_i64(&data, true), argsort(&data, true));
        let unsigned: Vec<u64> = data.iter().map(|&v| (v + 8) as u64).collect();
        assert_eq!(argsort_auto_u64(&unsigned, true), argsort(&unsigned, true));
    }

    #[cfg(feature = "parallel_sort")]
    #[test]
    fn test_parallel_argsort_matches_sequential() {
        let n = PARALLEL_SORT_THRESHOLD + 123;
        let data: Vec<f64> = (0..n)
            .map(|i| if i % 97 == 0 { f64::NAN } else { ((i * 7919) % 1013) as f64 - 500.0 })
            .collect();
        let cmp = |i: usize, j: usize| nan_last_cmp(&data[i], &data[j]);
        let parallel = parallel_argsort::argsort_by_parallel(n, cmp);
        assert_eq!(parallel, argsort_by(n, cmp));
        assert_eq!(argsort_by_auto(n, cmp), parallel);

        let words: Vec<Scalar> = (0..n).map(|i| Scalar::from(format!("w{}", i % 301).as_str())).collect();
        let object = argsort_object(&words).unwrap();
        let sequential = argsort_by(n, |i, j| words[i].class_cmp(&words[j]).unwrap_or(Ordering::Equal));
        assert_eq!(object, sequential);
    }

    #[test]
    fn test_object_order_rules() {
        let mixed = [Scalar::from("b"), Scalar::Int(1), Scalar::Int(0), Scalar::from("a")];
        assert_eq!(object_order(&mixed).unwrap(), ObjectOrder::NumericThenStr);
        assert_eq!(argsort_object(&mixed).unwrap(), vec![2, 1, 3, 0]);

        let bad = [Scalar::Int(1), Scalar::Timestamp(5)];
        assert!(matches!(object_order(&bad), Err(KernelError::Unorderable(_))));
        let with_null = [Scalar::Int(1), Scalar::Null];
        assert!(object_order(&with_null).is_err());
    }

    #[test]
    fn test_argsort_canonical_masked_last() {
        let mask = Bitmask::from_bools(&[true, false, true]);
        let c = Canonical::Int64(Column::with_mask(vec64![5, 0, 1], Some(mask)));
        assert_eq!(argsort_canonical(&c).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_remap_labels() {
        // values [3, 1, 2] sort to [1, 2, 3] with sorter [1, 2, 0]
        let out = remap_labels(&[1, 2, 0], &[0, 1, 2, 0, -1], -1);
        assert_eq!(out, vec64![2, 0, 1, 2, -1]);
    }

    #[test]
    fn test_remap_labels_out_of_bounds_and_wrap() {
        // values [3, 1, 2, 0, 4] sort with sorter [3, 1, 2, 0, 4]
        let sorter = [3, 1, 2, 0, 4];
        let out = remap_labels(&sorter, &[0, 1, 1, 2, 3, 0, -1, 4], -1);
        assert_eq!(out, vec64![3, 1, 1, 2, 0, 3, -1, 4]);
        let out = remap_labels(&sorter, &[0, 101, 102, 2, 3, 0, 99, 4], -1);
        assert_eq!(out, vec64![3, -1, -1, 2, 0, 3, -1, 4]);
        let out = remap_labels(&sorter, &[0, 1, 1, 2, 3, 0, 99, 4], 99);
        assert_eq!(out, vec64![3, 1, 1, 2, 0, 3, 99, 4]);
        let out = remap_labels(&sorter, &[-2], 99);
        assert_eq!(out, vec64![0]);
    }

    #[test]
    fn test_sorted_membership_matches_hash_rules() {
        let data = [1.0, f64::NAN, 4.0];
        let hay = [f64::NAN, 4.0];
        let out = sorted_membership(&data, |i| data[i].is_nan(), &hay, |i| hay[i].is_nan());
        assert_eq!(out, vec64![false, true, true]);
    }
}
