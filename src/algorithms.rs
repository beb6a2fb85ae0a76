// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Algorithms** - *Hashed array algorithms over typed buffers*
//!
//! Entry points for the hashed and sorted algorithms. Every call normalises
//! its input to a canonical buffer, runs one kernel, and reconstructs the
//! result in the caller's element kind:
//!
//! - [`factorize`], [`unique`], [`match_values`], [`isin`]
//! - [`value_counts`], [`duplicated`], [`mode`], [`safe_sort`]
//!
//! The positional kernels are re-exported here so callers need a single import:
//! [`rank`], [`quantile`], [`take_nd`], [`checked_add_with_arr`], [`diff`] and
//! [`select_n`].
//!
//! No call holds state between invocations. Inputs are never modified; on
//! error no output is produced.

use log::{debug, warn};
use minarrow::{BooleanArray, CategoricalArray, Vec64};

use crate::config::{CUT_EDGE_ADJUST, ISIN_HASH_LIMIT, MATCH_TABLE_SIZE_CAP};
use crate::errors::KernelError;
use crate::kernels::hashtable::{self, HashTable, UniqueVector};
use crate::kernels::normalize::{AlgorithmDtype, Canonical, ensure_data, ensure_pair};
use crate::kernels::sort::{argsort_auto_i64, argsort_canonical, remap_labels, sorted_membership};
use crate::operators::Keep;
use crate::utils::boolean_array;
use crate::values::{Scalar, Values};
use crate::with_canonical;

pub use crate::kernels::arithmetic::{Addend, MaskArg, checked_add_with_arr};
pub use crate::kernels::diff::diff;
pub use crate::kernels::quantile::{quantile, quantiles};
pub use crate::kernels::rank::rank;
pub use crate::kernels::select::{Frame, SelectInput, select_n};
pub use crate::kernels::take::{take_2d_multi, take_nd, take_nd_into};

/// Runs `$body` with `$a` and `$b` bound to the inner columns of two canonical
/// buffers of the same width.
macro_rules! with_canonical_pair {
    ($fname:literal, $l:expr, $r:expr, ($a:ident, $b:ident) => $body:expr) => {
        match ($l, $r) {
            (Canonical::Int64($a), Canonical::Int64($b)) => $body,
            (Canonical::UInt64($a), Canonical::UInt64($b)) => $body,
            (Canonical::Float64($a), Canonical::Float64($b)) => $body,
            (Canonical::Bytes($a), Canonical::Bytes($b)) => $body,
            (Canonical::Object($a), Canonical::Object($b)) => $body,
            _ => {
                return Err(KernelError::TypeMismatch(format!(
                    "{}: operands normalised to different widths",
                    $fname
                )));
            }
        }
    };
}

/// Sorts a canonical buffer, returning it with the permutation used.
fn sort_canonical(values: Canonical) -> Result<(Canonical, Vec<usize>), KernelError> {
    let sorter = argsort_canonical(&values)?;
    Ok((values.take(&sorter), sorter))
}

fn distinct_len(values: &Canonical) -> usize {
    with_canonical!(values, c => {
        let mut table = HashTable::with_capacity(c.len());
        table.unique(&c.data[..], c.null_mask.as_ref()).len()
    })
}

// Factorize

/// Encodes `values` as integer labels into a table of first-seen uniques.
///
/// Missing values receive `na_sentinel` and never appear in the uniques.
/// With `sort`, uniques are sorted and labels remapped to match.
/// `size_hint` presizes the hash table; it defaults to the input length.
///
/// Categorical input is factorized on its codes and its uniques keep the
/// original categories.
pub fn factorize(
    values: &Values,
    sort: bool,
    na_sentinel: i64,
    size_hint: Option<usize>,
) -> Result<(Vec64<i64>, Values), KernelError> {
    let norm = ensure_data(values);
    debug!(
        "factorize: len={} dtype={:?} sort={}",
        values.len(),
        norm.dtype,
        sort
    );
    let hint = size_hint.unwrap_or(values.len());
    let (labels, uniques) = with_canonical!(&norm.canonical, c => {
        let mut table = HashTable::with_capacity(hint);
        let mut uniques = UniqueVector::new();
        let labels = table.get_labels(
            &c.data[..],
            c.null_mask.as_ref(),
            &mut uniques,
            0,
            na_sentinel,
            true,
        );
        (labels, Canonical::from(uniques.into_column()))
    });

    let (labels, uniques) = if sort && !uniques.is_empty() {
        let (sorted, sorter) = sort_canonical(uniques)?;
        (remap_labels(&sorter, &labels, na_sentinel), sorted)
    } else {
        (labels, uniques)
    };
    Ok((labels, norm.recipe.reconstruct(uniques)?))
}

// Unique

/// Unique values in order of first appearance. A missing value, if present,
/// is kept once at its first position.
///
/// For categoricals the result is categorical. Unordered input keeps only the
/// categories that appear, in order of appearance; ordered input keeps the
/// appearing categories in their original order.
pub fn unique(values: &Values) -> Result<Values, KernelError> {
    if let Values::Categorical { array, ordered } = values {
        debug!("unique: len={} categorical ordered={}", values.len(), ordered);
        return unique_categorical(array, *ordered);
    }
    let norm = ensure_data(values);
    debug!("unique: len={} dtype={:?}", values.len(), norm.dtype);
    let uniques = with_canonical!(&norm.canonical, c => {
        let mut table = HashTable::with_capacity(c.len());
        Canonical::from(table.unique(&c.data[..], c.null_mask.as_ref()).into_column())
    });
    norm.recipe.reconstruct(uniques)
}

fn check_codes(array: &CategoricalArray<u32>) -> Result<(), KernelError> {
    let ncat = array.unique_values.len();
    for (i, &code) in array.data.iter().enumerate() {
        let valid = array.null_mask.as_ref().map_or(true, |m| m.get(i));
        if valid && code as usize >= ncat {
            return Err(KernelError::OutOfBounds(format!(
                "category code {} at position {} outside {} categories",
                code, i, ncat
            )));
        }
    }
    Ok(())
}

fn unique_categorical(array: &CategoricalArray<u32>, ordered: bool) -> Result<Values, KernelError> {
    check_codes(array)?;
    let codes: Vec64<i64> = array.data.iter().map(|&c| c as i64).collect();
    let mut table = HashTable::with_capacity(codes.len());
    let seen = table.unique(&codes[..], array.null_mask.as_ref());
    let na_pos = seen.na_pos();

    let mut present: Vec<i64> = seen
        .as_slice()
        .iter()
        .enumerate()
        .filter(|&(i, _)| Some(i) != na_pos)
        .map(|(_, &c)| c)
        .collect();
    if ordered {
        present.sort_unstable();
    }
    let mut remap = vec![0u32; array.unique_values.len()];
    for (new, &old) in present.iter().enumerate() {
        remap[old as usize] = new as u32;
    }
    let categories: Vec<&str> = present
        .iter()
        .map(|&c| array.unique_values[c as usize].as_str())
        .collect();
    let new_codes: Vec<Option<u32>> = seen
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, &c)| (Some(i) != na_pos).then(|| remap[c as usize]))
        .collect();
    Ok(Values::categorical(&new_codes, &categories, ordered))
}

// Match and membership

/// Position of each element of `to_match` within `values`, or `na_sentinel`
/// when absent. Duplicates in `values` resolve to their last position.
/// Missing matches missing.
pub fn match_values(
    to_match: &Values,
    values: &Values,
    na_sentinel: i64,
) -> Result<Vec64<i64>, KernelError> {
    let (haystack, probe) = ensure_pair(values, to_match);
    debug!(
        "match: len={} against={} dtype={:?}",
        to_match.len(),
        values.len(),
        haystack.dtype
    );
    let hint = values.len().min(MATCH_TABLE_SIZE_CAP);
    let positions = with_canonical_pair!("match", &haystack.canonical, &probe, (h, p) => {
        let mut table = HashTable::with_capacity(hint);
        table.map_locations(&h.data[..], h.null_mask.as_ref());
        table.lookup(&p.data[..], p.null_mask.as_ref())
    });
    Ok(positions
        .iter()
        .map(|&p| if p == -1 { na_sentinel } else { p })
        .collect())
}

/// Sort-and-search membership for the typed widths. Object buffers have no
/// total order and return `None`.
fn sorted_isin(comps: &Canonical, values: &Canonical) -> Option<Vec64<bool>> {
    Some(match (comps, values) {
        (Canonical::Int64(a), Canonical::Int64(b)) => {
            sorted_membership(&a.data[..], |i| !a.is_valid(i), &b.data[..], |i| !b.is_valid(i))
        }
        (Canonical::UInt64(a), Canonical::UInt64(b)) => {
            sorted_membership(&a.data[..], |i| !a.is_valid(i), &b.data[..], |i| !b.is_valid(i))
        }
        (Canonical::Float64(a), Canonical::Float64(b)) => sorted_membership(
            &a.data[..],
            |i| !a.is_valid(i) || a.data[i].is_nan(),
            &b.data[..],
            |i| !b.is_valid(i) || b.data[i].is_nan(),
        ),
        (Canonical::Bytes(a), Canonical::Bytes(b)) => {
            sorted_membership(&a.data[..], |i| !a.is_valid(i), &b.data[..], |i| !b.is_valid(i))
        }
        _ => return None,
    })
}

/// Whether each element of `comps` occurs in `values`. Missing is a member
/// when `values` contains a missing element.
pub fn isin(comps: &Values, values: &Values) -> Result<BooleanArray<()>, KernelError> {
    let (lhs, haystack) = ensure_pair(comps, values);
    debug!(
        "isin: len={} against={} dtype={:?}",
        comps.len(),
        values.len(),
        lhs.dtype
    );
    if comps.len() > ISIN_HASH_LIMIT && lhs.dtype != AlgorithmDtype::Object {
        if let Some(found) = sorted_isin(&lhs.canonical, &haystack) {
            return Ok(boolean_array(&found));
        }
    }
    Ok(boolean_array(&hashed_isin(&lhs.canonical, &haystack)?))
}

fn hashed_isin(comps: &Canonical, values: &Canonical) -> Result<Vec64<bool>, KernelError> {
    Ok(with_canonical_pair!("isin", comps, values, (a, b) => {
        hashtable::ismember(&a.data[..], a.null_mask.as_ref(), &b.data[..], b.null_mask.as_ref())
    }))
}

// Value counts

/// Options for [`value_counts`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueCountsOptions {
    /// Sort by count.
    pub sort: bool,
    pub ascending: bool,
    /// Report relative frequencies instead of counts.
    pub normalize: bool,
    /// Cut numeric input into this many equal-width bins first.
    pub bins: Option<usize>,
    /// Leave missing values out of the result.
    pub dropna: bool,
}

impl Default for ValueCountsOptions {
    fn default() -> Self {
        Self {
            sort: true,
            ascending: false,
            normalize: false,
            bins: None,
            dropna: true,
        }
    }
}

/// Absolute or normalised counts.
#[derive(Debug, Clone, PartialEq)]
pub enum Counts {
    Absolute(Vec64<i64>),
    Normalized(Vec64<f64>),
}

impl Counts {
    pub fn len(&self) -> usize {
        match self {
            Counts::Absolute(c) => c.len(),
            Counts::Normalized(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct keys and how often each occurs.
#[derive(Debug, Clone)]
pub struct ValueCounts {
    pub keys: Values,
    pub counts: Counts,
}

/// Counts of each distinct value.
///
/// Without sorting, keys appear in first-seen order with a kept missing key
/// first. Categorical input reports every category in category order, zero
/// counts included, with a kept missing key last. Binned input reports every
/// bin in edge order as `Scalar::Interval` keys, with a kept missing key last.
///
/// Sorting is stable ascending by count, reversed when `ascending` is false.
/// `normalize` divides by the total of the reported counts, or by the input
/// length when binning.
pub fn value_counts(values: &Values, opts: ValueCountsOptions) -> Result<ValueCounts, KernelError> {
    debug!(
        "value_counts: len={} kind={} bins={:?} dropna={}",
        values.len(),
        values.kind_name(),
        opts.bins,
        opts.dropna
    );
    let (keys, counts) = match (values, opts.bins) {
        (_, Some(bins)) => binned_counts(values, bins, opts.dropna)?,
        (Values::Categorical { array, ordered }, None) => {
            categorical_counts(array, *ordered, opts.dropna)?
        }
        _ => {
            let norm = ensure_data(values);
            let (keys, counts) = with_canonical!(&norm.canonical, c => {
                let (keys, counts) = hashtable::value_count(&c.data[..], c.null_mask.as_ref(), opts.dropna);
                (Canonical::from(keys.into_column()), counts)
            });
            (norm.recipe.reconstruct(keys)?, counts)
        }
    };

    let (keys, counts) = if opts.sort {
        let mut order = argsort_auto_i64(&counts[..], false);
        if !opts.ascending {
            order.reverse();
        }
        let sorted: Vec64<i64> = order.iter().map(|&i| counts[i]).collect();
        (keys.take(&order), sorted)
    } else {
        (keys, counts)
    };

    let counts = if opts.normalize {
        let total = match opts.bins {
            Some(_) => values.len() as f64,
            None => counts.iter().sum::<i64>() as f64,
        };
        Counts::Normalized(counts.iter().map(|&c| c as f64 / total).collect())
    } else {
        Counts::Absolute(counts)
    };
    Ok(ValueCounts { keys, counts })
}

fn categorical_counts(
    array: &CategoricalArray<u32>,
    ordered: bool,
    dropna: bool,
) -> Result<(Values, Vec64<i64>), KernelError> {
    check_codes(array)?;
    let ncat = array.unique_values.len();
    let mut counts: Vec64<i64> = (0..ncat).map(|_| 0).collect();
    let mut na = 0i64;
    for (i, &code) in array.data.iter().enumerate() {
        if array.null_mask.as_ref().map_or(true, |m| m.get(i)) {
            counts[code as usize] += 1;
        } else {
            na += 1;
        }
    }
    let mut codes: Vec<Option<u32>> = (0..ncat as u32).map(Some).collect();
    if !dropna && na > 0 {
        codes.push(None);
        counts.push(na);
    }
    let categories: Vec<&str> = array.unique_values.iter().map(|s| s.as_str()).collect();
    Ok((Values::categorical(&codes, &categories, ordered), counts))
}

/// Element values as `f64`, NaN for missing. Numeric input only.
fn numeric_as_f64(values: &Values) -> Result<Vec<f64>, KernelError> {
    let unsupported = || {
        KernelError::UnsupportedType(format!(
            "bins argument only works with numeric data, got {}",
            values.kind_name()
        ))
    };
    if !values.is_numeric() {
        return Err(unsupported());
    }
    Ok(match ensure_data(values).canonical {
        Canonical::Int64(c) => (0..c.len())
            .map(|i| if c.is_valid(i) { c.data[i] as f64 } else { f64::NAN })
            .collect(),
        Canonical::UInt64(c) => (0..c.len())
            .map(|i| if c.is_valid(i) { c.data[i] as f64 } else { f64::NAN })
            .collect(),
        Canonical::Float64(c) => (0..c.len())
            .map(|i| if c.is_valid(i) { c.data[i] } else { f64::NAN })
            .collect(),
        _ => return Err(unsupported()),
    })
}

/// `bins + 1` right-closed bin edges spanning `[mn, mx]`.
fn cut_edges(mn: f64, mx: f64, bins: usize) -> Vec<f64> {
    let widen = |v: f64| if v != 0.0 { CUT_EDGE_ADJUST * v.abs() } else { CUT_EDGE_ADJUST };
    let (lo, hi) = if mn == mx {
        (mn - widen(mn), mx + widen(mx))
    } else {
        (mn, mx)
    };
    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + step * i as f64).collect();
    edges[bins] = hi;
    if mn != mx {
        // Lowest edge is exclusive; pull it below the minimum.
        edges[0] -= (mx - mn) * CUT_EDGE_ADJUST;
    }
    edges
}

fn binned_counts(
    values: &Values,
    bins: usize,
    dropna: bool,
) -> Result<(Values, Vec64<i64>), KernelError> {
    if bins == 0 {
        return Err(KernelError::InvalidArguments(
            "value_counts: bins must be at least 1".into(),
        ));
    }
    let data = numeric_as_f64(values)?;
    let (mn, mx) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if mn > mx {
        return Err(KernelError::InvalidArguments(
            "value_counts: cannot bin input with no non-missing values".into(),
        ));
    }
    if mn.is_infinite() || mx.is_infinite() {
        return Err(KernelError::InvalidArguments(
            "value_counts: cannot bin input containing infinity".into(),
        ));
    }

    let edges = cut_edges(mn, mx, bins);
    let mut counts: Vec64<i64> = (0..bins).map(|_| 0).collect();
    let mut na = 0i64;
    for &v in &data {
        if v.is_nan() {
            na += 1;
            continue;
        }
        let bin = edges[1..].partition_point(|&e| e < v).min(bins - 1);
        counts[bin] += 1;
    }

    let mut keys: Vec64<Scalar> = edges
        .windows(2)
        .map(|w| Scalar::Interval(w[0], w[1]))
        .collect();
    if !dropna && na > 0 {
        keys.push(Scalar::Null);
        counts.push(na);
    }
    Ok((Values::Object(keys), counts))
}

// Duplicates and mode

/// Marks repeated values. `keep` chooses which occurrence stays unmarked;
/// `Keep::Neither` marks every member of a repeated group.
pub fn duplicated(values: &Values, keep: Keep) -> Result<BooleanArray<()>, KernelError> {
    let norm = ensure_data(values);
    debug!(
        "duplicated: len={} dtype={:?} keep={}",
        values.len(),
        norm.dtype,
        keep
    );
    let marks = with_canonical!(&norm.canonical, c => {
        hashtable::duplicated(&c.data[..], c.null_mask.as_ref(), keep)
    });
    Ok(boolean_array(&marks))
}

/// Most frequent non-missing values, sorted. Values that cannot be ordered are
/// returned in first-seen order. Empty input gives an empty result.
pub fn mode(values: &Values) -> Result<Values, KernelError> {
    let norm = ensure_data(values);
    debug!("mode: len={} dtype={:?}", values.len(), norm.dtype);
    let modes = with_canonical!(&norm.canonical, c => {
        Canonical::from(hashtable::mode(&c.data[..], c.null_mask.as_ref()).into_column())
    });
    let modes = match sort_canonical(modes.clone()) {
        Ok((sorted, _)) => sorted,
        Err(e) => {
            warn!("mode: {}; returning modes unsorted", e);
            modes
        }
    };
    norm.recipe.reconstruct(modes)
}

// Safe sort

/// Sorts `values`, tolerating mixed numeric and string elements (numbers
/// first).
///
/// With `labels`, also returns the labels remapped so that
/// `sorted[new_labels[i]] == values[labels[i]]`. Labels equal to
/// `na_sentinel` or outside `[-len, len)` map to `na_sentinel`. Unless
/// `assume_unique`, `values` must then be unique.
pub fn safe_sort(
    values: &Values,
    labels: Option<&[i64]>,
    na_sentinel: i64,
    assume_unique: bool,
) -> Result<(Values, Option<Vec64<i64>>), KernelError> {
    let norm = ensure_data(values);
    debug!(
        "safe_sort: len={} dtype={:?} labels={}",
        values.len(),
        norm.dtype,
        labels.is_some()
    );
    if labels.is_some() && !assume_unique && distinct_len(&norm.canonical) != values.len() {
        return Err(KernelError::NotUnique(
            "values should be unique if labels is not None".into(),
        ));
    }
    let (sorted, sorter) = sort_canonical(norm.canonical)?;
    let new_labels = labels.map(|l| remap_labels(&sorter, l, na_sentinel));
    Ok((norm.recipe.reconstruct(sorted)?, new_labels))
}
