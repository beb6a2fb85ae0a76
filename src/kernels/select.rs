// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Selection Kernels** - *Partial selection and top-n rows*
//!
//! - [`kth_smallest`]: average linear-time selection on a scratch copy.
//! - [`select_n_series`]: positions of the `n` smallest or largest values, with
//!   `keep` deciding which of several tied values survive the cut.
//! - [`select_n_frame`]: multi-key top-n. Each key narrows the set of rows still
//!   tied on the previous keys.
//!
//! Only real numeric (bool and integer included) and datelike inputs can be
//! selected. Missing values are dropped before selection.

use std::cmp::Ordering;

use log::debug;
use minarrow::Vec64;

use crate::errors::KernelError;
use crate::kernels::hashtable::{HashTable, duplicated, ismember};
use crate::kernels::normalize::{Canonical, ensure_data};
use crate::kernels::sort::nan_last_cmp;
use crate::operators::{Keep, SelectMethod};
use crate::utils::confirm_equal_len;
use crate::values::Values;

/// Key type usable by the selection kernels.
pub trait SelectKey: Copy {
    /// Order-reversing map; turns a largest-n problem into a smallest-n one.
    fn flip(self) -> Self;
    fn key_cmp(&self, other: &Self) -> Ordering;
}

impl SelectKey for i64 {
    // Bitwise not is order-reversing and cannot overflow, unlike negation.
    #[inline(always)]
    fn flip(self) -> Self {
        !self
    }

    #[inline(always)]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl SelectKey for u64 {
    #[inline(always)]
    fn flip(self) -> Self {
        !self
    }

    #[inline(always)]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl SelectKey for f64 {
    #[inline(always)]
    fn flip(self) -> Self {
        -self
    }

    #[inline(always)]
    fn key_cmp(&self, other: &Self) -> Ordering {
        nan_last_cmp(self, other)
    }
}

/// Returns the `k`-th smallest element (zero-based), or `None` when `k` is out
/// of range. Works on a copy; `data` is never reordered.
pub fn kth_smallest<T: SelectKey>(data: &[T], k: usize) -> Option<T> {
    let n = data.len();
    if k >= n {
        return None;
    }
    let mut a: Vec<T> = data.to_vec();
    let k = k as isize;
    let (mut l, mut m) = (0isize, n as isize - 1);
    while l < m {
        let x = a[k as usize];
        let (mut i, mut j) = (l, m);
        loop {
            while a[i as usize].key_cmp(&x) == Ordering::Less {
                i += 1;
            }
            while x.key_cmp(&a[j as usize]) == Ordering::Less {
                j -= 1;
            }
            if i <= j {
                a.swap(i as usize, j as usize);
                i += 1;
                j -= 1;
            }
            if i > j {
                break;
            }
        }
        if j < k {
            l = i;
        }
        if k < i {
            m = j;
        }
    }
    Some(a[k as usize])
}

fn select_keys<T: SelectKey>(
    data: &[T],
    valid: impl Fn(usize) -> bool,
    n: usize,
    keep: Keep,
    method: SelectMethod,
) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let dropped: Vec<usize> = (0..data.len()).filter(|&i| valid(i)).collect();
    let mut work: Vec<T> = dropped
        .iter()
        .map(|&p| match method {
            SelectMethod::Largest => data[p].flip(),
            SelectMethod::Smallest => data[p],
        })
        .collect();
    let narr = work.len();
    if keep == Keep::Last {
        work.reverse();
    }

    let mut candidates: Vec<usize> = if n >= narr {
        (0..narr).collect()
    } else {
        match kth_smallest(&work, n - 1) {
            Some(kth) => (0..narr)
                .filter(|&i| work[i].key_cmp(&kth) != Ordering::Greater)
                .collect(),
            None => (0..narr).collect(),
        }
    };
    candidates.sort_by(|&a, &b| work[a].key_cmp(&work[b]));
    candidates.truncate(n);

    candidates
        .into_iter()
        .map(|i| {
            let i = if keep == Keep::Last { narr - 1 - i } else { i };
            dropped[i]
        })
        .collect()
}

fn check_keep(keep: Keep) -> Result<(), KernelError> {
    match keep {
        Keep::First | Keep::Last => Ok(()),
        Keep::Neither => Err(KernelError::InvalidArguments(
            "keep must be either \"first\" or \"last\"".into(),
        )),
    }
}

fn check_selectable(values: &Values, method: SelectMethod, label: &str) -> Result<(), KernelError> {
    let ok = values.is_numeric() || values.is_datelike();
    if ok {
        Ok(())
    } else {
        Err(KernelError::UnsupportedType(format!(
            "{} has dtype {}, cannot use method '{}' with this dtype",
            label,
            values.kind_name(),
            method
        )))
    }
}

fn select_canonical(
    values: &Canonical,
    n: usize,
    keep: Keep,
    method: SelectMethod,
) -> Result<Vec<usize>, KernelError> {
    match values {
        Canonical::Int64(c) => Ok(select_keys(&c.data, |i| c.is_valid(i), n, keep, method)),
        Canonical::UInt64(c) => Ok(select_keys(&c.data, |i| c.is_valid(i), n, keep, method)),
        Canonical::Float64(c) => Ok(select_keys(
            &c.data,
            |i| c.is_valid(i) && !c.data[i].is_nan(),
            n,
            keep,
            method,
        )),
        _ => Err(KernelError::UnsupportedType(
            "select_n: non-numeric canonical buffer".into(),
        )),
    }
}

/// Positions of the `n` smallest or largest non-missing values, ordered
/// smallest-first for `Smallest` and largest-first for `Largest`.
pub fn select_n_series(
    values: &Values,
    n: usize,
    keep: Keep,
    method: SelectMethod,
) -> Result<Vec64<usize>, KernelError> {
    check_keep(keep)?;
    check_selectable(values, method, "series")?;
    let norm = ensure_data(values);
    Ok(select_canonical(&norm.canonical, n, keep, method)?.into_iter().collect())
}

/// Named, equal-length columns.
#[derive(Debug, Clone)]
pub struct Frame {
    columns: Vec<(String, Values)>,
    nrows: usize,
}

impl Frame {
    pub fn new(columns: Vec<(String, Values)>) -> Result<Self, KernelError> {
        let nrows = columns.first().map_or(0, |(_, v)| v.len());
        for (name, v) in &columns {
            confirm_equal_len(&format!("frame column '{}'", name), nrows, v.len())?;
        }
        Ok(Self { columns, nrows })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn column(&self, name: &str) -> Result<&Values, KernelError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| KernelError::ColumnNotFound(name.to_string()))
    }
}

fn distinct_count(values: &Canonical) -> usize {
    crate::with_canonical!(values, c => {
        let mut t = HashTable::with_capacity(c.len());
        t.unique(&c.data, c.null_mask.as_ref()).len()
    })
}

fn member_mask(values: &Canonical, probe: &Canonical) -> Result<Vec64<bool>, KernelError> {
    Ok(match (values, probe) {
        (Canonical::Int64(a), Canonical::Int64(b)) => {
            ismember(&a.data, a.null_mask.as_ref(), &b.data, b.null_mask.as_ref())
        }
        (Canonical::UInt64(a), Canonical::UInt64(b)) => {
            ismember(&a.data, a.null_mask.as_ref(), &b.data, b.null_mask.as_ref())
        }
        (Canonical::Float64(a), Canonical::Float64(b)) => {
            ismember(&a.data, a.null_mask.as_ref(), &b.data, b.null_mask.as_ref())
        }
        _ => {
            return Err(KernelError::TypeMismatch(
                "select_n: membership across different canonical widths".into(),
            ));
        }
    })
}

fn canonical_cmp(values: &Canonical, i: usize, j: usize) -> Ordering {
    match values {
        Canonical::Int64(c) => match (c.is_valid(i), c.is_valid(j)) {
            (true, true) => c.data[i].cmp(&c.data[j]),
            (a, b) => b.cmp(&a),
        },
        Canonical::UInt64(c) => match (c.is_valid(i), c.is_valid(j)) {
            (true, true) => c.data[i].cmp(&c.data[j]),
            (a, b) => b.cmp(&a),
        },
        Canonical::Float64(c) => nan_last_cmp(&c.data[i], &c.data[j]),
        _ => Ordering::Equal,
    }
}

/// Multi-key top-n over `columns` in priority order. Returns frame row
/// positions ordered by the keys.
pub fn select_n_frame(
    frame: &Frame,
    n: usize,
    keep: Keep,
    method: SelectMethod,
    columns: &[&str],
) -> Result<Vec64<usize>, KernelError> {
    check_keep(keep)?;
    if columns.is_empty() {
        return Err(KernelError::InvalidArguments(
            "select_n: at least one column is required".into(),
        ));
    }
    let mut keys: Vec<Canonical> = Vec::with_capacity(columns.len());
    for name in columns {
        let col = frame.column(name)?;
        check_selectable(col, method, &format!("column '{}'", name))?;
        keys.push(ensure_data(col).canonical);
    }

    let mut rows: Vec<usize> = (0..frame.nrows()).collect();
    let mut indexer: Vec<usize> = Vec::new();
    let mut cur_n = n;

    for (depth, key) in keys.iter().enumerate() {
        let series = key.take(&rows);
        let picked = select_canonical(&series, cur_n, keep, method)?;
        let picked_values = series.take(&picked);
        let is_last = depth + 1 == keys.len();
        let members = member_mask(&series, &picked_values)?;
        let member_count = members.iter().filter(|&&m| m).count();

        if is_last || distinct_count(&picked_values) == member_count {
            indexer.extend(picked.iter().map(|&p| rows[p]));
            break;
        }

        let dup_filter = duplicated_canonical(&series)?;
        let (dups, non_dups): (Vec<usize>, Vec<usize>) =
            picked.iter().partition(|&&p| dup_filter[p]);
        indexer.extend(non_dups.iter().map(|&p| rows[p]));

        let dup_values = series.take(&dups);
        let still_tied = member_mask(&series, &dup_values)?;
        rows = rows
            .iter()
            .zip(still_tied.iter())
            .filter_map(|(&r, &tied)| tied.then_some(r))
            .collect();
        cur_n = n.saturating_sub(indexer.len());
        debug!(
            "select_n: key {} left {} tied rows, {} still to pick",
            depth,
            rows.len(),
            cur_n
        );
    }

    let descending = method == SelectMethod::Largest;
    indexer.sort_by(|&a, &b| {
        for key in &keys {
            let o = canonical_cmp(key, a, b);
            let o = if descending { o.reverse() } else { o };
            if o != Ordering::Equal {
                return o;
            }
        }
        Ordering::Equal
    });
    Ok(indexer.into_iter().collect())
}

fn duplicated_canonical(values: &Canonical) -> Result<Vec64<bool>, KernelError> {
    Ok(crate::with_canonical!(values, c => duplicated(&c.data, c.null_mask.as_ref(), Keep::Neither)))
}

/// Input to [`select_n`].
#[derive(Debug, Clone, Copy)]
pub enum SelectInput<'a> {
    Series(&'a Values),
    Frame(&'a Frame),
}

/// Top-n selection over a series or a frame. For frames, `columns` defaults to
/// every column in frame order.
pub fn select_n(
    obj: SelectInput<'_>,
    n: usize,
    keep: Keep,
    method: SelectMethod,
    columns: Option<&[&str]>,
) -> Result<Vec64<usize>, KernelError> {
    match obj {
        SelectInput::Series(v) => select_n_series(v, n, keep, method),
        SelectInput::Frame(f) => match columns {
            Some(cols) => select_n_frame(f, n, keep, method, cols),
            None => {
                let all: Vec<&str> = f.names().collect();
                select_n_frame(f, n, keep, method, &all)
            }
        },
    }
}
