// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Dtype Normaliser** - *Canonical buffers and reconstruction recipes*
//!
//! Classifies a [`Values`] input into one of the closed set of
//! [`AlgorithmDtype`]s, producing a [`Canonical`] buffer the hash and sort
//! kernels operate on, plus a [`Recipe`] that maps a canonical result back to
//! the caller's element kind.
//!
//! ## Coercion rules (first match wins)
//! 1. boolean → `u64` 0/1, dtype `Bool`
//! 2. signed integers → `i64`
//! 3. unsigned integers → `u64`
//! 4. floats, and complex with the imaginary part discarded → `f64`
//! 5. datelike (timestamp, timedelta, period) → `i64`, NaT as an invalid slot
//! 6. categorical → `i64` codes; the recipe carries the categories and orderedness
//! 7. strings → `Bytes`; object buffers narrow to `Bytes` when every non-null
//!    element is a string, otherwise stay `Object`

use std::fmt;

use log::warn;
use minarrow::{Bitmask, CategoricalArray, Vec64};
use num_complex::Complex64;

use crate::config::INT64_NAT;
use crate::errors::KernelError;
use crate::values::{Column, Scalar, Values};

/// Tag the hashed kernels dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmDtype {
    Int64,
    UInt64,
    Float64,
    /// Booleans routed through the `u64` table.
    Bool,
    Bytes,
    Object,
}

/// Canonical buffer handed to the kernels.
#[derive(Debug, Clone)]
pub enum Canonical {
    Int64(Column<i64>),
    UInt64(Column<u64>),
    /// Missing values are NaN; the mask, when present, agrees with it.
    Float64(Column<f64>),
    Bytes(Column<String>),
    /// Missing values are intrinsic (`Scalar::Null`, NaN, NaT).
    Object(Column<Scalar>),
}

impl Canonical {
    pub fn len(&self) -> usize {
        match self {
            Canonical::Int64(c) => c.len(),
            Canonical::UInt64(c) => c.len(),
            Canonical::Float64(c) => c.len(),
            Canonical::Bytes(c) => c.len(),
            Canonical::Object(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gathers positions into a new canonical buffer of the same width.
    pub fn take(&self, positions: &[usize]) -> Canonical {
        match self {
            Canonical::Int64(c) => Canonical::Int64(c.take(positions)),
            Canonical::UInt64(c) => Canonical::UInt64(c.take(positions)),
            Canonical::Float64(c) => Canonical::Float64(c.take(positions)),
            Canonical::Bytes(c) => Canonical::Bytes(c.take(positions)),
            Canonical::Object(c) => Canonical::Object(c.take(positions)),
        }
    }
}

impl From<Column<i64>> for Canonical {
    fn from(c: Column<i64>) -> Self {
        Canonical::Int64(c)
    }
}

impl From<Column<u64>> for Canonical {
    fn from(c: Column<u64>) -> Self {
        Canonical::UInt64(c)
    }
}

impl From<Column<f64>> for Canonical {
    fn from(c: Column<f64>) -> Self {
        Canonical::Float64(c)
    }
}

impl From<Column<String>> for Canonical {
    fn from(c: Column<String>) -> Self {
        Canonical::Bytes(c)
    }
}

impl From<Column<Scalar>> for Canonical {
    fn from(c: Column<Scalar>) -> Self {
        Canonical::Object(c)
    }
}

/// Runs `$body` with `$col` bound to the inner column of any canonical variant.
/// The body must evaluate to the same type in every arm.
#[macro_export]
macro_rules! with_canonical {
    ($canon:expr, $col:ident => $body:expr) => {
        match $canon {
            $crate::kernels::normalize::Canonical::Int64($col) => $body,
            $crate::kernels::normalize::Canonical::UInt64($col) => $body,
            $crate::kernels::normalize::Canonical::Float64($col) => $body,
            $crate::kernels::normalize::Canonical::Bytes($col) => $body,
            $crate::kernels::normalize::Canonical::Object($col) => $body,
        }
    };
}

/// Original element kind recorded by a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Datetime,
    Timedelta,
    Period,
    Categorical,
    Utf8,
    Object,
}

impl SourceKind {
    pub fn is_datelike(self) -> bool {
        matches!(
            self,
            SourceKind::Datetime | SourceKind::Timedelta | SourceKind::Period
        )
    }
}

/// Maps a canonical result buffer back into the original kind.
pub type Rehydrate = fn(Canonical, &Recipe) -> Result<Values, KernelError>;

/// Reconstruction recipe: original kind, per-kind metadata, and the callback
/// that rebuilds a [`Values`] from a canonical buffer.
#[derive(Clone)]
pub struct Recipe {
    pub kind: SourceKind,
    pub tz: Option<String>,
    pub freq: Option<String>,
    pub categories: Option<Vec64<String>>,
    pub ordered: bool,
    /// Set when complex input had a non-zero imaginary part.
    pub discarded_imaginary: bool,
    rehydrate: Rehydrate,
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("kind", &self.kind)
            .field("tz", &self.tz)
            .field("freq", &self.freq)
            .field("categories", &self.categories)
            .field("ordered", &self.ordered)
            .field("discarded_imaginary", &self.discarded_imaginary)
            .finish()
    }
}

impl Recipe {
    fn plain(kind: SourceKind, rehydrate: Rehydrate) -> Self {
        Self {
            kind,
            tz: None,
            freq: None,
            categories: None,
            ordered: false,
            discarded_imaginary: false,
            rehydrate,
        }
    }

    /// Rebuilds a result in the caller's element kind.
    #[inline]
    pub fn reconstruct(&self, canonical: Canonical) -> Result<Values, KernelError> {
        (self.rehydrate)(canonical, self)
    }
}

/// Output of [`ensure_data`].
#[derive(Debug, Clone)]
pub struct Normalized {
    pub canonical: Canonical,
    pub dtype: AlgorithmDtype,
    pub recipe: Recipe,
}

impl Normalized {
    /// Identity normalisation of an already-canonical buffer.
    pub fn from_canonical(canonical: Canonical) -> Self {
        let (dtype, recipe) = match &canonical {
            Canonical::Int64(_) => (
                AlgorithmDtype::Int64,
                Recipe::plain(SourceKind::Int64, rehydrate_int64),
            ),
            Canonical::UInt64(_) => (
                AlgorithmDtype::UInt64,
                Recipe::plain(SourceKind::UInt64, rehydrate_uint64),
            ),
            Canonical::Float64(_) => (
                AlgorithmDtype::Float64,
                Recipe::plain(SourceKind::Float64, rehydrate_float64),
            ),
            Canonical::Bytes(_) => (
                AlgorithmDtype::Bytes,
                Recipe::plain(SourceKind::Utf8, rehydrate_utf8),
            ),
            Canonical::Object(_) => (
                AlgorithmDtype::Object,
                Recipe::plain(SourceKind::Object, rehydrate_object),
            ),
        };
        Self {
            canonical,
            dtype,
            recipe,
        }
    }
}

/// Widens a masked column through `f`, keeping the mask.
#[inline]
fn widen<T: Copy, U>(c: &Column<T>, f: impl Fn(T) -> U) -> Column<U> {
    Column::with_mask(c.data.iter().map(|&v| f(v)).collect(), c.null_mask.clone())
}

/// Floats carry NA as NaN; masked slots are rewritten to NaN.
#[inline]
fn widen_float<T: Copy>(c: &Column<T>, f: impl Fn(T) -> f64) -> Column<f64> {
    let data: Vec64<f64> = c
        .data
        .iter()
        .enumerate()
        .map(|(i, &v)| if c.is_valid(i) { f(v) } else { f64::NAN })
        .collect();
    Column::new(data)
}

/// NaT becomes an invalid slot.
#[inline]
fn nat_masked(data: &[i64]) -> Column<i64> {
    let null_mask = if data.iter().any(|&v| v == INT64_NAT) {
        let bools: Vec<bool> = data.iter().map(|&v| v != INT64_NAT).collect();
        Some(Bitmask::from_bools(&bools))
    } else {
        None
    };
    Column::with_mask(Vec64::from_slice(data), null_mask)
}

/// Classifies `values` and produces its canonical buffer and recipe.
pub fn ensure_data(values: &Values) -> Normalized {
    use SourceKind as K;
    let (canonical, dtype, recipe) = match values {
        Values::Boolean(c) => (
            Canonical::UInt64(widen(c, |v| v as u64)),
            AlgorithmDtype::Bool,
            Recipe::plain(K::Boolean, rehydrate_bool),
        ),
        Values::Int8(c) => (
            Canonical::Int64(widen(c, |v| v as i64)),
            AlgorithmDtype::Int64,
            Recipe::plain(K::Int8, rehydrate_int8),
        ),
        Values::Int16(c) => (
            Canonical::Int64(widen(c, |v| v as i64)),
            AlgorithmDtype::Int64,
            Recipe::plain(K::Int16, rehydrate_int16),
        ),
        Values::Int32(c) => (
            Canonical::Int64(widen(c, |v| v as i64)),
            AlgorithmDtype::Int64,
            Recipe::plain(K::Int32, rehydrate_int32),
        ),
        Values::Int64(c) => (
            Canonical::Int64(c.clone()),
            AlgorithmDtype::Int64,
            Recipe::plain(K::Int64, rehydrate_int64),
        ),
        Values::UInt8(c) => (
            Canonical::UInt64(widen(c, |v| v as u64)),
            AlgorithmDtype::UInt64,
            Recipe::plain(K::UInt8, rehydrate_uint8),
        ),
        Values::UInt16(c) => (
            Canonical::UInt64(widen(c, |v| v as u64)),
            AlgorithmDtype::UInt64,
            Recipe::plain(K::UInt16, rehydrate_uint16),
        ),
        Values::UInt32(c) => (
            Canonical::UInt64(widen(c, |v| v as u64)),
            AlgorithmDtype::UInt64,
            Recipe::plain(K::UInt32, rehydrate_uint32),
        ),
        Values::UInt64(c) => (
            Canonical::UInt64(c.clone()),
            AlgorithmDtype::UInt64,
            Recipe::plain(K::UInt64, rehydrate_uint64),
        ),
        Values::Float32(c) => (
            Canonical::Float64(widen_float(c, |v| v as f64)),
            AlgorithmDtype::Float64,
            Recipe::plain(K::Float32, rehydrate_float32),
        ),
        Values::Float64(c) => (
            Canonical::Float64(widen_float(c, |v| v)),
            AlgorithmDtype::Float64,
            Recipe::plain(K::Float64, rehydrate_float64),
        ),
        Values::Complex64(c) => {
            let mut recipe = Recipe::plain(K::Complex64, rehydrate_complex);
            recipe.discarded_imaginary = c.data.iter().any(|z| z.im != 0.0);
            if recipe.discarded_imaginary {
                warn!("complex input: imaginary part discarded for hashing");
            }
            (
                Canonical::Float64(widen_float(c, |z| z.re)),
                AlgorithmDtype::Float64,
                recipe,
            )
        }
        Values::Datetime { data, tz } => {
            let mut recipe = Recipe::plain(K::Datetime, rehydrate_datetime);
            recipe.tz = tz.clone();
            (Canonical::Int64(nat_masked(data)), AlgorithmDtype::Int64, recipe)
        }
        Values::Timedelta(data) => (
            Canonical::Int64(nat_masked(data)),
            AlgorithmDtype::Int64,
            Recipe::plain(K::Timedelta, rehydrate_timedelta),
        ),
        Values::Period { ordinals, freq } => {
            let mut recipe = Recipe::plain(K::Period, rehydrate_period);
            recipe.freq = Some(freq.clone());
            (
                Canonical::Int64(nat_masked(ordinals)),
                AlgorithmDtype::Int64,
                recipe,
            )
        }
        Values::Categorical { array, ordered } => {
            let mut recipe = Recipe::plain(K::Categorical, rehydrate_categorical);
            recipe.categories = Some(array.unique_values.clone());
            recipe.ordered = *ordered;
            let codes: Vec64<i64> = array.data.iter().map(|&c| c as i64).collect();
            (
                Canonical::Int64(Column::with_mask(codes, array.null_mask.clone())),
                AlgorithmDtype::Int64,
                recipe,
            )
        }
        Values::Utf8(c) => (
            Canonical::Bytes(c.clone()),
            AlgorithmDtype::Bytes,
            Recipe::plain(K::Utf8, rehydrate_utf8),
        ),
        Values::Object(items) => {
            let all_str = items
                .iter()
                .all(|s| matches!(s, Scalar::Str(_) | Scalar::Null));
            if all_str && items.iter().any(|s| matches!(s, Scalar::Str(_))) {
                let opts: Vec<Option<String>> = items
                    .iter()
                    .map(|s| match s {
                        Scalar::Str(v) => Some(v.clone()),
                        _ => None,
                    })
                    .collect();
                (
                    Canonical::Bytes(Column::from_options(opts)),
                    AlgorithmDtype::Bytes,
                    Recipe::plain(K::Object, rehydrate_object),
                )
            } else {
                (
                    Canonical::Object(Column::new(items.clone())),
                    AlgorithmDtype::Object,
                    Recipe::plain(K::Object, rehydrate_object),
                )
            }
        }
    };
    Normalized {
        canonical,
        dtype,
        recipe,
    }
}

/// Booleans paired with an integer side take that side's width as 0 and 1.
fn bool_as_integer(values: &Values, other: AlgorithmDtype) -> Option<Values> {
    match (values, other) {
        (Values::Boolean(c), AlgorithmDtype::Int64) => Some(Values::Int64(widen(c, |v| v as i64))),
        (Values::Boolean(c), AlgorithmDtype::UInt64) => {
            Some(Values::UInt64(widen(c, |v| v as u64)))
        }
        _ => None,
    }
}

/// Normalises two inputs onto a shared canonical width.
///
/// Equal algorithm dtypes (and, for datelike input, equal kinds) keep their
/// typed buffers. A boolean side facing an integer side is read as 0 and 1.
/// Anything else is lifted to `Object` on both sides, where numeric scalars
/// compare by value. Categoricals are compared by their decoded values.
pub fn ensure_pair(left: &Values, right: &Values) -> (Normalized, Canonical) {
    let left = left.decode_categorical();
    let right = right.decode_categorical();
    let l = ensure_data(&left);
    let r = ensure_data(&right);
    let (left, right, l, r) = match (
        bool_as_integer(&left, r.dtype),
        bool_as_integer(&right, l.dtype),
    ) {
        (Some(ints), _) => {
            let l = ensure_data(&ints);
            (ints, right, l, r)
        }
        (_, Some(ints)) => {
            let r = ensure_data(&ints);
            (left, ints, l, r)
        }
        _ => (left, right, l, r),
    };
    let same_kind_family = l.recipe.kind.is_datelike() == r.recipe.kind.is_datelike()
        && (!l.recipe.kind.is_datelike() || l.recipe.kind == r.recipe.kind);
    if l.dtype == r.dtype && same_kind_family && l.dtype != AlgorithmDtype::Object {
        return (l, r.canonical);
    }
    let lifted = Normalized {
        canonical: Canonical::Object(Column::new(left.to_object())),
        dtype: AlgorithmDtype::Object,
        recipe: Recipe::plain(SourceKind::Object, rehydrate_object),
    };
    (lifted, Canonical::Object(Column::new(right.to_object())))
}

fn mismatch(expected: &str, got: &Canonical) -> KernelError {
    let got = match got {
        Canonical::Int64(_) => "int64",
        Canonical::UInt64(_) => "uint64",
        Canonical::Float64(_) => "float64",
        Canonical::Bytes(_) => "bytes",
        Canonical::Object(_) => "object",
    };
    KernelError::TypeMismatch(format!(
        "reconstruct: expected {} canonical buffer, got {}",
        expected, got
    ))
}

macro_rules! rehydrate_narrow_int {
    ($fname:ident, $canon:ident, $ty:ty, $variant:ident) => {
        fn $fname(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
            match c {
                Canonical::$canon(col) => {
                    let mut data = Vec64::with_capacity(col.len());
                    for (i, &v) in col.data.iter().enumerate() {
                        if !col.is_valid(i) {
                            data.push(<$ty>::default());
                            continue;
                        }
                        let narrowed = <$ty>::try_from(v).map_err(|_| {
                            KernelError::TypeMismatch(format!(
                                "reconstruct: {} does not fit in {}",
                                v,
                                stringify!($ty)
                            ))
                        })?;
                        data.push(narrowed);
                    }
                    Ok(Values::$variant(Column::with_mask(data, col.null_mask)))
                }
                other => Err(mismatch(stringify!($canon), &other)),
            }
        }
    };
}

rehydrate_narrow_int!(rehydrate_int8, Int64, i8, Int8);
rehydrate_narrow_int!(rehydrate_int16, Int64, i16, Int16);
rehydrate_narrow_int!(rehydrate_int32, Int64, i32, Int32);
rehydrate_narrow_int!(rehydrate_uint8, UInt64, u8, UInt8);
rehydrate_narrow_int!(rehydrate_uint16, UInt64, u16, UInt16);
rehydrate_narrow_int!(rehydrate_uint32, UInt64, u32, UInt32);

fn rehydrate_int64(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Int64(col) => Ok(Values::Int64(col)),
        other => Err(mismatch("Int64", &other)),
    }
}

fn rehydrate_uint64(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::UInt64(col) => Ok(Values::UInt64(col)),
        other => Err(mismatch("UInt64", &other)),
    }
}

fn rehydrate_bool(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::UInt64(col) => Ok(Values::Boolean(widen(&col, |v| v != 0))),
        other => Err(mismatch("UInt64", &other)),
    }
}

/// Float canonical buffers are NaN-encoded; a mask, if present, is folded in.
fn float_data(col: &Column<f64>) -> Vec64<f64> {
    col.data
        .iter()
        .enumerate()
        .map(|(i, &v)| if col.is_valid(i) { v } else { f64::NAN })
        .collect()
}

fn rehydrate_float64(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Float64(col) => Ok(Values::Float64(Column::new(float_data(&col)))),
        other => Err(mismatch("Float64", &other)),
    }
}

fn rehydrate_float32(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Float64(col) => Ok(Values::Float32(Column::new(
            float_data(&col).iter().map(|&v| v as f32).collect(),
        ))),
        other => Err(mismatch("Float64", &other)),
    }
}

fn rehydrate_complex(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Float64(col) => Ok(Values::Complex64(Column::new(
            float_data(&col)
                .iter()
                .map(|&v| Complex64::new(v, 0.0))
                .collect(),
        ))),
        other => Err(mismatch("Float64", &other)),
    }
}

/// Invalid slots go back to NaT.
fn nat_filled(col: &Column<i64>) -> Vec64<i64> {
    col.data
        .iter()
        .enumerate()
        .map(|(i, &v)| if col.is_valid(i) { v } else { INT64_NAT })
        .collect()
}

fn rehydrate_datetime(c: Canonical, r: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Int64(col) => Ok(Values::Datetime {
            data: nat_filled(&col),
            tz: r.tz.clone(),
        }),
        other => Err(mismatch("Int64", &other)),
    }
}

fn rehydrate_timedelta(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Int64(col) => Ok(Values::Timedelta(nat_filled(&col))),
        other => Err(mismatch("Int64", &other)),
    }
}

fn rehydrate_period(c: Canonical, r: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Int64(col) => Ok(Values::Period {
            ordinals: nat_filled(&col),
            freq: r.freq.clone().unwrap_or_default(),
        }),
        other => Err(mismatch("Int64", &other)),
    }
}

fn rehydrate_categorical(c: Canonical, r: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Int64(col) => {
            let categories = r.categories.clone().unwrap_or_else(Vec64::new);
            let mut codes = Vec64::with_capacity(col.len());
            for (i, &v) in col.data.iter().enumerate() {
                if !col.is_valid(i) {
                    codes.push(0u32);
                    continue;
                }
                let code = u32::try_from(v)
                    .ok()
                    .filter(|&c| (c as usize) < categories.len())
                    .ok_or_else(|| {
                        KernelError::OutOfBounds(format!(
                            "reconstruct: category code {} outside {} categories",
                            v,
                            categories.len()
                        ))
                    })?;
                codes.push(code);
            }
            Ok(Values::Categorical {
                array: CategoricalArray {
                    data: codes.into(),
                    unique_values: categories,
                    null_mask: col.null_mask,
                },
                ordered: r.ordered,
            })
        }
        other => Err(mismatch("Int64", &other)),
    }
}

fn rehydrate_utf8(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Bytes(col) => Ok(Values::Utf8(col)),
        other => Err(mismatch("Bytes", &other)),
    }
}

fn rehydrate_object(c: Canonical, _: &Recipe) -> Result<Values, KernelError> {
    match c {
        Canonical::Bytes(col) => Ok(Values::Object(
            col.data
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if col.is_valid(i) {
                        Scalar::Str(s.clone())
                    } else {
                        Scalar::Null
                    }
                })
                .collect(),
        )),
        Canonical::Object(col) => Ok(Values::Object(
            col.data
                .iter()
                .enumerate()
                .map(|(i, s)| if col.is_valid(i) { s.clone() } else { Scalar::Null })
                .collect(),
        )),
        other => Err(mismatch("Bytes or Object", &other)),
    }
}

#[cfg(test)]
mod tests {
    use minarrow::vec64;

    use super::*;

    #[test]
    fn test_bool_routes_through_u64() {
        let v = Values::Boolean(Column::new(vec64![true, false, true]));
        let n = ensure_data(&v);
        assert_eq!(n.dtype, AlgorithmDtype::Bool);
        match &n.canonical {
            Canonical::UInt64(c) => assert_eq!(c.data, vec64![1, 0, 1]),
            other => panic!("unexpected {:?}", other),
        }
        match n.recipe.reconstruct(n.canonical.clone()).unwrap() {
            Values::Boolean(c) => assert_eq!(c.data, vec64![true, false, true]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_narrow_int_round_trip_keeps_mask() {
        let v = Values::Int16(Column::from_options(vec![Some(-3), None, Some(7)]));
        let n = ensure_data(&v);
        assert_eq!(n.dtype, AlgorithmDtype::Int64);
        match n.recipe.reconstruct(n.canonical).unwrap() {
            Values::Int16(c) => {
                assert_eq!(c.data[0], -3);
                assert!(!c.is_valid(1));
                assert_eq!(c.data[2], 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reconstruct_rejects_overflowing_narrow() {
        let v = Values::Int8(Column::new(vec64![1]));
        let n = ensure_data(&v);
        let wide = Canonical::Int64(Column::new(vec64![300]));
        assert!(matches!(
            n.recipe.reconstruct(wide),
            Err(KernelError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_float_mask_becomes_nan() {
        let v = Values::Float32(Column::from_options(vec![Some(1.5), None]));
        let n = ensure_data(&v);
        match &n.canonical {
            Canonical::Float64(c) => {
                assert_eq!(c.data[0], 1.5);
                assert!(c.data[1].is_nan());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_complex_sets_warning_flag() {
        let v = Values::Complex64(Column::new(vec64![
            Complex64::new(1.0, 2.0),
            Complex64::new(3.0, 0.0)
        ]));
        let n = ensure_data(&v);
        assert!(n.recipe.discarded_imaginary);
        assert_eq!(n.dtype, AlgorithmDtype::Float64);
    }

    #[test]
    fn test_datetime_nat_masked_and_restored() {
        let v = Values::Datetime {
            data: vec64![10, INT64_NAT, 30],
            tz: Some("UTC".into()),
        };
        let n = ensure_data(&v);
        match &n.canonical {
            Canonical::Int64(c) => assert!(!c.is_valid(1)),
            other => panic!("unexpected {:?}", other),
        }
        match n.recipe.reconstruct(n.canonical.clone()).unwrap() {
            Values::Datetime { data, tz } => {
                assert_eq!(data, vec64![10, INT64_NAT, 30]);
                assert_eq!(tz.as_deref(), Some("UTC"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_categorical_codes_and_metadata() {
        let v = Values::categorical(&[Some(1), Some(0), None], &["lo", "hi"], true);
        let n = ensure_data(&v);
        assert_eq!(n.recipe.kind, SourceKind::Categorical);
        assert!(n.recipe.ordered);
        assert_eq!(n.recipe.categories.as_ref().map(|c| c.len()), Some(2));
        match &n.canonical {
            Canonical::Int64(c) => {
                assert_eq!(c.data[0], 1);
                assert!(!c.is_valid(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_narrows_to_bytes() {
        let v = Values::Object(vec64![Scalar::from("a"), Scalar::Null, Scalar::from("b")]);
        assert_eq!(ensure_data(&v).dtype, AlgorithmDtype::Bytes);
        let mixed = Values::Object(vec64![Scalar::from("a"), Scalar::Int(1)]);
        assert_eq!(ensure_data(&mixed).dtype, AlgorithmDtype::Object);
    }

    #[test]
    fn test_canonical_input_is_identity() {
        let v = Values::Int64(Column::new(vec64![4, 5]));
        let n = ensure_data(&v);
        match n.recipe.reconstruct(n.canonical).unwrap() {
            Values::Int64(c) => assert_eq!(c.data, vec64![4, 5]),
            other => panic!("unexpected {:?}", other),
        }
        let again = Normalized::from_canonical(Canonical::UInt64(Column::new(vec64![9])));
        assert_eq!(again.dtype, AlgorithmDtype::UInt64);
    }

    #[test]
    fn test_ensure_pair_lifts_mismatched_kinds() {
        let ints = Values::Int64(Column::new(vec64![1, 2]));
        let floats = Values::Float64(Column::new(vec64![2.0]));
        let (l, r) = ensure_pair(&ints, &floats);
        assert_eq!(l.dtype, AlgorithmDtype::Object);
        assert!(matches!(r, Canonical::Object(_)));

        let small = Values::Int8(Column::new(vec64![1]));
        let (l, r) = ensure_pair(&ints, &small);
        assert_eq!(l.dtype, AlgorithmDtype::Int64);
        assert!(matches!(r, Canonical::Int64(_)));
    }

    #[test]
    fn test_ensure_pair_reads_bools_as_integers() {
        let flags = Values::Boolean(Column::with_mask(
            vec64![true, false, true],
            Some(Bitmask::from_bools(&[true, true, false])),
        ));
        let ints = Values::Int64(Column::new(vec64![1, 7]));
        let (l, r) = ensure_pair(&flags, &ints);
        assert_eq!(l.dtype, AlgorithmDtype::Int64);
        match (&l.canonical, &r) {
            (Canonical::Int64(a), Canonical::Int64(b)) => {
                assert_eq!(a.data, vec64![1, 0, 1]);
                assert!(!a.is_valid(2));
                assert_eq!(b.data, vec64![1, 7]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let unsigned = Values::UInt32(Column::new(vec64![0u32]));
        let (l, r) = ensure_pair(&unsigned, &flags);
        assert_eq!(l.dtype, AlgorithmDtype::UInt64);
        assert!(matches!(r, Canonical::UInt64(_)));

        let floats = Values::Float64(Column::new(vec64![1.0]));
        let (l, _) = ensure_pair(&flags, &floats);
        assert_eq!(l.dtype, AlgorithmDtype::Object);
    }
}
