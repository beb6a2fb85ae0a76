// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Values** - *Typed 1-D Inputs and Opaque Scalars*
//!
//! The caller-facing element model consumed by the algorithm facade.
//!
//! - [`Column`] pairs a `Vec64` buffer with an optional validity `Bitmask`
//!   (bit set = valid), following the Minarrow convention.
//! - [`Scalar`] is the element of an opaque (object) buffer. Numeric scalars
//!   compare by value across `Int`, `UInt` and `Float`.
//! - [`Values`] is the closed set of 1-D input kinds the normaliser understands.

use std::cmp::Ordering;
use std::fmt;

use minarrow::{Bitmask, CategoricalArray, Vec64};
use num_complex::Complex64;

use crate::config::INT64_NAT;
use crate::kernels::sort::total_cmp_f;

/// Element of an opaque buffer.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Nanoseconds since the epoch; `INT64_NAT` is missing.
    Timestamp(i64),
    /// Nanoseconds; `INT64_NAT` is missing.
    Timedelta(i64),
    /// Right-closed interval `(left, right]`.
    Interval(f64, f64),
}

/// Ordering class of a scalar. Only scalars of one class, or the
/// numeric/string pair, can be ordered together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarClass {
    Null,
    Bool,
    Numeric,
    Str,
    Timestamp,
    Timedelta,
    Interval,
}

impl Scalar {
    /// True for `Null`, `Float(NaN)` and NaT timestamps or timedeltas.
    #[inline]
    pub fn is_na(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Float(f) => f.is_nan(),
            Scalar::Timestamp(v) | Scalar::Timedelta(v) => *v == INT64_NAT,
            _ => false,
        }
    }

    #[inline]
    pub fn class(&self) -> ScalarClass {
        match self {
            Scalar::Null => ScalarClass::Null,
            Scalar::Bool(_) => ScalarClass::Bool,
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => ScalarClass::Numeric,
            Scalar::Str(_) => ScalarClass::Str,
            Scalar::Timestamp(_) => ScalarClass::Timestamp,
            Scalar::Timedelta(_) => ScalarClass::Timedelta,
            Scalar::Interval(..) => ScalarClass::Interval,
        }
    }

    /// Numeric value as `f64`, if this is a numeric scalar.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::UInt(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Exact integral value, if the scalar is an integer or an integral float.
    #[inline]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Scalar::Int(v) => Some(*v as i128),
            Scalar::UInt(v) => Some(*v as i128),
            Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.7e38 => {
                Some(*f as i128)
            }
            _ => None,
        }
    }

    /// Equality used by hash tables: numeric by value, `NaN == NaN`,
    /// `Null == Null`, everything else by variant and payload.
    pub fn key_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a == b,
            (Scalar::Timedelta(a), Scalar::Timedelta(b)) => a == b,
            (Scalar::Interval(l1, r1), Scalar::Interval(l2, r2)) => {
                total_cmp_f(l1, l2) == Ordering::Equal && total_cmp_f(r1, r2) == Ordering::Equal
            }
            (a, b) if a.class() == ScalarClass::Numeric && b.class() == ScalarClass::Numeric => {
                match (a.as_i128(), b.as_i128()) {
                    (Some(x), Some(y)) => x == y,
                    _ => {
                        let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                        x == y || (x.is_nan() && y.is_nan())
                    }
                }
            }
            _ => false,
        }
    }

    /// Ordering within one class. Numeric scalars order by value with NaN last.
    /// Returns `None` across classes.
    pub fn class_cmp(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Some(Ordering::Equal),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
            (Scalar::Timedelta(a), Scalar::Timedelta(b)) => Some(a.cmp(b)),
            (Scalar::Interval(l1, r1), Scalar::Interval(l2, r2)) => {
                Some(total_cmp_f(l1, l2).then_with(|| total_cmp_f(r1, r2)))
            }
            (a, b) if a.class() == ScalarClass::Numeric && b.class() == ScalarClass::Numeric => {
                match (a, b) {
                    (Scalar::Float(_), _) | (_, Scalar::Float(_)) => {
                        let x = a.as_f64().unwrap_or(f64::NAN);
                        let y = b.as_f64().unwrap_or(f64::NAN);
                        Some(total_cmp_f(&canonical_nan(x), &canonical_nan(y)))
                    }
                    _ => Some(a.as_i128().cmp(&b.as_i128())),
                }
            }
            _ => None,
        }
    }
}

#[inline(always)]
fn canonical_nan(x: f64) -> f64 {
    if x.is_nan() { f64::NAN } else { x }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.key_eq(other)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::UInt(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(v) => write!(f, "'{}'", v),
            Scalar::Timestamp(v) if *v == INT64_NAT => f.write_str("NaT"),
            Scalar::Timestamp(v) => write!(f, "ts({})", v),
            Scalar::Timedelta(v) if *v == INT64_NAT => f.write_str("NaT"),
            Scalar::Timedelta(v) => write!(f, "td({})", v),
            Scalar::Interval(l, r) => write!(f, "({}, {}]", l, r),
        }
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

/// A typed buffer with optional validity (bit set = valid).
#[derive(Debug, Clone)]
pub struct Column<T> {
    pub data: Vec64<T>,
    pub null_mask: Option<Bitmask>,
}

impl<T> Column<T> {
    /// Column with every slot valid.
    pub fn new(data: Vec64<T>) -> Self {
        Self {
            data,
            null_mask: None,
        }
    }

    pub fn with_mask(data: Vec64<T>, null_mask: Option<Bitmask>) -> Self {
        Self { data, null_mask }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Validity of slot `i` according to the mask only.
    #[inline(always)]
    pub fn is_valid(&self, i: usize) -> bool {
        self.null_mask.as_ref().map_or(true, |m| m.get(i))
    }

    pub fn null_count(&self) -> usize {
        match &self.null_mask {
            None => 0,
            Some(m) => (0..self.data.len()).filter(|&i| !m.get(i)).count(),
        }
    }
}

impl<T: Clone + Default> Column<T> {
    /// Builds a column from optional values; `None` becomes an invalid slot
    /// holding `T::default()`.
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        let any_null = values.iter().any(|v| v.is_none());
        let mut data = Vec64::with_capacity(values.len());
        let mut mask = Bitmask::new_set_all(values.len(), true);
        for (i, v) in values.into_iter().enumerate() {
            match v {
                Some(v) => data.push(v),
                None => {
                    data.push(T::default());
                    mask.set(i, false);
                }
            }
        }
        Self {
            data,
            null_mask: if any_null { Some(mask) } else { None },
        }
    }
}

impl<T: Clone> Column<T> {
    /// Gathers the given positions into a new column.
    pub fn take(&self, positions: &[usize]) -> Self {
        let data: Vec64<T> = positions.iter().map(|&p| self.data[p].clone()).collect();
        let null_mask = self.null_mask.as_ref().map(|m| {
            let bools: Vec<bool> = positions.iter().map(|&p| m.get(p)).collect();
            Bitmask::from_bools(&bools)
        });
        Self { data, null_mask }
    }
}

/// The closed set of 1-D input kinds.
#[derive(Debug, Clone)]
pub enum Values {
    Boolean(Column<bool>),
    Int8(Column<i8>),
    Int16(Column<i16>),
    Int32(Column<i32>),
    Int64(Column<i64>),
    UInt8(Column<u8>),
    UInt16(Column<u16>),
    UInt32(Column<u32>),
    UInt64(Column<u64>),
    Float32(Column<f32>),
    Float64(Column<f64>),
    Complex64(Column<Complex64>),
    /// Nanosecond timestamps; `INT64_NAT` is missing.
    Datetime { data: Vec64<i64>, tz: Option<String> },
    /// Nanosecond durations; `INT64_NAT` is missing.
    Timedelta(Vec64<i64>),
    /// Period ordinals at a frequency; `INT64_NAT` is missing.
    Period { ordinals: Vec64<i64>, freq: String },
    /// Dictionary-encoded strings.
    Categorical {
        array: CategoricalArray<u32>,
        ordered: bool,
    },
    Utf8(Column<String>),
    Object(Vec64<Scalar>),
}

/// Applies `$body` to the inner `Column` of every column-backed variant,
/// rebuilding the same variant from the result.
macro_rules! map_columns {
    ($values:expr, $col:ident => $body:expr, $other:ident => $fallback:expr) => {
        match $values {
            Values::Boolean($col) => Values::Boolean($body),
            Values::Int8($col) => Values::Int8($body),
            Values::Int16($col) => Values::Int16($body),
            Values::Int32($col) => Values::Int32($body),
            Values::Int64($col) => Values::Int64($body),
            Values::UInt8($col) => Values::UInt8($body),
            Values::UInt16($col) => Values::UInt16($body),
            Values::UInt32($col) => Values::UInt32($body),
            Values::UInt64($col) => Values::UInt64($body),
            Values::Float32($col) => Values::Float32($body),
            Values::Float64($col) => Values::Float64($body),
            Values::Complex64($col) => Values::Complex64($body),
            Values::Utf8($col) => Values::Utf8($body),
            $other => $fallback,
        }
    };
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Boolean(c) => c.len(),
            Values::Int8(c) => c.len(),
            Values::Int16(c) => c.len(),
            Values::Int32(c) => c.len(),
            Values::Int64(c) => c.len(),
            Values::UInt8(c) => c.len(),
            Values::UInt16(c) => c.len(),
            Values::UInt32(c) => c.len(),
            Values::UInt64(c) => c.len(),
            Values::Float32(c) => c.len(),
            Values::Float64(c) => c.len(),
            Values::Complex64(c) => c.len(),
            Values::Datetime { data, .. } => data.len(),
            Values::Timedelta(data) => data.len(),
            Values::Period { ordinals, .. } => ordinals.len(),
            Values::Categorical { array, .. } => array.data.len(),
            Values::Utf8(c) => c.len(),
            Values::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short kind name used in error messages and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Values::Boolean(_) => "bool",
            Values::Int8(_) => "int8",
            Values::Int16(_) => "int16",
            Values::Int32(_) => "int32",
            Values::Int64(_) => "int64",
            Values::UInt8(_) => "uint8",
            Values::UInt16(_) => "uint16",
            Values::UInt32(_) => "uint32",
            Values::UInt64(_) => "uint64",
            Values::Float32(_) => "float32",
            Values::Float64(_) => "float64",
            Values::Complex64(_) => "complex128",
            Values::Datetime { .. } => "datetime64[ns]",
            Values::Timedelta(_) => "timedelta64[ns]",
            Values::Period { .. } => "period",
            Values::Categorical { .. } => "category",
            Values::Utf8(_) => "string",
            Values::Object(_) => "object",
        }
    }

    /// Real-valued numeric kinds, including bool.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Values::Boolean(_)
                | Values::Int8(_)
                | Values::Int16(_)
                | Values::Int32(_)
                | Values::Int64(_)
                | Values::UInt8(_)
                | Values::UInt16(_)
                | Values::UInt32(_)
                | Values::UInt64(_)
                | Values::Float32(_)
                | Values::Float64(_)
        )
    }

    pub fn is_datelike(&self) -> bool {
        matches!(
            self,
            Values::Datetime { .. } | Values::Timedelta(_) | Values::Period { .. }
        )
    }

    /// Gathers the given positions into a new buffer of the same kind.
    pub fn take(&self, positions: &[usize]) -> Values {
        map_columns!(self, c => c.take(positions), other => match other {
            Values::Datetime { data, tz } => Values::Datetime {
                data: positions.iter().map(|&p| data[p]).collect(),
                tz: tz.clone(),
            },
            Values::Timedelta(data) => {
                Values::Timedelta(positions.iter().map(|&p| data[p]).collect())
            }
            Values::Period { ordinals, freq } => Values::Period {
                ordinals: positions.iter().map(|&p| ordinals[p]).collect(),
                freq: freq.clone(),
            },
            Values::Categorical { array, ordered } => {
                let codes: Vec64<u32> = positions.iter().map(|&p| array.data[p]).collect();
                let null_mask = array.null_mask.as_ref().map(|m| {
                    let bools: Vec<bool> = positions.iter().map(|&p| m.get(p)).collect();
                    Bitmask::from_bools(&bools)
                });
                Values::Categorical {
                    array: CategoricalArray {
                        data: codes.into(),
                        unique_values: array.unique_values.clone(),
                        null_mask,
                    },
                    ordered: *ordered,
                }
            }
            Values::Object(v) => Values::Object(positions.iter().map(|&p| v[p].clone()).collect()),
            _ => unreachable!("column-backed variants handled above"),
        })
    }

    /// Element `i` as an opaque scalar.
    pub fn scalar_at(&self, i: usize) -> Scalar {
        #[inline(always)]
        fn masked<T>(c: &Column<T>, i: usize, f: impl FnOnce(&T) -> Scalar) -> Scalar {
            if c.is_valid(i) { f(&c.data[i]) } else { Scalar::Null }
        }
        match self {
            Values::Boolean(c) => masked(c, i, |v| Scalar::Bool(*v)),
            Values::Int8(c) => masked(c, i, |v| Scalar::Int(*v as i64)),
            Values::Int16(c) => masked(c, i, |v| Scalar::Int(*v as i64)),
            Values::Int32(c) => masked(c, i, |v| Scalar::Int(*v as i64)),
            Values::Int64(c) => masked(c, i, |v| Scalar::Int(*v)),
            Values::UInt8(c) => masked(c, i, |v| Scalar::UInt(*v as u64)),
            Values::UInt16(c) => masked(c, i, |v| Scalar::UInt(*v as u64)),
            Values::UInt32(c) => masked(c, i, |v| Scalar::UInt(*v as u64)),
            Values::UInt64(c) => masked(c, i, |v| Scalar::UInt(*v)),
            Values::Float32(c) => masked(c, i, |v| Scalar::Float(*v as f64)),
            Values::Float64(c) => masked(c, i, |v| Scalar::Float(*v)),
            Values::Complex64(c) => masked(c, i, |v| Scalar::Float(v.re)),
            Values::Datetime { data, .. } => Scalar::Timestamp(data[i]),
            Values::Timedelta(data) => Scalar::Timedelta(data[i]),
            Values::Period { ordinals, .. } => {
                if ordinals[i] == INT64_NAT {
                    Scalar::Null
                } else {
                    Scalar::Int(ordinals[i])
                }
            }
            Values::Categorical { array, .. } => {
                let valid = array.null_mask.as_ref().map_or(true, |m| m.get(i));
                match array.unique_values.get(array.data[i] as usize) {
                    Some(s) if valid => Scalar::Str(s.clone()),
                    _ => Scalar::Null,
                }
            }
            Values::Utf8(c) => masked(c, i, |v| Scalar::Str(v.clone())),
            Values::Object(v) => v[i].clone(),
        }
    }

    /// Lifts every element to an opaque scalar.
    pub fn to_object(&self) -> Vec64<Scalar> {
        match self {
            Values::Object(v) => v.clone(),
            _ => (0..self.len()).map(|i| self.scalar_at(i)).collect(),
        }
    }

    /// Decodes a categorical into its string values; other kinds are returned as-is.
    pub fn decode_categorical(&self) -> Values {
        match self {
            Values::Categorical { array, .. } => {
                let opts: Vec<Option<String>> = (0..array.data.len())
                    .map(|i| match self.scalar_at(i) {
                        Scalar::Str(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                Values::Utf8(Column::from_options(opts))
            }
            other => other.clone(),
        }
    }

    /// Convenience constructor for a dictionary-encoded buffer.
    /// `None` codes become null slots.
    pub fn categorical(codes: &[Option<u32>], categories: &[&str], ordered: bool) -> Values {
        let data: Vec64<u32> = codes.iter().map(|c| c.unwrap_or(0)).collect();
        let null_mask = if codes.iter().any(|c| c.is_none()) {
            let bools: Vec<bool> = codes.iter().map(|c| c.is_some()).collect();
            Some(Bitmask::from_bools(&bools))
        } else {
            None
        };
        Values::Categorical {
            array: CategoricalArray {
                data: data.into(),
                unique_values: categories.iter().map(|s| s.to_string()).collect(),
                null_mask,
            },
            ordered,
        }
    }
}
