// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **N-D Buffers** - *Shaped, strided storage for take, diff and rank*
//!
//! [`NdArray`] is a flat 64-byte aligned `Vec64` plus a shape and a memory
//! order. Logical indexing is always by multi-index; the memory order only
//! decides the strides. [`NdValues`] tags an `NdArray` with its element dtype.

use std::fmt;

use minarrow::Vec64;

use crate::config::INT64_NAT;
use crate::errors::KernelError;
use crate::traits::element::{FromScalar, ToScalar};
use crate::values::Scalar;

/// Physical layout of an [`NdArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrder {
    /// C order: the last axis is contiguous.
    #[default]
    RowMajor,
    /// Fortran order: the first axis is contiguous.
    ColumnMajor,
}

/// Element strides for `shape` laid out in `order`.
pub fn strides_for(shape: &[usize], order: MemoryOrder) -> Vec<usize> {
    let ndim = shape.len();
    let mut strides = vec![1; ndim];
    match order {
        MemoryOrder::RowMajor => {
            for i in (0..ndim.saturating_sub(1)).rev() {
                strides[i] = strides[i + 1] * shape[i + 1];
            }
        }
        MemoryOrder::ColumnMajor => {
            for i in 1..ndim {
                strides[i] = strides[i - 1] * shape[i - 1];
            }
        }
    }
    strides
}

/// Iterates every multi-index of `shape` in row-major order.
pub fn indices(shape: &[usize]) -> impl Iterator<Item = Vec<usize>> + use<> {
    let shape = shape.to_vec();
    let total: usize = shape.iter().product();
    (0..total).map(move |flat| unravel(flat, &shape))
}

/// Row-major multi-index of the `flat`-th logical element.
pub fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut idx = vec![0; shape.len()];
    for axis in (0..shape.len()).rev() {
        let dim = shape[axis];
        if dim > 0 {
            idx[axis] = flat % dim;
            flat /= dim;
        }
    }
    idx
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T> {
    data: Vec64<T>,
    shape: Vec<usize>,
    order: MemoryOrder,
}

impl<T> NdArray<T> {
    /// Wraps `data` as an array of `shape`. The element count must match.
    pub fn new(data: Vec64<T>, shape: Vec<usize>, order: MemoryOrder) -> Result<Self, KernelError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(KernelError::LengthMismatch(format!(
                "NdArray::new: {} elements for shape {:?} (expected {})",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { data, shape, order })
    }

    pub fn from_vec64(data: Vec64<T>) -> Self {
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            order: MemoryOrder::RowMajor,
        }
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// C-contiguous, so `as_slice` is in logical row-major order.
    #[inline]
    pub fn is_row_major(&self) -> bool {
        self.order == MemoryOrder::RowMajor || self.ndim() <= 1
    }

    /// Raw storage in memory order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec64<T> {
        self.data
    }

    pub fn strides(&self) -> Vec<usize> {
        strides_for(&self.shape, self.order)
    }

    /// Storage offset of a multi-index.
    #[inline]
    pub fn offset(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.ndim());
        index
            .iter()
            .zip(self.strides())
            .map(|(&i, s)| i * s)
            .sum()
    }

    #[inline]
    pub fn get(&self, index: &[usize]) -> &T {
        &self.data[self.offset(index)]
    }

    #[inline]
    pub fn get_mut(&mut self, index: &[usize]) -> &mut T {
        let off = self.offset(index);
        &mut self.data[off]
    }

    /// Length of `axis`, or `OutOfBounds` when the array has fewer axes.
    pub fn axis_len(&self, axis: usize) -> Result<usize, KernelError> {
        self.shape.get(axis).copied().ok_or_else(|| {
            KernelError::OutOfBounds(format!(
                "axis {} is out of bounds for array of dimension {}",
                axis,
                self.ndim()
            ))
        })
    }

    /// Elements in logical row-major order.
    pub fn iter_logical(&self) -> impl Iterator<Item = &T> + '_ {
        indices(&self.shape).map(move |idx| self.get(&idx))
    }
}

impl<T: Clone> NdArray<T> {
    pub fn filled(shape: Vec<usize>, order: MemoryOrder, value: T) -> Self {
        let n: usize = shape.iter().product();
        let data: Vec64<T> = std::iter::repeat_n(value, n).collect();
        Self { data, shape, order }
    }

    /// Same logical contents laid out in `order`.
    pub fn to_order(&self, order: MemoryOrder) -> Self {
        if order == self.order || self.ndim() <= 1 {
            return Self {
                data: self.data.clone(),
                shape: self.shape.clone(),
                order,
            };
        }
        let strides = strides_for(&self.shape, order);
        let mut slots: Vec<Option<T>> = vec![None; self.len()];
        for idx in indices(&self.shape) {
            let dst: usize = idx.iter().zip(&strides).map(|(&i, s)| i * s).sum();
            slots[dst] = Some(self.get(&idx).clone());
        }
        Self {
            data: slots.into_iter().flatten().collect(),
            shape: self.shape.clone(),
            order,
        }
    }

    /// Element-wise map keeping shape and layout.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> NdArray<U> {
        NdArray {
            data: self.data.iter().map(f).collect(),
            shape: self.shape.clone(),
            order: self.order,
        }
    }
}

/// Element dtype of an [`NdValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NdDtype {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Datetime,
    Timedelta,
    Object,
}

impl NdDtype {
    pub fn name(self) -> &'static str {
        match self {
            NdDtype::Bool => "bool",
            NdDtype::Int8 => "int8",
            NdDtype::Int16 => "int16",
            NdDtype::Int32 => "int32",
            NdDtype::Int64 => "int64",
            NdDtype::UInt64 => "uint64",
            NdDtype::Float32 => "float32",
            NdDtype::Float64 => "float64",
            NdDtype::Datetime => "datetime64[ns]",
            NdDtype::Timedelta => "timedelta64[ns]",
            NdDtype::Object => "object",
        }
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            NdDtype::Int8 | NdDtype::Int16 | NdDtype::Int32 | NdDtype::Int64 | NdDtype::UInt64
        )
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, NdDtype::Float32 | NdDtype::Float64)
    }

    #[inline]
    pub fn is_datelike(self) -> bool {
        matches!(self, NdDtype::Datetime | NdDtype::Timedelta)
    }
}

impl fmt::Display for NdDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dtype-tagged N-D buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum NdValues {
    Bool(NdArray<bool>),
    Int8(NdArray<i8>),
    Int16(NdArray<i16>),
    Int32(NdArray<i32>),
    Int64(NdArray<i64>),
    UInt64(NdArray<u64>),
    Float32(NdArray<f32>),
    Float64(NdArray<f64>),
    /// Nanoseconds since the epoch, `INT64_NAT` missing.
    Datetime(NdArray<i64>),
    /// Nanoseconds, `INT64_NAT` missing.
    Timedelta(NdArray<i64>),
    Object(NdArray<Scalar>),
}

/// Runs `$body` with `$arr` bound to the inner `NdArray` of any variant.
#[macro_export]
macro_rules! with_nd {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            $crate::ndarray::NdValues::Bool($arr) => $body,
            $crate::ndarray::NdValues::Int8($arr) => $body,
            $crate::ndarray::NdValues::Int16($arr) => $body,
            $crate::ndarray::NdValues::Int32($arr) => $body,
            $crate::ndarray::NdValues::Int64($arr) => $body,
            $crate::ndarray::NdValues::UInt64($arr) => $body,
            $crate::ndarray::NdValues::Float32($arr) => $body,
            $crate::ndarray::NdValues::Float64($arr) => $body,
            $crate::ndarray::NdValues::Datetime($arr) => $body,
            $crate::ndarray::NdValues::Timedelta($arr) => $body,
            $crate::ndarray::NdValues::Object($arr) => $body,
        }
    };
}

fn cast_array<T, U: FromScalar>(
    arr: &NdArray<T>,
    to_scalar: impl Fn(&T) -> Scalar,
    dtype: NdDtype,
) -> Result<NdArray<U>, KernelError> {
    let data = arr
        .as_slice()
        .iter()
        .map(|v| {
            let s = to_scalar(v);
            U::from_scalar(&s).ok_or_else(|| {
                KernelError::TypeMismatch(format!("cannot cast {} to {}", s, dtype))
            })
        })
        .collect::<Result<Vec64<U>, KernelError>>()?;
    NdArray::new(data, arr.shape().to_vec(), arr.order())
}

/// Datelike payloads become NaT-aware scalars on the way into another dtype.
fn datelike_scalar(v: i64, make: fn(i64) -> Scalar) -> Scalar {
    if v == INT64_NAT { Scalar::Null } else { make(v) }
}

fn datelike_from(s: &Scalar, timestamp: bool) -> Option<i64> {
    match s {
        Scalar::Null => Some(INT64_NAT),
        Scalar::Float(f) if f.is_nan() => Some(INT64_NAT),
        Scalar::Timestamp(v) if timestamp => Some(*v),
        Scalar::Timedelta(v) if !timestamp => Some(*v),
        Scalar::Int(v) => Some(*v),
        _ => None,
    }
}

impl NdValues {
    pub fn dtype(&self) -> NdDtype {
        match self {
            NdValues::Bool(_) => NdDtype::Bool,
            NdValues::Int8(_) => NdDtype::Int8,
            NdValues::Int16(_) => NdDtype::Int16,
            NdValues::Int32(_) => NdDtype::Int32,
            NdValues::Int64(_) => NdDtype::Int64,
            NdValues::UInt64(_) => NdDtype::UInt64,
            NdValues::Float32(_) => NdDtype::Float32,
            NdValues::Float64(_) => NdDtype::Float64,
            NdValues::Datetime(_) => NdDtype::Datetime,
            NdValues::Timedelta(_) => NdDtype::Timedelta,
            NdValues::Object(_) => NdDtype::Object,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        with_nd!(self, a => a.shape())
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    #[inline]
    pub fn order(&self) -> MemoryOrder {
        with_nd!(self, a => a.order())
    }

    #[inline]
    pub fn len(&self) -> usize {
        with_nd!(self, a => a.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a multi-index as a scalar. NaT becomes `Null`.
    pub fn scalar_at(&self, index: &[usize]) -> Scalar {
        match self {
            NdValues::Datetime(a) => datelike_scalar(*a.get(index), Scalar::Timestamp),
            NdValues::Timedelta(a) => datelike_scalar(*a.get(index), Scalar::Timedelta),
            NdValues::Bool(a) => a.get(index).to_scalar(),
            NdValues::Int8(a) => a.get(index).to_scalar(),
            NdValues::Int16(a) => a.get(index).to_scalar(),
            NdValues::Int32(a) => a.get(index).to_scalar(),
            NdValues::Int64(a) => a.get(index).to_scalar(),
            NdValues::UInt64(a) => a.get(index).to_scalar(),
            NdValues::Float32(a) => a.get(index).to_scalar(),
            NdValues::Float64(a) => a.get(index).to_scalar(),
            NdValues::Object(a) => a.get(index).clone(),
        }
    }

    /// Array of `dtype` and `shape` holding the dtype's missing value where one
    /// exists, zero or `false` otherwise.
    pub fn empty(dtype: NdDtype, shape: Vec<usize>, order: MemoryOrder) -> NdValues {
        match dtype {
            NdDtype::Bool => NdValues::Bool(NdArray::filled(shape, order, false)),
            NdDtype::Int8 => NdValues::Int8(NdArray::filled(shape, order, 0)),
            NdDtype::Int16 => NdValues::Int16(NdArray::filled(shape, order, 0)),
            NdDtype::Int32 => NdValues::Int32(NdArray::filled(shape, order, 0)),
            NdDtype::Int64 => NdValues::Int64(NdArray::filled(shape, order, 0)),
            NdDtype::UInt64 => NdValues::UInt64(NdArray::filled(shape, order, 0)),
            NdDtype::Float32 => NdValues::Float32(NdArray::filled(shape, order, f32::NAN)),
            NdDtype::Float64 => NdValues::Float64(NdArray::filled(shape, order, f64::NAN)),
            NdDtype::Datetime => NdValues::Datetime(NdArray::filled(shape, order, INT64_NAT)),
            NdDtype::Timedelta => NdValues::Timedelta(NdArray::filled(shape, order, INT64_NAT)),
            NdDtype::Object => NdValues::Object(NdArray::filled(shape, order, Scalar::Null)),
        }
    }

    /// Converts to `dtype` through the scalar domain. Fails with `TypeMismatch`
    /// on the first element the target cannot hold.
    pub fn astype(&self, dtype: NdDtype) -> Result<NdValues, KernelError> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        let to_scalar = |i: usize| -> Scalar {
            match self {
                NdValues::Datetime(a) => datelike_scalar(a.as_slice()[i], Scalar::Timestamp),
                NdValues::Timedelta(a) => datelike_scalar(a.as_slice()[i], Scalar::Timedelta),
                _ => with_nd!(self, a => a.as_slice()[i].to_scalar()),
            }
        };
        let positions: NdArray<usize> = with_nd!(self, a => NdArray {
            data: (0..a.len()).collect(),
            shape: a.shape().to_vec(),
            order: a.order(),
        });
        let convert = |p: &usize| to_scalar(*p);
        Ok(match dtype {
            NdDtype::Bool => NdValues::Bool(cast_array(&positions, convert, dtype)?),
            NdDtype::Int8 => NdValues::Int8(cast_array(&positions, convert, dtype)?),
            NdDtype::Int16 => NdValues::Int16(cast_array(&positions, convert, dtype)?),
            NdDtype::Int32 => NdValues::Int32(cast_array(&positions, convert, dtype)?),
            NdDtype::Int64 => NdValues::Int64(cast_array(&positions, convert, dtype)?),
            NdDtype::UInt64 => NdValues::UInt64(cast_array(&positions, convert, dtype)?),
            NdDtype::Float32 => NdValues::Float32(cast_array(&positions, convert, dtype)?),
            NdDtype::Float64 => NdValues::Float64(cast_array(&positions, convert, dtype)?),
            NdDtype::Object => NdValues::Object(cast_array(&positions, convert, dtype)?),
            NdDtype::Datetime | NdDtype::Timedelta => {
                let timestamp = dtype == NdDtype::Datetime;
                let mut out = Vec64::with_capacity(positions.len());
                for &p in positions.as_slice() {
                    let s = to_scalar(p);
                    out.push(datelike_from(&s, timestamp).ok_or_else(|| {
                        KernelError::TypeMismatch(format!("cannot cast {} to {}", s, dtype))
                    })?);
                }
                let arr = NdArray::new(out, positions.shape().to_vec(), positions.order())?;
                if timestamp { NdValues::Datetime(arr) } else { NdValues::Timedelta(arr) }
            }
        })
    }
}
