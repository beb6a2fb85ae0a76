// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Error Types** - *Kernel Operation Error Handling*
//!
//! Error types for hashed-array kernels with structured error reporting.
//!
//! ## Error Categories
//! - **Argument Errors**: Invalid option values, out-of-range quantiles, bad axes
//! - **Type Errors**: Mismatched or unsupported element kinds
//! - **Dimension Errors**: Length and shape mismatches, unsupported ndim
//! - **Ordering Errors**: Duplicate values where uniqueness is required, unorderable mixes
//! - **Arithmetic Errors**: Int64 overflow detected before evaluation
//!
//! All errors carry a contextual message. No kernel returns a partial result
//! alongside an error.

use core::fmt;
use std::error::Error;

/// Error type for all kernel and facade operations.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Element kind mismatch, e.g. an `out` buffer that cannot hold the fill value.
    TypeMismatch(String),

    /// Array length or shape mismatch between operands.
    LengthMismatch(String),

    /// Unsupported element kind for the requested operation.
    UnsupportedType(String),

    /// Column not found in a frame.
    ColumnNotFound(String),

    /// Invalid arguments provided to a kernel function.
    InvalidArguments(String),

    /// Values were required to be unique but contain duplicates.
    NotUnique(String),

    /// Int64 arithmetic would wrap.
    Overflow(String),

    /// Array dimensionality not supported by the operation.
    UnsupportedDimension(String),

    /// Elements have no total order and no numeric/string split.
    Unorderable(String),

    /// Index or axis out of bounds.
    OutOfBounds(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            KernelError::LengthMismatch(msg) => write!(f, "Length mismatch: {}", msg),
            KernelError::UnsupportedType(msg) => write!(f, "Unsupported type: {}", msg),
            KernelError::ColumnNotFound(msg) => write!(f, "Column not found: {}", msg),
            KernelError::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
            KernelError::NotUnique(msg) => write!(f, "Values not unique: {}", msg),
            KernelError::Overflow(msg) => write!(f, "Overflow: {}", msg),
            KernelError::UnsupportedDimension(msg) => write!(f, "Unsupported dimension: {}", msg),
            KernelError::Unorderable(msg) => write!(f, "Unorderable: {}", msg),
            KernelError::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
        }
    }
}

impl Error for KernelError {}

/// Creates a formatted error message for length mismatches between left-hand side (LHS) and right-hand side (RHS) arrays.
///
/// # Arguments
/// * `fname` - Function name where the mismatch occurred
/// * `lhs` - Length of the left-hand side array
/// * `rhs` - Length of the right-hand side array
pub fn log_length_mismatch(fname: String, lhs: usize, rhs: usize) -> String {
    format!("{} => Length mismatch: LHS {} RHS {}", fname, lhs, rhs)
}
