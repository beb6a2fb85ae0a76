// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

// These parameters should rarely need adjustment.

//! # **Configuration Constants** - *Runtime Behaviour Parameters*
//!
//! Global configuration constants controlling hash table sizing, algorithm
//! switch-over points and sentinel values. These values are compile-time constants
//! optimised for typical workloads.

/// Smallest slot array a hash table allocates.
pub const HASH_TABLE_MIN_CAPACITY: usize = 8;

/// Maximum fraction of occupied slots before a hash table doubles.
///
/// Expressed as numerator/denominator so the check stays in integer arithmetic.
pub const HASH_TABLE_MAX_LOAD: (usize, usize) = (1, 2);

/// Upper bound on the size hint used when `match` builds its table.
pub const MATCH_TABLE_SIZE_CAP: usize = 1_000_000;

/// Above this many elements `isin` switches from hashing to sort-and-search.
pub const ISIN_HASH_LIMIT: usize = 1_000_000;

/// Integer argsorts longer than this use LSD radix passes instead of comparisons.
pub const RADIX_SORT_THRESHOLD: usize = 256;

/// Comparison argsorts longer than this are split across the rayon pool
/// when the `parallel_sort` feature is enabled.
pub const PARALLEL_SORT_THRESHOLD: usize = 1 << 16;

/// Missing-value sentinel for datelike int64 representations.
pub const INT64_NAT: i64 = i64::MIN;

/// Relative widening applied to outer bin edges in `value_counts` binning.
pub const CUT_EDGE_ADJUST: f64 = 0.001;
