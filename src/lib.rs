// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under the Mozilla Public License (MPL) 2.0.
// See LICENSE for details.

//! # **Hash Kernels** - *Hashed array algorithms over Minarrow buffers*
//!
//! Factorize, unique, value counts, membership, duplicates and mode over
//! typed or opaque element buffers, plus the positional kernels that travel
//! with them: N-D take with fill promotion, overflow-checked addition,
//! lagged differences, rank, quantile and top-n selection.
//!
//! Start from [`algorithms`].

pub mod algorithms;
pub mod config;
pub mod errors;
pub mod ndarray;
pub mod operators;
pub mod utils;
pub mod values;

pub mod kernels {
    pub mod arithmetic;
    pub mod diff;
    pub mod hashtable;
    pub mod normalize;
    pub mod quantile;
    pub mod rank;
    pub mod select;
    pub mod sort;
    pub mod take;
}

pub mod traits {
    pub mod dense_iter;
    pub mod element;
    pub mod hash_key;
    pub mod to_bits;
}
