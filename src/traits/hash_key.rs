// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **HashKey trait** - *Key capability for the hash table family*
//!
//! One table implementation serves every algorithm dtype. This trait supplies
//! the per-width pieces: hashing, equality, the intrinsic missing marker, and
//! a placeholder to store in the missing slot of a unique buffer.

use std::hash::{Hash, Hasher};

use crate::config::INT64_NAT;
use crate::traits::to_bits::ToBits;
use crate::values::Scalar;

pub trait HashKey: Clone {
    /// Whether the key itself encodes "missing" (NaN, `Null`).
    /// Integer keys never do; their missing slots come from a validity mask.
    fn is_na(&self) -> bool;

    /// Feeds the key into `state`. Keys that compare equal under `key_eq`
    /// must feed identical bytes.
    fn hash_key<H: Hasher>(&self, state: &mut H);

    fn key_eq(&self, other: &Self) -> bool;

    /// Placeholder written into a unique buffer's missing slot.
    fn na_value() -> Self;
}

impl HashKey for i64 {
    #[inline(always)]
    fn is_na(&self) -> bool {
        false
    }

    #[inline(always)]
    fn hash_key<H: Hasher>(&self, state: &mut H) {
        state.write_i64(*self);
    }

    #[inline(always)]
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }

    #[inline(always)]
    fn na_value() -> Self {
        INT64_NAT
    }
}

impl HashKey for u64 {
    #[inline(always)]
    fn is_na(&self) -> bool {
        false
    }

    #[inline(always)]
    fn hash_key<H: Hasher>(&self, state: &mut H) {
        state.write_u64(*self);
    }

    #[inline(always)]
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }

    #[inline(always)]
    fn na_value() -> Self {
        0
    }
}

impl HashKey for f64 {
    #[inline(always)]
    fn is_na(&self) -> bool {
        self.is_nan()
    }

    #[inline(always)]
    fn hash_key<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.canonical_bits());
    }

    #[inline(always)]
    fn key_eq(&self, other: &Self) -> bool {
        self.canonical_bits() == other.canonical_bits()
    }

    #[inline(always)]
    fn na_value() -> Self {
        f64::NAN
    }
}

impl HashKey for String {
    #[inline(always)]
    fn is_na(&self) -> bool {
        false
    }

    #[inline(always)]
    fn hash_key<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }

    #[inline(always)]
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }

    #[inline(always)]
    fn na_value() -> Self {
        String::new()
    }
}

impl HashKey for Scalar {
    #[inline]
    fn is_na(&self) -> bool {
        Scalar::is_na(self)
    }

    fn hash_key<H: Hasher>(&self, state: &mut H) {
        // Integral numerics hash by exact value so Int(2), UInt(2) and Float(2.0) collide.
        match self {
            Scalar::Null => state.write_u8(0),
            Scalar::Bool(v) => {
                state.write_u8(1);
                state.write_u8(*v as u8);
            }
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => match self.as_i128() {
                Some(v) => {
                    state.write_u8(2);
                    state.write_i128(v);
                }
                None => {
                    state.write_u8(3);
                    state.write_u64(self.as_f64().unwrap_or(f64::NAN).canonical_bits());
                }
            },
            Scalar::Str(s) => {
                state.write_u8(4);
                s.as_str().hash(state);
            }
            Scalar::Timestamp(v) => {
                state.write_u8(5);
                state.write_i64(*v);
            }
            Scalar::Timedelta(v) => {
                state.write_u8(6);
                state.write_i64(*v);
            }
            Scalar::Interval(l, r) => {
                state.write_u8(7);
                state.write_u64(l.canonical_bits());
                state.write_u64(r.canonical_bits());
            }
        }
    }

    #[inline]
    fn key_eq(&self, other: &Self) -> bool {
        Scalar::key_eq(self, other)
    }

    #[inline]
    fn na_value() -> Self {
        Scalar::Null
    }
}
