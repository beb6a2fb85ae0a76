//! # **ToBit trait** - *IEEE 754 bit conversion*

// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

/// Generic trait for converting floating-point types to their IEEE 754 bit representation.
///
/// Unifies access to a `to_bits` method across different floating-point types,
/// enabling generic operation on floating-point bit patterns. The `canonical_bits`
/// variant folds every NaN payload onto one pattern and `-0.0` onto `+0.0`, which
/// makes the bits usable as a hash key where `NaN == NaN` and `-0.0 == 0.0` must hold.
pub trait ToBits {
    /// The unsigned integer type representing the bit pattern.
    type Bits: Eq + std::hash::Hash + Copy;

    /// Converts the floating-point value to its raw IEEE 754 bit representation.
    fn to_bits(self) -> Self::Bits;

    /// Bit pattern with NaN payloads and signed zero collapsed.
    fn canonical_bits(self) -> Self::Bits;
}

impl ToBits for f32 {
    type Bits = u32;

    #[inline(always)]
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }

    #[inline(always)]
    fn canonical_bits(self) -> u32 {
        if self.is_nan() {
            f32::NAN.to_bits()
        } else if self == 0.0 {
            0
        } else {
            f32::to_bits(self)
        }
    }
}

impl ToBits for f64 {
    type Bits = u64;

    #[inline(always)]
    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    #[inline(always)]
    fn canonical_bits(self) -> u64 {
        if self.is_nan() {
            f64::NAN.to_bits()
        } else if self == 0.0 {
            0
        } else {
            f64::to_bits(self)
        }
    }
}
