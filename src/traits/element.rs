// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Element traits** - *Scalar conversions for N-D element types*
//!
//! `ToScalar` lifts a typed element into the opaque [`Scalar`] domain used by
//! object buffers and fill values. `FromScalar` goes the other way and fails
//! with `None` when the value is not representable, e.g. `Float(0.5)` into an
//! integer or any string into a number.

use num_traits::ToPrimitive;

use crate::values::Scalar;

pub trait ToScalar {
    fn to_scalar(&self) -> Scalar;
}

pub trait FromScalar: Sized {
    fn from_scalar(s: &Scalar) -> Option<Self>;
}

macro_rules! impl_int_element {
    ($($t:ty => $to:ident),*) => {
        $(
            impl ToScalar for $t {
                #[inline]
                fn to_scalar(&self) -> Scalar {
                    Scalar::Int(*self as i64)
                }
            }

            impl FromScalar for $t {
                fn from_scalar(s: &Scalar) -> Option<Self> {
                    match s {
                        Scalar::Int(v) => v.$to(),
                        Scalar::UInt(v) => v.$to(),
                        Scalar::Float(v) if v.fract() == 0.0 => v.$to(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_int_element!(i8 => to_i8, i16 => to_i16, i32 => to_i32);

impl ToScalar for i64 {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Int(*self)
    }
}

impl FromScalar for i64 {
    // Datelike scalars carry their i64 payload, so NaT fills land as `INT64_NAT`.
    fn from_scalar(s: &Scalar) -> Option<Self> {
        match s {
            Scalar::Int(v) | Scalar::Timestamp(v) | Scalar::Timedelta(v) => Some(*v),
            Scalar::UInt(v) => v.to_i64(),
            Scalar::Float(v) if v.fract() == 0.0 => v.to_i64(),
            _ => None,
        }
    }
}

impl ToScalar for u64 {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::UInt(*self)
    }
}

impl FromScalar for u64 {
    fn from_scalar(s: &Scalar) -> Option<Self> {
        match s {
            Scalar::Int(v) => v.to_u64(),
            Scalar::UInt(v) => Some(*v),
            Scalar::Float(v) if v.fract() == 0.0 => v.to_u64(),
            _ => None,
        }
    }
}

impl ToScalar for f32 {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Float(*self as f64)
    }
}

impl FromScalar for f32 {
    fn from_scalar(s: &Scalar) -> Option<Self> {
        f64::from_scalar(s).map(|v| v as f32)
    }
}

impl ToScalar for f64 {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Float(*self)
    }
}

impl FromScalar for f64 {
    fn from_scalar(s: &Scalar) -> Option<Self> {
        match s {
            Scalar::Null => Some(f64::NAN),
            Scalar::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_) => s.as_f64(),
            _ => None,
        }
    }
}

impl ToScalar for bool {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }
}

impl FromScalar for bool {
    fn from_scalar(s: &Scalar) -> Option<Self> {
        match s {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl ToScalar for Scalar {
    #[inline]
    fn to_scalar(&self) -> Scalar {
        self.clone()
    }
}

impl FromScalar for Scalar {
    #[inline]
    fn from_scalar(s: &Scalar) -> Option<Self> {
        Some(s.clone())
    }
}
