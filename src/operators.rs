// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Contains option enums used to route the hashing, selection and ranking kernels.
//!
//! Each enum parses from its lower-case string name so callers holding
//! textual options can convert with `str::parse`.

use std::fmt;
use std::str::FromStr;

use crate::errors::KernelError;

/// Which occurrence of a repeated value is treated as the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keep {
    /// First occurrence is kept, later ones are duplicates.
    #[default]
    First,
    /// Last occurrence is kept, earlier ones are duplicates.
    Last,
    /// Every occurrence of a repeated value is a duplicate.
    Neither,
}

/// Direction of a top-n selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMethod {
    /// `nlargest`
    Largest,
    /// `nsmallest`
    Smallest,
}

/// Tie-breaking rule inside a run of equal values when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMethod {
    /// Mean of the positions in the tie group.
    #[default]
    Average,
    /// Lowest position in the tie group.
    Min,
    /// Highest position in the tie group.
    Max,
    /// Positions assigned in order of appearance.
    First,
    /// Like `Min`, but ranks increase by one between groups.
    Dense,
}

/// Placement of missing values when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NaOption {
    /// Missing values receive a NaN rank.
    #[default]
    Keep,
    /// Missing values take the smallest ranks.
    Top,
    /// Missing values take the largest ranks.
    Bottom,
}

/// Quantile interpolation between the two bracketing order statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Linear interpolation by the fractional part of the index.
    #[default]
    Fraction,
    /// The lower order statistic.
    Lower,
    /// The higher order statistic.
    Higher,
}

macro_rules! impl_option_str {
    ($ty:ident, $label:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = KernelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(KernelError::InvalidArguments(format!(
                        "{} must be one of {}; got '{}'",
                        $label,
                        [$($name),+].join(", "),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($name),)+
                }
            }
        }
    };
}

impl_option_str!(Keep, "keep", { "first" => First, "last" => Last, "none" => Neither });
impl_option_str!(SelectMethod, "method", { "nlargest" => Largest, "nsmallest" => Smallest });
impl_option_str!(RankMethod, "method", {
    "average" => Average,
    "min" => Min,
    "max" => Max,
    "first" => First,
    "dense" => Dense,
});
impl_option_str!(NaOption, "na_option", { "keep" => Keep, "top" => Top, "bottom" => Bottom });
impl_option_str!(Interpolation, "interpolation", {
    "fraction" => Fraction,
    "lower" => Lower,
    "higher" => Higher,
});
