// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Iteration over the valid slots of a masked buffer.

use minarrow::{Bitmask, Vec64};
use num_traits::AsPrimitive;

/// Values of `data` whose validity bit is set, in position order.
pub struct ValidValues<'a, T> {
    data: &'a [T],
    mask: Option<&'a Bitmask>,
    pos: usize,
}

impl<'a, T: Copy> ValidValues<'a, T> {
    #[inline]
    pub fn new(data: &'a [T], mask: Option<&'a Bitmask>) -> Self {
        Self { data, mask, pos: 0 }
    }
}

impl<T: Copy> Iterator for ValidValues<'_, T> {
    type Item = T;

    #[inline(always)]
    fn next(&mut self) -> Option<T> {
        while self.pos < self.data.len() {
            let i = self.pos;
            self.pos += 1;
            if self.mask.map_or(true, |m| m.get(i)) {
                return Some(self.data[i]);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.data.len() - self.pos;
        match self.mask {
            None => (rest, Some(rest)),
            Some(_) => (0, Some(rest)),
        }
    }
}

/// Valid integer values widened to `f64`.
#[inline]
pub fn collect_valid_as_f64<T>(data: &[T], mask: Option<&Bitmask>) -> Vec64<f64>
where
    T: AsPrimitive<f64>,
{
    ValidValues::new(data, mask).map(|v| v.as_()).collect()
}

/// Valid float values, dropping both masked slots and NaN.
#[inline]
pub fn collect_valid_f64(data: &[f64], mask: Option<&Bitmask>) -> Vec64<f64> {
    ValidValues::new(data, mask).filter(|v| !v.is_nan()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values_skip_masked() {
        let mask = Bitmask::from_bools(&[true, false, true, false]);
        let data = [1i64, 2, 3, 4];
        let it = ValidValues::new(&data, Some(&mask));
        assert_eq!(it.size_hint(), (0, Some(4)));
        assert_eq!(it.collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(ValidValues::new(&data, None).count(), 4);
    }

    #[test]
    fn test_collect_valid_as_f64_widens() {
        let mask = Bitmask::from_bools(&[false, true, true]);
        let out = collect_valid_as_f64(&[u64::MAX, 7, 0], Some(&mask));
        assert_eq!(out.as_slice(), &[7.0, 0.0]);
        let out = collect_valid_as_f64(&[-3i64, 5], None);
        assert_eq!(out.as_slice(), &[-3.0, 5.0]);
    }

    #[test]
    fn test_collect_valid_f64_drops_nan() {
        let out = collect_valid_f64(&[1.0, f64::NAN, 3.0], None);
        assert_eq!(out.as_slice(), &[1.0, 3.0]);
    }
}
