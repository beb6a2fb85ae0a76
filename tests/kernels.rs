// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

// Positional kernels: take, checked addition, diff, rank, quantile and top-n.

mod util;

mod kernel_tests {
    use super::util::{assert_close, assert_slice_close};
    use hash_kernels::algorithms::{
        Addend, Frame, SelectInput, checked_add_with_arr, diff, quantile, rank, select_n,
        take_2d_multi, take_nd, take_nd_into,
    };
    use hash_kernels::errors::KernelError;
    use hash_kernels::ndarray::{MemoryOrder, NdArray, NdDtype, NdValues};
    use hash_kernels::operators::{Interpolation, Keep, NaOption, RankMethod, SelectMethod};
    use hash_kernels::values::{Column, Scalar, Values};
    use minarrow::{Vec64, vec64};
    use rand::Rng;
    use rand::seq::SliceRandom;

    #[test]
    fn take_with_fill_keeps_dtype() {
        let a = NdValues::Int64(NdArray::from_vec64(vec64![10, 20, 30]));
        let out = take_nd(&a, Some(&[2, -1, 0][..]), 0, &Scalar::Int(0), true).unwrap();
        assert_eq!(out.dtype(), NdDtype::Int64);
        assert_eq!(out, NdValues::Int64(NdArray::from_vec64(vec64![30, 0, 10])));
    }

    #[test]
    fn take_with_missing_fill_promotes() {
        let a = NdValues::Int32(NdArray::from_vec64(vec64![1, 2]));
        let out = take_nd(&a, Some(&[1, -1][..]), 0, &Scalar::Null, true).unwrap();
        assert_eq!(out.dtype(), NdDtype::Float64);
        assert_eq!(out.scalar_at(&[0]), Scalar::Float(2.0));
        assert!(out.scalar_at(&[1]).is_na());

        let no_fill = take_nd(&a, Some(&[1, 0][..]), 0, &Scalar::Null, true).unwrap();
        assert_eq!(no_fill.dtype(), NdDtype::Int32);
    }

    #[test]
    fn take_into_rejects_incompatible_out() {
        let a = NdValues::Int64(NdArray::from_vec64(vec64![1, 2, 3]));
        let mut out = NdValues::empty(NdDtype::Int64, vec![2], MemoryOrder::RowMajor);
        let err = take_nd_into(&a, Some(&[0, -1][..]), 0, &mut out, &Scalar::Null, true);
        assert!(matches!(err, Err(KernelError::TypeMismatch(_))));

        let mut out = NdValues::empty(NdDtype::Float64, vec![2], MemoryOrder::RowMajor);
        take_nd_into(&a, Some(&[2, -1][..]), 0, &mut out, &Scalar::Null, true).unwrap();
        assert_eq!(out.scalar_at(&[0]), Scalar::Float(3.0));
        assert!(out.scalar_at(&[1]).is_na());
    }

    #[test]
    fn take_bounds_checks() {
        let a = NdValues::Float64(NdArray::from_vec64(vec64![1.0, 2.0]));
        assert!(matches!(
            take_nd(&a, Some(&[2][..]), 0, &Scalar::Null, true),
            Err(KernelError::OutOfBounds(_))
        ));
        assert!(matches!(
            take_nd(&a, Some(&[-1][..]), 0, &Scalar::Null, false),
            Err(KernelError::OutOfBounds(_))
        ));
    }

    #[test]
    fn take_2d_both_axes() {
        let data = vec64![1, 2, 3, 4, 5, 6];
        let a = NdValues::Int64(NdArray::new(data, vec![2, 3], MemoryOrder::RowMajor).unwrap());
        let rows = take_nd(&a, Some(&[1, 0][..]), 0, &Scalar::Null, true).unwrap();
        assert_eq!(rows.scalar_at(&[0, 0]), Scalar::Int(4));
        assert_eq!(rows.scalar_at(&[1, 2]), Scalar::Int(3));

        let cols = take_nd(&a, Some(&[2, -1][..]), 1, &Scalar::Int(-7), true).unwrap();
        assert_eq!(cols.shape(), &[2, 2]);
        assert_eq!(cols.scalar_at(&[1, 0]), Scalar::Int(6));
        assert_eq!(cols.scalar_at(&[0, 1]), Scalar::Int(-7));

        let multi = take_2d_multi(&a, Some(&[-1, 1][..]), Some(&[0, 2][..]), &Scalar::Null).unwrap();
        assert_eq!(multi.dtype(), NdDtype::Float64);
        assert!(multi.scalar_at(&[0, 1]).is_na());
        assert_eq!(multi.scalar_at(&[1, 1]), Scalar::Float(6.0));
    }

    #[test]
    fn prop_take_matches_direct_indexing() {
        let mut rng = rand::rng();
        let (nrows, ncols) = (7, 5);
        let data: Vec64<f64> = (0..nrows * ncols).map(|_| rng.random_range(-100.0..100.0)).collect();
        for order in [MemoryOrder::RowMajor, MemoryOrder::ColumnMajor] {
            let base = NdArray::new(data.clone(), vec![nrows, ncols], MemoryOrder::RowMajor).unwrap();
            let a = NdValues::Float64(base.to_order(order));
            for axis in 0..2 {
                let len = if axis == 0 { nrows } else { ncols };
                let idx: Vec<i64> = (0..9).map(|_| rng.random_range(0..len as i64)).collect();
                let out = take_nd(&a, Some(&idx[..]), axis, &Scalar::Null, true).unwrap();
                for (k, &i) in idx.iter().enumerate() {
                    for other in 0..(if axis == 0 { ncols } else { nrows }) {
                        let (src, dst) = if axis == 0 {
                            ([i as usize, other], [k, other])
                        } else {
                            ([other, i as usize], [other, k])
                        };
                        assert_eq!(out.scalar_at(&dst), a.scalar_at(&src));
                    }
                }
            }
        }
    }

    #[test]
    fn checked_add_detects_overflow() {
        let err = checked_add_with_arr(&[i64::MAX, i64::MAX], Addend::Scalar(i64::MAX), None, None);
        assert!(matches!(err, Err(KernelError::Overflow(_))));
        let ok = checked_add_with_arr(&[1, 2], Addend::Array(&[3, 4]), None, None).unwrap();
        assert_eq!(ok, vec64![4, 6]);
    }

    #[test]
    fn prop_checked_add_matches_plain_addition() {
        let mut rng = rand::rng();
        let a: Vec<i64> = (0..256).map(|_| rng.random_range(-(1i64 << 40)..(1i64 << 40))).collect();
        let b: Vec<i64> = (0..256).map(|_| rng.random_range(-(1i64 << 40)..(1i64 << 40))).collect();
        let out = checked_add_with_arr(&a, Addend::Array(&b), None, None).unwrap();
        for i in 0..a.len() {
            assert_eq!(out[i], a[i] + b[i]);
        }
    }

    #[test]
    fn diff_lag_and_dtype() {
        let a = NdValues::Int16(NdArray::from_vec64(vec64![1, 3, 6, 10]));
        let out = diff(&a, 2, 0).unwrap();
        assert_eq!(out.dtype(), NdDtype::Float64);
        assert!(out.scalar_at(&[1]).is_na());
        assert_eq!(out.scalar_at(&[2]), Scalar::Float(5.0));
        assert_eq!(out.scalar_at(&[3]), Scalar::Float(7.0));
    }

    #[test]
    fn rank_permutation_has_no_ties() {
        let mut rng = rand::rng();
        let mut perm: Vec<i64> = (1..=50).collect();
        perm.shuffle(&mut rng);
        let a = NdValues::Int64(NdArray::from_vec64(perm.iter().copied().collect()));
        let ranks = rank(&a, 0, RankMethod::Average, NaOption::Keep, true, false).unwrap();
        let expected: Vec<f64> = perm.iter().map(|&v| v as f64).collect();
        assert_slice_close(ranks.as_slice(), &expected, 0.0);
    }

    #[test]
    fn rank_ties_and_missing() {
        let a = NdValues::Float64(NdArray::from_vec64(vec64![3.0, f64::NAN, 1.0, 3.0]));
        let avg = rank(&a, 0, RankMethod::Average, NaOption::Keep, true, false).unwrap();
        assert_slice_close(avg.as_slice(), &[2.5, f64::NAN, 1.0, 2.5], 0.0);
        let bottom = rank(&a, 0, RankMethod::Min, NaOption::Bottom, true, false).unwrap();
        assert_slice_close(bottom.as_slice(), &[2.0, 4.0, 1.0, 2.0], 0.0);
        let desc = rank(&a, 0, RankMethod::First, NaOption::Top, false, true).unwrap();
        assert_slice_close(desc.as_slice(), &[0.5, 0.25, 1.0, 0.75], 0.0);
    }

    #[test]
    fn rank_rejects_three_dims() {
        let a = NdValues::Float64(
            NdArray::new((0..8).map(|_| 0.0).collect(), vec![2, 2, 2], MemoryOrder::RowMajor).unwrap(),
        );
        assert!(matches!(
            rank(&a, 0, RankMethod::Average, NaOption::Keep, true, false),
            Err(KernelError::UnsupportedDimension(_))
        ));
    }

    #[test]
    fn prop_quantile_bounds_and_median() {
        let mut rng = rand::rng();
        for len in [1usize, 2, 9, 40] {
            let data: Vec64<f64> = (0..len).map(|_| rng.random_range(-50.0..50.0)).collect();
            let v = Values::Float64(Column::new(data.clone()));
            let mut sorted: Vec<f64> = data.iter().copied().collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let median = if len % 2 == 1 {
                sorted[len / 2]
            } else {
                (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
            };
            assert_close(quantile(&v, 0.5, Interpolation::Fraction).unwrap(), median, 1e-12);
            assert_eq!(quantile(&v, 0.0, Interpolation::Fraction).unwrap(), sorted[0]);
            assert_eq!(quantile(&v, 1.0, Interpolation::Fraction).unwrap(), sorted[len - 1]);
        }
    }

    #[test]
    fn select_n_series_and_frame() {
        let s = Values::Float64(Column::new(vec64![4.0, 9.0, f64::NAN, 1.0, 9.0]));
        let top = select_n(SelectInput::Series(&s), 2, Keep::First, SelectMethod::Largest, None)
            .unwrap();
        assert_eq!(top, vec64![1, 4]);
        let top_last = select_n(SelectInput::Series(&s), 1, Keep::Last, SelectMethod::Largest, None)
            .unwrap();
        assert_eq!(top_last, vec64![4]);

        let frame = Frame::new(vec![
            ("a".to_string(), Values::Int64(Column::new(vec64![1, 1, 1, 2]))),
            ("b".to_string(), Values::Int64(Column::new(vec64![9, 3, 5, 0]))),
        ])
        .unwrap();
        let small = select_n(
            SelectInput::Frame(&frame),
            2,
            Keep::First,
            SelectMethod::Smallest,
            Some(&["a", "b"][..]),
        )
        .unwrap();
        assert_eq!(small, vec64![1, 2]);

        assert!(matches!(
            select_n(SelectInput::Frame(&frame), 1, Keep::First, SelectMethod::Smallest, Some(&["c"][..])),
            Err(KernelError::ColumnNotFound(_))
        ));
        let strs = Values::Utf8(Column::new(vec64!["x".to_string()]));
        assert!(matches!(
            select_n(SelectInput::Series(&strs), 1, Keep::First, SelectMethod::Smallest, None),
            Err(KernelError::UnsupportedType(_))
        ));
    }
}
