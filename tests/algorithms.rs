// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

// End-to-end behaviour of the hashed algorithms, plus randomized checks of
// the properties that tie them together.

mod util;

mod algorithms_tests {
    use super::util::{assert_bools, assert_keys, assert_labels, assert_slice_close, bool_values};
    use hash_kernels::algorithms::{
        Counts, ValueCountsOptions, duplicated, factorize, isin, match_values, mode, safe_sort,
        unique, value_counts,
    };
    use hash_kernels::config::{INT64_NAT, ISIN_HASH_LIMIT};
    use hash_kernels::errors::KernelError;
    use hash_kernels::operators::Keep;
    use hash_kernels::values::{Column, Scalar, Values};
    use minarrow::{Vec64, vec64};
    use rand::Rng;

    fn random_ints(len: usize, cardinality: i64, na_rate: f64) -> Values {
        let mut rng = rand::rng();
        let opts: Vec<Option<i64>> = (0..len)
            .map(|_| {
                if rng.random_bool(na_rate) {
                    None
                } else {
                    Some(rng.random_range(0..cardinality))
                }
            })
            .collect();
        Values::Int64(Column::from_options(opts))
    }

    fn random_strings(len: usize, cardinality: usize) -> Values {
        let mut rng = rand::rng();
        let data: Vec64<String> = (0..len)
            .map(|_| format!("k{}", rng.random_range(0..cardinality)))
            .collect();
        Values::Utf8(Column::new(data))
    }

    #[test]
    fn factorize_with_missing() {
        let v = Values::Int64(Column::from_options(vec![Some(1), Some(2), None, Some(1)]));
        let (labels, uniques) = factorize(&v, false, -1, None).unwrap();
        assert_labels(&labels, &[0, 1, -1, 0], -1);
        assert_keys(&uniques, &[Scalar::Int(1), Scalar::Int(2)]);
    }

    #[test]
    fn unique_strings_first_occurrence() {
        let v = Values::Object(["b", "a", "a", "b", "c"].iter().map(|&s| Scalar::from(s)).collect());
        let u = unique(&v).unwrap();
        assert!(matches!(u, Values::Object(_)));
        assert_eq!(
            u.to_object(),
            vec64![Scalar::from("b"), Scalar::from("a"), Scalar::from("c")]
        );
    }

    #[test]
    fn value_counts_normalized_with_missing_kept() {
        let v = Values::Float64(Column::new(vec64![1.0, 2.0, f64::NAN, f64::NAN, f64::NAN]));
        let opts = ValueCountsOptions {
            normalize: true,
            dropna: false,
            ..Default::default()
        };
        let vc = value_counts(&v, opts).unwrap();
        assert_keys(
            &vc.keys,
            &[Scalar::Float(f64::NAN), Scalar::Float(2.0), Scalar::Float(1.0)],
        );
        match vc.counts {
            Counts::Normalized(c) => assert_slice_close(&c, &[0.6, 0.2, 0.2], 1e-12),
            other => panic!("expected normalized counts, got {:?}", other),
        }
    }

    #[test]
    fn safe_sort_with_labels() {
        let v = Values::Int64(Column::new(vec64![3, 1, 2]));
        let (sorted, labels) = safe_sort(&v, Some(&[0, 1, 2, 0, -1][..]), -1, false).unwrap();
        assert_eq!(
            sorted.to_object(),
            vec64![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]
        );
        assert_eq!(labels.unwrap(), vec64![2, 0, 1, 2, -1]);
    }

    #[test]
    fn safe_sort_out_of_range_labels_become_sentinel() {
        let v = Values::Int64(Column::new(vec64![30, 10, 20]));
        let (_, labels) = safe_sort(&v, Some(&[-1, 3, -4, 2][..]), -99, false).unwrap();
        assert_labels(&labels.unwrap(), &[1, -99, -99, 1], -99);
    }

    #[test]
    fn factorize_sort_roundtrips_datetimes() {
        let v = Values::Datetime {
            data: vec64![300, 100, INT64_NAT, 300, 200],
            tz: None,
        };
        let (labels, uniques) = factorize(&v, true, -1, None).unwrap();
        assert_eq!(labels, vec64![2, 0, -1, 2, 1]);
        match uniques {
            Values::Datetime { data, .. } => assert_eq!(data, vec64![100, 200, 300]),
            other => panic!("expected datetime uniques, got {}", other.kind_name()),
        }
    }

    #[test]
    fn isin_reads_bools_as_integers() {
        let comps = Values::Boolean(Column::new(vec64![true, false]));
        let values = Values::Int64(Column::new(vec64![1]));
        assert_bools(&isin(&comps, &values).unwrap(), &[true, false]);

        let ints = Values::Int64(Column::new(vec64![0, 1, 2]));
        let flags = Values::Boolean(Column::new(vec64![true]));
        assert_bools(&isin(&ints, &flags).unwrap(), &[false, true, false]);
        assert_eq!(match_values(&ints, &flags, -1).unwrap(), vec64![-1, 0, -1]);

        let floats = Values::Float64(Column::new(vec64![1.0]));
        assert_bools(&isin(&comps, &floats).unwrap(), &[false, false]);
    }

    #[test]
    fn isin_above_hash_limit_matches_small_input_rules() {
        let len = ISIN_HASH_LIMIT + 7;
        let opts: Vec<Option<f64>> = (0..len)
            .map(|i| match i {
                _ if i % 11 == 0 => None,
                _ if i % 7 == 0 => Some(f64::NAN),
                _ if i % 5 == 0 => Some(-0.0),
                _ => Some((i % 10) as f64),
            })
            .collect();
        let expected_for = |x: Option<f64>, hay: &[f64], hay_has_na: bool| match x {
            None => hay_has_na,
            Some(v) if v.is_nan() => hay_has_na,
            Some(v) => hay.contains(&v),
        };
        let comps = Values::Float64(Column::from_options(opts.clone()));

        let with_na = Values::Float64(Column::from_options(vec![Some(2.0), None, Some(0.0)]));
        let got = bool_values(&isin(&comps, &with_na).unwrap());
        assert_eq!(got.len(), len);
        for (i, &x) in opts.iter().enumerate() {
            assert_eq!(got[i], expected_for(x, &[2.0, 0.0], true), "idx {i}: {x:?}");
        }

        let without_na = Values::Float64(Column::new(vec64![9.0, 3.0]));
        let got = bool_values(&isin(&comps, &without_na).unwrap());
        for (i, &x) in opts.iter().enumerate() {
            assert_eq!(got[i], expected_for(x, &[9.0, 3.0], false), "idx {i}: {x:?}");
        }

        let words: Vec64<String> = (0..len).map(|i| format!("w{}", i % 13)).collect();
        let comps = Values::Utf8(Column::new(words));
        let hay = Values::Utf8(Column::new(vec64!["w3".to_string(), "w12".to_string()]));
        let got = bool_values(&isin(&comps, &hay).unwrap());
        for (i, &g) in got.iter().enumerate() {
            assert_eq!(g, i % 13 == 3 || i % 13 == 12, "idx {i}");
        }
    }

    #[test]
    fn match_reports_last_duplicate_position() {
        let values = Values::Int64(Column::new(vec64![5, 6, 5]));
        let to_match = Values::Int64(Column::new(vec64![5, 6, 7]));
        assert_eq!(match_values(&to_match, &values, -1).unwrap(), vec64![2, 1, -1]);
    }

    #[test]
    fn mode_of_strings() {
        let v = Values::Utf8(Column::from_options(vec![
            Some("y".to_string()),
            Some("x".to_string()),
            None,
            Some("y".to_string()),
            Some("x".to_string()),
            Some("z".to_string()),
        ]));
        assert_eq!(
            mode(&v).unwrap().to_object(),
            vec64![Scalar::from("x"), Scalar::from("y")]
        );
    }

    #[test]
    fn safe_sort_rejects_duplicates_with_labels() {
        let v = Values::Utf8(Column::new(vec64!["a".to_string(), "a".to_string()]));
        assert!(matches!(
            safe_sort(&v, Some(&[0, 1][..]), -1, false),
            Err(KernelError::NotUnique(_))
        ));
        assert!(safe_sort(&v, None, -1, false).is_ok());
    }

    #[test]
    fn prop_factorize_labels_index_uniques() {
        for _ in 0..20 {
            let v = random_ints(200, 17, 0.1);
            let (labels, uniques) = factorize(&v, false, -1, None).unwrap();
            for (i, &l) in labels.iter().enumerate() {
                let x = v.scalar_at(i);
                if x.is_na() {
                    assert_eq!(l, -1);
                } else {
                    assert_eq!(uniques.scalar_at(l as usize), x);
                }
            }
            let (sorted_labels, sorted_uniques) = factorize(&v, true, -1, None).unwrap();
            for (i, &l) in sorted_labels.iter().enumerate() {
                if l >= 0 {
                    assert_eq!(sorted_uniques.scalar_at(l as usize), v.scalar_at(i));
                }
            }
            let u = sorted_uniques.to_object();
            assert!(u.windows(2).all(|w| w[0].class_cmp(&w[1]) == Some(std::cmp::Ordering::Less)));
        }
    }

    #[test]
    fn prop_unique_plus_duplicated_covers_input() {
        for _ in 0..20 {
            let v = random_strings(150, 23);
            let u = unique(&v).unwrap();
            for keep in [Keep::First, Keep::Last] {
                let dups = bool_values(&duplicated(&v, keep).unwrap());
                let marked = dups.iter().filter(|&&d| d).count();
                assert_eq!(marked + u.len(), v.len());
            }
            let neither = bool_values(&duplicated(&v, Keep::Neither).unwrap());
            let vc = value_counts(
                &v,
                ValueCountsOptions {
                    sort: false,
                    ..Default::default()
                },
            )
            .unwrap();
            let counts = match vc.counts {
                Counts::Absolute(c) => c,
                other => panic!("expected absolute counts, got {:?}", other),
            };
            for (i, &d) in neither.iter().enumerate() {
                let x = v.scalar_at(i);
                let k = (0..vc.keys.len()).find(|&k| vc.keys.scalar_at(k) == x).unwrap();
                assert_eq!(d, counts[k] > 1);
            }
        }
    }

    #[test]
    fn prop_unique_is_first_occurrence_selection() {
        let v = random_ints(300, 40, 0.05);
        let u = unique(&v).unwrap().to_object();
        let mut expected: Vec<Scalar> = Vec::new();
        for x in v.to_object().iter() {
            if !expected.iter().any(|e| e.key_eq(x)) {
                expected.push(x.clone());
            }
        }
        assert_eq!(u.len(), expected.len());
        for (a, b) in u.iter().zip(expected.iter()) {
            assert!(a.key_eq(b));
        }
    }

    #[test]
    fn prop_isin_agrees_with_linear_scan() {
        for _ in 0..10 {
            let comps = random_ints(120, 30, 0.1);
            let values = random_ints(15, 30, 0.2);
            let got = bool_values(&isin(&comps, &values).unwrap());
            let hay = values.to_object();
            for (i, x) in comps.to_object().iter().enumerate() {
                assert_eq!(got[i], hay.iter().any(|h| h.key_eq(x)));
            }
        }
    }

    #[test]
    fn prop_value_counts_sum_to_length() {
        let v = random_ints(500, 9, 0.2);
        let opts = ValueCountsOptions {
            dropna: false,
            ..Default::default()
        };
        let vc = value_counts(&v, opts).unwrap();
        match vc.counts {
            Counts::Absolute(c) => {
                assert_eq!(c.iter().sum::<i64>(), 500);
                assert!(c.windows(2).all(|w| w[0] >= w[1]));
            }
            other => panic!("expected absolute counts, got {:?}", other),
        }
    }
}
