#![allow(unused)]

use hash_kernels::values::{Scalar, Values};
use minarrow::BooleanArray;

fn close_or_panic(at: &str, a: f64, e: f64, tol: f64) {
    if e.is_nan() {
        assert!(a.is_nan(), "{at}expected NaN, got {a}");
    } else if e.is_infinite() {
        assert!(
            a.is_infinite() && a.is_sign_positive() == e.is_sign_positive(),
            "{at}expected {e}, got {a}"
        );
    } else {
        let scale = 1.0_f64.max(e.abs());
        assert!((a - e).abs() <= tol * scale, "{at}got {a}, expect {e} (tol={tol})");
    }
}

/// Relative comparison; NaN matches NaN and infinities match by sign.
pub fn assert_close(a: f64, e: f64, tol: f64) {
    close_or_panic("", a, e, tol);
}

pub fn assert_slice_close(a: &[f64], e: &[f64], tol: f64) {
    assert_eq!(a.len(), e.len(), "len mismatch");
    for (i, (&ai, &ei)) in a.iter().zip(e.iter()).enumerate() {
        close_or_panic(&format!("idx {i}: "), ai, ei, tol);
    }
}

/// Bits of a membership or duplicate result. Results never carry nulls.
pub fn bool_values(arr: &BooleanArray<()>) -> Vec<bool> {
    assert!(arr.null_mask.is_none(), "boolean result should not carry a null mask");
    (0..arr.len).map(|i| arr.data.get(i)).collect()
}

pub fn assert_bools(arr: &BooleanArray<()>, expected: &[bool]) {
    let got = bool_values(arr);
    assert_eq!(got.len(), expected.len(), "len mismatch");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert_eq!(g, e, "idx {i}: got {got:?}, expect {expected:?}");
    }
}

/// Labels equal `expected`, with every `sentinel` slot lining up.
pub fn assert_labels(got: &[i64], expected: &[i64], sentinel: i64) {
    assert_eq!(got.len(), expected.len(), "len mismatch");
    for (i, (&g, &e)) in got.iter().zip(expected).enumerate() {
        if e == sentinel {
            assert_eq!(g, sentinel, "idx {i}: expected missing label, got {g}");
        } else {
            assert_eq!(g, e, "idx {i}: got {got:?}, expect {expected:?}");
        }
    }
}

/// Element-wise key equality; any two missing keys match.
pub fn assert_keys(got: &Values, expected: &[Scalar]) {
    let got = got.to_object();
    assert_eq!(got.len(), expected.len(), "len mismatch: {got:?}");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!(
            g.key_eq(e) || (g.is_na() && e.is_na()),
            "idx {i}: got {g:?}, expect {e:?}"
        );
    }
}
