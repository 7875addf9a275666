//! Custom assertions for testing

#![allow(clippy::missing_panics_doc)]

use std::fmt::Debug;

/// Assert that an error's display form contains a substring
///
/// ```
/// let result: Result<(), String> = Err("shift is validated".to_string());
/// minetally_common::assert_error_contains!(result, "validated");
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that two floats differ by less than `epsilon`
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff < epsilon,
        "Values not approximately equal: {} vs {} (diff: {})",
        actual,
        expected,
        diff
    );
}

/// Element-wise [`assert_approx_eq`] for equal-length slices
pub fn assert_all_approx_eq(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len(), "Length mismatch: {:?} vs {:?}", actual, expected);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        assert!(diff < epsilon, "Index {}: {} vs {} (diff: {})", i, a, e, diff);
    }
}

/// Assert that a collection is sorted ascending
pub fn assert_sorted<T>(items: &[T])
where
    T: Ord + Debug,
{
    for window in items.windows(2) {
        assert!(window[0] <= window[1], "Items not sorted: {:?} > {:?}", window[0], window[1]);
    }
}
