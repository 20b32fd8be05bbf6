//! Series post-processing.

use aot_common::Table;

/// Trailing moving average over `window` samples.
///
/// Position `i` holds the mean of `values[i + 1 - window ..= i]`. The first
/// `window - 1` positions, and any window containing a missing value, are
/// `None`. A `window` of 0 is treated as 1.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

/// Numeric `value_hrf` of every row, in order.
pub fn values(table: &Table) -> Vec<Option<f64>> {
    table.iter().map(|r| r.value()).collect()
}

/// Moving average of a table's numeric values.
pub fn rolling_mean(table: &Table, window: usize) -> Vec<Option<f64>> {
    moving_average(&values(table), window)
}
