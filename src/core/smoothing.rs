use ndarray::{Array2, ArrayView2, Zip};

/// Centered moving average over a single series.
///
/// Positions near the edges use whatever part of the window is in bounds
/// (partial-window semantics), so the output always has the same length as
/// the input and no NaN is introduced.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let span = &values[lo..hi];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}

/// Row-wise centered moving average over a parcel x date grid
pub fn smooth_rows(values: ArrayView2<'_, f64>, window: usize) -> Array2<f64> {
    let mut out = Array2::zeros(values.dim());
    Zip::from(out.rows_mut())
        .and(values.rows())
        .par_for_each(|mut out_row, row| {
            let raw: Vec<f64> = row.iter().copied().collect();
            let smoothed = rolling_mean(&raw, window);
            for (o, s) in out_row.iter_mut().zip(smoothed) {
                *o = s;
            }
        });
    out
}
