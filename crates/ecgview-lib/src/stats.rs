//! Order statistics over sample buffers. Non-finite values are ignored.

fn finite_copy(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median of the finite values (mean of the two middle values for even counts).
/// NaN when no finite value exists.
pub fn median(values: &[f64]) -> f64 {
    let mut buf = finite_copy(values);
    median_in_place(&mut buf)
}

/// Median of an all-finite buffer; reorders `buf`. NaN when empty.
pub fn median_in_place(buf: &mut [f64]) -> f64 {
    let n = buf.len();
    if n == 0 {
        return f64::NAN;
    }
    let mid = n / 2;
    let (lower, upper, _) = buf.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        upper
    } else {
        let lower = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        0.5 * (lower + upper)
    }
}

/// Index-selected percentile: element `floor(p * (n - 1))` of the sorted finite values.
/// No interpolation. 0.0 when no finite value exists.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut buf = finite_copy(values);
    if buf.is_empty() {
        return 0.0;
    }
    let last = buf.len() - 1;
    let idx = ((p.clamp(0.0, 1.0) * last as f64).floor() as usize).min(last);
    *buf.select_nth_unstable_by(idx, f64::total_cmp).1
}

/// Arithmetic mean of the finite values; NaN when none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_median(values: &[f64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        if n % 2 == 1 {
            sorted[(n - 1) / 2]
        } else {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        }
    }

    #[test]
    fn median_matches_sorted_reference() {
        let data = [7.5, -1.0, 3.25, 9.0, 0.0, 2.0, 2.0, 11.5, -4.0, 6.0, 5.5];
        for len in 1..=data.len() {
            let slice = &data[..len];
            assert_eq!(median(slice), sorted_median(slice), "len {}", len);
        }
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn median_skips_non_finite() {
        assert_eq!(median(&[f64::NAN, 1.0, f64::INFINITY, 3.0]), 2.0);
        assert!(median(&[f64::NAN]).is_nan());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn percentile_uses_floor_index() {
        let data: Vec<f64> = (0..10).map(|v| v as f64).rev().collect();
        // floor(0.98 * 9) = 8
        assert_eq!(percentile(&data, 0.98), 8.0);
        assert_eq!(percentile(&data, 0.0), 0.0);
        assert_eq!(percentile(&data, 1.0), 9.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn mean_ignores_nan() {
        assert_eq!(mean([1.0, f64::NAN, 3.0]), 2.0);
        assert!(mean(std::iter::empty()).is_nan());
    }
}
