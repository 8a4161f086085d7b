use serde::Serialize;

/// Distribution of one duration series, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: i64,
    pub mean_ms: f64,
    pub p50_ms: i64,
    pub p95_ms: i64,
    pub max_ms: i64,
}

pub fn summarize(durations: &[i64]) -> Option<LatencySummary> {
    if durations.is_empty() {
        return None;
    }
    let mut sorted = durations.to_vec();
    sorted.sort_unstable();
    let mean = sorted.iter().map(|&d| d as f64).sum::<f64>() / sorted.len() as f64;

    Some(LatencySummary {
        count: sorted.len(),
        min_ms: sorted[0],
        mean_ms: mean,
        p50_ms: percentile(&sorted, 50.0),
        p95_ms: percentile(&sorted, 95.0),
        max_ms: sorted[sorted.len() - 1],
    })
}

/// Nearest-rank percentile over an already sorted, non-empty slice.
fn percentile(sorted: &[i64], pct: f64) -> i64 {
    let rank = ((pct / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_has_no_summary() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn single_value() {
        let s = summarize(&[42]).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.min_ms, 42);
        assert_eq!(s.p50_ms, 42);
        assert_eq!(s.p95_ms, 42);
        assert_eq!(s.max_ms, 42);
        assert_eq!(s.mean_ms, 42.0);
    }

    #[test]
    fn unordered_input_is_sorted_first() {
        let s = summarize(&[90, 10, 50, 30, 70]).unwrap();
        assert_eq!(s.min_ms, 10);
        assert_eq!(s.max_ms, 90);
        assert_eq!(s.p50_ms, 50);
        assert_eq!(s.mean_ms, 50.0);
    }

    #[test]
    fn p95_of_hundred_values() {
        let values: Vec<i64> = (1..=100).collect();
        let s = summarize(&values).unwrap();
        // rank = round(0.95 * 99) = 94
        assert_eq!(s.p95_ms, 95);
        assert_eq!(s.p50_ms, 51);
    }
}
