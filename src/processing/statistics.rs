use serde::{Deserialize, Serialize};

/// Quartiles by the split-at-median rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Tukey fences `Q1 - k*IQR`, `Q3 + k*IQR`.
    pub fn fences(&self, k: f64) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - k * iqr, self.q3 + k * iqr)
    }
}

/// Median of an already-sorted slice. Zero for an empty slice.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Quartiles of an ascending slice.
///
/// Q2 is the median; Q1 and Q3 are the medians of the lower and upper
/// halves, with the middle element excluded from both halves when the
/// length is odd. This is not the linear-interpolation definition and gives
/// different fences on small samples. A single value is its own quartiles.
pub fn quartiles(sorted: &[f64]) -> Quartiles {
    let n = sorted.len();
    let q2 = median_sorted(sorted);
    if n < 2 {
        return Quartiles { q1: q2, q2, q3: q2 };
    }
    let lower = &sorted[..n / 2];
    let upper = if n % 2 == 0 { &sorted[n / 2..] } else { &sorted[n / 2 + 1..] };
    Quartiles {
        q1: median_sorted(lower),
        q2,
        q3: median_sorted(upper),
    }
}

pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut vals = data.to_vec();
    vals.sort_by(|a, b| a.total_cmp(b));
    vals
}

pub fn median(data: &[f64]) -> f64 {
    median_sorted(&sorted_copy(data))
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by N).
pub fn std_dev(data: &[f64], mean: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Median absolute deviation around `center`.
pub fn mad(data: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = data.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Summary statistics for a series of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    /// Compute statistics from values, filtering out NaN.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = mean(&vals);

        Some(SeriesStats {
            count,
            min,
            max,
            mean,
            median: median(&vals),
            std_dev: std_dev(&vals, mean),
        })
    }

    /// Like [`SeriesStats::compute`], but all-zero when nothing is valid.
    pub fn compute_or_zero(values: &[f64]) -> Self {
        Self::compute(values).unwrap_or_default()
    }
}
