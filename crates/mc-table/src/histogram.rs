//! Fixed-width 1-D histograms with under/overflow.

use crate::error::{Result, TableError};

/// Histogram with `n_bins` equal-width bins over `[min, max)`.
///
/// Value `v` lands in bin `floor(n_bins * (v - min) / (max - min))`.
/// Values below `min` go to underflow, values at or above `max` (and NaN)
/// go to overflow. Flows never enter [`Histogram1D::integral`].
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    min: f64,
    max: f64,
    counts: Vec<f64>,
    underflow: f64,
    overflow: f64,
}

impl Histogram1D {
    /// Empty histogram. Requires `n_bins > 0` and finite `min < max`.
    pub fn new(n_bins: usize, min: f64, max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(TableError::Invalid("histogram bin count must be positive".into()));
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(TableError::Invalid(format!(
                "histogram range must satisfy min < max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max, counts: vec![0.0; n_bins], underflow: 0.0, overflow: 0.0 })
    }

    /// Histogram filled with unit weights.
    pub fn from_values(n_bins: usize, min: f64, max: f64, values: &[f64]) -> Result<Self> {
        let mut h = Self::new(n_bins, min, max)?;
        for &v in values {
            h.fill(v);
        }
        Ok(h)
    }

    /// Add one entry of weight 1.
    pub fn fill(&mut self, v: f64) {
        if v < self.min {
            self.underflow += 1.0;
            return;
        }
        if !(v < self.max) {
            self.overflow += 1.0;
            return;
        }
        let n = self.counts.len();
        let idx = ((n as f64) * (v - self.min) / (self.max - self.min)).floor() as usize;
        // Rounding can push values just below `max` to index n.
        self.counts[idx.min(n - 1)] += 1.0;
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Lower range edge.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper range edge.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Bin width.
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Low edge of bin `i`.
    pub fn bin_low_edge(&self, i: usize) -> f64 {
        self.min + i as f64 * self.bin_width()
    }

    /// In-range bin contents.
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Entries below `min`.
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Entries at or above `max`.
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Sum of in-range bins.
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Sum of bins `i..n_bins` for every bin `i`.
    pub fn cumulative_from_right(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.counts.len()];
        let mut acc = 0.0;
        for (slot, c) in out.iter_mut().zip(&self.counts).rev() {
            acc += c;
            *slot = acc;
        }
        out
    }

    /// Bin contents scaled to unit in-range integral (all zeros if empty).
    pub fn normalized(&self) -> Vec<f64> {
        let total = self.integral();
        if total <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|c| c / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn binning_convention() {
        let h = Histogram1D::from_values(4, 0.0, 1.0, &[-0.1, 0.0, 0.24, 0.25, 0.99, 1.0, 2.0])
            .unwrap();
        assert_eq!(h.counts(), &[2.0, 1.0, 0.0, 1.0]);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_eq!(h.integral(), 4.0);
    }

    #[test]
    fn suffix_integrals() {
        let h = Histogram1D::from_values(4, 0.0, 4.0, &[0.5, 1.5, 1.5, 3.5]).unwrap();
        assert_eq!(h.cumulative_from_right(), vec![4.0, 3.0, 1.0, 1.0]);
    }

    #[test]
    fn edges() {
        let h = Histogram1D::new(1000, -1.0, 1.0).unwrap();
        assert_relative_eq!(h.bin_width(), 0.002);
        assert_relative_eq!(h.bin_low_edge(500), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_binning() {
        assert!(Histogram1D::new(0, 0.0, 1.0).is_err());
        assert!(Histogram1D::new(10, 1.0, 1.0).is_err());
        assert!(Histogram1D::new(10, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn normalization() {
        let h = Histogram1D::from_values(2, 0.0, 2.0, &[0.5, 1.5, 1.5, 1.5]).unwrap();
        assert_eq!(h.normalized(), vec![0.25, 0.75]);
        assert_eq!(Histogram1D::new(3, 0.0, 1.0).unwrap().normalized(), vec![0.0; 3]);
    }

    proptest! {
        #[test]
        fn every_entry_is_counted_once(
            values in prop::collection::vec(-2.0f64..2.0, 0..300),
            n_bins in 1usize..60,
        ) {
            let h = Histogram1D::from_values(n_bins, -1.0, 1.0, &values).unwrap();
            let total = h.integral() + h.underflow() + h.overflow();
            prop_assert_eq!(total, values.len() as f64);

            let cum = h.cumulative_from_right();
            prop_assert_eq!(cum[0], h.integral());
            prop_assert!(cum.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
