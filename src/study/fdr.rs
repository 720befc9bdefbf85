//! P-value adjustment for multiple testing.

/// A transform of a p-value vector into adjusted p-values.
///
/// Adjusted values are aligned to the input and, for finite p-values, non-decreasing in p-value.
pub trait PValueAdjustment: Send + Sync {
    /// Adjust `pvalues`.
    ///
    /// A `NaN` p-value adjusts to `NaN` and does not count as a test.
    fn adjust(&self, pvalues: &[f64]) -> Vec<f64>;
}

/// The Benjamini-Hochberg false discovery rate correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BenjaminiHochberg;

impl PValueAdjustment for BenjaminiHochberg {
    #[allow(clippy::cast_precision_loss)]
    fn adjust(&self, pvalues: &[f64]) -> Vec<f64> {
        let n = pvalues.len();
        let mut indices: Vec<usize> = (0..n).filter(|&i| !pvalues[i].is_nan()).collect();
        indices.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

        let m = indices.len();
        let mut adjusted = vec![f64::NAN; n];
        let mut cummin = f64::INFINITY;
        for (rank, &i) in indices.iter().enumerate().rev() {
            let adj = (pvalues[i] * m as f64 / (rank + 1) as f64).min(1.0);
            cummin = cummin.min(adj);
            adjusted[i] = cummin;
        }
        adjusted
    }
}

/// The two-stage Benjamini-Krieger-Yekutieli false discovery rate correction.
///
/// The first stage runs [`BenjaminiHochberg`] at level `alpha / (1 + alpha)` to estimate the number of true null hypotheses,
/// which then rescales the adjusted p-values.
#[derive(Debug, Clone, Copy)]
pub struct TwoStageBenjaminiHochberg {
    alpha: f64,
}

impl TwoStageBenjaminiHochberg {
    /// Create the correction at level `alpha`.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// The level.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for TwoStageBenjaminiHochberg {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl PValueAdjustment for TwoStageBenjaminiHochberg {
    #[allow(clippy::cast_precision_loss)]
    fn adjust(&self, pvalues: &[f64]) -> Vec<f64> {
        let adjusted = BenjaminiHochberg.adjust(pvalues);
        let tests = adjusted.iter().filter(|p| !p.is_nan()).count();
        let alpha_prime = self.alpha / (1.0 + self.alpha);
        let rejected = adjusted.iter().filter(|&&p| p <= alpha_prime).count();

        let scale = if rejected == 0 || rejected == tests {
            1.0 + self.alpha
        } else {
            (1.0 + self.alpha) * (tests - rejected) as f64 / tests as f64
        };
        adjusted
            .into_iter()
            .map(|p| (p * scale).min(1.0))
            .collect()
    }
}
