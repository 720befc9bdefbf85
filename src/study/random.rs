use std::sync::Arc;

use crate::{
    identifier::{contrast_ids, sample_ids, IdentifierError, IdentifierGenerator},
    rng::SplitMix64,
};

use super::{
    BenjaminiHochberg, Contrast, ExpressionMatrix, GeneUniverse, PValueAdjustment, Study,
    StudySource,
};

/// Generates random studies.
///
/// For each contrast, p-values are uniform in `[0, 1)` with the FDR computed by the p-value adjustment,
/// and log fold-changes are uniform in `[-max_fold_change, max_fold_change)`.
/// Expression values are uniform in `[0, 10000)`.
///
/// ### Example
/// ```rust
/// # use degstore::study::{GeneUniverse, RandomStudyGenerator};
/// let genes = GeneUniverse::from_reader("gene\ng1\ng2\n".as_bytes(), ',')?;
/// let mut generator = RandomStudyGenerator::new(1).contrasts(3).samples(4);
/// let study = generator.generate(&genes)?;
/// assert_eq!(study.contrasts().len(), 3);
/// assert_eq!(study.expression().shape(), (2, 4));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RandomStudyGenerator {
    identifiers: IdentifierGenerator,
    rng: SplitMix64,
    contrasts: usize,
    samples: usize,
    max_fold_change: f64,
    max_expression: f64,
    formula: String,
    adjustment: Arc<dyn PValueAdjustment>,
}

impl core::fmt::Debug for RandomStudyGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RandomStudyGenerator")
            .field("contrasts", &self.contrasts)
            .field("samples", &self.samples)
            .field("max_fold_change", &self.max_fold_change)
            .field("formula", &self.formula)
            .finish_non_exhaustive()
    }
}

impl RandomStudyGenerator {
    /// Create a generator from `seed` with 20 contrasts, 100 samples, a maximum fold-change of 100, and the formula `~ A + B + C`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut seeds = SplitMix64::new(seed);
        Self {
            identifiers: IdentifierGenerator::new(seeds.next_u64()),
            rng: SplitMix64::new(seeds.next_u64()),
            contrasts: 20,
            samples: 100,
            max_fold_change: 100.0,
            max_expression: 10_000.0,
            formula: "~ A + B + C".to_string(),
            adjustment: Arc::new(BenjaminiHochberg),
        }
    }

    /// Set the number of contrasts per study.
    #[must_use]
    pub fn contrasts(mut self, contrasts: usize) -> Self {
        self.contrasts = contrasts;
        self
    }

    /// Set the number of samples per study.
    #[must_use]
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Set the absolute maximum log fold-change.
    #[must_use]
    pub fn max_fold_change(mut self, max_fold_change: f64) -> Self {
        self.max_fold_change = max_fold_change.abs();
        self
    }

    /// Set the contrast formula.
    #[must_use]
    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    /// Set the p-value adjustment.
    #[must_use]
    pub fn adjustment(mut self, adjustment: Arc<dyn PValueAdjustment>) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Generate a study over `genes`.
    ///
    /// # Errors
    /// Returns [`IdentifierError::Collision`] if the study identifier collides with one generated before.
    pub fn generate(&mut self, genes: &GeneUniverse) -> Result<Study, IdentifierError> {
        let study_id = self.identifiers.new_study_id()?;
        let contrasts = contrast_ids(&study_id, self.contrasts)
            .into_iter()
            .map(|id| {
                let pvalues: Vec<f64> = (0..genes.len()).map(|_| self.rng.next_f64()).collect();
                let log_fold_changes: Vec<f64> = (0..genes.len())
                    .map(|_| {
                        self.rng
                            .uniform(-self.max_fold_change, self.max_fold_change)
                    })
                    .collect();
                let fdr = self.adjustment.adjust(&pvalues);
                let statistics = itertools::izip!(genes.genes(), pvalues, fdr, log_fold_changes)
                    .map(|(gene, pvalue, fdr, log_fold_change)| super::GeneStatistic {
                        gene: gene.clone(),
                        pvalue,
                        fdr,
                        log_fold_change,
                    })
                    .collect();
                Contrast::new(id, self.formula.clone(), statistics)
            })
            .collect();

        let samples = sample_ids(self.samples);
        let values = (0..genes.len() * samples.len())
            .map(|_| self.rng.uniform(0.0, self.max_expression))
            .collect();
        let expression = ExpressionMatrix {
            genes: genes.genes().to_vec(),
            samples,
            values,
        };
        tracing::debug!(
            study = %study_id,
            contrasts = self.contrasts,
            genes = genes.len(),
            samples = self.samples,
            "generated random study"
        );
        Ok(Study::new(study_id, contrasts, expression))
    }
}

impl StudySource for RandomStudyGenerator {
    type Error = IdentifierError;

    fn next_study(&mut self, genes: &GeneUniverse) -> Result<Study, IdentifierError> {
        self.generate(genes)
    }
}
