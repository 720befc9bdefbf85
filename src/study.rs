//! Studies, contrasts, gene statistics, and expression matrices.
//!
//! A [`Study`] owns one or more [`Contrast`]s and one [`ExpressionMatrix`].
//! Every contrast holds exactly one [`GeneStatistic`] per gene of the shared [`GeneUniverse`].
//!
//! Studies come from a [`StudySource`] such as the [`RandomStudyGenerator`] and are persisted by a [`StudyAssembler`].

mod assembler;
mod fdr;
mod gene_universe;
pub mod projection;
mod random;

use std::collections::HashSet;

use thiserror::Error;

pub use self::{
    assembler::{
        AssembledStudy, AssemblyState, IngestError, StudyAssembler, StudyAssemblyError,
        StudyStepError, CONTRASTS_ARRAY, STATS_ARRAY, TPM_ARRAY, TPM_DENSE_ARRAY,
    },
    fdr::{BenjaminiHochberg, PValueAdjustment, TwoStageBenjaminiHochberg},
    gene_universe::{GeneUniverse, GeneUniverseError},
    random::RandomStudyGenerator,
};

use crate::{
    array::ArrayError,
    coordinates::flatten_row_major,
    identifier::{ContrastId, GeneId, SampleId, StudyId},
};

/// The statistics of one gene in one contrast.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneStatistic {
    /// The gene.
    pub gene: GeneId,
    /// The p-value, in `[0, 1]`.
    pub pvalue: f64,
    /// The FDR adjusted p-value, in `[0, 1]`.
    pub fdr: f64,
    /// The log fold-change.
    pub log_fold_change: f64,
}

/// A contrast of a study.
#[derive(Clone, Debug, PartialEq)]
pub struct Contrast {
    id: ContrastId,
    formula: String,
    statistics: Vec<GeneStatistic>,
}

impl Contrast {
    /// Create a contrast from its gene statistics.
    #[must_use]
    pub fn new(id: ContrastId, formula: impl Into<String>, statistics: Vec<GeneStatistic>) -> Self {
        Self {
            id,
            formula: formula.into(),
            statistics,
        }
    }

    /// Create a contrast from per-gene p-values and log fold-changes aligned to `genes`.
    ///
    /// The FDR is computed from the p-values with `adjustment`.
    ///
    /// # Errors
    /// Returns [`StudyValidationError::LengthMismatch`] if `pvalues` or `log_fold_changes` is not the length of `genes`.
    pub fn from_pvalues(
        id: ContrastId,
        formula: impl Into<String>,
        genes: &[GeneId],
        pvalues: &[f64],
        log_fold_changes: &[f64],
        adjustment: &dyn PValueAdjustment,
    ) -> Result<Self, StudyValidationError> {
        for len in [pvalues.len(), log_fold_changes.len()] {
            if len != genes.len() {
                return Err(StudyValidationError::LengthMismatch {
                    contrast: id,
                    expected: genes.len(),
                    got: len,
                });
            }
        }
        let fdr = adjustment.adjust(pvalues);
        let statistics = itertools::izip!(genes, pvalues, fdr, log_fold_changes)
            .map(|(gene, &pvalue, fdr, &log_fold_change)| GeneStatistic {
                gene: gene.clone(),
                pvalue,
                fdr,
                log_fold_change,
            })
            .collect();
        Ok(Self::new(id, formula, statistics))
    }

    /// The contrast identifier.
    #[must_use]
    pub fn id(&self) -> &ContrastId {
        &self.id
    }

    /// The model formula. Free text.
    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// The gene statistics.
    #[must_use]
    pub fn statistics(&self) -> &[GeneStatistic] {
        &self.statistics
    }

    /// Check that the FDR is non-decreasing when the statistics are ordered by p-value.
    #[must_use]
    pub fn fdr_is_monotonic(&self) -> bool {
        let mut pairs: Vec<(f64, f64)> = self
            .statistics
            .iter()
            .map(|statistic| (statistic.pvalue, statistic.fdr))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        pairs.windows(2).all(|pair| pair[0].1 <= pair[1].1)
    }

    fn validate(&self, genes: &GeneUniverse, check_fdr: bool) -> Result<(), StudyValidationError> {
        let mut seen = HashSet::with_capacity(self.statistics.len());
        for statistic in &self.statistics {
            if !genes.contains(statistic.gene.as_str()) {
                return Err(StudyValidationError::OrphanGene {
                    contrast: self.id.clone(),
                    gene: statistic.gene.clone(),
                });
            }
            if !seen.insert(&statistic.gene) {
                return Err(StudyValidationError::DuplicateGene {
                    contrast: self.id.clone(),
                    gene: statistic.gene.clone(),
                });
            }
            for (name, value) in [("pvalue", statistic.pvalue), ("fdr", statistic.fdr)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(StudyValidationError::OutOfRange {
                        contrast: self.id.clone(),
                        gene: statistic.gene.clone(),
                        name,
                        value,
                    });
                }
            }
        }
        if self.statistics.len() != genes.len() {
            return Err(StudyValidationError::LengthMismatch {
                contrast: self.id.clone(),
                expected: genes.len(),
                got: self.statistics.len(),
            });
        }
        if check_fdr && !self.fdr_is_monotonic() {
            return Err(StudyValidationError::NonMonotonicFdr(self.id.clone()));
        }
        Ok(())
    }
}

/// A genes × samples expression matrix.
///
/// Values are stored in row-major order: the values of gene `i` are `values[i * samples.len()..(i + 1) * samples.len()]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionMatrix {
    genes: Vec<GeneId>,
    samples: Vec<SampleId>,
    values: Vec<f64>,
}

impl ExpressionMatrix {
    /// Create an expression matrix from row-major `values`.
    ///
    /// # Errors
    /// Returns [`StudyValidationError::ExpressionShapeMismatch`] if `values` does not hold one value per gene and sample.
    pub fn new(
        genes: Vec<GeneId>,
        samples: Vec<SampleId>,
        values: Vec<f64>,
    ) -> Result<Self, StudyValidationError> {
        let expected = (genes.len(), samples.len());
        if values.len() == expected.0 * expected.1 {
            Ok(Self {
                genes,
                samples,
                values,
            })
        } else {
            Err(StudyValidationError::ExpressionShapeMismatch {
                expected,
                got: values.len(),
            })
        }
    }

    /// Create an expression matrix from one row of values per gene.
    ///
    /// # Errors
    /// Returns [`StudyValidationError::ExpressionShapeMismatch`] if there is not one row per gene with one value per sample.
    pub fn from_rows(
        genes: Vec<GeneId>,
        samples: Vec<SampleId>,
        rows: &[Vec<f64>],
    ) -> Result<Self, StudyValidationError> {
        let expected = (genes.len(), samples.len());
        if rows.len() != expected.0 || rows.iter().any(|row| row.len() != expected.1) {
            return Err(StudyValidationError::ExpressionShapeMismatch {
                expected,
                got: rows.iter().map(Vec::len).sum(),
            });
        }
        let values = flatten_row_major(rows)?;
        Self::new(genes, samples, values)
    }

    /// Create an expression matrix from an [`ndarray::Array2`] with one row per gene.
    ///
    /// # Errors
    /// Returns [`StudyValidationError::ExpressionShapeMismatch`] if the array shape is not genes × samples.
    #[cfg(feature = "ndarray")]
    pub fn from_ndarray(
        genes: Vec<GeneId>,
        samples: Vec<SampleId>,
        array: &ndarray::Array2<f64>,
    ) -> Result<Self, StudyValidationError> {
        if array.dim() != (genes.len(), samples.len()) {
            return Err(StudyValidationError::ExpressionShapeMismatch {
                expected: (genes.len(), samples.len()),
                got: array.len(),
            });
        }
        Self::new(genes, samples, array.iter().copied().collect())
    }

    /// Convert to an [`ndarray::Array2`] with one row per gene.
    #[cfg(feature = "ndarray")]
    #[must_use]
    pub fn to_ndarray(&self) -> ndarray::Array2<f64> {
        ndarray::Array2::from_shape_fn((self.genes.len(), self.samples.len()), |(i, j)| {
            self.values[i * self.samples.len() + j]
        })
    }

    /// The genes (rows).
    #[must_use]
    pub fn genes(&self) -> &[GeneId] {
        &self.genes
    }

    /// The samples (columns).
    #[must_use]
    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    /// The values in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The shape, genes × samples.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.genes.len(), self.samples.len())
    }

    /// The value of `gene` in `sample`.
    #[must_use]
    pub fn get(&self, gene: usize, sample: usize) -> Option<f64> {
        if gene < self.genes.len() && sample < self.samples.len() {
            self.values.get(gene * self.samples.len() + sample).copied()
        } else {
            None
        }
    }
}

/// A study.
#[derive(Clone, Debug, PartialEq)]
pub struct Study {
    id: StudyId,
    contrasts: Vec<Contrast>,
    expression: ExpressionMatrix,
}

impl Study {
    /// Create a study.
    #[must_use]
    pub fn new(id: StudyId, contrasts: Vec<Contrast>, expression: ExpressionMatrix) -> Self {
        Self {
            id,
            contrasts,
            expression,
        }
    }

    /// The study identifier.
    #[must_use]
    pub fn id(&self) -> &StudyId {
        &self.id
    }

    /// The contrasts.
    #[must_use]
    pub fn contrasts(&self) -> &[Contrast] {
        &self.contrasts
    }

    /// The expression matrix.
    #[must_use]
    pub fn expression(&self) -> &ExpressionMatrix {
        &self.expression
    }

    /// Validate the study against the gene universe.
    ///
    /// If `check_fdr` is true, the FDR of every contrast must be non-decreasing in p-value.
    ///
    /// # Errors
    /// Returns a [`StudyValidationError`] describing the first violation found.
    pub fn validate(
        &self,
        genes: &GeneUniverse,
        check_fdr: bool,
    ) -> Result<(), StudyValidationError> {
        if self.contrasts.is_empty() {
            return Err(StudyValidationError::NoContrasts(self.id.clone()));
        }
        let mut contrast_ids = HashSet::with_capacity(self.contrasts.len());
        for contrast in &self.contrasts {
            if !contrast.id.belongs_to(&self.id) {
                return Err(StudyValidationError::ForeignContrast {
                    study: self.id.clone(),
                    contrast: contrast.id.clone(),
                });
            }
            if !contrast_ids.insert(&contrast.id) {
                return Err(StudyValidationError::DuplicateContrast(contrast.id.clone()));
            }
            contrast.validate(genes, check_fdr)?;
        }
        if self.expression.genes() != genes.genes() {
            return Err(StudyValidationError::ExpressionGenes);
        }
        let mut sample_ids = HashSet::with_capacity(self.expression.samples.len());
        if let Some(sample) = self
            .expression
            .samples
            .iter()
            .find(|sample| !sample_ids.insert(*sample))
        {
            return Err(StudyValidationError::DuplicateSample(sample.clone()));
        }
        Ok(())
    }
}

/// A source of studies.
pub trait StudySource {
    /// The error produced by the source.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce the next study over the gene universe `genes`.
    ///
    /// # Errors
    /// Returns [`Self::Error`] if a study cannot be produced.
    fn next_study(&mut self, genes: &GeneUniverse) -> Result<Study, Self::Error>;
}

/// A study validation error.
#[derive(Debug, Error)]
pub enum StudyValidationError {
    /// A study has no contrasts.
    #[error("study {0} has no contrasts")]
    NoContrasts(StudyId),
    /// A contrast identifier is not derived from its study identifier.
    #[error("contrast {contrast} does not belong to study {study}")]
    ForeignContrast {
        /// The study.
        study: StudyId,
        /// The contrast.
        contrast: ContrastId,
    },
    /// A contrast appears more than once.
    #[error("duplicate contrast {0}")]
    DuplicateContrast(ContrastId),
    /// A gene statistic refers to a gene outside of the gene universe.
    #[error("gene {gene} of contrast {contrast} is not in the gene universe")]
    OrphanGene {
        /// The contrast.
        contrast: ContrastId,
        /// The gene.
        gene: GeneId,
    },
    /// A contrast holds more than one statistic for a gene.
    #[error("contrast {contrast} holds more than one statistic for gene {gene}")]
    DuplicateGene {
        /// The contrast.
        contrast: ContrastId,
        /// The gene.
        gene: GeneId,
    },
    /// A contrast does not hold one value per gene.
    #[error("contrast {contrast} holds {got} values, expected {expected}")]
    LengthMismatch {
        /// The contrast.
        contrast: ContrastId,
        /// The number of genes.
        expected: usize,
        /// The number of values.
        got: usize,
    },
    /// A p-value or FDR lies outside of `[0, 1]`.
    #[error("{name} {value} of gene {gene} in contrast {contrast} is outside [0, 1]")]
    OutOfRange {
        /// The contrast.
        contrast: ContrastId,
        /// The gene.
        gene: GeneId,
        /// The statistic name.
        name: &'static str,
        /// The value.
        value: f64,
    },
    /// The FDR of a contrast decreases as the p-value increases.
    #[error("the fdr of contrast {0} is not monotonic in p-value")]
    NonMonotonicFdr(ContrastId),
    /// The expression matrix does not hold one value per gene and sample.
    #[error("expression matrix of shape {expected:?} holds {got} values")]
    ExpressionShapeMismatch {
        /// Genes × samples.
        expected: (usize, usize),
        /// The number of values.
        got: usize,
    },
    /// The expression matrix rows are not the genes of the gene universe.
    #[error("the expression matrix genes are not the gene universe")]
    ExpressionGenes,
    /// A sample appears more than once.
    #[error("duplicate sample {0}")]
    DuplicateSample(SampleId),
    /// An array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
}
