use std::{num::NonZeroU64, sync::Arc};

use derive_more::Display;
use thiserror::Error;

use crate::{
    array::{
        Array, ArrayCreateError, ArrayError, ArraySchemaBuilder, ArrayType, Attribute,
        AttributeType, Dimension, Layout, SparseCells,
    },
    config::global_config,
    coordinates::{
        expand_contrasts, expand_ragged, ExpressionLayouts, CONTRAST_DIMENSION,
        EXPRESSION_ATTRIBUTE, FDR_ATTRIBUTE, FORMULA_ATTRIBUTE, GENE_DIMENSION,
        LOG_FOLD_CHANGE_ATTRIBUTE, PVALUE_ATTRIBUTE, SAMPLE_DIMENSION,
    },
    group::{Group, GroupBuilder, GroupCreateError},
    identifier::StudyId,
    node::{NodePath, NodePathError},
    storage::{ReadableListableStorageTraits, ReadableWritableListableStorageTraits},
};

use super::{GeneUniverse, Study, StudySource, StudyValidationError};

/// The name of the sparse gene statistics array of a study.
pub const STATS_ARRAY: &str = "stats";
/// The name of the sparse contrast formula array of a study.
pub const CONTRASTS_ARRAY: &str = "contrasts";
/// The name of the sparse expression array of a study.
pub const TPM_ARRAY: &str = "tpm";
/// The name of the dense expression array of a study.
pub const TPM_DENSE_ARRAY: &str = "tpm_dense";

/// The progress of the assembly of one study.
///
/// Each state names the last step that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum AssemblyState {
    /// Nothing was written.
    #[display("pending")]
    Pending,
    /// The study group was created.
    #[display("initialized")]
    Initialized,
    /// The stats array was created and written.
    #[display("stats written")]
    StatsWritten,
    /// The contrasts array was created and written.
    #[display("contrasts written")]
    ContrastsWritten,
    /// The sparse expression array was created and written.
    #[display("sparse values written")]
    ValuesWrittenSparse,
    /// The dense expression array was created and written.
    #[display("dense values written")]
    ValuesWrittenDense,
    /// The study was assembled.
    #[display("complete")]
    Complete,
}

/// The failure of one step of a study assembly.
#[derive(Debug, Error)]
pub enum StudyStepError {
    /// The study is not consistent with the gene universe.
    #[error(transparent)]
    Validation(#[from] StudyValidationError),
    /// The study group could not be created.
    #[error(transparent)]
    Group(#[from] GroupCreateError),
    /// An array could not be created.
    #[error(transparent)]
    ArrayCreate(#[from] ArrayCreateError),
    /// An array could not be written.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// A study or array path is invalid.
    #[error(transparent)]
    NodePath(#[from] NodePathError),
    /// A dense dimension does not fit a positional `int32` domain.
    #[error("dimension {dimension} of length {len} exceeds the int32 domain")]
    DomainOverflow {
        /// The dimension.
        dimension: &'static str,
        /// The dimension length.
        len: usize,
    },
}

/// The failure of a study assembly.
///
/// Steps that completed before the failure are not rolled back, `state` is the last completed step.
/// Erase the study group with [`erase_node`](crate::storage::erase_node) before assembling the study again.
#[derive(Debug, Error)]
#[error("failed to assemble study {study_id} after step \"{state}\"")]
pub struct StudyAssemblyError {
    /// The study.
    pub study_id: StudyId,
    /// The last completed step.
    pub state: AssemblyState,
    /// The failed step.
    #[source]
    pub source: StudyStepError,
}

/// An ingestion error.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The study source failed.
    #[error("study source failed: {0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),
    /// A study could not be assembled.
    #[error(transparent)]
    Assembly(#[from] StudyAssemblyError),
}

/// The group and arrays of an assembled study.
#[derive(Debug)]
pub struct AssembledStudy<TStorage: ?Sized> {
    group: Group<TStorage>,
    arrays: Vec<Array<TStorage>>,
    dense_skipped: bool,
}

impl<TStorage: ?Sized> AssembledStudy<TStorage> {
    /// The study group.
    #[must_use]
    pub fn group(&self) -> &Group<TStorage> {
        &self.group
    }

    /// The arrays of the study, in the order they were written.
    #[must_use]
    pub fn arrays(&self) -> &[Array<TStorage>] {
        &self.arrays
    }

    /// The array `name` of the study.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&Array<TStorage>> {
        let path = self.group.path().child(name).ok()?;
        self.arrays.iter().find(|array| array.path() == &path)
    }

    /// Returns true if the dense expression array was not written because the expression matrix is empty.
    ///
    /// The assembly then moves from [`AssemblyState::ValuesWrittenSparse`] straight to [`AssemblyState::Complete`].
    #[must_use]
    pub fn dense_skipped(&self) -> bool {
        self.dense_skipped
    }
}

/// Writes studies into the groups and arrays of an ingestion run.
///
/// Each study gets its own group below the run root holding:
///  - `stats`: sparse `gene × contrast`, attributes `pvalue`, `fdr`, `logFC`, column-major,
///  - `contrasts`: sparse `contrast`, attribute `formula`,
///  - `tpm`: sparse `gene × sample`, attribute `expr`, row-major, and
///  - `tpm_dense`: dense positional `gene × sample`, attribute `expr`, row-major.
///
/// Studies are assembled one at a time.
/// Each study lives at a distinct location, so nothing is shared between studies except the read-only [`GeneUniverse`].
pub struct StudyAssembler<TStorage: ?Sized> {
    root: Group<TStorage>,
    genes: Arc<GeneUniverse>,
}

impl<TStorage: ?Sized> StudyAssembler<TStorage> {
    /// Create an assembler writing below `root`.
    #[must_use]
    pub fn new(root: Group<TStorage>, genes: Arc<GeneUniverse>) -> Self {
        Self { root, genes }
    }

    /// The run root.
    #[must_use]
    pub fn root(&self) -> &Group<TStorage> {
        &self.root
    }

    /// The gene universe.
    #[must_use]
    pub fn genes(&self) -> &GeneUniverse {
        &self.genes
    }
}

impl<TStorage: ?Sized + ReadableListableStorageTraits> StudyAssembler<TStorage> {
    /// Open the existing run root at `path`.
    ///
    /// # Errors
    /// Returns a [`GroupCreateError`] if there is no group at `path`.
    pub fn open(
        storage: Arc<TStorage>,
        path: &str,
        genes: Arc<GeneUniverse>,
    ) -> Result<Self, GroupCreateError> {
        Ok(Self::new(Group::open(storage, path)?, genes))
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> StudyAssembler<TStorage> {
    /// Create the root group of a new ingestion run at `path`.
    ///
    /// # Errors
    /// Returns [`GroupCreateError::AlreadyExists`] if `path` is occupied, clear it with [`erase_node`](crate::storage::erase_node) first.
    pub fn create_root(
        storage: Arc<TStorage>,
        path: &str,
        genes: Arc<GeneUniverse>,
    ) -> Result<Self, GroupCreateError> {
        let root = GroupBuilder::new()
            .attribute("genes", genes.len())
            .create(storage, path)?;
        tracing::info!(root = %root.path(), genes = genes.len(), "created ingestion run");
        Ok(Self::new(root, genes))
    }

    /// Assemble `study` into its own group.
    ///
    /// The study is validated against the gene universe before anything is written.
    ///
    /// # Errors
    /// Returns a [`StudyAssemblyError`] holding the last completed [`AssemblyState`] if a step fails.
    pub fn assemble(&self, study: &Study) -> Result<AssembledStudy<TStorage>, StudyAssemblyError> {
        let mut state = AssemblyState::Pending;
        let mut arrays = Vec::with_capacity(4);
        self.assemble_steps(study, &mut state, &mut arrays)
            .map_err(|source| {
                tracing::warn!(
                    study = %study.id(),
                    state = %state,
                    error = %source,
                    "study assembly failed"
                );
                StudyAssemblyError {
                    study_id: study.id().clone(),
                    state,
                    source,
                }
            })
            .map(|group| AssembledStudy {
                group,
                arrays,
                dense_skipped: !has_dense_values(study),
            })
    }

    /// Assemble `studies` one after the other, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the [`StudyAssemblyError`] of the first study that fails, studies before it stay assembled.
    pub fn assemble_all<'a>(
        &self,
        studies: impl IntoIterator<Item = &'a Study>,
    ) -> Result<Vec<AssembledStudy<TStorage>>, StudyAssemblyError> {
        studies
            .into_iter()
            .map(|study| self.assemble(study))
            .collect()
    }

    /// Draw `count` studies from `source` and assemble each before drawing the next.
    ///
    /// # Errors
    /// Returns an [`IngestError`] if the source fails or a study cannot be assembled.
    pub fn ingest<S: StudySource>(
        &self,
        source: &mut S,
        count: usize,
    ) -> Result<Vec<AssembledStudy<TStorage>>, IngestError> {
        (0..count)
            .map(|_| -> Result<AssembledStudy<TStorage>, IngestError> {
                let study = source
                    .next_study(&self.genes)
                    .map_err(|err| IngestError::Source(Box::new(err)))?;
                Ok(self.assemble(&study)?)
            })
            .collect()
    }

    fn assemble_steps(
        &self,
        study: &Study,
        state: &mut AssemblyState,
        arrays: &mut Vec<Array<TStorage>>,
    ) -> Result<Group<TStorage>, StudyStepError> {
        let (gene_tile_extent, contrast_tile_extent, sample_tile_extent, check_fdr) = {
            let config = global_config();
            (
                config.gene_tile_extent(),
                config.contrast_tile_extent(),
                config.sample_tile_extent(),
                config.validate_fdr_monotonicity(),
            )
        };
        study.validate(&self.genes, check_fdr)?;

        let path = self.root.path().child(study.id().as_str())?;
        let expression = study.expression();
        let group = GroupBuilder::new()
            .attribute("study", study.id().as_str())
            .attribute("contrasts", study.contrasts().len())
            .attribute("genes", self.genes.len())
            .attribute("samples", expression.samples().len())
            .create(self.root.storage(), path.as_str())?;
        *state = AssemblyState::Initialized;

        let mut stats = ArraySchemaBuilder::new(ArrayType::Sparse);
        stats
            .dimension(Dimension::string(GENE_DIMENSION, Some(gene_tile_extent)))
            .dimension(Dimension::string(
                CONTRAST_DIMENSION,
                Some(contrast_tile_extent),
            ))
            .attribute(Attribute::new(PVALUE_ATTRIBUTE, AttributeType::Float64))
            .attribute(Attribute::new(FDR_ATTRIBUTE, AttributeType::Float64))
            .attribute(Attribute::new(
                LOG_FOLD_CHANGE_ATTRIBUTE,
                AttributeType::Float64,
            ))
            .cell_order(Layout::ColMajor)
            .tile_order(Layout::ColMajor);
        arrays.push(self.write_sparse_array(
            &stats,
            &path,
            STATS_ARRAY,
            &expand_ragged(study.contrasts()),
        )?);
        *state = AssemblyState::StatsWritten;

        let mut contrasts = ArraySchemaBuilder::new(ArrayType::Sparse);
        contrasts
            .dimension(Dimension::string(CONTRAST_DIMENSION, None))
            .attribute(Attribute::new(FORMULA_ATTRIBUTE, AttributeType::StringUtf8));
        arrays.push(self.write_sparse_array(
            &contrasts,
            &path,
            CONTRASTS_ARRAY,
            &expand_contrasts(study.contrasts()),
        )?);
        *state = AssemblyState::ContrastsWritten;

        let layouts = ExpressionLayouts::from_matrix(expression);
        let mut tpm = ArraySchemaBuilder::new(ArrayType::Sparse);
        tpm.dimension(Dimension::string(GENE_DIMENSION, Some(gene_tile_extent)))
            .dimension(Dimension::string(SAMPLE_DIMENSION, Some(sample_tile_extent)))
            .attribute(Attribute::new(EXPRESSION_ATTRIBUTE, AttributeType::Float64));
        arrays.push(self.write_sparse_array(&tpm, &path, TPM_ARRAY, layouts.sparse())?);
        *state = AssemblyState::ValuesWrittenSparse;

        let (rows, cols) = expression.shape();
        if !has_dense_values(study) {
            tracing::debug!(
                study = %study.id(),
                genes = rows,
                samples = cols,
                "skipped dense expression array of an empty matrix"
            );
        } else {
            let mut tpm_dense = ArraySchemaBuilder::new(ArrayType::Dense);
            tpm_dense
                .dimension(positional_dimension(
                    GENE_DIMENSION,
                    rows,
                    gene_tile_extent,
                )?)
                .dimension(positional_dimension(
                    SAMPLE_DIMENSION,
                    cols,
                    sample_tile_extent,
                )?)
                .attribute(Attribute::new(EXPRESSION_ATTRIBUTE, AttributeType::Float64))
                .user_attributes(labels(study));
            let array = tpm_dense.create(self.root.storage(), &array_path(&path, TPM_DENSE_ARRAY)?)?;
            let mut writer = array.open_for_write();
            writer.write_dense(layouts.dense())?;
            writer.close();
            arrays.push(array);
            *state = AssemblyState::ValuesWrittenDense;
        }
        *state = AssemblyState::Complete;
        tracing::info!(
            study = %study.id(),
            contrasts = study.contrasts().len(),
            genes = rows,
            samples = cols,
            "assembled study"
        );
        Ok(group)
    }

    fn write_sparse_array(
        &self,
        builder: &ArraySchemaBuilder,
        study: &NodePath,
        name: &str,
        cells: &SparseCells,
    ) -> Result<Array<TStorage>, StudyStepError> {
        let array = builder.create(self.root.storage(), &array_path(study, name)?)?;
        let mut writer = array.open_for_write();
        writer.write_sparse(cells)?;
        writer.close();
        Ok(array)
    }
}

fn has_dense_values(study: &Study) -> bool {
    let (rows, cols) = study.expression().shape();
    rows > 0 && cols > 0
}

fn array_path(study: &NodePath, name: &str) -> Result<String, NodePathError> {
    Ok(study.child(name)?.as_str().to_string())
}

/// A dimension with the positions `1..=len`.
fn positional_dimension(
    name: &'static str,
    len: usize,
    tile_extent: NonZeroU64,
) -> Result<Dimension, StudyStepError> {
    let hi = i32::try_from(len).map_err(|_| StudyStepError::DomainOverflow {
        dimension: name,
        len,
    })?;
    Ok(Dimension::int32(name, (1, hi), Some(tile_extent)))
}

/// The gene and sample labels of the positions of the dense expression array.
fn labels(study: &Study) -> serde_json::Map<String, serde_json::Value> {
    let expression = study.expression();
    let mut attributes = serde_json::Map::new();
    attributes.insert(
        "gene_labels".to_string(),
        expression
            .genes()
            .iter()
            .map(|gene| gene.as_str())
            .collect::<Vec<_>>()
            .into(),
    );
    attributes.insert(
        "sample_labels".to_string(),
        expression
            .samples()
            .iter()
            .map(|sample| sample.as_str())
            .collect::<Vec<_>>()
            .into(),
    );
    attributes
}
