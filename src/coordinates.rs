//! Coordinate expansion.
//!
//! Turns row/column oriented tables into the column batches written to arrays.
//! Every coordinate column of a batch has the same length as every value column, so a dimension coordinate repeats once per cell it addresses.
//!
//! - [`expand_ragged`]: gene statistics of many contrasts into `(gene, contrast)` cells.
//! - [`expand_cartesian`]: every combination of two label sets, first dimension varying slowest.
//! - [`ExpressionLayouts`]: an expression matrix as a sparse batch and a dense block from a single pass.

use itertools::iproduct;

use crate::{
    array::{ArrayError, AttributeValues, CoordinateValues, DenseBlock, SparseCells},
    study::{Contrast, ExpressionMatrix},
};

/// The gene dimension.
pub const GENE_DIMENSION: &str = "gene";
/// The contrast dimension.
pub const CONTRAST_DIMENSION: &str = "contrast";
/// The sample dimension.
pub const SAMPLE_DIMENSION: &str = "sample";
/// The p-value attribute.
pub const PVALUE_ATTRIBUTE: &str = "pvalue";
/// The FDR attribute.
pub const FDR_ATTRIBUTE: &str = "fdr";
/// The log fold-change attribute.
pub const LOG_FOLD_CHANGE_ATTRIBUTE: &str = "logFC";
/// The contrast formula attribute.
pub const FORMULA_ATTRIBUTE: &str = "formula";
/// The expression value attribute.
pub const EXPRESSION_ATTRIBUTE: &str = "expr";

/// Expand the gene statistics of `contrasts` into one batch of `(gene, contrast)` cells.
///
/// Contrast `c` with statistics for genes `G` contributes the cells `{(g, c) : g ∈ G}` with `pvalue`, `fdr`, and `logFC` aligned to them.
#[must_use]
pub fn expand_ragged(contrasts: &[Contrast]) -> SparseCells {
    let len = contrasts
        .iter()
        .map(|contrast| contrast.statistics().len())
        .sum();
    let mut genes = Vec::with_capacity(len);
    let mut contrast_ids = Vec::with_capacity(len);
    let mut pvalues = Vec::with_capacity(len);
    let mut fdr = Vec::with_capacity(len);
    let mut log_fold_changes = Vec::with_capacity(len);
    for contrast in contrasts {
        for statistic in contrast.statistics() {
            genes.push(statistic.gene.to_string());
            contrast_ids.push(contrast.id().to_string());
            pvalues.push(statistic.pvalue);
            fdr.push(statistic.fdr);
            log_fold_changes.push(statistic.log_fold_change);
        }
    }
    SparseCells::new()
        .with_dimension(GENE_DIMENSION, genes)
        .with_dimension(CONTRAST_DIMENSION, contrast_ids)
        .with_attribute(PVALUE_ATTRIBUTE, pvalues)
        .with_attribute(FDR_ATTRIBUTE, fdr)
        .with_attribute(LOG_FOLD_CHANGE_ATTRIBUTE, log_fold_changes)
}

/// Expand the contrast formulas into one batch of `contrast` cells.
#[must_use]
pub fn expand_contrasts(contrasts: &[Contrast]) -> SparseCells {
    let (ids, formulas): (Vec<String>, Vec<String>) = contrasts
        .iter()
        .map(|contrast| (contrast.id().to_string(), contrast.formula().to_string()))
        .unzip();
    SparseCells::new()
        .with_dimension(CONTRAST_DIMENSION, ids)
        .with_attribute(FORMULA_ATTRIBUTE, AttributeValues::String(formulas))
}

/// The cartesian product of `rows` and `cols` as two coordinate columns in row-major order.
///
/// Cell `i * cols.len() + j` is `(rows[i], cols[j])`.
#[must_use]
pub fn expand_cartesian<R: AsRef<str>, C: AsRef<str>>(
    rows: &[R],
    cols: &[C],
) -> (CoordinateValues, CoordinateValues) {
    let (row_coordinates, col_coordinates): (Vec<String>, Vec<String>) = iproduct!(rows, cols)
        .map(|(row, col)| (row.as_ref().to_string(), col.as_ref().to_string()))
        .unzip();
    (
        CoordinateValues::String(row_coordinates),
        CoordinateValues::String(col_coordinates),
    )
}

/// Flatten equal length `rows` in row-major order.
///
/// # Errors
/// Returns [`ArrayError::ShapeMismatch`] if the rows differ in length.
pub fn flatten_row_major<T: Copy>(rows: &[impl AsRef<[T]>]) -> Result<Vec<T>, ArrayError> {
    let width = rows.first().map_or(0, |row| row.as_ref().len());
    if let Some(row) = rows.iter().find(|row| row.as_ref().len() != width) {
        return Err(ArrayError::ShapeMismatch {
            expected: vec![rows.len() as u64, width as u64],
            got: vec![row.as_ref().len() as u64],
        });
    }
    Ok(rows
        .iter()
        .flat_map(|row| row.as_ref().iter().copied())
        .collect())
}

/// An expression matrix laid out for the sparse `gene × sample` array and the dense positional array.
///
/// Both layouts are built from the same flattened values, so they hold identical values at every `(gene, sample)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionLayouts {
    sparse: SparseCells,
    dense: DenseBlock,
}

impl ExpressionLayouts {
    /// Lay out `matrix`.
    ///
    /// The sparse cells are the cartesian product of genes and samples.
    /// The dense block has shape genes × samples, gene `i` and sample `j` at positions `i + 1` and `j + 1`.
    #[must_use]
    pub fn from_matrix(matrix: &ExpressionMatrix) -> Self {
        let (genes, samples) = expand_cartesian(matrix.genes(), matrix.samples());
        let values = matrix.values().to_vec();
        let (rows, cols) = matrix.shape();
        let sparse = SparseCells::new()
            .with_dimension(GENE_DIMENSION, genes)
            .with_dimension(SAMPLE_DIMENSION, samples)
            .with_attribute(EXPRESSION_ATTRIBUTE, values.clone());
        let dense = DenseBlock::new(vec![rows as u64, cols as u64])
            .with_attribute(EXPRESSION_ATTRIBUTE, values);
        Self { sparse, dense }
    }

    /// The sparse `gene × sample` cells.
    #[must_use]
    pub fn sparse(&self) -> &SparseCells {
        &self.sparse
    }

    /// The dense block.
    #[must_use]
    pub fn dense(&self) -> &DenseBlock {
        &self.dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        array::{AttributeValue, Coordinate},
        identifier::{contrast_ids, sample_ids, GeneId, StudyId},
        study::{BenjaminiHochberg, Contrast},
    };

    fn genes(ids: &[&str]) -> Vec<GeneId> {
        ids.iter().map(|id| GeneId::new(*id).unwrap()).collect()
    }

    #[test]
    fn ragged_expansion() {
        let study = StudyId::new("gsf0001").unwrap();
        let genes = genes(&["g1", "g2", "g3"]);
        let contrasts: Vec<Contrast> = contrast_ids(&study, 2)
            .into_iter()
            .map(|id| {
                Contrast::from_pvalues(
                    id,
                    "~ A",
                    &genes,
                    &[0.01, 0.2, 0.5],
                    &[2.0, -1.0, 0.3],
                    &BenjaminiHochberg,
                )
                .unwrap()
            })
            .collect();
        let cells = expand_ragged(&contrasts);
        assert_eq!(cells.len(), 6);
        assert_eq!(
            cells.coordinates(4),
            Some(vec![Coordinate::from("g2"), Coordinate::from("gsc0001_1")])
        );
        assert_eq!(
            cells.value_at(&["g2".into(), "gsc0001_1".into()], LOG_FOLD_CHANGE_ATTRIBUTE),
            Some(AttributeValue::Float64(-1.0))
        );
        let contrast_column = cells.dimension(CONTRAST_DIMENSION).unwrap();
        assert_eq!(contrast_column.len(), 6);

        let formulas = expand_contrasts(&contrasts);
        assert_eq!(formulas.len(), 2);
        assert_eq!(
            formulas.values(1),
            Some(vec![AttributeValue::String("~ A".to_string())])
        );
    }

    #[test]
    fn ragged_expansion_empty() {
        let cells = expand_ragged(&[]);
        assert!(cells.is_empty());
        assert_eq!(cells.dimensions().len(), 2);
        assert_eq!(cells.attributes().len(), 3);
    }

    #[test]
    fn cartesian_row_major() {
        let (rows, cols) = expand_cartesian(&["g1", "g2", "g3"], &["s0", "s1"]);
        assert_eq!(
            rows,
            CoordinateValues::from(vec!["g1", "g1", "g2", "g2", "g3", "g3"])
        );
        assert_eq!(
            cols,
            CoordinateValues::from(vec!["s0", "s1", "s0", "s1", "s0", "s1"])
        );
        let (rows, cols) = expand_cartesian::<&str, &str>(&[], &["s0"]);
        assert!(rows.is_empty() && cols.is_empty());
    }

    #[test]
    fn flatten() {
        assert_eq!(
            flatten_row_major(&[[1, 2], [3, 4], [5, 6]]).unwrap(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert!(flatten_row_major::<i32>(&[vec![1, 2], vec![3]]).is_err());
        assert!(flatten_row_major::<f64>(&Vec::<Vec<f64>>::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn expression_layouts_agree() {
        let matrix = ExpressionMatrix::from_rows(
            genes(&["g1", "g2", "g3"]),
            sample_ids(2),
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        )
        .unwrap();
        let layouts = ExpressionLayouts::from_matrix(&matrix);
        assert_eq!(layouts.sparse().len(), 6);
        assert_eq!(layouts.dense().shape(), &[3, 2]);
        for (i, gene) in matrix.genes().iter().enumerate() {
            for (j, sample) in matrix.samples().iter().enumerate() {
                let sparse = layouts.sparse().value_at(
                    &[gene.as_str().into(), sample.as_str().into()],
                    EXPRESSION_ATTRIBUTE,
                );
                let dense = layouts
                    .dense()
                    .get(EXPRESSION_ATTRIBUTE, &[i as u64, j as u64]);
                assert_eq!(sparse, dense);
                assert_eq!(sparse, matrix.get(i, j).map(AttributeValue::Float64));
            }
        }
    }
}
