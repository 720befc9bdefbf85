use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use thiserror::Error;

use crate::identifier::{GeneId, IdentifierError};

/// The set of genes shared by every study of an ingestion run.
///
/// Genes keep their input order, which is the row order of expression matrices.
/// A universe is immutable once loaded and is shared behind an [`Arc`](std::sync::Arc).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneUniverse {
    genes: Vec<GeneId>,
    positions: HashMap<GeneId, usize>,
}

/// A gene universe loading error.
#[derive(Debug, Error)]
pub enum GeneUniverseError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A line does not start with a gene identifier.
    #[error("line {0} has no gene identifier")]
    EmptyIdentifier(usize),
    /// A gene identifier is not valid.
    #[error("line {line}: {source}")]
    InvalidIdentifier {
        /// The line number, starting at 1.
        line: usize,
        /// The identifier error.
        source: IdentifierError,
    },
    /// A gene identifier appears more than once.
    #[error("duplicate gene {0}")]
    DuplicateGene(GeneId),
}

impl GeneUniverse {
    /// Create a gene universe from `genes`.
    ///
    /// # Errors
    /// Returns [`GeneUniverseError::DuplicateGene`] if a gene appears more than once.
    pub fn new(genes: Vec<GeneId>) -> Result<Self, GeneUniverseError> {
        let mut positions = HashMap::with_capacity(genes.len());
        for (position, gene) in genes.iter().enumerate() {
            if positions.insert(gene.clone(), position).is_some() {
                return Err(GeneUniverseError::DuplicateGene(gene.clone()));
            }
        }
        Ok(Self { genes, positions })
    }

    /// Read a gene universe from delimited text.
    ///
    /// The first line is a header and is discarded.
    /// Every other non-blank line starts with a gene identifier terminated by `delimiter`, the rest of the line is ignored.
    ///
    /// # Errors
    /// Returns a [`GeneUniverseError`] if reading fails, or a line holds an empty, invalid, or duplicate identifier.
    pub fn from_reader<R: Read>(reader: R, delimiter: char) -> Result<Self, GeneUniverseError> {
        let mut genes = Vec::new();
        for (index, line) in BufReader::new(reader).lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let token = line
                .split(delimiter)
                .next()
                .map(str::trim)
                .unwrap_or_default();
            if token.is_empty() {
                return Err(GeneUniverseError::EmptyIdentifier(index + 1));
            }
            let gene = GeneId::new(token).map_err(|source| {
                GeneUniverseError::InvalidIdentifier {
                    line: index + 1,
                    source,
                }
            })?;
            genes.push(gene);
        }
        let universe = Self::new(genes)?;
        tracing::debug!(genes = universe.len(), "loaded gene universe");
        Ok(universe)
    }

    /// Read a gene universe from the delimited file at `path`, see [`GeneUniverse::from_reader`].
    ///
    /// # Errors
    /// See [`GeneUniverse::from_reader`].
    pub fn from_path(path: impl AsRef<Path>, delimiter: char) -> Result<Self, GeneUniverseError> {
        Self::from_reader(std::fs::File::open(path)?, delimiter)
    }

    /// The genes in input order.
    #[must_use]
    pub fn genes(&self) -> &[GeneId] {
        &self.genes
    }

    /// The number of genes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns true if there are no genes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns true if `gene` is in the universe.
    #[must_use]
    pub fn contains(&self, gene: &str) -> bool {
        self.position(gene).is_some()
    }

    /// The position of `gene` in the universe.
    #[must_use]
    pub fn position(&self, gene: &str) -> Option<usize> {
        GeneId::new(gene)
            .ok()
            .and_then(|gene| self.positions.get(&gene).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gene_universe_read() -> Result<(), GeneUniverseError> {
        let text = "gene_id,DMSO_1,SP2509_1\nENSG01,1,2\n\nENSG02,3,4\nENSG03\n";
        let universe = GeneUniverse::from_reader(text.as_bytes(), ',')?;
        assert_eq!(
            universe
                .genes()
                .iter()
                .map(GeneId::as_str)
                .collect::<Vec<_>>(),
            ["ENSG01", "ENSG02", "ENSG03"]
        );
        assert_eq!(universe.position("ENSG02"), Some(1));
        assert!(!universe.contains("gene_id"));

        let universe = GeneUniverse::from_reader("gene\tx\ng1\t0\n".as_bytes(), '\t')?;
        assert_eq!(universe.len(), 1);
        Ok(())
    }

    #[test]
    fn gene_universe_empty() -> Result<(), GeneUniverseError> {
        assert!(GeneUniverse::from_reader("".as_bytes(), ',')?.is_empty());
        assert!(GeneUniverse::from_reader("header\n".as_bytes(), ',')?.is_empty());
        Ok(())
    }

    #[test]
    fn gene_universe_invalid() {
        assert!(matches!(
            GeneUniverse::from_reader("h\ng1,1\n,2\n".as_bytes(), ','),
            Err(GeneUniverseError::EmptyIdentifier(3))
        ));
        assert!(matches!(
            GeneUniverse::from_reader("h\ng1,1\ng1,2\n".as_bytes(), ','),
            Err(GeneUniverseError::DuplicateGene(gene)) if gene.as_str() == "g1"
        ));
        assert!(matches!(
            GeneUniverse::from_reader("h\na/b,1\n".as_bytes(), ','),
            Err(GeneUniverseError::InvalidIdentifier { line: 2, .. })
        ));
    }

    #[test]
    fn gene_universe_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("genes.csv");
        std::fs::write(&path, "gene,count\ng1,1\ng2,2\n")?;
        assert_eq!(GeneUniverse::from_path(&path, ',')?.len(), 2);
        assert!(matches!(
            GeneUniverse::from_path(dir.path().join("missing.csv"), ','),
            Err(GeneUniverseError::IOError(_))
        ));
        Ok(())
    }
}
