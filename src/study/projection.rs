//! Projection of studies into search documents.
//!
//! Every gene statistic of a study becomes one nested document:
//! ```json
//! {
//!   "study": "gsf1a2b3c4d",
//!   "contrast": { "name": "gsc1a2b3c4d_0", "formula": "~ A + B + C" },
//!   "gene": { "id": "ENSG00000141510", "pvalue": 0.01, "fdr": 0.03, "logFC": 2.0 }
//! }
//! ```
//! The projection is lossless for the contrasts of a study, see [`contrasts_from_documents`].

use serde::{Deserialize, Serialize};

use crate::identifier::{ContrastId, GeneId, IdentifierError};

use super::{Contrast, GeneStatistic, Study};

/// The contrast of a [`StudyDocument`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContrastDocument {
    /// The contrast identifier.
    pub name: String,
    /// The contrast formula.
    pub formula: String,
}

/// The gene statistic of a [`StudyDocument`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneDocument {
    /// The gene identifier.
    pub id: String,
    /// The p-value.
    pub pvalue: f64,
    /// The FDR.
    pub fdr: f64,
    /// The log fold-change.
    #[serde(rename = "logFC")]
    pub log_fold_change: f64,
}

/// One gene statistic of one contrast of a study.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StudyDocument {
    /// The study identifier.
    pub study: String,
    /// The contrast.
    pub contrast: ContrastDocument,
    /// The gene statistic.
    pub gene: GeneDocument,
}

/// Project `study` into one document per gene statistic, contrast by contrast.
#[must_use]
pub fn project(study: &Study) -> Vec<StudyDocument> {
    study
        .contrasts()
        .iter()
        .flat_map(|contrast| {
            contrast
                .statistics()
                .iter()
                .map(move |statistic| StudyDocument {
                    study: study.id().to_string(),
                    contrast: ContrastDocument {
                        name: contrast.id().to_string(),
                        formula: contrast.formula().to_string(),
                    },
                    gene: GeneDocument {
                        id: statistic.gene.to_string(),
                        pvalue: statistic.pvalue,
                        fdr: statistic.fdr,
                        log_fold_change: statistic.log_fold_change,
                    },
                })
        })
        .collect()
}

/// Rebuild the contrasts from `documents`, in order of first appearance.
///
/// # Errors
/// Returns an [`IdentifierError`] if a document holds an invalid contrast or gene identifier.
pub fn contrasts_from_documents(
    documents: &[StudyDocument],
) -> Result<Vec<Contrast>, IdentifierError> {
    let mut contrasts: Vec<Contrast> = Vec::new();
    for document in documents {
        let statistic = GeneStatistic {
            gene: GeneId::new(document.gene.id.as_str())?,
            pvalue: document.gene.pvalue,
            fdr: document.gene.fdr,
            log_fold_change: document.gene.log_fold_change,
        };
        match contrasts
            .iter_mut()
            .find(|contrast| contrast.id().as_str() == document.contrast.name)
        {
            Some(contrast) => contrast.statistics.push(statistic),
            None => contrasts.push(Contrast::new(
                ContrastId::new(document.contrast.name.as_str())?,
                document.contrast.formula.as_str(),
                vec![statistic],
            )),
        }
    }
    Ok(contrasts)
}

/// The field mapping of a search index holding [`StudyDocument`]s.
#[must_use]
pub fn index_mapping() -> serde_json::Value {
    serde_json::json!({
        "properties": {
            "study": { "type": "keyword" },
            "contrast": {
                "properties": {
                    "name": { "type": "keyword" },
                    "formula": { "type": "text" }
                }
            },
            "gene": {
                "properties": {
                    "id": { "type": "keyword" },
                    "pvalue": { "type": "float" },
                    "fdr": { "type": "float" },
                    "logFC": { "type": "float" }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{GeneUniverse, RandomStudyGenerator};

    #[test]
    fn projection_lossless() -> Result<(), Box<dyn std::error::Error>> {
        let genes = GeneUniverse::from_reader("gene\ng1\ng2\ng3\n".as_bytes(), ',')?;
        let study = RandomStudyGenerator::new(5)
            .contrasts(2)
            .samples(1)
            .generate(&genes)?;
        let documents = project(&study);
        assert_eq!(documents.len(), 6);
        assert!(documents
            .iter()
            .all(|document| document.study == study.id().as_str()));

        let json = serde_json::to_string(&documents)?;
        let documents: Vec<StudyDocument> = serde_json::from_str(&json)?;
        assert_eq!(contrasts_from_documents(&documents)?, study.contrasts());
        Ok(())
    }

    #[test]
    fn projection_document_shape() -> Result<(), Box<dyn std::error::Error>> {
        let document = StudyDocument {
            study: "gsf0001".to_string(),
            contrast: ContrastDocument {
                name: "gsc0001_0".to_string(),
                formula: "~ A".to_string(),
            },
            gene: GeneDocument {
                id: "g1".to_string(),
                pvalue: 0.01,
                fdr: 0.03,
                log_fold_change: 2.0,
            },
        };
        assert_eq!(
            serde_json::to_value(&document)?,
            serde_json::json!({
                "study": "gsf0001",
                "contrast": { "name": "gsc0001_0", "formula": "~ A" },
                "gene": { "id": "g1", "pvalue": 0.01, "fdr": 0.03, "logFC": 2.0 }
            })
        );
        assert_eq!(
            index_mapping()["properties"]["gene"]["properties"]["logFC"]["type"],
            "float"
        );
        Ok(())
    }
}
