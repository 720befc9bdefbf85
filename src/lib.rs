//! A rust library for storing differential-expression genomics results in multidimensional arrays.
//!
//! Per-gene statistics (p-value, false discovery rate, log fold-change) are grouped into contrasts, contrasts are grouped into studies, and each study carries a genes × samples expression matrix.
//! Everything is persisted into a hierarchy of [groups](group) and [arrays](array) backed by a key/value [store](storage).
//!
//! ## Getting Started
//! - [`study::StudyAssembler`] writes a whole [`study::Study`] into its own group: the `stats`, `contrasts`, `tpm` and `tpm_dense` arrays.
//! - [`array::ArraySchemaBuilder`] and [`array::Array`] are the lower level entry points for creating and writing arrays directly.
//! - [`coordinates`] turns row/column oriented tables into the coordinate vectors a sparse write needs.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use degstore::study::{GeneUniverse, RandomStudyGenerator, StudyAssembler};
//! use degstore::storage::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let genes = GeneUniverse::from_reader("gene,count\nENSG1,1\nENSG2,4\n".as_bytes(), ',')?;
//! let assembler = StudyAssembler::create_root(store.clone(), "/", Arc::new(genes))?;
//!
//! let mut generator = RandomStudyGenerator::new(42).contrasts(2).samples(3);
//! let study = generator.generate(assembler.genes())?;
//! let assembled = assembler.assemble(&study)?;
//! assert_eq!(assembled.arrays().len(), 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Storage Layout
//! ```text
//! /                      root group of an ingestion run
//!   gsf<tag>             one group per study
//!     stats              sparse, gene × contrast, pvalue / fdr / logFC
//!     contrasts          sparse, contrast, formula
//!     tpm                sparse, gene × sample, expr
//!     tpm_dense          dense, gene index × sample index, expr
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] conversions for expression matrices and dense blocks.
//!
//! ## Licence
//! `degstore` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod config;
pub mod coordinates;
pub mod group;
pub mod identifier;
pub mod node;
pub mod rng;
pub mod storage;
pub mod study;
