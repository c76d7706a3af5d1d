//! # dyad
//!
//! Dictionary-driven political event coding: turns a constituency parse plus
//! hand-built lexicons into "who did what to whom" event records with
//! CAMEO-style hierarchical codes.
//!
//! The pipeline per sentence:
//!
//! 1. **Normalize** the bracketed parse into an entity-annotated tree
//!    ([`tree::normalize`]).
//! 2. **Resolve** meanings bottom-up: actor/agent codes for noun phrases,
//!    candidate events for verb phrases ([`resolve`], pattern matching in the
//!    verb dictionary).
//! 3. **Assemble** candidates into deduplicated `(source, target, code)`
//!    triples ([`assemble`]).
//!
//! All linguistic knowledge is hand-authored pattern data; there is no
//! statistical model anywhere in the pipeline.
//!
//! ## Quick Start
//!
//! ```rust
//! use dyad::{Coder, DictionaryStore};
//!
//! let mut b = DictionaryStore::builder();
//! b.actor("GERMANY", "DEU");
//! b.actor("FRANCE", "FRA");
//! b.verb("INVADE", Some("192"));
//! b.verb_alias("INVADE", "INVADED");
//!
//! let coder = Coder::new(b.build());
//! let events = coder
//!     .code_sentence("(S (NP (NNP GERMANY)) (VP (VBD INVADED) (NP (NNP FRANCE))))", None)
//!     .unwrap();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].source, "DEU");
//! assert_eq!(events[0].target, "FRA");
//! assert_eq!(events[0].code, "192");
//! ```
//!
//! ## Batches
//!
//! [`Coder::code_batch`] fans sentences out across a rayon pool; the
//! dictionary store is immutable after load, so sentences share it freely.
//! Per-sentence failures (unbalanced trees, missing dates) are logged and
//! counted, never fatal to the run.

#![warn(missing_docs)]

pub mod assemble;
pub mod batch;
pub mod dict;
mod error;
mod matcher;
pub mod ontology;
pub mod resolve;
pub mod tree;

pub use assemble::{assemble, AssemblyConfig, EventTriple};
pub use batch::{BatchCounters, BatchReport, Event, SentenceInput};
pub use dict::{CodeSet, DateRestriction, DictionaryBuilder, DictionaryStore};
pub use error::{Error, Result};
pub use ontology::EventCode;
pub use tree::normalize::NormalizerConfig;

use chrono::NaiveDate;

/// The event coder: an immutable dictionary store plus per-run policies.
#[derive(Debug, Clone)]
pub struct Coder {
    store: DictionaryStore,
    normalizer: NormalizerConfig,
    assembly: AssemblyConfig,
}

impl Coder {
    /// Create a coder with default normalization and assembly policies.
    #[must_use]
    pub fn new(store: DictionaryStore) -> Self {
        Coder {
            store,
            normalizer: NormalizerConfig::default(),
            assembly: AssemblyConfig::default(),
        }
    }

    /// Replace the tree-normalization policy.
    #[must_use]
    pub fn with_normalizer(mut self, config: NormalizerConfig) -> Self {
        self.normalizer = config;
        self
    }

    /// Replace the assembly policy.
    #[must_use]
    pub fn with_assembly(mut self, config: AssemblyConfig) -> Self {
        self.assembly = config;
        self
    }

    /// The dictionary store in use.
    #[must_use]
    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    /// Code one sentence: parse, resolve, assemble.
    ///
    /// # Errors
    ///
    /// Returns a sentence-local error ([`Error::UnbalancedTree`]) on a
    /// malformed parse; callers running batches should skip and continue.
    pub fn code_sentence(
        &self,
        parse: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<EventTriple>> {
        let tree = tree::normalize::parse_sentence(parse, date, &self.normalizer)?;
        let mut resolver = resolve::Resolver::new(&self.store, &tree);
        let candidates = resolver.sentence_candidates();
        Ok(assemble::assemble(&candidates, &self.assembly))
    }

    /// Code a batch of sentences with per-sentence fault isolation.
    #[must_use]
    pub fn code_batch(&self, inputs: &[SentenceInput]) -> BatchReport {
        batch::code_batch(self, inputs)
    }
}
