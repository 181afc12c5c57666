//! knowgraph extract crate - entity tagging and extraction.
//!
//! Provides:
//! - The `EntityTagger` capability trait and a gazetteer `LexiconTagger`
//! - `EntityExtractor`, which runs a tagger or falls back to matching runs
//!   of capitalized words

pub mod entity;
pub mod error;
pub mod tagger;
pub mod types;

pub use entity::EntityExtractor;
pub use error::TaggerError;
pub use tagger::{EntityTagger, LexiconTagger};
pub use types::{ExtractionStrategy, TaggedSpan};
