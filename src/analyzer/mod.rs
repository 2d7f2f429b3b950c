//! Lemma extraction from page content
//!
//! This module turns HTML (or free text) into a multiset of lemmas:
//! - [`text`] strips markup down to visible text
//! - [`morphology`] holds the functional-word tables and normal-form rules
//! - [`LemmaAnalyzer`] ties them together: tokenization, per-token language
//!   detection, functional part-of-speech filtering, and counting
//!
//! The analyzer is pure and thread-safe after construction; construction
//! itself can fail once if the embedded morphology tables are malformed.

mod lemma;
mod morphology;
mod text;

pub use lemma::LemmaAnalyzer;
pub use morphology::{Language, Morphology};
pub use text::visible_text;
