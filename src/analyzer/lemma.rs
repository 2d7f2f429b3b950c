use crate::analyzer::morphology::Morphology;
use crate::analyzer::text::visible_text;
use crate::{CrawldexError, Result};
use std::collections::{HashMap, HashSet};

/// Extracts lemmas and their occurrence counts from page content
///
/// The pipeline, per token:
/// 1. Strip HTML down to visible text
/// 2. Split on non-word runs and lowercase
/// 3. Detect the token's language from its script; Cyrillic-only tokens go
///    through the Russian rules, Latin-only through the English rules,
///    mixed tokens are dropped
/// 4. Drop tokens whose dictionary form is a functional part of speech
///    (interjection, preposition, conjunction)
/// 5. Count the first normal form
///
/// The analyzer is pure and thread-safe; share it behind an `Arc`.
pub struct LemmaAnalyzer {
    morphology: Morphology,
}

impl LemmaAnalyzer {
    /// Builds the analyzer, parsing the embedded morphology tables
    ///
    /// Fails if a table entry is malformed. This is the only fallible step;
    /// all later operations are infallible.
    pub fn new() -> Result<Self> {
        let morphology = Morphology::new().map_err(CrawldexError::AnalyzerInit)?;
        Ok(Self { morphology })
    }

    /// Maps each lemma in the content to its occurrence count
    pub fn collect_lemmas(&self, content: &str) -> HashMap<String, usize> {
        let mut lemmas = HashMap::new();
        for lemma in self.lemma_stream(content) {
            *lemmas.entry(lemma).or_insert(0) += 1;
        }
        lemmas
    }

    /// Returns the set of distinct lemmas in the text
    ///
    /// Used by the search side to lemmatize queries with the same rules the
    /// index was built with.
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.lemma_stream(text).collect()
    }

    fn lemma_stream<'a>(&'a self, content: &'a str) -> impl Iterator<Item = String> + 'a {
        let text = visible_text(content).to_lowercase();
        tokenize(&text).into_iter().filter_map(move |token| {
            let language = Morphology::detect_language(&token)?;
            if self.morphology.functional_tag(&token).is_some() {
                return None;
            }
            Some(self.morphology.normal_form(&token, language))
        })
    }
}

/// Splits lowercased text on non-word runs
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
