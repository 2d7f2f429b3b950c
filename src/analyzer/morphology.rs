use std::collections::HashMap;

/// Language of a single token, detected from its script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Russian,
    English,
}

/// Functional-word tables for Russian
///
/// Format: one `form|TAG` pair per line. Tags follow the dictionary
/// conventions: `МЕЖД` interjection, `ПРЕДЛ` preposition, `СОЮЗ`
/// conjunction.
const RUSSIAN_FUNCTIONAL: &str = "\
и|СОЮЗ
а|СОЮЗ
но|СОЮЗ
да|СОЮЗ
или|СОЮЗ
либо|СОЮЗ
что|СОЮЗ
чтобы|СОЮЗ
как|СОЮЗ
если|СОЮЗ
когда|СОЮЗ
хотя|СОЮЗ
пока|СОЮЗ
будто|СОЮЗ
словно|СОЮЗ
зато|СОЮЗ
однако|СОЮЗ
тоже|СОЮЗ
также|СОЮЗ
в|ПРЕДЛ
во|ПРЕДЛ
на|ПРЕДЛ
с|ПРЕДЛ
со|ПРЕДЛ
по|ПРЕДЛ
за|ПРЕДЛ
из|ПРЕДЛ
у|ПРЕДЛ
о|ПРЕДЛ
об|ПРЕДЛ
обо|ПРЕДЛ
от|ПРЕДЛ
до|ПРЕДЛ
без|ПРЕДЛ
для|ПРЕДЛ
при|ПРЕДЛ
про|ПРЕДЛ
через|ПРЕДЛ
над|ПРЕДЛ
под|ПРЕДЛ
перед|ПРЕДЛ
между|ПРЕДЛ
около|ПРЕДЛ
возле|ПРЕДЛ
среди|ПРЕДЛ
к|ПРЕДЛ
ко|ПРЕДЛ
ах|МЕЖД
ох|МЕЖД
эх|МЕЖД
ой|МЕЖД
эй|МЕЖД
ну|МЕЖД
увы|МЕЖД
ура|МЕЖД
ага|МЕЖД
";

/// Functional-word tables for English
///
/// Tags: `INTJ` interjection, `PREP` preposition, `CONJ` conjunction.
const ENGLISH_FUNCTIONAL: &str = "\
and|CONJ
or|CONJ
but|CONJ
nor|CONJ
so|CONJ
yet|CONJ
if|CONJ
because|CONJ
although|CONJ
though|CONJ
while|CONJ
whereas|CONJ
unless|CONJ
since|CONJ
than|CONJ
whether|CONJ
in|PREP
on|PREP
at|PREP
by|PREP
for|PREP
with|PREP
of|PREP
to|PREP
from|PREP
into|PREP
onto|PREP
over|PREP
under|PREP
between|PREP
among|PREP
through|PREP
during|PREP
before|PREP
after|PREP
above|PREP
below|PREP
about|PREP
against|PREP
without|PREP
within|PREP
upon|PREP
off|PREP
near|PREP
oh|INTJ
ah|INTJ
hey|INTJ
wow|INTJ
ouch|INTJ
oops|INTJ
alas|INTJ
hmm|INTJ
hurrah|INTJ
";

/// Russian inflection suffixes, longest first; stripping stops at the first
/// match that leaves a stem of at least three letters.
const RUSSIAN_SUFFIXES: &[&str] = &[
    "иями", "ями", "ами", "иях", "иям", "ьями", "ьях", "ого", "его", "ому", "ему", "ыми", "ими",
    "ях", "ам", "ям", "ах", "ой", "ей", "ою", "ею", "ом", "ем", "ов", "ев", "ий", "ый", "ая",
    "яя", "ое", "ее", "ье", "ья", "ью", "ы", "и", "а", "я", "о", "е", "у", "ю", "ь",
];

/// Morphological tables: functional-word lookup and normal-form rules
///
/// The tables are embedded and parsed once at construction; a malformed
/// line is a construction error, surfaced by the analyzer as an
/// initialization failure.
pub struct Morphology {
    functional: HashMap<String, &'static str>,
}

impl Morphology {
    /// Parses the embedded tables
    pub fn new() -> Result<Self, String> {
        let mut functional = HashMap::new();
        for (table, name) in [
            (RUSSIAN_FUNCTIONAL, "russian"),
            (ENGLISH_FUNCTIONAL, "english"),
        ] {
            for line in table.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let (form, tag) = line.split_once('|').ok_or_else(|| {
                    format!("malformed {} functional entry: {:?}", name, line)
                })?;
                if !matches!(tag, "МЕЖД" | "ПРЕДЛ" | "СОЮЗ" | "INTJ" | "PREP" | "CONJ") {
                    return Err(format!("unknown part-of-speech tag: {:?}", tag));
                }
                functional.insert(form.to_string(), tag);
            }
        }
        Ok(Self { functional })
    }

    /// Detects a token's language from its script
    ///
    /// Cyrillic-only tokens are Russian, ASCII-letter-only tokens are
    /// English, anything mixed is dropped (`None`).
    pub fn detect_language(token: &str) -> Option<Language> {
        if token.is_empty() {
            return None;
        }
        if token.chars().all(is_cyrillic) {
            Some(Language::Russian)
        } else if token.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Language::English)
        } else {
            None
        }
    }

    /// Returns the functional part-of-speech tag for a word, if any
    pub fn functional_tag(&self, word: &str) -> Option<&'static str> {
        self.functional.get(word).copied()
    }

    /// Reduces an inflected word to its normal form
    ///
    /// Rule-based suffix stripping: predictable, dictionary-free, and
    /// stable across runs. Stems shorter than three letters are never
    /// produced.
    pub fn normal_form(&self, word: &str, language: Language) -> String {
        match language {
            Language::English => english_normal_form(word),
            Language::Russian => russian_normal_form(word),
        }
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
}

fn english_normal_form(word: &str) -> String {
    let n = word.chars().count();

    if n > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    if word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if let Some(stem) = word.strip_suffix("es") {
        if ["s", "x", "z"].iter().any(|s| stem.ends_with(s))
            || stem.ends_with("ch")
            || stem.ends_with("sh")
        {
            return stem.to_string();
        }
    }
    if n > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}

fn russian_normal_form(word: &str) -> String {
    for suffix in RUSSIAN_SUFFIXES {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.chars().count() >= 3 {
                return stem.to_string();
            }
        }
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_parse() {
        assert!(Morphology::new().is_ok());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(Morphology::detect_language("cat"), Some(Language::English));
        assert_eq!(Morphology::detect_language("кошка"), Some(Language::Russian));
        // Mixed-script and alphanumeric tokens are dropped
        assert_eq!(Morphology::detect_language("catкошка"), None);
        assert_eq!(Morphology::detect_language("abc123"), None);
        assert_eq!(Morphology::detect_language(""), None);
    }

    #[test]
    fn test_functional_tags() {
        let morph = Morphology::new().unwrap();
        assert_eq!(morph.functional_tag("and"), Some("CONJ"));
        assert_eq!(morph.functional_tag("with"), Some("PREP"));
        assert_eq!(morph.functional_tag("wow"), Some("INTJ"));
        assert_eq!(morph.functional_tag("и"), Some("СОЮЗ"));
        assert_eq!(morph.functional_tag("на"), Some("ПРЕДЛ"));
        assert_eq!(morph.functional_tag("ах"), Some("МЕЖД"));
        assert_eq!(morph.functional_tag("cat"), None);
    }

    #[test]
    fn test_english_plurals() {
        let morph = Morphology::new().unwrap();
        assert_eq!(morph.normal_form("cats", Language::English), "cat");
        assert_eq!(morph.normal_form("cities", Language::English), "city");
        assert_eq!(morph.normal_form("boxes", Language::English), "box");
        assert_eq!(morph.normal_form("classes", Language::English), "class");
        assert_eq!(morph.normal_form("cat", Language::English), "cat");
    }

    #[test]
    fn test_english_short_words_untouched() {
        let morph = Morphology::new().unwrap();
        // "is"/"as" must not lose their final s
        assert_eq!(morph.normal_form("is", Language::English), "is");
        assert_eq!(morph.normal_form("gas", Language::English), "gas");
    }

    #[test]
    fn test_russian_inflections() {
        let morph = Morphology::new().unwrap();
        assert_eq!(morph.normal_form("леса", Language::Russian), "лес");
        assert_eq!(morph.normal_form("лесами", Language::Russian), "лес");
        assert_eq!(morph.normal_form("лес", Language::Russian), "лес");
    }

    #[test]
    fn test_russian_minimum_stem() {
        let morph = Morphology::new().unwrap();
        // Stripping would leave a two-letter stem, so the word is kept
        assert_eq!(morph.normal_form("два", Language::Russian), "два");
    }
}
