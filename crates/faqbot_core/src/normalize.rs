use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{FaqbotError, Result};

pub const DEFAULT_CUSTOM_WORDS: &[&str] = &["wifi", "login", "portal", "chatbot", "faq", "admin"];

const BASE_DICTIONARY: &str = include_str!("../data/en_words.txt");
const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

/// Frequency-ranked spelling corrector searching up to two edits away.
#[derive(Debug, Clone, Default)]
pub struct SpellCorrector {
    frequencies: HashMap<String, u64>,
    longest_word: usize,
}

impl SpellCorrector {
    /// Base English dictionary plus `custom_words`, which are then always recognized.
    pub fn new<S: AsRef<str>>(custom_words: &[S]) -> Self {
        let mut corrector = Self::default();
        corrector.load_frequency_text(BASE_DICTIONARY);
        corrector.load_words(custom_words.iter().map(|w| w.as_ref()));
        corrector
    }

    /// Adds a `word count` per line dictionary file.
    pub fn load_dictionary_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .map_err(|err| FaqbotError::Config(format!("read {}: {err}", path.display())))?;
        self.load_frequency_text(&text);
        Ok(())
    }

    pub fn load_frequency_text(&mut self, text: &str) {
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let count = parts.next().and_then(|c| c.parse().ok()).unwrap_or(1);
            self.add(word, count);
        }
    }

    pub fn load_words<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        for word in words {
            self.add(word, 1);
        }
    }

    fn add(&mut self, word: &str, count: u64) {
        let word = word.to_lowercase();
        self.longest_word = self.longest_word.max(word.chars().count());
        *self.frequencies.entry(word).or_insert(0) += count;
    }

    pub fn known(&self, word: &str) -> bool {
        self.frequencies.contains_key(&word.to_lowercase())
    }

    /// Most likely spelling of `word`, lowercased. A known word wrapped in punctuation
    /// resolves to the bare word. `None` when no dictionary word is within two edits.
    pub fn correction(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if !self.should_check(&word) || self.frequencies.contains_key(&word) {
            return Some(word);
        }
        let bare = word.trim_matches(|c: char| c.is_ascii_punctuation());
        if !bare.is_empty() && self.frequencies.contains_key(bare) {
            return Some(bare.to_string());
        }
        if self.known_plural(&word) {
            return Some(word);
        }

        let edits = edits1(&word);
        let mut candidates = self.filter_known(edits.iter().cloned());
        if candidates.is_empty() {
            candidates = self.filter_known(edits.iter().flat_map(|e| edits1(e)));
        }

        candidates
            .into_iter()
            .max_by(|a, b| {
                self.frequency(a)
                    .cmp(&self.frequency(b))
                    .then_with(|| b.cmp(a))
            })
    }

    /// Corrects every whitespace-separated token and rejoins them with single spaces.
    pub fn correct(&self, text: &str) -> String {
        let corrected = text
            .split_whitespace()
            .map(|token| self.correction(token).unwrap_or_else(|| token.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        if corrected != text {
            debug!(original = text, corrected = %corrected, "spelling corrected");
        }
        corrected
    }

    /// Plural of a dictionary word (`keys`, `fees`, `libraries`); the dictionary lists
    /// most nouns in the singular only.
    fn known_plural(&self, word: &str) -> bool {
        if let Some(stem) = word.strip_suffix("ies") {
            if stem.len() > 1 && self.frequencies.contains_key(&format!("{stem}y")) {
                return true;
            }
        }
        if let Some(stem) = word.strip_suffix("es") {
            if stem.len() > 2 && self.frequencies.contains_key(stem) {
                return true;
            }
        }
        match word.strip_suffix('s') {
            Some(stem) if stem.len() > 2 && !stem.ends_with('s') => {
                self.frequencies.contains_key(stem)
            }
            _ => false,
        }
    }

    fn frequency(&self, word: &str) -> u64 {
        self.frequencies.get(word).copied().unwrap_or(0)
    }

    fn filter_known(&self, words: impl Iterator<Item = String>) -> BTreeSet<String> {
        words
            .filter(|w| self.frequencies.contains_key(w))
            .collect()
    }

    fn should_check(&self, word: &str) -> bool {
        let len = word.chars().count();
        if len == 1 && word.chars().all(|c| c.is_ascii_punctuation()) {
            return false;
        }
        if len > self.longest_word + 3 {
            return false;
        }
        word.parse::<f64>().is_err()
    }
}

fn edits1(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::with_capacity(chars.len() * 54 + 26);

    for i in 0..=chars.len() {
        let (left, right) = chars.split_at(i);
        if !right.is_empty() {
            out.push(left.iter().chain(&right[1..]).collect());
        }
        if right.len() > 1 {
            let mut swapped: Vec<char> = chars.clone();
            swapped.swap(i, i + 1);
            out.push(swapped.into_iter().collect());
        }
        for c in LETTERS.chars() {
            if !right.is_empty() {
                out.push(
                    left.iter()
                        .copied()
                        .chain(std::iter::once(c))
                        .chain(right[1..].iter().copied())
                        .collect(),
                );
            }
            out.push(
                left.iter()
                    .copied()
                    .chain(std::iter::once(c))
                    .chain(right.iter().copied())
                    .collect(),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> SpellCorrector {
        SpellCorrector::new(DEFAULT_CUSTOM_WORDS)
    }

    #[test]
    fn fixes_single_typo() {
        let c = corrector();
        assert_eq!(c.correction("librery").as_deref(), Some("library"));
        assert_eq!(c.correct("where is the librery"), "where is the library");
        assert_eq!(c.correct("scholarshp exmas"), "scholarship exams");
    }

    #[test]
    fn keeps_domain_terms() {
        let c = corrector();
        for term in DEFAULT_CUSTOM_WORDS {
            assert_eq!(c.correction(term).as_deref(), Some(*term));
        }
        assert_eq!(c.correct("wifi login portal"), "wifi login portal");
    }

    #[test]
    fn strips_trailing_punctuation_through_edits() {
        let c = corrector();
        assert_eq!(c.correction("Hello!").as_deref(), Some("hello"));
        assert_eq!(c.correction("start?").as_deref(), Some("start"));
        assert_eq!(c.correction("Hi!").as_deref(), Some("hi"));
        assert_eq!(c.correct("Is there free Wi-Fi?"), "is there free wifi");
    }

    #[test]
    fn unknown_token_without_candidates_is_kept() {
        let c = corrector();
        assert_eq!(c.correction("zzzzqqqxx"), None);
        assert_eq!(c.correct("ZZZZQQQXX"), "ZZZZQQQXX");
    }

    #[test]
    fn numbers_and_punctuation_are_not_checked() {
        let c = corrector();
        assert_eq!(c.correction("2024").as_deref(), Some("2024"));
        assert_eq!(c.correction("?").as_deref(), Some("?"));
    }

    #[test]
    fn collapses_whitespace() {
        let c = corrector();
        assert_eq!(c.correct("  where\tis \n the   library  "), "where is the library");
        assert_eq!(c.correct("   "), "");
    }

    #[test]
    fn extra_dictionary_extends_vocabulary() {
        let mut c = corrector();
        assert!(!c.known("moodle"));
        c.load_frequency_text("moodle 50\n\n");
        assert!(c.known("moodle"));
        assert_eq!(c.correction("mooodle").as_deref(), Some("moodle"));
    }

    #[test]
    fn correctly_spelled_everyday_words_pass_through() {
        let c = corrector();
        for phrase in [
            "can i get a refund",
            "where can i print my essay",
            "lost my keys",
            "covid vaccine",
            "where is the chapel",
            "dining menu today",
            "is there halal food in the cafeteria",
            "i need to reschedule my midterm",
            "where do i pay my tuition",
            "can i borrow a stapler and an eraser",
        ] {
            assert_eq!(c.correct(phrase), phrase);
        }
    }

    #[test]
    fn plurals_of_known_words_are_kept() {
        let c = corrector();
        assert_eq!(c.correction("staplers").as_deref(), Some("staplers"));
        assert_eq!(c.correction("libraries").as_deref(), Some("libraries"));
        assert_eq!(c.correction("buses").as_deref(), Some("buses"));
        assert_eq!(c.correct("tution fees"), "tuition fees");
    }
}
