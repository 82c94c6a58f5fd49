//! Text normalization shared by the index write path and the query path.
//!
//! Two steps: transliterate to ASCII (strips diacritics, so "Kỹ năng" and
//! "Ky nang" embed identically), then rewrite known misspelled terms word by
//! word. Everything that is not a recognized term is copied through
//! untouched, separators and casing included.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use cvscout_core::config::{default_corrections, NormalizerConfig};
use cvscout_core::error::CvScoutError;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("Invalid word regex"));

/// Internal normalizer failures. Never returned from [`TextNormalizer::normalize`].
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("transliteration dropped all content from a {0}-byte input")]
    EmptyTransliteration(usize),
}

/// Deterministic, idempotent text canonicalizer.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Lowercase misspelling -> canonical spelling.
    corrections: HashMap<String, String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            corrections: default_corrections()
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }
}

impl TextNormalizer {
    /// Build a normalizer from a misspelling -> canonical map.
    ///
    /// Keys must be single words. A canonical value may not contain a word
    /// that would itself be rewritten to something different, otherwise a
    /// second pass would change the output.
    pub fn new(corrections: &BTreeMap<String, String>) -> Result<Self, CvScoutError> {
        let mut table = HashMap::with_capacity(corrections.len());

        for (raw_key, raw_canonical) in corrections {
            let key = deunicode::deunicode(raw_key.trim()).to_ascii_lowercase();
            if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(CvScoutError::Config(format!(
                    "correction key '{}' must be a single word",
                    raw_key
                )));
            }
            let canonical = deunicode::deunicode(raw_canonical.trim());
            if canonical.is_empty() {
                return Err(CvScoutError::Config(format!(
                    "correction for '{}' has an empty canonical value",
                    raw_key
                )));
            }
            table.insert(key, canonical);
        }

        for (key, canonical) in &table {
            for word in WORD_RE.find_iter(canonical) {
                let word = word.as_str();
                if let Some(target) = table.get(&word.to_ascii_lowercase()) {
                    if target != word {
                        return Err(CvScoutError::Config(format!(
                            "correction '{}' -> '{}' is not stable: '{}' would be rewritten to '{}'",
                            key, canonical, word, target
                        )));
                    }
                }
            }
        }

        Ok(Self { corrections: table })
    }

    /// Build a normalizer from the `[normalizer]` config section.
    pub fn from_config(config: &NormalizerConfig) -> Result<Self, CvScoutError> {
        Self::new(&config.corrections)
    }

    /// Normalize `text`, falling back to the input unchanged on failure.
    pub fn normalize(&self, text: &str) -> String {
        match self.try_normalize(text) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(error = %e, "Text normalization failed, using original input");
                text.to_string()
            }
        }
    }

    /// Normalize `text`, reporting internal failures.
    pub fn try_normalize(&self, text: &str) -> Result<String, NormalizeError> {
        let ascii = deunicode::deunicode_with_tofu(text, "");
        if ascii.trim().is_empty() && !text.trim().is_empty() {
            return Err(NormalizeError::EmptyTransliteration(text.len()));
        }
        Ok(self.correct_words(&ascii))
    }

    fn correct_words(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for word in WORD_RE.find_iter(text) {
            out.push_str(&text[last..word.start()]);
            match self.corrections.get(&word.as_str().to_ascii_lowercase()) {
                Some(canonical) => {
                    debug!(from = word.as_str(), to = %canonical, "Corrected term");
                    out.push_str(canonical);
                }
                None => out.push_str(word.as_str()),
            }
            last = word.end();
        }
        out.push_str(&text[last..]);

        out
    }

    /// Number of entries in the correction table.
    pub fn corrections_len(&self) -> usize {
        self.corrections.len()
    }

    /// Digest of the correction table, independent of insertion order.
    ///
    /// Text indexed under one table has to be re-embedded when it changes.
    pub fn fingerprint(&self) -> String {
        let sorted: BTreeMap<&str, &str> = self
            .corrections
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut hasher = DefaultHasher::new();
        sorted.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}
