use regex::Regex;
use std::collections::HashSet;

use movierec_core::config::StopWords;
use movierec_core::error::{Error, Result};

use crate::stopwords;

/// Runs of two or more word characters.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Lowercases, splits on [`TOKEN_PATTERN`] and drops stop words.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl Tokenizer {
    pub fn new(stop_words: StopWords) -> Result<Self> {
        let pattern = Regex::new(TOKEN_PATTERN)
            .map_err(|e| Error::InvalidConfig(format!("token pattern: {e}")))?;
        let stop_words = match stop_words {
            StopWords::English => stopwords::english(),
            StopWords::None => HashSet::new(),
        };
        Ok(Self { pattern, stop_words })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(t))
            .map(str::to_string)
            .collect()
    }
}
