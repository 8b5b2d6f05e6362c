//! movierec-text
//!
//! Turns feature documents into a TF-IDF matrix. See `tokenize` for the token
//! rules and `vectorize` for vocabulary selection and weighting.
pub mod stopwords;
pub mod tokenize;
pub mod vectorize;

pub use tokenize::Tokenizer;
pub use vectorize::TfidfVectorizer;
