//! Raw catalog ingestion.
//!
//! Reads the TMDB-style CSV export, parses the `genres` / `keywords` columns
//! (JSON lists of `{id, name}` records) and produces one [`CatalogItem`] per
//! row in file order. A bad field never aborts the batch: it degrades to an
//! empty list and is counted in the [`IngestReport`].

use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{CatalogItem, FeatureDocument, NamedTag};

/// Columns of the raw export that the pipeline consumes. Other columns are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogRow {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub genres: Option<String>,
    pub keywords: Option<String>,
    pub vote_average: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub duplicate_ids: usize,
    pub malformed_fields: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
    pub report: IngestReport,
}

/// Strictly parse a structured-literal field into its records.
///
/// Accepts a JSON array of `{id, name}` objects or the same list written as a
/// Python literal (`[{'id': 28, 'name': 'Action'}]`). Blank input is an empty
/// list. Anything else is a [`Error::MalformedField`].
pub fn parse_named_tags(field: &str, raw: &str) -> Result<Vec<NamedTag>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let malformed = |reason: String| Error::MalformedField { field: field.to_string(), reason };
    match serde_json::from_str::<Vec<NamedTag>>(raw) {
        Ok(tags) => Ok(tags),
        Err(_) if raw.contains('\'') => {
            let json = python_literal_to_json(raw).ok_or_else(|| malformed("unterminated string literal".into()))?;
            serde_json::from_str::<Vec<NamedTag>>(&json).map_err(|e| malformed(e.to_string()))
        }
        Err(json_err) => Err(malformed(json_err.to_string())),
    }
}

/// Rewrite single-quoted string literals as JSON strings. Double-quoted
/// literals and everything outside strings pass through unchanged.
fn python_literal_to_json(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push('"');
                loop {
                    match chars.next()? {
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        '\\' => match chars.next()? {
                            '\'' => out.push('\''),
                            other => {
                                out.push('\\');
                                out.push(other);
                            }
                        },
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            '"' => {
                out.push('"');
                loop {
                    let d = chars.next()?;
                    out.push(d);
                    match d {
                        '"' => break,
                        '\\' => out.push(chars.next()?),
                        _ => {}
                    }
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// Names from a category-style field, de-duplicated in source order.
/// Malformed input yields an empty list.
pub fn parse_category_field(raw: &str) -> Vec<String> {
    parse_named_tags("categories", raw)
        .map(tag_names)
        .unwrap_or_default()
}

fn tag_names(tags: Vec<NamedTag>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Overview, then category names, then keyword names, space separated.
pub fn build_document(item: &CatalogItem) -> FeatureDocument {
    FeatureDocument::new(format!(
        "{} {} {}",
        item.overview,
        item.categories.join(" "),
        item.keywords.join(" ")
    ))
}

#[derive(Default)]
pub struct CatalogLoader {
    seen_ids: HashSet<i64>,
    report: IngestReport,
}

impl CatalogLoader {
    pub fn new() -> Self { Self::default() }

    pub fn load_csv(path: &Path) -> Result<Catalog> {
        let file = File::open(path).map_err(|e| Error::CatalogLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), "reading raw catalog");
        Self::new().read(file)
    }

    pub fn read<R: Read>(mut self, reader: R) -> Result<Catalog> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut items = Vec::new();
        for (line, row) in rdr.deserialize::<RawCatalogRow>().enumerate() {
            self.report.rows_read += 1;
            match row {
                Ok(row) => {
                    if let Some(item) = self.ingest_row(row) { items.push(item); }
                }
                Err(e) => {
                    // header is line 1
                    warn!(line = line + 2, error = %e, "skipping unreadable catalog row");
                    self.report.rows_skipped += 1;
                }
            }
        }
        info!(
            items = items.len(),
            skipped = self.report.rows_skipped,
            malformed_fields = self.report.malformed_fields,
            "catalog ingested"
        );
        Ok(Catalog { items, report: self.report })
    }

    /// Turn one raw row into an item. Returns `None` for a repeated id.
    pub fn ingest_row(&mut self, row: RawCatalogRow) -> Option<CatalogItem> {
        if !self.seen_ids.insert(row.id) {
            warn!(id = row.id, title = %row.title, "duplicate id, keeping first occurrence");
            self.report.duplicate_ids += 1;
            self.report.rows_skipped += 1;
            return None;
        }
        let categories = self.tag_field(row.id, "genres", row.genres.as_deref());
        let keywords = self.tag_field(row.id, "keywords", row.keywords.as_deref());
        Some(CatalogItem {
            id: row.id,
            title: row.title,
            overview: row.overview.unwrap_or_default(),
            categories,
            keywords,
            rating: row.vote_average.unwrap_or(0.0),
        })
    }

    fn tag_field(&mut self, id: i64, field: &str, raw: Option<&str>) -> Vec<String> {
        match parse_named_tags(field, raw.unwrap_or("")) {
            Ok(tags) => tag_names(tags),
            Err(e) => {
                warn!(id, error = %e, "malformed field treated as empty");
                self.report.malformed_fields += 1;
                Vec::new()
            }
        }
    }
}

/// Build the feature document of every item, in catalog order.
pub fn build_documents(items: &[CatalogItem]) -> Vec<FeatureDocument> {
    let docs: Vec<FeatureDocument> = items.iter().map(build_document).collect();
    debug!(blank = docs.iter().filter(|d| d.is_blank()).count(), "feature documents built");
    docs
}
