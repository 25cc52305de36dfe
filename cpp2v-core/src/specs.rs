//! Structured annotations pulled out of declaration comments.
//!
//! An annotation is a comment line starting with `@key`, optionally
//! followed by a value:
//!
//! ```text
//! /**
//!  * @export
//!  * @requires n >= 0
//!  */
//! ```
//!
//! The collected data lives in a side table keyed by `DeclId`; the AST
//! itself is never touched.

use std::collections::HashMap;

use tracing::trace;

use crate::ast::{DeclId, TranslationUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub key: String,
    pub value: Option<String>,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value: value.map(str::to_string),
        }
    }
}

/// Annotations per declaration for one run.
#[derive(Debug, Default)]
pub struct SpecTable {
    records: HashMap<DeclId, Vec<Annotation>>,
}

impl SpecTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to whatever `decl` already has.
    pub fn record(&mut self, decl: DeclId, annotations: impl IntoIterator<Item = Annotation>) {
        self.records.entry(decl).or_default().extend(annotations);
    }

    pub fn replace(&mut self, decl: DeclId, annotations: impl IntoIterator<Item = Annotation>) {
        self.records.insert(decl, annotations.into_iter().collect());
    }

    /// Empty when nothing was recorded for `decl`.
    pub fn lookup(&self, decl: DeclId) -> &[Annotation] {
        self.records.get(&decl).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, decl: DeclId, key: &str) -> bool {
        self.lookup(decl).iter().any(|annotation| annotation.key == key)
    }

    /// Value of the first annotation named `key`.
    pub fn get(&self, decl: DeclId, key: &str) -> Option<&str> {
        self.lookup(decl)
            .iter()
            .find(|annotation| annotation.key == key)
            .and_then(|annotation| annotation.value.as_deref())
    }

    /// Number of declarations with at least one annotation.
    pub fn len(&self) -> usize {
        self.records.values().filter(|record| !record.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct SpecCollector;

impl SpecCollector {
    pub fn new() -> Self {
        SpecCollector
    }

    /// Scan every declaration comment of `unit` into `specs`.
    pub fn collect_unit(&self, unit: &TranslationUnit, specs: &mut SpecTable) {
        for decl in &unit.decls {
            if let Some(comment) = &decl.comment {
                let annotations = parse_annotations(comment);
                if !annotations.is_empty() {
                    trace!(decl = %decl.id, count = annotations.len(), "collected annotations");
                    specs.record(decl.id, annotations);
                }
            }
        }
    }
}

/// Extract every `@key value` line from raw comment text.
pub fn parse_annotations(comment: &str) -> Vec<Annotation> {
    comment
        .lines()
        .filter_map(|line| parse_line(strip_comment_markers(line)))
        .collect()
}

fn strip_comment_markers(line: &str) -> &str {
    let mut line = line.trim();
    for opener in ["///", "//!", "//", "/**", "/*!", "/*"] {
        if let Some(rest) = line.strip_prefix(opener) {
            line = rest;
            break;
        }
    }
    if let Some(rest) = line.strip_suffix("*/") {
        line = rest;
    }
    let line = line.trim();
    line.strip_prefix('*').unwrap_or(line).trim()
}

fn parse_line(line: &str) -> Option<Annotation> {
    let rest = line.strip_prefix('@')?;
    let key_len = rest
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'))
        .unwrap_or(rest.len());
    if key_len == 0 {
        return None;
    }
    let (key, value) = rest.split_at(key_len);
    if !value.is_empty() && !value.starts_with(char::is_whitespace) {
        return None;
    }
    let value = value.trim();
    Some(Annotation::new(
        key,
        (!value.is_empty()).then_some(value),
    ))
}
