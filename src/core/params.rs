//! Parameter sets and the shared pattern extractors operations build on.
//!
//! Extraction always runs on the original-case task text so literals such as email
//! local-parts and filenames survive intact.

use crate::core::error::TaskError;
use crate::core::sandbox::{PathViolation, Sandbox, SandboxPath};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ExtractionError {
    pub reason: String,
}

impl ExtractionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Text(String),
    /// Path-shaped: validated by the sandbox guard before the handler runs.
    Path(String),
    Integer(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), ParamValue::Text(value.into()));
        self
    }

    pub fn with_path(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), ParamValue::Path(value.into()));
        self
    }

    pub fn with_integer(mut self, name: &str, value: i64) -> Self {
        self.values.insert(name.to_string(), ParamValue::Integer(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(s)) | Some(ParamValue::Path(s)) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Run every path-shaped value through the sandbox guard.
    pub fn resolve(&self, sandbox: &Sandbox) -> Result<ResolvedParams, PathViolation> {
        let mut values = BTreeMap::new();
        for (name, value) in &self.values {
            let resolved = match value {
                ParamValue::Text(s) => ResolvedValue::Text(s.clone()),
                ParamValue::Integer(i) => ResolvedValue::Integer(*i),
                ParamValue::Path(raw) => ResolvedValue::Path(sandbox.resolve(raw)?),
            };
            values.insert(name.clone(), resolved);
        }
        Ok(ResolvedParams { values })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    Text(String),
    Path(SandboxPath),
    Integer(i64),
}

/// Parameters after sandbox validation; the only form handlers receive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedParams {
    values: BTreeMap<String, ResolvedValue>,
}

impl ResolvedParams {
    pub fn text(&self, name: &str) -> Result<&str, TaskError> {
        match self.values.get(name) {
            Some(ResolvedValue::Text(s)) => Ok(s),
            _ => Err(missing(name, "text")),
        }
    }

    pub fn path(&self, name: &str) -> Result<&SandboxPath, TaskError> {
        match self.values.get(name) {
            Some(ResolvedValue::Path(p)) => Ok(p),
            _ => Err(missing(name, "path")),
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ResolvedValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn missing(name: &str, kind: &str) -> TaskError {
    TaskError::ValidationError(format!("missing {} parameter '{}'", kind, name))
}

static BACKTICK_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\s]+@[^`\s]+)`").expect("static regex"));
static BACKTICKED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("static regex"));
static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("static regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s`'"<>()\[\]]+"#).expect("static regex"));
static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s`'"(])((?:\.?/)?[\w\-./]*[\w\-]\.([A-Za-z0-9]+))\b"#).expect("static regex")
});
static TARGET_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:to|into|as)\s+[`'"]?((?:\.?/)?[\w\-./]*[\w\-]\.[A-Za-z0-9]+)\b"#)
        .expect("static regex")
});

/// First backticked token containing `@`.
pub fn backticked_email(text: &str) -> Option<&str> {
    BACKTICK_EMAIL
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Backticked and double-quoted strings, in order of appearance.
pub fn quoted_strings(text: &str) -> Vec<&str> {
    let mut found: Vec<(usize, &str)> = BACKTICKED
        .captures_iter(text)
        .chain(DOUBLE_QUOTED.captures_iter(text))
        .filter_map(|c| c.get(1))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, s)| s).collect()
}

pub fn first_url(text: &str) -> Option<&str> {
    URL.find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
}

/// Filename-like tokens whose extension is one of `extensions` (case-insensitive).
/// Tokens that are part of a URL are skipped.
pub fn file_tokens<'t>(text: &'t str, extensions: &[&str]) -> Vec<&'t str> {
    FILE_TOKEN
        .captures_iter(text)
        .filter(|c| {
            c.get(2)
                .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext.as_str())))
                .unwrap_or(false)
        })
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

pub fn first_file_token<'t>(text: &'t str, extensions: &[&str]) -> Option<&'t str> {
    file_tokens(text, extensions).into_iter().next()
}

/// Filename following `to`, `into` or `as` (e.g. "save it to out.json").
pub fn target_file(text: &str) -> Option<&str> {
    TARGET_TOKEN
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|s| !s.contains("://"))
}
