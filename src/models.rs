//! Core data models for the intake wizard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Answers =================
//

/// A single stored answer. Numeric questions always store `Number`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Numeric view of the answer. Text is accepted when it reads as an
    /// amount (`$1,200`, ` 40 `); anything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(n) if n.is_finite() => Some(*n),
            AnswerValue::Number(_) => None,
            AnswerValue::Text(s) => parse_amount(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s.as_str()),
            AnswerValue::Number(_) => None,
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            AnswerValue::Number(n) => write!(f, "{}", n),
            AnswerValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a user-typed amount, tolerating `$`, `,` and a trailing `%`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Question id → answer. Additive for the life of a session.
///
/// Backed by a `BTreeMap` so iteration (and therefore hashing and document
/// assembly) is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, AnswerValue>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: AnswerValue) {
        self.0.insert(id.into(), value);
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Numeric answer, or `None` when absent or non-numeric.
    pub fn number(&self, id: &str) -> Option<f64> {
        self.0.get(id).and_then(AnswerValue::as_number)
    }

    /// Text answer, or `None` when absent or numeric.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.0.get(id).and_then(AnswerValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, AnswerValue)> for Answers {
    fn from_iter<I: IntoIterator<Item = (K, AnswerValue)>>(iter: I) -> Self {
        let mut answers = Answers::new();
        for (k, v) in iter {
            answers.insert(k, v);
        }
        answers
    }
}

//
// ================= Submission =================
//

/// Persisted record of one intake session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub answers: Answers,
    pub summary_text: Option<String>,
    /// SHA-256 of the last written snapshot
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPatch {
    pub answers: Option<Answers>,
    pub summary: Option<String>,
}
