//! Documents, labels and JSON Lines corpus loading

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Raw document as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    #[serde(default, deserialize_with = "nullable_text")]
    pub text: String,
}

impl Document {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Missing or null text degrades to an empty document
fn nullable_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Binary ground-truth label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "LabelRepr")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    /// Class index used by numeric classifiers
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }
}

impl From<bool> for Label {
    fn from(positive: bool) -> Self {
        if positive {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Flag(bool),
    Class(u64),
    Name(String),
}

impl TryFrom<LabelRepr> for Label {
    type Error = String;

    fn try_from(repr: LabelRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            LabelRepr::Flag(flag) => Ok(Label::from(flag)),
            LabelRepr::Class(0) => Ok(Label::Negative),
            LabelRepr::Class(1) => Ok(Label::Positive),
            LabelRepr::Class(other) => Err(format!("label class must be 0 or 1, got {other}")),
            LabelRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "negative" | "neg" => Ok(Label::Negative),
                "positive" | "pos" => Ok(Label::Positive),
                _ => Err(format!("unknown label {name:?}")),
            },
        }
    }
}

/// A document paired with its label, so the two can never drift apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDocument {
    pub document: Document,
    pub label: Label,
}

impl LabeledDocument {
    pub fn new(id: u64, text: impl Into<String>, label: Label) -> Self {
        Self {
            document: Document::new(id, text),
            label,
        }
    }
}

impl AsRef<str> for LabeledDocument {
    fn as_ref(&self) -> &str {
        &self.document.text
    }
}

/// One JSON Lines record: `{"id": 7, "text": "...", "label": "positive"}`
#[derive(Deserialize)]
struct Record {
    id: u64,
    #[serde(default, deserialize_with = "nullable_text")]
    text: String,
    label: Label,
}

/// Ordered collection of labeled documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    records: Vec<LabeledDocument>,
}

impl Corpus {
    pub fn new(records: Vec<LabeledDocument>) -> Self {
        Self { records }
    }

    /// Read a JSON Lines corpus. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(&line)
                .map_err(|source| Error::MalformedRecord { line: i + 1, source })?;
            records.push(LabeledDocument::new(record.id, record.text, record.label));
        }
        debug!(num_docs = records.len(), "Corpus loaded");
        Ok(Self { records })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn records(&self) -> &[LabeledDocument] {
        &self.records
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.records.iter().map(|r| &r.document)
    }

    pub fn labels(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.label).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<LabeledDocument>> for Corpus {
    fn from(records: Vec<LabeledDocument>) -> Self {
        Self::new(records)
    }
}
