use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ImportError;
use crate::field::{CUSTOM_PREFIX, Target, TargetField};

/// Spreadsheet header text to target field name, e.g.
/// `{"Codice": "partNumber", "Colore": "cf:color"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, String>);

/// A mapping entry bound to a column position of a concrete sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub index: usize,
    pub header: String,
    pub target: Target,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, target: impl Into<String>) {
        self.0.insert(header.into(), target.into());
    }

    pub fn with(mut self, header: impl Into<String>, target: impl Into<String>) -> Self {
        self.insert(header, target);
        self
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.0.get(header).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Guess a mapping from header text alone.
    ///
    /// Headers are compared case-insensitively, without a trailing `*`,
    /// against field labels, their legacy Italian variants and field names.
    /// `CF: <name>` headers become custom fields. Unknown headers are left
    /// unmapped.
    pub fn auto(headers: &[String]) -> Self {
        let mut mapping = Self::new();
        for header in headers {
            match guess_target(header) {
                Some(target) => mapping.insert(header.clone(), target.to_string()),
                None => log::debug!("No field matches column '{header}', ignoring it"),
            }
        }
        mapping
    }

    /// Check every target and bind the mapping to `headers`.
    ///
    /// Fails when a target is unknown or when one of the required fields is
    /// not among the mapped targets. Mapped headers absent from the sheet are
    /// skipped.
    pub fn resolve(&self, headers: &[String]) -> Result<Vec<MappedColumn>, ImportError> {
        let mut targets = Vec::with_capacity(self.0.len());
        for (header, target) in &self.0 {
            let target: Target = target
                .parse()
                .map_err(|e| ImportError::InvalidMapping(format!("column '{header}': {e}")))?;
            targets.push((header.as_str(), target));
        }

        let missing = TargetField::REQUIRED
            .iter()
            .filter(|f| !targets.iter().any(|(_, t)| *t == Target::Field(**f)))
            .map(|f| f.name())
            .join(", ");
        if !missing.is_empty() {
            return Err(ImportError::InvalidMapping(format!(
                "required fields are not mapped: {missing}"
            )));
        }

        let mut columns = Vec::with_capacity(targets.len());
        for (header, target) in targets {
            let index = headers
                .iter()
                .position(|h| h == header)
                .or_else(|| headers.iter().position(|h| same_header(h, header)));
            match index {
                Some(index) => columns.push(MappedColumn {
                    index,
                    header: header.to_string(),
                    target,
                }),
                None => log::warn!("Mapped column '{header}' is not in the sheet"),
            }
        }
        columns.sort_by_key(|c| c.index);
        Ok(columns)
    }
}

impl FromIterator<(String, String)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn normalize(header: &str) -> String {
    header.trim().trim_end_matches('*').trim().to_lowercase()
}

fn same_header(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn guess_target(header: &str) -> Option<Target> {
    let trimmed = header.trim();
    if let Some(prefix) = trimmed.get(..CUSTOM_PREFIX.len())
        && prefix.eq_ignore_ascii_case(CUSTOM_PREFIX)
    {
        let name = trimmed[CUSTOM_PREFIX.len()..].trim_end_matches('*').trim();
        return (!name.is_empty()).then(|| Target::Custom(name.to_string()));
    }
    let key = normalize(header);
    if key.is_empty() {
        return None;
    }
    TargetField::ALL
        .into_iter()
        .find(|f| {
            f.label().to_lowercase() == key
                || f.name().to_lowercase() == key
                || f.legacy_labels().iter().any(|l| l.to_lowercase() == key)
        })
        .map(Target::Field)
}
