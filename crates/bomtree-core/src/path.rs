use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::BomNode;

/// Dotted sibling-ordinal path (`1.2.10`).
///
/// Segments compare numerically, so `1.2` < `1.10` and a parent always
/// sorts directly before its descendants. Sorting a flat list by path
/// therefore yields tree pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterializedPath(Vec<u32>);

impl MaterializedPath {
    pub fn root(ordinal: u32) -> Self {
        Self(vec![ordinal])
    }

    pub fn child(&self, ordinal: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(ordinal);
        Self(segments)
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    pub fn last_ordinal(&self) -> Option<u32> {
        self.0.last().copied()
    }

    /// Depth implied by the path; a root path has depth 0.
    pub fn depth(&self) -> u32 {
        self.0.len().saturating_sub(1) as u32
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid materialized path '{0}'")]
pub struct PathParseError(String);

impl FromStr for MaterializedPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('.')
            .map(|seg| match seg.parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(PathParseError(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

impl Serialize for MaterializedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MaterializedPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Position handed out to a node at creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub level: u32,
    pub path: MaterializedPath,
    pub ordinal: u32,
}

/// Next free sibling ordinal.
///
/// `high_water` is the largest ordinal ever handed out under the parent,
/// so ordinals of deleted siblings are never reused.
pub fn next_ordinal(existing: impl IntoIterator<Item = u32>, high_water: u32) -> u32 {
    let max_existing = existing.into_iter().max().unwrap_or(0);
    max_existing.max(high_water).saturating_add(1)
}

/// Compute level and path for a node created under `parent` (or as a root).
///
/// Must run in the same transaction as the insert that uses it.
pub fn allocate(parent: Option<&BomNode>, ordinal: u32) -> Allocation {
    match parent {
        Some(parent) => Allocation {
            level: parent.level + 1,
            path: parent.path.child(ordinal),
            ordinal,
        },
        None => Allocation {
            level: 0,
            path: MaterializedPath::root(ordinal),
            ordinal,
        },
    }
}
