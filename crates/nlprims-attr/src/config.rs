use serde::{Deserialize, Serialize};

use crate::validator::AttrDataType;

/// What the [`crate::Parser`] does with a type id above `max_type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Skip the attribute and keep parsing.
    #[default]
    Skip,
    /// Fail with [`crate::AttrError::Unsupported`].
    Abort,
}

/// Controls attribute stream parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Highest type id the caller understands. `None` accepts every type.
    pub max_type: Option<u16>,
    /// Handling of types above `max_type`.
    pub unsupported: UnsupportedPolicy,
    /// When true, bytes left after the last complete attribute fail the parse.
    pub reject_trailing: bool,
    /// Per-type validation, indexed by type id.
    pub policy: Vec<Option<AttrDataType>>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_type: None,
            unsupported: UnsupportedPolicy::Skip,
            reject_trailing: false,
            policy: Vec::new(),
        }
    }
}
