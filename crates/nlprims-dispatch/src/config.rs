use serde::{Deserialize, Serialize};

/// Reply correlation for a [`crate::Dispatcher`].
///
/// Zero in either field accepts any value on that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Sequence number every reply must carry.
    pub seq: u32,
    /// Port id every reply must carry.
    pub port_id: u32,
}
