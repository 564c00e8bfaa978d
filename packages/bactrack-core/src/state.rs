//! Bridge configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a bridge instance.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Accept `connectToNearestBreathalyzer` as an alias of
    /// `connectToNearestDevice`. Existing host apps send the old name.
    pub legacy_command_names: bool,

    /// Mirror every emitted event to the tracing log at debug level.
    pub log_events: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            legacy_command_names: true,
            log_events: false,
        }
    }
}
