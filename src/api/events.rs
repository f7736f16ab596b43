use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::models::{ExtensionStatus, QueueWallboard};

/// Snapshots pushed from pollers to the page that owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum StatusEvent {
    ExtensionStatuses(HashMap<String, ExtensionStatus>),
    Wallboard { queue: String, stats: QueueWallboard },
    /// A poll failed; the message is shown in the page banner.
    PollFailed { source: String, message: String },
}

impl StatusEvent {
    pub fn statuses(pairs: Vec<(String, ExtensionStatus)>) -> Self {
        Self::ExtensionStatuses(pairs.into_iter().collect())
    }

    pub fn failed(source: &str, err: &crate::error::ConsoleError) -> Self {
        Self::PollFailed { source: source.to_string(), message: err.to_string() }
    }
}
