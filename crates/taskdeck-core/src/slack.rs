//! Contracts for the static Slack workspace export (`slack.json`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelEntry {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelGroups {
    #[serde(default)]
    pub private: Vec<ChannelEntry>,
    #[serde(default)]
    pub public: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackExport {
    #[serde(default)]
    pub channels: ChannelGroups,
    #[serde(default)]
    pub dms: Vec<ChannelEntry>,
}

impl SlackExport {
    pub fn channel_count(&self) -> usize {
        self.channels.private.len() + self.channels.public.len()
    }

    /// The DM used for reminders: first entry whose name contains "self",
    /// case-insensitively.
    pub fn find_self_dm(&self) -> Option<&ChannelEntry> {
        self.dms
            .iter()
            .find(|dm| dm.name.to_lowercase().contains("self"))
    }
}
