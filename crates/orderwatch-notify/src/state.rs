//! Persisted notifier configuration: bot token, subscribers, and the id of
//! the last processed update.

use std::path::{Path, PathBuf};

use orderwatch_core::notify::{SubscribeOutcome, SubscriberId, UnsubscribeOutcome};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierState {
  pub token:          String,
  #[serde(default)]
  pub chat_ids:       Vec<SubscriberId>,
  /// `None` until the first update has been processed.
  #[serde(default)]
  pub last_update_id: Option<i64>,
}

impl NotifierState {
  pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let read_err = |reason: String| Error::StateRead { path: path.to_path_buf(), reason };

    let text = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| read_err(e.to_string()))?;
    toml::from_str(&text).map_err(|e| read_err(e.to_string()))
  }

  /// Write the state next to `path` and rename it into place, so a reader in
  /// another process never sees a half-written file.
  pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let write_err = |reason: String| Error::StateWrite { path: path.to_path_buf(), reason };

    let text = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, text)
      .await
      .map_err(|e| write_err(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
      .await
      .map_err(|e| write_err(e.to_string()))
  }

  pub fn is_subscribed(&self, id: SubscriberId) -> bool { self.chat_ids.contains(&id) }

  pub fn subscribe(&mut self, id: SubscriberId) -> SubscribeOutcome {
    if self.is_subscribed(id) {
      SubscribeOutcome::AlreadySubscribed
    } else {
      self.chat_ids.push(id);
      SubscribeOutcome::Subscribed
    }
  }

  pub fn unsubscribe(&mut self, id: SubscriberId) -> UnsubscribeOutcome {
    if self.is_subscribed(id) {
      self.chat_ids.retain(|c| *c != id);
      UnsubscribeOutcome::Unsubscribed
    } else {
      UnsubscribeOutcome::NotSubscribed
    }
  }
}

fn temp_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().unwrap_or_default().to_os_string();
  name.push(".tmp");
  path.with_file_name(name)
}
