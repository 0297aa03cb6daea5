//! Notification sink and subscription types.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A chat (or user) that can receive notifications.
pub type SubscriberId = i64;

/// Result of a subscribe command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
  Subscribed,
  AlreadySubscribed,
}

impl SubscribeOutcome {
  /// Reply text shown to the subscriber.
  pub fn reply(&self) -> &'static str {
    match self {
      Self::Subscribed => "Subscribed",
      Self::AlreadySubscribed => "Already subscribed",
    }
  }
}

/// Result of an unsubscribe command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeOutcome {
  Unsubscribed,
  NotSubscribed,
}

impl UnsubscribeOutcome {
  pub fn reply(&self) -> &'static str {
    match self {
      Self::Unsubscribed => "Unsubscribed",
      Self::NotSubscribed => "Not subscribed",
    }
  }
}

/// Delivery result for one recipient of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
  pub subscriber: SubscriberId,
  /// `None` when the message was accepted.
  pub error:      Option<String>,
}

impl Delivery {
  pub fn is_delivered(&self) -> bool { self.error.is_none() }
}

/// Broadcasts a message to every current subscriber.
pub trait NotificationSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Send `text` to all subscribers. An `Err` means the message did not
  /// reach anyone; partial failures are reported per [`Delivery`].
  fn notify_all<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<Delivery>, Self::Error>> + Send + 'a;
}
