//! Telegram Bot API notifier.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use orderwatch_core::notify::{Delivery, NotificationSink, SubscriberId};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use crate::{Error, Result, command::Command, state::NotifierState};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse<T> {
  ok:          bool,
  #[serde(default)]
  description: Option<String>,
  result:      Option<T>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
  chat_id: SubscriberId,
  text:    &'a str,
}

#[derive(Debug, Deserialize)]
struct Update {
  update_id: i64,
  #[serde(default)]
  message:   Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
  #[serde(default)]
  text: Option<String>,
  chat: Chat,
  #[serde(default)]
  from: Option<User>,
}

#[derive(Debug, Deserialize)]
struct Chat {
  id: SubscriberId,
}

#[derive(Debug, Deserialize)]
struct User {
  #[serde(default)]
  username: Option<String>,
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Counters for one command-processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
  pub updates:  usize,
  pub commands: usize,
}

/// Broadcasts through a bot and processes its inbound commands.
///
/// Holds no subscriber state of its own: every operation loads the state
/// file first, and [`refresh`](Self::refresh) saves it afterwards.
#[derive(Clone)]
pub struct TelegramNotifier {
  client:     Client,
  api_base:   String,
  state_path: PathBuf,
}

impl TelegramNotifier {
  pub fn new(
    api_base: impl Into<String>,
    state_path: impl Into<PathBuf>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Unavailable(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      client,
      api_base: api_base.into(),
      state_path: state_path.into(),
    })
  }

  pub fn state_path(&self) -> &Path { &self.state_path }

  fn method_url(&self, token: &str, method: &str) -> String {
    format!("{}/bot{}/{}", self.api_base.trim_end_matches('/'), token, method)
  }

  async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body: ApiResponse<T> = resp
      .json()
      .await
      .map_err(|e| Error::Api(format!("undecodable response ({status}): {e}")))?;
    if !body.ok {
      return Err(Error::Api(
        body.description.unwrap_or_else(|| format!("request failed ({status})")),
      ));
    }
    body
      .result
      .ok_or_else(|| Error::Api("response without result".to_owned()))
  }

  async fn send_message(&self, token: &str, chat_id: SubscriberId, text: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.method_url(token, "sendMessage"))
      .json(&SendMessage { chat_id, text })
      .send()
      .await
      .map_err(|e| Error::Unavailable(e.to_string()))?;
    Self::decode::<serde_json::Value>(resp).await.map(|_| ())
  }

  async fn get_updates(&self, token: &str, offset: Option<i64>) -> Result<Vec<Update>> {
    let mut req = self.client.get(self.method_url(token, "getUpdates"));
    if let Some(offset) = offset {
      req = req.query(&[("offset", offset)]);
    }
    let resp = req
      .send()
      .await
      .map_err(|e| Error::Unavailable(e.to_string()))?;
    Self::decode(resp).await
  }

  /// One command-processing pass: fetch the updates after the saved cursor,
  /// apply subscribe/unsubscribe commands, reply to each, and save the state.
  pub async fn refresh(&self) -> Result<RefreshSummary> {
    let mut state = NotifierState::load(&self.state_path).await?;
    let updates = self
      .get_updates(&state.token, state.last_update_id.map(|id| id + 1))
      .await?;

    let mut summary = RefreshSummary { updates: updates.len(), commands: 0 };
    for update in updates {
      state.last_update_id = Some(update.update_id);
      let Some(message) = update.message else { continue };
      let Some(text) = message.text else { continue };

      let chat_id = message.chat.id;
      let username = message
        .from
        .and_then(|u| u.username)
        .unwrap_or_else(|| "<unknown>".to_owned());

      let reply = match Command::parse(&text) {
        Command::Subscribe => {
          let outcome = state.subscribe(chat_id);
          info!(%username, chat_id, ?outcome, "subscribe command");
          outcome.reply().to_owned()
        }
        Command::Unsubscribe => {
          let outcome = state.unsubscribe(chat_id);
          info!(%username, chat_id, ?outcome, "unsubscribe command");
          outcome.reply().to_owned()
        }
        Command::Unknown(command) => {
          info!(%username, chat_id, %command, "unknown command");
          format!("Unknown command: {command}")
        }
      };
      summary.commands += 1;

      if let Err(e) = self.send_message(&state.token, chat_id, &reply).await {
        warn!(chat_id, error = %e, "failed to reply to command");
      }
    }

    state.save(&self.state_path).await?;
    Ok(summary)
  }
}

impl NotificationSink for TelegramNotifier {
  type Error = Error;

  async fn notify_all(&self, text: &str) -> Result<Vec<Delivery>> {
    let state = NotifierState::load(&self.state_path).await?;

    let mut deliveries = Vec::with_capacity(state.chat_ids.len());
    for &chat_id in &state.chat_ids {
      let error = match self.send_message(&state.token, chat_id, text).await {
        Ok(()) => None,
        Err(e) => {
          warn!(chat_id, error = %e, "notification not delivered");
          Some(e.to_string())
        }
      };
      deliveries.push(Delivery { subscriber: chat_id, error });
    }

    if !deliveries.is_empty() && deliveries.iter().all(|d| !d.is_delivered()) {
      return Err(Error::NoDelivery { attempted: deliveries.len() });
    }
    Ok(deliveries)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  const TOKEN: &str = "123:abc";

  async fn notifier_with(
    server: &MockServer,
    state: NotifierState,
  ) -> (TelegramNotifier, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notifier.toml");
    state.save(&path).await.unwrap();
    let notifier = TelegramNotifier::new(server.uri(), path, Duration::from_secs(5)).unwrap();
    (notifier, dir)
  }

  fn state(chat_ids: Vec<SubscriberId>, last_update_id: Option<i64>) -> NotifierState {
    NotifierState { token: TOKEN.into(), chat_ids, last_update_id }
  }

  fn ok_message() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": { "message_id": 1 } }))
  }

  #[tokio::test]
  async fn notify_all_sends_one_message_per_subscriber() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path(format!("/bot{TOKEN}/sendMessage")))
      .respond_with(ok_message())
      .expect(2)
      .mount(&server)
      .await;

    let (notifier, _dir) = notifier_with(&server, state(vec![1, 2], None)).await;
    let deliveries = notifier.notify_all("Overdue order IDs: 5").await.unwrap();

    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(Delivery::is_delivered));
  }

  #[tokio::test]
  async fn partial_failure_is_reported_per_subscriber() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_json(json!({ "chat_id": 1, "text": "hi" })))
      .respond_with(ok_message())
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_json(json!({ "chat_id": 2, "text": "hi" })))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({
        "ok": false,
        "description": "Forbidden: bot was blocked by the user",
      })))
      .mount(&server)
      .await;

    let (notifier, _dir) = notifier_with(&server, state(vec![1, 2], None)).await;
    let deliveries = notifier.notify_all("hi").await.unwrap();

    assert!(deliveries[0].is_delivered());
    assert!(!deliveries[1].is_delivered());
    assert!(deliveries[1].error.as_deref().unwrap().contains("blocked"));
  }

  #[tokio::test]
  async fn total_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let (notifier, _dir) = notifier_with(&server, state(vec![1], None)).await;
    let err = notifier.notify_all("hi").await.unwrap_err();
    assert!(matches!(err, Error::NoDelivery { attempted: 1 }));
  }

  #[tokio::test]
  async fn no_subscribers_is_an_empty_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ok_message())
      .expect(0)
      .mount(&server)
      .await;

    let (notifier, _dir) = notifier_with(&server, state(Vec::new(), None)).await;
    assert!(notifier.notify_all("hi").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn refresh_applies_commands_and_advances_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(format!("/bot{TOKEN}/getUpdates")))
      .and(query_param("offset", "11"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "result": [
          { "update_id": 11, "message": {
              "text": "/subscribe", "chat": { "id": 100 }, "from": { "username": "ann" } } },
          { "update_id": 12, "message": {
              "text": "/unsubscribe", "chat": { "id": 200 }, "from": { "username": "bob" } } },
          { "update_id": 13, "edited_message": {} },
          { "update_id": 14, "message": {
              "text": "/status", "chat": { "id": 100 } } },
        ],
      })))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path(format!("/bot{TOKEN}/sendMessage")))
      .and(body_json(json!({ "chat_id": 100, "text": "Subscribed" })))
      .respond_with(ok_message())
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_json(json!({ "chat_id": 200, "text": "Unsubscribed" })))
      .respond_with(ok_message())
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_json(json!({ "chat_id": 100, "text": "Unknown command: /status" })))
      .respond_with(ok_message())
      .expect(1)
      .mount(&server)
      .await;

    let (notifier, _dir) = notifier_with(&server, state(vec![200], Some(10))).await;
    let summary = notifier.refresh().await.unwrap();
    assert_eq!(summary, RefreshSummary { updates: 4, commands: 3 });

    let saved = NotifierState::load(notifier.state_path()).await.unwrap();
    assert_eq!(saved.chat_ids, vec![100]);
    assert_eq!(saved.last_update_id, Some(14));
  }

  #[tokio::test]
  async fn failed_update_fetch_leaves_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({
        "ok": false,
        "description": "Unauthorized",
      })))
      .mount(&server)
      .await;

    let original = state(vec![1], Some(5));
    let (notifier, _dir) = notifier_with(&server, original.clone()).await;
    let err = notifier.refresh().await.unwrap_err();
    assert!(matches!(err, Error::Api(msg) if msg == "Unauthorized"));
    assert_eq!(NotifierState::load(notifier.state_path()).await.unwrap(), original);
  }
}
