//! Monitor configuration.
//!
//! Read from a TOML file, then overridden by `ORDERWATCH_*` environment
//! variables. Nested keys use a double underscore, so
//! `ORDERWATCH_SHEET__ID` sets `sheet.id`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use orderwatch_core::path::expand_tilde;
use orderwatch_feeds::{
  credentials::{AuthorizedUser, Credentials},
  rates::{CBR_DAILY_URL, USD},
  sheets::{DEFAULT_RANGE, SHEETS_API_BASE},
};
use orderwatch_notify::telegram::TELEGRAM_API_BASE;
use serde::Deserialize;

use crate::sync::SyncSettings;

pub const ENV_PREFIX: &str = "ORDERWATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Seconds between the starts of consecutive sync cycles.
  #[serde(default = "default_interval_secs")]
  pub interval_secs:     u64,
  /// Upper bound on every outbound HTTP request.
  #[serde(default = "default_http_timeout_secs")]
  pub http_timeout_secs: u64,
  #[serde(default)]
  pub rates:             RatesConfig,
  pub sheet:             SheetConfig,
  /// Overdue notifications are off when this section is absent.
  #[serde(default)]
  pub telegram:          Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
  #[serde(default = "default_rates_url")]
  pub url:      String,
  /// Feed identifier (`R01235`) or letter code (`USD`) of the currency.
  #[serde(default = "default_currency")]
  pub currency: String,
}

impl Default for RatesConfig {
  fn default() -> Self { Self { url: default_rates_url(), currency: default_currency() } }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
  /// Spreadsheet document id.
  pub id:                   String,
  #[serde(default = "default_range")]
  pub range:                String,
  #[serde(default = "default_sheets_api_base")]
  pub api_base:             String,
  #[serde(default)]
  pub api_key:              Option<String>,
  /// OAuth `authorized_user` JSON file; preferred over `api_key` when both
  /// are set.
  #[serde(default)]
  pub authorized_user_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
  /// Notifier state file shared with the command processor.
  pub state_path: PathBuf,
  #[serde(default = "default_telegram_api_base")]
  pub api_base:   String,
}

fn default_store_path() -> PathBuf { PathBuf::from("orderwatch.db") }
fn default_interval_secs() -> u64 { 600 }
fn default_http_timeout_secs() -> u64 { 30 }
fn default_rates_url() -> String { CBR_DAILY_URL.to_owned() }
fn default_currency() -> String { USD.to_owned() }
fn default_range() -> String { DEFAULT_RANGE.to_owned() }
fn default_sheets_api_base() -> String { SHEETS_API_BASE.to_owned() }
fn default_telegram_api_base() -> String { TELEGRAM_API_BASE.to_owned() }

impl MonitorConfig {
  /// Load `path` (if it exists) layered under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }

  pub fn sync_settings(&self) -> SyncSettings {
    SyncSettings {
      currency:  self.rates.currency.clone(),
      source_id: self.sheet.id.clone(),
      interval:  Duration::from_secs(self.interval_secs),
    }
  }
}

impl SheetConfig {
  /// Build the credential the spreadsheet client presents.
  pub fn credentials(&self, timeout: Duration) -> orderwatch_feeds::Result<Credentials> {
    if let Some(path) = &self.authorized_user_file {
      return AuthorizedUser::from_file(expand_tilde(path), timeout)
        .map(Credentials::AuthorizedUser);
    }
    match &self.api_key {
      Some(key) => Ok(Credentials::ApiKey(key.clone())),
      None => Err(orderwatch_feeds::Error::Credential(
        "neither sheet.api_key nor sheet.authorized_user_file is set".into(),
      )),
    }
  }
}
