//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::{Error, Result};

/// Build a client whose every request is bounded by `timeout`.
pub fn client(service: &'static str, timeout: Duration) -> Result<Client> {
  Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| Error::unavailable(service, format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success status into [`Error::Unavailable`].
pub fn require_success(service: &'static str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    Ok(resp)
  } else {
    Err(Error::unavailable(service, format!("status {status}")))
  }
}
