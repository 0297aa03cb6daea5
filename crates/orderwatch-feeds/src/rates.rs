//! Exchange-rate feed client.
//!
//! The feed is an XML document of `<Valute>` entries:
//!
//! ```xml
//! <ValCurs Date="19.10.2024" name="Foreign Currency Market">
//!   <Valute ID="R01235">
//!     <CharCode>USD</CharCode>
//!     <Nominal>1</Nominal>
//!     <Value>97,0226</Value>
//!   </Valute>
//! </ValCurs>
//! ```
//!
//! An entry is selected by its `ID` attribute or its `CharCode`. Values use a
//! comma as the decimal separator.

use std::time::Duration;

use orderwatch_core::feed::RateFeed;
use quick_xml::{Reader, events::Event};
use reqwest::Client;
use tracing::debug;

use crate::{Error, Result, http, parse::parse_float};

/// The central bank's daily rates document.
pub const CBR_DAILY_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";

/// Feed id of the US dollar.
pub const USD: &str = "R01235";

const SERVICE: &str = "rate feed";

/// Reads rates from a CBR-style daily XML feed. No caching: every call hits
/// the feed.
#[derive(Clone)]
pub struct CbrRateFeed {
  client: Client,
  url:    String,
}

impl CbrRateFeed {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
    Ok(Self { client: http::client(SERVICE, timeout)?, url: url.into() })
  }
}

impl RateFeed for CbrRateFeed {
  type Error = Error;

  async fn fetch_rate(&self, currency_code: &str) -> Result<f64> {
    let resp = self
      .client
      .get(&self.url)
      .send()
      .await
      .map_err(|e| Error::unavailable(SERVICE, e))?;
    let body = http::require_success(SERVICE, resp)?
      .text()
      .await
      .map_err(|e| Error::unavailable(SERVICE, e))?;

    let raw = find_rate_value(&body, currency_code)?;
    let rate = parse_rate(&raw)?;
    debug!(currency_code, rate, "fetched exchange rate");
    Ok(rate)
  }
}

/// Parse a feed value into a finite, positive rate.
pub fn parse_rate(raw: &str) -> Result<f64> {
  parse_float(raw)
    .filter(|r| r.is_finite() && *r > 0.0)
    .ok_or_else(|| Error::MalformedRate(raw.to_owned()))
}

// ─── XML ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ValuteEntry {
  id:        Option<String>,
  char_code: Option<String>,
  value:     Option<String>,
}

impl ValuteEntry {
  fn matches(&self, code: &str) -> bool {
    self.id.as_deref() == Some(code)
      || self
        .char_code
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(code))
  }
}

#[derive(Clone, Copy)]
enum Field {
  CharCode,
  Value,
}

/// Locate the raw `Value` text of the entry for `code`.
pub fn find_rate_value(xml: &str, code: &str) -> Result<String> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut entry: Option<ValuteEntry> = None;
  let mut field: Option<Field> = None;

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
        b"Valute" => {
          let id = e
            .try_get_attribute("ID")
            .map_err(|err| Error::malformed(SERVICE, err))?
            .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
            .transpose()
            .map_err(|err| Error::malformed(SERVICE, err))?;
          entry = Some(ValuteEntry { id, ..ValuteEntry::default() });
          field = None;
        }
        b"CharCode" => field = Some(Field::CharCode),
        b"Value" => field = Some(Field::Value),
        _ => field = None,
      },
      Ok(Event::Text(ref t)) => {
        if let (Some(current), Some(f)) = (entry.as_mut(), field) {
          let text = t
            .unescape()
            .map_err(|err| Error::malformed(SERVICE, err))?
            .into_owned();
          match f {
            Field::CharCode => current.char_code = Some(text),
            Field::Value => current.value = Some(text),
          }
        }
      }
      Ok(Event::End(ref e)) => {
        field = None;
        if e.local_name().as_ref() == b"Valute" {
          if let Some(done) = entry.take().filter(|d| d.matches(code)) {
            return done
              .value
              .ok_or_else(|| Error::MalformedRate(String::new()));
          }
        }
      }
      Ok(Event::Eof) => break,
      Err(err) => return Err(Error::malformed(SERVICE, err)),
      _ => {}
    }
  }

  Err(Error::UnknownCurrency(code.to_owned()))
}
