//! Traits for the two external inputs of a sync cycle: the exchange-rate
//! feed and the purchase source.

use std::future::Future;

use crate::purchase::SourcePurchase;

/// Supplies the multiplier that converts source-currency costs into the
/// target currency.
pub trait RateFeed: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The current rate for `currency_code`; always finite and positive.
  fn fetch_rate<'a>(
    &'a self,
    currency_code: &'a str,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + 'a;
}

/// Supplies the full current purchase list of a tabular document.
pub trait PurchaseSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every row of document `source_id`. Credentials are the
  /// implementation's concern.
  fn fetch_purchases<'a>(
    &'a self,
    source_id: &'a str,
  ) -> impl Future<Output = Result<Vec<SourcePurchase>, Self::Error>> + Send + 'a;
}
